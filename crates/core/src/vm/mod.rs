//! Stack-based process virtual machine. Each [`Process`] owns
//! flat byte-addressed memory, a uniformly-numeric evaluation stack, and a
//! cooperative `step(max_cycles)` entry point the scheduler calls in
//! bounded chunks rather than running a process to completion.

pub mod format;

use crate::instruction::{Instruction, Opcode};
use format::{Conversion, ScanValue};

/// Total addressable memory per process: 64 KiB flat byte array.
pub const MEMORY_SIZE: usize = 65536;
/// Frame pointer base — locals are addressed as small non-negative offsets
/// from here, leaving room below for the heap to grow upward into.
pub const FRAME_POINTER: i64 = 60000;
/// Gap left between the end of the data segment and where the heap bump
/// allocator starts handing out memory.
const HEAP_MARGIN: usize = 1024;

fn align4(n: usize) -> usize {
    (n + 3) & !3
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ProcessState {
    Running,
    WaitingInput,
    Terminated,
}

/// Recorded when a `SCANF` suspends a process awaiting a line of input:
/// the format string and the destination addresses its conversions write
/// into, in source order.
#[derive(Debug, Clone)]
pub struct ScanContext {
    pub format: String,
    pub arg_addresses: Vec<usize>,
}

/// Runtime fault. Never propagates past `step`: the process degrades to
/// `Terminated` and the diagnostic is appended to its stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    DivideByZero,
    SegmentationFault,
    HeapExhausted,
}

impl Fault {
    fn reason(&self) -> &'static str {
        match self {
            Fault::DivideByZero => "division by zero",
            Fault::SegmentationFault => "invalid memory access",
            Fault::HeapExhausted => "heap exhausted",
        }
    }

    pub fn diagnostic(&self) -> String {
        format!("Segmentation Fault (Core Dumped): {}", self.reason())
    }
}

/// The three-way contract `step` returns to its caller: the scheduler
/// decides what to do next purely from this value, never by
/// re-inspecting process internals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// Ran out of cycles for this chunk; still runnable.
    Continuing,
    /// Suspended on a `SCANF`; call `resolve_input` to resume.
    WaitingInput,
    /// Hit `HALT`, ran off the end of the program, or faulted.
    Terminated,
}

enum ExecResult {
    Advance,
    Jump(usize),
    Halt,
    Suspend,
}

pub struct Process {
    pub pid: u32,
    memory: Vec<u8>,
    stack: Vec<f64>,
    pc: usize,
    fp: i64,
    heap_ptr: usize,
    instructions: Vec<Instruction>,
    pub state: ProcessState,
    pub stdout: String,
    scan_ctx: Option<ScanContext>,
}

impl Process {
    pub fn new(pid: u32, instructions: Vec<Instruction>, data: Vec<u8>) -> Self {
        let mut memory = vec![0u8; MEMORY_SIZE];
        let data_len = data.len().min(MEMORY_SIZE);
        memory[..data_len].copy_from_slice(&data[..data_len]);
        let heap_ptr = align4(data.len() + HEAP_MARGIN);

        Self {
            pid,
            memory,
            stack: Vec::new(),
            pc: 0,
            fp: FRAME_POINTER,
            heap_ptr,
            instructions,
            state: ProcessState::Running,
            stdout: String::new(),
            scan_ctx: None,
        }
    }

    pub fn state(&self) -> ProcessState {
        self.state
    }

    /// Externally kills the process regardless of its current state — used
    /// by `ProcessManager::kill`, which a host shell invokes rather than
    /// the VM ever deciding to stop on its own.
    pub fn force_terminate(&mut self) {
        self.state = ProcessState::Terminated;
    }

    pub fn take_stdout(&mut self) -> String {
        std::mem::take(&mut self.stdout)
    }

    /// Runs up to `max_cycles` instructions, or until the process suspends
    /// or terminates, whichever comes first. Never panics on malformed
    /// bytecode or out-of-range addresses; those degrade the process via
    /// `Fault` instead.
    pub fn step(&mut self, max_cycles: usize) -> StepOutcome {
        match self.state {
            ProcessState::Terminated => return StepOutcome::Terminated,
            ProcessState::WaitingInput => return StepOutcome::WaitingInput,
            ProcessState::Running => {}
        }

        for _ in 0..max_cycles {
            if self.pc >= self.instructions.len() {
                self.state = ProcessState::Terminated;
                return StepOutcome::Terminated;
            }

            let instr = self.instructions[self.pc];
            match self.execute(instr) {
                Ok(ExecResult::Advance) => self.pc += 1,
                Ok(ExecResult::Jump(target)) => self.pc = target,
                Ok(ExecResult::Halt) => {
                    self.state = ProcessState::Terminated;
                    return StepOutcome::Terminated;
                }
                Ok(ExecResult::Suspend) => {
                    self.state = ProcessState::WaitingInput;
                    return StepOutcome::WaitingInput;
                }
                Err(fault) => {
                    self.stdout.push_str(&fault.diagnostic());
                    self.stdout.push('\n');
                    self.state = ProcessState::Terminated;
                    return StepOutcome::Terminated;
                }
            }
        }
        StepOutcome::Continuing
    }

    /// Feeds a line of input to a process suspended on `SCANF`, writes the
    /// parsed values into their target addresses, and resumes it to
    /// `Running`. A no-op if the process isn't waiting.
    pub fn resolve_input(&mut self, line: &str) {
        let Some(ctx) = self.scan_ctx.take() else { return };
        let convs = format::specifiers(&ctx.format);
        let values = format::parse_input(line, &convs);

        for ((addr, value), conv) in ctx.arg_addresses.iter().zip(values.iter()).zip(convs.iter()) {
            match (conv, value) {
                (Conversion::Double, ScanValue::Num(v)) => {
                    let _ = self.write_f64(*addr, *v);
                }
                (Conversion::Str, ScanValue::Str(s)) => {
                    let _ = self.write_cstring(*addr, s);
                }
                (_, ScanValue::Num(v)) => {
                    let _ = self.write_f32(*addr, *v as f32);
                }
                _ => {}
            }
        }
        self.state = ProcessState::Running;
    }

    fn jump_target(&self, arg: f64) -> Result<usize, Fault> {
        let target = arg as usize;
        if target > self.instructions.len() {
            return Err(Fault::SegmentationFault);
        }
        Ok(target)
    }

    fn push(&mut self, v: f64) {
        self.stack.push(v);
    }

    fn pop(&mut self) -> Result<f64, Fault> {
        self.stack.pop().ok_or(Fault::SegmentationFault)
    }

    fn read_f32(&self, addr: usize) -> Result<f32, Fault> {
        let bytes = self.memory.get(addr..addr + 4).ok_or(Fault::SegmentationFault)?;
        Ok(f32::from_le_bytes(bytes.try_into().unwrap()))
    }

    fn write_f32(&mut self, addr: usize, v: f32) -> Result<(), Fault> {
        let slot = self.memory.get_mut(addr..addr + 4).ok_or(Fault::SegmentationFault)?;
        slot.copy_from_slice(&v.to_le_bytes());
        Ok(())
    }

    fn read_f64(&self, addr: usize) -> Result<f64, Fault> {
        let bytes = self.memory.get(addr..addr + 8).ok_or(Fault::SegmentationFault)?;
        Ok(f64::from_le_bytes(bytes.try_into().unwrap()))
    }

    fn write_f64(&mut self, addr: usize, v: f64) -> Result<(), Fault> {
        let slot = self.memory.get_mut(addr..addr + 8).ok_or(Fault::SegmentationFault)?;
        slot.copy_from_slice(&v.to_le_bytes());
        Ok(())
    }

    fn read_cstring(&self, addr: usize) -> String {
        let mut out = Vec::new();
        let mut i = addr;
        while let Some(&b) = self.memory.get(i) {
            if b == 0 {
                break;
            }
            out.push(b);
            i += 1;
        }
        String::from_utf8_lossy(&out).into_owned()
    }

    /// Writes `s` byte-wise starting at `addr`, NUL-terminated. The `%s`
    /// `SCANF` target is a byte buffer, not a float-encoded slot, so this
    /// bypasses `write_f32`/`write_f64` entirely. `resolve_input` ignores
    /// the error this can return rather than propagate it further, since a
    /// scanf call is never allowed to fail the process outright.
    fn write_cstring(&mut self, addr: usize, s: &str) -> Result<(), Fault> {
        let bytes = s.as_bytes();
        if addr + bytes.len() >= MEMORY_SIZE {
            return Err(Fault::SegmentationFault);
        }
        self.memory[addr..addr + bytes.len()].copy_from_slice(bytes);
        self.memory[addr + bytes.len()] = 0;
        Ok(())
    }

    fn frame_addr(&self, offset: f64) -> Result<usize, Fault> {
        let addr = self.fp + offset as i64;
        if addr < 0 || addr as usize >= MEMORY_SIZE {
            return Err(Fault::SegmentationFault);
        }
        Ok(addr as usize)
    }

    fn execute(&mut self, instr: Instruction) -> Result<ExecResult, Fault> {
        use Opcode::*;
        match instr.op {
            Halt => Ok(ExecResult::Halt),
            Jmp => Ok(ExecResult::Jump(self.jump_target(instr.arg)?)),
            Jz => {
                let v = self.pop()?;
                if v == 0.0 {
                    Ok(ExecResult::Jump(self.jump_target(instr.arg)?))
                } else {
                    Ok(ExecResult::Advance)
                }
            }

            Lit => {
                self.push(instr.arg);
                Ok(ExecResult::Advance)
            }
            Pop => {
                self.pop()?;
                Ok(ExecResult::Advance)
            }
            Dup => {
                let v = *self.stack.last().ok_or(Fault::SegmentationFault)?;
                self.push(v);
                Ok(ExecResult::Advance)
            }

            Add => self.binary(|a, b| Ok(a + b)),
            Sub => self.binary(|a, b| Ok(a - b)),
            Mul => self.binary(|a, b| Ok(a * b)),
            Div => self.binary(|a, b| if b == 0.0 { Err(Fault::DivideByZero) } else { Ok(a / b) }),
            Mod => self.binary(|a, b| if b == 0.0 { Err(Fault::DivideByZero) } else { Ok(a % b) }),

            Eq => self.binary(|a, b| Ok(bool_f64(a == b))),
            Neq => self.binary(|a, b| Ok(bool_f64(a != b))),
            Lt => self.binary(|a, b| Ok(bool_f64(a < b))),
            Gt => self.binary(|a, b| Ok(bool_f64(a > b))),
            Le => self.binary(|a, b| Ok(bool_f64(a <= b))),
            Ge => self.binary(|a, b| Ok(bool_f64(a >= b))),

            Load => {
                let addr = self.frame_addr(instr.arg)?;
                self.push(self.read_f32(addr)? as f64);
                Ok(ExecResult::Advance)
            }
            Store => {
                let addr = self.frame_addr(instr.arg)?;
                let v = self.pop()?;
                self.write_f32(addr, v as f32)?;
                Ok(ExecResult::Advance)
            }
            Load64 => {
                let addr = self.frame_addr(instr.arg)?;
                self.push(self.read_f64(addr)?);
                Ok(ExecResult::Advance)
            }
            Store64 => {
                let addr = self.frame_addr(instr.arg)?;
                let v = self.pop()?;
                self.write_f64(addr, v)?;
                Ok(ExecResult::Advance)
            }

            PPush => {
                let addr = self.frame_addr(instr.arg)?;
                self.push(addr as f64);
                Ok(ExecResult::Advance)
            }

            LInd => {
                let addr = self.pop()? as usize;
                self.push(self.read_f32(addr)? as f64);
                Ok(ExecResult::Advance)
            }
            SInd => {
                // Emission order is addr, then value (see parser::parse_deref
                // and the indexed-assignment arm of parse_primary) — value
                // ends up on top, addr beneath it.
                let v = self.pop()?;
                let addr = self.pop()? as usize;
                self.write_f32(addr, v as f32)?;
                self.push(v);
                Ok(ExecResult::Advance)
            }
            LInd64 => {
                let addr = self.pop()? as usize;
                self.push(self.read_f64(addr)?);
                Ok(ExecResult::Advance)
            }
            SInd64 => {
                let v = self.pop()?;
                let addr = self.pop()? as usize;
                self.write_f64(addr, v)?;
                self.push(v);
                Ok(ExecResult::Advance)
            }

            Malloc => {
                let size = self.pop()? as usize;
                if self.heap_ptr + size >= self.fp as usize {
                    return Err(Fault::HeapExhausted);
                }
                self.push(self.heap_ptr as f64);
                self.heap_ptr = align4(self.heap_ptr + size);
                Ok(ExecResult::Advance)
            }
            Free => {
                self.pop()?;
                Ok(ExecResult::Advance)
            }

            Sin => self.unary(|a| a.sin()),
            Cos => self.unary(|a| a.cos()),
            Tan => self.unary(|a| a.tan()),
            Sqrt => self.unary(|a| a.sqrt()),
            Abs => self.unary(|a| a.abs()),
            Pow => self.binary(|a, b| Ok(a.powf(b))),

            Print => {
                let addr = self.pop()? as usize;
                let fmt = self.read_cstring(addr);
                let n = instr.arg_usize();
                if self.stack.len() < n {
                    return Err(Fault::SegmentationFault);
                }
                let mut args: Vec<f64> = (0..n).map(|_| self.stack.pop().unwrap()).collect();
                args.reverse();
                let rendered = format::render(&fmt, &args, |a| self.read_cstring(a));
                self.stdout.push_str(&rendered);
                Ok(ExecResult::Advance)
            }
            Scanf => {
                let addr = self.pop()? as usize;
                let fmt = self.read_cstring(addr);
                let n = instr.arg_usize();
                if self.stack.len() < n {
                    return Err(Fault::SegmentationFault);
                }
                let mut arg_addresses: Vec<usize> =
                    (0..n).map(|_| self.stack.pop().unwrap() as usize).collect();
                arg_addresses.reverse();
                self.scan_ctx = Some(ScanContext { format: fmt, arg_addresses });
                // Advance past this instruction now: `step` won't touch pc
                // again for a Suspend result, and resuming must continue
                // after the SCANF rather than re-executing it.
                self.pc += 1;
                Ok(ExecResult::Suspend)
            }
        }
    }

    fn binary(&mut self, f: impl Fn(f64, f64) -> Result<f64, Fault>) -> Result<ExecResult, Fault> {
        let b = self.pop()?;
        let a = self.pop()?;
        self.push(f(a, b)?);
        Ok(ExecResult::Advance)
    }

    fn unary(&mut self, f: impl Fn(f64) -> f64) -> Result<ExecResult, Fault> {
        let a = self.pop()?;
        self.push(f(a));
        Ok(ExecResult::Advance)
    }
}

fn bool_f64(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::compile;

    fn run_to_completion(source: &str) -> Process {
        let out = compile(source).unwrap();
        let mut proc = Process::new(100, out.instructions, out.data);
        loop {
            match proc.step(10_000) {
                StepOutcome::Continuing => continue,
                StepOutcome::WaitingInput | StepOutcome::Terminated => break,
            }
        }
        proc
    }

    #[test]
    fn hello_world_prints_and_halts() {
        let mut proc = run_to_completion(r#"int main() { printf("Hello, Optimus-OS!\n"); return 0; }"#);
        assert_eq!(proc.state(), ProcessState::Terminated);
        assert_eq!(proc.take_stdout(), "Hello, Optimus-OS!\n");
    }

    #[test]
    fn for_loop_countdown() {
        let mut proc = run_to_completion(
            "int main() { int i; for (i = 3; i > 0; i = i - 1) { printf(\"%d\\n\", i); } return 0; }",
        );
        assert_eq!(proc.take_stdout(), "3\n2\n1\n");
    }

    #[test]
    fn divide_by_zero_degrades_to_terminated_with_diagnostic() {
        let mut proc = run_to_completion("int main() { int x; x = 1 / 0; return 0; }");
        assert_eq!(proc.state(), ProcessState::Terminated);
        assert!(proc.take_stdout().contains("Segmentation Fault"));
    }

    #[test]
    fn scanf_suspends_then_resumes_on_input() {
        let out = compile("int main() { int x; scanf(\"%d\", &x); printf(\"%d\\n\", x); return 0; }").unwrap();
        let mut proc = Process::new(101, out.instructions, out.data);
        assert_eq!(proc.step(10_000), StepOutcome::WaitingInput);
        proc.resolve_input("42");
        assert_eq!(proc.state(), ProcessState::Running);
        loop {
            match proc.step(10_000) {
                StepOutcome::Continuing => continue,
                _ => break,
            }
        }
        assert_eq!(proc.take_stdout(), "42\n");
    }

    #[test]
    fn scanf_percent_s_copies_bytes_not_a_float_encoding() {
        let out = compile(
            "int main() { char buf[16]; scanf(\"%s\", buf); printf(\"%s\\n\", buf); return 0; }",
        )
        .unwrap();
        let mut proc = Process::new(103, out.instructions, out.data);
        assert_eq!(proc.step(10_000), StepOutcome::WaitingInput);
        proc.resolve_input("hello");
        loop {
            match proc.step(10_000) {
                StepOutcome::Continuing => continue,
                _ => break,
            }
        }
        assert_eq!(proc.take_stdout(), "hello\n");
    }

    #[test]
    fn malloc_returns_4_byte_aligned_addresses() {
        let out = compile("int main() { int p; p = malloc(3); int q; q = malloc(5); return 0; }").unwrap();
        let mut proc = Process::new(102, out.instructions, out.data);
        while proc.step(10_000) == StepOutcome::Continuing {}
        // Addresses are written back into locals, not directly observable
        // here without exposing memory; the allocator's own alignment
        // invariant is exercised by running to completion without fault.
        assert_eq!(proc.state(), ProcessState::Terminated);
    }

    #[test]
    fn break_exits_loop_immediately() {
        let mut proc = run_to_completion(
            "int main() { int i; for (i = 0; i < 5; i = i + 1) { if (i == 2) { break; } printf(\"%d\\n\", i); } return 0; }",
        );
        assert_eq!(proc.take_stdout(), "0\n1\n");
    }

    #[test]
    fn continue_skips_rest_of_body() {
        let mut proc = run_to_completion(
            "int main() { int i; for (i = 0; i < 4; i = i + 1) { if (i == 1) { continue; } printf(\"%d\\n\", i); } return 0; }",
        );
        assert_eq!(proc.take_stdout(), "0\n2\n3\n");
    }

    #[test]
    fn switch_falls_through_without_break() {
        let mut proc = run_to_completion(
            "int main() { int x; x = 1; switch (x) { case 1: printf(\"a\"); case 2: printf(\"b\"); break; case 3: printf(\"c\"); } return 0; }",
        );
        assert_eq!(proc.take_stdout(), "ab");
    }
}
