//! Process manager: multiplexes a collection of [`Process`] instances by
//! PID, tracks the bookkeeping a host shell needs (name, start time, a
//! memory-usage hint, an owning window), and fans out lifecycle
//! notifications to subscribers. PIDs start at 100 and increase
//! monotonically, never reused even after a process is killed, so a
//! stale PID reliably misses rather than aliasing onto a different
//! process.

use crate::vm::{Process, ProcessState, StepOutcome, MEMORY_SIZE};
use chrono::{DateTime, Utc};
use std::collections::HashMap;

const FIRST_PID: u32 = 100;

/// An event a subscriber cares about. Kept deliberately small — the daemon
/// layer maps these onto its own wire format (see `optimus-daemon`).
#[derive(Debug, Clone)]
pub enum ProcessEvent {
    Spawned { pid: u32 },
    Output { pid: u32, text: String },
    WaitingInput { pid: u32 },
    Terminated { pid: u32 },
    Killed { pid: u32 },
}

pub trait Subscriber {
    fn notify(&mut self, event: ProcessEvent);
}

/// Handle returned by [`ProcessManager::subscribe`], usable to unregister
/// later. Opaque on purpose — subscribers don't get to inspect each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

/// A point-in-time snapshot of one process, as returned by
/// [`ProcessManager::list`].
#[derive(Debug, Clone, serde::Serialize)]
pub struct ProcessSnapshot {
    pub pid: u32,
    pub name: String,
    pub state: ProcessState,
    pub memory_usage: u64,
    pub start_time: DateTime<Utc>,
    pub window_id: Option<u32>,
}

/// `None` process means a [`ProcessManager::register_system_process`]
/// placeholder: a registry row with no executing VM, kept purely for
/// bookkeeping (e.g. a host-side window or service the shell wants to list
/// alongside real compiled programs).
struct ProcessEntry {
    process: Option<Process>,
    name: String,
    start_time: DateTime<Utc>,
    memory_usage_hint: u64,
    window_id: Option<u32>,
}

pub struct ProcessManager {
    next_pid: u32,
    entries: HashMap<u32, ProcessEntry>,
    next_subscription: u64,
    subscribers: Vec<(SubscriptionId, Box<dyn Subscriber>)>,
}

impl Default for ProcessManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessManager {
    pub fn new() -> Self {
        Self {
            next_pid: FIRST_PID,
            entries: HashMap::new(),
            next_subscription: 0,
            subscribers: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, subscriber: Box<dyn Subscriber>) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push((id, subscriber));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        self.subscribers.retain(|(sub_id, _)| *sub_id != id);
    }

    fn broadcast(&mut self, event: ProcessEvent) {
        for (_, sub) in &mut self.subscribers {
            sub.notify(event.clone());
        }
    }

    fn allocate_pid(&mut self) -> u32 {
        let pid = self.next_pid;
        self.next_pid += 1;
        pid
    }

    /// Registers compiled bytecode as a new process and returns its PID.
    pub fn create_process(&mut self, name: impl Into<String>, instructions: Vec<crate::instruction::Instruction>, data: Vec<u8>) -> u32 {
        let pid = self.allocate_pid();
        let memory_usage_hint = (data.len() + instructions.len() * std::mem::size_of::<crate::instruction::Instruction>()) as u64;
        self.entries.insert(
            pid,
            ProcessEntry {
                process: Some(Process::new(pid, instructions, data)),
                name: name.into(),
                start_time: Utc::now(),
                memory_usage_hint,
                window_id: None,
            },
        );
        self.broadcast(ProcessEvent::Spawned { pid });
        pid
    }

    /// Creates a zero-bytecode placeholder used purely for bookkeeping,
    /// e.g. a desktop-level entity the shell wants represented in `list()`
    /// without there being an actual VM to step.
    pub fn register_system_process(&mut self, name: impl Into<String>, mem: Option<u64>, window: Option<u32>) -> u32 {
        let pid = self.allocate_pid();
        self.entries.insert(
            pid,
            ProcessEntry {
                process: None,
                name: name.into(),
                start_time: Utc::now(),
                memory_usage_hint: mem.unwrap_or(0),
                window_id: window,
            },
        );
        self.broadcast(ProcessEvent::Spawned { pid });
        pid
    }

    /// For the shell to step or deliver input. Returns `None` both for an
    /// unknown PID and for a system-process placeholder, which has no VM.
    pub fn get(&self, pid: u32) -> Option<&Process> {
        self.entries.get(&pid).and_then(|e| e.process.as_ref())
    }

    /// Silent no-op on an unknown PID; callers that need to distinguish
    /// "already gone" from "killed" should check `get` first.
    pub fn kill(&mut self, pid: u32) {
        if let Some(entry) = self.entries.get_mut(&pid) {
            if let Some(process) = entry.process.as_mut() {
                process.force_terminate();
            }
            self.entries.remove(&pid);
            self.broadcast(ProcessEvent::Killed { pid });
        }
    }

    /// Kills every process/placeholder owned by `window_id`. Silent no-op
    /// if none match.
    pub fn kill_by_window(&mut self, window_id: u32) {
        let pids: Vec<u32> = self
            .entries
            .iter()
            .filter(|(_, e)| e.window_id == Some(window_id))
            .map(|(pid, _)| *pid)
            .collect();
        for pid in pids {
            self.kill(pid);
        }
    }

    /// Sweeps any entry whose VM has autonomously terminated, then returns
    /// a snapshot of everything left.
    pub fn list(&mut self) -> Vec<ProcessSnapshot> {
        let finished: Vec<u32> = self
            .entries
            .iter()
            .filter(|(_, e)| matches!(e.process.as_ref().map(Process::state), Some(ProcessState::Terminated)))
            .map(|(pid, _)| *pid)
            .collect();
        for pid in finished {
            self.entries.remove(&pid);
            self.broadcast(ProcessEvent::Terminated { pid });
        }

        let mut snapshots: Vec<ProcessSnapshot> = self
            .entries
            .iter()
            .map(|(pid, e)| ProcessSnapshot {
                pid: *pid,
                name: e.name.clone(),
                state: e.process.as_ref().map(Process::state).unwrap_or(ProcessState::Running),
                memory_usage: e.memory_usage_hint,
                start_time: e.start_time,
                window_id: e.window_id,
            })
            .collect();
        snapshots.sort_unstable_by_key(|s| s.pid);
        snapshots
    }

    /// Steps a single process by up to `max_cycles` instructions, flushes
    /// its stdout into an `Output` notification, and broadcasts
    /// `WaitingInput`/`Terminated` transitions. Silent no-op on an unknown
    /// PID or a system-process placeholder.
    pub fn step(&mut self, pid: u32, max_cycles: usize) {
        let Some(process) = self.entries.get_mut(&pid).and_then(|e| e.process.as_mut()) else { return };
        let outcome = process.step(max_cycles);
        let output = process.take_stdout();
        if !output.is_empty() {
            self.broadcast(ProcessEvent::Output { pid, text: output });
        }
        match outcome {
            StepOutcome::WaitingInput => self.broadcast(ProcessEvent::WaitingInput { pid }),
            StepOutcome::Terminated => self.broadcast(ProcessEvent::Terminated { pid }),
            StepOutcome::Continuing => {}
        }
    }

    /// Runs every still-runnable process through one scheduling round.
    pub fn step_all(&mut self, max_cycles: usize) {
        let pids: Vec<u32> = self.entries.keys().copied().collect();
        for pid in pids {
            if self.is_runnable(pid) {
                self.step(pid, max_cycles);
            }
        }
    }

    fn is_runnable(&self, pid: u32) -> bool {
        matches!(
            self.entries.get(&pid).and_then(|e| e.process.as_ref()).map(Process::state),
            Some(ProcessState::Running)
        )
    }

    /// Silent no-op on an unknown PID or a process that isn't waiting.
    pub fn resolve_input(&mut self, pid: u32, line: &str) {
        if let Some(process) = self.entries.get_mut(&pid).and_then(|e| e.process.as_mut()) {
            process.resolve_input(line);
        }
    }
}

/// Rough upper bound on the in-process footprint a well-behaved program
/// occupies — used as `memory_usage_hint`'s ceiling when a caller doesn't
/// supply its own estimate.
pub const MAX_PROCESS_MEMORY: u64 = MEMORY_SIZE as u64;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::compile;
    use std::sync::{Arc, Mutex};

    struct Recorder(Arc<Mutex<Vec<ProcessEvent>>>);
    impl Subscriber for Recorder {
        fn notify(&mut self, event: ProcessEvent) {
            self.0.lock().unwrap().push(event);
        }
    }

    #[test]
    fn pids_start_at_100_and_increase() {
        let mut mgr = ProcessManager::new();
        let out = compile("int main() { return 0; }").unwrap();
        let p1 = mgr.create_process("a.out", out.instructions.clone(), out.data.clone());
        let p2 = mgr.create_process("a.out", out.instructions, out.data);
        assert_eq!(p1, 100);
        assert_eq!(p2, 101);
    }

    #[test]
    fn kill_on_unknown_pid_is_silent() {
        let mut mgr = ProcessManager::new();
        mgr.kill(9999); // must not panic
    }

    #[test]
    fn step_on_unknown_pid_is_silent() {
        let mut mgr = ProcessManager::new();
        mgr.step(9999, 100); // must not panic
    }

    #[test]
    fn subscribers_see_output_and_termination() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let mut mgr = ProcessManager::new();
        mgr.subscribe(Box::new(Recorder(events.clone())));

        let out = compile(r#"int main() { printf("hi\n"); return 0; }"#).unwrap();
        let pid = mgr.create_process("hello", out.instructions, out.data);
        loop {
            mgr.step(pid, 10_000);
            if mgr.get(pid).is_none() {
                break;
            }
            if mgr.list().iter().all(|s| s.pid != pid) {
                break;
            }
        }

        let recorded = events.lock().unwrap();
        assert!(recorded.iter().any(|e| matches!(e, ProcessEvent::Spawned { .. })));
        assert!(recorded.iter().any(|e| matches!(e, ProcessEvent::Output { text, .. } if text == "hi\n")));
        assert!(recorded.iter().any(|e| matches!(e, ProcessEvent::Terminated { .. })));
    }

    #[test]
    fn killed_process_is_unreachable_afterward() {
        let mut mgr = ProcessManager::new();
        let out = compile("int main() { return 0; }").unwrap();
        let pid = mgr.create_process("a.out", out.instructions, out.data);
        mgr.kill(pid);
        assert!(mgr.get(pid).is_none());
    }

    #[test]
    fn unsubscribe_stops_future_notifications() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let mut mgr = ProcessManager::new();
        let id = mgr.subscribe(Box::new(Recorder(events.clone())));
        mgr.unsubscribe(id);

        let out = compile("int main() { return 0; }").unwrap();
        mgr.create_process("a.out", out.instructions, out.data);
        assert!(events.lock().unwrap().is_empty());
    }

    #[test]
    fn system_process_has_no_steppable_vm() {
        let mut mgr = ProcessManager::new();
        let pid = mgr.register_system_process("window-manager", Some(4096), Some(7));
        assert!(mgr.get(pid).is_none());
        let snap = mgr.list();
        assert_eq!(snap.len(), 1);
        assert_eq!(snap[0].name, "window-manager");
        assert_eq!(snap[0].window_id, Some(7));
    }

    #[test]
    fn kill_by_window_removes_every_owned_entry() {
        let mut mgr = ProcessManager::new();
        let a = mgr.register_system_process("terminal", None, Some(1));
        let b = mgr.register_system_process("editor", None, Some(1));
        let c = mgr.register_system_process("settings", None, Some(2));
        mgr.kill_by_window(1);
        assert!(mgr.get(a).is_none() && mgr.list().iter().all(|s| s.pid != a));
        assert!(mgr.list().iter().all(|s| s.pid != b));
        assert!(mgr.list().iter().any(|s| s.pid == c));
    }

    #[test]
    fn list_sweeps_autonomously_terminated_processes() {
        let mut mgr = ProcessManager::new();
        let out = compile("int main() { return 0; }").unwrap();
        let pid = mgr.create_process("a.out", out.instructions, out.data);
        mgr.step(pid, 10_000);
        assert!(mgr.list().iter().all(|s| s.pid != pid));
    }
}
