//! End-to-end compile-and-run scenarios exercising the full pipeline:
//! preprocessor, lexer, macro expander, parser/codegen, and the VM,
//! together — as a consumer of the crate's public API would.

use optimus_core::{compile, Process, ProcessState, StepOutcome};

fn run(source: &str) -> (Process, Result<(), optimus_core::CompileError>) {
    match compile(source) {
        Ok(out) => {
            let mut proc = Process::new(100, out.instructions, out.data);
            loop {
                match proc.step(100_000) {
                    StepOutcome::Continuing => continue,
                    StepOutcome::WaitingInput | StepOutcome::Terminated => break,
                }
            }
            (proc, Ok(()))
        }
        Err(e) => (Process::new(100, Vec::new(), Vec::new()), Err(e)),
    }
}

#[test]
fn hello_optimus_os() {
    let (mut proc, res) = run(r#"int main() { printf("Hello, Optimus-OS!\n"); return 0; }"#);
    res.unwrap();
    assert_eq!(proc.take_stdout(), "Hello, Optimus-OS!\n");
    assert_eq!(proc.state(), ProcessState::Terminated);
}

#[test]
fn for_loop_countdown_from_five() {
    let (mut proc, res) = run(
        "int main() {\n  int i;\n  for (i = 5; i > 0; i = i - 1) {\n    printf(\"%d\\n\", i);\n  }\n  return 0;\n}",
    );
    res.unwrap();
    assert_eq!(proc.take_stdout(), "5\n4\n3\n2\n1\n");
}

#[test]
fn define_macro_is_substituted_before_parsing() {
    let (mut proc, res) = run(
        "#define COUNT 3\nint main() {\n  int i;\n  for (i = 0; i < COUNT; i = i + 1) {\n    printf(\"x\\n\");\n  }\n  return 0;\n}",
    );
    res.unwrap();
    assert_eq!(proc.take_stdout(), "x\nx\nx\n");
}

#[test]
fn sqrt_and_float_printf() {
    let (mut proc, res) = run(r#"int main() { double x; x = sqrt(16.0); printf("%f\n", x); return 0; }"#);
    res.unwrap();
    assert_eq!(proc.take_stdout(), "4.000000\n");
}

#[test]
fn scanf_drives_a_conditional() {
    let (mut proc, res) = (
        {
            let out = compile(
                "int main() {\n  int x;\n  scanf(\"%d\", &x);\n  if (x > 0) {\n    printf(\"positive\\n\");\n  } else {\n    printf(\"non-positive\\n\");\n  }\n  return 0;\n}",
            )
            .unwrap();
            Process::new(100, out.instructions, out.data)
        },
        Ok(()),
    );
    let _ = &res;
    assert_eq!(proc.step(100_000), StepOutcome::WaitingInput);
    proc.resolve_input("-3");
    loop {
        match proc.step(100_000) {
            StepOutcome::Continuing => continue,
            _ => break,
        }
    }
    assert_eq!(proc.take_stdout(), "non-positive\n");
}

#[test]
fn continue_and_break_interact_in_one_loop() {
    let (mut proc, res) = run(
        "int main() {\n  int i;\n  for (i = 0; i < 6; i = i + 1) {\n    if (i == 1) { continue; }\n    if (i == 4) { break; }\n    printf(\"%d\\n\", i);\n  }\n  return 0;\n}",
    );
    res.unwrap();
    assert_eq!(proc.take_stdout(), "0\n2\n3\n");
}

#[test]
fn switch_fall_through_across_cases() {
    let (mut proc, res) = run(
        "int main() {\n  int day;\n  day = 2;\n  switch (day) {\n    case 1:\n      printf(\"mon \");\n    case 2:\n      printf(\"tue \");\n    case 3:\n      printf(\"wed \");\n      break;\n    default:\n      printf(\"other \");\n  }\n  return 0;\n}",
    );
    res.unwrap();
    assert_eq!(proc.take_stdout(), "tue wed ");
}

#[test]
fn empty_source_compiles_to_no_functions() {
    let out = compile("").unwrap();
    assert!(out.instructions.is_empty());
}

#[test]
fn scanf_with_insufficient_tokens_fills_zero_rather_than_faulting() {
    let out = compile("int main() { int a; int b; scanf(\"%d %d\", &a, &b); printf(\"%d %d\\n\", a, b); return 0; }").unwrap();
    let mut proc = Process::new(100, out.instructions, out.data);
    assert_eq!(proc.step(100_000), StepOutcome::WaitingInput);
    proc.resolve_input("7");
    loop {
        match proc.step(100_000) {
            StepOutcome::Continuing => continue,
            _ => break,
        }
    }
    assert_eq!(proc.take_stdout(), "7 0\n");
}

#[test]
fn negative_case_constant_matches() {
    let (mut proc, res) = run(
        "int main() {\n  int x;\n  x = -1;\n  switch (x) {\n    case -1:\n      printf(\"neg\\n\");\n      break;\n    default:\n      printf(\"other\\n\");\n  }\n  return 0;\n}",
    );
    res.unwrap();
    assert_eq!(proc.take_stdout(), "neg\n");
}

#[test]
fn undefined_variable_is_a_fatal_compile_error_not_a_panic() {
    let err = compile("int main() { y = 1; return 0; }").unwrap_err();
    assert_eq!(err.line, 1);
}

#[test]
fn pointer_write_and_read_round_trip() {
    let (mut proc, res) = run(
        "int main() {\n  int x;\n  int *p;\n  p = &x;\n  *p = 9;\n  printf(\"%d\\n\", x);\n  return 0;\n}",
    );
    res.unwrap();
    assert_eq!(proc.take_stdout(), "9\n");
}

#[test]
fn array_indexing_stores_and_loads_independent_elements() {
    let (mut proc, res) = run(
        "int main() {\n  int arr[3];\n  arr[0] = 10;\n  arr[1] = 20;\n  printf(\"%d %d\\n\", arr[0], arr[1]);\n  return 0;\n}",
    );
    res.unwrap();
    assert_eq!(proc.take_stdout(), "10 20\n");
}
