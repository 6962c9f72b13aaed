//! The seven end-to-end scenarios, compiled and run standalone so both
//! `#[test]`s and the `scenario-runner` binary can share one source of
//! truth for inputs and expected stdout.

use optimus_core::{compile, Process, StepOutcome};

pub struct Scenario {
    pub name: &'static str,
    pub source: &'static str,
    /// A line fed to `resolve_input` once the process suspends on `scanf`.
    pub input: Option<&'static str>,
    pub expected_stdout: &'static str,
}

pub fn all() -> Vec<Scenario> {
    vec![
        Scenario {
            name: "hello_world",
            source: r#"int main(){ printf("Hello, Optimus-OS!\n"); }"#,
            input: None,
            expected_stdout: "Hello, Optimus-OS!\n",
        },
        Scenario {
            name: "for_loop_counts_to_five",
            source: "int main(){ int i; for(i=1;i<=5;i=i+1) printf(\"%d \", i); printf(\"\\n\"); }",
            input: None,
            expected_stdout: "1 2 3 4 5 \n",
        },
        Scenario {
            name: "macro_bound_loop",
            source: "#define MAX 3\nint main(){ int i; for(i=0;i<MAX;i=i+1) printf(\"%d,\", i); }",
            input: None,
            expected_stdout: "0,1,2,",
        },
        Scenario {
            name: "sqrt_intrinsic",
            source: r#"int main(){ int a=9; printf("%f\n", sqrt(a)); }"#,
            input: None,
            expected_stdout: "3.000000\n",
        },
        Scenario {
            name: "scanf_driven_conditional",
            source: "int main(){ int d; scanf(\"%d\", &d); if(d<18) printf(\"minor\"); else printf(\"adult\"); }",
            input: Some("21"),
            expected_stdout: "adult",
        },
        Scenario {
            name: "continue_then_break",
            source: "int main(){ int i; for(i=0;i<5;i=i+1){ if(i==2) continue; if(i==4) break; printf(\"%d\", i);} }",
            input: None,
            expected_stdout: "013",
        },
        Scenario {
            name: "switch_fall_through",
            source: "int main(){ int x=2; switch(x){ case 1: printf(\"a\"); break; case 2: printf(\"b\"); case 3: printf(\"c\"); break; default: printf(\"d\"); } }",
            input: None,
            expected_stdout: "bc",
        },
    ]
}

/// Compiles and runs a scenario to completion, feeding its `input` line (if
/// any) the moment the process first suspends on `scanf`. Panics if the
/// source fails to compile — every scenario here is known-good.
pub fn run(scenario: &Scenario) -> String {
    let out = compile(scenario.source).expect("scenario source must compile");
    let mut proc = Process::new(100, out.instructions, out.data);
    loop {
        match proc.step(100_000) {
            StepOutcome::Continuing => continue,
            StepOutcome::WaitingInput => {
                let line = scenario.input.expect("process waited for input the scenario didn't supply");
                proc.resolve_input(line);
            }
            StepOutcome::Terminated => break,
        }
    }
    proc.take_stdout()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_named_scenario_matches_its_expected_stdout() {
        for scenario in all() {
            let actual = run(&scenario);
            assert_eq!(actual, scenario.expected_stdout, "scenario {} diverged", scenario.name);
        }
    }
}
