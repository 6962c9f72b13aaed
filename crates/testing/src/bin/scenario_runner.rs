//! Standalone pass/fail report for the seven end-to-end scenarios, for a
//! quick manual smoke check without `cargo test`'s harness.

use optimus_testing::scenarios;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let mut passed = 0;
    let mut failed = 0;

    for scenario in scenarios::all() {
        let actual = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| scenarios::run(&scenario)));
        match actual {
            Ok(stdout) if stdout == scenario.expected_stdout => {
                log::info!("PASS {}", scenario.name);
                passed += 1;
            }
            Ok(stdout) => {
                log::error!(
                    "FAIL {}: expected {:?}, got {:?}",
                    scenario.name,
                    scenario.expected_stdout,
                    stdout
                );
                failed += 1;
            }
            Err(_) => {
                log::error!("FAIL {}: panicked while compiling/running", scenario.name);
                failed += 1;
            }
        }
    }

    log::info!("{passed} passed, {failed} failed");
    std::process::exit(if failed == 0 { 0 } else { 1 });
}
