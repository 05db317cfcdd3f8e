pub mod config;
pub mod counter;
pub mod driver;
mod error;
mod executor;
mod junit;
pub mod model;
pub mod monitor;
pub mod native;
pub mod prelude;
pub mod sample;
pub mod scenarios;
pub mod scoreboard;
pub mod signal;
pub mod sim_if;
pub mod test;
pub mod testbench;
mod trigger;
pub mod utils;

use std::rc::Rc;
use std::time;

pub use config::SimConfig;
pub use error::{Mismatch, TbError, TbResult};
pub use futures;
pub use log;

use native::{Design, NativeSim, RunOutcome};
use sim_if::SimIf;
use test::{Test, TestFn, TestSuite};

/// Installs `env_logger`, defaulting to `info` when `RUST_LOG` is unset.
/// Safe to call more than once.
pub fn init_logging() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .try_init();
}

/// Runs one test against a fresh simulator hosting `design`.
///
/// The result, wall time and simulated time are recorded on `test`. Every task
/// the test left behind (clock, monitor, ...) is cancelled afterwards, so the
/// next test on this thread starts from a clean executor.
pub fn run_test(design: Box<dyn Design>, test: &mut Test, config: &SimConfig) -> bool {
    let native = Rc::new(NativeSim::new(design, config.precision));
    sim_if::install(native.clone());
    config::install(config);
    log::info!("{} TEST {}: started", sim_if::timestamp(), test.name);

    let time_start = time::Instant::now();
    let result = execute(&native, test.generator, config);
    test.time_secs = time_start.elapsed().as_secs_f64();
    test.sim_time_ns = native.get_sim_time("ns").unwrap_or_default();

    match &result {
        Ok(()) => log::info!("{} TEST {}: passed", sim_if::timestamp(), test.name),
        Err(e) => log::error!("{} TEST {}: failed: {}", sim_if::timestamp(), test.name, e),
    }
    tear_down_test();
    test.set_result(result);
    test.passed()
}

fn execute(native: &NativeSim, generator: TestFn, config: &SimConfig) -> TbResult {
    let limit = native.get_sim_steps(config.max_sim_time_ns as f64, "ns")?;
    let root = native.get_root_object()?;

    let mut handle = executor::Task::spawn(generator(root), "test");
    executor::run_once();

    let mut result = None;
    let outcome = native.run_until(limit, || {
        if result.is_none() {
            result = handle.try_result();
        }
        result.is_some()
    });
    match outcome {
        RunOutcome::Done => result.unwrap_or(Err(TbError::TaskCancelled)),
        RunOutcome::Timeout => Err(TbError::Timeout {
            limit_ns: config.max_sim_time_ns,
        }),
        RunOutcome::Starved => Err(TbError::Starved {
            time_ns: native.get_sim_time("ns")? as u64,
        }),
    }
}

fn tear_down_test() {
    // tasks are cancelled while the simulator is still installed
    executor::cancel_all();
    executor::clear_ready_queue();
    trigger::reset();
    sim_if::uninstall();
    config::uninstall();
}

/// Runs every test of `suite`, each on a fresh design from `factory`, then logs
/// the summary table and writes the JUnit report if one is configured.
pub fn run_suite(
    factory: &dyn Fn(&SimConfig) -> Box<dyn Design>,
    suite: &mut TestSuite,
    config: &SimConfig,
) -> TbResult<bool> {
    let time_start = time::Instant::now();
    for test in suite.iter_mut() {
        run_test(factory(config), test, config);
    }
    let duration = time_start.elapsed().as_secs_f64();

    log::info!("{}\n{}", suite.name(), suite.summary());
    let failed = suite.iter().filter(|t| !t.passed()).count();
    log::info!(
        "{} tests, {} failed, real time {:.3} s",
        suite.len(),
        failed,
        duration
    );

    if let Some(path) = &config.junit_path {
        junit::create_junit_xml(suite, path)?;
        log::info!("JUnit report written to {}", path.display());
    }
    Ok(suite.passed())
}

/// Generates `main` for a binary that runs the listed test functions against
/// the design built by `$factory`, with configuration from the environment.
#[macro_export]
macro_rules! run_native {
    ($factory:expr; $( $i:ident ),+ $(,)?) => {
        fn main() -> std::process::ExitCode {
            $crate::init_logging();
            let config = $crate::SimConfig::global().clone();
            let factory = $factory;
            let mut suite = $crate::test::TestSuite::new(std::module_path!());
            $(suite.push($crate::test::Test::new(stringify!($i), |sim_root| {
                $crate::futures::FutureExt::boxed($i(sim_root))
            }));)+

            let build = |config: &$crate::SimConfig| -> Box<dyn $crate::native::Design> {
                Box::new(factory(config))
            };
            match $crate::run_suite(&build, &mut suite, &config) {
                Ok(true) => std::process::ExitCode::SUCCESS,
                Ok(false) => std::process::ExitCode::FAILURE,
                Err(e) => {
                    $crate::log::error!("{}", e);
                    std::process::ExitCode::FAILURE
                }
            }
        }
    };
}
