use counter_tb::counter::LOAD;
use counter_tb::driver::CounterDriver;
use counter_tb::log::LevelFilter;
use counter_tb::model::CounterModel;
use counter_tb::monitor::CounterMonitor;
use counter_tb::prelude::*;
use counter_tb::sample::sample_channel;
use counter_tb::scenarios::*;
use counter_tb::scoreboard::Scoreboard;
use counter_tb::testbench::start_clock;
use proptest::prelude::*;

// info level, so the suite summary table is formatted like in the binary
fn init() {
    let _ = env_logger::builder()
        .is_test(true)
        .filter_level(LevelFilter::Info)
        .try_init();
}

fn run(design: impl Design + 'static, name: &str, f: TestFn, config: &SimConfig) -> Test {
    init();
    let mut test = Test::new(name, f);
    run_test(Box::new(design), &mut test, config);
    test
}

fn run_counter(width: u32, name: &str, f: TestFn) -> TbResult {
    let config = SimConfig { width, ..SimConfig::default() };
    run(CounterRtl::new(width), name, f, &config)
        .result
        .unwrap_or(Err(TbError::TaskCancelled))
}

macro_rules! scenario_tests {
    ($( $name:ident => $width:expr ),+ $(,)?) => {
        $(
            #[test]
            fn $name() {
                run_counter($width, stringify!($name), |dut| super::$name(dut).boxed()).unwrap();
            }
        )+
    };
}

mod width8 {
    use super::*;
    scenario_tests! {
        counter_demo_components => 8,
        counter_reset_then_enable => 8,
        counter_load_value => 8,
        counter_load_then_count => 8,
        counter_wraparound => 8,
        counter_free_running => 8,
        counter_hold => 8,
        counter_load_direct => 8,
        counter_step_check => 8,
        counter_random => 8,
    }
}

mod width4 {
    use super::*;
    scenario_tests! {
        counter_load_value => 4,
        counter_wraparound => 4,
        counter_free_running => 4,
        counter_random => 4,
    }
}

#[test]
fn wide_counter_counts_without_wrapping() {
    run_counter(16, "free_running_16", |dut| counter_free_running(dut).boxed()).unwrap();
}

async fn ordered_samples(dut: SimObject) -> TbResult {
    let config = counter_tb::config::current();
    start_clock(dut.c("clk")?, config.clock_period, &config.clock_unit)?;
    let (tx, mut rx) = sample_channel();
    Task::spawn(CounterMonitor::new(dut, tx)?.run(), "monitor");
    let mut driver = CounterDriver::new(dut)?;

    driver.reset(2).await?;
    driver.set_enable(true, 20).await?;
    assert_eq!(driver.edges(), 23);

    for cycle in 1..=23u64 {
        let sample = rx.pop().await?;
        assert_eq!(sample.cycle, cycle);
        assert_eq!(sample.observed, cycle.saturating_sub(3));
    }
    // every sample has been consumed, the next edge hasn't happened yet
    assert!(rx.try_pop()?.is_none());
    Ok(())
}

#[test]
fn monitor_delivers_one_sample_per_edge_in_order() {
    let test = run(CounterRtl::new(8), "ordered", |dut| ordered_samples(dut).boxed(), &SimConfig::default());
    assert!(test.passed(), "{:?}", test.result);
}

/// Counter with the load path broken: load is never seen as asserted.
struct NoLoadCounter(CounterRtl);

impl Design for NoLoadCounter {
    fn name(&self) -> &str {
        self.0.name()
    }
    fn ports(&self) -> Vec<PortDecl> {
        self.0.ports()
    }
    fn clock(&self) -> usize {
        self.0.clock()
    }
    fn posedge(&mut self, values: &[Option<u64>]) -> Vec<(usize, Option<u64>)> {
        let mut values = values.to_vec();
        values[LOAD] = Some(0);
        self.0.posedge(&values)
    }
}

#[test]
fn broken_load_fails_at_the_first_loading_cycle() {
    let test = run(
        NoLoadCounter(CounterRtl::new(8)),
        "no_load",
        |dut| counter_load_value(dut).boxed(),
        &SimConfig::default(),
    );
    let err = test.result.unwrap().unwrap_err();
    let m = err.mismatch().copied().unwrap();
    assert_eq!((m.cycle, m.expected, m.observed), (4, 42, 0));
    assert_eq!(
        err.to_string(),
        "Mismatch at cycle 4: rst=0 load=1 load_value=42 en=0 expected=42 got=0"
    );
}

async fn wait_for_missing_samples(dut: SimObject) -> TbResult {
    let config = counter_tb::config::current();
    start_clock(dut.c("clk")?, config.clock_period, &config.clock_unit)?;
    // the sender stays open but no monitor feeds it
    let (_tx, rx) = sample_channel();
    let mut scoreboard = Scoreboard::new(CounterModel::new(8), rx);
    scoreboard.check_n_samples(1).await?;
    Ok(())
}

async fn drain_past_the_driver(dut: SimObject) -> TbResult {
    let mut tb = CounterTb::new(dut, &counter_tb::config::current())?;
    tb.driver.reset(1).await?;
    // the monitor keeps sampling idle edges, so more than the driver's two are available
    tb.scoreboard.check_n_samples(5).await?;
    assert_eq!(tb.check().await?, 5);
    tb.expect_count(0)
}

#[test]
fn checking_after_draining_ahead_of_the_driver_is_a_no_op() {
    let test = run(CounterRtl::new(8), "drain_ahead", |dut| drain_past_the_driver(dut).boxed(), &SimConfig::default());
    assert!(test.passed(), "{:?}", test.result);
}

#[test]
fn waiting_past_the_time_limit_times_out() {
    let config = SimConfig { max_sim_time_ns: 1_000, ..SimConfig::default() };
    let test = run(CounterRtl::new(8), "stall", |dut| wait_for_missing_samples(dut).boxed(), &config);
    assert!(matches!(test.result, Some(Err(TbError::Timeout { limit_ns: 1_000 }))));
    assert!(test.sim_time_ns <= 1_000.0);
}

async fn edge_without_clock(dut: SimObject) -> TbResult {
    dut.c("clk")?.rising_edge().await
}

#[test]
fn waiting_with_nothing_scheduled_starves() {
    let test = run(CounterRtl::new(8), "no_clock", |dut| edge_without_clock(dut).boxed(), &SimConfig::default());
    assert!(matches!(test.result, Some(Err(TbError::Starved { time_ns: 0 }))));
}

async fn write_when_settled(dut: SimObject) -> TbResult {
    let en = dut.c("en")?.input();
    Trigger::read_only().await?;
    match en.set(1) {
        Err(TbError::ReadOnlyWrite(name)) => assert_eq!(name, "counter.en"),
        other => panic!("expected a read-only write error, got {:?}", other),
    }
    Trigger::next_time_step().await.ok();
    Ok(())
}

#[test]
fn writes_are_rejected_in_the_read_only_phase() {
    let config = SimConfig::default();
    let f: TestFn = |dut| {
        async move {
            // keep a timer pending so there is a next time step
            Task::spawn(async { Trigger::timer(1, "ns")?.await }, "timer");
            write_when_settled(dut).await
        }
        .boxed()
    };
    let test = run(CounterRtl::new(8), "read_only", f, &config);
    assert!(test.passed(), "{:?}", test.result);
}

async fn outputs_and_undefined(dut: SimObject) -> TbResult {
    let count = dut.c("count")?;
    assert_eq!(count.value()?, None);
    assert_eq!(count.probe().u64()?, 0);
    assert!(matches!(count.set(1), Err(TbError::NotWritable(_))));
    assert!(matches!(dut.c("missing"), Err(TbError::UnknownSignal(_))));
    assert_eq!(count.size(), 8);
    Ok(())
}

#[test]
fn outputs_are_read_only_and_start_undefined() {
    let test = run(CounterRtl::new(8), "outputs", |dut| outputs_and_undefined(dut).boxed(), &SimConfig::default());
    assert!(test.passed(), "{:?}", test.result);
}

async fn zero_cycles(dut: SimObject) -> TbResult {
    let mut driver = CounterDriver::new(dut)?;
    driver.set_enable(true, 0).await?;
    Ok(())
}

#[test]
fn zero_cycle_operations_are_rejected() {
    let test = run(CounterRtl::new(8), "zero", |dut| zero_cycles(dut).boxed(), &SimConfig::default());
    assert!(matches!(test.result, Some(Err(TbError::InvalidCycles(0)))));
}

#[test]
fn parallel_tests_do_not_share_state() {
    let handles: Vec<_> = (0..4u32)
        .map(|i| {
            std::thread::spawn(move || {
                let width = 4 + i * 4;
                run_counter(width, "parallel", |dut| counter_free_running(dut).boxed())
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap().unwrap();
    }
}

#[test]
fn suite_runs_every_test_and_writes_junit() {
    init();
    let dir = std::env::temp_dir().join(format!("counter-tb-junit-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("results.xml");
    let config = SimConfig { junit_path: Some(path.clone()), ..SimConfig::default() };

    let mut suite = TestSuite::new("suite");
    suite.push(Test::new("counter_hold", |dut| counter_hold(dut).boxed()));
    suite.push(Test::new("no_clock", |dut| edge_without_clock(dut).boxed()));
    let factory = |config: &SimConfig| -> Box<dyn Design> { Box::new(CounterRtl::new(config.width)) };

    let passed = run_suite(&factory, &mut suite, &config).unwrap();
    assert!(!passed);
    let summary = suite.summary().to_string();
    assert!(summary.contains("PASS"));
    assert!(summary.contains("FAIL"));
    assert!(suite.get("counter_hold").unwrap().passed());
    assert!(!suite.get("no_clock").unwrap().passed());

    let xml = std::fs::read_to_string(&path).unwrap();
    assert!(xml.contains("counter_hold"));
    assert!(xml.contains("no_clock"));
    let _ = std::fs::remove_dir_all(&dir);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn random_stimulus_matches_the_model(seed: u64, width in 1u32..=12) {
        init();
        let config = SimConfig { seed, width, ..SimConfig::default() };
        let mut test = Test::new("random", |dut| counter_random(dut).boxed());
        run_test(Box::new(CounterRtl::new(width)), &mut test, &config);
        prop_assert!(test.passed(), "{:?}", test.result);
    }
}
