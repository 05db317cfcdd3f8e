use crate::driver::CounterDriver;
use crate::model::CounterModel;
use crate::monitor::CounterMonitor;
use crate::prelude::*;
use crate::sample::sample_channel;
use crate::scoreboard::Scoreboard;
use crate::sim_if::{self, sim};

/*
 * CLOCK
 */
/// Toggles `clk` forever, low half first.
pub async fn clock(clk: SimObject, period_steps: u64) -> TbResult {
    let high_t = period_steps / 2;
    let low_t = period_steps - high_t;
    loop {
        clk.set(0)?;
        Trigger::timer_steps(low_t).await?;
        clk.set(1)?;
        Trigger::timer_steps(high_t).await?;
    }
}

/// Forks [`clock`] with a period given in time units.
pub fn start_clock(clk: SimObject, period: u64, unit: &str) -> TbResult<JoinHandle> {
    let period_steps = sim()?.get_sim_steps(period as f64, unit)?;
    if period_steps % 2 != 0 {
        sim_if::log(&format!(
            "Warning: Clock period {period}{unit} not dividable by 2. High time will be {high} steps; low time will be {low} steps.",
            period = period,
            unit = unit,
            high = period_steps / 2,
            low = period_steps - period_steps / 2
        ));
    }
    Ok(Task::spawn(clock(clk, period_steps), "clock"))
}

/// Clock, driver, monitor and scoreboard wired around one counter instance.
pub struct CounterTb {
    pub dut: SimObject,
    pub driver: CounterDriver,
    pub scoreboard: Scoreboard,
    count: Probe,
}

impl CounterTb {
    /// Starts the clock and the monitor, so the monitor is already waiting
    /// when the driver issues its first edge.
    pub fn new(dut: SimObject, config: &SimConfig) -> TbResult<Self> {
        let clk = dut.c("clk")?;
        start_clock(clk, config.clock_period, &config.clock_unit)?;

        let (tx, rx) = sample_channel();
        Task::spawn(CounterMonitor::new(dut, tx)?.run(), "monitor");

        let count = dut.c("count")?;
        let model = CounterModel::new(count.size());
        Ok(Self {
            dut,
            driver: CounterDriver::new(dut)?,
            scoreboard: Scoreboard::new(model, rx),
            count: count.probe(),
        })
    }

    pub fn width(&self) -> u32 {
        self.count.width()
    }

    /// Checks every sample driven so far that the scoreboard hasn't seen yet.
    pub async fn check(&mut self) -> TbResult<u64> {
        let n = self.driver.edges().saturating_sub(self.scoreboard.checked());
        self.scoreboard.check_n_samples(n).await
    }

    /// Current DUT output; undefined reads as zero.
    pub fn count(&self) -> TbResult<u64> {
        self.count.u64()
    }

    pub fn expect_count(&self, expected: u64) -> TbResult {
        let got = self.count()?;
        if got != expected {
            return Err(TbError::Check(format!("expected count={} got={}", expected, got)));
        }
        Ok(())
    }
}
