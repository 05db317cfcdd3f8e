//! Regression scenarios for the counter, runnable with [`crate::run_test`] or
//! listed in [`crate::run_native`].

use rand::Rng;

use crate::config;
use crate::model::{width_mask, CounterModel};
use crate::prelude::*;
use crate::testbench::{start_clock, CounterTb};
use crate::utils;

fn check_eq(what: &str, expected: u64, got: u64) -> TbResult {
    if expected != got {
        return Err(TbError::Check(format!("{}: expected {}, got {}", what, expected, got)));
    }
    Ok(())
}

/// Clock, reset, driver, monitor, model and scoreboard together, with load.
pub async fn counter_demo_components(dut: SimObject) -> TbResult {
    let mut tb = CounterTb::new(dut, &config::current())?;
    let mask = tb.scoreboard.model().mask();
    let d = &mut tb.driver;
    d.reset(2).await?;
    d.set_enable(false, 5).await?;
    d.set_enable(true, 10).await?;
    d.set_enable(false, 3).await?;
    d.set_reset(true)?;
    d.set_enable(true, 1).await?;
    d.set_reset(false)?;
    d.set_enable(true, 4).await?;
    d.set_load(100, 1).await?;
    d.set_enable(true, 2).await?;
    let checked = tb.check().await?;
    check_eq("samples checked", 29, checked)?;
    tb.expect_count(((100 & mask) + 2) & mask)
}

/// Reset for two cycles, then count one.
pub async fn counter_reset_then_enable(dut: SimObject) -> TbResult {
    let mut tb = CounterTb::new(dut, &config::current())?;
    tb.driver.reset(2).await?;
    tb.driver.set_enable(true, 1).await?;
    check_eq("samples checked", 4, tb.check().await?)?;
    tb.expect_count(1)
}

pub async fn counter_load_value(dut: SimObject) -> TbResult {
    let mut tb = CounterTb::new(dut, &config::current())?;
    let mask = tb.scoreboard.model().mask();
    tb.driver.reset(2).await?;
    tb.driver.set_load(42, 1).await?;
    tb.check().await?;
    tb.expect_count(42 & mask)
}

pub async fn counter_load_then_count(dut: SimObject) -> TbResult {
    let mut tb = CounterTb::new(dut, &config::current())?;
    let mask = tb.scoreboard.model().mask();
    tb.driver.reset(2).await?;
    tb.driver.set_load(100, 1).await?;
    tb.driver.set_enable(true, 2).await?;
    tb.check().await?;
    tb.expect_count(((100 & mask) + 2) & mask)
}

/// Counting up from the all-ones value wraps to zero.
pub async fn counter_wraparound(dut: SimObject) -> TbResult {
    let mut tb = CounterTb::new(dut, &config::current())?;
    let mask = tb.scoreboard.model().mask();
    tb.driver.reset(1).await?;
    tb.driver.set_load(mask, 1).await?;
    tb.expect_count(mask)?;
    tb.driver.set_enable(true, 1).await?;
    tb.check().await?;
    tb.expect_count(0)
}

/// Free-running count past the top more than once.
pub async fn counter_free_running(dut: SimObject) -> TbResult {
    let mut tb = CounterTb::new(dut, &config::current())?;
    let modulus = tb.scoreboard.model().mask() as u128 + 1;
    tb.driver.reset(1).await?;
    tb.driver.set_enable(true, 600).await?;
    tb.check().await?;
    tb.expect_count((600 % modulus) as u64)
}

/// Enable deasserted holds the count on every cycle, not just the last.
pub async fn counter_hold(dut: SimObject) -> TbResult {
    let mut tb = CounterTb::new(dut, &config::current())?;
    let mask = tb.scoreboard.model().mask();
    tb.driver.reset(1).await?;
    tb.driver.set_load(33, 1).await?;
    tb.driver.set_enable(false, 7).await?;
    check_eq("samples checked", 10, tb.check().await?)?;
    tb.expect_count(33 & mask)
}

/// Drives the pins directly, without the driver, and checks the load result
/// in the read-only phase.
pub async fn counter_load_direct(dut: SimObject) -> TbResult {
    let config = config::current();
    let clk = dut.c("clk")?;
    start_clock(clk, config.clock_period, &config.clock_unit)?;
    let rst = dut.c("rst")?.input();
    let load = dut.c("load")?.input();
    let load_value = dut.c("load_value")?.input();
    let en = dut.c("en")?.input();
    let count = dut.c("count")?.probe();

    rst.set(1)?;
    load.set(0)?;
    load_value.set(0)?;
    en.set(0)?;
    utils::clock_cycles(clk, 2).await?;
    rst.set(0)?;
    clk.rising_edge().await?;

    load.set(1)?;
    load_value.set(42)?;
    clk.rising_edge().await?;
    load.set(0)?;

    // After one clock, the count should be 42
    Trigger::read_only().await?;
    check_eq("count after load", 42 & width_mask(count.width()), count.u64()?)
}

/// Lock-step check: step the model, wait for the edge, compare when settled.
pub async fn counter_step_check(dut: SimObject) -> TbResult {
    let config = config::current();
    let clk = dut.c("clk")?;
    start_clock(clk, config.clock_period, &config.clock_unit)?;
    let rst = dut.c("rst")?.input();
    let load = dut.c("load")?.input();
    let load_value = dut.c("load_value")?.input();
    let en = dut.c("en")?.input();
    let count = dut.c("count")?.probe();
    let mut model = CounterModel::new(count.width());

    rst.set(1)?;
    load.set(0)?;
    load_value.set(0)?;
    en.set(0)?;
    utils::clock_cycles(clk, 2).await?;
    rst.set(0)?;
    clk.rising_edge_ro().await?;
    check_eq("count after reset", 0, count.u64()?)?;

    // leave the read-only phase before driving
    Trigger::next_time_step().await?;
    en.set(1)?;
    model.step(false, false, 0, true);
    clk.rising_edge_ro().await?;
    check_eq("cycle 1", model.count(), count.u64()?)?;

    Trigger::next_time_step().await?;
    en.set(0)?;
    load.set(1)?;
    load_value.set(100)?;
    model.step(false, true, 100, false);
    clk.rising_edge().await?;
    load.set(0)?;
    Trigger::read_only().await?;
    check_eq("after load", model.count(), count.u64()?)?;

    Trigger::next_time_step().await?;
    en.set(1)?;
    for cycle in 3..5 {
        model.step(false, false, 0, true);
        clk.rising_edge_ro().await?;
        check_eq(&format!("cycle {}", cycle), model.count(), count.u64()?)?;
        Trigger::next_time_step().await?;
    }
    Ok(())
}

/// Seeded random stimulus through the driver, checked by the scoreboard.
pub async fn counter_random(dut: SimObject) -> TbResult {
    let config = config::current();
    let mut tb = CounterTb::new(dut, &config)?;
    let mask = tb.scoreboard.model().mask();
    let mut rng = utils::seeded_rng(config.seed);
    log::info!("{} random stimulus with seed {}", timestamp(), config.seed);

    tb.driver.reset(1).await?;
    for _ in 0..64 {
        let op = rng.gen_range(0..10u32);
        let cycles = rng.gen_range(1..=6u32);
        match op {
            0 => {
                tb.driver.reset(cycles).await?;
            }
            1 | 2 => {
                // values past the mask exercise truncation
                let value = rng.gen_range(0..=mask.saturating_mul(2));
                tb.driver.set_load(value, cycles).await?;
            }
            3 | 4 => {
                tb.driver.set_enable(false, cycles).await?;
            }
            _ => {
                tb.driver.set_enable(true, cycles).await?;
            }
        }
    }
    tb.check().await?;
    tb.expect_count(tb.scoreboard.model().count())
}
