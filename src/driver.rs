use crate::prelude::*;
use crate::utils;

/// Drives the counter's control inputs, edge-aligned to its clock.
///
/// Every operation writes its inputs, waits out its clock edges and returns
/// from the next time step, where writes are picked up by the following edge.
/// Each returns the number of edges it consumed; [`CounterDriver::edges`] is
/// the running total, which is exactly the number of samples the monitor
/// produces for the driven sequence.
#[derive(Debug)]
pub struct CounterDriver {
    clk: SimObject,
    rst: InputPort,
    load: InputPort,
    load_value: InputPort,
    en: InputPort,
    edges: u64,
}

fn check_cycles(cycles: u32) -> TbResult {
    if cycles == 0 {
        return Err(TbError::InvalidCycles(cycles));
    }
    Ok(())
}

impl CounterDriver {
    pub fn new(dut: SimObject) -> TbResult<Self> {
        Ok(Self {
            clk: dut.c("clk")?,
            rst: dut.c("rst")?.input(),
            load: dut.c("load")?.input(),
            load_value: dut.c("load_value")?.input(),
            en: dut.c("en")?.input(),
            edges: 0,
        })
    }

    /// Total edges consumed by all operations so far.
    pub fn edges(&self) -> u64 {
        self.edges
    }

    async fn hold(&mut self, cycles: u32) -> TbResult {
        utils::clock_cycles(self.clk, cycles).await?;
        self.edges += u64::from(cycles);
        Ok(())
    }

    /// Holds reset for `cycles` edges, then releases it for one more.
    pub async fn reset(&mut self, cycles: u32) -> TbResult<u64> {
        check_cycles(cycles)?;
        log::debug!("{} driver: reset for {} cycles", timestamp(), cycles);
        self.rst.set_bool(true)?;
        self.load.set_bool(false)?;
        self.en.set_bool(false)?;
        self.hold(cycles).await?;
        self.rst.set_bool(false)?;
        self.hold(1).await?;
        Trigger::next_time_step().await?;
        Ok(u64::from(cycles) + 1)
    }

    pub async fn set_enable(&mut self, en: bool, cycles: u32) -> TbResult<u64> {
        check_cycles(cycles)?;
        log::debug!("{} driver: en={} for {} cycles", timestamp(), u8::from(en), cycles);
        self.en.set_bool(en)?;
        self.load.set_bool(false)?;
        self.hold(cycles).await?;
        Trigger::next_time_step().await?;
        Ok(u64::from(cycles))
    }

    /// Loads `value` (truncated to the counter width by the DUT) for `cycles` edges.
    pub async fn set_load(&mut self, value: u64, cycles: u32) -> TbResult<u64> {
        check_cycles(cycles)?;
        log::debug!("{} driver: load {} for {} cycles", timestamp(), value, cycles);
        self.en.set_bool(false)?;
        self.load.set_bool(true)?;
        self.load_value.set(value)?;
        self.hold(cycles).await?;
        self.load.set_bool(false)?;
        Trigger::next_time_step().await?;
        Ok(u64::from(cycles))
    }

    /// Drives reset directly without consuming edges; the next operation's
    /// edges sample it.
    pub fn set_reset(&self, level: bool) -> TbResult {
        self.rst.set_bool(level)
    }
}
