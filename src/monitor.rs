use crate::prelude::*;
use crate::sample::{ControlVector, Sample, SampleSender};

/// Samples the counter once per rising edge and forwards what it saw.
///
/// Inputs are read as the edge wakes the monitor: deposits made by the driver
/// in response to the same edge are not applied yet, so these are the values
/// the edge sampled. The output is read in the read-only phase, after the
/// registered update of that edge has propagated.
#[derive(Debug)]
pub struct CounterMonitor {
    clk: SimObject,
    rst: Probe,
    load: Probe,
    load_value: Probe,
    en: Probe,
    count: Probe,
    tx: SampleSender,
    cycle: u64,
}

impl CounterMonitor {
    pub fn new(dut: SimObject, tx: SampleSender) -> TbResult<Self> {
        Ok(Self {
            clk: dut.c("clk")?,
            rst: dut.c("rst")?.probe(),
            load: dut.c("load")?.probe(),
            load_value: dut.c("load_value")?.probe(),
            en: dut.c("en")?.probe(),
            count: dut.c("count")?.probe(),
            tx,
            cycle: 0,
        })
    }

    fn inputs(&self) -> TbResult<ControlVector> {
        Ok(ControlVector {
            reset: self.rst.bool()?,
            load: self.load.bool()?,
            load_value: self.load_value.u64()?,
            enable: self.en.bool()?,
        })
    }

    /// Runs until the surrounding test tears it down.
    pub async fn run(mut self) -> TbResult {
        loop {
            self.clk.rising_edge().await?;
            let inputs = self.inputs()?;
            Trigger::read_only().await?;
            self.cycle += 1;
            let sample = Sample {
                cycle: self.cycle,
                inputs,
                observed: self.count.u64()?,
            };
            log::trace!("{} monitor: {:?}", timestamp(), sample);
            self.tx.push(sample)?;
        }
    }
}
