use crate::error::Mismatch;
use crate::model::CounterModel;
use crate::prelude::*;
use crate::sample::{Sample, SampleReceiver};

/// Replays monitored samples through the reference model, in arrival order.
///
/// The first mismatch is latched: once the model and the DUT have diverged
/// every later comparison is meaningless, so all further checks report it.
#[derive(Debug)]
pub struct Scoreboard {
    model: CounterModel,
    rx: SampleReceiver,
    checked: u64,
    failed: Option<Mismatch>,
}

impl Scoreboard {
    pub fn new(model: CounterModel, rx: SampleReceiver) -> Self {
        Self {
            model,
            rx,
            checked: 0,
            failed: None,
        }
    }

    pub fn model(&self) -> &CounterModel {
        &self.model
    }

    /// Samples that matched so far.
    pub fn checked(&self) -> u64 {
        self.checked
    }

    pub fn passed(&self) -> bool {
        self.failed.is_none()
    }

    /// Steps the model with the sample's inputs and compares the new count.
    pub fn check(&mut self, sample: &Sample) -> Result<(), Mismatch> {
        if let Some(m) = self.failed {
            return Err(m);
        }
        self.model.step_with(&sample.inputs);
        let expected = self.model.count();
        if sample.observed != expected {
            let m = Mismatch {
                cycle: sample.cycle,
                inputs: sample.inputs,
                expected,
                observed: sample.observed,
            };
            log::error!("{} scoreboard: {}", timestamp(), m);
            self.failed = Some(m);
            return Err(m);
        }
        self.checked += 1;
        Ok(())
    }

    /// Drains exactly `n` samples, waiting for each as needed.
    pub async fn check_n_samples(&mut self, n: u64) -> TbResult<u64> {
        for _ in 0..n {
            let sample = self.rx.pop().await?;
            self.check(&sample)?;
        }
        log::info!("{} scoreboard: {}", timestamp(), self.result_str());
        Ok(self.checked)
    }

    pub fn result_str(&self) -> String {
        match &self.failed {
            None => format!("checked={}, errors=0, count={}", self.checked, self.model.count()),
            Some(m) => format!("checked={}, errors=1, first: {}", self.checked, m),
        }
    }
}
