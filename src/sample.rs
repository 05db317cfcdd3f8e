use futures::StreamExt;
use futures_channel::mpsc::{self, TryRecvError};
use std::fmt;

use crate::{TbError, TbResult};

/// Inputs driven into the counter for one clock edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControlVector {
    pub reset: bool,
    pub load: bool,
    pub load_value: u64,
    pub enable: bool,
}

impl fmt::Display for ControlVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rst={} load={} load_value={} en={}",
            u8::from(self.reset),
            u8::from(self.load),
            self.load_value,
            u8::from(self.enable)
        )
    }
}

/// One observation per clock edge: the inputs that edge sampled and the output it produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sample {
    /// 1-based, one per edge, no gaps.
    pub cycle: u64,
    pub inputs: ControlVector,
    pub observed: u64,
}

/// Ordered hand-off from the monitor to the scoreboard.
pub fn sample_channel() -> (SampleSender, SampleReceiver) {
    let (tx, rx) = mpsc::unbounded();
    (SampleSender(tx), SampleReceiver(rx))
}

#[derive(Debug)]
pub struct SampleSender(mpsc::UnboundedSender<Sample>);

impl SampleSender {
    pub fn push(&self, sample: Sample) -> TbResult {
        self.0
            .unbounded_send(sample)
            .map_err(|_| TbError::ChannelClosed)
    }
}

#[derive(Debug)]
pub struct SampleReceiver(mpsc::UnboundedReceiver<Sample>);

impl SampleReceiver {
    /// Waits until the next sample is available.
    pub async fn pop(&mut self) -> TbResult<Sample> {
        self.0.next().await.ok_or(TbError::ChannelClosed)
    }

    /// Returns `Ok(None)` when the channel is empty but still open.
    pub fn try_pop(&mut self) -> TbResult<Option<Sample>> {
        match self.0.try_recv() {
            Ok(sample) => Ok(Some(sample)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Closed) => Err(TbError::ChannelClosed),
        }
    }
}
