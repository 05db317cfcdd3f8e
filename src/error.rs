use thiserror::Error;

use crate::sample::ControlVector;

pub type TbResult<T = ()> = Result<T, TbError>;

/// Diagnostic for the first cycle at which the DUT and the reference model disagree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("Mismatch at cycle {cycle}: {inputs} expected={expected} got={observed}")]
pub struct Mismatch {
    pub cycle: u64,
    pub inputs: ControlVector,
    pub expected: u64,
    pub observed: u64,
}

#[derive(Debug, Error)]
pub enum TbError {
    #[error("{0}")]
    Mismatch(#[from] Mismatch),
    #[error("check failed: {0}")]
    Check(String),
    #[error("simulation time limit of {limit_ns} ns reached before the test completed")]
    Timeout { limit_ns: u64 },
    #[error("simulation ran out of events at {time_ns} ns before the test completed")]
    Starved { time_ns: u64 },
    #[error("no simulation object named '{0}'")]
    UnknownSignal(String),
    #[error("write to '{0}' attempted in the read-only phase")]
    ReadOnlyWrite(String),
    #[error("'{0}' is not writable from the testbench")]
    NotWritable(String),
    #[error("cycle count must be at least 1, got {0}")]
    InvalidCycles(u32),
    #[error("unknown time unit '{0}'")]
    UnknownUnit(String),
    #[error("can't convert {time} {unit} to sim steps without rounding (sim precision: {precision})")]
    Rounding {
        time: f64,
        unit: String,
        precision: String,
    },
    #[error("sample channel closed")]
    ChannelClosed,
    #[error("task was cancelled before it completed")]
    TaskCancelled,
    #[error("no simulator is running on this thread")]
    NoSimulator,
    #[error("failed to write report: {0}")]
    Report(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl TbError {
    pub fn mismatch(&self) -> Option<&Mismatch> {
        match self {
            TbError::Mismatch(m) => Some(m),
            _ => None,
        }
    }
}
