pub use crate::config::SimConfig;
pub use crate::counter::CounterRtl;
pub use crate::executor::{JoinHandle, Task};
pub use crate::native::{Design, NativeSim, PortDecl};
pub use crate::signal::{InputPort, Probe, SimObject};
pub use crate::sim_if::{sim, timestamp};
pub use crate::test::{Test, TestFn, TestSuite};
pub use crate::testbench::CounterTb;
pub use crate::trigger::Trigger;
pub use crate::{run_suite, run_test, Mismatch, TbError, TbResult};
pub use futures::future::FutureExt;
