use intmap::IntMap;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll, Waker};

use crate::executor;
use crate::signal::SimObject;
use crate::sim_if::{sim, Handle, SimCallback};
use crate::TbResult;

thread_local! {
    static REGISTRY: RefCell<Registry> = RefCell::new(Registry::new());
}

struct Registry {
    // key is signal handle
    edges: IntMap<CallbackHandles>,
    // key is absolute callback time
    timers: IntMap<CallbackHandles>,
    read_only: CallbackHandles,
    read_write: CallbackHandles,
    next_time_step: CallbackHandles,
}

impl Registry {
    fn new() -> Self {
        Self {
            edges: IntMap::new(),
            timers: IntMap::new(),
            read_only: CallbackHandles::default(),
            read_write: CallbackHandles::default(),
            next_time_step: CallbackHandles::default(),
        }
    }
}

#[derive(Default)]
struct CallbackHandles {
    handle: Option<usize>,
    callbacks: VecDeque<TrigShared>,
}

impl CallbackHandles {
    fn take(&mut self) -> VecDeque<TrigShared> {
        self.handle = None; // the callback fired, so its handle is spent
        std::mem::take(&mut self.callbacks)
    }
}

#[derive(PartialEq, Clone, Copy, Debug)]
pub enum EdgeKind {
    Any,
    Rising,
    Falling,
}

/// Drops all parked wakers; the simulator they were registered with is gone.
pub(crate) fn reset() {
    REGISTRY.with(|r| r.replace(Registry::new()));
}

#[derive(Debug, Clone)]
struct TrigShared {
    waker: Waker,
    // Edge callbacks are shared per signal, so each waiter remembers which edge it wants.
    edge_kind: EdgeKind,
}

#[derive(Clone, Debug)]
enum TrigKind {
    Edge(Handle, EdgeKind),
    Timer(u64),
    ReadWrite,
    ReadOnly,
    NextTimeStep,
}

/// A simulation event a task can await.
#[derive(Clone, Debug)]
pub struct Trigger {
    kind: TrigKind,
    awaited: bool,
}

impl Trigger {
    fn new(kind: TrigKind) -> Self {
        Trigger {
            kind,
            awaited: false,
        }
    }
    pub fn timer(time: u64, unit: &str) -> TbResult<Self> {
        let steps = sim()?.get_sim_steps(time as f64, unit)?;
        Ok(Trigger::timer_steps(steps))
    }
    pub fn timer_steps(steps: u64) -> Self {
        Trigger::new(TrigKind::Timer(steps))
    }
    pub async fn timer_ro(time: u64, unit: &str) -> TbResult {
        Trigger::timer(time, unit)?.await?;
        Trigger::read_only().await
    }
    pub async fn timer_rw(time: u64, unit: &str) -> TbResult {
        Trigger::timer(time, unit)?.await?;
        Trigger::read_write().await
    }
    pub fn edge(signal: SimObject) -> Self {
        Trigger::new(TrigKind::Edge(signal.handle(), EdgeKind::Any))
    }
    pub fn rising_edge(signal: SimObject) -> Self {
        Trigger::new(TrigKind::Edge(signal.handle(), EdgeKind::Rising))
    }
    pub fn falling_edge(signal: SimObject) -> Self {
        Trigger::new(TrigKind::Edge(signal.handle(), EdgeKind::Falling))
    }
    /// After all edge activity of the current time step; writes are still allowed.
    pub fn read_write() -> Self {
        Trigger::new(TrigKind::ReadWrite)
    }
    /// Settled phase: every signal of the current time step has its final value.
    pub fn read_only() -> Self {
        Trigger::new(TrigKind::ReadOnly)
    }
    /// Start of the next time step; inputs written here are seen by the next edge.
    pub fn next_time_step() -> Self {
        Trigger::new(TrigKind::NextTimeStep)
    }

    fn register(&self, waker: &Waker) -> TbResult {
        let sim = sim()?;
        let mut shared = TrigShared {
            waker: waker.clone(),
            edge_kind: EdgeKind::Any,
        };
        REGISTRY.with(|r| {
            let mut r = r.borrow_mut();
            let (slot, cb) = match self.kind {
                TrigKind::ReadWrite => (&mut r.read_write, SimCallback::ReadWrite),
                TrigKind::ReadOnly => (&mut r.read_only, SimCallback::ReadOnly),
                TrigKind::NextTimeStep => (&mut r.next_time_step, SimCallback::NextTimeStep),
                TrigKind::Timer(t) => {
                    // Add current time to key since the simulator reports absolute time, not delta
                    let abs_time = t + sim.get_sim_time_steps();
                    if let Some(callbacks) = r.timers.get_mut(abs_time) {
                        callbacks.callbacks.push_back(shared);
                    } else {
                        let handle = sim.register_callback(SimCallback::Time(t))?;
                        let mut callbacks = CallbackHandles::default();
                        callbacks.handle = Some(handle);
                        callbacks.callbacks.push_back(shared);
                        r.timers.insert(abs_time, callbacks);
                    }
                    return Ok(());
                }
                TrigKind::Edge(sig_hdl, edge_kind) => {
                    shared.edge_kind = edge_kind;
                    if let Some(callbacks) = r.edges.get_mut(sig_hdl as u64) {
                        callbacks.callbacks.push_back(shared);
                    } else {
                        let handle = sim.register_callback(SimCallback::Edge(sig_hdl))?;
                        let mut callbacks = CallbackHandles::default();
                        callbacks.handle = Some(handle);
                        callbacks.callbacks.push_back(shared);
                        r.edges.insert(sig_hdl as u64, callbacks);
                    }
                    return Ok(());
                }
            };
            slot.callbacks.push_back(shared);
            if slot.handle.is_none() {
                slot.handle = Some(sim.register_callback(cb)?);
            }
            Ok(())
        })
    }
}

impl Future for Trigger {
    type Output = TbResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        // A trigger is registered once; the next poll comes from the waker signalling it fired.
        if self.awaited {
            Poll::Ready(Ok(()))
        } else {
            self.awaited = true;
            match self.register(cx.waker()) {
                Ok(()) => Poll::Pending,
                Err(e) => Poll::Ready(Err(e)),
            }
        }
    }
}

/// Called by the simulator when a registered callback fires; wakes and runs the waiting tasks.
pub(crate) fn react(cb: SimCallback, edge: Option<EdgeKind>) {
    let mut cancel = None;
    let vec_wake = REGISTRY.with(|r| {
        let mut r = r.borrow_mut();
        match cb {
            SimCallback::ReadWrite => r.read_write.take(),
            SimCallback::ReadOnly => r.read_only.take(),
            SimCallback::NextTimeStep => r.next_time_step.take(),
            SimCallback::Time(t) => r
                .timers
                .remove(t)
                .map(|callbacks| callbacks.callbacks)
                .unwrap_or_default(),
            SimCallback::Edge(sig_hdl) => {
                let Some(mut callbacks) = r.edges.remove(sig_hdl as u64) else {
                    return VecDeque::new();
                };
                let edge = edge.unwrap_or(EdgeKind::Any);
                let (wake, resched): (VecDeque<_>, VecDeque<_>) =
                    callbacks.callbacks.drain(..).partition(|trig| {
                        edge == EdgeKind::Any
                            || trig.edge_kind == EdgeKind::Any
                            || trig.edge_kind == edge
                    });
                if resched.is_empty() {
                    // if no callbacks are remaining, cancel
                    cancel = callbacks.handle;
                } else {
                    callbacks.callbacks = resched;
                    r.edges.insert(sig_hdl as u64, callbacks);
                }
                wake
            }
        }
    });

    if let Some(handle) = cancel {
        if let Err(e) = sim().and_then(|s| s.cancel_callback(handle)) {
            log::warn!("failed to cancel edge callback {}: {}", handle, e);
        }
    }
    if vec_wake.is_empty() {
        log::trace!("callback {:?} fired without waiters", cb);
        return;
    }
    for shared in vec_wake {
        shared.waker.wake();
    }
    // execute woken tasks
    executor::run_once();
}
