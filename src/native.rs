//! In-process event-driven simulator hosting a behavioral [`Design`].
//!
//! Each time step runs the same phase sequence:
//!
//! 1. next-time-step callbacks (stable-input phase),
//! 2. timer callbacks,
//! 3. active region: deposited writes are applied, clock edges evaluate the
//!    design, edge waiters run, then registered outputs update (NBA),
//!    repeated together with read-write callbacks until nothing changes,
//! 4. read-only callbacks (settled phase, writes rejected),
//! 5. advance to the earliest pending timer.

use fnv::FnvHashMap;
use intmap::IntMap;
use std::cell::RefCell;
use std::collections::BTreeMap;

use crate::model::width_mask;
use crate::signal::SimObject;
use crate::sim_if::{Handle, ObjectKind, SimCallback, SimIf};
use crate::trigger::{self, EdgeKind};
use crate::{TbError, TbResult};

const ROOT: Handle = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

#[derive(Debug, Clone)]
pub struct PortDecl {
    pub name: &'static str,
    pub width: u32,
    pub direction: Direction,
}

impl PortDecl {
    pub fn input(name: &'static str, width: u32) -> Self {
        Self { name, width, direction: Direction::Input }
    }
    pub fn output(name: &'static str, width: u32) -> Self {
        Self { name, width, direction: Direction::Output }
    }
}

/// Behavioral model of a synchronous design, clocked on rising edges.
pub trait Design {
    fn name(&self) -> &str;
    fn ports(&self) -> Vec<PortDecl>;
    /// Index into [`Design::ports`] of the clock.
    fn clock(&self) -> usize;
    /// Samples `values` (indexed like `ports`, `None` = undefined) at a rising
    /// clock edge and returns the registered updates.
    fn posedge(&mut self, values: &[Option<u64>]) -> Vec<(usize, Option<u64>)>;
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Phase {
    Active,
    ReadOnly,
}

#[derive(Debug)]
enum CbKind {
    Time(u64),
    Edge(Handle),
    ReadWrite,
    ReadOnly,
    NextTimeStep,
}

struct Signal {
    full_name: String,
    width: u32,
    mask: u64,
    direction: Direction,
    value: Option<u64>,
}

struct Change {
    handle: Handle,
    old: Option<u64>,
    new: Option<u64>,
}

struct SimState {
    time: u64,
    phase: Phase,
    // handle is index + 1, handle 0 is the design scope
    signals: Vec<Signal>,
    names: FnvHashMap<String, Handle>,
    pending: Vec<(Handle, u64)>,
    nba: Vec<(Handle, Option<u64>)>,
    cb_cnt: usize,
    cb_map: IntMap<CbKind>,
    timers: BTreeMap<u64, usize>,
    edges: IntMap<usize>,
    read_write: Option<usize>,
    read_only: Option<usize>,
    next_time_step: Option<usize>,
}

impl SimState {
    fn new_cb_hdl(&mut self, kind: CbKind) -> usize {
        self.cb_cnt += 1;
        let hdl = self.cb_cnt;
        self.cb_map.insert(hdl as u64, kind);
        hdl
    }

    fn signal(&self, handle: Handle) -> TbResult<&Signal> {
        handle
            .checked_sub(1)
            .and_then(|i| self.signals.get(i))
            .ok_or_else(|| TbError::UnknownSignal(format!("<handle {}>", handle)))
    }

    fn apply(&mut self, handle: Handle, value: Option<u64>, changes: &mut Vec<Change>) {
        if let Some(sig) = handle.checked_sub(1).and_then(|i| self.signals.get_mut(i)) {
            let value = value.map(|v| v & sig.mask);
            if sig.value != value {
                changes.push(Change { handle, old: sig.value, new: value });
                sig.value = value;
            }
        }
    }
}

/// How a [`NativeSim::run_until`] call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Done,
    Timeout,
    Starved,
}

pub struct NativeSim {
    name: String,
    precision: i8,
    clock: Handle,
    state: RefCell<SimState>,
    design: RefCell<Box<dyn Design>>,
}

impl NativeSim {
    pub fn new(design: Box<dyn Design>, precision: i8) -> Self {
        let name = design.name().to_string();
        let mut names = FnvHashMap::default();
        names.insert(name.clone(), ROOT);
        let signals: Vec<Signal> = design
            .ports()
            .into_iter()
            .enumerate()
            .map(|(i, port)| {
                let full_name = format!("{}.{}", name, port.name);
                names.insert(full_name.clone(), i + 1);
                Signal {
                    full_name,
                    width: port.width,
                    mask: width_mask(port.width),
                    direction: port.direction,
                    value: None,
                }
            })
            .collect();
        let clock = design.clock() + 1;
        Self {
            name,
            precision,
            clock,
            state: RefCell::new(SimState {
                time: 0,
                phase: Phase::Active,
                signals,
                names,
                pending: Vec::new(),
                nba: Vec::new(),
                cb_cnt: 0,
                cb_map: IntMap::new(),
                timers: BTreeMap::new(),
                edges: IntMap::new(),
                read_write: None,
                read_only: None,
                next_time_step: None,
            }),
            design: RefCell::new(design),
        }
    }

    /// Runs time steps until `done` returns true after a step, or until the
    /// next event would lie beyond `limit` steps.
    pub fn run_until(&self, limit: u64, mut done: impl FnMut() -> bool) -> RunOutcome {
        let mut advanced = false;
        loop {
            if advanced {
                self.fire(|st| st.next_time_step.take(), SimCallback::NextTimeStep);
            }
            self.fire_timers();
            self.evaluate();
            self.read_only_phase();
            if done() {
                return RunOutcome::Done;
            }
            let mut st = self.state.borrow_mut();
            match st.timers.keys().next().copied() {
                None => return RunOutcome::Starved,
                Some(t) if t > limit => return RunOutcome::Timeout,
                Some(t) => {
                    advanced = t > st.time;
                    st.time = st.time.max(t);
                }
            }
        }
    }

    fn fire(&self, take: impl FnOnce(&mut SimState) -> Option<usize>, cb: SimCallback) {
        let fired = {
            let mut st = self.state.borrow_mut();
            take(&mut *st).map(|hdl| st.cb_map.remove(hdl as u64))
        };
        if fired.is_some() {
            trigger::react(cb, None);
        }
    }

    fn fire_timers(&self) {
        let now = self.state.borrow().time;
        self.fire(|st| st.timers.remove(&now), SimCallback::Time(now));
    }

    fn read_only_phase(&self) {
        let hdl = self.state.borrow_mut().read_only.take();
        if let Some(hdl) = hdl {
            {
                let mut st = self.state.borrow_mut();
                st.cb_map.remove(hdl as u64);
                st.phase = Phase::ReadOnly;
            }
            trigger::react(SimCallback::ReadOnly, None);
            self.state.borrow_mut().phase = Phase::Active;
        }
    }

    /// Active region of one time step, iterated until no signal changes and no
    /// read-write callback is pending.
    fn evaluate(&self) {
        loop {
            let nba = std::mem::take(&mut self.state.borrow_mut().nba);
            if !nba.is_empty() {
                let changes = self.apply_all(nba);
                self.propagate(changes);
                continue;
            }
            let pending: Vec<(Handle, Option<u64>)> = std::mem::take(&mut self.state.borrow_mut().pending)
                .into_iter()
                .map(|(h, v)| (h, Some(v)))
                .collect();
            if !pending.is_empty() {
                let changes = self.apply_all(pending);
                self.propagate(changes);
                continue;
            }
            self.fire(|st| st.read_write.take(), SimCallback::ReadWrite);
            let st = self.state.borrow();
            if st.pending.is_empty() && st.nba.is_empty() && st.read_write.is_none() {
                break;
            }
        }
    }

    fn apply_all(&self, writes: Vec<(Handle, Option<u64>)>) -> Vec<Change> {
        let mut st = self.state.borrow_mut();
        let mut changes = Vec::new();
        for (handle, value) in writes {
            st.apply(handle, value, &mut changes);
        }
        changes
    }

    fn propagate(&self, changes: Vec<Change>) {
        for change in changes {
            let kind = edge_kind(change.old, change.new);
            if change.handle == self.clock && kind == EdgeKind::Rising {
                // the design samples its inputs before any edge waiter can write
                let values: Vec<Option<u64>> =
                    self.state.borrow().signals.iter().map(|s| s.value).collect();
                let updates = self.design.borrow_mut().posedge(&values);
                self.state
                    .borrow_mut()
                    .nba
                    .extend(updates.into_iter().map(|(port, v)| (port + 1, v)));
            }
            let watched = self.state.borrow().edges.contains_key(change.handle as u64);
            if watched {
                let width = self.state.borrow().signal(change.handle).map(|s| s.width).unwrap_or(0);
                let kind = if width == 1 { kind } else { EdgeKind::Any };
                trigger::react(SimCallback::Edge(change.handle), Some(kind));
            }
        }
    }
}

fn edge_kind(old: Option<u64>, new: Option<u64>) -> EdgeKind {
    match (old.map(|v| v & 1), new.map(|v| v & 1)) {
        (o, Some(1)) if o != Some(1) => EdgeKind::Rising,
        (o, Some(0)) if o != Some(0) => EdgeKind::Falling,
        _ => EdgeKind::Any,
    }
}

impl SimIf for NativeSim {
    fn get_root_object(&self) -> TbResult<SimObject> {
        Ok(SimObject { handle: ROOT, kind: ObjectKind::Hier })
    }

    fn get_object_by_name(&self, name: &str) -> TbResult<SimObject> {
        let st = self.state.borrow();
        let handle = *st
            .names
            .get(name)
            .ok_or_else(|| TbError::UnknownSignal(name.to_string()))?;
        if handle == ROOT {
            return self.get_root_object();
        }
        let sig = st.signal(handle)?;
        Ok(SimObject { handle, kind: ObjectKind::Int(sig.width) })
    }

    fn get_full_name(&self, obj: &SimObject) -> TbResult<String> {
        if obj.handle == ROOT {
            return Ok(self.name.clone());
        }
        Ok(self.state.borrow().signal(obj.handle)?.full_name.clone())
    }

    fn get_value(&self, obj: &SimObject) -> TbResult<Option<u64>> {
        Ok(self.state.borrow().signal(obj.handle)?.value)
    }

    fn set_value(&self, obj: &SimObject, value: u64) -> TbResult<()> {
        let mut st = self.state.borrow_mut();
        let sig = st.signal(obj.handle)?;
        if sig.direction != Direction::Input {
            return Err(TbError::NotWritable(sig.full_name.clone()));
        }
        if st.phase == Phase::ReadOnly {
            return Err(TbError::ReadOnlyWrite(sig.full_name.clone()));
        }
        st.pending.push((obj.handle, value));
        Ok(())
    }

    fn get_sim_time_steps(&self) -> u64 {
        self.state.borrow().time
    }

    fn get_sim_precision(&self) -> i8 {
        self.precision
    }

    fn register_callback(&self, cb: SimCallback) -> TbResult<usize> {
        let mut st = self.state.borrow_mut();
        let hdl = match cb {
            SimCallback::Time(t) => {
                let t_abs = t + st.time;
                if let Some(&hdl) = st.timers.get(&t_abs) {
                    return Ok(hdl);
                }
                let hdl = st.new_cb_hdl(CbKind::Time(t_abs));
                st.timers.insert(t_abs, hdl);
                hdl
            }
            SimCallback::Edge(sig_hdl) => {
                st.signal(sig_hdl)?;
                if let Some(&hdl) = st.edges.get(sig_hdl as u64) {
                    return Ok(hdl);
                }
                let hdl = st.new_cb_hdl(CbKind::Edge(sig_hdl));
                st.edges.insert(sig_hdl as u64, hdl);
                hdl
            }
            SimCallback::ReadWrite => match st.read_write {
                Some(hdl) => hdl,
                None => {
                    let hdl = st.new_cb_hdl(CbKind::ReadWrite);
                    st.read_write = Some(hdl);
                    hdl
                }
            },
            SimCallback::ReadOnly => match st.read_only {
                Some(hdl) => hdl,
                None => {
                    let hdl = st.new_cb_hdl(CbKind::ReadOnly);
                    st.read_only = Some(hdl);
                    hdl
                }
            },
            SimCallback::NextTimeStep => match st.next_time_step {
                Some(hdl) => hdl,
                None => {
                    let hdl = st.new_cb_hdl(CbKind::NextTimeStep);
                    st.next_time_step = Some(hdl);
                    hdl
                }
            },
        };
        Ok(hdl)
    }

    fn cancel_callback(&self, cb_hdl: usize) -> TbResult<()> {
        let mut st = self.state.borrow_mut();
        match st.cb_map.remove(cb_hdl as u64) {
            Some(CbKind::Time(t_abs)) => {
                st.timers.remove(&t_abs);
            }
            Some(CbKind::Edge(sig_hdl)) => {
                st.edges.remove(sig_hdl as u64);
            }
            Some(CbKind::ReadWrite) => st.read_write = None,
            Some(CbKind::ReadOnly) => st.read_only = None,
            Some(CbKind::NextTimeStep) => st.next_time_step = None,
            None => log::debug!("callback {} already fired or cancelled", cb_hdl),
        }
        Ok(())
    }
}
