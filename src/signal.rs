use crate::sim_if::{sim, Handle, ObjectKind};
use crate::trigger::Trigger;
use crate::TbResult;

/// Handle to an object in the simulated design hierarchy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SimObject {
    pub(crate) handle: Handle,
    pub(crate) kind: ObjectKind,
}

impl SimObject {
    pub fn handle(&self) -> Handle {
        self.handle
    }

    pub fn kind(&self) -> ObjectKind {
        self.kind
    }

    pub fn name(&self) -> TbResult<String> {
        sim()?.get_full_name(self)
    }

    /// Bit width; zero for hierarchy scopes.
    pub fn size(&self) -> u32 {
        match self.kind {
            ObjectKind::Int(size) => size,
            ObjectKind::Hier => 0,
        }
    }

    pub fn get_root() -> TbResult<Self> {
        sim()?.get_root_object()
    }

    pub fn get_child(&self, name: &str) -> TbResult<Self> {
        let mut child_name = self.name()?;
        child_name.push('.');
        child_name.push_str(name);
        sim()?.get_object_by_name(&child_name)
    }

    /// Shorthand for [`SimObject::get_child`].
    pub fn c(&self, name: &str) -> TbResult<Self> {
        self.get_child(name)
    }

    pub fn value(&self) -> TbResult<Option<u64>> {
        sim()?.get_value(self)
    }

    /// Reads the value, collapsing undefined to zero.
    pub fn u64(&self) -> TbResult<u64> {
        Ok(self.value()?.unwrap_or(0))
    }

    pub fn set(&self, val: u64) -> TbResult {
        sim()?.set_value(self, val)
    }

    /// Write-only capability for stimulus.
    pub fn input(self) -> InputPort {
        InputPort(self)
    }

    /// Read-only capability for observation.
    pub fn probe(self) -> Probe {
        Probe(self)
    }

    // convenience functions to get edge triggers for this signal
    pub fn rising_edge(self) -> Trigger {
        Trigger::rising_edge(self)
    }
    pub async fn rising_edge_ro(self) -> TbResult {
        self.rising_edge().await?;
        Trigger::read_only().await
    }
    pub async fn rising_edge_rw(self) -> TbResult {
        self.rising_edge().await?;
        Trigger::read_write().await
    }
    pub fn falling_edge(self) -> Trigger {
        Trigger::falling_edge(self)
    }
    pub fn edge(self) -> Trigger {
        Trigger::edge(self)
    }
}

/// A signal the holder may drive but not read.
#[derive(Clone, Copy, Debug)]
pub struct InputPort(SimObject);

impl InputPort {
    pub fn set(&self, val: u64) -> TbResult {
        self.0.set(val)
    }

    pub fn set_bool(&self, level: bool) -> TbResult {
        self.0.set(u64::from(level))
    }

    pub fn width(&self) -> u32 {
        self.0.size()
    }
}

/// A signal the holder may read but not drive.
#[derive(Clone, Copy, Debug)]
pub struct Probe(SimObject);

impl Probe {
    pub fn get(&self) -> TbResult<Option<u64>> {
        self.0.value()
    }

    /// Undefined reads as zero.
    pub fn u64(&self) -> TbResult<u64> {
        self.0.u64()
    }

    pub fn bool(&self) -> TbResult<bool> {
        Ok(self.u64()? != 0)
    }

    pub fn width(&self) -> u32 {
        self.0.size()
    }
}
