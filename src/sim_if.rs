use num_format::{Locale, ToFormattedString};
use std::cell::RefCell;
use std::rc::Rc;

use crate::signal::SimObject;
use crate::{TbError, TbResult};

pub type Handle = usize;

thread_local! {
    // One simulator per thread, so parallel test threads never share DUT state.
    static SIM_IF: RefCell<Option<Rc<dyn SimIf>>> = RefCell::new(None);
}

/// Simulator currently driving this thread.
pub fn sim() -> TbResult<Rc<dyn SimIf>> {
    SIM_IF.with(|s| s.borrow().clone().ok_or(TbError::NoSimulator))
}

pub(crate) fn install(sim: Rc<dyn SimIf>) {
    SIM_IF.with(|s| s.replace(Some(sim)));
}

pub(crate) fn uninstall() {
    SIM_IF.with(|s| s.replace(None));
}

/// Simulation time prefix used by all testbench log lines, e.g. `1,250.000ns`.
pub fn timestamp() -> String {
    let t = sim()
        .and_then(|s| s.get_sim_time("ns"))
        .unwrap_or_default();
    let int = t.floor() as u64;
    let mut frac_str = format!("{:.3}", t % 1.0);
    frac_str.remove(0);
    format!("{}{}ns", int.to_formatted_string(&Locale::en), frac_str)
}

/// Logs through the running simulator, or directly when none is installed.
pub fn log(msg: &str) {
    match sim() {
        Ok(s) => s.log(msg),
        Err(_) => log::info!("{}", msg),
    }
}

#[derive(Debug, Hash, Clone, Copy, Eq, PartialEq)]
pub enum SimCallback {
    /// Relative delay on registration, absolute time when fired.
    Time(u64),
    Edge(Handle),
    ReadWrite,
    ReadOnly,
    NextTimeStep,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ObjectKind {
    Int(u32),
    Hier,
}

pub trait SimIf {
    fn get_root_object(&self) -> TbResult<SimObject>;
    fn get_object_by_name(&self, name: &str) -> TbResult<SimObject>;
    fn get_full_name(&self, obj: &SimObject) -> TbResult<String>;
    /// `None` while the signal is undefined (X/Z).
    fn get_value(&self, obj: &SimObject) -> TbResult<Option<u64>>;
    /// Deposits a value; it becomes visible at the next evaluation, never mid-edge.
    fn set_value(&self, obj: &SimObject, value: u64) -> TbResult<()>;
    fn get_sim_time_steps(&self) -> u64;
    fn get_sim_precision(&self) -> i8;
    fn register_callback(&self, cb: SimCallback) -> TbResult<usize>;
    fn cancel_callback(&self, cb_hdl: usize) -> TbResult<()>;
    fn log(&self, msg: &str) {
        log::info!("{} {}", timestamp(), msg);
    }
    fn get_sim_time(&self, unit: &str) -> TbResult<f64> {
        // this function does not preserve precision, so don't use carelessly
        let t = self.get_sim_time_steps() as f64;
        let precision = self.get_sim_precision();
        Ok(ldexp10(t, precision - time_scale(unit)?))
    }
    fn get_sim_steps(&self, time: f64, unit: &str) -> TbResult<u64> {
        let precision = self.get_sim_precision();
        let steps = ldexp10(time, time_scale(unit)? - precision);
        if steps % 1.0 == 0.0 {
            Ok(steps as u64)
        } else {
            Err(TbError::Rounding {
                time,
                unit: unit.to_string(),
                precision: scale_time(precision)?,
            })
        }
    }
}

pub(crate) fn time_scale(unit: &str) -> TbResult<i8> {
    match unit {
        "fs" => Ok(-15),
        "ps" => Ok(-12),
        "ns" => Ok(-9),
        "us" => Ok(-6),
        "ms" => Ok(-3),
        "sec" => Ok(0),
        _ => Err(TbError::UnknownUnit(unit.to_string())),
    }
}

fn scale_time(unit: i8) -> TbResult<String> {
    match unit {
        -15 => Ok("fs".to_string()),
        -12 => Ok("ps".to_string()),
        -9 => Ok("ns".to_string()),
        -6 => Ok("us".to_string()),
        -3 => Ok("ms".to_string()),
        0 => Ok("sec".to_string()),
        _ => Err(TbError::UnknownUnit(format!("1e{}s", unit))),
    }
}

fn ldexp10(frac: f64, exp: i8) -> f64 {
    // Like math.ldexp, but base 10
    if exp >= 0 {
        frac * 10_u64.pow(exp as u32) as f64
    } else {
        let div = 10_u64.pow(-exp as u32) as f64;
        frac / div
    }
}
