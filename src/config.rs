use once_cell::sync::Lazy;
use std::cell::RefCell;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

/// Settings for one regression run.
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    pub clock_period: u64,
    pub clock_unit: String,
    /// Simulator time precision as a power of ten seconds, -12 = 1 ps.
    pub precision: i8,
    /// Tests still running at this simulation time fail with a timeout.
    pub max_sim_time_ns: u64,
    pub seed: u64,
    pub width: u32,
    pub junit_path: Option<PathBuf>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            clock_period: 10,
            clock_unit: "ns".to_string(),
            precision: -12,
            max_sim_time_ns: 1_000_000,
            seed: 1,
            width: 8,
            junit_path: None,
        }
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            log::warn!("ignoring {}={:?}: not a valid value", key, raw);
            default
        }),
        Err(_) => default,
    }
}

impl SimConfig {
    /// Defaults overridden by `CTRTB_*` environment variables.
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            clock_period: env_or("CTRTB_CLOCK_NS", d.clock_period),
            clock_unit: d.clock_unit,
            precision: d.precision,
            max_sim_time_ns: env_or("CTRTB_MAX_TIME_NS", d.max_sim_time_ns),
            seed: env_or("CTRTB_SEED", d.seed),
            width: env_or("CTRTB_WIDTH", d.width),
            junit_path: env::var_os("CTRTB_JUNIT").map(PathBuf::from),
        }
    }

    pub fn global() -> &'static SimConfig {
        &GLOBAL
    }
}

static GLOBAL: Lazy<SimConfig> = Lazy::new(SimConfig::from_env);

thread_local! {
    static CURRENT: RefCell<Option<SimConfig>> = RefCell::new(None);
}

/// Config of the test running on this thread, or the global one outside a run.
pub fn current() -> SimConfig {
    CURRENT.with(|c| c.borrow().clone().unwrap_or_else(|| SimConfig::global().clone()))
}

pub(crate) fn install(config: &SimConfig) {
    CURRENT.with(|c| c.replace(Some(config.clone())));
}

pub(crate) fn uninstall() {
    CURRENT.with(|c| c.replace(None));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn current_falls_back_to_global() {
        assert_eq!(current(), *SimConfig::global());
        let cfg = SimConfig { seed: 77, ..SimConfig::default() };
        install(&cfg);
        assert_eq!(current().seed, 77);
        uninstall();
    }

    #[test]
    fn env_parse_falls_back_on_garbage() {
        env::set_var("CTRTB_TEST_GARBAGE", "ten");
        assert_eq!(env_or("CTRTB_TEST_GARBAGE", 10u64), 10);
        env::set_var("CTRTB_TEST_GARBAGE", " 12 ");
        assert_eq!(env_or("CTRTB_TEST_GARBAGE", 10u64), 12);
        env::remove_var("CTRTB_TEST_GARBAGE");
    }
}
