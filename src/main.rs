use counter_tb::prelude::*;
use counter_tb::scenarios::*;

counter_tb::run_native!(
    |config: &SimConfig| CounterRtl::new(config.width);
    counter_demo_components,
    counter_reset_then_enable,
    counter_load_value,
    counter_load_then_count,
    counter_wraparound,
    counter_free_running,
    counter_hold,
    counter_load_direct,
    counter_step_check,
    counter_random,
);
