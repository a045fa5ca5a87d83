pub const TICK_INTERVAL_SECS: f64 = 1.0; // one sample per second
pub const POLLING_WINDOW_TICKS: u32 = 1;

// 15 MB/s, received and sent added together
pub const MAX_BANDWIDTH_BYTES_PER_SEC: u64 = 15_000_000;

// 12 bit converter, but the needle only needs ~600 steps (1 mV each)
pub const DAC_FULL_SCALE: f64 = 4095.0;
pub const DAC_MAX: f64 = 600.0;

pub const SOFT_PWM_FULL_SCALE: f64 = 100.0;
pub const SOFT_PWM_MAX: f64 = 10.0;

pub const HARD_PWM_FULL_SCALE: f64 = 1024.0;
pub const HARD_PWM_MAX: f64 = 200.0;

// Limited growth curve. The ceiling sits above DAC_MAX on purpose.
pub const CURVE_B0: f64 = 0.0;
pub const CURVE_K: f64 = 0.02;
pub const CURVE_CEILING: f64 = 700.0;

pub const NEUTRAL_VALUE: f64 = 0.0;

pub const CONFIG_ENV: &str = "VU_MONITOR_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "vu_monitor.toml";
