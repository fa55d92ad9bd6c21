use std::num::NonZeroUsize;

pub const SUCCESS_FILE: &str = "success_file.result";
pub const PANIC_FILE: &str = "panic_file.result";
pub const TIMEOUT_CSV: &str = "timeout.csv";
pub const ETC_CSV: &str = "etc.csv";
pub const INVARIANT_BROKEN_CSV: &str = "invariant_broken_but_not_profitable.csv";
pub const PAIR_CSV_HEADER: &str = "target,base,pair";

/// Suffix of the raw per-target tool log.
pub const TARGET_LOG_SUFFIX: &str = ".result";

/// Extra seconds the tool's own timeout gets over the outer deadline.
pub const SELF_TIMEOUT_GRACE_SECS: u64 = 2;

pub const DEFAULT_WORKER_COUNT: NonZeroUsize = NonZeroUsize::new(5).unwrap();

/// Runs at or past this many seconds are treated as exhausted.
pub const HORIZON_SECS: f64 = 1200.0;

pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_ERROR: i32 = 1;
pub const EXIT_PANIC: i32 = 134;
pub const EXIT_NO_INVARIANT_BROKEN: i32 = 135;
pub const EXIT_INVARIANT_BROKEN_NOT_PROFITABLE: i32 = 136;
