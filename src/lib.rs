//! Small standalone helpers
//!
//! - [`generate_id`]: random fixed-length ids, optionally digits only
//! - [`debounce`]: trailing-edge debounce over a pluggable [`Scheduler`]
//! - [`parse_time`] / [`parse_date`]: render a time through a `{y}-{m}-{d}` style template
//!
//! ```
//! use utilkit::{generate_id, parse_date};
//!
//! let id = generate_id(6, true).unwrap();
//! assert_eq!(id.len(), 6);
//!
//! assert_eq!(parse_date("1673769600", None, false).unwrap(), "2023-01-15");
//! ```

pub mod error;
pub mod utils;

pub use error::{Error, Result};
pub use utils::{
    debounce, debounce_ms, generate_id, generate_id_with, parse_date, parse_time, Clock, Debounced,
    FixedClock, ManualScheduler, Scheduler, SystemClock, TimeFormatter, TimeInput,
    TokioScheduler, WeekdayNames,
};
