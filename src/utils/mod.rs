// Utility functions
// Helpers for ids, debouncing, and time formatting

pub mod clock;
pub mod debounce;
pub mod format;
pub mod id;
pub mod scheduler;
pub mod time;

pub use clock::{Clock, FixedClock, SystemClock};
pub use debounce::{debounce, debounce_ms, Debounced, DEFAULT_WAIT};
pub use format::{pad_field, WeekdayNames};
pub use id::{generate_id, generate_id_with, DEFAULT_ID_LENGTH};
pub use scheduler::{ManualScheduler, Scheduler, TokioScheduler};
pub use time::{parse_date, parse_time, CalendarFields, TimeFormatter, TimeInput};
