pub mod keyed_lock;
pub mod month_label;
pub mod time_utils;

pub use keyed_lock::{KeyedGuard, KeyedLocks};
pub use month_label::MonthLabel;
pub use time_utils::{days_until, Clock, FixedClock, SystemClock};
