/// Average Gregorian month length in days (365.2425 / 12)
pub const DEFAULT_DAYS_PER_MONTH: &str = "30.436875";

/// Undo window after a lifecycle transition
pub const DEFAULT_UNDO_GRACE_PERIOD_HOURS: i64 = 24;

/// Debounce window for coalescing recalculation triggers
pub const DEFAULT_RECALC_DEBOUNCE_MS: u64 = 500;

/// Default page size for completed execution history
pub const DEFAULT_HISTORY_PAGE_SIZE: usize = 12;

/// Decimal precision for stored monetary values
pub const DECIMAL_PRECISION: u32 = 8;

/// Lower bound of the global flex factor (0%)
pub const MIN_FLEX_FACTOR: &str = "0";

/// Upper bound of the global flex factor (200%)
pub const MAX_FLEX_FACTOR: &str = "2";
