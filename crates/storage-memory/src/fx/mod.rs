//! In-process exchange-rate source.

mod source;

pub use source::ManualRateSource;
