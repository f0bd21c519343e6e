//! FX (Foreign Exchange) module - rate models, conversion, and the rate service.

pub mod currency_converter;
mod fx_errors;
mod fx_model;
mod fx_service;
mod fx_traits;

pub use currency_converter::RateTable;
pub use fx_errors::FxError;
pub use fx_model::{ExchangeRate, FrozenRates, LiveRates, RateBasis, RateQuote};
pub use fx_service::FxService;
pub use fx_traits::{ExchangeRateSourceTrait, FxServiceTrait};
