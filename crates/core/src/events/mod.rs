//! Domain events module.
//!
//! Provides domain event types, the sink trait for emitting events after
//! successful mutations, and the debounced worker that turns change
//! notifications into plan recalculations.

mod domain_event;
mod recalc_worker;
mod sink;

pub use domain_event::*;
pub use recalc_worker::{run_recalculation_worker, RecalculationHandler};
pub use sink::*;
