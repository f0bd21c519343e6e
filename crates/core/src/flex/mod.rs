//! Flex module - redistribution of a global factor across goals.

mod flex_engine;
mod flex_model;

pub use flex_engine::{apply_flex_adjustment, clamp_factor};
pub use flex_model::{
    AdjustedRequirement, FlexAdjustmentRequest, FlexAdjustmentResult, FlexPreference, FlexState,
    QuickAction, RedistributionStrategy,
};
