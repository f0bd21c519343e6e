//! Contributions module - month-scoped progress derived on demand.

mod contributions_engine;
mod contributions_model;

pub use contributions_engine::{
    asset_shortfalls, current_totals, derive_contributions, effective_allocation,
    evaluate_fulfillment, load_inputs, required_rate_pairs, GoalRef,
};
pub use contributions_model::{
    AssetShortfall, ContributionEvent, ContributionSource, DerivationInputs, DerivationWindow,
    GoalContribution, GoalProgress, ProgressReport, RateBasisKind,
};
