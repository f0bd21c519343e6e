//! In-process storage for goals and their flex preferences.

mod repository;

pub use repository::{FlexPreferenceRepository, GoalRepository};
