//! In-process key/value storage for planner settings.

mod repository;

pub use repository::SettingsRepository;
