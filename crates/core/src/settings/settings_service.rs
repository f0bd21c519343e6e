use super::SettingsRepositoryTrait;
use crate::errors::{Error, Result, StorageError};
use crate::settings::settings_model::*;
use async_trait::async_trait;
use log::{debug, warn};
use rust_decimal::Decimal;
use std::fmt::Display;
use std::str::FromStr;
use std::sync::Arc;

#[async_trait]
pub trait SettingsServiceTrait: Send + Sync {
    fn get_settings(&self) -> Result<PlannerSettings>;

    async fn update_settings(&self, new_settings: &PlannerSettings) -> Result<()>;

    /// Get a single setting value by key. Returns None if not found.
    fn get_setting_value(&self, key: &str) -> Result<Option<String>>;

    /// Set a single setting value by key.
    async fn set_setting_value(&self, key: &str, value: &str) -> Result<()>;
}

pub struct SettingsService {
    settings_repository: Arc<dyn SettingsRepositoryTrait>,
}

impl SettingsService {
    pub fn new(settings_repository: Arc<dyn SettingsRepositoryTrait>) -> Self {
        Self {
            settings_repository,
        }
    }

    /// Reads `key` and parses it, falling back to `default` when the key was
    /// never stored.
    fn read_or<T>(&self, key: &str, default: T) -> Result<T>
    where
        T: FromStr,
        T::Err: Display,
    {
        match self.get_setting_value(key)? {
            Some(raw) => raw.trim().parse::<T>().map_err(|e| {
                Error::InvalidConfigValue(format!("{} = '{}': {}", key, raw, e))
            }),
            None => Ok(default),
        }
    }

    /// Reads an optional decimal where an empty string means "unset".
    fn read_optional_decimal(&self, key: &str) -> Result<Option<Decimal>> {
        match self.get_setting_value(key)? {
            Some(raw) if raw.trim().is_empty() => Ok(None),
            Some(raw) => Decimal::from_str(raw.trim()).map(Some).map_err(|e| {
                Error::InvalidConfigValue(format!("{} = '{}': {}", key, raw, e))
            }),
            None => Ok(None),
        }
    }

    fn validate(settings: &PlannerSettings) -> Result<()> {
        if settings.days_per_month <= Decimal::ZERO {
            return Err(Error::InvalidConfigValue(format!(
                "{} must be positive, got {}",
                DAYS_PER_MONTH_KEY, settings.days_per_month
            )));
        }
        if settings.undo_grace_period_hours < 0 {
            return Err(Error::InvalidConfigValue(format!(
                "{} must not be negative, got {}",
                UNDO_GRACE_PERIOD_HOURS_KEY, settings.undo_grace_period_hours
            )));
        }
        if settings.history_page_size == 0 {
            return Err(Error::InvalidConfigValue(format!(
                "{} must be at least 1",
                HISTORY_PAGE_SIZE_KEY
            )));
        }
        if let (Some(attention), Some(critical)) =
            (settings.attention_threshold, settings.critical_threshold)
        {
            if attention > critical {
                warn!(
                    "Attention threshold {} is above critical threshold {}; critical wins",
                    attention, critical
                );
            }
        }
        Ok(())
    }
}

#[async_trait]
impl SettingsServiceTrait for SettingsService {
    fn get_settings(&self) -> Result<PlannerSettings> {
        let defaults = PlannerSettings::default();
        let settings = PlannerSettings {
            undo_grace_period_hours: self
                .read_or(UNDO_GRACE_PERIOD_HOURS_KEY, defaults.undo_grace_period_hours)?,
            days_per_month: self.read_or(DAYS_PER_MONTH_KEY, defaults.days_per_month)?,
            month_rounding: self.read_or(MONTH_ROUNDING_KEY, defaults.month_rounding)?,
            attention_threshold: self.read_optional_decimal(ATTENTION_THRESHOLD_KEY)?,
            critical_threshold: self.read_optional_decimal(CRITICAL_THRESHOLD_KEY)?,
            default_strategy: self.read_or(DEFAULT_STRATEGY_KEY, defaults.default_strategy)?,
            recalc_debounce_ms: self.read_or(RECALC_DEBOUNCE_MS_KEY, defaults.recalc_debounce_ms)?,
            history_page_size: self.read_or(HISTORY_PAGE_SIZE_KEY, defaults.history_page_size)?,
        };
        Self::validate(&settings)?;
        Ok(settings)
    }

    async fn update_settings(&self, new_settings: &PlannerSettings) -> Result<()> {
        Self::validate(new_settings)?;

        let optional = |value: Option<Decimal>| value.map(|v| v.to_string()).unwrap_or_default();
        let entries = [
            (
                UNDO_GRACE_PERIOD_HOURS_KEY,
                new_settings.undo_grace_period_hours.to_string(),
            ),
            (DAYS_PER_MONTH_KEY, new_settings.days_per_month.to_string()),
            (
                MONTH_ROUNDING_KEY,
                new_settings.month_rounding.as_str().to_string(),
            ),
            (
                ATTENTION_THRESHOLD_KEY,
                optional(new_settings.attention_threshold),
            ),
            (
                CRITICAL_THRESHOLD_KEY,
                optional(new_settings.critical_threshold),
            ),
            (
                DEFAULT_STRATEGY_KEY,
                new_settings.default_strategy.as_str().to_string(),
            ),
            (
                RECALC_DEBOUNCE_MS_KEY,
                new_settings.recalc_debounce_ms.to_string(),
            ),
            (
                HISTORY_PAGE_SIZE_KEY,
                new_settings.history_page_size.to_string(),
            ),
        ];

        for (key, value) in entries {
            debug!("Updating planner setting {} = {}", key, value);
            self.settings_repository.update_setting(key, &value).await?;
        }
        Ok(())
    }

    fn get_setting_value(&self, key: &str) -> Result<Option<String>> {
        match self.settings_repository.get_setting(key) {
            Ok(value) => Ok(Some(value)),
            Err(Error::Storage(StorageError::NotFound(_))) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn set_setting_value(&self, key: &str, value: &str) -> Result<()> {
        self.settings_repository.update_setting(key, value).await
    }
}
