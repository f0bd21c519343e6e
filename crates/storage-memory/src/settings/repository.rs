use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use goalpace_core::settings::SettingsRepositoryTrait;
use goalpace_core::Result;

use crate::errors::{not_found, IntoCore};

const SETTINGS: &str = "app_settings";

#[derive(Default)]
pub struct SettingsRepository {
    values: RwLock<HashMap<String, String>>,
}

impl SettingsRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Repository pre-filled with raw key/value pairs.
    pub fn with_values<I, K, V>(values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            values: RwLock::new(
                values
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }
}

#[async_trait]
impl SettingsRepositoryTrait for SettingsRepository {
    fn get_setting(&self, setting_key: &str) -> Result<String> {
        self.values
            .read()
            .into_core(SETTINGS)?
            .get(setting_key)
            .cloned()
            .ok_or_else(|| not_found(SETTINGS, setting_key))
    }

    async fn update_setting(&self, setting_key: &str, setting_value: &str) -> Result<()> {
        self.values
            .write()
            .into_core(SETTINGS)?
            .insert(setting_key.to_string(), setting_value.to_string());
        Ok(())
    }
}
