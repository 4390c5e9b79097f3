//! # Model Access Check
//!
//! A single pre-flight authorization check consulted once per request,
//! before any upstream work starts. Downstream code trusts the decision and
//! never re-validates.

use crate::config::Config;
use std::collections::HashSet;

/// Model allow-list resolved from configuration. With no list configured
/// every model is allowed.
#[derive(Debug, Clone, Default)]
pub struct ModelAccess {
    allowed: Option<HashSet<String>>,
}

impl ModelAccess {
    pub fn from_config(config: &Config) -> Self {
        let allowed = config.allowed_models.as_ref().map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|entry| !entry.is_empty())
                .map(str::to_string)
                .collect()
        });
        Self { allowed }
    }

    pub fn authorize(&self, model: &str) -> bool {
        match &self.allowed {
            Some(models) => models.contains(model),
            None => true,
        }
    }
}
