use std::collections::BTreeSet;

use anyhow::{anyhow, bail, Result};
use promo_condition::{QuantityConfig, SelfPromotionConfig};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Raw (as-written) model
// ---------------------------------------------------------------------------

/// Which history the quantity gate scans for a process.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistorySource {
    /// Prior promotions of this process (the primary revision's source).
    #[default]
    Promotions,
    /// Prior raw builds of the owning project.
    Builds,
}

/// A condition as written in configuration. The quantity stays textual here;
/// it is resolved by [`ProcessDef::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConditionDef {
    BuildQuantity { success_quantity: String },
    SelfPromotion {
        #[serde(default)]
        even_if_unstable: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessDef {
    pub name: String,
    #[serde(default)]
    pub history: HistorySource,
    pub conditions: Vec<ConditionDef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub project: String,
    pub processes: Vec<ProcessDef>,
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate the textual success quantity.
///
/// blank -> cannot be blank; non-integer -> must be an integer;
/// <= 0 -> must be greater than zero. This is the single user-facing
/// validation point for the threshold.
pub fn parse_success_quantity(raw: &str) -> Result<u32> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        bail!("CONFIG_QUANTITY_BLANK: success quantity cannot be blank");
    }
    let quantity: i64 = trimmed.parse().map_err(|_| {
        anyhow!("CONFIG_QUANTITY_NOT_INTEGER: success quantity must be an integer, got {trimmed:?}")
    })?;
    if quantity <= 0 {
        bail!("CONFIG_QUANTITY_NOT_POSITIVE: success quantity must be greater than zero, got {quantity}");
    }
    u32::try_from(quantity).map_err(|_| {
        anyhow!("CONFIG_QUANTITY_NOT_INTEGER: success quantity out of range, got {quantity}")
    })
}

/// A condition with its configuration resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidatedCondition {
    BuildQuantity(QuantityConfig),
    SelfPromotion(SelfPromotionConfig),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedProcess {
    pub name: String,
    pub history: HistorySource,
    pub conditions: Vec<ValidatedCondition>,
}

impl ValidatedProcess {
    /// How many history entries the dispatcher needs to fetch for this
    /// process: the largest quantity threshold, zero when no quantity gate
    /// is configured.
    pub fn window_limit(&self) -> usize {
        self.conditions
            .iter()
            .map(|c| match c {
                ValidatedCondition::BuildQuantity(cfg) => cfg.threshold as usize,
                ValidatedCondition::SelfPromotion(_) => 0,
            })
            .max()
            .unwrap_or(0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedProject {
    pub project: String,
    pub processes: Vec<ValidatedProcess>,
}

impl ProcessDef {
    pub fn validate(&self) -> Result<ValidatedProcess> {
        if self.name.trim().is_empty() {
            bail!("CONFIG_PROCESS_NAME_BLANK: process name cannot be blank");
        }
        if self.conditions.is_empty() {
            // No conditions would promote every build vacuously.
            bail!(
                "CONFIG_PROCESS_NO_CONDITIONS: process {:?} has no conditions",
                self.name
            );
        }

        let mut conditions = Vec::with_capacity(self.conditions.len());
        for def in &self.conditions {
            conditions.push(match def {
                ConditionDef::BuildQuantity { success_quantity } => {
                    let threshold = parse_success_quantity(success_quantity)?;
                    ValidatedCondition::BuildQuantity(QuantityConfig { threshold })
                }
                ConditionDef::SelfPromotion { even_if_unstable } => {
                    ValidatedCondition::SelfPromotion(SelfPromotionConfig {
                        even_if_unstable: *even_if_unstable,
                    })
                }
            });
        }

        Ok(ValidatedProcess {
            name: self.name.clone(),
            history: self.history,
            conditions,
        })
    }
}

impl ProjectConfig {
    pub fn validate(&self) -> Result<ValidatedProject> {
        if self.project.trim().is_empty() {
            bail!("CONFIG_PROJECT_NAME_BLANK: project name cannot be blank");
        }

        let mut seen: BTreeSet<&str> = BTreeSet::new();
        let mut processes = Vec::with_capacity(self.processes.len());
        for def in &self.processes {
            if !seen.insert(def.name.as_str()) {
                bail!(
                    "CONFIG_PROCESS_DUPLICATE: process name {:?} appears more than once",
                    def.name
                );
            }
            processes.push(def.validate()?);
        }

        Ok(ValidatedProject {
            project: self.project.clone(),
            processes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantity_with_surrounding_whitespace_parses() {
        assert_eq!(parse_success_quantity(" 3 ").unwrap(), 3);
    }

    #[test]
    fn window_limit_is_the_largest_threshold() {
        let process = ValidatedProcess {
            name: "promo".into(),
            history: HistorySource::Promotions,
            conditions: vec![
                ValidatedCondition::BuildQuantity(QuantityConfig { threshold: 2 }),
                ValidatedCondition::SelfPromotion(SelfPromotionConfig::default()),
                ValidatedCondition::BuildQuantity(QuantityConfig { threshold: 5 }),
            ],
        };
        assert_eq!(process.window_limit(), 5);
    }
}
