//! Economy configuration types
//!
//! Every tunable the enforcement path reads lives here, so a preview
//! surface built from the same config can never disagree with the
//! enforcement surface. Values load from TOML with full defaults; an
//! empty file yields the standard economy.

use diamond_core::{EconomyError, Result};
use diamond_economics::{
    constants, BurnPolicy, MasteryGate, StreakTable, StreakTier, SwapCalculator,
};
use diamond_core::rounding::Rate;
use diamond_ledger::AuditPolicy;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Complete economy configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EconomyConfig {
    /// Burn law settings
    #[serde(default)]
    pub burn: BurnSettings,

    /// Mastery gate settings
    #[serde(default)]
    pub mastery: MasterySettings,

    /// Streak multiplier tier table
    #[serde(default)]
    pub streak: StreakSettings,

    /// Denomination swap settings
    #[serde(default)]
    pub swap: SwapSettings,

    /// Reconciliation auditor settings
    #[serde(default)]
    pub audit: AuditSettings,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Burn law settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BurnSettings {
    /// Burn rate in basis points of the taxed amount
    #[serde(default = "default_burn_rate")]
    pub rate_basis_points: u32,

    /// Smallest taxed amount that must burn at least one unit
    #[serde(default = "default_min_burn_threshold")]
    pub min_burn_threshold: u64,
}

impl Default for BurnSettings {
    fn default() -> Self {
        Self {
            rate_basis_points: default_burn_rate(),
            min_burn_threshold: default_min_burn_threshold(),
        }
    }
}

fn default_burn_rate() -> u32 {
    constants::BURN_RATE_BASIS_POINTS
}

fn default_min_burn_threshold() -> u64 {
    constants::MIN_BURN_THRESHOLD
}

/// Mastery gate settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MasterySettings {
    /// Minimum accuracy for reward eligibility, inclusive
    #[serde(default = "default_mastery_threshold")]
    pub threshold: f64,

    /// Scale applied to accuracy above the threshold for the bonus
    #[serde(default = "default_bonus_scale")]
    pub bonus_scale: f64,
}

impl Default for MasterySettings {
    fn default() -> Self {
        Self {
            threshold: default_mastery_threshold(),
            bonus_scale: default_bonus_scale(),
        }
    }
}

fn default_mastery_threshold() -> f64 {
    constants::MASTERY_THRESHOLD
}

fn default_bonus_scale() -> f64 {
    constants::MASTERY_BONUS_SCALE
}

/// Streak multiplier tier table
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StreakSettings {
    /// Tiers ordered by ascending minimum days, first at zero
    #[serde(default = "default_tiers")]
    pub tiers: Vec<TierSettings>,
}

impl Default for StreakSettings {
    fn default() -> Self {
        Self {
            tiers: default_tiers(),
        }
    }
}

/// One streak tier row
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TierSettings {
    /// Display name
    pub name: String,

    /// Minimum consecutive days to qualify
    pub min_days: u32,

    /// Reward multiplier in basis points
    pub multiplier_basis_points: u32,
}

fn default_tiers() -> Vec<TierSettings> {
    StreakTable::hard_law()
        .tiers()
        .iter()
        .map(|tier| TierSettings {
            name: tier.name.clone(),
            min_days: tier.min_days,
            multiplier_basis_points: tier.multiplier.basis_points(),
        })
        .collect()
}

/// Denomination swap settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SwapSettings {
    /// Shards produced per whole diamond
    #[serde(default = "default_shards_per_diamond")]
    pub shards_per_diamond: u64,

    /// Flat fee per swap, in the input denomination
    #[serde(default = "default_swap_fee")]
    pub flat_fee: u64,
}

impl Default for SwapSettings {
    fn default() -> Self {
        Self {
            shards_per_diamond: default_shards_per_diamond(),
            flat_fee: default_swap_fee(),
        }
    }
}

fn default_shards_per_diamond() -> u64 {
    constants::SHARDS_PER_DIAMOND
}

fn default_swap_fee() -> u64 {
    constants::SWAP_FLAT_FEE
}

/// Reconciliation auditor settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuditSettings {
    /// Seconds between reconciliation cycles
    #[serde(default = "default_audit_interval")]
    pub interval_secs: u64,

    /// Upper bound of the Warning variance band
    #[serde(default = "default_warning_threshold")]
    pub warning_threshold: u64,

    /// Upper bound of the Critical variance band
    #[serde(default = "default_critical_threshold")]
    pub critical_threshold: u64,

    /// Whether critical variance freezes the ledger
    #[serde(default = "default_true")]
    pub auto_freeze: bool,
}

impl Default for AuditSettings {
    fn default() -> Self {
        Self {
            interval_secs: default_audit_interval(),
            warning_threshold: default_warning_threshold(),
            critical_threshold: default_critical_threshold(),
            auto_freeze: true,
        }
    }
}

fn default_audit_interval() -> u64 {
    300
}

fn default_warning_threshold() -> u64 {
    100
}

fn default_critical_threshold() -> u64 {
    1_000
}

fn default_true() -> bool {
    true
}

/// Logging configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl EconomyConfig {
    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            EconomyError::InvalidConfig(format!(
                "failed to read {}: {e}",
                path.as_ref().display()
            ))
        })?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| EconomyError::InvalidConfig(format!("invalid TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Check every section builds a valid policy object
    pub fn validate(&self) -> Result<()> {
        self.burn_policy()?;
        self.mastery_gate()?;
        self.streak_table()?;
        self.swap_calculator()?;
        if self.audit.warning_threshold > self.audit.critical_threshold {
            return Err(EconomyError::InvalidConfig(
                "audit warning threshold exceeds critical threshold".to_string(),
            ));
        }
        if self.audit.interval_secs == 0 {
            return Err(EconomyError::InvalidConfig(
                "audit interval must be at least one second".to_string(),
            ));
        }
        Ok(())
    }

    /// Build the burn policy this config describes
    pub fn burn_policy(&self) -> Result<BurnPolicy> {
        Ok(BurnPolicy {
            rate: Rate::from_basis_points(self.burn.rate_basis_points)?,
            min_burn_threshold: self.burn.min_burn_threshold,
        })
    }

    /// Build the mastery gate this config describes
    pub fn mastery_gate(&self) -> Result<MasteryGate> {
        MasteryGate::new(self.mastery.threshold, self.mastery.bonus_scale)
    }

    /// Build and validate the streak tier table
    pub fn streak_table(&self) -> Result<StreakTable> {
        let tiers = self
            .streak
            .tiers
            .iter()
            .map(|t| StreakTier::new(&t.name, t.min_days, t.multiplier_basis_points))
            .collect::<Result<Vec<_>>>()?;
        StreakTable::new(tiers)
    }

    /// Build the swap calculator this config describes
    pub fn swap_calculator(&self) -> Result<SwapCalculator> {
        SwapCalculator::new(self.swap.shards_per_diamond, self.swap.flat_fee)
    }

    /// Auditor thresholds as a policy object
    pub fn audit_policy(&self) -> AuditPolicy {
        AuditPolicy {
            warning_threshold: self.audit.warning_threshold,
            critical_threshold: self.audit.critical_threshold,
            auto_freeze: self.audit.auto_freeze,
        }
    }

    /// Interval between background reconciliation cycles
    pub fn audit_interval(&self) -> Duration {
        Duration::from_secs(self.audit.interval_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_toml_yields_defaults() {
        let config: EconomyConfig = toml::from_str("").unwrap();
        config.validate().unwrap();

        assert_eq!(config.burn.rate_basis_points, 2_500);
        assert_eq!(config.burn.min_burn_threshold, 4);
        assert_eq!(config.mastery.threshold, 0.85);
        assert_eq!(config.streak.tiers.len(), 5);
        assert_eq!(config.swap.shards_per_diamond, 100);
        assert!(config.audit.auto_freeze);
    }

    #[test]
    fn test_partial_override() {
        let config: EconomyConfig = toml::from_str(
            r#"
            [burn]
            rate_basis_points = 1000

            [audit]
            interval_secs = 60
            auto_freeze = false
            "#,
        )
        .unwrap();
        config.validate().unwrap();

        assert_eq!(config.burn.rate_basis_points, 1_000);
        assert_eq!(config.burn.min_burn_threshold, 4);
        assert_eq!(config.audit.interval_secs, 60);
        assert!(!config.audit.auto_freeze);
    }

    #[test]
    fn test_invalid_burn_rate_rejected() {
        let config: EconomyConfig = toml::from_str(
            r#"
            [burn]
            rate_basis_points = 20000
            "#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_misordered_tiers_rejected() {
        let config: EconomyConfig = toml::from_str(
            r#"
            [[streak.tiers]]
            name = "A"
            min_days = 0
            multiplier_basis_points = 10000

            [[streak.tiers]]
            name = "B"
            min_days = 10
            multiplier_basis_points = 15000

            [[streak.tiers]]
            name = "C"
            min_days = 5
            multiplier_basis_points = 20000
            "#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_inverted_audit_thresholds_rejected() {
        let config: EconomyConfig = toml::from_str(
            r#"
            [audit]
            warning_threshold = 5000
            critical_threshold = 100
            "#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("economy.toml");
        std::fs::write(&path, "[mastery]\nthreshold = 0.9\n").unwrap();

        let config = EconomyConfig::load(&path).unwrap();
        assert_eq!(config.mastery.threshold, 0.9);

        assert!(EconomyConfig::load(dir.path().join("missing.toml")).is_err());
    }
}
