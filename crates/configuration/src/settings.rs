use crate::error::ConfigError;
use core_types::KpiKey;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// The root configuration structure for the entire application.
///
/// Every section is optional in the file; omitted sections take their defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub database: DatabaseSettings,
    #[serde(default)]
    pub ranking: RankingSettings,
    #[serde(default)]
    pub benchmarks: BenchmarkSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Connection pool limits. The URL itself comes from `DATABASE_URL`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
}

/// Parameters of the ranking engine.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RankingSettings {
    /// Relative change below which a trend is reported as flat (0.01 = 1%).
    pub trend_tolerance: Decimal,
    /// Weights for every KPI without an explicit entry in `weights`.
    pub default_weights: KpiWeights,
    /// Per-KPI weights. Keys must be known KPI keys.
    pub weights: BTreeMap<KpiKey, KpiWeights>,
}

/// The two factors of a KPI's dynamic priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct KpiWeights {
    pub impact_score: Decimal,
    pub ease_of_change: Decimal,
}

/// Benchmark rebuild parameters.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BenchmarkSettings {
    /// How many providers are computed concurrently during a rebuild.
    pub rebuild_concurrency: usize,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    /// Default filter directive; `RUST_LOG` takes precedence when set.
    pub level: String,
    /// Directory of the daily rolling log file.
    pub directory: PathBuf,
    pub file_prefix: String,
}

// --- Default Implementations ---

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            max_connections: 10,
            acquire_timeout_secs: 5,
        }
    }
}

impl Default for RankingSettings {
    fn default() -> Self {
        Self {
            trend_tolerance: dec!(0.01),
            default_weights: KpiWeights::default(),
            weights: BTreeMap::new(),
        }
    }
}

impl Default for KpiWeights {
    fn default() -> Self {
        Self {
            impact_score: Decimal::ONE,
            ease_of_change: Decimal::ONE,
        }
    }
}

impl Default for BenchmarkSettings {
    fn default() -> Self {
        Self {
            rebuild_concurrency: 16,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            directory: PathBuf::from("logs"),
            file_prefix: "hkpi.log".to_string(),
        }
    }
}

impl RankingSettings {
    /// The weights that apply to `kpi_key`.
    pub fn weights_for(&self, kpi_key: KpiKey) -> KpiWeights {
        self.weights
            .get(&kpi_key)
            .copied()
            .unwrap_or(self.default_weights)
    }
}

impl Config {
    /// Checks the invariants serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database.max_connections == 0 {
            return Err(invalid("database.max_connections must be at least 1"));
        }
        if self.benchmarks.rebuild_concurrency == 0 {
            return Err(invalid("benchmarks.rebuild_concurrency must be at least 1"));
        }
        if self.ranking.trend_tolerance.is_sign_negative() {
            return Err(invalid("ranking.trend_tolerance must not be negative"));
        }

        check_weights("ranking.default_weights", &self.ranking.default_weights)?;
        for (kpi_key, weights) in &self.ranking.weights {
            check_weights(&format!("ranking.weights.{kpi_key}"), weights)?;
        }
        Ok(())
    }
}

fn check_weights(section: &str, weights: &KpiWeights) -> Result<(), ConfigError> {
    if weights.impact_score.is_sign_negative() || weights.ease_of_change.is_sign_negative() {
        return Err(invalid(&format!("{section}: weights must not be negative")));
    }
    Ok(())
}

fn invalid(message: &str) -> ConfigError {
    ConfigError::ValidationError(message.to_string())
}
