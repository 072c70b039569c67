use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Strategy for combining the dense and keyword result lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FusionStrategy {
    /// Reciprocal Rank Fusion: parameter-free and robust across
    /// heterogeneous rankers
    Rrf,
    /// Weighted combination of min-max normalized scores
    Weighted,
    /// Maximum score from either source
    Max,
}

impl FromStr for FusionStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "rrf" => Ok(FusionStrategy::Rrf),
            "weighted" => Ok(FusionStrategy::Weighted),
            "max" => Ok(FusionStrategy::Max),
            other => Err(format!("unknown fusion strategy: {other}")),
        }
    }
}

/// Configuration for result fusion.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct FusionConfig {
    pub strategy: FusionStrategy,
    /// Weight of the vector side in `Weighted` fusion (0.0 to 1.0)
    pub vector_weight: f32,
    /// The `k` constant in RRF, typically 60
    pub rrf_k: f32,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            strategy: FusionStrategy::Rrf,
            vector_weight: 0.7,
            rrf_k: 60.0,
        }
    }
}

impl FusionConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.vector_weight) {
            return Err(format!(
                "vector_weight must be in [0.0, 1.0], got {}",
                self.vector_weight
            ));
        }
        if self.rrf_k <= 0.0 {
            return Err(format!("rrf_k must be > 0, got {}", self.rrf_k));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn strategy_parses_from_env_strings() {
        assert_eq!("rrf".parse::<FusionStrategy>().unwrap(), FusionStrategy::Rrf);
        assert_eq!("Weighted".parse::<FusionStrategy>().unwrap(), FusionStrategy::Weighted);
        assert_eq!(" max ".parse::<FusionStrategy>().unwrap(), FusionStrategy::Max);
        assert!("median".parse::<FusionStrategy>().is_err());
    }

    #[test]
    fn default_config_validates() {
        assert!(FusionConfig::default().validate().is_ok());
    }

    #[test]
    fn bad_weights_are_rejected() {
        let mut config = FusionConfig::default();
        config.vector_weight = 1.5;
        assert!(config.validate().is_err());

        config.vector_weight = 0.5;
        config.rrf_k = 0.0;
        assert!(config.validate().is_err());
    }
}
