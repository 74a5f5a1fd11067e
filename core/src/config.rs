use serde::{Deserialize, Serialize};

/// Tunable ranking parameters, fixed at engine build time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// How strongly a sentiment mismatch suppresses a match (0 disables).
    pub sentiment_alpha: f32,
    /// Rocchio weight on the original query vector.
    pub rocchio_alpha: f32,
    /// Rocchio weight on the mean relevant vector.
    pub rocchio_beta: f32,
    /// Rocchio weight on the mean non-relevant vector.
    pub rocchio_gamma: f32,
    /// Latent-semantic dimensionality (clamped to corpus/vocabulary size).
    pub latent_dims: usize,
    /// Candidate pool size fetched from a scorer before merging.
    pub candidate_pool: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sentiment_alpha: 0.3,
            rocchio_alpha: 1.0,
            rocchio_beta: 0.75,
            rocchio_gamma: 0.15,
            latent_dims: 40,
            candidate_pool: 50,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_parse_from_empty_json() {
        let cfg: EngineConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(cfg.sentiment_alpha, 0.3);
        assert_eq!(cfg.rocchio_alpha, 1.0);
        assert_eq!(cfg.latent_dims, 40);
    }

    #[test]
    fn overrides_apply() {
        let cfg: EngineConfig =
            serde_json::from_str(r#"{"sentiment_alpha": 0.0, "candidate_pool": 5}"#).unwrap();
        assert_eq!(cfg.sentiment_alpha, 0.0);
        assert_eq!(cfg.candidate_pool, 5);
        assert_eq!(cfg.rocchio_beta, 0.75);
    }
}
