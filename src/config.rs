//! Analyzer configuration.

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Expected fraction of anomalous rows; sets the decision threshold.
    pub contamination: f64,
    /// Number of isolation trees in the ensemble.
    pub tree_count: usize,
    /// Seed for randomized tree construction. Fixed seed, fixed output.
    pub seed: u64,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            contamination: 0.25,
            tree_count: 200,
            seed: 42,
        }
    }
}

impl AnalyzerConfig {
    /// Load from a TOML file, falling back to defaults if the file is
    /// missing or invalid.
    pub fn load(path: &str) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => {
                    info!("Loaded analyzer config from {}", path);
                    config
                }
                Err(e) => {
                    warn!("Failed to parse config at {}: {}. Using defaults.", path, e);
                    Self::default()
                }
            },
            Err(_) => {
                warn!("Config file not found at {}. Using defaults.", path);
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = AnalyzerConfig::default();
        assert_eq!(config.contamination, 0.25);
        assert_eq!(config.tree_count, 200);
        assert_eq!(config.seed, 42);
    }

    #[test]
    fn test_load_missing_file_falls_back() {
        let config = AnalyzerConfig::load("/nonexistent/logtriage.toml");
        assert_eq!(config.tree_count, 200);
    }

    #[test]
    fn test_load_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "contamination = 0.05").unwrap();
        let config = AnalyzerConfig::load(file.path().to_str().unwrap());
        assert_eq!(config.contamination, 0.05);
        assert_eq!(config.tree_count, 200);
        assert_eq!(config.seed, 42);
    }
}
