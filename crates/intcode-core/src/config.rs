//! Configuration types for running programs.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Which cell type programs are loaded with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WordKind {
    /// 32-bit cells
    Small,
    /// 64-bit cells
    #[default]
    Wide,
    /// Arbitrary-precision cells
    Big,
}

impl FromStr for WordKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "small" | "i32" => Ok(WordKind::Small),
            "wide" | "i64" => Ok(WordKind::Wide),
            "big" | "bigint" => Ok(WordKind::Big),
            other => Err(Error::Config(format!("unknown word kind '{}'", other))),
        }
    }
}

impl fmt::Display for WordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WordKind::Small => "small",
            WordKind::Wide => "wide",
            WordKind::Big => "big",
        };
        write!(f, "{}", name)
    }
}

/// Single-machine run options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Cell type
    pub word: WordKind,
    /// Feed arguments as text lines and print output as text
    pub ascii: bool,
    /// Default tracing filter when RUST_LOG is unset
    pub log_filter: String,
    /// Emit logs as JSON lines
    pub log_json: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            word: WordKind::default(),
            ascii: false,
            log_filter: "warn,intcode=info".to_string(),
            log_json: false,
        }
    }
}

/// Chained machines, each primed with a phase setting
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// One phase setting per stage
    pub phases: Vec<i64>,
    /// Loop the last stage back into the first until it halts
    pub feedback: bool,
    /// Value fed to the first stage after its phase
    pub initial_signal: i64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            phases: vec![0, 1, 2, 3, 4],
            feedback: false,
            initial_signal: 0,
        }
    }
}

/// Packet network of machines
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Number of machines
    pub size: usize,
    /// Input given to a machine with no pending packets
    pub idle_input: i64,
    /// Destination address captured by the NAT
    pub nat_address: i64,
    /// Upper bound on scheduling rounds
    pub max_rounds: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            size: 50,
            idle_input: -1,
            nat_address: 255,
            max_rounds: 1_000_000,
        }
    }
}

/// Everything the command line runner reads
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub run: RunConfig,
    pub pipeline: PipelineConfig,
    pub network: NetworkConfig,
}

impl CliConfig {
    /// Load a JSON configuration file. Missing fields take their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config = serde_json::from_str(&text)?;
        tracing::debug!("Loaded configuration from {}", path.as_ref().display());
        Ok(config)
    }

    /// Apply `INTCODE_WORD` and `INTCODE_LOG` overrides.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(
            std::env::var("INTCODE_WORD").ok().as_deref(),
            std::env::var("INTCODE_LOG").ok().as_deref(),
        )
    }

    fn apply_overrides(&mut self, word: Option<&str>, log: Option<&str>) -> Result<()> {
        if let Some(word) = word {
            self.run.word = word.parse()?;
        }
        if let Some(log) = log {
            self.run.log_filter = log.to_string();
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.pipeline.phases.is_empty() {
            return Err(Error::Config("pipeline needs at least one phase".to_string()));
        }
        if self.network.size == 0 {
            return Err(Error::Config("network needs at least one machine".to_string()));
        }
        let nat = self.network.nat_address;
        if usize::try_from(nat).map_or(false, |nat| nat < self.network.size) {
            return Err(Error::Config(format!(
                "NAT address {} collides with a machine address",
                nat
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_configs() {
        let config = CliConfig::default();
        assert_eq!(config.run.word, WordKind::Wide);
        assert!(!config.run.ascii);
        assert_eq!(config.pipeline.phases.len(), 5);
        assert_eq!(config.network.size, 50);
        assert_eq!(config.network.nat_address, 255);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_word_kind_parsing() {
        assert_eq!("big".parse::<WordKind>().unwrap(), WordKind::Big);
        assert_eq!("I32".parse::<WordKind>().unwrap(), WordKind::Small);
        assert!("float".parse::<WordKind>().is_err());
        assert_eq!(WordKind::Big.to_string(), "big");
    }

    #[test]
    fn test_partial_json() {
        let json = r#"{ "run": { "word": "big" }, "pipeline": { "feedback": true } }"#;
        let config: CliConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.run.word, WordKind::Big);
        assert!(config.pipeline.feedback);
        assert_eq!(config.pipeline.phases, vec![0, 1, 2, 3, 4]);
        assert_eq!(config.network.idle_input, -1);
    }

    #[test]
    fn test_overrides() {
        let mut config = CliConfig::default();
        config.apply_overrides(Some("small"), Some("debug")).unwrap();
        assert_eq!(config.run.word, WordKind::Small);
        assert_eq!(config.run.log_filter, "debug");
        assert!(config.apply_overrides(Some("huge"), None).is_err());
    }

    #[test]
    fn test_validate_rejects_nat_collision() {
        let mut config = CliConfig::default();
        config.network.nat_address = 10;
        assert!(config.validate().is_err());

        let mut config = CliConfig::default();
        config.pipeline.phases.clear();
        assert!(config.validate().is_err());
    }
}
