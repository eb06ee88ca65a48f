//! Configuration loading and validation.
//!
//! Two kinds of files are read:
//! - `AppConfig` (TOML): log level and engine defaults
//! - `TournamentConfig` (JSON or TOML, by extension): teams, brackets and
//!   the results reported so far

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use thiserror::Error;

use crate::bracket::BracketFormat;
use crate::models::{ReportedResult, Team, TeamId};
use crate::tournament::TeamSelector;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Failed to parse JSON config: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Defaults applied to brackets that leave them unset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineDefaults {
    /// Best-of length of a set
    #[serde(default = "default_best_of")]
    pub best_of: u32,
}

fn default_best_of() -> u32 {
    3
}

impl Default for EngineDefaults {
    fn default() -> Self {
        Self {
            best_of: default_best_of(),
        }
    }
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub defaults: EngineDefaults,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            defaults: EngineDefaults::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_best_of(self.defaults.best_of, "defaults")
    }
}

fn validate_best_of(best_of: u32, context: &str) -> Result<(), ConfigError> {
    if best_of == 0 || best_of % 2 == 0 {
        return Err(ConfigError::ValidationError(format!(
            "{}: best_of must be an odd number of games, got {}",
            context, best_of
        )));
    }
    Ok(())
}

/// Where a bracket takes its teams from once its sources are finished.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BracketSource {
    pub bracket_idx: usize,
    pub selector: TeamSelector,
}

/// One bracket of a tournament definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BracketConfig {
    pub name: String,

    pub format: BracketFormat,

    /// Falls back to `EngineDefaults::best_of`
    #[serde(default)]
    pub best_of: Option<u32>,

    /// Explicit starting pool. Without one, the pool is every team whose
    /// `starting_bracket_idx` points here.
    #[serde(default)]
    pub teams: Option<Vec<TeamId>>,

    /// Brackets feeding this one
    #[serde(default)]
    pub sources: Vec<BracketSource>,
}

/// A whole tournament: teams, ordered brackets and results so far.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TournamentConfig {
    pub name: String,

    pub teams: Vec<Team>,

    pub brackets: Vec<BracketConfig>,

    /// Results in the order they were reported
    #[serde(default)]
    pub results: Vec<ReportedResult>,
}

impl TournamentConfig {
    /// Load a tournament definition. `.toml` files are read as TOML,
    /// everything else as JSON.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: TournamentConfig = match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => toml::from_str(&contents)?,
            _ => serde_json::from_str(&contents)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.brackets.is_empty() {
            return Err(ConfigError::ValidationError(
                "Tournament needs at least one bracket".to_string(),
            ));
        }

        let mut ids = BTreeSet::new();
        for team in &self.teams {
            if !ids.insert(team.id) {
                return Err(ConfigError::ValidationError(format!(
                    "Duplicate team id {}",
                    team.id
                )));
            }
            if team.starting_bracket_idx >= self.brackets.len() {
                return Err(ConfigError::ValidationError(format!(
                    "Team {} starts in unknown bracket {}",
                    team.id, team.starting_bracket_idx
                )));
            }
        }

        for (idx, bracket) in self.brackets.iter().enumerate() {
            let context = format!("bracket {}", idx);
            if let Some(best_of) = bracket.best_of {
                validate_best_of(best_of, &context)?;
            }
            match bracket.format {
                BracketFormat::Swiss { rounds: 0 } => {
                    return Err(ConfigError::ValidationError(format!(
                        "{}: swiss needs at least one round",
                        context
                    )));
                }
                BracketFormat::RoundRobin { groups: 0 } => {
                    return Err(ConfigError::ValidationError(format!(
                        "{}: round robin needs at least one group",
                        context
                    )));
                }
                _ => {}
            }
            for team_id in bracket.teams.iter().flatten() {
                if !ids.contains(team_id) {
                    return Err(ConfigError::ValidationError(format!(
                        "{}: unknown team {}",
                        context, team_id
                    )));
                }
            }
            if let Some(source) = bracket.sources.iter().find(|s| s.bracket_idx >= idx) {
                return Err(ConfigError::ValidationError(format!(
                    "{}: source bracket {} must come earlier",
                    context, source.bracket_idx
                )));
            }
        }

        if let Some(result) = self
            .results
            .iter()
            .find(|r| r.bracket_idx >= self.brackets.len())
        {
            return Err(ConfigError::ValidationError(format!(
                "Result for match {} targets unknown bracket {}",
                result.match_id, result.bracket_idx
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const TOURNAMENT_JSON: &str = r#"{
        "name": "Paddling Pool",
        "teams": [
            {"id": 1, "name": "Error 404", "roster": [10, 11]},
            {"id": 2, "name": "This Is Fine", "roster": [20, 21]},
            {"id": 3, "name": "Tidy Tidings", "roster": [30, 31]}
        ],
        "brackets": [
            {"name": "Groups", "format": {"type": "round_robin", "groups": 1}},
            {
                "name": "Finals",
                "format": {"type": "single_elimination"},
                "best_of": 5,
                "sources": [{"bracket_idx": 0, "selector": {"top": 2}}]
            }
        ],
        "results": [
            {"bracket_idx": 0, "match_id": 0, "games": [
                {"winner": "first", "mode": "SZ", "stage_id": 3}
            ]}
        ]
    }"#;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();

        assert_eq!(config.log_level, "info");
        assert_eq!(config.defaults.best_of, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation_even_best_of() {
        let mut config = AppConfig::default();
        config.defaults.best_of = 4;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_serialization() {
        let config = AppConfig::default();
        let toml_str = toml::to_string(&config).unwrap();

        // Should be parseable
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(config.defaults.best_of, parsed.defaults.best_of);
    }

    #[test]
    fn test_app_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "log_level = \"debug\"\n[defaults]\nbest_of = 5").unwrap();

        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.defaults.best_of, 5);
    }

    #[test]
    fn test_tournament_config_from_json_file() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        file.write_all(TOURNAMENT_JSON.as_bytes()).unwrap();

        let config = TournamentConfig::from_file(file.path()).unwrap();
        assert_eq!(config.teams.len(), 3);
        assert_eq!(config.brackets[1].best_of, Some(5));
        assert_eq!(
            config.brackets[1].sources[0].selector,
            TeamSelector::Top(2)
        );
        assert_eq!(config.results[0].games.len(), 1);
    }

    #[test]
    fn test_tournament_config_from_toml_file() {
        let toml_src = r#"
name = "Swiss Night"

[[teams]]
id = 1
name = "A"

[[teams]]
id = 2
name = "B"

[[brackets]]
name = "Swiss"
format = { type = "swiss", rounds = 3 }
"#;
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(toml_src.as_bytes()).unwrap();

        let config = TournamentConfig::from_file(file.path()).unwrap();
        assert_eq!(config.brackets[0].format, BracketFormat::Swiss { rounds: 3 });
        assert!(config.results.is_empty());
    }

    #[test]
    fn test_tournament_validation_duplicate_team() {
        let mut config: TournamentConfig = serde_json::from_str(TOURNAMENT_JSON).unwrap();
        config.teams[2].id = TeamId(1);

        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_tournament_validation_result_bracket_out_of_range() {
        let mut config: TournamentConfig = serde_json::from_str(TOURNAMENT_JSON).unwrap();
        config.results[0].bracket_idx = 7;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_tournament_validation_forward_source() {
        let mut config: TournamentConfig = serde_json::from_str(TOURNAMENT_JSON).unwrap();
        config.brackets[1].sources[0].bracket_idx = 1;

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_tournament_validation_zero_swiss_rounds() {
        let mut config: TournamentConfig = serde_json::from_str(TOURNAMENT_JSON).unwrap();
        config.brackets[0].format = BracketFormat::Swiss { rounds: 0 };

        assert!(config.validate().is_err());
    }
}
