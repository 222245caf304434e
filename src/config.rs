use std::{collections::BTreeMap, io::ErrorKind, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const SETTINGS_FILE_NAME: &str = "config.json";

const DEFAULT_RECENT_LIMIT: usize = 10;

/// Optional user settings stored as `config.json` in the application directory.
/// Every field has a default, so a partial file is fine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Extra candidates offered by the command entry next to the built in commands.
    pub vocabulary: Vec<String>,
    /// Program and arguments run when a countdown finishes. The terminal bell is used otherwise.
    pub alarm_command: Option<Vec<String>>,
    /// How many entries `todo --list` and `track --view` show.
    pub recent_limit: usize,
    /// Display labels for triage letters.
    pub triage_labels: BTreeMap<char, String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            vocabulary: Vec::new(),
            alarm_command: None,
            recent_limit: DEFAULT_RECENT_LIMIT,
            triage_labels: default_triage_labels(),
        }
    }
}

fn default_triage_labels() -> BTreeMap<char, String> {
    [
        ('u', "urgent"),
        ('d', "do"),
        ('l', "lessons"),
        ('c', "create"),
        ('e', "experiences"),
        ('b', "bored"),
        ('w', "wins"),
        ('x', "deleted"),
        ('q', "questions"),
    ]
    .into_iter()
    .map(|(letter, label)| (letter, label.to_string()))
    .collect()
}

impl Settings {
    /// Reads settings from `dir`. A missing file means defaults, a malformed one is an error.
    pub fn load(dir: &Path) -> Result<Self> {
        let path = dir.join(SETTINGS_FILE_NAME);
        match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content)
                .with_context(|| format!("Malformed settings file {path:?}")),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No settings at {path:?}, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(e).with_context(|| format!("Couldn't read settings file {path:?}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use tempfile::tempdir;

    use super::{Settings, SETTINGS_FILE_NAME};

    #[test]
    fn test_missing_file_gives_defaults() -> Result<()> {
        let dir = tempdir()?;
        let settings = Settings::load(dir.path())?;
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.recent_limit, 10);
        assert_eq!(settings.triage_labels[&'u'], "urgent");
        Ok(())
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() -> Result<()> {
        let dir = tempdir()?;
        std::fs::write(
            dir.path().join(SETTINGS_FILE_NAME),
            r#"{ "recent_limit": 3, "alarm_command": ["paplay", "alarm.wav"] }"#,
        )?;

        let settings = Settings::load(dir.path())?;
        assert_eq!(settings.recent_limit, 3);
        assert_eq!(
            settings.alarm_command,
            Some(vec!["paplay".to_string(), "alarm.wav".to_string()])
        );
        assert!(settings.vocabulary.is_empty());
        assert_eq!(settings.triage_labels.len(), 9);
        Ok(())
    }

    #[test]
    fn test_malformed_file_is_an_error() -> Result<()> {
        let dir = tempdir()?;
        std::fs::write(dir.path().join(SETTINGS_FILE_NAME), "{ recent_limit: ")?;
        assert!(Settings::load(dir.path()).is_err());
        Ok(())
    }
}
