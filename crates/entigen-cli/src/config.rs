use std::path::{Path, PathBuf};

use entigen_generate::GenerateOptions;
use serde::{Deserialize, Serialize};

use crate::CliError;

pub const DEFAULT_CONFIG_FILE: &str = "entigen.toml";
pub const DEFAULT_OUTPUT_DIR: &str = "generated";

/// Project settings read from `entigen.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Declaration files or directories, relative to the config file.
    pub inputs: Vec<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub generate: GenerateOptions,
}

impl Settings {
    /// Load `path`, or the default file when present. A missing default file
    /// yields default settings; a missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Settings, CliError> {
        let (path, explicit) = match path {
            Some(path) => (path.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };
        if !explicit && !path.exists() {
            return Ok(Settings::default());
        }

        let content = std::fs::read_to_string(&path)?;
        let mut settings: Settings = toml::from_str(&content)?;
        if let Some(base) = path.parent().filter(|base| !base.as_os_str().is_empty()) {
            settings.inputs = settings
                .inputs
                .into_iter()
                .map(|input| base.join(input))
                .collect();
            settings.output_dir = settings.output_dir.map(|dir| base.join(dir));
        }
        tracing::debug!(path = %path.display(), inputs = settings.inputs.len(), "settings loaded");
        Ok(settings)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_partial_settings() {
        let settings: Settings = toml::from_str(
            r#"
            inputs = ["entities"]

            [generate]
            generators = ["prisma", "zod"]
            mock_count = 3
            "#,
        )
        .expect("parse settings");

        assert_eq!(settings.inputs, vec![PathBuf::from("entities")]);
        assert_eq!(settings.generate.generators, vec!["prisma", "zod"]);
        assert_eq!(settings.generate.mock_count, 3);
        assert_eq!(settings.generate.seed, GenerateOptions::default().seed);
        assert_eq!(settings.output_dir(), PathBuf::from(DEFAULT_OUTPUT_DIR));
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let missing = Path::new("definitely-missing-entigen.toml");
        assert!(Settings::load(Some(missing)).is_err());
    }
}
