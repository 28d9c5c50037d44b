//! Code for loading program settings.
use crate::get_renewplan_config_dir;
use crate::input::read_toml;
use crate::log::DEFAULT_LOG_LEVEL;
use anyhow::{Result, ensure};
use documented::DocumentedFields;
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

const SETTINGS_FILE_NAME: &str = "settings.toml";

const DEFAULT_SETTINGS_FILE_HEADER: &str = "# This file contains the program settings for renewplan.
# Uncomment a setting to change its value.
";

/// The time limit written (commented out) to the default settings file, as there is no default
const EXAMPLE_TIME_LIMIT: f64 = 60.0;

/// Default log level for program
fn default_log_level() -> String {
    DEFAULT_LOG_LEVEL.to_string()
}

/// Get the path to where the settings file will be read from
pub fn get_settings_file_path() -> PathBuf {
    let mut path = get_renewplan_config_dir();
    path.push(SETTINGS_FILE_NAME);

    path
}

/// Program settings from config file
#[derive(Debug, DocumentedFields, Serialize, Deserialize, PartialEq)]
pub struct Settings {
    /// The default program log level
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Whether to overwrite output files by default
    #[serde(default)]
    pub overwrite: bool,
    /// Maximum time in seconds the LP solver may spend on a single problem.
    /// There is no limit if this is unset.
    #[serde(default)]
    pub time_limit: Option<f64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            overwrite: false,
            time_limit: None,
        }
    }
}

impl Settings {
    /// Read the program settings file.
    ///
    /// If the file is not present, default values for settings will be used
    pub fn load() -> Result<Settings> {
        Self::load_from_path(&get_settings_file_path())
    }

    /// Read settings from the specified path
    fn load_from_path(file_path: &Path) -> Result<Settings> {
        if !file_path.is_file() {
            return Ok(Settings::default());
        }

        let settings: Settings = read_toml(file_path)?;
        if let Some(time_limit) = settings.time_limit {
            ensure!(
                time_limit.is_finite() && time_limit > 0.0,
                "time_limit must be a positive number of seconds"
            );
        }

        Ok(settings)
    }

    /// The solver time limit as a [`Duration`], if one was set
    pub fn time_limit_duration(&self) -> Option<Duration> {
        self.time_limit.map(Duration::from_secs_f64)
    }

    /// The contents of the default settings file
    pub fn default_file_contents() -> String {
        let mut settings: Settings =
            toml::from_str("").expect("Cannot create settings from empty TOML file");

        // Optional settings are omitted from TOML unless they have a value
        settings.time_limit = Some(EXAMPLE_TIME_LIMIT);
        let settings_raw = toml::to_string(&settings).expect("Could not convert settings to TOML");

        // Comment out every setting and precede it with its documentation
        let mut out = DEFAULT_SETTINGS_FILE_HEADER.to_string();
        for line in settings_raw.split('\n') {
            if let Some(last) = line.find('=') {
                let field = line[..last].trim();

                // All fields should have doc comments
                let docs = Settings::get_field_docs(field).expect("Missing doc comment for field");
                for line in docs.split('\n') {
                    write!(&mut out, "\n# # {}\n", line.trim()).unwrap();
                }

                writeln!(&mut out, "# {}", line.trim()).unwrap();
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_settings_load_from_path_no_file() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join(SETTINGS_FILE_NAME); // NB: doesn't exist
        assert_eq!(
            Settings::load_from_path(&file_path).unwrap(),
            Settings::default()
        );
    }

    #[test]
    fn test_settings_load_from_path() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join(SETTINGS_FILE_NAME);

        {
            let mut file = File::create(&file_path).unwrap();
            writeln!(file, "log_level = \"warn\"\ntime_limit = 30.0").unwrap();
        }

        let settings = Settings::load_from_path(&file_path).unwrap();
        assert_eq!(
            settings,
            Settings {
                log_level: "warn".to_string(),
                overwrite: false,
                time_limit: Some(30.0),
            }
        );
        assert_eq!(
            settings.time_limit_duration(),
            Some(Duration::from_secs(30))
        );
    }

    #[test]
    fn test_settings_load_from_path_bad_time_limit() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join(SETTINGS_FILE_NAME);

        {
            let mut file = File::create(&file_path).unwrap();
            writeln!(file, "time_limit = -1.0").unwrap();
        }

        assert!(Settings::load_from_path(&file_path).is_err());
    }

    #[test]
    fn test_default_file_contents() {
        let contents = Settings::default_file_contents();
        assert!(contents.contains("# log_level = \"info\""));
        assert!(
            contents.contains("# # Whether to overwrite output files by default")
        );
        assert!(contents.contains("# # There is no limit if this is unset."));
        assert!(contents.contains("# time_limit = 60.0"));

        // Uncommenting every setting gives a valid file
        let uncommented = contents
            .lines()
            .filter(|line| !line.starts_with("# #"))
            .map(|line| line.strip_prefix("# ").unwrap_or(line))
            .filter(|line| line.contains('='))
            .collect::<Vec<_>>()
            .join("\n");
        let settings: Settings = toml::from_str(&uncommented).unwrap();
        assert_eq!(settings.time_limit, Some(EXAMPLE_TIME_LIMIT));
    }
}
