//! Loading a project directory from disk.
//!
//! A project directory contains:
//!
//! * `project.toml` - the project name, description and an optional solver time limit
//! * `parameters.csv` - the flat parameter table
//! * `demand.csv` - hourly demand, for capacity sizing (optional)
//! * `generation.csv` - hourly generation, for battery dispatch (optional)
//!
//! At least one of the time series files must be present.
use crate::input::parameters::{ParameterTable, read_parameters};
use crate::input::time_series::{DEMAND_SCHEMA, GENERATION_SCHEMA, TableSchema, read_time_series};
use crate::input::{input_err_msg, read_toml};
use crate::time_series::TimeSeriesInput;
use anyhow::{Context, Result, ensure};
use log::{debug, info};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The project configuration file
pub const PROJECT_FILE_NAME: &str = "project.toml";
const PARAMETERS_FILE_NAME: &str = "parameters.csv";
const DEMAND_FILE_NAME: &str = "demand.csv";
const GENERATION_FILE_NAME: &str = "generation.csv";

/// The contents of `project.toml`
#[derive(Debug, Deserialize, PartialEq)]
pub struct ProjectConfig {
    /// The project name
    pub name: String,
    /// A free-text description
    #[serde(default)]
    pub description: String,
    /// Maximum time in seconds the LP solver may spend on a single problem
    #[serde(default)]
    pub time_limit: Option<f64>,
}

impl ProjectConfig {
    /// Read and validate a project config file
    pub fn from_path(file_path: &Path) -> Result<Self> {
        let config: ProjectConfig = read_toml(file_path)?;
        config
            .validate()
            .with_context(|| input_err_msg(file_path))?;

        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        ensure!(!self.name.trim().is_empty(), "Project name cannot be empty");
        if let Some(time_limit) = self.time_limit {
            ensure!(
                time_limit.is_finite() && time_limit > 0.0,
                "time_limit must be a positive number of seconds"
            );
        }

        Ok(())
    }

    /// The solver time limit as a [`Duration`], if one was set
    pub fn time_limit_duration(&self) -> Option<Duration> {
        self.time_limit.map(Duration::from_secs_f64)
    }
}

/// All the input data for a project
#[derive(Debug, PartialEq)]
pub struct Project {
    /// The directory the project was loaded from
    pub dir: PathBuf,
    /// Project configuration
    pub config: ProjectConfig,
    /// Named parameters
    pub parameters: ParameterTable,
    /// Hourly demand, if supplied
    pub demand: Option<TimeSeriesInput>,
    /// Hourly generation, if supplied
    pub generation: Option<TimeSeriesInput>,
}

/// Read a time series file if it exists
fn read_optional_time_series(
    file_path: &Path,
    schema: &TableSchema,
) -> Result<Option<TimeSeriesInput>> {
    if !file_path.is_file() {
        debug!("{} not found", file_path.display());
        return Ok(None);
    }

    let time_series = read_time_series(file_path, schema)?;
    info!(
        "Read {} periods from {}",
        time_series.len(),
        file_path.display()
    );

    Ok(Some(time_series))
}

impl Project {
    /// Load a project from the specified directory.
    ///
    /// # Arguments
    ///
    /// * `project_dir` - Folder containing project files
    pub fn from_path(project_dir: &Path) -> Result<Self> {
        ensure!(
            project_dir.is_dir(),
            "{} is not a directory",
            project_dir.display()
        );

        let config = ProjectConfig::from_path(&project_dir.join(PROJECT_FILE_NAME))?;
        let parameters = read_parameters(&project_dir.join(PARAMETERS_FILE_NAME))?;
        let demand =
            read_optional_time_series(&project_dir.join(DEMAND_FILE_NAME), &DEMAND_SCHEMA)?;
        let generation = read_optional_time_series(
            &project_dir.join(GENERATION_FILE_NAME),
            &GENERATION_SCHEMA,
        )?;
        ensure!(
            demand.is_some() || generation.is_some(),
            "Project must contain at least one of {DEMAND_FILE_NAME} or {GENERATION_FILE_NAME}"
        );

        Ok(Self {
            dir: project_dir.to_path_buf(),
            config,
            parameters,
            demand,
            generation,
        })
    }
}
