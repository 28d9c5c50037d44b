//! Capacity sizing and battery dispatch optimisation for hybrid renewable energy projects.
//!
//! Both optimisations are formulated as linear programs over an hourly horizon and solved through
//! an [`lp::LpBackend`]. The [`pipeline`] module chains ingestion, validation, solving and
//! reporting together.
#![warn(missing_docs)]
use std::path::PathBuf;

pub mod battery;
pub mod cli;
pub mod dispatch;
pub mod error;
pub mod id;
pub mod input;
pub mod log;
pub mod lp;
pub mod output;
pub mod pipeline;
pub mod project;
pub mod settings;
pub mod sizing;
pub mod time_series;
pub mod units;

#[cfg(test)]
mod fixture;

/// Get the directory in which program-wide configuration files are stored.
///
/// Falls back on the current working directory if the platform has no config directory.
pub fn get_renewplan_config_dir() -> PathBuf {
    let Some(mut config_dir) = dirs::config_dir() else {
        return PathBuf::default();
    };

    config_dir.push("renewplan");
    config_dir
}
