//! Code for writing metadata to file
use crate::pipeline::ProjectResults;
use crate::project::Project;
use anyhow::Result;
use chrono::prelude::*;
use platform_info::{PlatformInfo, PlatformInfoAPI, UNameAPI};
use serde::Serialize;
use std::fs;
use std::path::Path;

/// The output file name for metadata
const METADATA_FILE_NAME: &str = "metadata.toml";

/// Information about the program build via `built` crate
mod built_info {
    // The file has been placed there by the build script.
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

/// Get information about program version from git
fn get_git_hash() -> String {
    let Some(hash) = built_info::GIT_COMMIT_HASH_SHORT else {
        return "unknown".into();
    };

    if built_info::GIT_DIRTY == Some(true) {
        format!("{hash}-dirty")
    } else {
        hash.into()
    }
}

#[derive(Serialize)]
struct Metadata<'a> {
    run: RunMetadata<'a>,
    results: ResultsMetadata,
    program: ProgramMetadata<'a>,
    platform: PlatformMetadata,
}

/// Information about the project run
#[derive(Serialize)]
struct RunMetadata<'a> {
    /// The project name
    project_name: &'a str,
    /// Path to the project which was run
    project_path: &'a Path,
    /// The date and time at which the results were written
    datetime: String,
}

impl<'a> RunMetadata<'a> {
    fn new(project: &'a Project) -> Self {
        let dt = Local::now();
        Self {
            project_name: &project.config.name,
            project_path: &project.dir,
            datetime: dt.to_rfc2822(),
        }
    }
}

/// Headline figures from the solves. Fields are omitted for problems which were not solved.
#[derive(Serialize, Default, Debug, PartialEq)]
struct ResultsMetadata {
    /// Periods in the capacity sizing horizon
    sizing_periods: Option<usize>,
    /// Total installed capacity (MW)
    total_capacity: Option<f64>,
    /// Periods in the dispatch horizon
    dispatch_periods: Option<usize>,
    /// Total penalty for shortages
    total_penalty: Option<f64>,
    /// Total energy not delivered (MWh)
    total_shortage: Option<f64>,
    /// Periods in which there was a shortage
    shortage_periods: Option<usize>,
    /// State of charge at the end of the horizon (MWh)
    final_soc: Option<f64>,
}

impl ResultsMetadata {
    fn new(results: &ProjectResults) -> Self {
        let mut metadata = Self::default();
        if let Some((plan, profile)) = &results.sizing {
            metadata.sizing_periods = Some(profile.len());
            metadata.total_capacity = Some(plan.total_capacity().value());
        }
        if let Some(schedule) = &results.dispatch {
            let summary = schedule.summary();
            metadata.dispatch_periods = Some(schedule.len());
            metadata.total_penalty = Some(summary.total_penalty.value());
            metadata.total_shortage = Some(summary.total_shortage.value());
            metadata.shortage_periods = Some(summary.shortage_periods);
            metadata.final_soc = Some(summary.final_soc.value());
        }

        metadata
    }
}

#[derive(Serialize)]
struct ProgramMetadata<'a> {
    /// The program name
    name: &'a str,
    /// The program version as specified in Cargo.toml
    version: &'a str,
    /// The target architecture for the build (e.g. x86_64-unknown-linux-gnu)
    target: &'a str,
    /// Whether it is a debug build
    is_debug: bool,
    /// The version of rustc used to compile the program
    rustc_version: &'a str,
    /// When the program was built
    build_time_utc: &'a str,
    /// The git commit hash for the version of the program (if known)
    git_commit_hash: String,
}

impl Default for ProgramMetadata<'_> {
    fn default() -> Self {
        Self {
            name: built_info::PKG_NAME,
            version: built_info::PKG_VERSION,
            target: built_info::TARGET,
            is_debug: built_info::DEBUG,
            rustc_version: built_info::RUSTC_VERSION,
            build_time_utc: built_info::BUILT_TIME_UTC,
            git_commit_hash: get_git_hash(),
        }
    }
}

/// Information about the platform on which the program is running.
///
/// The fields correspond to different data available from the [`PlatformInfo`] struct.
#[derive(Serialize)]
struct PlatformMetadata {
    sysname: String,
    nodename: String,
    release: String,
    version: String,
    machine: String,
    osname: String,
}

impl Default for PlatformMetadata {
    fn default() -> Self {
        let info = PlatformInfo::new().expect("Unable to determine platform info");
        Self {
            sysname: info.sysname().to_string_lossy().into(),
            nodename: info.nodename().to_string_lossy().into(),
            release: info.release().to_string_lossy().into(),
            version: info.version().to_string_lossy().into(),
            machine: info.machine().to_string_lossy().into(),
            osname: info.osname().to_string_lossy().into(),
        }
    }
}

/// Write metadata to the specified output path in TOML format
pub fn write_metadata(
    output_path: &Path,
    project: &Project,
    results: &ProjectResults,
) -> Result<()> {
    let metadata = Metadata {
        run: RunMetadata::new(project),
        results: ResultsMetadata::new(results),
        program: ProgramMetadata::default(),
        platform: PlatformMetadata::default(),
    };
    let file_path = output_path.join(METADATA_FILE_NAME);
    fs::write(&file_path, toml::to_string(&metadata)?)?;

    Ok(())
}
