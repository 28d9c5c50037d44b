//! The module responsible for writing output data to disk.
use crate::dispatch::DispatchSchedule;
use crate::id::SourceID;
use crate::pipeline::ProjectResults;
use crate::project::Project;
use crate::sizing::{CapacityPlan, GenerationPeriod};
use crate::time_series::TimeSeriesInput;
use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub mod metadata;
use metadata::write_metadata;

/// The root folder in which project-specific output folders will be created
const OUTPUT_DIRECTORY_ROOT: &str = "renewplan_results";

/// The output file name for the capacity plan
const CAPACITY_PLAN_FILE_NAME: &str = "capacity_plan.csv";

/// The output file name for generation under the capacity plan
const GENERATION_PROFILE_FILE_NAME: &str = "generation_profile.csv";

/// The output file name for the battery schedule
const DISPATCH_SCHEDULE_FILE_NAME: &str = "dispatch_schedule.csv";

/// Get the default output folder for the named project
pub fn get_output_dir(project_name: &str) -> Result<PathBuf> {
    let name = project_name.trim();
    ensure!(
        !name.is_empty() && !name.contains(['/', '\\']) && name != "." && name != "..",
        "Project name {project_name:?} cannot be used as a folder name"
    );

    Ok([OUTPUT_DIRECTORY_ROOT, name].iter().collect())
}

/// Create a new output directory.
///
/// If the directory already exists and is not empty, it is only replaced if `allow_overwrite` is
/// true.
///
/// # Returns
///
/// Whether an existing folder was overwritten
pub fn create_output_directory(output_dir: &Path, allow_overwrite: bool) -> Result<bool> {
    let overwrite = if let Ok(mut it) = fs::read_dir(output_dir) {
        if it.next().is_none() {
            // Folder exists and is empty: nothing to do
            return Ok(false);
        }

        ensure!(
            allow_overwrite,
            "Output folder already exists and is not empty. \
            Please delete the folder or pass the --overwrite command-line option."
        );

        fs::remove_dir_all(output_dir).context("Could not delete folder")?;
        true
    } else {
        false
    };

    fs::create_dir_all(output_dir)?;

    Ok(overwrite)
}

/// Represents a row in the capacity plan CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct CapacityPlanRow {
    source: SourceID,
    yield_factor: f64,
    capacity: f64,
}

/// Write the capacity plan
fn write_capacity_plan(file_path: &Path, plan: &CapacityPlan) -> Result<()> {
    let mut writer = csv::Writer::from_path(file_path)?;
    for (source, capacity) in &plan.capacities {
        writer.serialize(CapacityPlanRow {
            source: source.clone(),
            yield_factor: plan
                .yield_factors
                .get(source.as_str())
                .unwrap_or_default()
                .value(),
            capacity: capacity.value(),
        })?;
    }
    writer.flush()?;

    Ok(())
}

/// Write generation in every period under a capacity plan.
///
/// There is one column per source, so the header is built from the plan.
fn write_generation_profile(
    file_path: &Path,
    sources: &[&SourceID],
    profile: &[GenerationPeriod],
) -> Result<()> {
    let mut writer = csv::Writer::from_path(file_path)?;
    let mut header = vec!["period".to_string(), "demand".to_string()];
    header.extend(sources.iter().map(ToString::to_string));
    header.extend(["total".to_string(), "surplus".to_string()]);
    writer.write_record(&header)?;

    for period in profile {
        let mut record = vec![period.label.to_string(), period.demand.to_string()];
        record.extend(sources.iter().map(|source| {
            period
                .generation
                .get(*source)
                .copied()
                .unwrap_or_default()
                .to_string()
        }));
        record.extend([period.total.to_string(), period.surplus.to_string()]);
        writer.write_record(&record)?;
    }
    writer.flush()?;

    Ok(())
}

/// Write the battery schedule alongside every series of the generation data it was computed from
fn write_dispatch_schedule(
    file_path: &Path,
    generation: &TimeSeriesInput,
    schedule: &DispatchSchedule,
) -> Result<()> {
    let series: Vec<_> = generation
        .series_names()
        .filter_map(|id| Some((id, generation.series(id.as_str())?)))
        .collect();

    let mut writer = csv::Writer::from_path(file_path)?;
    let mut header = vec!["period".to_string()];
    header.extend(series.iter().map(|(id, _)| id.to_string()));
    header.extend(
        ["charge", "discharge", "soc", "shortage", "penalty"]
            .iter()
            .map(ToString::to_string),
    );
    writer.write_record(&header)?;

    for (idx, period) in schedule.periods.iter().enumerate() {
        let mut record = vec![period.label.to_string()];
        record.extend(series.iter().map(|(_, values)| values[idx].to_string()));
        record.extend([
            period.charge.to_string(),
            period.discharge.to_string(),
            period.soc.to_string(),
            period.shortage.to_string(),
            period.penalty.to_string(),
        ]);
        writer.write_record(&record)?;
    }
    writer.flush()?;

    Ok(())
}

/// Write all results for a project to the specified output folder
pub fn write_results(
    output_path: &Path,
    project: &Project,
    results: &ProjectResults,
) -> Result<()> {
    if let Some((plan, profile)) = &results.sizing {
        write_capacity_plan(&output_path.join(CAPACITY_PLAN_FILE_NAME), plan)
            .context("Failed to write capacity plan")?;
        let sources: Vec<_> = plan.capacities.keys().collect();
        write_generation_profile(
            &output_path.join(GENERATION_PROFILE_FILE_NAME),
            &sources,
            profile,
        )
        .context("Failed to write generation profile")?;
    }

    if let (Some(schedule), Some(generation)) = (&results.dispatch, &project.generation) {
        write_dispatch_schedule(
            &output_path.join(DISPATCH_SCHEDULE_FILE_NAME),
            generation,
            schedule,
        )
        .context("Failed to write dispatch schedule")?;
    }

    write_metadata(output_path, project, results).context("Failed to save metadata")?;

    Ok(())
}
