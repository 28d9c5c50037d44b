//! The command line interface for the planner.
use crate::log;
use crate::lp::{HighsBackend, SolveOptions};
use crate::output::{create_output_directory, get_output_dir};
use crate::pipeline::{ProjectResults, prepare, run_and_report};
use crate::project::{PROJECT_FILE_NAME, Project, ProjectConfig};
use crate::settings::Settings;
use ::log::{info, warn};
use anyhow::{Context, Result};
use clap::{Args, CommandFactory, Parser, Subcommand};
use std::path::{Path, PathBuf};

pub mod settings;
use settings::SettingsSubcommands;

/// The command line interface for the planner.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// The available commands.
    #[command(subcommand)]
    command: Option<Commands>,
    /// Flag to provide the CLI docs as markdown
    #[arg(long, hide = true)]
    markdown_help: bool,
}

/// Options for the run command
#[derive(Args, Default)]
pub struct RunOpts {
    /// Directory for output files
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
    /// Whether to overwrite the output directory if it already exists
    #[arg(long)]
    pub overwrite: bool,
}

/// The available commands.
#[derive(Subcommand)]
enum Commands {
    /// Size generation capacity and schedule the battery for a project.
    Run {
        /// Path to the project directory.
        project_dir: PathBuf,
        /// Other run options
        #[command(flatten)]
        opts: RunOpts,
    },
    /// Check a project's input files without solving anything.
    Validate {
        /// The path to the project directory.
        project_dir: PathBuf,
    },
    /// Manage the program settings file.
    Settings {
        /// The available subcommands for managing settings.
        #[command(subcommand)]
        subcommand: SettingsSubcommands,
    },
}

impl Commands {
    /// Execute the supplied CLI command
    fn execute(self) -> Result<()> {
        match self {
            Self::Run { project_dir, opts } => {
                handle_run_command(&project_dir, &opts, None).map(|_| ())
            }
            Self::Validate { project_dir } => handle_validate_command(&project_dir, None),
            Self::Settings { subcommand } => subcommand.execute(),
        }
    }
}

/// Parse CLI arguments and start the program
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    // Invoked as: `$ renewplan --markdown-help`
    if cli.markdown_help {
        clap_markdown::print_help_markdown::<Cli>();
        return Ok(());
    }

    let Some(command) = cli.command else {
        let help_str = Cli::command().render_long_help().to_string();
        println!("{help_str}");
        return Ok(());
    };

    command.execute()
}

/// Load program settings, if not provided
fn load_settings(settings: Option<Settings>) -> Result<Settings> {
    match settings {
        Some(settings) => Ok(settings),
        None => Settings::load().context("Failed to load settings."),
    }
}

/// Log headline figures for a completed run
fn log_summary(results: &ProjectResults) {
    if let Some((plan, _)) = &results.sizing {
        for (source, capacity) in &plan.capacities {
            info!("Capacity for {source}: {capacity} MW");
        }
        info!("Total capacity: {} MW", plan.total_capacity());
    }

    if let Some(schedule) = &results.dispatch {
        let summary = schedule.summary();
        info!(
            "Battery schedule: {} MWh shortage in {} of {} periods, total penalty {}",
            summary.total_shortage,
            summary.shortage_periods,
            schedule.len(),
            summary.total_penalty
        );
    }
}

/// Handle the `run` command.
pub fn handle_run_command(
    project_dir: &Path,
    opts: &RunOpts,
    settings: Option<Settings>,
) -> Result<ProjectResults> {
    let settings = load_settings(settings)?;

    // The project name is needed to pick the default output folder
    let config = ProjectConfig::from_path(&project_dir.join(PROJECT_FILE_NAME))
        .context("Failed to load project.")?;

    // Get path to output folder
    let pathbuf: PathBuf;
    let output_path = if let Some(p) = opts.output_dir.as_deref() {
        p
    } else {
        pathbuf = get_output_dir(&config.name)?;
        &pathbuf
    };

    // This setting can be overridden by command-line argument
    let allow_overwrite = opts.overwrite || settings.overwrite;
    let overwrite = create_output_directory(output_path, allow_overwrite).with_context(|| {
        format!(
            "Failed to create output directory: {}",
            output_path.display()
        )
    })?;

    // Initialise program logger
    if !log::is_logger_initialised() {
        log::init(Some(&settings.log_level), Some(output_path))
            .context("Failed to initialise logging.")?;
    }
    info!("Output folder: {}", output_path.display());

    // NB: We have to wait until the logger is initialised to display this warning
    if overwrite {
        warn!("Output folder will be overwritten");
    }

    // A time limit in the project takes precedence over the program settings
    let mut options = SolveOptions::default();
    if let Some(time_limit) = config
        .time_limit_duration()
        .or_else(|| settings.time_limit_duration())
    {
        options = options.with_time_limit(time_limit);
    }

    let results = run_and_report(project_dir, output_path, &HighsBackend, &options)?;
    log_summary(&results);
    info!("Run complete!");

    Ok(results)
}

/// Handle the `validate` command.
pub fn handle_validate_command(project_dir: &Path, settings: Option<Settings>) -> Result<()> {
    let settings = load_settings(settings)?;

    // Initialise program logger (we won't save log files when running the validate command)
    if !log::is_logger_initialised() {
        log::init(Some(&settings.log_level), None).context("Failed to initialise logging.")?;
    }

    // Load and validate the project
    let project = Project::from_path(project_dir).context("Failed to load project.")?;
    let tasks = prepare(&project).context("Invalid project inputs.")?;
    if let Some(task) = &tasks.sizing {
        info!(
            "Capacity sizing: {} periods, {} sources",
            task.demand.len(),
            task.yield_factors.len()
        );
    }
    if let Some(task) = &tasks.dispatch {
        info!("Battery dispatch: {} periods", task.generation.len());
    }
    info!("Project validation successful!");

    Ok(())
}
