//! MultiTake CLI: auto-cut multi-camera takes against a reference track.
//!
//! ## Usage
//!
//! ```bash
//! multitake --folder gig                          # 30s from 0:30, cut every 5s
//! multitake --folder gig --start 60 --step 2      # faster cuts later in the song
//! multitake --folder gig --beats auto --seed 7    # cut on detected beats, reproducibly
//! multitake --folder gig --dry-run > plan.json    # schedule only
//! multitake --folder gig --step 3 --save          # keep the new step in the config
//! ```

mod args;
mod discovery;

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use clap::Parser;
use multitake_core::config::ConfigManager;
use multitake_core::logging::{init_tracing, LogConfig, LogLevel, RunLogger};
use multitake_core::orchestrator::{
    create_planning_pipeline, create_standard_pipeline, Context, RunState,
};

use args::Args;

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    let args = Args::parse();

    let mut config = ConfigManager::new(&args.config);
    config
        .load_or_create()
        .with_context(|| format!("loading {}", args.config.display()))?;
    args.apply(config.settings_mut());
    config.settings().validate().map_err(anyhow::Error::msg)?;
    for section in args.sections_to_save() {
        config
            .update_section(section)
            .with_context(|| format!("saving [{}]", section.table_name()))?;
    }
    config
        .ensure_dirs_exist()
        .context("creating output, temp and log folders")?;
    let settings = config.into_settings();

    init_tracing(if args.debug {
        LogLevel::Debug
    } else {
        settings.logging.level
    });
    tracing::debug!("[CLI] multitake_core {}", multitake_core::version());

    let project = discovery::discover(&args.folder)?;
    let run_name = project.name.clone();

    let log_config = if args.debug {
        LogConfig::debug()
    } else {
        settings.logging.log_config()
    };
    let logger = Arc::new(
        RunLogger::new(
            &run_name,
            &settings.paths.logs_folder,
            log_config,
            Some(Box::new(|line: &str| eprintln!("{}", line))),
        )
        .context("creating run log")?,
    );

    let work_dir = PathBuf::from(&settings.paths.temp_root).join(&run_name);
    let output_dir = PathBuf::from(&settings.paths.output_folder);
    let ctx = Context::new(project, settings, work_dir, output_dir, Arc::clone(&logger));

    let pipeline = if args.dry_run {
        create_planning_pipeline()
    } else {
        create_standard_pipeline()
    };
    let mut state = RunState::new(&run_name);

    let result = match pipeline.run(&ctx, &mut state) {
        Ok(result) => result,
        Err(e) => {
            logger.finish(false);
            return Err(e.into());
        }
    };
    logger.finish(!result.cancelled);

    if args.dry_run {
        let output = state
            .schedule
            .as_ref()
            .context("no schedule was produced")?;
        println!("{}", output.schedule.to_json()?);
        eprintln!("seed: {}", output.seed);
    } else if let Some(path) = state.render.as_ref().and_then(|r| r.output_path.as_ref()) {
        println!("{}", path.display());
    }

    Ok(if result.cancelled {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
