use std::env;
use std::io::Write;
use std::str::FromStr;
use std::time::Instant;

use anyhow::Result;
use env_logger::Builder;
use log::{error, info, LevelFilter};

use imputation_pipelines::cli::parse;
use imputation_pipelines::config::defs::{Pipeline, PipelineError, RunConfig, REFERENCE_DIR, TOOLS_DIR};
use imputation_pipelines::pipelines::run_action;
use imputation_pipelines::utils::install::install_imputation_tools;
use imputation_pipelines::utils::reference::ReferenceRegistry;
use imputation_pipelines::utils::system::{generate_rng, generate_run_id, resolve_path};


#[tokio::main]
async fn main() -> Result<()> {
    let run_start = Instant::now();

    let args = parse();

    let log_level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };

    Builder::new()
        .filter_level(log_level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{}] {}: {}",
                chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
                record.level(),
                record.args()
            )
        })
        .init();

    println!("\n-------------\n Imputation\n-------------\n");

    let dir = env::current_dir()?;
    info!("The current directory is {:?}", dir);

    let tools_dir = resolve_path(&dir, args.tools_dir.as_deref(), TOOLS_DIR);
    let reference_dir = resolve_path(&dir, args.reference_dir.as_deref(), REFERENCE_DIR);
    info!("Tools directory: {}", tools_dir.display());
    info!("Reference directory: {}", reference_dir.display());

    let mut rng = generate_rng(args.seed);
    let run_id = generate_run_id(&mut rng);

    let run_config = RunConfig {
        cwd: dir,
        tools_dir,
        reference_dir,
        run_id,
        args,
    };

    if let Err(e) = run(&run_config).await {
        error!("Pipeline failed: {} at {} milliseconds.", e, run_start.elapsed().as_millis());
        std::process::exit(1);
    }

    println!("Run complete: {} milliseconds.", run_start.elapsed().as_millis());
    Ok(())
}

/// Performs every request of the command line, in order: tool installation,
/// panel listing, panel installation, then the pipeline action.
async fn run(config: &RunConfig) -> Result<(), PipelineError> {
    let args = &config.args;
    let mut registry = ReferenceRegistry::new(&config.reference_dir);
    registry.add_custom_panels()?;

    let mut requested = false;

    if args.dl_tools {
        requested = true;
        install_imputation_tools(&config.tools_dir, &config.cwd).await?;
        info!("Imputation tools installed in {}", config.tools_dir.display());
    }

    if args.list {
        requested = true;
        println!("{}", registry.listing());
    }

    if let Some(name) = &args.dl_reference {
        requested = true;
        let chromosomes = registry.install_panel(name, &config.tools_dir, &config.cwd).await?;
        info!("Reference panel {} installed with {} chromosomes", name, chromosomes.len());
    }

    if let Some(action) = &args.action {
        requested = true;
        let pipeline = Pipeline::from_str(action)?;
        let worksheet = run_action(config, &mut registry, pipeline).await?;
        info!("Worksheet: {}", worksheet.display());
    }

    if !requested {
        return Err(PipelineError::InvalidConfig(
            "Nothing to do. Use --dl-tools, --list, --dl-reference or --action (see --help)".to_string(),
        ));
    }
    Ok(())
}
