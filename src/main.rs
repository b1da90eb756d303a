use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::*;
use nextshift::config::{self, Config, ScaffoldMode};
use nextshift::summary::{render_manifest, render_report};
use nextshift::theme::Theme;
use nextshift::{Migrator, ProjectAnalyzer};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::warn;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "nextshift", version, about = "Migrate a Next.js project to client-rendered React")]
struct Cli {
    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file to use instead of the per-user one
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert SOURCE into a React project at TARGET
    Convert {
        source: PathBuf,
        target: PathBuf,
        /// Number of files converted in parallel
        #[arg(short = 'j', long)]
        jobs: Option<usize>,
        /// Do not run npm install in the target
        #[arg(long)]
        skip_install: bool,
        /// How to prepare the target project
        #[arg(long, value_enum)]
        scaffold: Option<ScaffoldMode>,
        /// Leave diffs out of the failure report
        #[arg(long)]
        no_diff: bool,
    },
    /// Classify SOURCE without converting anything
    Analyze { source: PathBuf },
    /// Write the default config file
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "nextshift=debug" } else { "nextshift=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Commands::InitConfig { force } = cli.command {
        let path = config::get_config_path()?;
        if path.exists() && !force {
            println!("Config file already exists at {:?} (use --force to overwrite)", path);
            return Ok(ExitCode::SUCCESS);
        }
        Config::create_default(&path)?;
        println!("Created default config file at {:?}", path);
        return Ok(ExitCode::SUCCESS);
    }

    let mut config = Config::resolve(cli.config.as_deref())?;
    if cli.no_color || !config.display.color_output {
        config.display.color_output = false;
        colored::control::set_override(false);
    }
    let theme = Theme::for_display(config.display.color_output);

    match cli.command {
        Commands::Analyze { source } => {
            let manifest = ProjectAnalyzer::new(&source, &config).analyze().await?;
            print!("{}", render_manifest(&manifest, &theme));
            Ok(ExitCode::SUCCESS)
        }
        Commands::Convert {
            source,
            target,
            jobs,
            skip_install,
            scaffold,
            no_diff,
        } => {
            if let Some(jobs) = jobs {
                config.convert.concurrency = jobs;
            }
            if skip_install {
                config.project.install_dependencies = false;
            }
            if let Some(mode) = scaffold {
                config.project.scaffold = mode;
            }
            if no_diff {
                config.display.show_diffs = false;
            }
            let show_diffs = config.display.show_diffs;

            let migrator = Migrator::new(config);
            let cancel = migrator.cancellation();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("interrupt received, finishing running files");
                    cancel.cancel();
                }
            });

            let report = migrator.run(&source, &target).await?;
            print!("{}", render_report(&report, &theme, show_diffs));

            if report.is_success() {
                println!("{}", "Migration complete.".green().bold());
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::FAILURE)
            }
        }
        Commands::InitConfig { .. } => Ok(ExitCode::SUCCESS),
    }
}
