// src/main.rs

use anyhow::Result;
use clap::{Parser, Subcommand};
use relic::roadmap::report;
use relic::{ArtifactRegistry, Index, Platform, Roadmap, RoadmapOptions, RuleStore, DEFAULT_TIERS};
use tracing::info;

#[derive(Parser)]
#[command(name = "relic")]
#[command(author, version, about = "Build-dependency roadmap resolver for legacy platform porting", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an empty requirement index database
    InitDb {
        /// Index database path
        #[arg(long, default_value = "relic-index.db")]
        db: String,
    },
    /// Resolve the build roadmap for a target source package
    Resolve {
        /// Target source package name
        target: String,
        /// Index database path
        #[arg(long, default_value = "relic-index.db")]
        db: String,
        /// Conversion rule directory
        #[arg(long, default_value = "rules")]
        rules: String,
        /// Platform profile (sysroot, origins, exclusions)
        #[arg(long, default_value = "platform.toml")]
        platform: String,
        /// Built-artifact root directory
        #[arg(long, default_value = "artifacts")]
        artifacts: String,
        /// Bound the traversal depth (target is depth 0)
        #[arg(long)]
        max_depth: Option<usize>,
        /// Do not expand past packages that already have rules
        #[arg(long)]
        stop_at_rules: bool,
        /// Metadata tier preference, newest first
        #[arg(long, value_delimiter = ',')]
        tiers: Option<Vec<String>>,
        /// Emit the roadmap as JSON instead of the grouped report
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::InitDb { db } => {
            Index::create(&db)?;
            println!("Requirement index initialized at: {db}");
            Ok(())
        }
        Commands::Resolve {
            target,
            db,
            rules,
            platform,
            artifacts,
            max_depth,
            stop_at_rules,
            tiers,
            json,
        } => {
            let index = Index::open(&db)?;
            let rules = RuleStore::load(&rules)?;
            let platform = Platform::load(&platform)?;
            let artifacts = ArtifactRegistry::scan(&artifacts, &rules)?;
            info!("Project state loaded, resolving {}", target);

            let options = RoadmapOptions {
                max_depth,
                stop_at_rules,
                tiers: tiers
                    .unwrap_or_else(|| DEFAULT_TIERS.iter().map(|t| t.to_string()).collect()),
            };
            let mut roadmap =
                Roadmap::with_options(&index, &rules, &artifacts, &platform, options);
            let result = roadmap.resolve(&target)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print!("{}", report::render(&result));
            }
            Ok(())
        }
    }
}
