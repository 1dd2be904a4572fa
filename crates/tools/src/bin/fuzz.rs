use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use levelgen_core::mapgen::{audit_placement, generate_placement, resolve_seed};
use levelgen_core::{Catalog, ConnectorPolicy, GeneratorConfig};
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the room and zone catalog (JSON)
    #[arg(short, long)]
    catalog: PathBuf,
    /// Path to generator settings (TOML)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Prefix of every generated seed
    #[arg(short, long, default_value_t = 42)]
    seed: u64,
    /// Seeds to sweep per connector policy
    #[arg(short, long, default_value_t = 500)]
    runs: u32,
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).compact().init();
    let args = Args::parse();

    let catalog = Catalog::load(&args.catalog)
        .with_context(|| format!("Failed to load catalog: {}", args.catalog.display()))?;
    let base = match &args.config {
        Some(path) => GeneratorConfig::load(path)
            .with_context(|| format!("Failed to load config: {}", path.display()))?,
        None => GeneratorConfig::default(),
    };

    println!(
        "Sweeping {} seeds from prefix {} under both connector policies...",
        args.runs, args.seed
    );
    let mut unsolved = 0_u32;
    let mut unsound = 0_u32;
    for connector_policy in [ConnectorPolicy::Permissive, ConnectorPolicy::Sealed] {
        let config = GeneratorConfig { connector_policy, ..base.clone() };
        for run in 0..args.runs {
            let text = format!("{}-{run}", args.seed);
            let seed = resolve_seed(Some(&text))?;
            let (grid, placement) = match generate_placement(&catalog, &config, &seed) {
                Ok(layout) => layout,
                Err(error) => {
                    warn!(seed = %text, policy = ?connector_policy, %error, "seed_unsolved");
                    unsolved += 1;
                    continue;
                }
            };

            let violations = audit_placement(&catalog, &grid, &placement);
            if !violations.is_empty() {
                unsound += 1;
                for violation in &violations {
                    error!(seed = %text, policy = ?connector_policy, %violation, "layout_unsound");
                }
            }
        }
    }

    let total = args.runs * 2;
    println!("Solved {}/{} runs, {} unsolved.", total - unsolved, total, unsolved);
    if unsound > 0 {
        bail!("{unsound} layouts broke placement invariants");
    }
    println!("Fuzzing completed successfully.");
    Ok(())
}
