use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use levelgen_core::mapgen::{GenerationReport, Placement};
use levelgen_core::scene::{EchoAssetProvider, MemoryScene, SpawnKind};
use levelgen_core::{AssetId, MapGenerator};
use serde::Serialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the room and zone catalog (JSON)
    #[arg(short, long)]
    catalog: PathBuf,
    /// Path to generator settings (TOML); defaults apply when omitted
    #[arg(long)]
    config: Option<PathBuf>,
    /// Seed text; a fresh one is generated when omitted
    #[arg(short, long)]
    seed: Option<String>,
    /// Spawn rooms and doors into an in-memory scene after placement
    #[arg(short, long)]
    instantiate: bool,
    /// Print the report and layout as JSON instead of a map
    #[arg(long)]
    json: bool,
}

#[derive(Serialize)]
struct Output<'a> {
    report: &'a GenerationReport,
    placement: &'a Placement,
}

type CliGenerator = MapGenerator<EchoAssetProvider, MemoryScene<AssetId>>;

fn main() -> Result<()> {
    init_tracing();
    let args = Args::parse();

    let mut generator = CliGenerator::load(
        &args.catalog,
        args.config.as_deref(),
        EchoAssetProvider::default(),
        MemoryScene::new(),
    )
    .with_context(|| format!("Failed to set up generator from {}", args.catalog.display()))?;

    let mut report =
        generator.generate_layout(args.seed.as_deref()).context("Level generation failed")?;
    if args.instantiate {
        report = pollster::block_on(generator.instantiate()).context("Instantiation failed")?;
        info!(
            rooms = generator.scene().count(SpawnKind::Room),
            doors = generator.scene().count(SpawnKind::Door),
            "scene_populated"
        );
    }

    let placement = generator.placement().context("Generator kept no layout")?;
    let grid = generator.grid().context("Generator kept no grid")?;

    if args.json {
        let output = Output { report: &report, placement };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    println!("Seed: {} ({:#018x})", report.seed, report.seed_value);
    if report.seed_generated {
        println!("  (generated)");
    }
    println!("Fingerprint: {:016x}", report.fingerprint);
    println!("Rooms: {}  Doorways: {}", report.rooms, report.doors);
    if report.instantiated {
        println!("Spawned: {} objects", generator.scene().len());
    }
    println!();
    print!("{}", placement.render_ascii(grid));

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .compact()
        .init();
}
