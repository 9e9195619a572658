use anyhow::bail;
use clap::Parser;
use emotask_core::{BlinkTable, EmotaskConfig, MetricSampler};
use emotask_limbic::{HeartbeatConfig, LimbicSystem, SnapshotCollector, StateEngine};
use emotask_perception::{sampler_from_config, sources_from_config, SourceManager};
use std::path::PathBuf;
use tracing::{error, info};

mod face;
mod logging;
mod renderer;

use renderer::TerminalRenderer;

#[derive(Parser, Debug)]
#[command(name = "emotask", author, version, about, long_about = None)]
struct Args {
    /// Path to the config file
    #[arg(short, long, env = "EMOTASK_CONFIG")]
    config: Option<PathBuf>,

    /// Directory of face images (<state>.png, <state>_blink.png)
    #[arg(short, long)]
    assets: Option<PathBuf>,

    /// Log as JSON
    #[arg(long)]
    log_json: bool,

    /// Sample once, print the readings and the face, then exit
    #[arg(long)]
    once: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config_path = args.config.clone().unwrap_or_else(EmotaskConfig::default_path);
    let mut config = EmotaskConfig::load_or_default(&config_path);
    if let Some(dir) = args.assets {
        config.assets.dir = Some(dir);
    }
    if args.log_json {
        config.logging.json = true;
    }
    let _log_guard = logging::init(&config.logging)?;

    info!("Initializing emotask (config {})...", config_path.display());

    // 1. Faces. Without a usable HAPPY face there is nothing to show.
    let atlas = face::load_atlas(config.assets.dir.as_deref());
    if !atlas.has_baseline() {
        bail!(
            "No usable happy face found{}",
            config
                .assets
                .dir
                .as_ref()
                .map(|d| format!(" in {}", d.display()))
                .unwrap_or_default()
        );
    }

    // 2. Senses
    let sampler = sampler_from_config(&config.sensors);

    let heartbeat = HeartbeatConfig::from(&config.cadence);
    if args.once {
        return run_once(sampler, &heartbeat, atlas).await;
    }

    // 3. Limbic loops
    let mut limbic = LimbicSystem::with_config(heartbeat);
    let blink_table = atlas.restrict(&BlinkTable::standard());
    let tasks = limbic.start(sampler, blink_table)?;

    // 4. Event sources
    let sources = SourceManager::new();
    for source in sources_from_config(&config.ingest) {
        sources.add_source(source).await;
    }
    let source_tasks = sources.spawn_all(limbic.ingest(), limbic.lifeline()).await;

    // 5. Face
    let renderer = TerminalRenderer::new(atlas, std::io::stdout());
    let render_task = tokio::spawn(renderer.run(limbic.engine(), limbic.lifeline()));

    info!("emotask online. Ctrl-C to quit.");
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl-C: {}", e);
    }

    limbic.shutdown();
    tasks.join().await;
    for task in source_tasks {
        if let Err(e) = task.await {
            error!("Event source ended abnormally: {}", e);
        }
    }
    if let Err(e) = render_task.await {
        error!("Renderer ended abnormally: {}", e);
    }

    Ok(())
}

/// One arbitration over a fresh sample, printed to stdout.
async fn run_once<S: MetricSampler>(
    mut sampler: S,
    heartbeat: &HeartbeatConfig,
    atlas: emotask_limbic::FaceAtlas<face::Face>,
) -> anyhow::Result<()> {
    let mut collector = SnapshotCollector::new();
    // CPU usage is measured between two samples.
    collector.collect(&mut sampler);
    tokio::time::sleep(heartbeat.sample_interval).await;
    let snapshot = collector.collect(&mut sampler);

    let engine = StateEngine::new();
    engine.update_state(&snapshot);
    let frame = engine.render_state();

    println!(
        "cpu={:.1}% memory={:.1}% battery={}",
        snapshot.cpu_percent,
        snapshot.memory_load_percent,
        if snapshot.has_battery {
            format!("{}%", snapshot.battery_percent)
        } else {
            "none".to_string()
        }
    );
    match atlas.select(frame) {
        Some(sprite) => println!("face: {} {}", frame.state, sprite),
        None => println!("face: {}", frame.state),
    }
    Ok(())
}
