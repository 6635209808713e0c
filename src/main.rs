use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use argh::FromArgs;
use boids3d::{BoidTemplate, GroundPlane, PerchParams, Simulation, Spawner};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

#[derive(FromArgs)]
/// Headless 3D flocking simulation.
struct Args {
    /// number of boids to spawn
    #[argh(option, default = "100")]
    count: usize,

    /// number of ticks to simulate
    #[argh(option, default = "1000")]
    ticks: u64,

    /// fixed timestep in seconds
    #[argh(option, default = "1.0 / 60.0")]
    dt: f32,

    /// half-extent of the spawn cube and boundary box
    #[argh(option, default = "10.0")]
    spawn_radius: f32,

    /// RNG seed for reproducible spawns
    #[argh(option)]
    seed: Option<u64>,

    /// spawner configuration as JSON, overriding the flags above
    #[argh(option)]
    config: Option<PathBuf>,

    /// enable the perch overlay with a ground plane at this height
    #[argh(option)]
    ground: Option<f32>,

    /// write a population snapshot every N ticks (0 disables)
    #[argh(option, default = "60")]
    snapshot_every: u64,

    /// directory for snapshot output
    #[argh(option, default = "PathBuf::from(\"snapshots\")")]
    out: PathBuf,
}

fn main() -> Result<()> {
    init_tracing();
    let args: Args = argh::from_env();

    let spawner = match &args.config {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("reading spawner config {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("parsing spawner config {}", path.display()))?
        }
        None => Spawner {
            count: args.count,
            spawn_radius: args.spawn_radius,
            seed: args.seed,
            templates: vec![BoidTemplate {
                perch: args.ground.map(|_| PerchParams::default()),
                ..BoidTemplate::default()
            }],
            ..Spawner::default()
        },
    };

    let flock = spawner.spawn()?;
    info!(boids = flock.len(), ticks = args.ticks, "spawned flock");

    let mut sim = Simulation::new(flock);
    if let Some(height) = args.ground {
        sim = sim.with_surfaces(Box::new(GroundPlane { height }));
    }

    if args.snapshot_every > 0 {
        fs::create_dir_all(&args.out)
            .with_context(|| format!("creating {}", args.out.display()))?;
    }

    let pbar = ProgressBar::new(args.ticks);
    pbar.set_style(ProgressStyle::with_template(
        "[{elapsed_precise}/{eta_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}",
    )?);

    for tick in 0..args.ticks {
        sim.step(args.dt)?;
        if args.snapshot_every > 0 && tick % args.snapshot_every == 0 {
            let path = args.out.join(format!("tick_{tick:0>8}.json"));
            let json = serde_json::to_vec(sim.boids())?;
            fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
        }
        pbar.inc(1);
    }
    pbar.finish_with_message("done");
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}
