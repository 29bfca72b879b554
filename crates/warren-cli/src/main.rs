//! warren CLI - headless driver for the agent sandbox
//!
//! Builds a demo room, walks the agent through it and writes camera frames
//! as PNG files.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use warren::{CameraId, CameraSpec, Environment, EnvironmentConfig};

mod scene;

#[derive(Parser)]
#[command(name = "warren")]
#[command(about = "Headless embodied-agent sandbox", long_about = None)]
struct Cli {
    /// Log filter, e.g. `info` or `warren=debug` (overrides RUST_LOG)
    #[arg(long, global = true)]
    log: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the demo scene and write frames
    Run {
        /// TOML configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Number of environment steps
        #[arg(short, long, default_value_t = 240)]
        steps: u32,
        /// Physics sub-steps per environment step
        #[arg(long, default_value_t = 1)]
        substeps: u32,
        /// Frame width in pixels
        #[arg(long, default_value_t = 160)]
        width: u32,
        /// Frame height in pixels
        #[arg(long, default_value_t = 120)]
        height: u32,
        /// Output directory for frames
        #[arg(short, long, default_value = "frames")]
        out: PathBuf,
        /// Write the agent camera every K steps
        #[arg(long, default_value_t = 10)]
        every: u32,
    },
    /// Print the default configuration as TOML
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log.as_deref());

    match cli.command {
        Commands::Run {
            config,
            steps,
            substeps,
            width,
            height,
            out,
            every,
        } => {
            let config = match config {
                Some(path) => EnvironmentConfig::from_path(&path)
                    .with_context(|| format!("loading {}", path.display()))?,
                None => EnvironmentConfig::default(),
            };
            run(
                config,
                &RunOptions {
                    steps,
                    substeps,
                    width,
                    height,
                    out,
                    every: every.max(1),
                },
            )?;
        }
        Commands::Config => {
            print!("{}", EnvironmentConfig::default().to_toml_string()?);
        }
    }

    Ok(())
}

fn init_logging(filter: Option<&str>) {
    let filter = match filter {
        Some(directives) => EnvFilter::new(directives),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

struct RunOptions {
    steps: u32,
    substeps: u32,
    width: u32,
    height: u32,
    out: PathBuf,
    every: u32,
}

fn run(mut config: EnvironmentConfig, opts: &RunOptions) -> Result<()> {
    fs::create_dir_all(&opts.out)
        .with_context(|| format!("creating {}", opts.out.display()))?;

    // The scene places the agent itself.
    config.agent.spawn = false;
    let mut env = Environment::new(config)?;
    let scene = scene::build(&mut env, &opts.out.join("textures"))?;

    let spec = CameraSpec {
        width: opts.width,
        height: opts.height,
        background: [0.55, 0.7, 0.9],
        ..CameraSpec::default()
    };
    let eye = env.add_camera_view(spec)?;
    let overhead = env.add_camera_view(CameraSpec {
        focal_length: 20.0,
        shadow_width: 512,
        ..spec
    })?;
    env.set_follow_camera(Some(eye))?;

    info!(
        objects = env.object_count(),
        steps = opts.steps,
        out = %opts.out.display(),
        "running demo"
    );

    for step in 0..opts.steps {
        env.step(&scene::action_for_step(step), opts.substeps);

        let collided = env.collided_ids();
        if !collided.is_empty() {
            let props = collided.iter().filter(|id| scene.props.contains(*id)).count();
            info!(step, ids = ?collided, props, "collision");
        }

        if step % opts.every == 0 {
            env.render_camera(eye)?;
            write_frame(&env, eye, &opts.out.join(format!("agent_{step:05}.png")))?;
        }
    }

    let (pos, rot) = scene::overhead_pose();
    env.render(overhead, pos, rot)?;
    write_frame(&env, overhead, &opts.out.join("overhead.png"))?;

    if let Some(ball) = env.object_info(scene.ball) {
        info!(pos = ?ball.pos, "ball final state");
    }
    if let Some(agent) = env.agent_info() {
        info!(pos = ?agent.pos, rot_y = agent.rot_y(), "agent final state");
    }
    env.release();
    Ok(())
}

fn write_frame(env: &Environment, camera: CameraId, path: &Path) -> Result<()> {
    let width = env.frame_buffer_width(camera)?;
    let height = env.frame_buffer_height(camera)?;
    let pixels = env.frame_buffer(camera)?.to_vec();
    let image = image::RgbImage::from_raw(width, height, pixels)
        .context("frame buffer does not match its dimensions")?;
    image
        .save(path)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_run() {
        let cli = Cli::parse_from(["warren", "run", "--steps", "5", "--every", "2"]);
        match cli.command {
            Commands::Run { steps, every, .. } => {
                assert_eq!(steps, 5);
                assert_eq!(every, 2);
            }
            Commands::Config => panic!("expected run"),
        }
    }

    #[test]
    fn test_run_writes_frames() {
        let dir = tempfile::tempdir().unwrap();
        let opts = RunOptions {
            steps: 3,
            substeps: 1,
            width: 16,
            height: 12,
            out: dir.path().to_path_buf(),
            every: 2,
        };
        run(EnvironmentConfig::default(), &opts).unwrap();

        assert!(dir.path().join("agent_00000.png").exists());
        assert!(dir.path().join("agent_00002.png").exists());
        assert!(!dir.path().join("agent_00001.png").exists());
        let overhead = image::open(dir.path().join("overhead.png")).unwrap();
        assert_eq!(overhead.width(), 16);
    }
}
