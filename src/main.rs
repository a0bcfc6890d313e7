//! chaosforge CLI - render attractors, bad random numbers and squircles to SVG.

use anyhow::Result;
use chaosforge::attractor::{Point, RunParams, SystemKind};
use chaosforge::bounds::{AxisPair, Bounds};
use chaosforge::config::ChaosConfig;
use chaosforge::pieces::{self, Session};
use chaosforge::rng::Seed;
use clap::Parser;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Parser)]
#[command(name = "chaosforge")]
#[command(about = "Deterministic generative art from attractors and bad random numbers")]
#[command(version)]
struct Cli {
    /// Config file path
    #[arg(long, default_value = "chaosforge.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Render one piece from a query string
    Generate {
        /// Piece name (see `pieces`)
        piece: String,

        /// Query string with parameter overrides, e.g. "rngType=RANDU"
        #[arg(short, long, default_value = "")]
        query: String,

        /// Randomize the piece's features from this seed before rendering
        #[arg(short = 'S', long)]
        seed: Option<String>,

        /// Randomize without a seed (not reproducible)
        #[arg(long, conflicts_with = "seed")]
        random: bool,

        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Width of the output
        #[arg(long)]
        width: Option<u32>,

        /// Height of the output
        #[arg(long)]
        height: Option<u32>,

        /// Also save the resolved parameters as JSON
        #[arg(long)]
        save_params: bool,
    },

    /// Print a randomized query string for a piece
    Randomize {
        /// Piece name (see `pieces`)
        piece: String,

        /// Seed for reproducible results
        #[arg(short = 'S', long)]
        seed: Option<String>,

        /// Starting query string
        #[arg(short, long, default_value = "")]
        query: String,
    },

    /// Render every piece from one seed
    Showcase {
        /// Output directory
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Seed for consistent results
        #[arg(short = 'S', long, default_value = "chaosforge")]
        seed: String,

        /// Width of the output
        #[arg(long)]
        width: Option<u32>,

        /// Height of the output
        #[arg(long)]
        height: Option<u32>,
    },

    /// List pieces with their default parameters
    Pieces,

    /// Integrate a system from its defaults and print the run as JSON
    Trace {
        /// System name: lorenz, halvorsen, sprott, thomas or quadratic
        system: String,

        /// Points to record
        #[arg(short, long)]
        steps: Option<usize>,

        /// Leading points to drop
        #[arg(short, long, default_value = "0")]
        discard: usize,

        /// Axis pair for the reported bounds
        #[arg(short, long, default_value = "xy")]
        axes: String,
    },
}

#[derive(Serialize)]
struct Trace<'a> {
    run: &'a RunParams,
    bounds: Bounds,
    points: &'a [Point],
}

fn write_artifact(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)?;
    println!("Saved to {}", path.display());
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("chaosforge=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = ChaosConfig::load(&cli.config)?;
    let policy = config.generation.encode_policy;

    match cli.command {
        Commands::Generate {
            piece,
            query,
            seed,
            random,
            output,
            width,
            height,
            save_params,
        } => {
            let ctx = config.render_context(width, height);
            let mut session = Session::from_query(pieces::find(&piece)?, ctx, &query);
            session.subscribe(|params| info!(fingerprint = %params.fingerprint(), "parameters updated"));
            if seed.is_some() || random {
                let seed = seed.as_deref().map(Seed::from);
                session.randomize(seed.as_ref())?;
            }

            println!("Generating {}...", session.piece().name());
            let svg = session.render()?;

            let output_path = output.unwrap_or_else(|| {
                PathBuf::from(&config.output.directory).join(session.artifact_name())
            });
            write_artifact(&output_path, &svg)?;
            println!("  ?{}", session.share_query(policy));

            if save_params {
                let params_path = output_path.with_extension("json");
                let params_json = serde_json::to_string_pretty(session.params())?;
                fs::write(&params_path, params_json)?;
                println!("Saved parameters to {}", params_path.display());
            }
        }

        Commands::Randomize { piece, seed, query } => {
            let piece = pieces::find(&piece)?;
            let seed = seed.as_deref().map(Seed::from);
            let params = piece.randomize(&piece.resolve(&query), seed.as_ref())?;
            info!(fingerprint = %params.fingerprint(), "randomized {}", piece.name());
            println!("?{}", piece.share_query(&params, policy));
        }

        Commands::Showcase {
            output_dir,
            seed,
            width,
            height,
        } => {
            let output_dir = output_dir
                .unwrap_or_else(|| PathBuf::from(&config.output.directory).join("showcase"));
            fs::create_dir_all(&output_dir)?;

            let ctx = config.render_context(width, height);
            let seed = Seed::from(seed.as_str());
            println!("Generating showcase with seed {}...", seed);

            for piece in pieces::all() {
                let params = piece.randomize(&piece.defaults(), Some(&seed))?;
                let svg = piece.render(&params, &ctx)?;
                let filename = format!("{}_{}.{}", piece.name(), params.fingerprint(), piece.extension());
                fs::write(output_dir.join(&filename), svg)?;
                println!("  Created {}", filename);
            }

            println!("Done! Showcase saved to {}", output_dir.display());
        }

        Commands::Pieces => {
            for piece in pieces::all() {
                println!("{}", piece.name());
                for (key, value) in piece.defaults().iter() {
                    println!("  {} = {}", key, value);
                }
            }
        }

        Commands::Trace {
            system,
            steps,
            discard,
            axes,
        } => {
            let kind: SystemKind = system.parse()?;
            let axes: AxisPair = axes.parse()?;
            let mut run = RunParams::defaults(kind);
            run.steps = steps.unwrap_or(run.steps);
            run.discard = discard;

            let ctx = config.render_context(None, None);
            let points = ctx.integrator.run(&run)?;
            let trace = Trace {
                run: &run,
                bounds: Bounds::compute(points.as_slice(), axes)?,
                points: points.as_slice(),
            };
            println!("{}", serde_json::to_string_pretty(&trace)?);
        }
    }

    Ok(())
}
