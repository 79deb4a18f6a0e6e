use std::time::Instant;

use anyhow::Result;
use blockcraft::prelude::*;
use clap::{Parser, ValueEnum};
use rand::{rngs::StdRng, SeedableRng};
use tracing_subscriber::EnvFilter;

/// Generate a mempool and compare naive greedy selection with package
/// selection.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Number of items in the generated mempool
    #[arg(long, default_value_t = 2000)]
    size: usize,

    /// Seed for mempool generation (random if omitted)
    #[arg(long)]
    seed: Option<u64>,

    /// Block weight limit
    #[arg(long, default_value_t = MAX_BLOCK_WEIGHT)]
    capacity: u64,

    /// Leave out items paying less than this many fee units per weight unit
    #[arg(long, default_value_t = 1.0)]
    dust: f64,

    /// Add a high-fee child to a low-rate item before mining
    #[arg(long, default_value_t = false)]
    whale: bool,

    #[arg(long, value_enum, default_value_t = Output::Pretty)]
    format: Output,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Output {
    Pretty,
    Csv,
    Json,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let start = Instant::now();

    let mempool = Mempool::builder().size(args.size).build()?;

    // Shared by generation and whale injection so one seed covers both
    let mut rng = match args.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut items = mempool.generate_with(&mut rng);

    if args.whale {
        if let Some(id) = inject_whale(&mut items, &mut rng) {
            tracing::info!(%id, "injected whale");
        }
    }

    let output = Battle::builder()
        .capacity(args.capacity)
        .dust_threshold(args.dust)
        .build()?
        .run(&items)?;

    match args.format {
        Output::Json => println!("{}", serde_json::to_string_pretty(&output)?),
        Output::Csv => {
            println!("{}", ResultsTable::new(&output).format(Format::CSV))
        }
        Output::Pretty => println!("{}", ResultsTable::new(&output)),
    }

    tracing::info!(
        elapsed_secs = start.elapsed().as_secs_f64(),
        pool = output.pool_size,
        "done"
    );

    Ok(())
}
