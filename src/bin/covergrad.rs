//! Thin CLI harness around [`covergrad_core::Runtime`].
//!
//! This is not the fuzzer: mutating inputs, running the target, and
//! maintaining a seed corpus are the outer driver's job. This binary only
//! loads a runtime from an artifact directory and reports what the
//! scheduler would hand the driver next, which is useful for inspecting a
//! compiler pass's output by hand.

use anyhow::{Context, Result};
use clap::Parser;
use covergrad_core::{Config, Runtime};

/// Inspect a covergrad instrumentation artifact directory.
#[derive(Parser)]
#[command(name = "covergrad-core", version, about)]
struct Cli {
    /// Directory containing `instrumentation_meta.txt` and `edges.txt`.
    #[arg(long, value_name = "DIR")]
    output_dir: Option<String>,

    /// How many priority-queue entries to report.
    #[arg(long, default_value_t = 5)]
    top: usize,
}

fn main() -> Result<()> {
    init_logging();

    let cli = Cli::parse();
    let config = match cli.output_dir {
        Some(dir) => Config::with_dir(dir),
        None => Config::from_env(),
    };

    let mut runtime = Runtime::initialize(&config).with_context(|| "failed to initialize runtime")?;
    log::info!(
        "loaded {} branch sites ({} args) from {:?}",
        runtime.get_br_count(),
        runtime.get_arg_count(),
        config.dir(),
    );

    runtime.begin_base_phase();
    runtime.update_queue();

    for rank in 0..cli.top {
        let (target, seed) = runtime.pop_queue_target();
        if target == -1 {
            log::info!("queue exhausted after {rank} entries");
            break;
        }
        println!("#{rank}: exit {target} (seed {seed}, parent {})", runtime.get_tree_parent(target));
    }

    Ok(())
}

fn init_logging() {
    let config = simplelog::ConfigBuilder::new()
        .set_location_level(log::LevelFilter::Off)
        .set_target_level(log::LevelFilter::Off)
        .build();
    let term = simplelog::TermLogger::new(
        log::LevelFilter::Info,
        config,
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    );
    simplelog::CombinedLogger::init(vec![term]).expect("initialize logger");
}
