//! The `forth` executable: wires CLI flags, logging, and a persistent
//! [`forth_core::Engine`] together, then hands off to the outer
//! interpreter's REPL (SPEC_FULL.md §B.1, §B.3).

use anyhow::{Context, Result};
use clap::Parser;

use forth_core::cells::BoundsMode;
use forth_core::engine::EngineConfig;
use forth_core::source::Source;
use forth_core::{outer, Engine};

/// A minimal Forth system: cell store, dictionary compiler, outer
/// interpreter.
#[derive(Parser, Debug)]
#[command(name = "forth", version, about)]
struct Cli {
    /// Forth source files to load before the REPL starts (or instead of
    /// it, with --no-repl).
    files: Vec<String>,

    /// Raise a catchable error on out-of-range cell/string access instead
    /// of panicking.
    #[arg(short = 'b', long = "bounds-checked")]
    bounds_checked: bool,

    /// Total cell count in the Cell Store.
    #[arg(long, default_value_t = forth_core::cells::DEFAULT_CELL_COUNT)]
    cells: usize,

    /// Total byte count in the String Store.
    #[arg(long, default_value_t = forth_core::strings::DEFAULT_STRING_STORE_SIZE)]
    strings: usize,

    /// Exit after loading the given files instead of entering the REPL.
    #[arg(long)]
    no_repl: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = EngineConfig {
        cell_count: cli.cells,
        string_count: cli.strings,
        bounds_mode: if cli.bounds_checked {
            BoundsMode::Guarded
        } else {
            BoundsMode::Unchecked
        },
    };

    let mut engine = Engine::new(config).context("failed to initialize engine")?;

    for path in &cli.files {
        tracing::info!(file = %path, "loading");
        let source = Source::from_file(path).with_context(|| format!("loading {}", path))?;
        engine.sources.push(source);
        while engine.sources.depth() > 1 {
            let line = engine.sources.top_mut().next_line();
            match line {
                Some(line) => {
                    engine.load_tib(&line)?;
                    if let Err(e) = outer::eval(&mut engine) {
                        eprintln!("{}: {}", path, e);
                        engine.abort(&e);
                    }
                }
                None => engine.sources.pop(),
            }
        }
    }

    if !cli.no_repl {
        outer::quit(&mut engine);
    }

    std::process::exit(engine.exit_code);
}
