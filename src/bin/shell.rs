//! qdev Shell Binary
//!
//! Creates a device set and executes line commands from stdin.

use std::io::{self, BufRead};

use clap::{Parser, ValueEnum};
use qdev::protocol::{read_command, write_response, CommandType, Response};
use qdev::{Config, DeviceSet, Lifecycle, QdevError, QuantumFill};
use tracing_subscriber::{fmt, EnvFilter};

/// qdev Shell
#[derive(Parser, Debug)]
#[command(name = "qdev-shell")]
#[command(about = "Interactive shell over scull-alike in-memory devices")]
#[command(version)]
struct Args {
    /// Bytes per quantum
    #[arg(short, long, default_value = "4000")]
    quantum_size: usize,

    /// Quanta per block-set
    #[arg(short = 's', long, default_value = "1000")]
    quantum_per_set: usize,

    /// Number of devices
    #[arg(short, long, default_value = "3")]
    devices: usize,

    /// Storage lifecycle
    #[arg(short, long, value_enum, default_value = "device")]
    lifecycle: LifecycleArg,

    /// Quantum fill policy for new block-sets
    #[arg(short, long, value_enum, default_value = "eager")]
    fill: FillArg,

    /// Per-device memory limit in KB
    #[arg(short = 'm', long)]
    memory_kb: Option<usize>,

    /// Proc entry text shown before the first message is written
    #[arg(short = 'w', long)]
    init_word: Option<String>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LifecycleArg {
    Device,
    Session,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum FillArg {
    Eager,
    Lazy,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,qdev=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    tracing::info!("qdev shell v{}", qdev::VERSION);

    // Build config from args
    let mut builder = Config::builder()
        .quantum_size(args.quantum_size)
        .quantum_per_set(args.quantum_per_set)
        .device_count(args.devices)
        .lifecycle(match args.lifecycle {
            LifecycleArg::Device => Lifecycle::DeviceScoped,
            LifecycleArg::Session => Lifecycle::SessionScoped,
        })
        .fill(match args.fill {
            FillArg::Eager => QuantumFill::Eager,
            FillArg::Lazy => QuantumFill::Lazy,
        });
    if let Some(kb) = args.memory_kb {
        builder = builder.memory_limit(kb * 1024);
    }
    if let Some(word) = args.init_word {
        builder = builder.init_word(word);
    }

    let devices = match DeviceSet::new(builder.build()) {
        Ok(d) => d,
        Err(e) => {
            tracing::error!("Failed to create devices: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(&devices, io::stdin().lock(), io::stdout().lock()) {
        tracing::error!("Shell error: {}", e);
        std::process::exit(1);
    }

    let stats = devices.teardown();
    tracing::info!("Freed {} block-sets, {} quanta", stats.block_sets, stats.quanta);
}

/// Command loop: one response line per command line
fn run<R: BufRead, W: io::Write>(devices: &DeviceSet, mut input: R, mut output: W) -> qdev::Result<()> {
    loop {
        let command = match read_command(&mut input) {
            Ok(Some(command)) => command,
            Ok(None) => return Ok(()),
            Err(QdevError::Io(e)) => return Err(QdevError::Io(e)),
            Err(e) => {
                write_response(&mut output, &Response::error(&e))?;
                continue;
            }
        };

        let command_type = command.command_type();
        let response = devices
            .execute(command)
            .unwrap_or_else(|e| Response::error(&e));
        if response.is_error() {
            tracing::warn!(command = ?command_type, "command failed");
        }
        write_response(&mut output, &response)?;

        let quit = command_type == CommandType::Quit;
        if quit {
            return Ok(());
        }
    }
}
