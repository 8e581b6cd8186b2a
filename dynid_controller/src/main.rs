//! # Dynamics Identification Excitation Controller
//!
//! Runs the excitation controller against the simulated joint plant.
//!
//! The start command is delivered from a separate thread through the
//! command inbox, exactly as a network transport would deliver it. Every
//! published chunk is written as one JSON line by a consumer thread.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use clap::Parser;
use dynid_common::config::{DynIdConfig, LogLevel};
use dynid_common::messages::StartCommand;
use dynid_controller::clock::MonotonicClock;
use dynid_controller::controller::ExcitationController;
use dynid_controller::cycle::{CycleRunner, rt_setup};
use dynid_controller::inbox::command_channel;
use dynid_controller::sim::SimRobot;
use dynid_controller::sink::{ChunkReceiver, RecvTimeoutError, chunk_channel};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Bang-bang joint excitation for dynamics identification
#[derive(Parser, Debug)]
#[command(name = "dynid_controller")]
#[command(version)]
#[command(about = "Excite one joint between two position bounds and stream sample chunks")]
struct Args {
    /// Path to the controller configuration TOML.
    #[arg(long, default_value = "config/dynid.toml")]
    config: PathBuf,

    /// Joint to excite.
    #[arg(long)]
    joint: String,

    /// Samples per published chunk.
    #[arg(long, default_value_t = 1000, allow_negative_numbers = true)]
    chunksize: i64,

    /// Lower position bound.
    #[arg(long, allow_negative_numbers = true)]
    lower: f64,

    /// Upper position bound.
    #[arg(long, allow_negative_numbers = true)]
    upper: f64,

    /// Torque magnitude.
    #[arg(long)]
    torque: f64,

    /// Stop after this many cycles (default: run until Ctrl-C).
    #[arg(long)]
    cycles: Option<u64>,

    /// Delay before the start command is sent [ms].
    #[arg(long, default_value_t = 0)]
    start_delay_ms: u64,

    /// Write chunks to this file as JSON lines (default: stdout).
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// CPU core to pin the RT thread to.
    #[arg(long, default_value_t = 1)]
    cpu_core: usize,

    /// SCHED_FIFO priority.
    #[arg(long, default_value_t = 80)]
    rt_priority: i32,

    /// Enable verbose logging (DEBUG level).
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    json: bool,
}

fn main() {
    let args = Args::parse();

    let config = match DynIdConfig::load_validated(&args.config) {
        Ok(config) => config,
        Err(e) => {
            setup_tracing(&args, LogLevel::default());
            error!("FATAL: {}: {e}", args.config.display());
            process::exit(1);
        }
    };
    setup_tracing(&args, config.shared.log_level);

    info!(
        "{} v{} starting...",
        config.shared.service_name,
        env!("CARGO_PKG_VERSION")
    );

    if let Err(e) = run(&args, config) {
        error!("FATAL: {e}");
        process::exit(1);
    }

    info!("shutdown complete");
}

fn run(args: &Args, config: DynIdConfig) -> Result<(), Box<dyn std::error::Error>> {
    let ctl = &config.controller;
    let start = StartCommand::new(
        &args.joint,
        args.chunksize,
        args.lower,
        args.upper,
        args.torque,
    );

    let mut robot = SimRobot::new(&ctl.joints, config.simulation);
    let (sink, chunks) = chunk_channel(ctl.data_pool_size, ctl.max_chunksize);
    let mut controller = ExcitationController::new(sink, MonotonicClock::new(), ctl.max_chunksize);
    controller.init(&ctl.joints, &robot)?;

    let (commands, inbox) = command_channel(ctl.command_queue_depth);
    let mut runner = CycleRunner::new(controller, inbox, ctl.cycle_time_us);

    let writer = spawn_chunk_writer(chunks, args.output.clone())?;

    let delay = Duration::from_millis(args.start_delay_ms);
    let sender = thread::Builder::new()
        .name("dynid-start".into())
        .spawn(move || {
            thread::sleep(delay);
            if let Err(e) = commands.send(start) {
                error!("failed to deliver start command: {e}");
            }
        })?;

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        r.store(false, Ordering::SeqCst);
    })?;

    rt_setup(args.cpu_core, args.rt_priority)?;
    info!(
        "RT setup complete (cpu_core={}, priority={})",
        args.cpu_core, args.rt_priority
    );

    let result = runner.run(&running, args.cycles, |dt| robot.step(dt));
    runner.shutdown();

    let sink_stats = runner.controller().sink().stats();
    if sink_stats.dropped > 0 {
        warn!(dropped = sink_stats.dropped, "chunks dropped: consumer too slow");
    }

    // Dropping the runner closes the chunk channel and lets the writer finish.
    drop(runner);
    let _ = sender.join();
    let written = writer
        .join()
        .map_err(|_| "chunk writer thread panicked")??;
    info!(chunks = written, "chunk stream closed");

    result?;
    Ok(())
}

/// Consume chunks until the sink is dropped, writing one JSON line each.
fn spawn_chunk_writer(
    chunks: ChunkReceiver,
    output: Option<PathBuf>,
) -> std::io::Result<thread::JoinHandle<Result<u64, std::io::Error>>> {
    let out: Box<dyn Write + Send> = match output {
        Some(path) => Box::new(File::create(path)?),
        None => Box::new(std::io::stdout()),
    };

    thread::Builder::new()
        .name("dynid-writer".into())
        .spawn(move || {
            let mut out = BufWriter::new(out);
            let mut written = 0u64;
            loop {
                match chunks.recv_timeout(Duration::from_millis(100)) {
                    Ok(chunk) => {
                        serde_json::to_writer(&mut out, &chunk)?;
                        out.write_all(b"\n")?;
                        chunks.recycle(chunk);
                        written += 1;
                    }
                    Err(RecvTimeoutError::Timeout) => out.flush()?,
                    Err(RecvTimeoutError::Disconnected) => break,
                }
            }
            out.flush()?;
            Ok(written)
        })
}

/// Setup tracing subscriber from CLI flags and the configured level.
fn setup_tracing(args: &Args, level: LogLevel) {
    let directive = if args.verbose {
        "debug"
    } else {
        level.as_directive()
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    // Logs go to stderr so chunk output on stdout stays clean JSON lines.
    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .compact()
            .init();
    }
}
