//! vdface - Virtual Desktop face tracking bridge
//!
//! Main entry point for the CLI application.

use clap::Parser;
use glam::Quat;
use std::mem::{offset_of, size_of};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vdface::{
    config::Config,
    expression::FaceExpression,
    gaze::GazeCurve,
    tracking::{
        in_process_pair, shared_opener, ChannelOpener, InProcessProducer, Quaternion,
        RawSnapshot, TrackingModule, SNAPSHOT_SIZE,
    },
};

/// vdface - Virtual Desktop face tracking bridge
#[derive(Parser, Debug)]
#[command(name = "vdface", version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Shared memory segment name (overrides config)
    #[arg(long)]
    map_name: Option<String>,

    /// Readiness signal name (overrides config)
    #[arg(long)]
    event_name: Option<String>,

    /// Gaze curve: linear or calibrated (overrides config)
    #[arg(long)]
    curve: Option<String>,

    /// Print the tracking model as JSON every N ms, 0 disables (overrides config)
    #[arg(long)]
    dump_ms: Option<u64>,

    /// Drive the loop from an in-process synthetic producer
    #[arg(long)]
    loopback: bool,

    /// Print the snapshot layout and exit
    #[arg(long)]
    print_layout: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(log_level.into())
                .from_env_lossy(),
        )
        .init();

    if args.print_layout {
        print_layout();
        return Ok(());
    }

    info!("Starting {} v{}", vdface::NAME, vdface::VERSION);

    let config = load_config(&args)?;
    let shutdown = Arc::new(AtomicBool::new(false));

    let (opener, producer) = if args.loopback {
        info!("Loopback mode: using a synthetic in-process producer");
        let (channel, producer) = in_process_pair();
        let producer_shutdown = Arc::clone(&shutdown);
        let handle = thread::Builder::new()
            .name("vdface-loopback".into())
            .spawn(move || run_loopback_producer(producer, &producer_shutdown))?;
        (channel.into_opener(), Some(handle))
    } else {
        (shared_opener(), None)
    };

    let runtime = tokio::runtime::Runtime::new()?;

    runtime.block_on(async {
        let loop_shutdown = Arc::clone(&shutdown);
        let mut tracker =
            tokio::task::spawn_blocking(move || run_tracking(&config, opener, &loop_shutdown));

        tokio::select! {
            _ = shutdown_signal() => {
                info!("Shutdown signal received");
            }
            result = &mut tracker => {
                if let Err(e) = result {
                    error!("Tracking loop error: {}", e);
                }
            }
        }

        shutdown.store(true, Ordering::Relaxed);

        if !tracker.is_finished() {
            if let Err(e) = tracker.await {
                error!("Tracking loop error: {}", e);
            }
        }
    });

    if let Some(handle) = producer {
        if handle.join().is_err() {
            warn!("Loopback producer panicked");
        }
    }

    info!("vdface stopped");
    Ok(())
}

/// Load config, apply CLI overrides and validate
fn load_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = if let Some(ref path) = args.config {
        Config::from_file(path)?
    } else {
        Config::load()?
    };

    // Apply CLI overrides
    if let Some(ref name) = args.map_name {
        config.channel.map_name = name.clone();
    }
    if let Some(ref name) = args.event_name {
        config.channel.event_name = name.clone();
    }
    if let Some(ref curve) = args.curve {
        config.gaze.curve = GazeCurve::from_str(curve)
            .ok_or_else(|| anyhow::anyhow!("Unknown gaze curve: {}", curve))?;
    }
    if let Some(ms) = args.dump_ms {
        config.output.dump_interval_ms = ms;
    }

    // Validate configuration
    config.validate()?;

    info!("Segment: {}", config.channel.map_name);
    info!("Signal: {}", config.channel.event_name);
    info!("Gaze curve: {}", config.gaze.curve.as_str());

    Ok(config)
}

/// Attach, run and re-attach until shutdown
fn run_tracking(config: &Config, opener: ChannelOpener, shutdown: &AtomicBool) {
    let mut module = TrackingModule::with_opener(config, opener);
    let dump_interval = Duration::from_millis(config.output.dump_interval_ms);
    let reattach_delay = config.tracking.reattach_delay();

    while !shutdown.load(Ordering::Relaxed) {
        let (eye, expression) = module.initialize(true, true);
        if !eye && !expression {
            debug!("Retrying in {:?}", reattach_delay);
            sleep_unless_shutdown(reattach_delay, shutdown);
            continue;
        }

        module.set_active(true);
        let mut last_dump = Instant::now();

        while !shutdown.load(Ordering::Relaxed) {
            module.update();

            if !dump_interval.is_zero() && last_dump.elapsed() >= dump_interval {
                dump_model(&module, config.output.pretty);
                last_dump = Instant::now();
            }
        }
    }

    module.teardown();
}

fn dump_model(module: &TrackingModule, pretty: bool) {
    let json = if pretty {
        serde_json::to_string_pretty(module.data())
    } else {
        serde_json::to_string(module.data())
    };

    match json {
        Ok(json) => println!("{}", json),
        Err(e) => warn!("Failed to serialize tracking data: {}", e),
    }
}

/// Sleep in short steps so a shutdown request is not held up by the full delay
fn sleep_unless_shutdown(delay: Duration, shutdown: &AtomicBool) {
    let step = Duration::from_millis(100);
    let deadline = Instant::now() + delay;

    while !shutdown.load(Ordering::Relaxed) {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        thread::sleep(step.min(deadline - now));
    }
}

/// Synthetic producer: slow head-independent eye sweep, periodic blinks and a
/// talking jaw, published at roughly the headset's 90 Hz.
fn run_loopback_producer(producer: InProcessProducer, shutdown: &AtomicBool) {
    let start = Instant::now();
    let frame = Duration::from_millis(11);

    while !shutdown.load(Ordering::Relaxed) {
        let t = start.elapsed().as_secs_f32();

        let mut snapshot = RawSnapshot::identity();
        snapshot.set_face_valid(true);
        snapshot.set_eye_following_valid(true);
        snapshot.set_eyes_valid(true, true);

        let look = Quaternion::from(Quat::from_rotation_y(0.3 * (t * 0.5).sin()));
        snapshot.left_eye_pose.orientation = look;
        snapshot.right_eye_pose.orientation = look;

        // Blink for 150 ms every 4 s
        let blink = if t % 4.0 < 0.15 { 1.0 } else { 0.0 };
        snapshot.set_weight(FaceExpression::EyesClosedL, blink);
        snapshot.set_weight(FaceExpression::EyesClosedR, blink);

        let jaw = 0.5 * ((t * 6.0).sin() + 1.0) * 0.6;
        snapshot.set_weight(FaceExpression::JawDrop, jaw);
        snapshot.set_weight(FaceExpression::LipCornerPullerL, 0.3);
        snapshot.set_weight(FaceExpression::LipCornerPullerR, 0.3);

        producer.publish(snapshot);
        thread::sleep(frame);
    }
}

fn print_layout() {
    let fields = [
        ("face_is_valid", offset_of!(RawSnapshot, face_is_valid), size_of::<u8>()),
        (
            "is_eye_following_blendshapes_valid",
            offset_of!(RawSnapshot, is_eye_following_blendshapes_valid),
            size_of::<u8>(),
        ),
        (
            "expression_weights",
            offset_of!(RawSnapshot, expression_weights),
            size_of::<[f32; FaceExpression::COUNT]>(),
        ),
        (
            "expression_confidences",
            offset_of!(RawSnapshot, expression_confidences),
            size_of::<[f32; 2]>(),
        ),
        ("left_eye_is_valid", offset_of!(RawSnapshot, left_eye_is_valid), size_of::<u8>()),
        ("right_eye_is_valid", offset_of!(RawSnapshot, right_eye_is_valid), size_of::<u8>()),
        ("left_eye_pose", offset_of!(RawSnapshot, left_eye_pose), size_of::<vdface::tracking::Pose>()),
        ("right_eye_pose", offset_of!(RawSnapshot, right_eye_pose), size_of::<vdface::tracking::Pose>()),
        ("left_eye_confidence", offset_of!(RawSnapshot, left_eye_confidence), size_of::<f32>()),
        ("right_eye_confidence", offset_of!(RawSnapshot, right_eye_confidence), size_of::<f32>()),
    ];

    println!("Snapshot layout ({} bytes):", SNAPSHOT_SIZE);
    for (name, offset, size) in fields {
        println!("  {:>4}  {:>4}  {}", offset, size, name);
    }
    println!();
    println!("Actuators ({}):", FaceExpression::COUNT);
    for expression in FaceExpression::ALL {
        println!("  {:>2}  {}", expression.index(), expression.name());
    }
}

async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
