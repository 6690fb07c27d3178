mod logging;

use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::{Path, PathBuf},
    thread,
    time::{Duration, Instant},
};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use log::info;
use logging::Logger;
use panel_input::{
    config::{InputConfig, SourceKind, SyntheticPattern, DEFAULT_DEVICE_ROOT},
    device::{
        contacts::MAX_SLOTS,
        probe::{probe_capabilities, DeviceCapabilities},
        query::{DeviceOpener, EvdevOpener},
        record::RecordLayout,
        scan::DeviceScanner,
    },
    diagnostics,
    gesture::{GestureClassifier, GestureEvent, GestureKind},
    handler::InputHandler,
    trace::{self, TraceLog},
    types::InputEvent,
};

const RUN_POLL_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Parser)]
#[command(name = "panel_input")]
#[command(about = "Touch panel input probing, capture and gesture replay")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List input nodes and pick the first multi-touch one.
    Scan(ScanArgs),
    /// Dump the raw capabilities of one input node.
    Probe(ProbeArgs),
    /// Run a source and print classified gestures.
    Run(RunArgs),
    /// Classify a recorded pointer trace.
    Replay(ReplayArgs),
    /// Classify a raw `input_event` dump (e.g. `cat /dev/input/eventN > dump`).
    ReplayRaw(ReplayRawArgs),
}

#[derive(Debug, Args)]
struct ScanArgs {
    #[arg(long, default_value = DEFAULT_DEVICE_ROOT)]
    root: PathBuf,
}

#[derive(Debug, Args)]
struct ProbeArgs {
    path: PathBuf,
}

#[derive(Debug, Args)]
struct RunArgs {
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    source: Option<SourceKind>,
    #[arg(long)]
    device: Option<PathBuf>,
    #[arg(long)]
    pattern: Option<SyntheticPattern>,
    #[arg(long = "duration-ms", default_value_t = 5_000)]
    duration_ms: u64,
    #[arg(long = "mouse-emulation")]
    mouse_emulation: bool,
    #[arg(long)]
    trace: Option<PathBuf>,
}

#[derive(Debug, Args)]
struct ReplayArgs {
    trace: PathBuf,
    #[arg(long)]
    expect: Option<PathBuf>,
    #[arg(long, default_value_t = panel_input::config::DEFAULT_REFERENCE_WIDTH)]
    width: u32,
    #[arg(long, default_value_t = panel_input::config::DEFAULT_REFERENCE_HEIGHT)]
    height: u32,
}

#[derive(Debug, Args)]
struct ReplayRawArgs {
    dump: PathBuf,
    /// Probe axis ranges from this node instead of `--x-max`/`--y-max`.
    #[arg(long)]
    device: Option<PathBuf>,
    #[arg(long = "x-max", default_value_t = 4095)]
    x_max: i32,
    #[arg(long = "y-max", default_value_t = 4095)]
    y_max: i32,
    #[arg(long, default_value_t = MAX_SLOTS)]
    slots: usize,
    /// 16-byte records from a 32-bit userspace.
    #[arg(long)]
    compact: bool,
    #[arg(long)]
    expect: Option<PathBuf>,
    #[arg(long, default_value_t = panel_input::config::DEFAULT_REFERENCE_WIDTH)]
    width: u32,
    #[arg(long, default_value_t = panel_input::config::DEFAULT_REFERENCE_HEIGHT)]
    height: u32,
}

fn main() -> Result<()> {
    Logger::from_env()?.install()?;
    let cli = Cli::parse();
    match cli.command {
        Commands::Scan(args) => scan(&args.root),
        Commands::Probe(args) => {
            print!("{}", diagnostics::describe_device(&args.path)?);
            Ok(())
        }
        Commands::Run(args) => run(args),
        Commands::Replay(args) => replay(args),
        Commands::ReplayRaw(args) => replay_raw(args),
    }
}

fn scan(root: &Path) -> Result<()> {
    let scanner = DeviceScanner::new(root, &EvdevOpener);
    print!("{}", diagnostics::describe_scan(&scanner.scan_all()));
    let hit = scanner.scan()?;
    println!("selected: {}", hit.path.display());
    Ok(())
}

fn run_config(args: &RunArgs) -> Result<InputConfig> {
    let mut config = match &args.config {
        Some(path) => InputConfig::load(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => InputConfig::default(),
    };
    if let Some(source) = args.source {
        config.source = source;
    }
    if let Some(device) = &args.device {
        config.device_path = Some(device.clone());
    }
    if let Some(pattern) = args.pattern {
        config.synthetic.pattern = Some(pattern);
    }
    if args.mouse_emulation {
        config.mouse_emulation = true;
    }
    if config.source == SourceKind::Native {
        bail!("the native source needs a host toolkit; use raw-device or synthetic");
    }
    Ok(config)
}

fn run(args: RunArgs) -> Result<()> {
    let config = run_config(&args)?;
    let reference = config.reference_size();
    let mut handler = InputHandler::new(config).context("failed to create input handler")?;
    let mut classifier = GestureClassifier::with_reference(reference.0, reference.1);
    let mut trace_log = TraceLog::new();

    handler.start()?;
    let deadline = Instant::now() + Duration::from_millis(args.duration_ms);
    while Instant::now() < deadline && handler.is_running() {
        for event in handler.drain() {
            match event {
                InputEvent::Pointer(pointer) => {
                    trace_log.on_pointer(pointer);
                    for gesture in classifier.handle(&pointer).iter() {
                        report(gesture, &mut trace_log);
                    }
                }
                other => log::debug!("input: {other:?}"),
            }
        }
        for gesture in classifier.tick(handler.now_ms()).iter() {
            report(gesture, &mut trace_log);
        }
        thread::sleep(RUN_POLL_INTERVAL);
    }
    handler.stop();
    for event in handler.drain() {
        if let InputEvent::Pointer(pointer) = event {
            trace_log.on_pointer(pointer);
        }
    }

    print!("{}", handler.dump_state());
    if let Some(path) = &args.trace {
        let file =
            File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
        let mut out = BufWriter::new(file);
        trace_log.write_dump(&mut out)?;
        out.flush()?;
        info!("trace written to {}", path.display());
    }
    Ok(())
}

fn report(gesture: &GestureEvent, trace_log: &mut TraceLog) {
    println!(
        "gesture {} at ({}, {}) after {} ms",
        gesture.kind.label(),
        gesture.x,
        gesture.y,
        gesture.duration_ms
    );
    trace_log.on_gesture(*gesture);
}

fn replay(args: ReplayArgs) -> Result<()> {
    let file = File::open(&args.trace)
        .with_context(|| format!("failed to open {}", args.trace.display()))?;
    let events = trace::parse_pointer_trace(BufReader::new(file))?;
    let gestures = trace::replay(&events, (args.width, args.height));
    report_replay(&gestures, args.expect.as_deref())
}

fn replay_raw(args: ReplayRawArgs) -> Result<()> {
    let capabilities = match &args.device {
        Some(path) => {
            let device = EvdevOpener
                .open(path)
                .with_context(|| format!("failed to open {}", path.display()))?;
            probe_capabilities(device.as_ref())?
        }
        None => DeviceCapabilities::slotted_panel(args.x_max, args.y_max, args.slots),
    };
    if capabilities.x.max <= capabilities.x.min || capabilities.y.max <= capabilities.y.min {
        bail!("axis maxima must be positive");
    }
    let layout = if args.compact {
        RecordLayout::Compact
    } else {
        RecordLayout::Wide
    };
    let bytes = std::fs::read(&args.dump)
        .with_context(|| format!("failed to read {}", args.dump.display()))?;
    let events = trace::pointers_from_dump(&bytes, layout, &capabilities);
    info!("replay: {} pointer events from {}", events.len(), capabilities);
    let gestures = trace::replay(&events, (args.width, args.height));
    report_replay(&gestures, args.expect.as_deref())
}

/// Prints the gesture CSV and checks it against an expected kind list.
fn report_replay(gestures: &[GestureEvent], expect: Option<&Path>) -> Result<()> {
    let mut stdout = std::io::stdout().lock();
    writeln!(stdout, "{}", trace::GESTURE_TRACE_HEADER)?;
    for gesture in gestures {
        trace::write_gesture_line(&mut stdout, gesture)?;
    }

    if let Some(expect) = expect {
        let file =
            File::open(expect).with_context(|| format!("failed to open {}", expect.display()))?;
        let expected = trace::parse_expected_kinds(BufReader::new(file))?;
        let actual: Vec<_> = gestures.iter().map(|g| g.kind).collect();
        if actual != expected {
            let join = |kinds: &[GestureKind]| {
                kinds.iter().map(|k| k.label()).collect::<Vec<_>>().join(",")
            };
            eprintln!("expected kinds: {}", join(&expected));
            eprintln!("actual kinds:   {}", join(&actual));
            bail!("gesture sequence mismatch");
        }
    }
    Ok(())
}
