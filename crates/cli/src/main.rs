use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::process;
use std::thread;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};
use crossbeam_channel::{Receiver, TryRecvError};

use moodmirror_core::capture::domain::camera::{Camera, CaptureError};
use moodmirror_core::capture::domain::image_writer::ImageWriter;
use moodmirror_core::capture::infrastructure::ffmpeg_camera::{FfmpegCamera, DEFAULT_DEVICE};
use moodmirror_core::capture::infrastructure::image_file_writer::ImageFileWriter;
use moodmirror_core::capture::infrastructure::still_image_camera::StillImageCamera;
use moodmirror_core::config::settings::{parse_backend_preference, Settings};
use moodmirror_core::emotion::domain::backend::Backend;
use moodmirror_core::emotion::domain::emotion_detector::EmotionDetector;
use moodmirror_core::emotion::infrastructure::backend_factory::{
    required_models, BackendConfig, DefaultBackendFactory,
};
use moodmirror_core::history::mood_history::MoodHistory;
use moodmirror_core::pipeline::mood_mirror_use_case::{FrameReport, MoodMirrorUseCase};
use moodmirror_core::pipeline::session_logger::StdoutSessionLogger;
use moodmirror_core::shared::constants::{DEFAULT_DEBUG_FRAME_PATH, IMAGE_EXTENSIONS, MODELS};
use moodmirror_core::shared::model_resolver;

/// Frames discarded after opening a capture device while exposure settles.
const WARMUP_FRAMES: usize = 5;

/// Consecutive read failures tolerated before the live loop gives up.
const MAX_READ_FAILURES: usize = 5;

const READ_RETRY_DELAY: Duration = Duration::from_millis(200);

/// Real-time webcam emotion annotation.
#[derive(Parser)]
#[command(name = "moodmirror", version)]
struct Cli {
    /// Emotion backend: auto probes deepface, fer, mediapipe, none in that order.
    #[arg(long, global = true, value_enum)]
    backend: Option<BackendArg>,

    /// Base URL of a DeepFace-compatible analysis service.
    #[arg(long, global = true)]
    deepface_url: Option<String>,

    /// Never use the DeepFace service (same as DISABLE_DEEPFACE=1).
    #[arg(long, global = true)]
    no_deepface: bool,

    /// Directory searched for ONNX models after the model cache.
    #[arg(long, global = true)]
    model_dir: Option<PathBuf>,

    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long, global = true)]
    face_confidence: Option<f64>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum BackendArg {
    Auto,
    #[value(name = "deepface")]
    DeepFace,
    Fer,
    #[value(name = "mediapipe")]
    MediaPipe,
    None,
}

impl BackendArg {
    fn preference(self) -> Option<Backend> {
        match self {
            BackendArg::Auto => None,
            BackendArg::DeepFace => Some(Backend::DeepFace),
            BackendArg::Fer => Some(Backend::Fer),
            BackendArg::MediaPipe => Some(Backend::MediaPipe),
            BackendArg::None => Some(Backend::None),
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Live loop: capture, mirror, detect and log every frame (default).
    Run(RunArgs),
    /// Capture one frame, save it and print the detection.
    Detect(DetectArgs),
    /// Show which backends are usable and which one the probe selects.
    Backends,
    /// Download models that have a public URL into the model cache.
    FetchModels,
    /// Print the effective settings (file, environment and flags combined).
    Config(ConfigArgs),
}

#[derive(Args)]
struct ConfigArgs {
    /// Write the effective settings back to the settings file.
    #[arg(long)]
    save: bool,
}

#[derive(Args, Default)]
struct SourceArgs {
    /// Capture device (e.g. /dev/video0 on Linux, 0 on macOS).
    #[arg(long)]
    device: Option<String>,

    /// Replay a video file instead of a live camera.
    #[arg(long, conflicts_with_all = ["device", "image"])]
    input: Option<PathBuf>,

    /// Use a still image as the camera.
    #[arg(long, conflicts_with = "device")]
    image: Option<PathBuf>,
}

#[derive(Args, Default)]
struct RunArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Stop after this many frames.
    #[arg(long)]
    max_frames: Option<usize>,

    /// History rows shown by the `h` command.
    #[arg(long)]
    history_rows: Option<usize>,

    /// CSV file written by the `s` command.
    #[arg(long)]
    log: Option<PathBuf>,

    /// Save the last displayed frame to this image on exit.
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Save the history CSV on exit.
    #[arg(long)]
    save_on_exit: bool,
}

#[derive(Args)]
struct DetectArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Where to save the captured (mirrored) frame.
    #[arg(long, default_value = DEFAULT_DEBUG_FRAME_PATH)]
    output: PathBuf,
}

/// Commands typed on stdin while the live loop runs.
#[derive(Debug, PartialEq)]
enum LiveCommand {
    Save,
    SwitchBackend(Option<Backend>),
    History,
    Quit,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let settings = load_settings(&cli)?;

    match cli.command.unwrap_or(Command::Run(RunArgs::default())) {
        Command::Run(args) => run_live(&settings, args),
        Command::Detect(args) => run_detect(&settings, args),
        Command::Backends => run_backends(&settings),
        Command::FetchModels => run_fetch_models(&settings),
        Command::Config(args) => run_config(&settings, args),
    }
}

/// Settings file, then environment, then command-line flags.
fn load_settings(cli: &Cli) -> Result<Settings, Box<dyn std::error::Error>> {
    let mut settings = Settings::load();
    settings.apply_process_env()?;

    if let Some(backend) = cli.backend {
        settings.backend = backend.preference();
    }
    if let Some(url) = &cli.deepface_url {
        settings.deepface_url = Some(url.clone());
    }
    if cli.no_deepface {
        settings.disable_deepface = true;
    }
    if let Some(dir) = &cli.model_dir {
        settings.model_dir = Some(dir.clone());
    }
    if let Some(confidence) = cli.face_confidence {
        if !(0.0..=1.0).contains(&confidence) {
            return Err(format!(
                "Face confidence must be between 0.0 and 1.0, got {confidence}"
            )
            .into());
        }
        settings.face_confidence = confidence;
    }
    Ok(settings)
}

fn build_detector(settings: &Settings) -> EmotionDetector {
    let factory = DefaultBackendFactory::new(BackendConfig::from(settings));
    EmotionDetector::from_preference(Box::new(factory), settings.backend)
}

fn build_camera(
    source: &SourceArgs,
    settings: &Settings,
) -> Result<Box<dyn Camera>, Box<dyn std::error::Error>> {
    if let Some(image) = &source.image {
        if !is_image(image) {
            return Err(format!("Not a supported image file: {}", image.display()).into());
        }
        return Ok(Box::new(StillImageCamera::new(image)));
    }
    if let Some(input) = &source.input {
        if !input.exists() {
            return Err(format!("Input file not found: {}", input.display()).into());
        }
        return Ok(Box::new(FfmpegCamera::file(input)));
    }
    let device = source
        .device
        .clone()
        .or_else(|| settings.camera_device.clone())
        .unwrap_or_else(|| DEFAULT_DEVICE.to_string());
    Ok(Box::new(FfmpegCamera::device(device)))
}

fn is_live_device(source: &SourceArgs) -> bool {
    source.image.is_none() && source.input.is_none()
}

// ---------------------------------------------------------------------------
// run
// ---------------------------------------------------------------------------

fn run_live(settings: &Settings, args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let camera = build_camera(&args.source, settings)?;
    let history_rows = args.history_rows.unwrap_or(settings.history_rows);
    let log_path = args.log.clone().unwrap_or_else(|| settings.log_path.clone());

    let mut use_case = MoodMirrorUseCase::new(
        camera,
        build_detector(settings),
        MoodHistory::new(),
        Box::new(ImageFileWriter::new()),
        Box::new(StdoutSessionLogger::default()),
    );
    use_case
        .start()
        .map_err(|e| format!("Unable to start camera: {e}"))?;

    eprintln!("Commands: s = save CSV, b <backend|auto> = switch backend, h = history, q = quit");
    let commands = spawn_stdin_reader();

    let mut processed = 0usize;
    let mut failures = 0usize;
    'frames: while args.max_frames.map_or(true, |max| processed < max) {
        loop {
            match commands.try_recv() {
                Ok(command) => {
                    if !apply_command(&mut use_case, command, &log_path, history_rows) {
                        break 'frames;
                    }
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }

        match use_case.step() {
            Ok(report) => {
                failures = 0;
                processed += 1;
                print_report(&report);
            }
            Err(CaptureError::EndOfStream) => {
                log::info!("Input exhausted after {processed} frames");
                break;
            }
            Err(e) => {
                failures += 1;
                log::warn!("Can't read frame from camera: {e}");
                if failures >= MAX_READ_FAILURES {
                    use_case.finish();
                    return Err(format!(
                        "Camera failed {failures} times in a row; make sure no other app is using it"
                    )
                    .into());
                }
                thread::sleep(READ_RETRY_DELAY);
            }
        }
    }

    if let Some(path) = &args.snapshot {
        if !use_case.snapshot(path)? {
            eprintln!("No frame captured; snapshot not written.");
        }
    }
    if args.save_on_exit {
        save_history(&mut use_case, &log_path);
    }
    use_case.finish();
    Ok(())
}

/// Applies one live command. Returns `false` when the loop should stop.
fn apply_command(
    use_case: &mut MoodMirrorUseCase,
    command: LiveCommand,
    log_path: &Path,
    history_rows: usize,
) -> bool {
    match command {
        LiveCommand::Save => save_history(use_case, log_path),
        LiveCommand::SwitchBackend(Some(backend)) => {
            use_case.detector_mut().set_backend(backend);
            eprintln!("Active backend: {backend}");
        }
        LiveCommand::SwitchBackend(None) => {
            let backend = use_case.detector_mut().reprobe();
            eprintln!("Active backend: {backend} (auto)");
        }
        LiveCommand::History => print_history(use_case.history(), history_rows),
        LiveCommand::Quit => return false,
    }
    true
}

fn save_history(use_case: &mut MoodMirrorUseCase, path: &Path) {
    match use_case.save_history(path) {
        Ok(0) => eprintln!("No history to save yet."),
        Ok(rows) => eprintln!("Saved {rows} rows to {}", path.display()),
        Err(e) => eprintln!("Could not save history: {e}"),
    }
}

fn print_report(report: &FrameReport) {
    println!(
        "frame {:>5}  [{}]  {}  confidence {:.2}",
        report.frame.index(),
        report.backend,
        report.result.label().as_str().to_uppercase(),
        report.result.confidence()
    );
}

fn print_history(history: &MoodHistory, rows: usize) {
    if history.is_empty() {
        eprintln!("No history yet.");
        return;
    }
    eprintln!("{:19}  {:9}  confidence", "time", "emotion");
    for entry in history.tail(rows) {
        eprintln!(
            "{}  {:9}  {:.2}",
            entry.time_string(),
            entry.result.label(),
            entry.result.confidence()
        );
    }
}

/// Forwards parsed stdin lines to the frame loop. The thread ends with stdin.
fn spawn_stdin_reader() -> Receiver<LiveCommand> {
    let (tx, rx) = crossbeam_channel::unbounded::<LiveCommand>();
    thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            match parse_live_command(&line) {
                Ok(Some(command)) => {
                    if tx.send(command).is_err() {
                        break;
                    }
                }
                Ok(None) => {}
                Err(message) => eprintln!("{message}"),
            }
        }
    });
    rx
}

fn parse_live_command(line: &str) -> Result<Option<LiveCommand>, String> {
    let mut parts = line.split_whitespace();
    let Some(head) = parts.next() else {
        return Ok(None);
    };
    match head {
        "s" | "save" => Ok(Some(LiveCommand::Save)),
        "h" | "history" => Ok(Some(LiveCommand::History)),
        "q" | "quit" => Ok(Some(LiveCommand::Quit)),
        "b" | "backend" => {
            let name = parts
                .next()
                .ok_or("usage: b <auto|deepface|fer|mediapipe|none>")?;
            parse_backend_preference(name)
                .map(|choice| Some(LiveCommand::SwitchBackend(choice)))
                .map_err(|e| e.to_string())
        }
        other => Err(format!("Unknown command '{other}' (s, b <backend>, h, q)")),
    }
}

// ---------------------------------------------------------------------------
// detect
// ---------------------------------------------------------------------------

fn run_detect(settings: &Settings, args: DetectArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut detector = build_detector(settings);
    println!("Using backend: {}", detector.backend());

    let mut camera = build_camera(&args.source, settings)?;
    camera
        .start()
        .map_err(|e| format!("Unable to open {}: {e}", camera.describe()))?;
    let warmup = if is_live_device(&args.source) {
        WARMUP_FRAMES
    } else {
        0
    };
    let mut frame = camera.read();
    for _ in 0..warmup {
        if frame.is_err() {
            break;
        }
        frame = camera.read();
    }
    camera.stop();
    let frame = frame
        .map_err(|e| format!("Failed to read frame from {}: {e}", camera.describe()))?
        .mirrored();

    ImageFileWriter::new().write(&args.output, &frame)?;
    println!(
        "Saved {} (check it to ensure the camera captured correctly)",
        args.output.display()
    );

    let result = detector.get_emotion(&frame);
    println!("get_emotion -> {} {:.2}", result.label(), result.confidence());
    Ok(())
}

// ---------------------------------------------------------------------------
// backends / fetch-models
// ---------------------------------------------------------------------------

fn run_backends(settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let detector = build_detector(settings);
    for (backend, available) in detector.availability() {
        let status = if available { "available" } else { "unavailable" };
        let models = required_models(backend);
        if models.is_empty() {
            println!("{backend:10} {status}");
        } else {
            println!("{backend:10} {status:12} models: {}", models.join(", "));
        }
    }
    match settings.backend {
        Some(forced) => println!("Selected: {forced} (forced by configuration)"),
        None => println!("Selected: {}", detector.backend()),
    }
    Ok(())
}

fn run_config(settings: &Settings, args: ConfigArgs) -> Result<(), Box<dyn std::error::Error>> {
    if args.save {
        let path = settings.save()?;
        println!("Saved settings to {}", path.display());
    } else {
        println!("{}", settings.to_json()?);
        if let Some(path) = Settings::config_path() {
            eprintln!("Settings file: {}", path.display());
        }
    }
    Ok(())
}

fn run_fetch_models(settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let model_dir = settings.model_dir.as_deref();
    let cache_dir = model_resolver::model_cache_dir()?;
    for &(name, url) in MODELS {
        if let Some(path) = model_resolver::locate(name, model_dir) {
            println!("{name:28} {}", path.display());
            continue;
        }
        match url {
            Some(url) => {
                log::info!("Downloading model: {name}");
                let path = model_resolver::resolve(
                    name,
                    Some(url),
                    model_dir,
                    Some(Box::new(download_progress)),
                )?;
                eprintln!();
                println!("{name:28} {}", path.display());
            }
            None => println!(
                "{name:28} missing: no public download, place it in {} or --model-dir",
                cache_dir.display()
            ),
        }
    }
    Ok(())
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn download_progress(downloaded: u64, total: u64) {
    if total > 0 {
        let pct = (downloaded as f64 / total as f64 * 100.0) as u32;
        eprint!("\rDownloading model... {pct}%");
    } else {
        eprint!("\rDownloading model... {downloaded} bytes");
    }
}
