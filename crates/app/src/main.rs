use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use clap::{Parser, Subcommand};
use stream_player_core::{
    format_time, AppConfig, AudioService, GestureEvent, InputTarget, JsonFileStore,
    MediaSessionBridge, PlayerError, RecordingSurface, SearchResponse, ServiceSlot,
    SessionManager, SimulatedOutput, SnapshotStore, SpectrumVisualizer, SwipeRecognizer,
    TeardownReason,
};
use tracing_subscriber::EnvFilter;

const SAMPLE_RATE: u32 = 44_100;
/// Simulated animation frame rate.
const FRAMES_PER_SECOND: u32 = 30;

fn main() -> stream_player_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = match cli.config.as_deref() {
        Some(path) => AppConfig::load(path)?,
        None => AppConfig::live_defaults(),
    };
    let store: Arc<dyn SnapshotStore> = Arc::new(JsonFileStore::open(&cli.state)?);

    match cli.command {
        Commands::Play {
            tracks,
            index,
            seconds,
        } => run_play(&config, store, &tracks, index, seconds),
        Commands::Resume => run_resume(&config, store),
        Commands::Swipe { dx, dy } => run_swipe(&config, dx, dy),
    }
}

fn run_play(
    config: &AppConfig,
    store: Arc<dyn SnapshotStore>,
    tracks: &Path,
    index: usize,
    seconds: f64,
) -> stream_player_core::Result<()> {
    let raw = std::fs::read_to_string(tracks)?;
    let playlist = SearchResponse::from_json(&raw)?.into_playlist();
    let track = playlist
        .tracks()
        .get(index)
        .cloned()
        .ok_or_else(|| PlayerError::msg(format!("no track at index {index}")))?;
    tracing::info!(tracks = playlist.len(), index, "starting playback");

    let output = SimulatedOutput::new();
    let slot = ServiceSlot::new();
    let handle = output.clone();
    let service = slot.attach_or_create(|| AudioService::new(handle))?;

    let mut session = SessionManager::activate(Arc::clone(&service), store, config)?;
    let mut surface = RecordingSurface::default();
    let mut bridge = MediaSessionBridge::new();
    bridge.register(&mut surface);
    let mut visualizer = SpectrumVisualizer::new(Arc::clone(&service), config.analyzer.clone());

    session.set_playlist(playlist);
    session.load_track(track)?;
    bridge.publish(&session.take_changes(), session.state(), &mut surface);

    let frames = (seconds.max(0.0) * f64::from(FRAMES_PER_SECOND)).round() as u64;
    let block = (SAMPLE_RATE / FRAMES_PER_SECOND) as usize;
    for _ in 0..frames {
        service.push_samples(&output.render_block(SAMPLE_RATE, block))?;
        for event in output.advance(1.0 / f64::from(FRAMES_PER_SECOND)) {
            session.handle_output_event(event)?;
        }
        visualizer.tick(session.state().is_playing());
        bridge.publish(&session.take_changes(), session.state(), &mut surface);
    }

    print_spectrum(&visualizer);
    print_now_playing(&session, &surface);

    visualizer.teardown(TeardownReason::Shutdown);
    slot.shutdown()
}

fn run_resume(config: &AppConfig, store: Arc<dyn SnapshotStore>) -> stream_player_core::Result<()> {
    let slot = ServiceSlot::new();
    let service = slot.attach_or_create(|| AudioService::new(SimulatedOutput::new()))?;
    let session = SessionManager::activate(service, store, config)?;

    let mut surface = RecordingSurface::default();
    MediaSessionBridge::new().sync(session.state(), &mut surface);
    match session.state().track() {
        Some(_) => print_now_playing(&session, &surface),
        None => println!("nothing to resume"),
    }
    slot.shutdown()
}

fn run_swipe(config: &AppConfig, dx: f32, dy: f32) -> stream_player_core::Result<()> {
    let mut recognizer = SwipeRecognizer::new(config.gestures.clone())
        .on_left(|| println!("navigate: next view"))
        .on_right(|| println!("navigate: previous view"));

    recognizer.handle(GestureEvent::TouchStart {
        x: 0.0,
        y: 0.0,
        target: InputTarget::Element,
    });
    if recognizer
        .handle(GestureEvent::TouchEnd { x: dx, y: dy })
        .is_none()
    {
        println!("no swipe");
    }
    Ok(())
}

fn print_spectrum(visualizer: &SpectrumVisualizer) {
    let heights = visualizer.bars().heights();
    let mut peaks: Vec<(usize, f32)> = heights.iter().copied().enumerate().collect();
    peaks.sort_by(|a, b| b.1.total_cmp(&a.1));
    println!("spectrum peaks:");
    for (bar, height) in peaks.into_iter().take(5) {
        println!("  bar {bar:>2}: {height:.3}");
    }
}

fn print_now_playing(session: &SessionManager, surface: &RecordingSurface) {
    let state = session.state();
    if let Some(metadata) = &surface.metadata {
        println!("now playing: {} - {}", metadata.artist, metadata.title);
    }
    println!(
        "state: {:?} at {} / {}",
        surface.playback_state,
        format_time(state.position()),
        format_time(state.duration().unwrap_or(0.0)),
    );
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Streaming player playback core driver", long_about = None)]
struct Cli {
    /// JSON configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Where the playback snapshot is persisted between runs.
    #[arg(short, long, global = true, default_value = "stream-player-state.json")]
    state: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Play a track from a search response and render its spectrum.
    Play {
        /// Search-response JSON with a `tracks` array.
        tracks: PathBuf,
        /// Playlist index to start from.
        #[arg(short, long, default_value_t = 0)]
        index: usize,
        /// Seconds of playback to simulate.
        #[arg(long, default_value_t = 5.0)]
        seconds: f64,
    },
    /// Restore the persisted session and report it.
    Resume,
    /// Run a horizontal touch swipe through the recognizer.
    Swipe {
        /// Horizontal travel in pixels; negative moves left.
        #[arg(allow_hyphen_values = true)]
        dx: f32,
        /// Vertical travel in pixels.
        #[arg(allow_hyphen_values = true, default_value_t = 0.0)]
        dy: f32,
    },
}
