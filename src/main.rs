use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;

use anyhow::Context;
use clap::{crate_version, Parser};
use crossterm::event::{DisableMouseCapture, EnableMouseCapture};
use crossterm::terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::Rect;
use ratatui::Terminal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use samplx::audio::record::MicRecorder;
use samplx::audio::{self, AudioOutput, HeadlessOutput};
use samplx::export::{DirectorySink, ExportGate, LocalLedger, DEFAULT_LEDGER_FILE};
use samplx::loader::PathSource;
use samplx::shared::InputEvent;
use samplx::{tui, EditorConfig, EditorSession};

const HEADLESS_SAMPLE_RATE: u32 = 44100;

#[derive(Parser)]
#[clap(
    version = crate_version!(),
    about = "Slice a sample into regions, shape each one, export them."
)]
struct Cli {
    /// Audio file to open on startup.
    file: Option<PathBuf>,
    /// Path to a JSON config file.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Who exports are counted against.
    #[arg(short, long, default_value = "local")]
    user: String,
    /// The account ledger.
    #[arg(long, default_value = DEFAULT_LEDGER_FILE)]
    ledger: PathBuf,
    /// Directory exports are written to.
    #[arg(short, long, default_value = ".")]
    out: PathBuf,
    /// Where logs go; the terminal belongs to the ui.
    #[arg(long, default_value = "samplx.log")]
    log_file: PathBuf,
    /// Run without an audio device. Playback is simulated.
    #[arg(long)]
    headless: bool,
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_file)?;

    let config = match &cli.config {
        Some(path) => EditorConfig::load(path)?,
        None => EditorConfig::default(),
    };
    let ledger = LocalLedger::open(&cli.ledger, config.free_export_limit)
        .with_context(|| format!("could not open ledger {}", cli.ledger.display()))?;
    let gate = ExportGate::new(Box::new(ledger), config.entitlement_refresh());
    let sink = DirectorySink::new(&cli.out);
    let recorder = Box::new(MicRecorder::new());
    info!(user = %cli.user, headless = cli.headless, "starting");

    if cli.headless {
        let output = HeadlessOutput::new(HEADLESS_SAMPLE_RATE);
        let session = EditorSession::new(config, output, gate, sink, recorder, cli.user);
        run_ui(session, cli.file)
    } else {
        let output = audio::start_audio()?;
        let session = EditorSession::new(config, output, gate, sink, recorder, cli.user);
        run_ui(session, cli.file)
    }
}

fn init_logging(path: &Path) -> anyhow::Result<()> {
    let file = File::create(path)
        .with_context(|| format!("could not create log file {}", path.display()))?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("samplx=info")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

fn run_ui<O: AudioOutput>(
    mut session: EditorSession<O, DirectorySink>,
    file: Option<PathBuf>,
) -> anyhow::Result<()> {
    if let Some(path) = file {
        if let Err(e) = session.load(&mut PathSource::new(&path)) {
            warn!(path = %path.display(), error = %e, "could not open startup file");
            session.notify(format!("could not open {}: {e}", path.display()));
        }
    }

    terminal::enable_raw_mode()?;
    let _ = crossterm::execute!(std::io::stdout(), EnableMouseCapture);
    let _guard = RawModeGuard; // auto drops when out of scope

    let backend = CrosstermBackend::new(std::io::stdout());
    let mut term = Terminal::new(backend)?;
    term.clear()?;

    let tick_rate = std::time::Duration::from_millis(16); // ~60fps
    let mut last_tick = Instant::now();
    let blink_start = Instant::now();
    let mut tui_state = tui::mode::TuiState::default();

    loop {
        let blink_on = (blink_start.elapsed().as_millis() / 250) % 2 == 0;

        // the waveform width has to be known before the session renders it
        let size = term.size()?;
        tui_state.wave_area = tui::view::waveform_area(Rect::new(0, 0, size.width, size.height));
        let ds = session.display_state(tui_state.wave_width());

        term.draw(|frame| {
            tui::view::render(frame, frame.area(), &ds, blink_on);
        })?;

        let events = tui::input::poll_input(tick_rate, &tui_state)?;
        for event in events {
            if event == InputEvent::Quit {
                if let Err(e) = session.stop_all() {
                    warn!(error = %e, "could not stop playback on quit");
                }
                info!("quitting");
                drop(term);
                return Ok(());
            }
            session.handle_input(event);
        }

        let elapsed = last_tick.elapsed();
        last_tick = Instant::now();
        session.tick(elapsed);
    }
}

struct RawModeGuard;
impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let _ = crossterm::execute!(std::io::stdout(), DisableMouseCapture);
        let _ = terminal::disable_raw_mode();
    }
}
