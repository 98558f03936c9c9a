use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use kasongo::{
    api::{ApiClient, ApiWorker},
    app_dirs::AppDirs,
    config::{Config, FileConfigStore},
    logging,
    runtime::{AppEvent, AppEventSource, CrosstermEventSource, FixedTicker, Runner, Ticker},
    session::TimerMode,
    App, Control, TICK_RATE_MS,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use std::{
    error::Error,
    io::{self, stdin},
    path::PathBuf,
    time::{Duration, Instant},
};
use tracing::warn;

/// cyberpunk typing trainer for the kasongo typing server
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A neon typing trainer that talks to a kasongo typing server: timed drills, live wpm and accuracy, audio cues, and a dashboard of your history."
)]
pub struct Cli {
    /// base url of the typing server
    #[clap(short = 'S', long)]
    server: Option<String>,

    /// difficulty level to practice
    #[clap(short = 'l', long)]
    level: Option<String>,

    /// start with this exercise; needs --level
    #[clap(short = 'e', long, requires = "level")]
    exercise: Option<String>,

    /// count time up from the first keystroke, or down from the time limit
    #[clap(short = 'm', long, value_enum)]
    timer_mode: Option<TimerMode>,

    /// seconds allowed in countdown mode
    #[clap(short = 't', long, value_parser = clap::value_parser!(u32).range(1..))]
    time_limit: Option<u32>,

    /// start with audio cues off
    #[clap(long)]
    mute: bool,

    /// audio cue volume between 0 and 1
    #[clap(long, value_parser = parse_volume)]
    volume: Option<f32>,

    /// read and save settings here instead of the default config file
    #[clap(long)]
    config: Option<PathBuf>,
}

fn parse_volume(s: &str) -> Result<f32, String> {
    let volume: f32 = s.parse().map_err(|_| format!("`{s}` is not a number"))?;
    if (0.0..=1.0).contains(&volume) {
        Ok(volume)
    } else {
        Err("volume must be between 0 and 1".to_string())
    }
}

impl Cli {
    /// Command-line flags win over the config file
    fn apply(&self, config: &mut Config) {
        if let Some(server) = &self.server {
            config.server_url = server.clone();
        }
        if let Some(level) = &self.level {
            config.level = level.clone();
        }
        if let Some(mode) = self.timer_mode {
            config.timer_mode = mode;
        }
        if let Some(secs) = self.time_limit {
            config.time_limit_secs = secs;
        }
        if self.mute {
            config.audio.enabled = false;
        }
        if let Some(volume) = self.volume {
            config.audio.volume = volume;
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let store = match &cli.config {
        Some(path) => FileConfigStore::with_path(path),
        None => FileConfigStore::new(),
    };
    let loaded = store.try_load();
    let mut config = loaded.as_ref().cloned().unwrap_or_default();
    cli.apply(&mut config);

    if let Some(path) = AppDirs::log_path() {
        if let Err(err) = logging::init_logging(&config.log_level, &path) {
            eprintln!("warning: logging disabled: {err}");
        }
    }
    // reported only now so it lands in the log file
    if let Err(err) = &loaded {
        warn!(error = %err, "ignoring unreadable config");
    }

    let client = match ApiClient::new(&config.api_config()) {
        Ok(client) => client,
        Err(err) => {
            let mut cmd = Cli::command();
            cmd.error(ErrorKind::ValueValidation, err.to_string()).exit();
        }
    };

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let events = CrosstermEventSource::new();
    let (_worker, jobs) = ApiWorker::spawn(client, events.sender());
    let runner = Runner::new(events, FixedTicker::new(Duration::from_millis(TICK_RATE_MS)));

    let mut app = App::new(config, jobs).with_store(Box::new(store));
    app.boot(cli.exercise.as_deref(), Instant::now());

    let result = start_tui(&mut terminal, &mut app, &runner);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn start_tui<B: Backend, E: AppEventSource, T: Ticker>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    runner: &Runner<E, T>,
) -> Result<(), Box<dyn Error>> {
    terminal.draw(|f| f.render_widget(&*app, f.area()))?;

    loop {
        let now = Instant::now();
        let mut redraw = match runner.step() {
            AppEvent::Tick => false,
            AppEvent::Resize => true,
            AppEvent::Key(key) => {
                if app.on_key(key, now) == Control::Quit {
                    break;
                }
                true
            }
            AppEvent::Api(outcome) => {
                app.on_api_outcome(outcome, now);
                true
            }
        };
        // timers are polled on every pass so a busy event stream can't starve them
        redraw |= app.on_tick(now);

        if redraw {
            terminal.draw(|f| f.render_widget(&*app, f.area()))?;
        }
    }

    Ok(())
}
