use clap::{error::ErrorKind, ArgAction, CommandFactory, Parser};
use crossterm::{
    event::{KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use livetick::{
    app_dirs::AppDirs,
    config::{Config, ConfigStore, FileConfigStore, Settings},
    dispatcher::MainHandle,
    runtime::{AppEvent, CrosstermEventSource, FixedTicker, Runner},
    session::SessionStore,
    shell::TimerScreen,
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Frame, Terminal,
};
use std::{
    error::Error,
    fs::{self, OpenOptions},
    io::{self, stdin},
    path::PathBuf,
    time::Duration,
};

const TICK_RATE_MS: u64 = 250;

/// elapsed-time counter that keeps counting across screen rebuilds
#[derive(Parser, Debug, Clone)]
#[clap(version, about)]
pub struct Cli {
    /// display template with one integer placeholder, e.g. "%d seconds"
    #[clap(short = 't', long)]
    template: Option<String>,

    /// milliseconds between timer ticks; must be a whole number of seconds
    #[clap(long = "period-ms")]
    period_ms: Option<u64>,

    /// increase log verbosity (-d info, -dd debug, -ddd trace)
    #[clap(short = 'd', long, action = ArgAction::Count)]
    debug: u8,

    /// write logs to this file instead of the default state directory
    #[clap(long)]
    log_file: Option<PathBuf>,

    /// persist the effective template and period as the new defaults
    #[clap(long)]
    save_config: bool,
}

impl Cli {
    /// Overlay command line flags on the stored configuration
    fn apply(&self, mut cfg: Config) -> Config {
        if let Some(template) = &self.template {
            cfg.template = template.clone();
        }
        if let Some(period_ms) = self.period_ms {
            cfg.tick_period_ms = period_ms;
        }
        cfg
    }

    fn log_level(&self) -> &'static str {
        match self.debug {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }
}

/// Owns the session for the lifetime of the process and the screen for the
/// lifetime of one terminal configuration.
pub struct App {
    settings: Settings,
    main: MainHandle,
    store: SessionStore,
    screen: Option<TimerScreen>,
    generation: u64,
}

impl App {
    pub fn new(settings: Settings, main: MainHandle) -> Self {
        Self {
            settings,
            main,
            store: SessionStore::new(),
            screen: None,
            generation: 0,
        }
    }

    /// Tears down the current screen and builds a new one for `width` x `height`.
    pub fn rebuild(&mut self, width: u16, height: u16) -> livetick::Result<()> {
        self.screen = None;
        self.generation += 1;
        self.screen = Some(TimerScreen::start(
            &mut self.store,
            &self.main,
            &self.settings,
            (width, height),
            self.generation,
        )?);
        Ok(())
    }

    pub fn shutdown(&mut self) {
        self.screen = None;
        self.store.clear();
    }
}

fn init_logging(cli: &Cli) -> io::Result<()> {
    let Some(path) = cli.log_file.clone().or_else(AppDirs::log_path) else {
        return Ok(());
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(&path)?;

    // Allow RUST_LOG to override CLI setting
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_level()))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_logging(&cli)?;

    let store = FileConfigStore::new();
    let cfg = cli.apply(store.load());
    let settings = cfg.validate()?;
    if cli.save_config {
        store.save(&Config::from(&settings))?;
        log::info!("saved config to {}", store.path().display());
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    log::warn!("starting livetick v{}", env!("CARGO_PKG_VERSION"));

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = start_tui(&mut terminal, settings);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen,)?;
    terminal.show_cursor()?;

    if let Err(e) = &res {
        log::error!("{e}");
    }
    res
}

fn start_tui<B: Backend>(
    terminal: &mut Terminal<B>,
    settings: Settings,
) -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );
    let mut app = App::new(settings, runner.main_handle());

    let size = terminal.size()?;
    app.rebuild(size.width, size.height)?;
    terminal.draw(|f| ui(&app, f))?;

    loop {
        match runner.step() {
            AppEvent::Dispatch(task) => {
                task.run();
                terminal.draw(|f| ui(&app, f))?;
            }
            AppEvent::Resize(width, height) => {
                app.rebuild(width, height)?;
                terminal.draw(|f| ui(&app, f))?;
            }
            AppEvent::Key(key) if key.kind == KeyEventKind::Press => match key.code {
                KeyCode::Esc | KeyCode::Char('q') => break,
                // ctrl+c to quit
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => break,
                KeyCode::Char('r') => {
                    let size = terminal.size()?;
                    app.rebuild(size.width, size.height)?;
                    terminal.draw(|f| ui(&app, f))?;
                }
                _ => {}
            },
            AppEvent::Key(_) | AppEvent::Tick => {}
        }
    }

    app.shutdown();
    Ok(())
}

fn ui(app: &App, f: &mut Frame) {
    if let Some(screen) = &app.screen {
        f.render_widget(screen, f.area());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use livetick::dispatcher::MainThread;

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::parse_from(["livetick"]);

        assert_eq!(cli.template, None);
        assert_eq!(cli.period_ms, None);
        assert_eq!(cli.debug, 0);
        assert_eq!(cli.log_file, None);
        assert!(!cli.save_config);
        assert_eq!(cli.log_level(), "warn");
    }

    #[test]
    fn test_cli_debug_count() {
        assert_eq!(Cli::parse_from(["livetick", "-d"]).log_level(), "info");
        assert_eq!(Cli::parse_from(["livetick", "-dd"]).log_level(), "debug");
        assert_eq!(Cli::parse_from(["livetick", "-dddd"]).log_level(), "trace");
    }

    #[test]
    fn test_cli_overrides_config() {
        let cli = Cli::parse_from(["livetick", "-t", "%d detik", "--period-ms", "500"]);
        let cfg = cli.apply(Config::default());
        assert_eq!(cfg.template, "%d detik");
        assert_eq!(cfg.tick_period_ms, 500);

        let cli = Cli::parse_from(["livetick"]);
        let stored = Config {
            template: "t+%d".into(),
            tick_period_ms: 2000,
        };
        assert_eq!(cli.apply(stored.clone()), stored);
    }

    #[test]
    fn test_cli_sub_second_period_is_rejected() {
        let cli = Cli::parse_from(["livetick", "--period-ms", "250"]);
        let cfg = cli.apply(Config::default());
        assert!(matches!(cfg.validate(), Err(livetick::Error::UnalignedPeriod(250))));
    }

    #[test]
    fn test_app_rebuild_keeps_session_timer() {
        let (_main, handle) = MainThread::new();
        let mut app = App::new(Settings::default(), handle);

        app.rebuild(120, 30).unwrap();
        app.rebuild(40, 40).unwrap();

        let screen = app.screen.as_ref().unwrap();
        assert_eq!(screen.generation(), 2);
        assert_eq!(app.store.len(), 1);

        app.shutdown();
        assert!(app.screen.is_none());
        assert!(app.store.is_empty());
    }
}
