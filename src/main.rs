use std::{fs::File, io::stdout, path::PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use log::{error, info};
use ratatui::{Terminal, backend::CrosstermBackend};
use simplelog::{Config, LevelFilter, WriteLogger};

use guidenav::event_source::TerminalEventSource;
use guidenav::panic_handler::initialize_panic_handler;
use guidenav::preferences::{FileStorage, KeyValueStorage, PreferenceStore};
use guidenav::settings;
use guidenav::{App, run_app_with_event_source};

#[derive(Parser, Debug)]
#[command(name = "guidenav")]
#[command(about = "Terminal reader for World Cup 2026 city guides", long_about = None)]
struct Args {
    /// Guide page (HTML) to open
    file: PathBuf,

    /// Page key used for saved/rating preferences [default: /guide/<file stem>]
    #[arg(short, long)]
    page: Option<String>,

    /// Preference file
    #[arg(short, long)]
    storage: Option<PathBuf>,

    #[arg(long, default_value = "guidenav.log")]
    log_file: PathBuf,

    /// Settings file (YAML)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    WriteLogger::init(
        LevelFilter::Debug,
        Config::default(),
        File::create(&args.log_file)
            .with_context(|| format!("Failed to create log file {}", args.log_file.display()))?,
    )?;

    initialize_panic_handler();
    info!("Starting guidenav");

    settings::load_settings(args.config.as_deref());
    let config = settings::current();

    let storage_path = args.storage.clone().or_else(settings::default_preferences_path);
    let storage: Box<dyn KeyValueStorage> =
        Box::new(FileStorage::load_or_ephemeral(storage_path.as_deref()));
    let preferences = PreferenceStore::with_namespace(storage, &config.namespace);

    let mut app = App::new(config, preferences);
    app.load_guide(&args.file, args.page.clone())?;

    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut event_source = TerminalEventSource;
    let res = run_app_with_event_source(&mut terminal, &mut app, &mut event_source);

    app.unmount();

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        error!("Application error: {err:?}");
        println!("{err:?}");
    }

    info!("Shutting down guidenav");
    Ok(())
}
