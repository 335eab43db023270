use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use chrono::{Datelike, NaiveDate};
use clap::{Parser, Subcommand};
use colored::*;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use citas_core::calendar::WEEKDAY_LABELS;
use citas_core::{AvailabilityCalculator, CalendarGrid, MeetingType, WidgetConfig};

mod app;
mod handler;
mod tui;
mod ui;

use app::App;
use tui::EventHandler;

#[derive(Parser)]
#[command(name = "citas")]
#[command(about = "Chat widget for booking appointments with a legal assistant bot")]
struct Cli {
    /// Bot backend base URL (overrides config file and CITAS_BOT_URL)
    #[arg(short, long)]
    url: Option<String>,
    /// Where to write logs (defaults to the user cache directory)
    #[arg(long)]
    log_file: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print a month of availability without opening the chat
    Calendar {
        /// Month number, 1-12 (defaults to the current month)
        #[arg(short, long)]
        month: Option<u32>,
        /// Year (defaults to the current year)
        #[arg(short, long)]
        year: Option<i32>,
        /// presencial, videoconferencia or telefonica
        #[arg(long)]
        meeting: Option<String>,
    },
    /// Show the effective configuration after overrides
    Config {
        /// Also write it to the config file
        #[arg(long)]
        save: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_file)?;

    let mut config = WidgetConfig::load()?;
    if let Some(url) = cli.url {
        config.backend_url = url;
    }
    config.validate()?;

    match cli.command {
        None => run_chat(config).await,
        Some(Commands::Calendar { month, year, meeting }) => {
            print_calendar(&config, month, year, meeting.as_deref())
        }
        Some(Commands::Config { save }) => show_config(&config, save),
    }
}

fn show_config(config: &WidgetConfig, save: bool) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(config)?);
    if save {
        config.save()?;
        info!("configuration saved");
        println!(
            "\n{} {}",
            "Saved to".green(),
            WidgetConfig::config_path()?.display()
        );
    }
    Ok(())
}

fn init_logging(path: Option<PathBuf>) -> Result<()> {
    let path = match path {
        Some(path) => path,
        None => dirs::cache_dir()
            .ok_or_else(|| anyhow!("Could not determine cache directory"))?
            .join("citas")
            .join("citas.log"),
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new().create(true).append(true).open(&path)?;

    // The terminal belongs to the UI, so logs only ever go to the file
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

async fn run_chat(config: WidgetConfig) -> Result<()> {
    info!(backend = %config.backend_url, "starting chat widget");

    tui::install_panic_hook();
    let mut terminal = tui::init()?;
    let mut events = EventHandler::new();
    let mut app = App::new(config, events.sender());

    let result = run_loop(&mut terminal, &mut events, &mut app).await;

    tui::restore()?;
    if let Err(err) = &result {
        error!(error = %err, "chat widget stopped");
    }
    result
}

async fn run_loop(terminal: &mut tui::Tui, events: &mut EventHandler, app: &mut App) -> Result<()> {
    while !app.should_quit {
        terminal.draw(|frame| ui::render(app, frame))?;

        match events.next().await {
            Some(event) => handler::handle_event(app, event)?,
            None => break,
        }
    }
    Ok(())
}

fn print_calendar(
    config: &WidgetConfig,
    month: Option<u32>,
    year: Option<i32>,
    meeting: Option<&str>,
) -> Result<()> {
    let today = app::today();
    let month = month.unwrap_or(today.month());
    let year = year.unwrap_or(today.year());
    let meeting = meeting
        .map(|m| {
            MeetingType::from_str(m)
                .or_else(|| MeetingType::from_choice(m))
                .ok_or_else(|| anyhow!("Unknown meeting type '{}'", m))
        })
        .transpose()?;

    let reference = NaiveDate::from_ymd_opt(year, month, 1)
        .ok_or_else(|| anyhow!("Invalid month {}/{}", month, year))?;
    let calculator = AvailabilityCalculator::new(config.booked_fraction);
    let available = calculator.available_days(month, year, meeting, today)?;
    let grid = CalendarGrid::build(reference, meeting, today, &available)?;

    println!("\n{}", format!("📅 {}", grid.title()).bold().blue());
    match meeting {
        Some(kind) => println!(
            "{}",
            format!("{} · {} min", kind.display_name(), kind.duration_minutes()).dimmed()
        ),
        None => println!("{}", config.missing_meeting_type_prompt.yellow()),
    }
    println!();

    let header: Vec<String> = WEEKDAY_LABELS.iter().map(|l| format!("{:>4}", l)).collect();
    println!("{}", header.join(" ").bold());

    for row in grid.rows() {
        let cells: Vec<String> = row
            .iter()
            .map(|cell| {
                let text = format!("{:>4}", cell.date.day());
                let styled = if !cell.in_current_month {
                    text.dimmed()
                } else if cell.is_available {
                    text.green().bold()
                } else {
                    text.bright_black()
                };
                if cell.is_today {
                    styled.underline().to_string()
                } else {
                    styled.to_string()
                }
            })
            .collect();
        println!("{}", cells.join(" "));
    }

    println!(
        "\n{} {}   {} {}",
        "■".green(),
        "Días con disponibilidad",
        "■".bright_black(),
        "Días sin disponibilidad"
    );
    println!("{} disponibles", grid.available_count().to_string().bold());
    Ok(())
}
