//! `shoresquad` - CLI for shoresquad
//!
//! This binary provides the command-line interface for managing cleanup
//! crews and events and checking the weather.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use clap::Parser;
use tokio::io::BufReader;

use shoresquad::cli::{Cli, Command, ConfigCommand, WeatherCommand};
use shoresquad::{init_logging, App, Config};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Load configuration
    let config = Config::load_from(cli.config.clone())?;

    match cli.command {
        Command::Config(config_cmd) => handle_config(&config, config_cmd),
        command => {
            let mut app = App::open(config, cli.format)?;
            run(&mut app, command).await
        }
    }
}

async fn run(app: &mut App, command: Command) -> Result<(), Box<dyn std::error::Error>> {
    let output = match command {
        Command::Start => app.start().await,
        Command::Crew(crew_cmd) => app.crew(crew_cmd),
        Command::Event(event_cmd) => app.event(event_cmd),
        Command::Weather(weather_cmd) if weather_cmd.watch => {
            return handle_watch(app, &weather_cmd).await;
        }
        Command::Weather(weather_cmd) => app.weather(&weather_cmd).await,
        Command::Location => app.location().await,
        Command::Status(status_cmd) => app.status(status_cmd.json),
        Command::Reset(reset_cmd) => app.reset(reset_cmd.yes),
        Command::Config(config_cmd) => return handle_config(app.config(), config_cmd),
    };

    println!("{output}");
    Ok(())
}

async fn handle_watch(app: &App, cmd: &WeatherCommand) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("Press Enter to refresh, q then Enter (or Ctrl-D) to stop.");
    let triggers = BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();
    app.watch_weather(cmd, triggers, &mut stdout).await?;
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> Result<(), Box<dyn std::error::Error>> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!();
                println!("[Weather]");
                println!("  Backend:            {}", config.weather.backend);
                println!(
                    "  Default place:      {}",
                    config.weather.default_place.as_deref().unwrap_or("(cleanup site)")
                );
                println!(
                    "  Request timeout:    {}",
                    config
                        .request_timeout()
                        .map_or_else(|| "client default".to_string(), |t| format!("{}s", t.as_secs()))
                );
                println!();
                println!("[Cleanup]");
                println!("  Name:               {}", config.cleanup.name);
                println!("  Description:        {}", config.cleanup.description);
                println!(
                    "  Coordinates:        {}, {}",
                    config.cleanup.latitude, config.cleanup.longitude
                );
                println!();
                println!("[Location]");
                println!("  Timeout (ms):       {}", config.location.timeout_ms);
                println!();
                println!("[Crew]");
                println!("  Member name:        {}", config.crew.member_name);
                println!();
                println!("[UI]");
                println!("  Refresh debounce:   {}ms", config.ui.refresh_debounce_ms);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
