//! The application context.
//!
//! [`App`] owns the configuration, the store and the injected capabilities
//! (input, location, clipboard, weather) and turns each command into rendered
//! output. Operation errors never escape a handler; they become messages.

use std::io::Write;

use serde::Serialize;
use serde_json::json;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::cli::{CrewCommand, EventCommand, OutputFormat, WeatherCommand};
use crate::config::{Config, WeatherBackendKind};
use crate::crew::{CrewRegistry, DeleteOutcome, Joined};
use crate::debounce::Debouncer;
use crate::error::{Error, Result};
use crate::event::{Attended, EventLog};
use crate::input::{InputProvider, StaticInput, TerminalInput};
use crate::location::{self, ConfiguredLocation, LocationProvider};
use crate::render::{self, MessageKind};
use crate::share::{self, ShareTarget, SystemClipboard};
use crate::storage::Store;
use crate::weather::{WeatherClient, WeatherError, WeatherReport};

const CREW_NAME_PROMPT: &str = "Enter your crew name:";
const CREW_ID_PROMPT: &str = "Enter crew ID to join:";
const RESET_CONFIRMATION: &str =
    "This will delete all crews, events and saved locations. Continue?";

/// Everything a command needs, built once in `main`.
pub struct App {
    config: Config,
    store: Store,
    format: OutputFormat,
    input: Box<dyn InputProvider>,
    location: Box<dyn LocationProvider>,
    share: Box<dyn ShareTarget>,
    weather: Option<WeatherClient>,
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("store", &self.store)
            .field("format", &self.format)
            .field("location", &self.location)
            .field("weather", &self.weather)
            .finish_non_exhaustive()
    }
}

impl App {
    /// Create the context over an open store, with terminal input, the
    /// system clipboard, and the configured location and weather backends.
    ///
    /// The configured next cleanup is written as the first event if no
    /// events have been stored yet.
    #[must_use]
    pub fn new(config: Config, store: Store, format: OutputFormat) -> Self {
        if EventLog::new(&store).seed(&config.cleanup) {
            debug!(location = %config.cleanup.name, "Seeded the next cleanup");
        }
        let location = Box::new(ConfiguredLocation::from_config(&config.location));
        Self {
            config,
            store,
            format,
            input: Box::new(TerminalInput::stdio()),
            location,
            share: Box::new(SystemClipboard),
            weather: None,
        }
    }

    /// Open the configured store (in memory if the file is unusable) and
    /// create the context.
    ///
    /// # Errors
    ///
    /// Returns an error only if no store at all can be opened.
    pub fn open(config: Config, format: OutputFormat) -> Result<Self> {
        let store = Store::open_or_memory(config.database_path())?;
        Ok(Self::new(config, store, format))
    }

    /// Replace the input provider.
    #[must_use]
    pub fn with_input(mut self, input: impl InputProvider + 'static) -> Self {
        self.input = Box::new(input);
        self
    }

    /// Replace the location provider.
    #[must_use]
    pub fn with_location_provider(mut self, provider: impl LocationProvider + 'static) -> Self {
        self.location = Box::new(provider);
        self
    }

    /// Replace the clipboard.
    #[must_use]
    pub fn with_share_target(mut self, target: impl ShareTarget + 'static) -> Self {
        self.share = Box::new(target);
        self
    }

    /// Use `client` for every weather request, whatever backend is asked for.
    #[must_use]
    pub fn with_weather(mut self, client: WeatherClient) -> Self {
        self.weather = Some(client);
        self
    }

    /// The configuration this context was built from.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The store behind this context.
    #[must_use]
    pub fn store(&self) -> &Store {
        &self.store
    }

    fn crews(&self) -> CrewRegistry<'_> {
        CrewRegistry::new(&self.store, self.config.crew.member_name.as_str())
    }

    fn events(&self) -> EventLog<'_> {
        EventLog::new(&self.store)
    }

    fn weather_client(&self, backend: Option<WeatherBackendKind>) -> WeatherClient {
        match &self.weather {
            Some(client) => client.clone(),
            None => WeatherClient::from_config(
                &self.config,
                backend.unwrap_or(self.config.weather.backend),
            ),
        }
    }

    fn say(&self, kind: MessageKind, text: &str) -> String {
        say(self.format, kind, text)
    }

    fn failure(&self, err: &Error) -> String {
        let text = match err {
            Error::CrewNotFound { .. } => "Crew not found!".to_string(),
            Error::EventNotFound { .. } => "Cleanup event not found!".to_string(),
            Error::Weather(e) => return render_weather(self.format, &Err(e)),
            other => format!("Something went wrong: {other}"),
        };
        debug!("Operation failed: {err}");
        self.say(MessageKind::Error, &text)
    }

    fn to_json<T: Serialize + ?Sized>(&self, value: &T) -> String {
        serde_json::to_string_pretty(value).unwrap_or_else(|e| {
            error!("Failed to serialize output: {e}");
            self.failure(&Error::from(e))
        })
    }

    /// Show crews, the next cleanup and the weather in one go.
    pub async fn start(&self) -> String {
        let crews = self.crews().list_crews();
        let events = self.events().list_events();
        let outcome = self.weather_client(None).fetch(None).await;

        if self.format == OutputFormat::Json {
            let weather = match &outcome {
                Ok(report) => json!(report),
                Err(e) => json!({ "error": e.to_string() }),
            };
            return self.to_json(&json!({
                "cleanup": self.config.cleanup,
                "crews": crews,
                "events": events,
                "weather": weather,
            }));
        }

        let markup = self.format.markup();
        let cleanup = &self.config.cleanup;
        [
            render::message(
                markup,
                MessageKind::Info,
                &format!("Next cleanup: {} ({})", cleanup.name, cleanup.description),
            ),
            render::crews(markup, &crews),
            render::events(markup, &events),
            render_weather(self.format, &outcome.as_ref()),
        ]
        .join("\n\n")
    }

    /// Run a crew subcommand.
    pub fn crew(&mut self, command: CrewCommand) -> String {
        match command {
            CrewCommand::Create { name } => self.create_crew(name),
            CrewCommand::Join { id } => self.join_crew(id),
            CrewCommand::Delete { id, yes } => self.delete_crew(&id, yes),
            CrewCommand::List => self.list_crews(),
            CrewCommand::Share { id } => self.share_crew(&id),
        }
    }

    fn ask(&mut self, given: Option<String>, prompt: &str) -> Result<Option<String>> {
        match given {
            Some(value) => Ok(Some(value)),
            None => self.input.prompt(prompt),
        }
    }

    fn create_crew(&mut self, name: Option<String>) -> String {
        let name = match self.ask(name, CREW_NAME_PROMPT) {
            Ok(name) => name.unwrap_or_default(),
            Err(e) => return self.failure(&e),
        };

        match self.crews().create_crew(&name) {
            Some(crew) if self.format == OutputFormat::Json => self.to_json(&crew),
            Some(crew) => self.say(
                MessageKind::Success,
                &format!("Crew \"{}\" created successfully!", crew.name),
            ),
            None => self.say(MessageKind::Info, "No crew name given; nothing was created."),
        }
    }

    fn join_crew(&mut self, id: Option<String>) -> String {
        let id = match self.ask(id, CREW_ID_PROMPT) {
            Ok(Some(id)) => id,
            Ok(None) => return self.say(MessageKind::Info, "No crew ID given."),
            Err(e) => return self.failure(&e),
        };

        match self.crews().join_crew(&id) {
            Ok(Joined { crew, .. }) if self.format == OutputFormat::Json => self.to_json(&crew),
            Ok(Joined { crew, added }) => {
                if !added {
                    debug!(crew_id = crew.id, "Already a member");
                }
                self.say(
                    MessageKind::Success,
                    &format!("Joined \"{}\" successfully!", crew.name),
                )
            }
            Err(e) => self.failure(&e),
        }
    }

    fn delete_crew(&mut self, id: &str, yes: bool) -> String {
        let outcome = if yes {
            self.crews().delete_crew(id, &mut StaticInput::confirming(true))
        } else {
            let registry = CrewRegistry::new(&self.store, self.config.crew.member_name.as_str());
            registry.delete_crew(id, self.input.as_mut())
        };

        match outcome {
            Ok(DeleteOutcome::Deleted(crew)) => self.say(
                MessageKind::Success,
                &format!("Crew \"{}\" deleted.", crew.name),
            ),
            Ok(DeleteOutcome::Cancelled) => self.say(MessageKind::Info, "Deletion cancelled."),
            Ok(DeleteOutcome::NotFound) => self.failure(&Error::crew_not_found(id)),
            Err(e) => self.failure(&e),
        }
    }

    fn list_crews(&self) -> String {
        let crews = self.crews().list_crews();
        if self.format == OutputFormat::Json {
            self.to_json(&crews)
        } else {
            render::crews(self.format.markup(), &crews)
        }
    }

    fn share_crew(&mut self, id: &str) -> String {
        let Some(crew) = self.crews().get(id) else {
            return self.failure(&Error::crew_not_found(id));
        };

        if share::share_crew(self.share.as_mut(), &crew) {
            self.say(
                MessageKind::Success,
                &format!("Crew ID {} copied to clipboard!", crew.id),
            )
        } else {
            self.say(
                MessageKind::Info,
                &format!("Share this crew ID with your friends: {}", crew.id),
            )
        }
    }

    /// Run an event subcommand.
    pub fn event(&mut self, command: EventCommand) -> String {
        match command {
            EventCommand::List => {
                let events = self.events().list_events();
                if self.format == OutputFormat::Json {
                    self.to_json(&events)
                } else {
                    render::events(self.format.markup(), &events)
                }
            }
            EventCommand::Add { location } => match self.events().schedule_event(&location) {
                Ok(event) if self.format == OutputFormat::Json => self.to_json(&event),
                Ok(event) => self.say(
                    MessageKind::Success,
                    &format!("Cleanup at {} scheduled (ID {}).", event.location, event.id),
                ),
                Err(e) => self.failure(&e),
            },
            EventCommand::Attend { id } => match self.events().mark_attended(&id) {
                Ok(Attended { event, .. }) if self.format == OutputFormat::Json => {
                    self.to_json(&event)
                }
                Ok(Attended {
                    event,
                    newly_marked: true,
                }) => self.say(
                    MessageKind::Success,
                    &format!("Cleanup at {} logged successfully!", event.location),
                ),
                Ok(Attended { event, .. }) => self.say(
                    MessageKind::Info,
                    &format!("Cleanup at {} was already logged.", event.location),
                ),
                Err(e) => self.failure(&e),
            },
        }
    }

    /// Fetch and render the weather once.
    pub async fn weather(&self, command: &WeatherCommand) -> String {
        let client = self.weather_client(command.backend.map(Into::into));
        let outcome = client.fetch(command.place.as_deref()).await;
        render_weather(self.format, &outcome.as_ref())
    }

    /// Fetch the weather now and again for every refresh trigger read from
    /// `triggers`, writing each state to `out`.
    ///
    /// Each line is a trigger; bursts are debounced. A line reading `q` or
    /// the end of input stops reading, and the call returns once every
    /// fetch already started has been written. Fetches run concurrently, so
    /// an older result can arrive after a newer one.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to `out` fails.
    pub async fn watch_weather<R, W>(
        &self,
        command: &WeatherCommand,
        triggers: R,
        out: &mut W,
    ) -> Result<()>
    where
        R: AsyncBufRead + Unpin + Send + 'static,
        W: Write,
    {
        let client = self.weather_client(command.backend.map(Into::into));
        let place = command.place.clone();
        info!(backend = client.backend_name(), "Watching weather");

        let (trigger_tx, trigger_rx) = mpsc::channel(16);
        tokio::spawn(read_triggers(triggers, trigger_tx));
        let mut debouncer = Debouncer::new(trigger_rx, self.config.refresh_debounce());

        let (result_tx, mut result_rx) = mpsc::unbounded_channel();
        let mut result_tx = Some(result_tx);

        begin_fetch(&client, place.clone(), self.format, result_tx.as_ref(), out)?;

        loop {
            tokio::select! {
                trigger = debouncer.next(), if result_tx.is_some() => match trigger {
                    Some(()) => {
                        debug!("Refresh triggered");
                        begin_fetch(&client, place.clone(), self.format, result_tx.as_ref(), out)?;
                    }
                    None => {
                        debug!("Refresh triggers closed");
                        result_tx = None;
                    }
                },
                Some(rendered) = result_rx.recv() => {
                    writeln!(out, "{rendered}")?;
                    out.flush()?;
                }
                else => break,
            }
        }
        Ok(())
    }

    /// Acquire the current location, falling back to the last known one.
    pub async fn location(&self) -> String {
        let acquired = location::acquire(
            self.location.as_ref(),
            self.config.location_timeout(),
            &self.store,
        )
        .await;

        match acquired {
            Some(here) if self.format == OutputFormat::Json => self.to_json(&here),
            Some(here) => self.say(MessageKind::Success, &format!("📍 Location: {here}")),
            None => match location::last_known(&self.store) {
                Some(last) if self.format == OutputFormat::Json => self.to_json(&last),
                Some(last) => self.say(
                    MessageKind::Info,
                    &format!("Location unavailable; last known position: {last}"),
                ),
                None => self.say(MessageKind::Error, "Location unavailable."),
            },
        }
    }

    /// Describe the store and the configured services.
    pub fn status(&self, json: bool) -> String {
        let stats = match self.store.stats() {
            Ok(stats) => stats,
            Err(e) => return self.failure(&e),
        };
        let crews = self.crews().list_crews().len();
        let events = self.events().list_events().len();
        let attended = self
            .events()
            .list_events()
            .iter()
            .filter(|e| e.attended)
            .count();

        if json || self.format == OutputFormat::Json {
            return self.to_json(&json!({
                "database_path": self.store.path(),
                "in_memory": self.store.is_in_memory(),
                "entries": stats.entries,
                "value_bytes": stats.value_bytes,
                "db_size_bytes": stats.db_size_bytes,
                "crews": crews,
                "events": events,
                "attended": attended,
                "weather_backend": self.config.weather.backend.to_string(),
            }));
        }

        let storage = if self.store.is_in_memory() {
            "in memory (not persisted)".to_string()
        } else {
            self.store.path().display().to_string()
        };
        [
            "shoresquad status".to_string(),
            "-----------------".to_string(),
            format!("Database:      {storage}"),
            format!("Entries:       {} ({} bytes)", stats.entries, stats.value_bytes),
            format!("Crews:         {crews}"),
            format!("Cleanups:      {events} ({attended} attended)"),
            format!("Weather:       {}", self.config.weather.backend),
        ]
        .join("\n")
    }

    /// Remove every stored record after confirmation.
    pub fn reset(&mut self, yes: bool) -> String {
        let confirmed = yes
            || match self.input.confirm(RESET_CONFIRMATION) {
                Ok(confirmed) => confirmed,
                Err(e) => return self.failure(&e),
            };
        if !confirmed {
            return self.say(MessageKind::Info, "Reset cancelled.");
        }

        let removed = self.store.clear();
        warn!(removed, "Cleared all stored records");
        self.say(
            MessageKind::Success,
            &format!("Cleared {removed} stored records."),
        )
    }
}

fn say(format: OutputFormat, kind: MessageKind, text: &str) -> String {
    match format {
        OutputFormat::Json => json!({ "kind": kind, "message": text }).to_string(),
        OutputFormat::Plain | OutputFormat::Html => render::message(format.markup(), kind, text),
    }
}

fn render_weather(
    format: OutputFormat,
    outcome: &std::result::Result<&WeatherReport, &WeatherError>,
) -> String {
    match (format, outcome) {
        (OutputFormat::Json, Ok(report)) => serde_json::to_string_pretty(report)
            .unwrap_or_else(|e| say(format, MessageKind::Error, &e.to_string())),
        (OutputFormat::Json, Err(e)) => json!({ "error": e.to_string() }).to_string(),
        (_, Ok(report)) => render::weather(format.markup(), report),
        (_, Err(e)) => render::weather_error(format.markup(), e),
    }
}

/// Write the loading state and start a fetch whose rendering is sent to
/// `results` when it resolves.
fn begin_fetch<W: Write>(
    client: &WeatherClient,
    place: Option<String>,
    format: OutputFormat,
    results: Option<&mpsc::UnboundedSender<String>>,
    out: &mut W,
) -> Result<()> {
    let Some(results) = results else {
        return Ok(());
    };

    let loading = match format {
        OutputFormat::Json => say(format, MessageKind::Loading, render::LOADING_WEATHER),
        OutputFormat::Plain | OutputFormat::Html => render::loading(format.markup()),
    };
    writeln!(out, "{loading}")?;
    out.flush()?;

    let client = client.clone();
    let results = results.clone();
    tokio::spawn(async move {
        let outcome = client.fetch(place.as_deref()).await;
        if results
            .send(render_weather(format, &outcome.as_ref()))
            .is_err()
        {
            debug!("Watch ended before the fetch completed");
        }
    });
    Ok(())
}

async fn read_triggers<R: AsyncBufRead + Unpin>(reader: R, triggers: mpsc::Sender<()>) {
    let mut lines = reader.lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) if matches!(line.trim(), "q" | "quit") => break,
            Ok(Some(_)) => {
                if triggers.send(()).await.is_err() {
                    break;
                }
            }
            Ok(None) => break,
            Err(e) => {
                warn!("Failed to read refresh trigger: {e}");
                break;
            }
        }
    }
}
