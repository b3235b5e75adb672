//! `shoresquad` - Rally your crew for beach cleanups
//!
//! This library provides crew and cleanup-event tracking over a local
//! key-value store, weather forecasts from public APIs, and the views and
//! controller behind the `shoresquad` command-line tool.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod app;
pub mod cli;
pub mod config;
pub mod crew;
pub mod debounce;
pub mod error;
pub mod event;
pub mod input;
pub mod location;
pub mod logging;
pub mod render;
pub mod share;
pub mod storage;
pub mod weather;

pub use app::App;
pub use config::Config;
pub use crew::{Crew, CrewRegistry};
pub use error::{Error, Result};
pub use event::{Event, EventLog};
pub use logging::init_logging;
pub use storage::{Store, StoreStats};
pub use weather::{WeatherClient, WeatherReport};
