pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::Templates;
pub use config::CharmConfig;
pub use core::{dispatch::Handler, engine::ReconcileEngine, state::StateRecord};
pub use domain::{layout::Layout, model::Status, ports::Host};
pub use utils::error::{CharmError, Result};
