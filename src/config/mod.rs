pub mod charm_config;
#[cfg(feature = "cli")]
pub mod cli;

pub use charm_config::{CharmConfig, ConfigSnapshot};
#[cfg(feature = "cli")]
pub use cli::CliConfig;
