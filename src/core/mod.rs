pub mod dispatch;
pub mod engine;
pub mod install;
pub mod integrations;
pub mod once;
pub mod plugins;
pub mod provision;
pub mod render;
pub mod state;
pub mod wheels;

pub use crate::domain::model::{Flag, Status};
pub use crate::domain::ports::Host;
pub use crate::utils::error::Result;
