// Adapters layer: concrete implementations for OS tools, Juju hook tools and templates.

pub mod system;
pub mod templates;

pub use system::{AptAndPip, JujuRelations, JujuUnit, ProcessRunner, SystemAccounts, Systemd};
pub use templates::Templates;
