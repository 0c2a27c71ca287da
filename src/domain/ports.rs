use crate::domain::model::{Invocation, NagiosCheck, RelationKind, WorkloadState};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

#[async_trait]
pub trait Accounts: Send + Sync {
    async fn group_exists(&self, group: &str) -> Result<bool>;
    /// Creates a system group.
    async fn add_group(&self, group: &str) -> Result<()>;
    async fn user_exists(&self, user: &str) -> Result<bool>;
    /// Creates a system user without a login shell.
    async fn add_user(&self, user: &str, primary_group: &str) -> Result<()>;
    async fn chown_recursive(&self, path: &Path, user: &str, group: &str) -> Result<()>;
}

#[async_trait]
pub trait Packages: Send + Sync {
    /// Returns the subset of `packages` that is not installed yet.
    async fn filter_installed(&self, packages: &[String]) -> Result<Vec<String>>;
    async fn apt_install(&self, packages: &[String]) -> Result<()>;
    async fn create_venv(&self, venv: &Path, system_site_packages: bool) -> Result<()>;
    async fn pip_install(&self, venv: &Path, args: &[String], upgrade: bool) -> Result<()>;
    /// Raw `pip show` output for `package`.
    async fn pip_show(&self, venv: &Path, package: &str) -> Result<String>;
}

#[async_trait]
pub trait ServiceManager: Send + Sync {
    async fn stop(&self, service: &str) -> Result<()>;
    async fn start(&self, service: &str) -> Result<()>;
    /// Re-reads unit definitions after a unit file changed.
    async fn reload_units(&self) -> Result<()>;
}

/// The hosting agent: status, ports and facts about the machine.
#[async_trait]
pub trait UnitEnvironment: Send + Sync {
    async fn status_set(&self, state: WorkloadState, message: &str) -> Result<()>;
    async fn open_port(&self, port: u16) -> Result<()>;
    async fn close_port(&self, port: u16) -> Result<()>;
    async fn release_codename(&self) -> Result<String>;
    fn unit_name(&self) -> String;
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Runs to completion; a non-zero exit is an error. Returns stdout.
    async fn run(&self, invocation: &Invocation) -> Result<String>;
}

#[async_trait]
pub trait Relations: Send + Sync {
    async fn add_nagios_check(&self, relation: RelationKind, check: &NagiosCheck) -> Result<()>;
    async fn configure_webhooks(&self, port: u16) -> Result<()>;
}

/// Every external collaborator a reconciliation pass talks to.
#[derive(Clone)]
pub struct Host {
    pub accounts: Arc<dyn Accounts>,
    pub packages: Arc<dyn Packages>,
    pub service: Arc<dyn ServiceManager>,
    pub unit: Arc<dyn UnitEnvironment>,
    pub commands: Arc<dyn CommandRunner>,
    pub relations: Arc<dyn Relations>,
}

impl Host {
    /// Builds a host where one object plays every role, as fakes do.
    pub fn uniform<T>(all: Arc<T>) -> Self
    where
        T: Accounts
            + Packages
            + ServiceManager
            + UnitEnvironment
            + CommandRunner
            + Relations
            + 'static,
    {
        Self {
            accounts: all.clone(),
            packages: all.clone(),
            service: all.clone(),
            unit: all.clone(),
            commands: all.clone(),
            relations: all,
        }
    }
}
