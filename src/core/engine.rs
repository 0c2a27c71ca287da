use crate::adapters::templates::Templates;
use crate::config::CharmConfig;
use crate::core::dispatch::{self, Handler, Observation};
use crate::core::once::PassScratch;
use crate::core::provision::ProvisioningGuard;
use crate::core::state::{file_hash, StateRecord};
use crate::domain::layout::Layout;
use crate::domain::model::{
    ConfigKey, Flag, PathOwnership, RelationKind, Status, WatchedFile, WorkloadState,
};
use crate::domain::ports::Host;
use crate::utils::error::Result;
use chrono::Utc;
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Working state of one reconciliation pass.
pub struct Pass<'c> {
    pub config: &'c CharmConfig,
    pub record: StateRecord,
    pub changed_config: BTreeSet<ConfigKey>,
    pub relations: BTreeSet<RelationKind>,
    pub scratch: PassScratch,
    pub ran: Vec<Handler>,
}

impl Pass<'_> {
    pub fn set_flag(&mut self, flag: Flag) {
        self.record.status = self.record.status.set(flag);
    }

    pub fn clear_flag(&mut self, flag: Flag) {
        self.record.status = self.record.status.clear(flag);
    }
}

#[derive(Debug, Clone)]
pub struct PassReport {
    pub handlers: Vec<Handler>,
    pub status: Status,
    pub record: StateRecord,
}

pub struct ReconcileEngine {
    pub(crate) host: Host,
    pub(crate) layout: Layout,
    pub(crate) templates: Templates,
    registry: Vec<PathOwnership>,
}

impl ReconcileEngine {
    pub fn new(host: Host, layout: Layout, templates: Templates) -> Self {
        let registry = layout.ownership();
        Self {
            host,
            layout,
            templates,
            registry,
        }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub(crate) fn guard(&self) -> ProvisioningGuard<'_> {
        ProvisioningGuard::new(self.host.accounts.as_ref(), &self.registry)
    }

    fn watched_path(&self, file: WatchedFile) -> PathBuf {
        match file {
            WatchedFile::PluginsConfig => self.layout.plugins_config_file(),
        }
    }

    fn changed_files(&self, record: &StateRecord) -> Result<BTreeSet<WatchedFile>> {
        let mut changed = BTreeSet::new();
        for file in [WatchedFile::PluginsConfig] {
            let path = self.watched_path(file);
            let current = file_hash(&path)?;
            if current.as_deref() != record.stored_hash(&path) {
                changed.insert(file);
            }
        }
        Ok(changed)
    }

    /// Handlers that are ready before anything runs. Touches nothing.
    pub fn plan(
        &self,
        config: &CharmConfig,
        record: &StateRecord,
        relations: &BTreeSet<RelationKind>,
    ) -> Result<Vec<Handler>> {
        let changed_config = config.changed_keys(record.previous_config.as_ref())?;
        let changed_files = self.changed_files(record)?;
        Ok(dispatch::plan(&Observation {
            status: record.status,
            changed_config: &changed_config,
            changed_files: &changed_files,
            relations,
        }))
    }

    /// Runs every ready handler until none is left. On error the caller
    /// should keep its previous record; nothing here is persisted.
    pub async fn run_pass(
        &self,
        config: &CharmConfig,
        previous: StateRecord,
        relations: BTreeSet<RelationKind>,
    ) -> Result<PassReport> {
        let changed_config = config.changed_keys(previous.previous_config.as_ref())?;
        tracing::debug!("Changed configuration: {:?}", changed_config);

        let mut pass = Pass {
            config,
            record: previous,
            changed_config,
            relations,
            scratch: PassScratch::new(),
            ran: Vec::new(),
        };

        loop {
            let changed_files = self.changed_files(&pass.record)?;
            let obs = Observation {
                status: pass.record.status,
                changed_config: &pass.changed_config,
                changed_files: &changed_files,
                relations: &pass.relations,
            };
            let binding = match dispatch::next_ready(&obs, &pass.ran) {
                Some(binding) => binding,
                None => break,
            };

            for file in binding.watched_files() {
                let path = self.watched_path(file);
                let hash = file_hash(&path)?;
                pass.record.remember_hash(&path, hash);
            }
            pass.ran.push(binding.handler);

            tracing::info!("▶ Running {}", binding.handler);
            self.run_handler(binding.handler, &mut pass).await?;
        }

        self.report_status(&pass).await?;

        let mut record = pass.record;
        record.previous_config = Some(config.snapshot()?);
        record.last_pass_at = Some(Utc::now());

        Ok(PassReport {
            handlers: pass.ran,
            status: record.status,
            record,
        })
    }

    async fn run_handler(&self, handler: Handler, pass: &mut Pass<'_>) -> Result<()> {
        match handler {
            Handler::InstallBot => self.install_bot(pass).await,
            Handler::RenderConfig => self.render_config(pass).await,
            Handler::ConfigureWebserver => self.configure_webserver(pass).await,
            Handler::ConfigurePluginRepos | Handler::ConfigurePluginsConfig => {
                self.render_plugin_config(pass).await
            }
            Handler::ReconcilePlugins => self.reconcile_plugins().await,
            Handler::LocalMonitors => self.setup_nagios(RelationKind::LocalMonitors, pass).await,
            Handler::NrpeExternalMaster => {
                self.setup_nagios(RelationKind::NrpeExternalMaster, pass).await
            }
            Handler::AnnounceWebhooks => self.announce_webhooks().await,
        }
    }

    async fn report_status(&self, pass: &Pass<'_>) -> Result<()> {
        if pass.record.status.has(Flag::Available) {
            self.host.unit.status_set(WorkloadState::Active, "Ready").await
        } else if pass.config.version.trim().is_empty() {
            self.host
                .unit
                .status_set(WorkloadState::Blocked, "Waiting for version to be configured")
                .await
        } else {
            Ok(())
        }
    }

    pub(crate) async fn maintenance(&self, message: &str) -> Result<()> {
        tracing::info!("{}", message);
        self.host
            .unit
            .status_set(WorkloadState::Maintenance, message)
            .await
    }
}
