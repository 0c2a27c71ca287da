//! Trigger bindings and their evaluation.
//!
//! A pass walks [`BINDINGS`] in order and runs the first binding whose
//! conditions all hold and which has not run yet, then re-evaluates, until
//! nothing is ready. Everything here is pure: conditions look only at an
//! [`Observation`], never at the system.

use crate::domain::model::{ConfigKey, Flag, RelationKind, Status, WatchedFile};
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Handler {
    InstallBot,
    RenderConfig,
    ConfigureWebserver,
    ConfigurePluginRepos,
    ConfigurePluginsConfig,
    ReconcilePlugins,
    LocalMonitors,
    NrpeExternalMaster,
    AnnounceWebhooks,
}

impl fmt::Display for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Handler::InstallBot => "install-bot",
            Handler::RenderConfig => "render-config",
            Handler::ConfigureWebserver => "configure-webserver",
            Handler::ConfigurePluginRepos => "configure-plugin-repos",
            Handler::ConfigurePluginsConfig => "configure-plugins-config",
            Handler::ReconcilePlugins => "reconcile-plugins",
            Handler::LocalMonitors => "local-monitors",
            Handler::NrpeExternalMaster => "nrpe-external-master",
            Handler::AnnounceWebhooks => "announce-webhooks",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    ConfigChanged(ConfigKey),
    Flag(Flag),
    FileChanged(WatchedFile),
    Relation(RelationKind),
}

/// What a pass can see when deciding which handler runs next.
#[derive(Debug, Clone, Copy)]
pub struct Observation<'a> {
    pub status: Status,
    pub changed_config: &'a BTreeSet<ConfigKey>,
    pub changed_files: &'a BTreeSet<WatchedFile>,
    pub relations: &'a BTreeSet<RelationKind>,
}

impl Condition {
    pub fn holds(&self, obs: &Observation<'_>) -> bool {
        match self {
            Condition::ConfigChanged(key) => obs.changed_config.contains(key),
            Condition::Flag(flag) => obs.status.has(*flag),
            Condition::FileChanged(file) => obs.changed_files.contains(file),
            Condition::Relation(kind) => obs.relations.contains(kind),
        }
    }
}

#[derive(Debug)]
pub struct Binding {
    pub handler: Handler,
    pub conditions: &'static [Condition],
}

impl Binding {
    pub fn ready(&self, obs: &Observation<'_>) -> bool {
        self.conditions.iter().all(|c| c.holds(obs))
    }

    pub fn watched_files(&self) -> impl Iterator<Item = WatchedFile> + '_ {
        self.conditions.iter().filter_map(|c| match c {
            Condition::FileChanged(file) => Some(*file),
            _ => None,
        })
    }
}

pub const BINDINGS: &[Binding] = &[
    Binding {
        handler: Handler::InstallBot,
        conditions: &[Condition::ConfigChanged(ConfigKey::Version)],
    },
    Binding {
        handler: Handler::RenderConfig,
        conditions: &[Condition::Flag(Flag::Installed)],
    },
    Binding {
        handler: Handler::ConfigureWebserver,
        conditions: &[
            Condition::Flag(Flag::Available),
            Condition::ConfigChanged(ConfigKey::EnableWebhooks),
        ],
    },
    Binding {
        handler: Handler::ConfigurePluginRepos,
        conditions: &[
            Condition::Flag(Flag::Available),
            Condition::ConfigChanged(ConfigKey::PluginRepos),
        ],
    },
    Binding {
        handler: Handler::ConfigurePluginsConfig,
        conditions: &[
            Condition::Flag(Flag::Available),
            Condition::ConfigChanged(ConfigKey::PluginsConfig),
        ],
    },
    Binding {
        handler: Handler::ReconcilePlugins,
        conditions: &[Condition::FileChanged(WatchedFile::PluginsConfig)],
    },
    Binding {
        handler: Handler::LocalMonitors,
        conditions: &[
            Condition::Relation(RelationKind::LocalMonitors),
            Condition::Flag(Flag::Available),
        ],
    },
    Binding {
        handler: Handler::NrpeExternalMaster,
        conditions: &[
            Condition::Relation(RelationKind::NrpeExternalMaster),
            Condition::Flag(Flag::Available),
        ],
    },
    Binding {
        handler: Handler::AnnounceWebhooks,
        conditions: &[
            Condition::Relation(RelationKind::Webhooks),
            Condition::Flag(Flag::WebhooksEnabled),
        ],
    },
];

pub fn next_ready(obs: &Observation<'_>, already_ran: &[Handler]) -> Option<&'static Binding> {
    BINDINGS
        .iter()
        .find(|b| !already_ran.contains(&b.handler) && b.ready(obs))
}

/// Handlers ready at the start of a pass, in the order they would be tried.
/// Later handlers may become ready once these change state.
pub fn plan(obs: &Observation<'_>) -> Vec<Handler> {
    BINDINGS
        .iter()
        .filter(|b| b.ready(obs))
        .map(|b| b.handler)
        .collect()
}
