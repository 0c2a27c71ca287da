use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Lifecycle of the deployed bot. Each level implies every level below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    #[default]
    NotInstalled,
    Installed,
    Available,
    WebhooksEnabled,
}

/// Named facts that gate later handlers, backed by [`Status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flag {
    Installed,
    Available,
    WebhooksEnabled,
}

impl Flag {
    fn level(self) -> Status {
        match self {
            Flag::Installed => Status::Installed,
            Flag::Available => Status::Available,
            Flag::WebhooksEnabled => Status::WebhooksEnabled,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Flag::Installed => "errbot.installed",
            Flag::Available => "errbot.available",
            Flag::WebhooksEnabled => "errbot.webhooks-enabled",
        }
    }
}

impl Status {
    pub fn has(self, flag: Flag) -> bool {
        self >= flag.level()
    }

    /// Setting a flag never lowers the status.
    pub fn set(self, flag: Flag) -> Status {
        self.max(flag.level())
    }

    /// Clearing a flag drops to the level just below it, if currently held.
    pub fn clear(self, flag: Flag) -> Status {
        if !self.has(flag) {
            return self;
        }
        match flag {
            Flag::Installed => Status::NotInstalled,
            Flag::Available => Status::Installed,
            Flag::WebhooksEnabled => Status::Available,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Status::NotInstalled => "not-installed",
            Status::Installed => "installed",
            Status::Available => "available",
            Status::WebhooksEnabled => "webhooks-enabled",
        };
        f.write_str(name)
    }
}

/// Configuration options whose change triggers a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConfigKey {
    Version,
    EnableWebhooks,
    PluginRepos,
    PluginsConfig,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 4] = [
        ConfigKey::Version,
        ConfigKey::EnableWebhooks,
        ConfigKey::PluginRepos,
        ConfigKey::PluginsConfig,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ConfigKey::Version => "version",
            ConfigKey::EnableWebhooks => "enable_webhooks",
            ConfigKey::PluginRepos => "plugin_repos",
            ConfigKey::PluginsConfig => "plugins_config",
        }
    }
}

/// Files whose content change triggers a handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WatchedFile {
    PluginsConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "kebab-case")]
pub enum RelationKind {
    LocalMonitors,
    NrpeExternalMaster,
    Webhooks,
}

impl RelationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RelationKind::LocalMonitors => "local-monitors",
            RelationKind::NrpeExternalMaster => "nrpe-external-master",
            RelationKind::Webhooks => "webhooks",
        }
    }
}

/// Agent-visible workload state, as shown by `juju status`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkloadState {
    Maintenance,
    Blocked,
    Active,
}

impl WorkloadState {
    pub fn as_str(self) -> &'static str {
        match self {
            WorkloadState::Maintenance => "maintenance",
            WorkloadState::Blocked => "blocked",
            WorkloadState::Active => "active",
        }
    }
}

/// A directory the service needs, and who must own it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathOwnership {
    pub path: PathBuf,
    pub user: &'static str,
    pub group: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NagiosCheck {
    pub name: String,
    pub description: String,
    pub command: Vec<String>,
    pub context: String,
    pub unit: String,
}

/// One external program call. `run_as` switches to that user through a login shell.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub run_as: Option<String>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    pub fn run_as(mut self, user: impl Into<String>) -> Self {
        self.run_as = Some(user.into());
        self
    }

    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}
