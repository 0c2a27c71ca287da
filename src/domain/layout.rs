use crate::domain::model::PathOwnership;
use std::path::{Path, PathBuf};

pub const DEPLOY_USER: &str = "ubunet";
pub const BOT_USER: &str = "errbot";
pub const SERVICE_NAME: &str = "errbot";
pub const WEBHOOKS_PORT: u16 = 8080;

/// Filesystem layout of a deployment, relocatable under `root` for tests.
#[derive(Debug, Clone)]
pub struct Layout {
    root: PathBuf,
}

impl Default for Layout {
    fn default() -> Self {
        Self::under("/")
    }
}

impl Layout {
    pub fn under(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn rooted(&self, absolute: &str) -> PathBuf {
        self.root.join(absolute.trim_start_matches('/'))
    }

    pub fn base(&self) -> PathBuf {
        self.rooted("/srv/errbot")
    }

    pub fn var(&self) -> PathBuf {
        self.base().join("var")
    }

    pub fn log(&self) -> PathBuf {
        self.var().join("log")
    }

    pub fn data(&self) -> PathBuf {
        self.var().join("data")
    }

    pub fn plugins(&self) -> PathBuf {
        self.var().join("plugins")
    }

    pub fn etc(&self) -> PathBuf {
        self.base().join("etc")
    }

    pub fn venv(&self) -> PathBuf {
        self.base().join("venv")
    }

    pub fn wheels(&self) -> PathBuf {
        self.base().join("wheels")
    }

    pub fn pip(&self) -> PathBuf {
        self.venv().join("bin").join("pip")
    }

    pub fn errbot(&self) -> PathBuf {
        self.venv().join("bin").join("errbot")
    }

    pub fn venv_wheels(&self) -> PathBuf {
        self.venv().join("lib").join("python-wheels")
    }

    pub fn config_file(&self) -> PathBuf {
        self.etc().join("config.py")
    }

    pub fn plugins_config_file(&self) -> PathBuf {
        self.etc().join("plugins_config.py")
    }

    pub fn data_file(&self) -> PathBuf {
        self.data().join("core.db")
    }

    /// `<data file>.old`, the snapshot kept while plugins are restored.
    pub fn data_file_backup(&self) -> PathBuf {
        let mut name = self.data_file().into_os_string();
        name.push(".old");
        PathBuf::from(name)
    }

    pub fn ssh_home(&self) -> PathBuf {
        self.rooted("/home").join(DEPLOY_USER).join(".ssh")
    }

    pub fn unit_file(&self) -> PathBuf {
        self.rooted("/etc/systemd/system").join(format!("{}.service", SERVICE_NAME))
    }

    pub fn nrpe_dir(&self) -> PathBuf {
        self.rooted("/etc/nagios/nrpe.d")
    }

    pub fn is_relocated(&self) -> bool {
        self.root != Path::new("/")
    }

    /// Every directory the service needs with its owner; order matters,
    /// parents come before children.
    pub fn ownership(&self) -> Vec<PathOwnership> {
        vec![
            owned(self.var(), DEPLOY_USER),
            owned(self.log(), BOT_USER),
            owned(self.data(), BOT_USER),
            owned(self.plugins(), BOT_USER),
            owned(self.etc(), DEPLOY_USER),
            owned(self.venv(), DEPLOY_USER),
            owned(self.wheels(), DEPLOY_USER),
            owned(self.ssh_home(), DEPLOY_USER),
        ]
    }
}

fn owned(path: PathBuf, user: &'static str) -> PathOwnership {
    PathOwnership {
        path,
        user,
        group: user,
    }
}
