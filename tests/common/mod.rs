#![allow(dead_code)]

use async_trait::async_trait;
use errbot_charm::domain::model::{Invocation, NagiosCheck, RelationKind, WorkloadState};
use errbot_charm::domain::ports::{
    Accounts, CommandRunner, Packages, Relations, ServiceManager, UnitEnvironment,
};
use errbot_charm::{CharmConfig, CharmError, Host, Layout, ReconcileEngine, Result, Templates};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

/// Records every call a pass makes and keeps just enough state to answer
/// follow-up queries the way a real machine would.
#[derive(Default)]
pub struct FakeHost {
    pub codename: Mutex<String>,
    pub installed_apt: Mutex<HashSet<String>>,
    pub apt_installs: Mutex<Vec<Vec<String>>>,
    pub venvs: Mutex<Vec<(PathBuf, bool)>>,
    pub pip_installs: Mutex<Vec<Vec<String>>>,
    pub errbot_version: Mutex<Option<String>>,
    pub users: Mutex<HashSet<String>>,
    pub groups: Mutex<HashSet<String>>,
    pub owners: Mutex<HashMap<PathBuf, (String, String)>>,
    pub service_running: Mutex<bool>,
    pub service_calls: Mutex<Vec<String>>,
    pub statuses: Mutex<Vec<(WorkloadState, String)>>,
    pub open_ports: Mutex<BTreeSet<u16>>,
    pub commands: Mutex<Vec<Invocation>>,
    pub fail_restore: Mutex<bool>,
    pub fail_chown: Mutex<bool>,
    pub nagios_checks: Mutex<Vec<(RelationKind, NagiosCheck)>>,
    pub webhook_announcements: Mutex<Vec<u16>>,
}

impl FakeHost {
    pub fn new() -> Arc<Self> {
        let host = Self::default();
        *host.codename.lock().unwrap() = "jammy".to_string();
        Arc::new(host)
    }

    pub fn owner_of(&self, path: &Path) -> Option<(String, String)> {
        self.owners.lock().unwrap().get(path).cloned()
    }

    pub fn last_status(&self) -> Option<(WorkloadState, String)> {
        self.statuses.lock().unwrap().last().cloned()
    }

    pub fn ran_program(&self, suffix: &str) -> bool {
        self.commands
            .lock()
            .unwrap()
            .iter()
            .any(|inv| inv.program.ends_with(suffix))
    }
}

#[async_trait]
impl Accounts for FakeHost {
    async fn group_exists(&self, group: &str) -> Result<bool> {
        Ok(self.groups.lock().unwrap().contains(group))
    }

    async fn add_group(&self, group: &str) -> Result<()> {
        self.groups.lock().unwrap().insert(group.to_string());
        Ok(())
    }

    async fn user_exists(&self, user: &str) -> Result<bool> {
        Ok(self.users.lock().unwrap().contains(user))
    }

    async fn add_user(&self, user: &str, primary_group: &str) -> Result<()> {
        if !self.groups.lock().unwrap().contains(primary_group) {
            return Err(CharmError::ProvisioningError {
                message: format!("group {} does not exist", primary_group),
            });
        }
        self.users.lock().unwrap().insert(user.to_string());
        Ok(())
    }

    async fn chown_recursive(&self, path: &Path, user: &str, group: &str) -> Result<()> {
        if *self.fail_chown.lock().unwrap() {
            return Err(CharmError::ProvisioningError {
                message: format!("chown {}: Operation not permitted", path.display()),
            });
        }
        let mut owners = self.owners.lock().unwrap();
        let mut stack = vec![path.to_path_buf()];
        while let Some(current) = stack.pop() {
            if current.is_dir() {
                for entry in std::fs::read_dir(&current)? {
                    stack.push(entry?.path());
                }
            }
            owners.insert(current, (user.to_string(), group.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl Packages for FakeHost {
    async fn filter_installed(&self, packages: &[String]) -> Result<Vec<String>> {
        let installed = self.installed_apt.lock().unwrap();
        Ok(packages
            .iter()
            .filter(|p| !installed.contains(*p))
            .cloned()
            .collect())
    }

    async fn apt_install(&self, packages: &[String]) -> Result<()> {
        self.installed_apt
            .lock()
            .unwrap()
            .extend(packages.iter().cloned());
        self.apt_installs.lock().unwrap().push(packages.to_vec());
        Ok(())
    }

    async fn create_venv(&self, venv: &Path, system_site_packages: bool) -> Result<()> {
        std::fs::create_dir_all(venv.join("bin"))?;
        std::fs::write(venv.join("bin").join("pip"), "#!/bin/sh\n")?;
        std::fs::create_dir_all(venv.join("lib").join("python-wheels"))?;
        std::fs::write(
            venv.join("lib").join("python-wheels").join("six-1.5.2-py2.py3-none-any.whl"),
            "stale",
        )?;
        self.venvs
            .lock()
            .unwrap()
            .push((venv.to_path_buf(), system_site_packages));
        Ok(())
    }

    async fn pip_install(&self, venv: &Path, args: &[String], _upgrade: bool) -> Result<()> {
        if let Some(version) = args.iter().find_map(|a| a.strip_prefix("errbot==")) {
            std::fs::write(venv.join("bin").join("errbot"), "#!/bin/sh\n")?;
            *self.errbot_version.lock().unwrap() = Some(version.to_string());
        }
        self.pip_installs.lock().unwrap().push(args.to_vec());
        Ok(())
    }

    async fn pip_show(&self, _venv: &Path, package: &str) -> Result<String> {
        match self.errbot_version.lock().unwrap().as_deref() {
            Some(version) if package == "errbot" => {
                Ok(format!("Name: errbot\nVersion: {}\nSummary: chatbot\n", version))
            }
            _ => Err(CharmError::CommandError {
                program: "pip".to_string(),
                code: Some(1),
                stderr: format!("WARNING: Package(s) not found: {}", package),
            }),
        }
    }
}

#[async_trait]
impl ServiceManager for FakeHost {
    async fn stop(&self, service: &str) -> Result<()> {
        *self.service_running.lock().unwrap() = false;
        self.service_calls.lock().unwrap().push(format!("stop {}", service));
        Ok(())
    }

    async fn start(&self, service: &str) -> Result<()> {
        *self.service_running.lock().unwrap() = true;
        self.service_calls.lock().unwrap().push(format!("start {}", service));
        Ok(())
    }

    async fn reload_units(&self) -> Result<()> {
        self.service_calls.lock().unwrap().push("daemon-reload".to_string());
        Ok(())
    }
}

#[async_trait]
impl UnitEnvironment for FakeHost {
    async fn status_set(&self, state: WorkloadState, message: &str) -> Result<()> {
        self.statuses
            .lock()
            .unwrap()
            .push((state, message.to_string()));
        Ok(())
    }

    async fn open_port(&self, port: u16) -> Result<()> {
        self.open_ports.lock().unwrap().insert(port);
        Ok(())
    }

    async fn close_port(&self, port: u16) -> Result<()> {
        self.open_ports.lock().unwrap().remove(&port);
        Ok(())
    }

    async fn release_codename(&self) -> Result<String> {
        Ok(self.codename.lock().unwrap().clone())
    }

    fn unit_name(&self) -> String {
        "errbot/0".to_string()
    }
}

#[async_trait]
impl CommandRunner for FakeHost {
    async fn run(&self, invocation: &Invocation) -> Result<String> {
        self.commands.lock().unwrap().push(invocation.clone());
        if invocation.program.ends_with("errbot") && *self.fail_restore.lock().unwrap() {
            return Err(CharmError::CommandError {
                program: invocation.program.clone(),
                code: Some(1),
                stderr: "plugin install failed".to_string(),
            });
        }
        Ok(String::new())
    }
}

#[async_trait]
impl Relations for FakeHost {
    async fn add_nagios_check(&self, relation: RelationKind, check: &NagiosCheck) -> Result<()> {
        self.nagios_checks
            .lock()
            .unwrap()
            .push((relation, check.clone()));
        Ok(())
    }

    async fn configure_webhooks(&self, port: u16) -> Result<()> {
        self.webhook_announcements.lock().unwrap().push(port);
        Ok(())
    }
}

/// An engine over a throwaway root directory.
pub struct Harness {
    pub root: TempDir,
    pub fake: Arc<FakeHost>,
    pub engine: ReconcileEngine,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_root_name(OsStr::new("root"))
    }

    /// Layout placed under `<tempdir>/<name>`.
    pub fn with_root_name(name: &OsStr) -> Self {
        let root = TempDir::new().unwrap();
        let fake = FakeHost::new();
        let engine = ReconcileEngine::new(
            Host::uniform(fake.clone()),
            Layout::under(root.path().join(name)),
            Templates::embedded(),
        );
        Self { root, fake, engine }
    }

    pub fn layout(&self) -> &Layout {
        self.engine.layout()
    }
}

pub fn config_with_version(version: &str) -> CharmConfig {
    CharmConfig {
        version: version.to_string(),
        ..CharmConfig::default()
    }
}
