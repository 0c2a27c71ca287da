use crate::core::engine::{Pass, ReconcileEngine};
use crate::domain::model::Flag;
use crate::utils::error::{CharmError, Result};
use regex::Regex;

const BASE_APT_PACKAGES: [&str; 6] = [
    "python3",
    "python3-pip",
    "libssl-dev",
    "libffi-dev",
    "python3-dev",
    "git",
];

/// Native XMPP stack; these backends need libraries pip cannot provide.
const XMPP_APT_PACKAGES: [&str; 4] = [
    "python3-dns",
    "python3-sleekxmpp",
    "python3-pyasn1",
    "python3-pyasn1-modules",
];

const SYSTEM_SITE_BACKENDS: [&str; 2] = ["xmpp", "hipchat"];

/// Release codename to the package that provides `python3 -m venv`.
pub fn venv_package(codename: &str) -> &'static str {
    match codename {
        "trusty" => "python3.4-venv",
        "xenial" => "python3.5-venv",
        _ => "python3-venv",
    }
}

/// Extra pip package a chat backend needs, if any.
pub fn backend_package(backend: &str) -> Option<&'static str> {
    match backend {
        "irc" => Some("irc"),
        "hipchat" => Some("hypchat"),
        "slack" => Some("slackclient"),
        "telegram" => Some("python-telegram-bot"),
        _ => None,
    }
}

/// Pulls the version out of `pip show` output.
pub fn parse_installed_version(pip_show: &str) -> Result<String> {
    let re = Regex::new(r"(?m)^Version: (.*)$").map_err(|e| CharmError::VersionMetadataError {
        output: e.to_string(),
    })?;
    re.captures(pip_show)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .ok_or_else(|| CharmError::VersionMetadataError {
            output: pip_show.to_string(),
        })
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl ReconcileEngine {
    pub(crate) async fn install_bot(&self, pass: &mut Pass<'_>) -> Result<()> {
        self.maintenance("Installing packages").await?;

        let codename = self.host.unit.release_codename().await?;
        let mut apt_packages = to_strings(&BASE_APT_PACKAGES);
        apt_packages.push(venv_package(codename.trim()).to_string());
        self.apt_install_missing(&apt_packages).await?;

        self.bootstrap_venv().await?;

        let version = pass.config.version.trim();
        if version.is_empty() {
            tracing::warn!("version not set, skipping install of errbot");
            return Ok(());
        }

        let current_version = self.installed_version().await?;
        if current_version.as_deref() != Some(version) {
            self.maintenance("Installing configured version of errbot and dependencies")
                .await?;
            tracing::info!(
                "Upgrading errbot {} -> {}",
                current_version.as_deref().unwrap_or("(none)"),
                version
            );

            let mut pip_packages = vec![format!("errbot=={}", version)];
            let backend = pass.config.backend_name();
            if let Some(package) = backend_package(&backend) {
                pip_packages.push(package.to_string());
            }

            if SYSTEM_SITE_BACKENDS.contains(&backend.as_str()) {
                tracing::info!("Backend {} needs system site packages", backend);
                self.host
                    .packages
                    .create_venv(&self.layout.venv(), true)
                    .await?;
                self.apt_install_missing(&to_strings(&XMPP_APT_PACKAGES))
                    .await?;
            }

            let mut args = self.wheel_source_args(pass).await?;
            args.extend(pip_packages);
            self.host
                .packages
                .pip_install(&self.layout.venv(), &args, false)
                .await?;
        } else {
            tracing::info!("errbot {} already installed", version);
        }

        pass.set_flag(Flag::Installed);
        Ok(())
    }

    async fn apt_install_missing(&self, packages: &[String]) -> Result<()> {
        let missing = self.host.packages.filter_installed(packages).await?;
        if missing.is_empty() {
            return Ok(());
        }
        self.host.packages.apt_install(&missing).await
    }

    /// Creates the venv on first use and strips the stale six wheel that
    /// `python3 -m venv` copies in.
    async fn bootstrap_venv(&self) -> Result<()> {
        let engine = self;
        self.guard()
            .scope(move || async move {
                if engine.layout.pip().exists() {
                    return Ok(());
                }

                tracing::info!("Creating python3 venv");
                let venv = engine.layout.venv();
                engine.host.packages.create_venv(&venv, false).await?;
                engine
                    .host
                    .packages
                    .pip_install(&venv, &["six".to_string()], true)
                    .await?;

                tracing::info!("Removing six-1.5 wheel from venv");
                let wheels = engine.layout.venv_wheels();
                if wheels.is_dir() {
                    for entry in std::fs::read_dir(&wheels)? {
                        let entry = entry?;
                        if entry.file_name().to_string_lossy().starts_with("six-1.5") {
                            std::fs::remove_file(entry.path())?;
                        }
                    }
                }
                Ok(())
            })
            .await
    }

    /// `None` when errbot is not in the venv yet.
    async fn installed_version(&self) -> Result<Option<String>> {
        if !self.layout.errbot().exists() {
            return Ok(None);
        }
        let output = self
            .host
            .packages
            .pip_show(&self.layout.venv(), "errbot")
            .await?;
        parse_installed_version(&output).map(Some)
    }
}
