use crate::domain::layout::Layout;
use crate::domain::model::{Invocation, NagiosCheck, RelationKind, WorkloadState};
use crate::domain::ports::{
    Accounts, CommandRunner, Host, Packages, Relations, ServiceManager, UnitEnvironment,
};
use crate::utils::error::{CharmError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Output;
use std::sync::Arc;
use tokio::process::Command;

async fn output_of(program: &str, args: &[String], env: &[(String, String)]) -> Result<Output> {
    tracing::debug!("exec: {} {}", program, args.join(" "));
    let output = Command::new(program)
        .args(args)
        .envs(env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .output()
        .await?;
    Ok(output)
}

async fn run_checked(program: &str, args: &[String], env: &[(String, String)]) -> Result<String> {
    let output = output_of(program, args, env).await?;
    if !output.status.success() {
        return Err(CharmError::CommandError {
            program: program.to_string(),
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn args(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn path_arg(path: &Path) -> String {
    path.display().to_string()
}

/// Users and groups through the shadow-utils tools.
#[derive(Debug, Default)]
pub struct SystemAccounts;

#[async_trait]
impl Accounts for SystemAccounts {
    async fn group_exists(&self, group: &str) -> Result<bool> {
        let output = output_of("getent", &args(&["group", group]), &[]).await?;
        Ok(output.status.success())
    }

    async fn add_group(&self, group: &str) -> Result<()> {
        run_checked("groupadd", &args(&["--system", group]), &[])
            .await
            .map(|_| ())
            .map_err(|e| CharmError::ProvisioningError {
                message: format!("groupadd {}: {}", group, e),
            })
    }

    async fn user_exists(&self, user: &str) -> Result<bool> {
        let output = output_of("getent", &args(&["passwd", user]), &[]).await?;
        Ok(output.status.success())
    }

    async fn add_user(&self, user: &str, primary_group: &str) -> Result<()> {
        run_checked(
            "useradd",
            &args(&["--system", "--shell", "/bin/false", "--gid", primary_group, user]),
            &[],
        )
        .await
        .map(|_| ())
        .map_err(|e| CharmError::ProvisioningError {
            message: format!("useradd {}: {}", user, e),
        })
    }

    async fn chown_recursive(&self, path: &Path, user: &str, group: &str) -> Result<()> {
        run_checked(
            "chown",
            &["-R".to_string(), format!("{}:{}", user, group), path_arg(path)],
            &[],
        )
        .await
        .map(|_| ())
        .map_err(|e| CharmError::ProvisioningError {
            message: format!("chown {}: {}", path.display(), e),
        })
    }
}

/// apt for OS packages, the venv's pip for Python ones.
#[derive(Debug, Default)]
pub struct AptAndPip;

#[async_trait]
impl Packages for AptAndPip {
    async fn filter_installed(&self, packages: &[String]) -> Result<Vec<String>> {
        let mut missing = Vec::new();
        for package in packages {
            let output = output_of(
                "dpkg-query",
                &args(&["-W", "--showformat=${Status}", package]),
                &[],
            )
            .await?;
            let status = String::from_utf8_lossy(&output.stdout);
            if !output.status.success() || !status.contains("install ok installed") {
                missing.push(package.clone());
            }
        }
        Ok(missing)
    }

    async fn apt_install(&self, packages: &[String]) -> Result<()> {
        tracing::info!("Installing apt packages: {}", packages.join(" "));
        let mut install_args = args(&["install", "--yes", "--no-install-recommends"]);
        install_args.extend(packages.iter().cloned());
        run_checked(
            "apt-get",
            &install_args,
            &[("DEBIAN_FRONTEND".to_string(), "noninteractive".to_string())],
        )
        .await
        .map(|_| ())
    }

    async fn create_venv(&self, venv: &Path, system_site_packages: bool) -> Result<()> {
        let mut venv_args = args(&["-m", "venv"]);
        if system_site_packages {
            venv_args.push("--system-site-packages".to_string());
        }
        venv_args.push(path_arg(venv));
        run_checked("/usr/bin/python3", &venv_args, &[]).await.map(|_| ())
    }

    async fn pip_install(&self, venv: &Path, packages: &[String], upgrade: bool) -> Result<()> {
        let mut pip_args = vec!["install".to_string()];
        if upgrade {
            pip_args.push("--upgrade".to_string());
        }
        pip_args.extend(packages.iter().cloned());
        run_checked(&path_arg(&venv.join("bin").join("pip")), &pip_args, &[])
            .await
            .map(|_| ())
    }

    async fn pip_show(&self, venv: &Path, package: &str) -> Result<String> {
        run_checked(
            &path_arg(&venv.join("bin").join("pip")),
            &args(&["show", package]),
            &[],
        )
        .await
    }
}

#[derive(Debug, Default)]
pub struct Systemd;

#[async_trait]
impl ServiceManager for Systemd {
    async fn stop(&self, service: &str) -> Result<()> {
        let output = output_of("systemctl", &args(&["stop", service]), &[]).await?;
        // Don't fail if the service was never started
        if !output.status.success() {
            tracing::debug!(
                "systemctl stop {}: {}",
                service,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(())
    }

    async fn start(&self, service: &str) -> Result<()> {
        run_checked("systemctl", &args(&["start", service]), &[])
            .await
            .map(|_| ())
    }

    async fn reload_units(&self) -> Result<()> {
        tracing::info!("Running systemctl daemon-reload");
        run_checked("systemctl", &args(&["daemon-reload"]), &[])
            .await
            .map(|_| ())
    }
}

/// Juju hook tools.
#[derive(Debug, Default)]
pub struct JujuUnit;

#[async_trait]
impl UnitEnvironment for JujuUnit {
    async fn status_set(&self, state: WorkloadState, message: &str) -> Result<()> {
        run_checked("status-set", &args(&[state.as_str(), message]), &[])
            .await
            .map(|_| ())
    }

    async fn open_port(&self, port: u16) -> Result<()> {
        run_checked("open-port", &[format!("{}/tcp", port)], &[])
            .await
            .map(|_| ())
    }

    async fn close_port(&self, port: u16) -> Result<()> {
        run_checked("close-port", &[format!("{}/tcp", port)], &[])
            .await
            .map(|_| ())
    }

    async fn release_codename(&self) -> Result<String> {
        Ok(run_checked("lsb_release", &args(&["-cs"]), &[]).await?.trim().to_string())
    }

    fn unit_name(&self) -> String {
        std::env::var("JUJU_UNIT_NAME").unwrap_or_else(|_| "errbot/0".to_string())
    }
}

#[derive(Debug, Default)]
pub struct ProcessRunner;

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, invocation: &Invocation) -> Result<String> {
        match &invocation.run_as {
            Some(user) => {
                let su_args = vec![
                    "su".to_string(),
                    "-s".to_string(),
                    "/bin/sh".to_string(),
                    "-".to_string(),
                    user.clone(),
                    "-c".to_string(),
                    invocation.command_line(),
                ];
                run_checked("sudo", &su_args, &invocation.env).await
            }
            None => run_checked(&invocation.program, &invocation.args, &invocation.env).await,
        }
    }
}

/// NRPE command files and Juju relation settings.
#[derive(Debug)]
pub struct JujuRelations {
    nrpe_dir: PathBuf,
}

impl JujuRelations {
    pub fn new(nrpe_dir: PathBuf) -> Self {
        Self { nrpe_dir }
    }
}

#[async_trait]
impl Relations for JujuRelations {
    async fn add_nagios_check(&self, relation: RelationKind, check: &NagiosCheck) -> Result<()> {
        std::fs::create_dir_all(&self.nrpe_dir)?;
        let path = self.nrpe_dir.join(format!("{}.cfg", check.name));
        let body = format!(
            "# {} ({}, context {}, unit {})\ncommand[{}]={}\n",
            check.description,
            relation.as_str(),
            check.context,
            check.unit,
            check.name,
            check.command.join(" ")
        );
        std::fs::write(&path, body)?;
        tracing::info!("Wrote NRPE check {}", path.display());

        run_checked("service", &args(&["nagios-nrpe-server", "reload"]), &[])
            .await
            .map(|_| ())
    }

    async fn configure_webhooks(&self, port: u16) -> Result<()> {
        let ids =
            run_checked("relation-ids", &args(&[RelationKind::Webhooks.as_str()]), &[]).await?;
        for id in ids.lines().map(str::trim).filter(|l| !l.is_empty()) {
            run_checked(
                "relation-set",
                &["-r".to_string(), id.to_string(), format!("port={}", port)],
                &[],
            )
            .await?;
        }
        Ok(())
    }
}

impl Host {
    /// The real machine, driven through OS and Juju tools.
    pub fn system(layout: &Layout) -> Self {
        Self {
            accounts: Arc::new(SystemAccounts),
            packages: Arc::new(AptAndPip),
            service: Arc::new(Systemd),
            unit: Arc::new(JujuUnit),
            commands: Arc::new(ProcessRunner),
            relations: Arc::new(JujuRelations::new(layout.nrpe_dir())),
        }
    }
}
