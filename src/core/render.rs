use crate::adapters::templates::{CONFIG_TEMPLATE, PLUGINS_CONFIG_TEMPLATE, UNIT_TEMPLATE};
use crate::config::ConfigSnapshot;
use crate::core::engine::{Pass, ReconcileEngine};
use crate::core::once::OncePerPass;
use crate::core::state::file_hash;
use crate::domain::layout::{BOT_USER, SERVICE_NAME, WEBHOOKS_PORT};
use crate::domain::model::Flag;
use crate::utils::error::Result;
use serde_json::{json, Value};
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

// Paths need not be UTF-8; templates get the lossy form.
fn path_value(path: &Path) -> Value {
    Value::String(path.display().to_string())
}

/// A rendered file and how it must be installed.
struct Target<'a> {
    template: &'static str,
    path: &'a Path,
    owner: &'static str,
    mode: u32,
}

impl ReconcileEngine {
    pub(crate) async fn render_config(&self, pass: &mut Pass<'_>) -> Result<()> {
        self.maintenance("Generating errbot configuration file").await?;

        let mut config_ctx = pass.config.snapshot()?;
        config_ctx.insert("data_path".into(), path_value(&self.layout.data()));
        config_ctx.insert("plugin_path".into(), path_value(&self.layout.plugins()));
        config_ctx.insert("log_path".into(), path_value(&self.layout.log()));

        let unit_ctx: ConfigSnapshot = [
            ("venv_path", path_value(&self.layout.venv())),
            ("user", json!(BOT_USER)),
            ("group", json!(BOT_USER)),
            ("working_dir", path_value(&self.layout.base())),
            ("config_path", path_value(&self.layout.config_file())),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        let config_path = self.layout.config_file();
        let unit_path = self.layout.unit_file();
        let config_before = file_hash(&config_path)?;
        let unit_before = file_hash(&unit_path)?;

        let engine = self;
        let (config_ref, unit_ref) = (&config_ctx, &unit_ctx);
        let (config_target, unit_target) = (
            Target {
                template: CONFIG_TEMPLATE,
                path: &config_path,
                owner: BOT_USER,
                mode: 0o744,
            },
            Target {
                template: UNIT_TEMPLATE,
                path: &unit_path,
                owner: "root",
                mode: 0o644,
            },
        );
        self.guard()
            .scope(move || async move {
                engine.write_rendered(&config_target, config_ref).await?;
                engine.write_rendered(&unit_target, unit_ref).await
            })
            .await?;

        let config_changed = file_hash(&config_path)? != config_before;
        let unit_changed = file_hash(&unit_path)? != unit_before;
        if unit_changed {
            self.host.service.reload_units().await?;
        }
        if config_changed || unit_changed {
            tracing::info!("Rendered files changed, restarting {}", SERVICE_NAME);
            self.host.service.stop(SERVICE_NAME).await?;
            self.host.service.start(SERVICE_NAME).await?;
        }

        pass.set_flag(Flag::Available);
        Ok(())
    }

    /// Shared by every handler that affects plugin configuration; the
    /// first call in a pass renders, later calls do nothing.
    pub(crate) async fn render_plugin_config(&self, pass: &mut Pass<'_>) -> Result<()> {
        if !pass.scratch.claim(OncePerPass::RenderPluginConfig) {
            tracing::debug!("Plugin configuration already rendered in this pass");
            return Ok(());
        }

        let mut ctx = pass.config.snapshot()?;
        ctx.insert("webhooks_port".into(), json!(WEBHOOKS_PORT));

        let path = self.layout.plugins_config_file();
        let target = Target {
            template: PLUGINS_CONFIG_TEMPLATE,
            path: &path,
            owner: BOT_USER,
            mode: 0o744,
        };
        let engine = self;
        let (target_ref, ctx_ref) = (&target, &ctx);
        self.guard()
            .scope(move || async move { engine.write_rendered(target_ref, ctx_ref).await })
            .await
    }

    async fn write_rendered(&self, target: &Target<'_>, context: &ConfigSnapshot) -> Result<()> {
        let content = self.templates.render(target.template, context)?;

        if let Some(parent) = target.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(target.path, content)?;
        std::fs::set_permissions(target.path, std::fs::Permissions::from_mode(target.mode))?;
        self.host
            .accounts
            .chown_recursive(target.path, target.owner, target.owner)
            .await?;

        tracing::debug!("Rendered {} to {}", target.template, target.path.display());
        Ok(())
    }
}
