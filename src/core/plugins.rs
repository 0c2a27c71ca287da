use crate::core::engine::ReconcileEngine;
use crate::domain::layout::SERVICE_NAME;
use crate::domain::model::Invocation;
use crate::utils::error::Result;

impl ReconcileEngine {
    /// Replays the plugin configuration through `errbot --restore` with the
    /// bot stopped. A failed restore puts the previous data file back; the
    /// bot is started again either way.
    pub(crate) async fn reconcile_plugins(&self) -> Result<()> {
        self.maintenance("Installing/configuring plugins").await?;

        // keep the bot off the data file while it is rewritten
        self.host.service.stop(SERVICE_NAME).await?;

        let data_file = self.layout.data_file();
        let backup = self.layout.data_file_backup();
        if data_file.exists() {
            std::fs::rename(&data_file, &backup)?;
        }

        if let Err(e) = self.restore_plugins(&backup).await {
            tracing::error!("Error updating plugins: {}", e);
            if backup.exists() {
                tracing::warn!("Restoring previous data file from {}", backup.display());
                if let Err(e) = std::fs::rename(&backup, &data_file) {
                    tracing::error!("Could not restore {}: {}", data_file.display(), e);
                }
            }
        }

        self.host.service.start(SERVICE_NAME).await
    }

    async fn restore_plugins(&self, backup: &std::path::Path) -> Result<()> {
        let restore = Invocation::new(self.layout.errbot().display().to_string())
            .arg("--config")
            .arg(self.layout.config_file().display().to_string())
            .arg("--restore")
            .arg(self.layout.plugins_config_file().display().to_string())
            .env("ERRBOT_OLD_DATA_FILE", backup.display().to_string());

        let commands = self.host.commands.as_ref();
        let restore_ref = &restore;
        let output = self
            .guard()
            .scope(move || async move { commands.run(restore_ref).await })
            .await?;
        tracing::debug!("errbot --restore output: {}", output.trim());
        Ok(())
    }
}
