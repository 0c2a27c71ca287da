use crate::core::engine::{Pass, ReconcileEngine};
use crate::domain::layout::WEBHOOKS_PORT;
use crate::domain::model::{Flag, NagiosCheck, RelationKind};
use crate::utils::error::Result;

pub const CHECK_PROCS: &str = "/usr/lib/nagios/plugins/check_procs";

/// At least one errbot process must be running.
pub fn errbot_procs_check(context: &str, unit: &str) -> NagiosCheck {
    NagiosCheck {
        name: "check_errbot_procs".to_string(),
        description: "Verify at least one errbot process is running".to_string(),
        command: vec![
            CHECK_PROCS.to_string(),
            "-c".to_string(),
            "1:".to_string(),
            "-a".to_string(),
            "bin/errbot".to_string(),
        ],
        context: context.to_string(),
        unit: unit.to_string(),
    }
}

impl ReconcileEngine {
    pub(crate) async fn setup_nagios(
        &self,
        relation: RelationKind,
        pass: &mut Pass<'_>,
    ) -> Result<()> {
        self.maintenance("Creating Nagios check").await?;
        let check = errbot_procs_check(&pass.config.nagios_context, &self.host.unit.unit_name());
        self.host.relations.add_nagios_check(relation, &check).await
    }

    pub(crate) async fn configure_webserver(&self, pass: &mut Pass<'_>) -> Result<()> {
        self.render_plugin_config(pass).await?;

        if pass.config.enable_webhooks {
            tracing::info!("Opening webhooks port {}", WEBHOOKS_PORT);
            self.host.unit.open_port(WEBHOOKS_PORT).await?;
            pass.set_flag(Flag::WebhooksEnabled);
        } else {
            tracing::info!("Closing webhooks port {}", WEBHOOKS_PORT);
            self.host.unit.close_port(WEBHOOKS_PORT).await?;
            pass.clear_flag(Flag::WebhooksEnabled);
        }
        Ok(())
    }

    pub(crate) async fn announce_webhooks(&self) -> Result<()> {
        self.host.relations.configure_webhooks(WEBHOOKS_PORT).await
    }
}
