mod common;

use common::{config_with_version, Harness};
use errbot_charm::domain::layout::WEBHOOKS_PORT;
use errbot_charm::domain::model::RelationKind;
use errbot_charm::{Handler, Status, StateRecord};
use std::collections::BTreeSet;

fn webhooks_relation() -> BTreeSet<RelationKind> {
    [RelationKind::Webhooks].into_iter().collect()
}

#[tokio::test]
async fn test_enable_then_disable_webhooks() {
    let h = Harness::new();
    let mut config = config_with_version("6.1.9");
    config.enable_webhooks = true;

    let enabled = h
        .engine
        .run_pass(&config, StateRecord::default(), webhooks_relation())
        .await
        .unwrap();

    assert_eq!(enabled.status, Status::WebhooksEnabled);
    assert!(enabled.handlers.contains(&Handler::AnnounceWebhooks));
    assert!(h.fake.open_ports.lock().unwrap().contains(&WEBHOOKS_PORT));
    assert_eq!(*h.fake.webhook_announcements.lock().unwrap(), vec![WEBHOOKS_PORT]);
    let rendered = std::fs::read_to_string(h.layout().plugins_config_file()).unwrap();
    assert!(rendered.contains("if True:"));
    assert!(rendered.contains("'PORT': 8080"));

    config.enable_webhooks = false;
    let disabled = h
        .engine
        .run_pass(&config, enabled.record, webhooks_relation())
        .await
        .unwrap();

    assert_eq!(disabled.status, Status::Available);
    assert!(disabled.handlers.contains(&Handler::ConfigureWebserver));
    assert!(disabled.handlers.contains(&Handler::ReconcilePlugins));
    assert!(!disabled.handlers.contains(&Handler::AnnounceWebhooks));
    assert!(h.fake.open_ports.lock().unwrap().is_empty());
    let rendered = std::fs::read_to_string(h.layout().plugins_config_file()).unwrap();
    assert!(rendered.contains("if False:"));
}

#[tokio::test]
async fn test_no_announcement_without_relation() {
    let h = Harness::new();
    let mut config = config_with_version("6.1.9");
    config.enable_webhooks = true;

    let report = h
        .engine
        .run_pass(&config, StateRecord::default(), BTreeSet::new())
        .await
        .unwrap();

    assert_eq!(report.status, Status::WebhooksEnabled);
    assert!(!report.handlers.contains(&Handler::AnnounceWebhooks));
    assert!(h.fake.webhook_announcements.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_webhooks_wait_for_available() {
    let h = Harness::new();
    let mut config = config_with_version("");
    config.enable_webhooks = true;

    let report = h
        .engine
        .run_pass(&config, StateRecord::default(), webhooks_relation())
        .await
        .unwrap();

    assert_eq!(report.handlers, vec![Handler::InstallBot]);
    assert!(h.fake.open_ports.lock().unwrap().is_empty());
}
