mod common;

use common::{config_with_version, Harness};
use errbot_charm::domain::model::{RelationKind, WorkloadState};
use errbot_charm::{CharmError, Handler, Status, StateRecord};
use std::collections::BTreeSet;
use std::ffi::OsStr;
use std::os::unix::ffi::OsStrExt;

#[tokio::test]
async fn test_first_pass_reaches_available() {
    let h = Harness::new();
    let config = config_with_version("6.1.9");

    let report = h
        .engine
        .run_pass(&config, StateRecord::default(), BTreeSet::new())
        .await
        .unwrap();

    assert_eq!(report.status, Status::Available);
    assert_eq!(
        report.handlers,
        vec![
            Handler::InstallBot,
            Handler::RenderConfig,
            Handler::ConfigureWebserver,
            Handler::ConfigurePluginRepos,
            Handler::ConfigurePluginsConfig,
            Handler::ReconcilePlugins,
        ]
    );

    // venv bootstrap, then the bot itself with the irc backend
    let pip = h.fake.pip_installs.lock().unwrap().clone();
    assert_eq!(pip[0], vec!["six".to_string()]);
    assert_eq!(pip[1], vec!["errbot==6.1.9".to_string(), "irc".to_string()]);
    assert!(h.fake.installed_apt.lock().unwrap().contains("python3-venv"));

    let stale = h.layout().venv_wheels().join("six-1.5.2-py2.py3-none-any.whl");
    assert!(!stale.exists());

    assert!(h.layout().config_file().exists());
    assert!(h.layout().unit_file().exists());
    assert!(h.layout().plugins_config_file().exists());
    assert!(h.fake.ran_program("bin/errbot"));
    assert!(*h.fake.service_running.lock().unwrap());
    assert_eq!(
        h.fake.last_status(),
        Some((WorkloadState::Active, "Ready".to_string()))
    );
    assert!(report.record.previous_config.is_some());
    assert!(report.record.last_pass_at.is_some());
}

#[tokio::test]
async fn test_rendered_config_points_at_layout() {
    let h = Harness::new();
    let config = config_with_version("6.1.9");
    h.engine
        .run_pass(&config, StateRecord::default(), BTreeSet::new())
        .await
        .unwrap();

    let rendered = std::fs::read_to_string(h.layout().config_file()).unwrap();
    assert!(rendered.contains("BACKEND = 'irc'"));
    assert!(rendered.contains(&format!("BOT_DATA_DIR = '{}'", h.layout().data().display())));

    let unit = std::fs::read_to_string(h.layout().unit_file()).unwrap();
    assert!(unit.contains("User=errbot"));
    assert!(unit.contains(&format!("--config {}", h.layout().config_file().display())));

    let calls = h.fake.service_calls.lock().unwrap().clone();
    assert!(calls.contains(&"daemon-reload".to_string()));
}

#[tokio::test]
async fn test_ownership_after_pass() {
    let h = Harness::new();
    let config = config_with_version("6.1.9");
    h.engine
        .run_pass(&config, StateRecord::default(), BTreeSet::new())
        .await
        .unwrap();

    let layout = h.layout();
    let owned_by = |user: &str| Some((user.to_string(), user.to_string()));
    assert_eq!(h.fake.owner_of(&layout.data()), owned_by("errbot"));
    assert_eq!(h.fake.owner_of(&layout.log()), owned_by("errbot"));
    assert_eq!(h.fake.owner_of(&layout.venv()), owned_by("ubunet"));
    // etc/ is re-owned recursively after rendering
    assert_eq!(h.fake.owner_of(&layout.config_file()), owned_by("ubunet"));
    assert_eq!(h.fake.owner_of(&layout.unit_file()), owned_by("root"));
    // files created inside guarded steps are picked up by the closing pass
    assert_eq!(h.fake.owner_of(&layout.errbot()), owned_by("ubunet"));
    assert_eq!(h.fake.owner_of(&layout.pip()), owned_by("ubunet"));
    assert_eq!(h.fake.owner_of(&layout.plugins_config_file()), owned_by("ubunet"));

    let users = h.fake.users.lock().unwrap().clone();
    assert!(users.contains("errbot") && users.contains("ubunet"));
    for entry in layout.ownership() {
        assert!(entry.path.is_dir(), "{} missing", entry.path.display());
    }
}

#[tokio::test]
async fn test_second_pass_is_quiet() {
    let h = Harness::new();
    let config = config_with_version("6.1.9");
    let first = h
        .engine
        .run_pass(&config, StateRecord::default(), BTreeSet::new())
        .await
        .unwrap();
    let restarts_before = h.fake.service_calls.lock().unwrap().len();

    let second = h
        .engine
        .run_pass(&config, first.record, BTreeSet::new())
        .await
        .unwrap();

    assert_eq!(second.handlers, vec![Handler::RenderConfig]);
    assert_eq!(second.status, Status::Available);
    assert_eq!(h.fake.service_calls.lock().unwrap().len(), restarts_before);
}

#[tokio::test]
async fn test_install_skips_pip_when_version_matches() {
    let h = Harness::new();
    let config = config_with_version("6.1.9");
    h.engine
        .run_pass(&config, StateRecord::default(), BTreeSet::new())
        .await
        .unwrap();
    let installs = h.fake.pip_installs.lock().unwrap().len();

    // a fresh record re-triggers the install handler
    let report = h
        .engine
        .run_pass(&config, StateRecord::default(), BTreeSet::new())
        .await
        .unwrap();

    assert_eq!(report.handlers[0], Handler::InstallBot);
    assert_eq!(h.fake.pip_installs.lock().unwrap().len(), installs);
    assert_eq!(h.fake.venvs.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn test_version_change_upgrades() {
    let h = Harness::new();
    let first = h
        .engine
        .run_pass(&config_with_version("6.1.8"), StateRecord::default(), BTreeSet::new())
        .await
        .unwrap();

    let report = h
        .engine
        .run_pass(&config_with_version("6.1.9"), first.record, BTreeSet::new())
        .await
        .unwrap();

    assert_eq!(report.handlers, vec![Handler::InstallBot, Handler::RenderConfig]);
    let last = h.fake.pip_installs.lock().unwrap().last().cloned().unwrap();
    assert_eq!(last[0], "errbot==6.1.9");
    assert_eq!(h.fake.errbot_version.lock().unwrap().as_deref(), Some("6.1.9"));
}

#[tokio::test]
async fn test_missing_version_blocks() {
    let h = Harness::new();
    let config = config_with_version("");

    let report = h
        .engine
        .run_pass(&config, StateRecord::default(), BTreeSet::new())
        .await
        .unwrap();

    assert_eq!(report.handlers, vec![Handler::InstallBot]);
    assert_eq!(report.status, Status::NotInstalled);
    assert_eq!(h.fake.pip_installs.lock().unwrap().len(), 1);
    assert_eq!(
        h.fake.last_status(),
        Some((
            WorkloadState::Blocked,
            "Waiting for version to be configured".to_string()
        ))
    );
}

#[tokio::test]
async fn test_xmpp_backend_uses_system_site_packages() {
    let h = Harness::new();
    let mut config = config_with_version("6.1.9");
    config.backend = "XMPP".to_string();

    h.engine
        .run_pass(&config, StateRecord::default(), BTreeSet::new())
        .await
        .unwrap();

    let venvs = h.fake.venvs.lock().unwrap().clone();
    assert_eq!(venvs.len(), 2);
    assert!(venvs[1].1);
    assert!(h.fake.installed_apt.lock().unwrap().contains("python3-sleekxmpp"));
    let last = h.fake.pip_installs.lock().unwrap().last().cloned().unwrap();
    assert_eq!(last, vec!["errbot==6.1.9".to_string()]);
}

#[tokio::test]
async fn test_failed_pass_leaves_previous_record_usable() {
    let h = Harness::new();
    let mut config = config_with_version("6.1.9");
    config.wheels_repo = "https://example.org/wheels".to_string();
    config.wheels_repo_type = "bogus".to_string();

    let previous = StateRecord::default();
    let err = h
        .engine
        .run_pass(&config, previous.clone(), BTreeSet::new())
        .await
        .unwrap_err();
    assert!(matches!(err, CharmError::ConfigError { .. }));
    assert!(err.to_string().contains("Unknown wheels_repo_type: bogus"));

    // the caller retries from the record it still holds
    config.wheels_repo_type = "https".to_string();
    let report = h
        .engine
        .run_pass(&config, previous, BTreeSet::new())
        .await
        .unwrap();
    assert_eq!(report.handlers[0], Handler::InstallBot);
    assert_eq!(report.status, Status::Available);
}

#[tokio::test]
async fn test_ownership_failure_aborts_pass() {
    let h = Harness::new();
    let first = h
        .engine
        .run_pass(&config_with_version("6.1.8"), StateRecord::default(), BTreeSet::new())
        .await
        .unwrap();
    let pip_before = h.fake.pip_installs.lock().unwrap().len();
    let service_before = h.fake.service_calls.lock().unwrap().len();

    *h.fake.fail_chown.lock().unwrap() = true;
    let config = config_with_version("6.1.9");
    let err = h
        .engine
        .run_pass(&config, first.record.clone(), BTreeSet::new())
        .await
        .unwrap_err();

    assert!(matches!(err, CharmError::ProvisioningError { .. }));
    assert_eq!(h.fake.pip_installs.lock().unwrap().len(), pip_before);
    assert_eq!(h.fake.service_calls.lock().unwrap().len(), service_before);
    assert_eq!(h.fake.errbot_version.lock().unwrap().as_deref(), Some("6.1.8"));

    // the record the caller kept still asks for the same work
    assert_eq!(first.record.status, Status::Available);
    let plan = h
        .engine
        .plan(&config, &first.record, &BTreeSet::new())
        .unwrap();
    assert_eq!(plan, vec![Handler::InstallBot, Handler::RenderConfig]);
}

#[tokio::test]
async fn test_non_utf8_root_still_renders() {
    let h = Harness::with_root_name(OsStr::from_bytes(b"root-\xff"));
    let config = config_with_version("6.1.9");

    let report = h
        .engine
        .run_pass(&config, StateRecord::default(), BTreeSet::new())
        .await
        .unwrap();

    assert_eq!(report.status, Status::Available);
    let rendered = std::fs::read_to_string(h.layout().config_file()).unwrap();
    assert!(rendered.contains("root-\u{FFFD}"));
}

#[tokio::test]
async fn test_record_survives_save_and_load() {
    let h = Harness::new();
    let config = config_with_version("6.1.9");
    let report = h
        .engine
        .run_pass(&config, StateRecord::default(), BTreeSet::new())
        .await
        .unwrap();

    let state_path = h.root.path().join("state").join("state.json");
    report.record.save(&state_path).unwrap();
    let loaded = StateRecord::load(&state_path).unwrap();
    assert_eq!(loaded, report.record);

    let plan = h.engine.plan(&config, &loaded, &BTreeSet::new()).unwrap();
    assert_eq!(plan, vec![Handler::RenderConfig]);
}

#[tokio::test]
async fn test_monitoring_relations_add_checks() {
    let h = Harness::new();
    let mut config = config_with_version("6.1.9");
    config.nagios_context = "prod".to_string();
    let relations: BTreeSet<_> = [RelationKind::LocalMonitors, RelationKind::NrpeExternalMaster]
        .into_iter()
        .collect();

    let report = h
        .engine
        .run_pass(&config, StateRecord::default(), relations)
        .await
        .unwrap();

    assert!(report.handlers.contains(&Handler::LocalMonitors));
    assert!(report.handlers.contains(&Handler::NrpeExternalMaster));
    let checks = h.fake.nagios_checks.lock().unwrap().clone();
    assert_eq!(checks.len(), 2);
    assert_eq!(checks[0].0, RelationKind::LocalMonitors);
    assert_eq!(checks[0].1.name, "check_errbot_procs");
    assert_eq!(checks[0].1.context, "prod");
    assert_eq!(checks[1].1.unit, "errbot/0");
}
