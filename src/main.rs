use clap::Parser;
use errbot_charm::config::cli::{Command, PassArgs};
use errbot_charm::utils::error::ErrorSeverity;
use errbot_charm::utils::{logger, procs, validation::Validate};
use errbot_charm::{CharmConfig, CliConfig, Host, Layout, ReconcileEngine, StateRecord, Templates};
use std::collections::BTreeSet;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }
    tracing::debug!("CLI config: {:?}", cli);

    match cli.command {
        Command::Reconcile(args) => reconcile(args).await,
        Command::Plan(args) => plan(args),
        Command::Status { state } => {
            let record = StateRecord::load(&state)?;
            let procs = procs::count_processes("bin/errbot");
            println!("status: {}", record.status);
            match record.last_pass_at {
                Some(at) => println!("last pass: {}", at.to_rfc3339()),
                None => println!("last pass: never"),
            }
            println!(
                "errbot processes: {} ({}MB resident)",
                procs.matching, procs.total_memory_mb
            );
            Ok(())
        }
    }
}

fn load_config(args: &PassArgs) -> CharmConfig {
    tracing::info!("📁 Loading configuration from: {}", args.config.display());
    let config = match CharmConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config.display(), e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    config
}

fn engine_for(args: &PassArgs) -> ReconcileEngine {
    let layout = Layout::under(&args.root);
    if layout.is_relocated() {
        tracing::info!("Layout relocated under {}", args.root.display());
    }
    let templates = match &args.templates {
        Some(dir) => Templates::with_overrides(dir),
        None => Templates::embedded(),
    };
    let host = Host::system(&layout);
    ReconcileEngine::new(host, layout, templates)
}

fn plan(args: PassArgs) -> anyhow::Result<()> {
    let config = load_config(&args);
    let record = StateRecord::load(&args.state)?;
    let relations: BTreeSet<_> = args.relations.iter().copied().collect();

    tracing::info!("🔍 DRY RUN MODE - No actual changes will be made");
    let handlers = engine_for(&args).plan(&config, &record, &relations)?;
    println!("status: {}", record.status);
    if handlers.is_empty() {
        println!("nothing to do");
    }
    for handler in handlers {
        println!("would run: {}", handler);
    }
    Ok(())
}

async fn reconcile(args: PassArgs) -> anyhow::Result<()> {
    let config = load_config(&args);
    let previous = StateRecord::load(&args.state)?;
    let relations = args.relations.iter().copied().collect();
    let engine = engine_for(&args);

    tracing::info!("🚀 Starting reconciliation pass (status: {})", previous.status);

    match engine.run_pass(&config, previous, relations).await {
        Ok(report) => {
            report.record.save(&args.state)?;
            let ran: Vec<String> = report.handlers.iter().map(|h| h.to_string()).collect();
            tracing::info!(
                "✅ Pass complete: status {}, handlers [{}]",
                report.status,
                ran.join(", ")
            );
            Ok(())
        }
        Err(e) => {
            // 記錄詳細錯誤信息 (the previous state record is left as it was)
            tracing::error!(
                "❌ Reconciliation failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());

            // 根據錯誤嚴重程度決定退出碼
            let exit_code = match e.severity() {
                ErrorSeverity::Low => 0,
                ErrorSeverity::Medium => 2,
                ErrorSeverity::High => 1,
                ErrorSeverity::Critical => 3,
            };
            if exit_code > 0 {
                std::process::exit(exit_code);
            }
            Ok(())
        }
    }
}
