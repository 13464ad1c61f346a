use std::sync::Arc;

use anyhow::Context;
use tokio_util::sync::CancellationToken;

use tgpurge_core::{audit::AuditLog, config::Config, orchestrator::Cleaner};
use tgpurge_http::BridgeClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tgpurge_core::logging::init("tgpurge")?;

    let cfg = Config::load().context("loading configuration")?;
    let client = BridgeClient::new(
        cfg.bridge_url.clone(),
        cfg.bridge_token.clone(),
        cfg.http_timeout,
    )
    .context("building bridge client")?;

    println!("Bridge: {}", cfg.bridge_url);
    if cfg.cleanup.dry_run {
        println!("Dry run: nothing will be deleted");
    }
    if let Some(path) = &cfg.audit_log_path {
        println!("Audit log: {}", path.display());
    }

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, stopping after the current call");
            on_interrupt.cancel();
        }
    });

    let cleaner = Cleaner::new(Arc::new(client), cfg.cleanup, cancel)
        .with_audit(cfg.audit_log_path.clone().map(AuditLog::new));

    let outcome = cleaner.execute(&cfg.selector).await;
    let report = outcome.report();
    println!(
        "Deleted {} message(s) and removed {} reaction(s) across {} chat(s).",
        report.deleted(),
        report.reactions_removed(),
        report.chats.len()
    );
    if let Some(diag) = outcome.diagnostic() {
        eprintln!("{diag}");
    }

    std::process::exit(outcome.exit_code());
}
