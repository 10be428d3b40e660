use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::RwLock;

use zkb2excel_core::channel::dial::{self, ChannelClient};
use zkb2excel_core::channel::host::ChannelHost;
use zkb2excel_core::channel::{ChannelRole, CHANNEL_HOST};
use zkb2excel_core::config::CoreConfig;
use zkb2excel_core::console::ConsoleLog;
use zkb2excel_core::ipc::IpcServer;
use zkb2excel_core::settings::{SettingsStore, SETTINGS_JSON_PATH};
use zkb2excel_core::shell::Shell;
use zkb2excel_core::supervisor::WorkerSupervisor;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    tracing::info!("zKillboard2Excel core starting");

    let cfg = CoreConfig::load();
    let role = cfg.channel_role();
    let app_root = cfg.app_root();
    tracing::info!("Channel role: {:?}, app root: {}", role, app_root.display());

    // settings.json은 시작 시 한 번만 읽는다 — 파싱 실패는 치명적
    let store = SettingsStore::new(SETTINGS_JSON_PATH);
    let initial = store.load()?;

    let console = Arc::new(ConsoleLog::new());
    let supervisor = Arc::new(RwLock::new(WorkerSupervisor::new(app_root)));

    let mut client = None;
    match role {
        ChannelRole::Host => {
            // 워커는 시작 후에 접속해 오므로 스폰 전에 미리 바인딩해 둔다
            let host = ChannelHost::new(supervisor.clone(), console.clone());
            let addr = cfg.channel_addr();
            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .with_context(|| format!("Failed to bind control channel on {}", addr))?;
            tracing::info!("Control channel listening on http://{}", addr);
            tokio::spawn(async move {
                if let Err(e) = axum::serve(listener, host.router()).await {
                    tracing::error!("Control channel server error: {}", e);
                }
            });

            // 스스로 종료한 워커를 주기적으로 정리
            let supervisor_monitor = supervisor.clone();
            tokio::spawn(async move {
                loop {
                    tokio::time::sleep(Duration::from_secs(2)).await;
                    let mut sup = supervisor_monitor.write().await;
                    sup.reap_exited();
                }
            });
        }
        ChannelRole::Dial => {
            let dialer = ChannelClient::new(CHANNEL_HOST, cfg.channel_port());
            dial::verify_link(&dialer, &console).await;
            dial::spawn_log_poller(dialer.clone(), console.clone());
            client = Some(dialer);
        }
    }

    // Graceful shutdown: Ctrl+C 시 워커를 정리하고 종료
    let supervisor_shutdown = supervisor.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Shutdown signal received, stopping worker");
        let mut sup = supervisor_shutdown.write().await;
        if let Err(e) = sup.stop().await {
            tracing::warn!("Failed to stop worker during shutdown: {}", e);
        }
        tracing::info!("Cleanup complete, exiting");
        std::process::exit(0);
    });

    let shell = Arc::new(Shell::new(
        role,
        store,
        console.clone(),
        supervisor.clone(),
        client,
        initial,
    ));

    let ipc_server = IpcServer::new(shell, &cfg.ipc_listen());
    ipc_server.start().await?;

    tracing::info!("Core shutting down");
    Ok(())
}
