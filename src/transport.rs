use std::net::SocketAddr;

use anyhow::Result;
use rmcp::{
    transport::{
        stdio,
        streamable_http_server::{session::local::LocalSessionManager, StreamableHttpService},
    },
    ServiceExt,
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::calculator::CalculatorService;

/// 標準入出力でMCPサーバを起動し、クライアントが切断するまで待つ
pub async fn serve_stdio() -> Result<()> {
    tracing::info!("stdio トランスポートで起動します");

    let service = CalculatorService::new()
        .serve(stdio())
        .await
        .inspect_err(|e| tracing::error!("サーバの起動に失敗: {:?}", e))?;
    let reason = service.waiting().await?;

    tracing::info!(?reason, "stdio トランスポートを終了しました");
    Ok(())
}

/// Streamable HTTP で `/mcp` にMCPサーバを公開する。Ctrl-C で停止する。
pub async fn serve_http(bind: SocketAddr) -> Result<()> {
    let listener = TcpListener::bind(bind).await?;

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("シグナルの待機に失敗: {}", e);
            }
            shutdown.cancel();
        }
    });

    serve_http_on(listener, shutdown).await
}

/// バインド済みのリスナーで `/mcp` を提供し、`shutdown` がキャンセルされたら
/// 処理中の接続を終えてから戻る。
pub async fn serve_http_on(listener: TcpListener, shutdown: CancellationToken) -> Result<()> {
    let service = StreamableHttpService::new(
        || Ok(CalculatorService::new()),
        LocalSessionManager::default().into(),
        Default::default(),
    );
    let router = axum::Router::new().nest_service("/mcp", service);

    tracing::info!("HTTP トランスポートで起動します: http://{}/mcp", listener.local_addr()?);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await?;

    tracing::info!("HTTP トランスポートを終了しました");
    Ok(())
}
