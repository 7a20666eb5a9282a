use std::net::SocketAddr;

use anyhow::Result;
use calc_server::transport;
use clap::{Parser, ValueEnum};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Transport {
    Stdio,
    Http,
}

/// 四則演算を提供するMCPサーバ
#[derive(Debug, Parser)]
#[command(name = "calc-server", version)]
struct Cli {
    /// 使用するトランスポート
    #[arg(long, value_enum, default_value_t = Transport::Stdio)]
    transport: Transport,

    /// HTTP トランスポートの待ち受けアドレス
    #[arg(long, default_value = "127.0.0.1:8000")]
    bind: SocketAddr,
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout は JSON-RPC 専用なのでログは stderr へ
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let cli = Cli::parse();

    match cli.transport {
        Transport::Stdio => transport::serve_stdio().await,
        Transport::Http => transport::serve_http(cli.bind).await,
    }
}
