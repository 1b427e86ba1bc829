use clap::Parser;
use meshcall_relay::{OpenRooms, RelayService, StaticTokens, WS_PATH};
use std::net::SocketAddr;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Signaling relay for meshcall rooms.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Address to listen on.
    #[arg(long, env = "MESHCALL_RELAY_ADDR", default_value = "0.0.0.0:8080")]
    listen: SocketAddr,

    /// `room=token` pair; repeat or comma-separate. Without any, every
    /// non-empty token is accepted.
    #[arg(long = "room-token", env = "MESHCALL_ROOM_TOKENS", value_delimiter = ',')]
    room_tokens: Vec<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Логирование: RUST_LOG, по умолчанию info
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    // 2. Проверка токенов комнат
    let tokens = StaticTokens::parse(args.room_tokens.iter().map(String::as_str))?;
    let service = if tokens.is_empty() {
        info!("No room tokens configured; rooms are open");
        RelayService::new(OpenRooms)
    } else {
        RelayService::new(tokens)
    };

    // 3. Запуск слушателя
    let listener = tokio::net::TcpListener::bind(args.listen).await?;
    info!("Signaling relay listening on ws://{}{}", args.listen, WS_PATH);
    meshcall_relay::serve(listener, service).await?;
    Ok(())
}
