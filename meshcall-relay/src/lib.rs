mod auth;
mod relay;

pub use auth::{JoinError, OpenRooms, RoomAuthorizer, StaticTokens};
pub use relay::{RelayService, ws_handler};

use axum::Router;
use axum::routing::get;
use tokio::net::TcpListener;

pub const WS_PATH: &str = "/ws";

pub fn router(service: RelayService) -> Router {
    Router::new()
        .route(WS_PATH, get(ws_handler))
        .with_state(service)
}

pub async fn serve(listener: TcpListener, service: RelayService) -> std::io::Result<()> {
    axum::serve(listener, router(service)).await
}
