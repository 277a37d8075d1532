use docuseek::{api, config, logging, processing};
use std::net::Ipv4Addr;
use std::sync::Arc;
use tokio::net::TcpListener;

const FALLBACK_PORTS: std::ops::RangeInclusive<u16> = 4600..=4699;

#[tokio::main]
async fn main() {
    config::init_config();
    logging::init_tracing();

    let service = Arc::new(processing::ProcessingService::new());
    let app = api::create_router(service);

    let (listener, port) = bind_listener().await.expect("Failed to bind listener");
    tracing::info!(port, "Docuseek listening");
    axum::serve(listener, app)
        .await
        .expect("HTTP server terminated unexpectedly");
}

async fn bind_listener() -> Result<(TcpListener, u16), std::io::Error> {
    if let Some(port) = config::get_config().server_port {
        let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).await?;
        return Ok((listener, port));
    }

    for port in FALLBACK_PORTS {
        match TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).await {
            Ok(listener) => return Ok((listener, port)),
            Err(err) if err.kind() == std::io::ErrorKind::AddrInUse => {
                tracing::debug!(port, "Port already in use; trying next");
            }
            Err(err) => return Err(err),
        }
    }

    Err(std::io::Error::new(
        std::io::ErrorKind::AddrNotAvailable,
        "No free port in the fallback range",
    ))
}
