//! HTTP router and serving loop

use axum::{routing::get, Router};
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::{
    catch_panic::CatchPanicLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};

use crate::{
    client::{HEALTH_PATH, READINESS_PATH},
    error::ServeError,
    health,
    service::Service,
};

/// Build the router exposing `/healthz` and `/readiness` for `service`
pub fn router(service: Service) -> Router {
    let catch_panic = service.config().middleware.catch_panic;

    // Layers are applied in reverse order (last added is outermost)
    let app = Router::new()
        .route(HEALTH_PATH, get(health::healthz))
        .route(READINESS_PATH, get(health::readiness))
        .with_state(service)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new())
                .on_response(DefaultOnResponse::new()),
        )
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

    if catch_panic {
        app.layer(CatchPanicLayer::new())
    } else {
        app
    }
}

/// Bind and serve until shutdown is requested
///
/// Every way out of here is latched by the caller as the fatal state.
pub(crate) async fn serve(service: Service) -> Result<(), ServeError> {
    let addr = service.config().service.bind_addr();

    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|err| ServeError::Bind {
            addr: addr.clone(),
            message: err.to_string(),
        })?;
    let local_addr = listener.local_addr().map_err(|err| ServeError::Bind {
        addr: addr.clone(),
        message: err.to_string(),
    })?;
    service.mark_bound(local_addr);

    tracing::info!("Server listening on {}", local_addr);

    let shutdown = service.shutdown_token();
    axum::serve(listener, router(service))
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .map_err(|err| ServeError::Serve(err.to_string()))?;

    tracing::info!("Server shutdown complete");

    Ok(())
}

/// Wait for shutdown signal (SIGTERM or SIGINT)
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", err);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                tracing::error!("Failed to install SIGTERM handler: {}", err);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl+C), starting graceful shutdown");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
