use anyhow::Result;
use axum::{
    routing::{delete, get, post},
    Router,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

pub mod events;
pub mod handlers;
pub mod state;

pub use self::state::AppState;
use handlers::{
    air_quality, close_view, generate_vision, get_layer_info, get_markers, get_settings, get_temperature,
    hotspot_summary, list_trees, plant_tree, remove_tree, update_viewpoint, vision_events_stream,
    visualize,
};

// Create the main application router
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/api/trees", get(list_trees).post(plant_tree))
        .route("/api/trees/:id", delete(remove_tree))
        .route("/api/viewpoint", post(update_viewpoint).delete(close_view))
        .route("/api/markers", get(get_markers))
        .route("/api/temperature/:lat/:lon", get(get_temperature))
        .route("/api/visualize", post(visualize))
        .route("/api/generate-vision", post(generate_vision))
        .route("/api/air-quality", post(air_quality))
        .route("/api/layer-info", post(get_layer_info))
        .route("/api/hotspots/summary", post(hotspot_summary))
        .route("/api/settings", get(get_settings))
        .route("/api/events", get(vision_events_stream))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

pub async fn start_server(state: AppState, port: u16) -> Result<()> {
    let app = create_app(state);
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = TcpListener::bind(addr).await?;

    info!("HTTP server listening at http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}
