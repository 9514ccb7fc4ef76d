// Web Server - main.rs
// web-server/src/main.rs
mod api;
mod error;
mod middleware;
mod state;

use actix_web::{get, web, App, HttpResponse, HttpServer, Responder};
use farm_common::{setup_tracing, Config};
use state::AppState;

#[get("/")]
async fn index() -> impl Responder {
    HttpResponse::Ok().body("Lighter Farm API Server")
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Setup tracing
    setup_tracing();

    // Refuse to start without a usable secret
    let config = Config::from_env().map_err(|e| {
        tracing::error!("Invalid configuration: {}", e);
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e)
    })?;

    // Save address before moving config into shared state
    let server_addr = config.web_server_addr.clone();

    if config.auth.expose_issuer {
        tracing::warn!("Token issuance endpoint is exposed at POST /api/token");
    }
    tracing::info!("Starting Web Server on {}", server_addr);

    let state = web::Data::new(AppState::new(&config));

    // Start HTTP server
    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .service(index)
            .configure(|cfg| api::configure(cfg, &state))
    })
    .bind(&server_addr)?
    .run()
    .await
}
