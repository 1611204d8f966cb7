use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use dotenvy::dotenv;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;

use atrium_server::clients::{DiscordRoleClient, HttpBlobStorage, HttpImageRenderer, StripeBilling};
use atrium_server::config::Config;
use atrium_server::routes::create_routes;
use atrium_server::services::{
    MembershipReconciler, ReservationService, TicketIssuer, TierService,
};
use atrium_server::state::AppState;
use atrium_server::store::{EntitlementStore, PgStore};

#[tokio::main]
async fn main() {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = Config::from_env();

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    tracing::info!("Successfully connected to database");

    sqlx::migrate!()
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    tracing::info!("Migrations run successfully");

    let store: Arc<dyn EntitlementStore> = Arc::new(PgStore::new(pool));
    let billing = Arc::new(StripeBilling::new(
        config.stripe_api_base.clone(),
        config.stripe_secret_key.clone(),
        config.external_timeout,
    ));
    let chat = Arc::new(DiscordRoleClient::new(
        config.discord_bot_token.clone(),
        config.discord_guild_id.clone(),
        config.external_timeout,
    ));
    let renderer = Arc::new(HttpImageRenderer::new(
        config.render_service_url.clone(),
        config.external_timeout,
    ));
    let storage = Arc::new(HttpBlobStorage::new(
        config.storage_upload_base.clone(),
        config.storage_public_base.clone(),
        config.external_timeout,
    ));

    let state = AppState {
        tiers: Arc::new(TierService::new(store.clone())),
        reconciler: Arc::new(MembershipReconciler::new(
            store.clone(),
            billing,
            chat,
        )),
        reservations: Arc::new(ReservationService::new(store.clone())),
        tickets: Arc::new(TicketIssuer::new(store.clone(), renderer, storage)),
    };

    let app: Router = create_routes(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("🚀 Server running at http://{}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .expect("Failed to bind address");

    axum::serve(listener, app).await.expect("Server failed");
}
