use tower_http::trace::TraceLayer;
use url::Url;
use zapgate_kit::config::{ProcessorConfig, SessionConfig, ZapGateConfig};
use zapgate_kit::store::SqliteStore;
use zapgate_paywall::SqlitePaywallState;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let lnbits_url = std::env::var("LNBITS_URL")
        .expect("Please set `LNBITS_URL` in environment variables");
    let lnbits_url = Url::parse(&lnbits_url).expect("LNBITS_URL must be a valid URL");
    let api_key = std::env::var("INVOICE_READ_KEY")
        .expect("Please set `INVOICE_READ_KEY` in environment variables");
    let jwt_secret = std::env::var("JWT_SECRET")
        .expect("Please set `JWT_SECRET` in environment variables");
    let public_url = std::env::var("PUBLIC_URL")
        .expect("Please set `PUBLIC_URL` in environment variables");
    let public_url = Url::parse(&public_url).expect("PUBLIC_URL must be a valid URL");
    let database_path =
        std::env::var("DATABASE_PATH").unwrap_or_else(|_| "zapgate.db".to_string());

    let config = ZapGateConfig::builder()
        .processor(
            ProcessorConfig::builder()
                .base_url(lnbits_url)
                .api_key(api_key)
                .build(),
        )
        .public_url(public_url)
        .session(SessionConfig::builder().secret(jwt_secret).build())
        .build();

    let store = SqliteStore::open(&database_path)
        .await
        .expect("Failed to open database");
    store.migrate().await.expect("Failed to run migrations");
    tracing::info!("Using database at {}", database_path);

    let state = SqlitePaywallState::new(config, store);
    let app = zapgate_paywall::router(state).layer(TraceLayer::new_for_http());

    let port = std::env::var("PORT")
        .unwrap_or_else(|_| "3000".to_string())
        .parse::<u16>()
        .expect("PORT must be a valid u16 integer");
    let addr: std::net::SocketAddr = ([0, 0, 0, 0], port).into();

    tracing::info!("Starting server on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server running at http://{}", addr);
    axum::serve(listener, app).await.expect("Server failed");
}
