use mock_server::{MockState, Profile, Session, Store, DEFAULT_API_KEY};
use tokio::net::TcpListener;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEMO_ACCESS_CODE: &str = "demo-access-code";

#[tokio::main]
async fn main() -> Result<(), std::io::Error> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let api_key = std::env::var("MOCK_API_KEY").unwrap_or_else(|_| DEFAULT_API_KEY.to_string());
    let demo = Session::new(Profile {
        first_name: Some("Demo".into()),
        last_name: Some("User".into()),
        email: Some("demo@example.com".into()),
        phone: Some("2135550100".into()),
        ..Profile::default()
    });
    let state = MockState::new(&api_key, Store::default().with_session(DEMO_ACCESS_CODE, demo));

    let addr = format!("127.0.0.1:{port}");
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(%addr, access_code = DEMO_ACCESS_CODE, "mock verification API listening");
    mock_server::run_with(listener, state).await
}
