use serde::Deserialize;
use server::ServerState;
use std::{
    net::{IpAddr, SocketAddr},
    path::PathBuf,
    sync::Arc,
    time::Duration,
};
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use yestochi_common::snowflake::{NodeId, SnowflakePartOutOfRangeError};
use yestochi_db::{
    client::{DbClient, DbError},
    kv::{FileStore, KeyValueStore, MemoryStore},
};

mod server;

#[derive(Debug, Error)]
enum InitError {
    #[error("Error parsing .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),
    #[error("Error parsing environment: {0}")]
    Envy(#[from] envy::Error),
    #[error("Invalid NODE_ID: {0}")]
    NodeId(#[from] SnowflakePartOutOfRangeError<u16>),
    #[error("Error opening data directory: {0}")]
    DataDir(std::io::Error),
    #[error("Error seeding store: {0}")]
    Initialize(#[from] DbError),
    #[error("Error binding tcp listener: {0}")]
    TcpBind(std::io::Error),
    #[error("Error serving server: {0}")]
    TcpServe(std::io::Error),
}

fn default_simulated_latency_ms() -> u64 {
    200
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
struct Env {
    server_address: IpAddr,
    server_port: u16,
    /// Keeps everything in memory when unset.
    data_dir: Option<PathBuf>,
    #[serde(default = "default_simulated_latency_ms")]
    simulated_latency_ms: u64,
    #[serde(default)]
    node_id: u16,
}

fn install_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "yestochi_api=debug,yestochi_db=debug,tower_http=debug,axum::rejection=trace"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn get_env() -> Result<Env, InitError> {
    if let Err(e) = dotenvy::dotenv() {
        if e.not_found() {
            debug!("No .dotenv file found");
        } else {
            return Err(e.into());
        }
    }

    envy::from_env().map_err(InitError::from)
}

fn open_store(data_dir: Option<PathBuf>) -> Result<Arc<dyn KeyValueStore>, InitError> {
    match data_dir {
        Some(dir) => {
            let store = FileStore::open(dir).map_err(InitError::DataDir)?;
            info!(dir = %store.dir().display(), "Persisting data to disk");
            Ok(Arc::new(store))
        }
        None => {
            info!("No DATA_DIR set, keeping data in memory");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "Could not listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}

#[tokio::main]
async fn main() -> Result<(), InitError> {
    install_tracing();
    let env = get_env()?;

    let store = open_store(env.data_dir)?;
    let db_client = DbClient::new(store, NodeId::try_from(env.node_id)?)
        .with_latency(Duration::from_millis(env.simulated_latency_ms));
    db_client.initialize().await?;

    let state = ServerState {
        db_client: Arc::new(db_client),
    };

    let tracing_layer = TraceLayer::new_for_http();
    let app = server::routes().with_state(state).layer(tracing_layer);

    let server_address = SocketAddr::new(env.server_address, env.server_port);
    let listener = tokio::net::TcpListener::bind(server_address)
        .await
        .map_err(InitError::TcpBind)?;
    info!(%server_address, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(InitError::TcpServe)?;

    Ok(())
}
