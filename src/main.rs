use std::net::SocketAddr;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use embedcord::api::{ApiError, HttpMessageApi};
use embedcord::cache::{AssetCacheWorker, CacheError, DiskCacheStorage, HttpNetwork, NetworkError};
use embedcord::chat::{ChatClient, ClientOptions};
use embedcord::config::{ChatConfig, ConfigError, ProxyConfig};
use embedcord::identity::acquire_username;
use embedcord::message::Group;
use embedcord::storage::{FileStore, StorageError};
use embedcord::{proxy, terminal};
use tokio::io::BufReader;

#[derive(Debug, thiserror::Error)]
enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error(transparent)]
    Network(#[from] NetworkError),
    #[error("io failed: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Parser, Debug)]
#[command(name = "embedcord", about = "EmbedCord chat client and asset caching proxy")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Chat from the terminal.
    Chat {
        #[arg(long, env = "EMBEDCORD_GROUP", default_value_t = Group::General)]
        group: Group,
    },
    /// Serve the web client through the asset cache.
    Proxy {
        #[arg(long)]
        port: Option<u16>,
    },
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Chat { group } => run_chat(group).await,
        Command::Proxy { port } => run_proxy(port).await,
    };
    if let Err(e) = result {
        tracing::error!(error = %e, "embedcord failed");
        std::process::exit(1);
    }
}

async fn run_chat(group: Group) -> Result<(), AppError> {
    let config = ChatConfig::from_env()?;
    let store = FileStore::open(config.state_path.clone())?;
    let username = acquire_username(&store)?;
    let api = Arc::new(HttpMessageApi::new(&config.base_url, config.request_timeout)?);
    tracing::info!(%username, base_url = %config.base_url, "starting chat");

    let options = ClientOptions { poll_interval: config.poll_interval, ..ClientOptions::default() };
    let client = ChatClient::start(api, username, group, options);
    let session = terminal::run_session(&client, BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await;
    client.shutdown().await;
    session?;
    Ok(())
}

async fn run_proxy(port: Option<u16>) -> Result<(), AppError> {
    let config = ProxyConfig::from_env()?;
    let port = port.unwrap_or(config.port);

    let storage = Arc::new(DiskCacheStorage::new(config.cache_dir.clone()));
    let network = Arc::new(HttpNetwork::new(&config.upstream, config.request_timeout)?);
    let worker = Arc::new(AssetCacheWorker::new(config.cache_version.clone(), storage, network));
    worker.start().await?;

    let app = proxy::app(Arc::clone(&worker), config.upstream.clone());
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}")).await?;
    tracing::info!(%port, upstream = %config.upstream, cache = %config.cache_version, "proxy listening");
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>()).await?;
    Ok(())
}
