//! Interactive storefront.
//!
//! Reads commands from standard input, one per line. Rendered views go to
//! standard output; logs go to standard error.

use anyhow::Context as _;
use std::sync::Arc;
use std::time::Duration;
use storefront::views::{Sink, StdoutSink, mount_all};
use storefront::{
    Command, Flow, Session, StorefrontEnvironment, StorefrontReducer, StorefrontState,
    StorefrontStore,
};
use storefront_api::{ApiConfig, CatalogApi, LarekClient};
use storefront_core::environment::SystemClock;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "storefront=info,storefront_runtime=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = ApiConfig::from_env().context("invalid API configuration")?;
    tracing::info!(api = %config.api_url, cdn = %config.cdn_url, "Starting storefront");

    let client = LarekClient::new(&config).context("failed to build HTTP client")?;
    let api: Arc<dyn CatalogApi> = Arc::new(client);
    let env = StorefrontEnvironment::new(Arc::clone(&api), Arc::new(SystemClock));
    let store = StorefrontStore::new(StorefrontState::new(), StorefrontReducer::new(), env);

    let sink: Arc<dyn Sink> = Arc::new(StdoutSink);
    mount_all(store.events(), &sink);

    let session = Session::new(store.clone(), api, Arc::clone(&sink))
        .with_timeout(config.timeout + Duration::from_secs(1));

    session.execute(Command::Reload).await?;
    sink.write("Введите help для списка команд");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let command = match line.parse::<Command>() {
            Ok(command) => command,
            Err(storefront::CommandError::Empty) => continue,
            Err(error) => {
                sink.write(&error.to_string());
                continue;
            },
        };

        if session.execute(command).await? == Flow::Quit {
            break;
        }
    }

    store
        .shutdown(Duration::from_secs(5))
        .await
        .context("pending requests did not finish")?;
    tracing::info!("Storefront closed");

    Ok(())
}
