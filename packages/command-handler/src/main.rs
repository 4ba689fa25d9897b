use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use match_core::config::AppConfig;
use serde_json::Value;
use tracing::info;

mod commands;
mod handler;
use handler::CommandHandler;

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .without_time()
        .init();

    let config = AppConfig::from_env()?;
    info!("Starting command handler with {:?} store", config.store_backend);

    let handler = CommandHandler::from_config(&config).await;

    run(service_fn(move |event: LambdaEvent<Value>| {
        let handler = handler.clone();
        async move { Ok::<Value, Error>(handler.handle_payload(event.payload).await) }
    }))
    .await
}
