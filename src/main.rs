use std::env;

use mango_datasource::{api::gateway, config::ServerConfig, logging};
use tracing::error;

#[tokio::main]
async fn main() {
    let json_logs = env::var("LOG_FORMAT").map(|f| f == "json").unwrap_or(false);
    logging::init_logger(json_logs);

    let config = ServerConfig::from_env();

    if let Err(e) = gateway::start_gateway(config).await {
        error!("Gateway stopped: {}", e);
        std::process::exit(1);
    }
}
