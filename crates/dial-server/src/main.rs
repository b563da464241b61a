use std::sync::Arc;

use dial_server::config::loader::load_config;
use dial_server::observability::init_tracing;
use dial_server::platform::NullPlatformLauncher;
use dial_server::ServerBuilder;

#[tokio::main]
async fn main() {
    let config = match load_config(std::env::args().nth(1).as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("config error: {err}");
            std::process::exit(1);
        }
    };

    init_tracing(&config.logging.level);

    let (server, _state) = ServerBuilder::new(config, Arc::new(NullPlatformLauncher)).build();

    if let Err(err) = server.run().await {
        tracing::error!(error = %err, "server exited with an error");
    }
}
