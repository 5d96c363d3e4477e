use reusevalue::ReuseValueProvider;
use tfplug::ServerConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let config = ServerConfig::from_env();

    // stdout carries the plugin handshake, so logs go to stderr
    if config.enable_logging {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_max_level(tracing::Level::from(config.log_level))
            .init();
    }

    let provider = ReuseValueProvider::new(env!("CARGO_PKG_VERSION"));
    tfplug::serve(provider, config).await?;

    Ok(())
}
