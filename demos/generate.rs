use openpixels::{
    logger::{self, LogLevel, LoggerConfig},
    ClientConfig, Model, PixelsClient, RoutingConfig, SelectionStrategy, SubmissionRequest,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let dotenv_loaded = dotenv::dotenv().is_ok();
    logger::init_with_config(LoggerConfig::development().with_level(LogLevel::Info))?;
    if !dotenv_loaded {
        log::warn!("⚠️  No .env file found, using system environment variables");
    }

    let config = ClientConfig::from_env();
    logger::log_config_info(&config);

    let client = match PixelsClient::new(config) {
        Ok(client) => client,
        Err(e) => {
            log::error!("❌ {}", e);
            log::error!("Create a .env file with OPENPIXELS_API_KEY=your-api-key");
            return Err(e.into());
        }
    };

    let prompt = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "a cat".to_string());
    let request = SubmissionRequest::new(Model::FluxDev, prompt)
        .with_dimensions(512, 512)
        .with_routing(RoutingConfig::new().with_strategy(SelectionStrategy::Best));

    log::info!("🎨 Generating an image for \"{}\"", request.params.prompt);
    let outcome = client.run(&request).await?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);

    if let Some(timing) = client.job_timing(&outcome.id) {
        log::info!(
            "⏱️  Job {} took {}ms",
            outcome.id,
            timing.duration_ms().unwrap_or_default()
        );
    }
    client.close().await;

    Ok(())
}
