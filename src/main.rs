use scout_vision::stub::{
    LogDisplay, NullAnswerer, NullDetector, NullInput, NullStore, NullTranscriber, SilentSpeech,
    SyntheticSource,
};
use scout_vision::{config, start_app, Capabilities};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = config::get_configuration().expect("failed to load config");
    let log_level = config.log_level.as_str();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with(tracing_subscriber::fmt::layer().json().with_level(true))
        .init();

    // Stub backends; real device, model, and service integrations plug in
    // through the same trait seams.
    let capabilities = Capabilities {
        source: Box::new(SyntheticSource::new(640, 480)),
        detector: Arc::new(NullDetector),
        speech: Arc::new(SilentSpeech),
        transcriber: Arc::new(NullTranscriber),
        store: Arc::new(NullStore),
        answerer: Arc::new(NullAnswerer),
        display: Box::new(LogDisplay::new()),
        input: Box::new(NullInput),
    };

    start_app(config, capabilities).await?;

    Ok(())
}
