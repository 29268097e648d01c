use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(deserialize_with = "deserialize_log_level")]
    pub log_level: LogLevel,
    pub source: SourceConfig,
    pub pipeline: PipelineConfig,
    pub persistence: PersistenceConfig,
    pub query: QueryConfig,
}

fn deserialize_log_level<'de, D>(deserializer: D) -> Result<LogLevel, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    s.try_into().map_err(serde::de::Error::custom)
}

#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    pub url: String,
    #[serde(default = "default_capture_fps")]
    pub capture_fps: u64,
    #[serde(default = "default_connect_attempts")]
    pub connect_attempts: u32,
    #[serde(default = "default_connect_backoff_secs")]
    pub connect_backoff_secs: u64,
    #[serde(default = "default_read_retry_ms")]
    pub read_retry_ms: u64,
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl SourceConfig {
    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(fps_to_delay_ms(self.capture_fps))
    }

    pub fn connect_backoff(&self) -> Duration {
        Duration::from_secs(self.connect_backoff_secs)
    }

    pub fn read_retry(&self) -> Duration {
        Duration::from_millis(self.read_retry_ms)
    }
}

fn default_capture_fps() -> u64 {
    30
}

fn default_connect_attempts() -> u32 {
    3
}

fn default_connect_backoff_secs() -> u64 {
    2
}

fn default_read_retry_ms() -> u64 {
    100
}

fn default_queue_capacity() -> usize {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct PipelineConfig {
    #[serde(default = "default_detection_fps")]
    pub detection_fps: u64,
    #[serde(default = "default_sample_window")]
    pub sample_window: usize,
    #[serde(default = "default_status_interval_secs")]
    pub status_interval_secs: u64,
    #[serde(default = "default_shutdown_grace_secs")]
    pub shutdown_grace_secs: u64,
}

impl PipelineConfig {
    pub fn detection_interval(&self) -> Duration {
        Duration::from_millis(fps_to_delay_ms(self.detection_fps))
    }

    pub fn status_interval(&self) -> Duration {
        Duration::from_secs(self.status_interval_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

fn default_detection_fps() -> u64 {
    20
}

fn default_sample_window() -> usize {
    100
}

fn default_status_interval_secs() -> u64 {
    10
}

fn default_shutdown_grace_secs() -> u64 {
    2
}

#[derive(Debug, Deserialize, Clone)]
pub struct PersistenceConfig {
    #[serde(default = "default_persistence_workers")]
    pub workers: usize,
}

fn default_persistence_workers() -> usize {
    4
}

#[derive(Debug, Deserialize, Clone)]
pub struct QueryConfig {
    #[serde(default = "default_cooldown_secs")]
    pub cooldown_secs: f64,
    #[serde(default = "default_record_secs")]
    pub record_secs: u64,
}

impl QueryConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs_f64(self.cooldown_secs)
    }

    pub fn record_duration(&self) -> Duration {
        Duration::from_secs(self.record_secs)
    }
}

fn default_cooldown_secs() -> f64 {
    1.0
}

fn default_record_secs() -> u64 {
    5
}

fn fps_to_delay_ms(fps: u64) -> u64 {
    (1000.0 / fps as f64).round() as u64
}

#[derive(Debug, Deserialize, Clone)]
pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. Use either `local` or `production`.",
                other
            )),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub enum LogLevel {
    Debug,
    Info,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
        }
    }
}

impl TryFrom<String> for LogLevel {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            other => Err(format!(
                "{} is not a supported minimum log level. Use either `debug` or `info`.",
                other
            )),
        }
    }
}

pub fn get_configuration() -> Result<Config, config::ConfigError> {
    let base_path = std::env::current_dir().expect("Failed to determine the current directory");
    let configuration_directory = base_path.join("configuration");

    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .expect("Failed to parse APP_ENVIRONMENT");

    let config = config::Config::builder()
        .add_source(config::File::from(
            configuration_directory.join("base.yaml"),
        ))
        .add_source(config::File::from(
            configuration_directory.join(format!("{}.yaml", environment.as_str())),
        ))
        .add_source(
            config::Environment::with_prefix("SV")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    let config: Config = config.try_deserialize::<Config>()?;

    Ok(config)
}
