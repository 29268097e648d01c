pub mod capabilities;
pub mod detection;
pub mod detector;
pub mod frame;
pub mod latest;
pub mod lifecycle;
pub mod query;
pub mod queue;
pub mod sink;
pub mod source;
pub mod stats;
pub mod stub;

pub mod app;
pub mod config;

pub use app::{start_app, Capabilities};
