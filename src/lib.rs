pub mod api;
pub mod config;
pub mod dataset;
pub mod encoder;
pub mod error;
pub mod image;
pub mod model;
pub mod predictor;
pub mod service;
pub mod stats;
pub mod types;

pub use config::ServiceConfig;
pub use error::{ApiError, LoadError, ValidationError};
pub use service::{AppState, ServiceContext};
