pub mod api;
pub mod config;
pub mod error;
pub mod ocr;
pub mod scratch;

pub use api::{create_router, AppState};
pub use config::Config;
pub use error::{LectorError, Result};
