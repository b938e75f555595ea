// src/utils/mod.rs
pub mod error;
pub mod logging;
pub mod html_debug;
pub mod language;

pub use error::AppError;
