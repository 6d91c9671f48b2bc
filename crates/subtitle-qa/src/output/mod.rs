mod error;
mod json;
mod manager;

pub use error::OutputError;
pub use manager::OutputManager;
