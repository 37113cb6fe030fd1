pub mod api;
pub mod config;
pub mod dcf;
pub mod error;
pub mod report;
pub mod services;
pub mod statements;

pub use config::*;
pub use dcf::*;
pub use error::{ValuationError, Result};
pub use statements::*;
