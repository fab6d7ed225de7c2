pub mod compact;
pub mod config;
pub mod errors;
pub mod expand;
pub mod kernel;
pub mod traits;
pub mod types;
