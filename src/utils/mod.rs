pub mod config;
pub mod logger;
pub mod secret;
pub mod stage_toml;
pub mod tempfiles;

pub use config::*;
pub use logger::setup_logging;
pub use secret::get_secret;
pub use stage_toml::{load_stage_config, parse_stage_config};
