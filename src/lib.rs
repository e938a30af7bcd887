pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod services;
pub mod validation;

use tracing::Level;

use crate::config::Config;

pub use crate::services::board_moves_service::{
    BoardCoordinator, Collaborators, MoveReport, MoveState,
};

pub fn init_tracing(config: &Config) {
    let logging = config.logging();
    let level = logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match logging.format.as_str() {
        "json" => {
            tracing_subscriber::fmt()
                .json()
                .with_max_level(level)
                .init();
        }
        _ => {
            tracing_subscriber::fmt().with_max_level(level).init();
        }
    }
}
