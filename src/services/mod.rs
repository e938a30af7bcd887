pub mod board_moves_service;
pub mod board_service;
pub mod context;
pub mod statuses_service;
pub mod transitions_service;
pub mod workflows_service;

pub use board_moves_service::BoardCoordinator;
pub use board_service::BoardService;
pub use context::Actor;
pub use statuses_service::StatusesService;
pub use transitions_service::TransitionsService;
pub use workflows_service::WorkflowsService;
