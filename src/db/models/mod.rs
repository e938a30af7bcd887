// Sub-modules organized by functional domain
pub mod board;
pub mod history;
pub mod issue;
pub mod rules;
pub mod status;
pub mod workflow;

pub use board::*;
pub use history::*;
pub use issue::*;
pub use rules::*;
pub use status::*;
pub use workflow::*;
