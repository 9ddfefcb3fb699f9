mod encryption;
mod json_logging;
mod pagination;
mod save_history;

pub use encryption::*;
pub use json_logging::*;
pub use pagination::*;
pub use save_history::*;
