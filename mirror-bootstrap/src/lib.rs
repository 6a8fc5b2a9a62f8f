pub mod context;
pub mod lifecycle;

pub use context::AppContext;
pub use lifecycle::{execute, run, shutdown_signal, Command};
