pub mod event_commands;
pub mod event_writer;
pub mod label_commands;
pub mod reconcile_commands;
pub mod sync_commands;
pub mod user_commands;

pub use event_commands::*;
pub use event_writer::*;
pub use label_commands::*;
pub use reconcile_commands::*;
pub use sync_commands::*;
pub use user_commands::*;
