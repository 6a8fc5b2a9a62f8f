pub mod paginator;
pub mod remote_calls;
pub mod retry;

pub use paginator::*;
pub use retry::*;
