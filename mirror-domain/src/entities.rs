// Domain entities

pub mod config;
pub mod container;
pub mod drift;
pub mod records;
pub mod remote_nodes;
pub mod sync_report;
pub mod user;
pub mod validation;

pub use config::*;
pub use container::*;
pub use drift::*;
pub use records::*;
pub use remote_nodes::*;
pub use sync_report::*;
pub use user::*;
pub use validation::*;
