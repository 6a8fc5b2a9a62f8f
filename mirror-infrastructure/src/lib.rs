// Mirror Infrastructure Layer

pub mod config;
pub mod remote;
pub mod repositories;

pub use config::*;
pub use remote::*;
pub use repositories::*;
