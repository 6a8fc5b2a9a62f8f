pub mod classifier;
pub mod graphql_client;
pub mod queries;

pub use classifier::*;
pub use graphql_client::*;
