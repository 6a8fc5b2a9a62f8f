pub mod validation_queries;

pub use validation_queries::*;
