// Domain value objects
pub mod identifiers;
pub mod labels;
pub mod region;

pub use identifiers::*;
pub use labels::*;
pub use region::*;
