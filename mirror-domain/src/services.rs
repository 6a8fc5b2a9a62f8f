pub mod path_template;
pub mod placement_check;
pub mod record_builder;

pub use path_template::*;
pub use placement_check::*;
pub use record_builder::*;
