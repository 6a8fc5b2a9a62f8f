pub mod file_event_store;
pub mod file_ledger;
pub mod jsonl_index;
pub mod jsonl_users;
pub mod store_io;

pub use file_event_store::*;
pub use file_ledger::*;
pub use jsonl_index::*;
pub use jsonl_users::*;
