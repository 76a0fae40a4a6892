//! Identifiers and snapshots for tables discovered in the external store.

mod table_id;
mod table_set;
pub use table_id::*;
pub use table_set::*;
