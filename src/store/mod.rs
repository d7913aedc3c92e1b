pub mod shared;
pub mod state;

pub use shared::{SharedStore, StoreRevision};
pub use state::ReconciliationStore;
