pub mod error;
pub mod keys;
pub mod kv;
pub mod records;
pub mod state;

pub use error::StoreError;
pub use keys::ProductKey;
pub use kv::{JsonFileStore, KeyValueStore, MemoryStore};
pub use records::{AccessStateRecord, CatalogIndexRecord, ProductPatch, ProductStateRecord};
pub use state::StateStore;
