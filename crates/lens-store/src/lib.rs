pub mod error;
pub mod schema;
pub mod store;

pub use error::{Result, StoreError};
pub use store::{PrefStore, default_base_dir};
