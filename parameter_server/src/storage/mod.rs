mod blocking;
mod error;
mod handle;
mod store;

pub use blocking::BlockingStore;
pub use error::{Result, SizeMismatchErr};
pub use handle::StoreHandle;
pub use store::Store;
