//! Storage clients

mod ephemeral;
mod sdk;
mod stream;
mod traits;

#[cfg(test)]
mod tests;

pub use ephemeral::EphemeralStorage;
pub use sdk::SdkStorage;
pub use traits::{ObjectReader, ObjectSummary, StorageClient, StorageError};
