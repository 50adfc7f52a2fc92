mod azure_blob;
pub(crate) mod common;
mod in_memory;
mod local_fs;
mod s3_compatible;

pub use azure_blob::AzureBlob;
pub use common::*;
pub use in_memory::{InMemoryBackend, Propagation};
pub use local_fs::LocalFs;
pub use s3_compatible::S3Compatible;
