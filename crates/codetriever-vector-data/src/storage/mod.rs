pub mod mock;
pub mod qdrant;
pub mod traits;

pub use self::mock::MockStorage;
pub use self::qdrant::QdrantStorage;
pub use self::traits::{SearchResult, StorageStats, VectorStorage};
