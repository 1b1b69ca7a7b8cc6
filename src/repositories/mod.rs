pub mod config_cache_repository;
pub mod file_store;
pub mod local_store;
pub mod progress_repository;
pub mod session_repository;

pub use config_cache_repository::ConfigCacheRepository;
pub use file_store::FileStore;
pub use local_store::{keys, LocalStore, MemoryStore};
pub use progress_repository::{ProgressKey, ProgressRepository};
pub use session_repository::SessionRepository;
