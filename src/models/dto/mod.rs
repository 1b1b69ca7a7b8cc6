pub mod request;
pub mod response;

pub use request::SyncResultsRequest;
pub use response::{AppConfigResponse, CachedAppConfig, WordPressErrorBody};
