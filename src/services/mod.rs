pub mod api_client;
pub mod catalog;
pub mod config_service;
pub mod notifier;
pub mod results_sync;
