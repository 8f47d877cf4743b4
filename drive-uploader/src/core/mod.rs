pub mod auth_manager;
pub mod config_store;
pub mod credentials;
pub mod folder_resolver;
pub mod poll_loop;
pub mod scanner;
pub mod upload_engine;
