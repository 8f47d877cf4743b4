//! Uploads the newest JPEG images of a (dated) local directory tree to Google
//! Drive, mirrors the folder hierarchy remotely and shares it with recipients.

pub mod core;
pub mod models;
pub mod providers;
pub mod utils;
