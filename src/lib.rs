pub mod batch;
pub mod book;
pub mod client;
pub mod credentials;
pub mod downloader;
pub mod error;
pub mod fetch;
pub mod fs_utils;
pub mod models;
pub mod notify;
pub mod opf;
pub mod paths;
pub mod progress;
pub mod templates;
