pub mod blocks;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod policy;
pub mod scope;
pub mod services;
pub mod store;

pub use config::Config;
pub use error::{AppError, Result};
pub use models::{ListingKind, ListingPage, Sort, TimeWindow, Viewer};
pub use services::FeedComposer;
