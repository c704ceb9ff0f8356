pub mod composer;

pub use composer::{FeedComposer, ListingKey};
