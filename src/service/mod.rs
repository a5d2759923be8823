//! Service layer
//!
//! Business logic between the HTTP handlers and the data layer.

mod tweet;

pub use tweet::{TweetService, extract_tweet_id};
