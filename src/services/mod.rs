pub mod auth;
pub mod comments;
pub mod markdown;
pub mod ownership;
pub mod posts;
pub mod profile;
pub mod slug;
pub mod tags;
