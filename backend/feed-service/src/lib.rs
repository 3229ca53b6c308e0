pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod metrics;
pub mod models;
pub mod pagination;
pub mod repository;
pub mod services;

pub use config::Config;
pub use error::{CacheError, FeedError, FeedResult};

pub use services::{
    FeedAssembler, FeedContext, FeedKind, FeedView, FollowGraph, PostService, UnfollowPolicy,
};
