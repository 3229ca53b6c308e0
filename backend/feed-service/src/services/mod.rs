pub mod feed;
pub mod follow;
pub mod posts;

pub use feed::{FeedAssembler, FeedContext, FeedKind, FeedSnapshot, FeedView, GLOBAL_FEED_CACHE_KEY};
pub use follow::{FollowGraph, UnfollowPolicy};
pub use posts::PostService;
