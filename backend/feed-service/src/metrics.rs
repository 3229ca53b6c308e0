use lazy_static::lazy_static;
use prometheus::{register_int_counter, register_int_counter_vec, IntCounter, IntCounterVec};

lazy_static! {
    /// Feed cache hits
    pub static ref FEED_CACHE_HIT: IntCounter = register_int_counter!(
        "feed_cache_hit_total",
        "Total number of feed cache hits"
    )
    .expect("Failed to register feed_cache_hit_total");

    /// Feed cache misses (compute invoked)
    pub static ref FEED_CACHE_MISS: IntCounter = register_int_counter!(
        "feed_cache_miss_total",
        "Total number of feed cache misses"
    )
    .expect("Failed to register feed_cache_miss_total");

    /// Backend failures that fell back to direct compute
    pub static ref FEED_CACHE_BYPASS: IntCounter = register_int_counter!(
        "feed_cache_bypass_total",
        "Total number of feed cache backend failures degraded to direct compute"
    )
    .expect("Failed to register feed_cache_bypass_total");

    /// Feed requests by feed kind
    pub static ref FEED_REQUESTS: IntCounterVec = register_int_counter_vec!(
        "feed_requests_total",
        "Total number of feed requests",
        &["kind"]
    )
    .expect("Failed to register feed_requests_total");
}
