pub mod clock;
pub mod cloud;
pub mod device;
pub mod live_cache;
pub mod normalizer;
pub mod rate_limit;
pub mod reconcile;
pub mod telemetry;
pub mod token_cache;
