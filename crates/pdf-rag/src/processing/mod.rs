//! Off-request execution of CPU-bound pipeline stages

mod pool;

pub use pool::ComputePool;
