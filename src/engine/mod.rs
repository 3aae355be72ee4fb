pub mod aggregator;
pub mod control;
pub mod filter;
pub mod http;
pub mod producer;
pub mod queue;
pub mod rate_limiter;
pub mod retry;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use control::ControlPlane;
pub use http::{ReqwestTransport, Transport};
