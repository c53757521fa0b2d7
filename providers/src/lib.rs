//! xrates Rate Providers
//!
//! Concrete [`RateProvider`](xrates_fx::RateProvider) implementations backed
//! by public HTTP rate feeds.
//!
//! - [`FrankfurterProvider`]: one batched call per query.
//! - [`FawazProvider`]: one document per base currency; requested symbols
//!   are picked out of it one by one.

pub mod http;
pub mod frankfurter;
pub mod fawaz;

pub use http::HttpClientConfig;
pub use frankfurter::FrankfurterProvider;
pub use fawaz::FawazProvider;
