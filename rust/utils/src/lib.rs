pub mod error;
#[cfg(feature = "reqwest")]
pub mod http;
pub mod slow_warn;
