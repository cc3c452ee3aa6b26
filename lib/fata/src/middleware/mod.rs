//! Tower middleware layers for [`HyperClient`](crate::HyperClient).
//!
//! Layers wrap the transport, below the request pipeline: they see the
//! fully resolved [`Request`](crate::Request) and the buffered
//! [`Response`](crate::Response), after interceptors and before decoding.
//!
//! ```ignore
//! use fata::HyperClient;
//! use fata::middleware::LoggingLayer;
//!
//! let client = HyperClient::builder()
//!     .layer(LoggingLayer::debug())
//!     .build();
//! ```

mod logging;

pub use logging::{LogLevel, Logging, LoggingLayer};

// Re-export tower types for power users
pub use tower::{Layer, Service, ServiceBuilder};
