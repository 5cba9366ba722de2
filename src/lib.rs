//! Raw-socket HTTP/1.x services: a GET-only forwarding proxy and a file
//! server with uploads.
//!
//! # Architecture Overview
//!
//! ```text
//!  client ──TCP──▶ net (gate + listener) ──▶ http::server (task per connection)
//!                                                  │
//!                                                  ▼
//!                                   http::handler (parse, dispatch, close)
//!                                         │                    │
//!                                         ▼                    ▼
//!                               proxy::ForwardProxy     files::FileServer
//!                               (hyper client relay)    (resource store)
//!
//!  cross-cutting: config, lifecycle, observability, resilience
//! ```

pub mod cli;
pub mod config;
pub mod files;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod proxy;
pub mod resilience;

pub use config::ServiceConfig;
pub use files::FileServer;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use proxy::ForwardProxy;
