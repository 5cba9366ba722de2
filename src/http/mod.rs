//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (accept loop, one task per connection)
//!     → handler.rs (connection state machine, error → status mapping)
//!     → parser.rs (request line, header section)
//!     → request.rs (parsed line, lazy headers, body stream)
//!     → Service::handle (proxy forwarder or file store)
//!     → response.rs (byte-exact heads, streamed bodies)
//!     → close
//! ```

pub mod error;
pub mod handler;
pub mod headers;
pub mod parser;
pub mod request;
pub mod response;
pub mod server;

pub use error::{HttpError, HttpResult};
pub use handler::{serve_connection, Service};
pub use headers::Headers;
pub use request::{Request, RequestLine};
pub use response::{ResponseHead, ResponseWriter};
pub use server::HttpServer;
