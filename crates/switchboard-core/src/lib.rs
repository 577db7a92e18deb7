//! Types shared between the routing core and the transport layer that
//! binds it to HTTP

mod error;

pub use error::HttpError;
