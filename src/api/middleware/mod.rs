//! Middleware and error mapping for the HTTP layer.

mod error_handler;
mod logging;
mod request_id;

pub use error_handler::{ApiError, status_code};
pub use logging::logging_middleware;
pub use request_id::{REQUEST_ID_HEADER, RequestId, request_id_middleware};
