//! Request middleware: request IDs and optional token authentication

pub mod auth;
pub mod request_id;

pub use auth::{TokenValidator, require_token};
pub use request_id::{REQUEST_ID_HEADER, RequestId, request_id_middleware};
