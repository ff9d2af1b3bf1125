//! # Módulo HTTP
//! src/http/mod.rs
//!
//! HTTP/1.0 (RFC 1945) escrito a mano, sin librerías de alto nivel:
//!
//! - Lectura y parsing de la cabecera del request
//! - Construcción de responses con headers ordenados
//! - Códigos de estado
//!
//! Cada conexión lleva un solo request; el servidor cierra el socket después
//! de responder.

pub mod request;
pub mod response;
pub mod status;

pub use request::{Method, ParseError, Request};
pub use response::Response;
pub use status::StatusCode;
