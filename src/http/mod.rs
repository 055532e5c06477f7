//! # Módulo HTTP
//!
//! Tipos del protocolo, sin nada de sockets:
//!
//! - Parsing permisivo de requests HTTP/1.1
//! - Construcción y serialización de responses
//! - Códigos de estado y reason phrases
//!
//! ## Alcance
//!
//! Un request y una response por conexión. No hay keep-alive, chunked
//! transfer-encoding, pipelining ni HTTP/2.

pub mod request;   // Parsing de HTTP requests
pub mod response;  // Construcción de HTTP responses
pub mod status;    // Códigos de estado HTTP

// Permite usar `http::Request` en vez de `http::request::Request`
pub use request::{Method, Request};
pub use response::Response;
pub use status::StatusCode;
