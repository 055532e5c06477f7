//! # Construcción de Respuestas HTTP
//! src/http/response.rs
//!
//! API para construir respuestas y serializarlas a bytes.
//!
//! ## Formato serializado
//!
//! ```text
//! HTTP/1.1 200 OK\r\n
//! Content-Type: text/html\r\n
//! Content-Length: 11\r\n
//! \r\n
//! <h1>Hi</h1>
//! ```
//!
//! `Content-Length` siempre lo calcula el serializador a partir del body; un
//! valor puesto por el handler se descarta.
//!
//! ## Ejemplo de uso
//!
//! ```
//! use mini_httpd::http::Response;
//!
//! let response = Response::html("<h1>Hi</h1>")
//!     .with_header("X-Custom", "1");
//!
//! let bytes = response.to_bytes();
//! assert!(bytes.starts_with(b"HTTP/1.1 200 OK\r\n"));
//! ```

use super::status::{reason_for, StatusCode};
use crate::error::HandlerError;
use serde::Serialize;
use std::collections::HashMap;

/// Body de la respuesta 404 por defecto
pub const NOT_FOUND_BODY: &str = "<html><body><h1>404 - Not Found</h1></body></html>";

/// Body de la respuesta 500 cuando un handler falla
pub const INTERNAL_ERROR_BODY: &str = "Internal Server Error";

/// Representa una respuesta HTTP completa
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Código de estado (200, 404, ...)
    status_code: u16,

    /// Texto de razón que acompaña al código ("OK", "Not Found", ...)
    status_text: String,

    /// Headers; el orden de inserción no importa
    headers: HashMap<String, String>,

    /// Cuerpo de la respuesta (puede ser vacío)
    body: Vec<u8>,
}

impl Response {
    /// Crea una respuesta vacía con un código con nombre
    pub fn new(status: StatusCode) -> Self {
        Self::from_parts(status.as_u16(), status.reason_phrase())
    }

    /// Crea una respuesta vacía con código y texto arbitrarios
    ///
    /// ```
    /// use mini_httpd::http::Response;
    ///
    /// let response = Response::from_parts(418, "I'm a teapot");
    /// assert_eq!(response.status_text(), "I'm a teapot");
    /// ```
    pub fn from_parts(status_code: u16, status_text: impl Into<String>) -> Self {
        Self {
            status_code,
            status_text: status_text.into(),
            headers: HashMap::new(),
            body: Vec::new(),
        }
    }

    /// Cambia el código de estado; el texto sale de la tabla de reason phrases
    pub fn with_status(mut self, status_code: u16) -> Self {
        self.status_code = status_code;
        self.status_text = reason_for(status_code).to_string();
        self
    }

    /// Agrega un header a la respuesta (si ya existe, se sobrescribe)
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.add_header(name, value);
        self
    }

    /// Versión mutable de [`Response::with_header`]
    pub fn add_header(&mut self, name: &str, value: &str) {
        self.headers.insert(name.to_string(), value.to_string());
    }

    /// Establece el cuerpo desde un string
    pub fn with_body(mut self, body: &str) -> Self {
        self.body = body.as_bytes().to_vec();
        self
    }

    /// Establece el cuerpo desde bytes (respuestas binarias)
    pub fn with_body_bytes(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    // === Helpers por tipo de contenido ===

    /// Respuesta 200 con `Content-Type: text/html`
    pub fn html(body: &str) -> Self {
        Self::with_content_type("text/html", body)
    }

    /// Respuesta 200 con `Content-Type: application/json`
    ///
    /// El body se envía tal cual; ver [`Response::json_value`] para serializar.
    pub fn json(body: &str) -> Self {
        Self::with_content_type("application/json", body)
    }

    /// Respuesta 200 con `Content-Type: text/plain`
    pub fn text(body: &str) -> Self {
        Self::with_content_type("text/plain", body)
    }

    /// Respuesta 200 JSON serializando `value` con serde_json
    ///
    /// ```
    /// use mini_httpd::http::Response;
    /// use serde_json::json;
    ///
    /// let response = Response::json_value(&json!({"status": "running"})).unwrap();
    /// assert_eq!(response.body(), br#"{"status":"running"}"#);
    /// ```
    pub fn json_value<T: Serialize>(value: &T) -> Result<Self, HandlerError> {
        let body = serde_json::to_vec(value)?;
        Ok(Self::new(StatusCode::Ok)
            .with_header("Content-Type", "application/json")
            .with_body_bytes(body))
    }

    fn with_content_type(content_type: &str, body: &str) -> Self {
        Self::new(StatusCode::Ok)
            .with_header("Content-Type", content_type)
            .with_body(body)
    }

    // === Respuestas fijas del motor ===

    /// 404 cuando ningún handler coincide con (método, path)
    pub fn not_found() -> Self {
        Self::new(StatusCode::NotFound)
            .with_header("Content-Type", "text/html")
            .with_body(NOT_FOUND_BODY)
    }

    /// 500 cuando el dispatch falla o entra en pánico
    pub fn internal_error() -> Self {
        Self::new(StatusCode::InternalServerError)
            .with_header("Content-Type", "text/plain")
            .with_body(INTERNAL_ERROR_BODY)
    }

    /// 413 cuando el `Content-Length` declarado supera el máximo
    pub fn payload_too_large() -> Self {
        let status = StatusCode::PayloadTooLarge;
        Self::new(status)
            .with_header("Content-Type", "text/plain")
            .with_body(status.reason_phrase())
    }

    /// 503 cuando la cola de conexiones está llena
    pub fn service_unavailable() -> Self {
        let status = StatusCode::ServiceUnavailable;
        Self::new(status)
            .with_header("Content-Type", "text/plain")
            .with_body(status.reason_phrase())
    }

    /// Convierte la respuesta a bytes listos para enviar por el socket
    ///
    /// - Status line: `HTTP/1.1 <code> <text>\r\n`
    /// - Headers del handler (sin su `Content-Length`, si lo puso)
    /// - `Content-Length` calculado del body
    /// - Línea vacía y body crudo
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut head = format!("HTTP/1.1 {} {}\r\n", self.status_code, self.status_text);

        for (name, value) in &self.headers {
            if name.eq_ignore_ascii_case("Content-Length") {
                continue;
            }
            head.push_str(&format!("{}: {}\r\n", name, value));
        }
        head.push_str(&format!("Content-Length: {}\r\n\r\n", self.body.len()));

        let mut result = head.into_bytes();
        result.extend_from_slice(&self.body);
        result
    }

    /// Código de estado numérico
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    /// Texto de razón
    pub fn status_text(&self) -> &str {
        &self.status_text
    }

    /// Obtiene una referencia a los headers
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Obtiene un header por nombre exacto
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(|s| s.as_str())
    }

    /// Obtiene una referencia al body
    pub fn body(&self) -> &[u8] {
        &self.body
    }
}
