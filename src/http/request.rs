//! # Parsing de Requests HTTP/1.1
//! src/http/request.rs
//!
//! Parser permisivo, de una sola pasada y orientado a líneas. Nunca falla:
//! con cualquier entrada produce *algún* `Request`, aunque sus campos queden
//! vacíos.
//!
//! ## Formato de un Request
//!
//! ```text
//! POST /api/echo HTTP/1.1\r\n
//! Host: localhost:8080\r\n
//! Content-Length: 3\r\n
//! \r\n
//! abc
//! ```
//!
//! ## Reglas
//!
//! 1. **Request Line**: se separa por espacios en `METHOD PATH VERSION`; los
//!    tokens que falten quedan vacíos.
//! 2. **Headers**: hasta la primera línea vacía (tras quitar el `\r` final).
//!    Nombre = todo antes del primer `:`, valor = todo después sin un espacio
//!    inicial. Las líneas sin `:` se ignoran. Nombres duplicados: gana el último.
//! 3. **Body**: con `Content-Length` válido, exactamente esa cantidad de bytes
//!    (o los que haya). Sin él, todo lo que sigue al terminador sin el último
//!    salto de línea.
//!
//! El path es el string crudo de la request line, query string incluido.

use std::collections::HashMap;

/// Métodos HTTP que se pueden registrar en el router
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    GET,
    HEAD,
    POST,
    PUT,
    DELETE,
    PATCH,
    OPTIONS,
}

impl Method {
    /// Parsea un token de método; `None` si no es uno de los conocidos
    ///
    /// La comparación es exacta: `get` no es `GET`.
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "GET" => Some(Method::GET),
            "HEAD" => Some(Method::HEAD),
            "POST" => Some(Method::POST),
            "PUT" => Some(Method::PUT),
            "DELETE" => Some(Method::DELETE),
            "PATCH" => Some(Method::PATCH),
            "OPTIONS" => Some(Method::OPTIONS),
            _ => None,
        }
    }

    /// Convierte el método a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::GET => "GET",
            Method::HEAD => "HEAD",
            Method::POST => "POST",
            Method::PUT => "PUT",
            Method::DELETE => "DELETE",
            Method::PATCH => "PATCH",
            Method::OPTIONS => "OPTIONS",
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Request HTTP parseado
///
/// Se crea uno por conexión y no se modifica después de construido.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Request {
    /// Token del método tal como llegó (ej: "GET")
    method: String,

    /// Path crudo, sin decodificar y con query string (ej: "/hello?name=x")
    path: String,

    /// Versión del protocolo (ej: "HTTP/1.1")
    version: String,

    /// Headers con el nombre tal como llegó
    headers: HashMap<String, String>,

    /// Bytes del body
    body: Vec<u8>,
}

/// Siguiente línea terminada en `\n` a partir de `start`
///
/// Retorna la línea sin el `\n` y el offset donde empieza la siguiente.
fn next_line(buffer: &[u8], start: usize) -> Option<(&[u8], usize)> {
    if start >= buffer.len() {
        return None;
    }

    let rest = &buffer[start..];
    match rest.iter().position(|&b| b == b'\n') {
        Some(pos) => Some((&rest[..pos], start + pos + 1)),
        None => Some((rest, buffer.len())),
    }
}

fn strip_cr(line: &[u8]) -> &[u8] {
    line.strip_suffix(b"\r").unwrap_or(line)
}

impl Request {
    /// Parsea un request desde los bytes leídos del socket
    ///
    /// # Ejemplo
    ///
    /// ```
    /// use mini_httpd::http::Request;
    ///
    /// let raw = b"GET /hello?name=x HTTP/1.1\r\nHost: localhost\r\n\r\n";
    /// let request = Request::parse(raw);
    ///
    /// assert_eq!(request.method(), "GET");
    /// assert_eq!(request.path(), "/hello?name=x");
    /// assert_eq!(request.header("Host"), Some("localhost"));
    /// ```
    pub fn parse(buffer: &[u8]) -> Self {
        let mut request = Request::default();

        // 1. Request line
        let Some((first, mut offset)) = next_line(buffer, 0) else {
            return request;
        };
        request.parse_request_line(strip_cr(first));

        // 2. Headers, hasta la línea vacía
        let mut body_start = None;
        while let Some((line, next)) = next_line(buffer, offset) {
            offset = next;
            let line = strip_cr(line);
            if line.is_empty() {
                body_start = Some(next);
                break;
            }
            request.parse_header_line(line);
        }

        // 3. Body (solo si hubo terminador de headers)
        if let Some(start) = body_start {
            let rest = &buffer[start.min(buffer.len())..];
            request.body = match request.content_length() {
                Some(declared) => rest[..declared.min(rest.len())].to_vec(),
                None => rest.strip_suffix(b"\n").unwrap_or(rest).to_vec(),
            };
        }

        request
    }

    /// Offset del primer byte del body, si el buffer ya contiene el terminador de headers
    pub(crate) fn body_offset(buffer: &[u8]) -> Option<usize> {
        let (_, mut offset) = next_line(buffer, 0)?;
        while let Some((line, next)) = next_line(buffer, offset) {
            if strip_cr(line).is_empty() {
                return Some(next);
            }
            offset = next;
        }
        None
    }

    /// Formato: `GET /path HTTP/1.1`
    fn parse_request_line(&mut self, line: &[u8]) {
        let line = String::from_utf8_lossy(line);
        let mut parts = line.split_whitespace();

        self.method = parts.next().unwrap_or_default().to_string();
        self.path = parts.next().unwrap_or_default().to_string();
        self.version = parts.next().unwrap_or_default().to_string();
    }

    /// Formato: `Name: Value`
    fn parse_header_line(&mut self, line: &[u8]) {
        let line = String::from_utf8_lossy(line);

        // Header sin ':' se ignora
        if let Some(colon_pos) = line.find(':') {
            let name = &line[..colon_pos];
            let value = &line[colon_pos + 1..];
            let value = value.strip_prefix(' ').unwrap_or(value);
            self.headers.insert(name.to_string(), value.to_string());
        }
    }

    // === Métodos públicos para acceder a los campos ===

    /// Token del método tal como llegó
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Path crudo (con query string si la hay)
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Versión HTTP de la request line
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Obtiene todos los headers
    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// Obtiene un header específico (nombre exacto, sensible a mayúsculas)
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(|s| s.as_str())
    }

    /// Valor de `Content-Length`, buscado sin distinguir mayúsculas
    ///
    /// `None` si el header no está o no es solo dígitos ASCII (`+5` no vale).
    pub fn content_length(&self) -> Option<usize> {
        self.headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("Content-Length"))
            .map(|(_, value)| value.trim())
            .filter(|value| !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()))
            .and_then(|value| value.parse().ok())
    }

    /// Obtiene el body del request
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Obtiene el body como String si es UTF-8 válido
    pub fn body_string(&self) -> Option<String> {
        std::str::from_utf8(&self.body).ok().map(str::to_owned)
    }
}
