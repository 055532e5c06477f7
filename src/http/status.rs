//! # Códigos de Estado HTTP
//! src/http/status.rs
//!
//! Códigos de estado que el motor y los helpers de respuesta conocen por nombre.
//! Una `Response` guarda el código como entero y el texto como string, así que
//! un handler puede usar cualquier código; este enum solo da los nombres y las
//! reason phrases estándar (RFC 9110).

/// Códigos de estado HTTP con nombre
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    /// 200 OK
    Ok = 200,

    /// 201 Created
    Created = 201,

    /// 202 Accepted
    Accepted = 202,

    /// 204 No Content
    NoContent = 204,

    /// 301 Moved Permanently
    MovedPermanently = 301,

    /// 302 Found
    Found = 302,

    /// 304 Not Modified
    NotModified = 304,

    /// 400 Bad Request
    BadRequest = 400,

    /// 401 Unauthorized
    Unauthorized = 401,

    /// 403 Forbidden
    Forbidden = 403,

    /// 404 Not Found - Ningún handler registrado para (método, path)
    NotFound = 404,

    /// 405 Method Not Allowed
    MethodNotAllowed = 405,

    /// 409 Conflict
    Conflict = 409,

    /// 413 Payload Too Large - `Content-Length` por encima del máximo configurado
    PayloadTooLarge = 413,

    /// 500 Internal Server Error - El handler falló o entró en pánico
    InternalServerError = 500,

    /// 501 Not Implemented
    NotImplemented = 501,

    /// 503 Service Unavailable - Cola del worker pool llena
    ServiceUnavailable = 503,
}

impl StatusCode {
    /// Convierte el código a su valor numérico
    ///
    /// # Ejemplo
    /// ```
    /// use mini_httpd::http::StatusCode;
    /// assert_eq!(StatusCode::Ok.as_u16(), 200);
    /// ```
    pub fn as_u16(&self) -> u16 {
        *self as u16
    }

    /// Busca el código con nombre que corresponde a un entero
    pub fn from_u16(code: u16) -> Option<Self> {
        let status = match code {
            200 => StatusCode::Ok,
            201 => StatusCode::Created,
            202 => StatusCode::Accepted,
            204 => StatusCode::NoContent,
            301 => StatusCode::MovedPermanently,
            302 => StatusCode::Found,
            304 => StatusCode::NotModified,
            400 => StatusCode::BadRequest,
            401 => StatusCode::Unauthorized,
            403 => StatusCode::Forbidden,
            404 => StatusCode::NotFound,
            405 => StatusCode::MethodNotAllowed,
            409 => StatusCode::Conflict,
            413 => StatusCode::PayloadTooLarge,
            500 => StatusCode::InternalServerError,
            501 => StatusCode::NotImplemented,
            503 => StatusCode::ServiceUnavailable,
            _ => return None,
        };
        Some(status)
    }

    /// Retorna el texto de razón (reason phrase) asociado al código
    ///
    /// # Ejemplo
    /// ```
    /// use mini_httpd::http::StatusCode;
    /// assert_eq!(StatusCode::Ok.reason_phrase(), "OK");
    /// assert_eq!(StatusCode::NotFound.reason_phrase(), "Not Found");
    /// ```
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::Created => "Created",
            StatusCode::Accepted => "Accepted",
            StatusCode::NoContent => "No Content",
            StatusCode::MovedPermanently => "Moved Permanently",
            StatusCode::Found => "Found",
            StatusCode::NotModified => "Not Modified",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::Unauthorized => "Unauthorized",
            StatusCode::Forbidden => "Forbidden",
            StatusCode::NotFound => "Not Found",
            StatusCode::MethodNotAllowed => "Method Not Allowed",
            StatusCode::Conflict => "Conflict",
            StatusCode::PayloadTooLarge => "Payload Too Large",
            StatusCode::InternalServerError => "Internal Server Error",
            StatusCode::NotImplemented => "Not Implemented",
            StatusCode::ServiceUnavailable => "Service Unavailable",
        }
    }

    /// Verifica si el código indica error del cliente (4xx)
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.as_u16())
    }

    /// Verifica si el código indica error del servidor (5xx)
    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.as_u16())
    }
}

/// Reason phrase para un código arbitrario
///
/// Los códigos sin nombre reciben `"Error"` si son >= 400 y `"OK"` en otro caso.
///
/// ```
/// use mini_httpd::http::status::reason_for;
/// assert_eq!(reason_for(201), "Created");
/// assert_eq!(reason_for(418), "Error");
/// assert_eq!(reason_for(299), "OK");
/// ```
pub fn reason_for(code: u16) -> &'static str {
    match StatusCode::from_u16(code) {
        Some(status) => status.reason_phrase(),
        None if code >= 400 => "Error",
        None => "OK",
    }
}

impl std::fmt::Display for StatusCode {
    /// Formato: "200 OK"
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.as_u16(), self.reason_phrase())
    }
}
