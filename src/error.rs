//! # Errores
//! src/error.rs
//!
//! Dos familias:
//!
//! - [`ServerError`]: construcción del socket y ciclo de vida. Son los únicos
//!   errores que llegan al llamador.
//! - [`HandlerError`]: fallos de un handler. Nunca salen de la conexión: el
//!   motor los convierte en la respuesta 500 fija.

use thiserror::Error;

/// Errores de construcción y ciclo de vida del servidor
#[derive(Debug, Error)]
pub enum ServerError {
    /// No se pudo crear el socket TCP
    #[error("failed to create socket: {0}")]
    Socket(#[source] std::io::Error),

    /// No se pudo configurar SO_REUSEADDR
    #[error("failed to configure socket: {0}")]
    SetOption(#[source] std::io::Error),

    /// Falló el bind a la dirección
    #[error("failed to bind socket to {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// Falló el listen
    #[error("failed to listen on socket: {0}")]
    Listen(#[source] std::io::Error),

    /// `host:port` no es una dirección de socket válida
    #[error("invalid listen address: {0}")]
    InvalidAddress(String),

    /// La configuración no pasó la validación
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// No se pudo lanzar el thread del accept loop
    #[error("failed to spawn accept loop thread: {0}")]
    Spawn(#[source] std::io::Error),

    /// `start()` con el servidor ya corriendo
    #[error("server is already running")]
    AlreadyRunning,

    /// `start()` después de `stop()`
    #[error("server was stopped and cannot be restarted")]
    Stopped,
}

/// Error devuelto por un handler
///
/// Los handlers pueden usar `?` sobre `io::Error` y `serde_json::Error`, o
/// devolver un mensaje con `HandlerError::from("...")`.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Mensaje libre
    #[error("{0}")]
    Message(String),

    /// Otro error
    #[error(transparent)]
    Source(Box<dyn std::error::Error + Send + Sync>),

    /// El handler entró en pánico
    #[error("handler panicked: {0}")]
    Panicked(String),
}

impl HandlerError {
    /// Envuelve cualquier error
    pub fn new<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        HandlerError::Source(Box::new(error))
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        HandlerError::Message(message.to_string())
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        HandlerError::Message(message)
    }
}

impl From<std::io::Error> for HandlerError {
    fn from(error: std::io::Error) -> Self {
        HandlerError::new(error)
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(error: serde_json::Error) -> Self {
        HandlerError::new(error)
    }
}

impl From<Box<dyn std::error::Error + Send + Sync>> for HandlerError {
    fn from(error: Box<dyn std::error::Error + Send + Sync>) -> Self {
        HandlerError::Source(error)
    }
}
