//! # Configuración del Servidor
//! src/config.rs
//!
//! Configuración del motor con soporte para argumentos CLI y variables de
//! entorno. La librería nunca lee el CLI por su cuenta: solo el binario llama
//! a [`Config::new`]; el resto usa [`Config::with_port`] o `Default`.
//!
//! ## Ejemplos de uso
//!
//! ### CLI
//! ```bash
//! ./mini_httpd --port 8080 --workers 8 --queue 256
//! ```
//!
//! ### Variables de entorno
//! ```bash
//! HTTP_PORT=8080 HTTP_WORKERS=0 ./mini_httpd
//! ```

use crate::error::ServerError;
use crate::server::Concurrency;
use clap::Parser;

/// Configuración del servidor HTTP
#[derive(Debug, Clone, Parser)]
#[command(name = "mini_httpd")]
#[command(about = "Motor HTTP/1.1 mínimo: un request por conexión, routing por método y path exacto")]
#[command(version = "0.1.0")]
pub struct Config {
    /// Puerto en el que escucha el servidor (0 = puerto efímero)
    #[arg(short, long, default_value = "8080", env = "HTTP_PORT")]
    pub port: u16,

    /// IP en la que escucha
    #[arg(long, default_value = "0.0.0.0", env = "HTTP_HOST")]
    pub host: String,

    /// Backlog pasado a listen()
    #[arg(long, default_value = "5", env = "HTTP_BACKLOG")]
    pub backlog: i32,

    // === Lectura ===

    /// Tamaño del buffer de la primera lectura de cada conexión
    #[arg(long = "read-buffer", default_value = "4096", env = "HTTP_READ_BUFFER")]
    pub read_buffer_size: usize,

    /// Máximo `Content-Length` aceptado; por encima se responde 413
    #[arg(long = "max-body", default_value = "1048576", env = "HTTP_MAX_BODY")]
    pub max_body_bytes: usize,

    // === Concurrencia ===

    /// Workers del pool de conexiones (0 = un thread por conexión)
    #[arg(long, default_value = "0", env = "HTTP_WORKERS")]
    pub workers: usize,

    /// Capacidad de la cola del pool; llena = 503
    #[arg(long = "queue", default_value = "128", env = "HTTP_QUEUE")]
    pub queue_capacity: usize,

    // === Logging ===

    /// Nivel de log por defecto (RUST_LOG tiene prioridad)
    #[arg(long = "log-level", default_value = "info", env = "HTTP_LOG")]
    pub log_level: String,
}

impl Config {
    /// Crea una nueva configuración parseando argumentos CLI
    pub fn new() -> Self {
        Config::parse()
    }

    /// Configuración por defecto escuchando en `port`
    ///
    /// # Ejemplo
    /// ```rust
    /// use mini_httpd::config::Config;
    ///
    /// let config = Config::with_port(3000);
    /// assert_eq!(config.address(), "0.0.0.0:3000");
    /// ```
    pub fn with_port(port: u16) -> Self {
        Self {
            port,
            ..Self::default()
        }
    }

    /// Obtiene la dirección completa para bind (host:port)
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Estrategia de concurrencia derivada de `workers`
    pub fn concurrency(&self) -> Concurrency {
        if self.workers == 0 {
            Concurrency::ThreadPerConnection
        } else {
            Concurrency::WorkerPool {
                workers: self.workers,
                queue_capacity: self.queue_capacity,
            }
        }
    }

    /// Valida la configuración
    pub fn validate(&self) -> Result<(), ServerError> {
        if self.backlog < 1 {
            return Err(ServerError::InvalidConfig("backlog must be >= 1".to_string()));
        }
        if self.read_buffer_size < 16 {
            return Err(ServerError::InvalidConfig(
                "read buffer must be >= 16 bytes".to_string(),
            ));
        }
        if self.workers > 0 && self.queue_capacity == 0 {
            return Err(ServerError::InvalidConfig(
                "queue capacity must be >= 1 when workers are enabled".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for Config {
    /// Configuración por defecto
    fn default() -> Self {
        Self {
            port: 8080,
            host: "0.0.0.0".to_string(),
            backlog: 5,
            read_buffer_size: 4096,
            max_body_bytes: 1024 * 1024,
            workers: 0,
            queue_capacity: 128,
            log_level: "info".to_string(),
        }
    }
}
