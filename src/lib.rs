//! # Mini HTTP Server
//! src/lib.rs
//!
//! Motor HTTP/1.1 mínimo implementado desde cero sobre sockets TCP
//! bloqueantes: un thread (o worker) por conexión, un request por conexión.
//!
//! ## Arquitectura
//!
//! - `http`: Parsing permisivo de requests y serialización de responses
//! - `server`: Socket de escucha, accept loop y manejo de cada conexión
//! - `router`: Tabla (método, path exacto) → handler y ciclo de vida
//! - `config`: Configuración por CLI y variables de entorno
//! - `error`: Errores del servidor y de los handlers
//! - `logging`: Inicialización de `tracing`
//!
//! ## Ejemplo de uso
//!
//! ```no_run
//! use mini_httpd::router::Router;
//! use mini_httpd::http::Response;
//!
//! let mut router = Router::new(8080).expect("bind");
//! router.get("/", |_req| Response::html("<h1>Hi</h1>"));
//! router.start().expect("start");
//! // ...
//! router.stop();
//! ```

pub mod config;
pub mod error;
pub mod http;
pub mod logging;
pub mod router;
pub mod server;

pub use config::Config;
pub use error::{HandlerError, ServerError};
pub use http::{Method, Request, Response, StatusCode};
pub use router::Router;
pub use server::Listener;
