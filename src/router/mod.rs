//! # Sistema de Routing
//! src/router/mod.rs
//!
//! El router mapea (método, path exacto) a un handler y es dueño del ciclo de
//! vida del servidor.
//!
//! ## Arquitectura
//!
//! ```text
//! Request → Listener → RouteTable (snapshot) → Handler → Response
//! ```
//!
//! ## Estados
//!
//! ```text
//! Created ──start()──► Running ──stop()──► Stopped
//! ```
//!
//! `Stopped` es terminal. Las rutas se congelan en un snapshot al llamar a
//! `start()`; lo que se registre después no llega al accept loop.

mod table;

pub use table::{Handler, IntoHandlerResult, RouteTable};

use crate::config::Config;
use crate::error::{HandlerError, ServerError};
use crate::http::{Method, Request, Response};
use crate::server::Listener;
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, info, warn};

/// Estado del ciclo de vida
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Created,
    Running,
    Stopped,
}

/// Router + ciclo de vida del servidor
pub struct Router {
    routes: RouteTable,
    listener: Arc<Listener>,
    state: State,
    accept_thread: Option<JoinHandle<()>>,
}

impl Router {
    /// Servidor escuchando en `0.0.0.0:port`
    ///
    /// Falla si no se puede crear, configurar, bindear o poner en listen el
    /// socket.
    pub fn new(port: u16) -> Result<Self, ServerError> {
        Self::with_config(&Config::with_port(port))
    }

    /// Servidor con configuración completa
    pub fn with_config(config: &Config) -> Result<Self, ServerError> {
        Ok(Self {
            routes: RouteTable::new(),
            listener: Arc::new(Listener::bind(config)?),
            state: State::Created,
            accept_thread: None,
        })
    }

    /// Registra (o reemplaza) el handler de (método, path exacto)
    ///
    /// # Ejemplo
    /// ```
    /// use mini_httpd::router::Router;
    /// use mini_httpd::http::{Method, Response};
    ///
    /// let mut router = Router::new(0).unwrap();
    /// router.register(Method::GET, "/hello", |_req| Response::text("hello"));
    /// assert_eq!(router.route_count(), 1);
    /// ```
    pub fn register<F, R>(&mut self, method: Method, path: &str, handler: F)
    where
        F: Fn(&Request) -> R + Send + Sync + 'static,
        R: IntoHandlerResult,
    {
        if self.state != State::Created {
            warn!(%method, path, state = ?self.state, "Ruta registrada después de start(); no llega al accept loop");
        }

        let handler: Handler = Arc::new(move |request: &Request| handler(request).into_handler_result());
        if self.routes.insert(method, path, handler) {
            debug!(%method, path, "Handler reemplazado");
        } else {
            debug!(%method, path, "Ruta registrada");
        }
    }

    /// Registra una ruta GET
    pub fn get<F, R>(&mut self, path: &str, handler: F)
    where
        F: Fn(&Request) -> R + Send + Sync + 'static,
        R: IntoHandlerResult,
    {
        self.register(Method::GET, path, handler);
    }

    /// Registra una ruta POST
    pub fn post<F, R>(&mut self, path: &str, handler: F)
    where
        F: Fn(&Request) -> R + Send + Sync + 'static,
        R: IntoHandlerResult,
    {
        self.register(Method::POST, path, handler);
    }

    /// Registra una ruta PUT
    pub fn put<F, R>(&mut self, path: &str, handler: F)
    where
        F: Fn(&Request) -> R + Send + Sync + 'static,
        R: IntoHandlerResult,
    {
        self.register(Method::PUT, path, handler);
    }

    /// Registra una ruta DELETE
    pub fn delete<F, R>(&mut self, path: &str, handler: F)
    where
        F: Fn(&Request) -> R + Send + Sync + 'static,
        R: IntoHandlerResult,
    {
        self.register(Method::DELETE, path, handler);
    }

    /// Despacha un request contra las rutas registradas
    ///
    /// Sin coincidencia retorna el 404 fijo; un `Err` viene del handler.
    pub fn dispatch(&self, request: &Request) -> Result<Response, HandlerError> {
        self.routes.dispatch(request)
    }

    /// Congela las rutas y lanza el accept loop en un thread de fondo
    ///
    /// No bloquea. Falla con `AlreadyRunning` si ya está corriendo y con
    /// `Stopped` si ya se detuvo.
    pub fn start(&mut self) -> Result<(), ServerError> {
        match self.state {
            State::Running => return Err(ServerError::AlreadyRunning),
            State::Stopped => return Err(ServerError::Stopped),
            State::Created => {}
        }

        let snapshot = Arc::new(self.routes.clone());
        self.listener.set_dispatch(move |request| snapshot.dispatch(request));

        let listener = Arc::clone(&self.listener);
        let handle = thread::Builder::new()
            .name("accept-loop".to_string())
            .spawn(move || {
                if let Err(e) = listener.run() {
                    error!(error = %e, "El accept loop terminó con error");
                }
            })
            .map_err(ServerError::Spawn)?;

        self.accept_thread = Some(handle);
        self.state = State::Running;

        info!(
            address = %self.listener.local_addr(),
            routes = self.routes.len(),
            "Servidor iniciado"
        );
        Ok(())
    }

    /// Detiene el accept loop y espera a su thread
    ///
    /// Las conexiones en curso siguen hasta terminar por su cuenta. Sin
    /// efecto si el servidor no está corriendo.
    pub fn stop(&mut self) {
        if self.state != State::Running {
            return;
        }

        self.state = State::Stopped;
        self.listener.stop();

        if let Some(handle) = self.accept_thread.take() {
            if handle.join().is_err() {
                error!("El thread del accept loop entró en pánico");
            }
        }

        info!(address = %self.listener.local_addr(), "Servidor detenido");
    }

    /// Estado actual
    pub fn state(&self) -> State {
        self.state
    }

    /// `true` entre `start()` y `stop()`
    pub fn is_running(&self) -> bool {
        self.state == State::Running
    }

    /// Dirección real del socket de escucha
    pub fn local_addr(&self) -> SocketAddr {
        self.listener.local_addr()
    }

    /// Cantidad de rutas registradas
    pub fn route_count(&self) -> usize {
        self.routes.len()
    }
}

impl Drop for Router {
    fn drop(&mut self) {
        self.stop();
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("address", &self.listener.local_addr())
            .field("state", &self.state)
            .field("routes", &self.routes)
            .finish()
    }
}
