//! # Listener TCP
//! src/server/listener.rs
//!
//! Dueño del socket de escucha y del accept loop. No sabe nada de rutas:
//! cada request se convierte en response a través de un único callback de
//! dispatch, que por defecto responde 404.
//!
//! ## Ciclo de vida
//!
//! ```text
//! bind ──► run (bloquea, acepta) ──► stop (shutdown del socket) ──► drop (cierra fd)
//! ```

use super::connection::{self, Connection, ConnectionLimits};
use super::pool::{Concurrency, Executor, WorkFn};
use crate::config::Config;
use crate::error::{HandlerError, ServerError};
use crate::http::{Request, Response};
use socket2::{Domain, Protocol, Socket, Type};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Firma del callback de dispatch
pub type DispatchFn = dyn Fn(&Request) -> Result<Response, HandlerError> + Send + Sync;

/// Callback de dispatch compartido entre conexiones
pub type Dispatch = Arc<DispatchFn>;

fn default_dispatch(_request: &Request) -> Result<Response, HandlerError> {
    Ok(Response::not_found())
}

/// Socket de escucha más el accept loop
pub struct Listener {
    socket: Socket,
    local_addr: SocketAddr,
    stopped: AtomicBool,
    dispatch: RwLock<Dispatch>,
    limits: ConnectionLimits,
    concurrency: Concurrency,
}

impl Listener {
    /// Escucha en `0.0.0.0:port` con la configuración por defecto
    pub fn new(port: u16) -> Result<Self, ServerError> {
        Self::bind(&Config::with_port(port))
    }

    /// Crea el socket, activa SO_REUSEADDR, hace bind y listen
    ///
    /// Cualquier fallo es fatal: no queda un listener a medio inicializar.
    pub fn bind(config: &Config) -> Result<Self, ServerError> {
        config.validate()?;

        let address = config
            .address()
            .to_socket_addrs()
            .ok()
            .and_then(|mut addrs| addrs.next())
            .ok_or_else(|| ServerError::InvalidAddress(config.address()))?;

        let socket = Socket::new(Domain::for_address(address), Type::STREAM, Some(Protocol::TCP))
            .map_err(ServerError::Socket)?;
        socket.set_reuse_address(true).map_err(ServerError::SetOption)?;
        socket.bind(&address.into()).map_err(|source| ServerError::Bind {
            address: address.to_string(),
            source,
        })?;
        socket.listen(config.backlog).map_err(ServerError::Listen)?;

        let local_addr = socket
            .local_addr()
            .map_err(ServerError::Listen)?
            .as_socket()
            .ok_or_else(|| ServerError::InvalidAddress(address.to_string()))?;

        info!(address = %local_addr, backlog = config.backlog, "Listener escuchando");

        let dispatch: Dispatch = Arc::new(default_dispatch);

        Ok(Self {
            socket,
            local_addr,
            stopped: AtomicBool::new(false),
            dispatch: RwLock::new(dispatch),
            limits: ConnectionLimits {
                read_buffer_size: config.read_buffer_size,
                max_body_bytes: config.max_body_bytes,
            },
            concurrency: config.concurrency(),
        })
    }

    /// Instala el callback de dispatch (gana la última llamada)
    ///
    /// Cada conexión toma el callback vigente al momento de ser aceptada.
    pub fn set_dispatch<F>(&self, dispatch: F)
    where
        F: Fn(&Request) -> Result<Response, HandlerError> + Send + Sync + 'static,
    {
        let mut slot = self.dispatch.write().unwrap_or_else(PoisonError::into_inner);
        *slot = Arc::new(dispatch);
    }

    /// Callback vigente
    pub(crate) fn dispatch(&self) -> Dispatch {
        Arc::clone(&self.dispatch.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Dirección real del socket (útil con puerto 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// `true` después de `stop()`
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::SeqCst)
    }

    /// Accept loop bloqueante
    ///
    /// Retorna cuando se llama a `stop()`. Los errores de accept mientras el
    /// listener sigue activo se loguean y el loop continúa. Solo falla si no
    /// se pueden lanzar los workers del pool.
    pub fn run(&self) -> Result<(), ServerError> {
        if self.is_stopped() {
            return Ok(());
        }

        let limits = self.limits;
        let work: WorkFn<Connection> = Arc::new(move |conn: Connection| {
            if let Err(e) = connection::handle_connection(conn.stream, &conn.dispatch, limits) {
                debug!(error = %e, "Conexión terminada con error de I/O");
            }
        });
        let executor = Executor::start(self.concurrency, work).map_err(ServerError::Spawn)?;

        info!(address = %self.local_addr, concurrency = ?self.concurrency, "Accept loop iniciado");

        loop {
            match self.socket.accept() {
                Ok((socket, peer)) => {
                    if self.is_stopped() {
                        debug!("Conexión aceptada después de stop, descartada");
                        break;
                    }

                    let stream: TcpStream = socket.into();
                    debug!(peer = ?peer.as_socket(), "Nueva conexión");

                    let conn = Connection {
                        stream,
                        dispatch: self.dispatch(),
                    };
                    if let Err(rejected) = executor.execute(conn) {
                        warn!(peer = ?peer.as_socket(), "No se pudo entregar la conexión (cola llena o sin threads), respondiendo 503");
                        connection::reject(rejected.stream, &Response::service_unavailable());
                    }
                }
                Err(e) => {
                    if self.is_stopped() {
                        break;
                    }
                    warn!(error = %e, "Error al aceptar conexión");
                }
            }
        }

        executor.shutdown();
        info!(address = %self.local_addr, "Accept loop detenido");
        Ok(())
    }

    /// Detiene el accept loop
    ///
    /// Marca el listener como detenido y hace shutdown del socket en ambas
    /// direcciones para desbloquear un `accept` en curso. Las conexiones en
    /// curso no se cancelan. Llamadas repetidas no hacen nada.
    pub fn stop(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        info!(address = %self.local_addr, "Deteniendo listener");

        if let Err(e) = self.socket.shutdown(Shutdown::Both) {
            // Donde shutdown no despierta al accept, una conexión local lo hace
            debug!(error = %e, "shutdown del socket de escucha falló, despertando accept");
            let _ = TcpStream::connect_timeout(&self.wake_addr(), Duration::from_millis(200));
        }
    }

    /// Dirección local alcanzable para despertar al accept
    fn wake_addr(&self) -> SocketAddr {
        let ip = match self.local_addr.ip() {
            IpAddr::V4(ip) if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
            IpAddr::V6(ip) if ip.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
            ip => ip,
        };
        SocketAddr::new(ip, self.local_addr.port())
    }
}

impl Drop for Listener {
    /// El descriptor se cierra al soltar `socket`
    fn drop(&mut self) {
        self.stop();
    }
}
