//! # Manejo de una Conexión
//! src/server/connection.rs
//!
//! Secuencia que corre en el thread (o worker) de cada conexión aceptada:
//!
//! 1. Una lectura bloqueante de hasta `read_buffer_size` bytes. Cero bytes =
//!    el cliente cerró; se termina sin respuesta.
//! 2. Si el head declara `Content-Length`, se sigue leyendo hasta completar el
//!    body (o hasta que el cliente cierre). Por encima de `max_body_bytes` se
//!    responde 413 sin despachar y se drena lo que el cliente siga enviando.
//! 3. Parse permisivo y llamada al dispatch. Un `Err` o un pánico del handler
//!    se convierten en el 500 fijo.
//! 4. Una escritura con la respuesta serializada y cierre del socket.

use super::listener::Dispatch;
use crate::error::HandlerError;
use crate::http::{Request, Response};
use std::any::Any;
use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream};
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};
use tracing::{debug, error, warn};

/// Tope de bytes descartados al cerrar una conexión rechazada
const DRAIN_MAX_BYTES: usize = 1024 * 1024;

/// Tiempo máximo esperando a que el cliente termine de enviar tras un rechazo
const DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Límites de lectura por conexión
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ConnectionLimits {
    pub read_buffer_size: usize,
    pub max_body_bytes: usize,
}

/// Conexión aceptada junto con el dispatch vigente al momento del accept
pub(crate) struct Connection {
    pub stream: TcpStream,
    pub dispatch: Dispatch,
}

/// Procesa una conexión completa; el socket se cierra al retornar
pub(crate) fn handle_connection(
    mut stream: TcpStream,
    dispatch: &Dispatch,
    limits: ConnectionLimits,
) -> io::Result<()> {
    let start = Instant::now();

    let mut buffer = vec![0u8; limits.read_buffer_size];
    let bytes_read = stream.read(&mut buffer)?;

    if bytes_read == 0 {
        debug!("Conexión cerrada por el cliente sin enviar datos");
        return Ok(());
    }
    buffer.truncate(bytes_read);

    let mut request = Request::parse(&buffer);

    let mut rejected = false;
    let response = match request.content_length() {
        Some(declared) if declared > limits.max_body_bytes => {
            warn!(
                declared,
                max = limits.max_body_bytes,
                path = request.path(),
                "Body demasiado grande, respondiendo 413"
            );
            rejected = true;
            Response::payload_too_large()
        }
        Some(declared) => {
            if request.body().len() < declared {
                if let Some(offset) = Request::body_offset(&buffer) {
                    read_until(&mut stream, &mut buffer, offset + declared)?;
                    request = Request::parse(&buffer);
                }
            }
            invoke(dispatch, &request)
        }
        None => invoke(dispatch, &request),
    };

    stream.write_all(&response.to_bytes())?;
    stream.flush()?;

    debug!(
        method = request.method(),
        path = request.path(),
        status = response.status_code(),
        latency_ms = start.elapsed().as_secs_f64() * 1000.0,
        "Request atendido"
    );

    if rejected {
        drain_and_close(stream);
    }

    Ok(())
}

/// Sigue leyendo hasta tener `target` bytes en `buffer` o hasta EOF
fn read_until(stream: &mut TcpStream, buffer: &mut Vec<u8>, target: usize) -> io::Result<()> {
    let mut chunk = [0u8; 4096];

    while buffer.len() < target {
        let wanted = (target - buffer.len()).min(chunk.len());
        let n = stream.read(&mut chunk[..wanted])?;
        if n == 0 {
            debug!(missing = target - buffer.len(), "Cliente cerró antes de completar el body");
            break;
        }
        buffer.extend_from_slice(&chunk[..n]);
    }

    Ok(())
}

/// Llama al dispatch; errores y pánicos terminan en el 500 fijo
pub(crate) fn invoke(dispatch: &Dispatch, request: &Request) -> Response {
    let outcome = panic::catch_unwind(AssertUnwindSafe(|| dispatch(request)))
        .unwrap_or_else(|payload| Err(HandlerError::Panicked(panic_message(payload.as_ref()))));

    match outcome {
        Ok(response) => response,
        Err(e) => {
            error!(
                method = request.method(),
                path = request.path(),
                error = %e,
                "El handler falló, respondiendo 500"
            );
            Response::internal_error()
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Responde directamente sin leer el request (usado para el 503 del pool)
pub(crate) fn reject(mut stream: TcpStream, response: &Response) {
    if let Err(e) = stream.write_all(&response.to_bytes()).and_then(|_| stream.flush()) {
        debug!(error = %e, "No se pudo enviar la respuesta de rechazo");
        return;
    }
    drain_and_close(stream);
}

/// Cierra la escritura y descarta lo que el cliente aún esté enviando
///
/// Cerrar con bytes sin leer en el buffer de recepción hace que el kernel
/// mande RST, y el cliente puede perder la respuesta ya escrita. Acotado por
/// `DRAIN_MAX_BYTES` y `DRAIN_TIMEOUT`.
fn drain_and_close(mut stream: TcpStream) {
    if stream.shutdown(Shutdown::Write).is_err() {
        return;
    }

    let deadline = Instant::now() + DRAIN_TIMEOUT;
    let mut chunk = [0u8; 4096];
    let mut drained = 0usize;

    while drained < DRAIN_MAX_BYTES {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() || stream.set_read_timeout(Some(remaining)).is_err() {
            break;
        }
        match stream.read(&mut chunk) {
            Ok(0) | Err(_) => break,
            Ok(n) => drained += n,
        }
    }

    debug!(drained, "Conexión rechazada cerrada");
}
