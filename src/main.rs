//! # Mini HTTP Server - Entry Point
//! src/main.rs
//!
//! Binario de demostración: registra unas pocas rutas, arranca el servidor y
//! espera SIGINT/SIGTERM para detenerlo.

use mini_httpd::config::Config;
use mini_httpd::error::ServerError;
use mini_httpd::http::{Request, Response};
use mini_httpd::logging;
use mini_httpd::router::Router;
use serde::Serialize;
use serde_json::json;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{error, info};

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html>
<head><title>mini_httpd</title></head>
<body>
    <p>Server is running successfully!</p>
    <h2>Available Endpoints:</h2>
    <ul>
        <li><strong>GET /</strong> - This page</li>
        <li><strong>GET /api/status</strong> - Server status (JSON)</li>
        <li><strong>GET /api/time</strong> - Current time (JSON)</li>
        <li><strong>POST /api/echo</strong> - Echo request data</li>
        <li><strong>GET /hello</strong> - Greeting</li>
    </ul>
</body>
</html>"#;

#[derive(Serialize)]
struct Status {
    status: &'static str,
    server: &'static str,
    version: &'static str,
}

fn status(_req: &Request) -> Result<Response, mini_httpd::HandlerError> {
    Response::json_value(&Status {
        status: "running",
        server: "mini_httpd",
        version: env!("CARGO_PKG_VERSION"),
    })
}

fn time(_req: &Request) -> Result<Response, mini_httpd::HandlerError> {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    Response::json_value(&json!({ "timestamp": timestamp }))
}

fn echo(req: &Request) -> Result<Response, mini_httpd::HandlerError> {
    Response::json_value(&json!({
        "method": req.method(),
        "path": req.path(),
        "body": String::from_utf8_lossy(req.body()),
    }))
}

// El path se compara exacto: `/hello?name=x` no llega aquí
fn hello(_req: &Request) -> Response {
    Response::html("<!DOCTYPE html><html><body><h1>Hello, World!</h1><p><a href=\"/\">Back to home</a></p></body></html>")
}

fn run(config: &Config) -> Result<(), ServerError> {
    let mut router = Router::with_config(config)?;

    router.get("/", |_req| Response::html(INDEX_HTML));
    router.get("/api/status", status);
    router.get("/api/time", time);
    router.post("/api/echo", echo);
    router.get("/hello", hello);

    let shutdown = Arc::new(AtomicBool::new(false));
    register_signals(&shutdown);

    router.start()?;
    info!(address = %router.local_addr(), "Presiona Ctrl+C para detener el servidor");

    while !shutdown.load(Ordering::SeqCst) {
        thread::sleep(Duration::from_millis(100));
    }

    info!("Señal recibida, deteniendo servidor");
    router.stop();
    Ok(())
}

#[cfg(unix)]
fn register_signals(shutdown: &Arc<AtomicBool>) {
    use signal_hook::consts::{SIGINT, SIGTERM};

    for signal in [SIGINT, SIGTERM] {
        if let Err(e) = signal_hook::flag::register(signal, Arc::clone(shutdown)) {
            error!(signal, error = %e, "No se pudo registrar el handler de señal");
        }
    }
}

#[cfg(not(unix))]
fn register_signals(_shutdown: &Arc<AtomicBool>) {}

fn main() {
    let config = Config::new();
    logging::init(&config.log_level);

    info!(
        port = config.port,
        host = %config.host,
        concurrency = ?config.concurrency(),
        "Configuración cargada"
    );

    if let Err(e) = run(&config) {
        error!(error = %e, "Error fatal");
        std::process::exit(1);
    }

    info!("Servidor detenido correctamente");
}
