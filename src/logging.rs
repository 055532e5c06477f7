//! Logging estructurado con `tracing`.
//!
//! La librería solo emite eventos; instalar el subscriber es cosa del binario
//! (o de quien embeba el motor).

use tracing_subscriber::EnvFilter;

/// Instala un subscriber `fmt` con filtro por nivel
///
/// `RUST_LOG` tiene prioridad sobre `default_level`. Si ya había un subscriber
/// global no hace nada y retorna `false`.
pub fn init(default_level: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("mini_httpd={default_level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_thread_names(true)
        .try_init()
        .is_ok()
}
