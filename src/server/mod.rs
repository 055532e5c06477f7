//! # Módulo del Servidor
//! src/server/mod.rs
//!
//! Todo lo que toca sockets:
//! 1. Escucha en un puerto (`listener`)
//! 2. Acepta conexiones y las reparte según la estrategia (`pool`)
//! 3. Lee, parsea, despacha y responde cada conexión (`connection`)

mod connection;
pub mod listener;
pub mod pool;

// Re-exportar para facilitar el uso
pub use listener::{Dispatch, DispatchFn, Listener};
pub use pool::Concurrency;
