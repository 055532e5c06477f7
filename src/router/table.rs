//! # Tabla de Rutas
//! src/router/table.rs
//!
//! Mapa método → path exacto → handler. Sin comodines, prefijos ni
//! parámetros: el path se compara byte a byte con el path crudo del request,
//! así que `/hello?name=x` no coincide con una ruta `/hello`.

use crate::error::HandlerError;
use crate::http::{Method, Request, Response};
use std::collections::HashMap;
use std::sync::Arc;

/// Handler registrado para una ruta
pub type Handler = Arc<dyn Fn(&Request) -> Result<Response, HandlerError> + Send + Sync>;

/// Lo que un handler puede retornar
///
/// Permite registrar tanto handlers infalibles (`-> Response`) como
/// falibles (`-> Result<Response, E>` con `E: Into<HandlerError>`).
pub trait IntoHandlerResult {
    fn into_handler_result(self) -> Result<Response, HandlerError>;
}

impl IntoHandlerResult for Response {
    fn into_handler_result(self) -> Result<Response, HandlerError> {
        Ok(self)
    }
}

impl<E: Into<HandlerError>> IntoHandlerResult for Result<Response, E> {
    fn into_handler_result(self) -> Result<Response, HandlerError> {
        self.map_err(Into::into)
    }
}

/// Tabla de rutas
#[derive(Clone, Default)]
pub struct RouteTable {
    routes: HashMap<Method, HashMap<String, Handler>>,
}

impl RouteTable {
    /// Crea una tabla vacía
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserta o reemplaza el handler de (método, path)
    ///
    /// Retorna `true` si reemplazó uno existente.
    pub fn insert(&mut self, method: Method, path: &str, handler: Handler) -> bool {
        self.routes
            .entry(method)
            .or_default()
            .insert(path.to_string(), handler)
            .is_some()
    }

    /// Busca el handler para un token de método y un path crudo
    pub fn lookup(&self, method: &str, path: &str) -> Option<&Handler> {
        let method = Method::from_token(method)?;
        self.routes.get(&method)?.get(path)
    }

    /// Invoca el handler que coincide o retorna el 404 fijo
    pub fn dispatch(&self, request: &Request) -> Result<Response, HandlerError> {
        match self.lookup(request.method(), request.path()) {
            Some(handler) => handler(request),
            None => Ok(Response::not_found()),
        }
    }

    /// Cantidad total de rutas registradas
    pub fn len(&self) -> usize {
        self.routes.values().map(HashMap::len).sum()
    }

    /// `true` si no hay rutas
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for RouteTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut routes: Vec<String> = self
            .routes
            .iter()
            .flat_map(|(method, paths)| paths.keys().map(move |path| format!("{method} {path}")))
            .collect();
        routes.sort();
        f.debug_struct("RouteTable").field("routes", &routes).finish()
    }
}
