//! # Estrategias de Concurrencia
//! src/server/pool.rs
//!
//! Cómo se ejecuta cada conexión aceptada:
//!
//! - `ThreadPerConnection`: un thread nuevo y desacoplado por conexión, sin
//!   límite. Es el comportamiento por defecto.
//! - `WorkerPool`: un número fijo de workers que sacan conexiones de una cola
//!   acotada (`Mutex` + `Condvar`). Con la cola llena la conexión se devuelve
//!   al accept loop, que responde 503.
//!
//! En ambos casos `stop()` no espera a las conexiones en curso.

use std::collections::VecDeque;
use std::io;
use std::sync::{mpsc, Arc, Condvar, Mutex, PoisonError};
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

/// Estrategia de concurrencia para las conexiones aceptadas
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Concurrency {
    /// Un thread desacoplado por conexión
    #[default]
    ThreadPerConnection,

    /// Pool fijo de workers con cola acotada
    WorkerPool {
        workers: usize,
        queue_capacity: usize,
    },
}

/// Función que procesa un trabajo
pub(crate) type WorkFn<T> = Arc<dyn Fn(T) + Send + Sync>;

/// Ejecuta trabajos según una [`Concurrency`]
pub(crate) enum Executor<T: Send + 'static> {
    Threads(WorkFn<T>),
    Pool(WorkerPool<T>),
}

impl<T: Send + 'static> Executor<T> {
    /// Prepara la estrategia; el pool lanza sus workers aquí
    pub(crate) fn start(concurrency: Concurrency, work: WorkFn<T>) -> io::Result<Self> {
        match concurrency {
            Concurrency::ThreadPerConnection => Ok(Executor::Threads(work)),
            Concurrency::WorkerPool { workers, queue_capacity } => {
                let pool = WorkerPool::start(workers, queue_capacity, work)?;
                debug!(workers = pool.worker_count(), queue_capacity, "Worker pool iniciado");
                Ok(Executor::Pool(pool))
            }
        }
    }

    /// Entrega un trabajo
    ///
    /// `Err(item)` si el pool tiene la cola llena o si no se pudo lanzar el
    /// thread; el llamador decide qué hacer con él.
    pub(crate) fn execute(&self, item: T) -> Result<(), T> {
        match self {
            Executor::Threads(work) => run_detached(item, Arc::clone(work), spawn_connection_thread),
            Executor::Pool(pool) => pool.submit(item),
        }
    }

    /// Termina la estrategia sin esperar a los trabajos en curso
    pub(crate) fn shutdown(self) {
        if let Executor::Pool(pool) = self {
            pool.close();
        }
    }
}

/// Trabajo ya empaquetado para correr en otro thread
type Job = Box<dyn FnOnce() + Send>;

/// Lanza un thread desacoplado para la conexión; el JoinHandle se descarta
fn spawn_connection_thread(job: Job) -> io::Result<()> {
    thread::Builder::new()
        .name("connection".to_string())
        .spawn(job)
        .map(drop)
}

/// Corre `work(item)` en un thread lanzado por `spawn`
///
/// El item viaja por un canal después del spawn, así que si el thread no se
/// puede lanzar vuelve al llamador como `Err(item)`.
fn run_detached<T, S>(item: T, work: WorkFn<T>, spawn: S) -> Result<(), T>
where
    T: Send + 'static,
    S: FnOnce(Job) -> io::Result<()>,
{
    let (tx, rx) = mpsc::sync_channel::<T>(1);
    let job: Job = Box::new(move || {
        if let Ok(item) = rx.recv() {
            work(item);
        }
    });

    match spawn(job) {
        Ok(()) => tx.send(item).map_err(|mpsc::SendError(item)| item),
        Err(e) => {
            warn!(error = %e, "No se pudo lanzar el thread de la conexión");
            Err(item)
        }
    }
}

struct QueueState<T> {
    items: VecDeque<T>,
    closed: bool,
}

struct Shared<T> {
    state: Mutex<QueueState<T>>,
    available: Condvar,
}

/// Pool fijo de workers con cola acotada
pub(crate) struct WorkerPool<T: Send + 'static> {
    shared: Arc<Shared<T>>,
    capacity: usize,
    workers: Vec<JoinHandle<()>>,
}

impl<T: Send + 'static> WorkerPool<T> {
    /// Lanza `workers` threads (al menos uno)
    pub(crate) fn start(workers: usize, capacity: usize, work: WorkFn<T>) -> io::Result<Self> {
        let shared = Arc::new(Shared {
            state: Mutex::new(QueueState {
                items: VecDeque::with_capacity(capacity),
                closed: false,
            }),
            available: Condvar::new(),
        });

        let mut handles = Vec::with_capacity(workers.max(1));
        for id in 0..workers.max(1) {
            let worker_shared = Arc::clone(&shared);
            let work = Arc::clone(&work);
            let handle = thread::Builder::new()
                .name(format!("worker-{id}"))
                .spawn(move || Self::worker_loop(&worker_shared, &work));

            match handle {
                Ok(handle) => handles.push(handle),
                Err(e) => {
                    // Cerrar la cola para que los workers ya lanzados terminen
                    Self::close_shared(&shared);
                    return Err(e);
                }
            }
        }

        Ok(Self {
            shared,
            capacity,
            workers: handles,
        })
    }

    fn worker_loop(shared: &Shared<T>, work: &WorkFn<T>) {
        loop {
            let item = {
                let mut state = shared.state.lock().unwrap_or_else(PoisonError::into_inner);
                loop {
                    if let Some(item) = state.items.pop_front() {
                        break item;
                    }
                    if state.closed {
                        return;
                    }
                    state = shared
                        .available
                        .wait(state)
                        .unwrap_or_else(PoisonError::into_inner);
                }
            };

            work(item);
        }
    }

    /// Encola un trabajo; `Err(item)` si la cola está llena o cerrada
    pub(crate) fn submit(&self, item: T) -> Result<(), T> {
        let mut state = self.shared.state.lock().unwrap_or_else(PoisonError::into_inner);

        if state.closed || state.items.len() >= self.capacity {
            return Err(item);
        }

        state.items.push_back(item);
        self.shared.available.notify_one();
        Ok(())
    }

    /// Cantidad de workers lanzados
    pub(crate) fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Cantidad de trabajos esperando en la cola
    #[cfg(test)]
    pub(crate) fn queued(&self) -> usize {
        self.shared.state.lock().unwrap_or_else(PoisonError::into_inner).items.len()
    }

    /// Cierra la cola; los workers vacían lo pendiente y terminan solos
    pub(crate) fn close(&self) {
        Self::close_shared(&self.shared);
    }

    fn close_shared(shared: &Shared<T>) {
        let mut state = shared.state.lock().unwrap_or_else(PoisonError::into_inner);
        state.closed = true;
        shared.available.notify_all();
    }

    /// Cierra la cola y espera a que todos los workers terminen
    #[cfg(test)]
    pub(crate) fn join(mut self) {
        self.close();
        for handle in self.workers.drain(..) {
            let _ = handle.join();
        }
    }
}

impl<T: Send + 'static> Drop for WorkerPool<T> {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn test_pool_runs_all_items() {
        let counter = Arc::new(AtomicUsize::new(0));
        let work: WorkFn<usize> = {
            let counter = Arc::clone(&counter);
            Arc::new(move |n| {
                counter.fetch_add(n, Ordering::SeqCst);
            })
        };

        let pool = WorkerPool::start(3, 100, work).unwrap();
        for n in 1..=10 {
            pool.submit(n).unwrap();
        }
        pool.join();

        assert_eq!(counter.load(Ordering::SeqCst), 55);
    }

    #[test]
    fn test_pool_rejects_when_full() {
        // Un worker bloqueado hasta que el test lo libere
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let release_rx = Arc::new(Mutex::new(release_rx));
        let (started_tx, started_rx) = mpsc::channel::<()>();
        let started_tx = Arc::new(Mutex::new(started_tx));

        let work: WorkFn<u32> = Arc::new(move |_| {
            started_tx.lock().unwrap().send(()).unwrap();
            release_rx.lock().unwrap().recv().unwrap();
        });

        let pool = WorkerPool::start(1, 1, work).unwrap();
        pool.submit(1).unwrap();
        started_rx.recv_timeout(Duration::from_secs(5)).unwrap();

        // El worker está ocupado: uno entra en la cola, el siguiente se rechaza
        pool.submit(2).unwrap();
        assert_eq!(pool.queued(), 1);
        assert_eq!(pool.submit(3), Err(3));

        release_tx.send(()).unwrap();
        release_tx.send(()).unwrap();
        pool.join();
    }

    #[test]
    fn test_closed_pool_rejects() {
        let work: WorkFn<u8> = Arc::new(|_| {});
        let pool = WorkerPool::start(1, 4, work).unwrap();
        pool.close();
        assert_eq!(pool.submit(7), Err(7));
        pool.join();
    }

    #[test]
    fn test_zero_workers_still_spawns_one() {
        let (tx, rx) = mpsc::channel();
        let tx = Arc::new(Mutex::new(tx));
        let work: WorkFn<u8> = Arc::new(move |n| {
            tx.lock().unwrap().send(n).unwrap();
        });

        let pool = WorkerPool::start(0, 4, work).unwrap();
        pool.submit(9).unwrap();
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 9);
        pool.join();
    }

    #[test]
    fn test_failed_spawn_returns_item() {
        let ran = Arc::new(AtomicUsize::new(0));
        let work: WorkFn<u8> = {
            let ran = Arc::clone(&ran);
            Arc::new(move |_| {
                ran.fetch_add(1, Ordering::SeqCst);
            })
        };

        let result = run_detached(5u8, work, |_job| Err(io::Error::other("no threads left")));

        assert_eq!(result, Err(5));
        assert_eq!(ran.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_run_detached_hands_item_to_thread() {
        let (tx, rx) = mpsc::channel();
        let tx = Arc::new(Mutex::new(tx));
        let work: WorkFn<u8> = Arc::new(move |n| {
            tx.lock().unwrap().send(n).unwrap();
        });

        run_detached(3u8, work, spawn_connection_thread).unwrap();
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), 3);
    }

    #[test]
    fn test_thread_executor_runs_item() {
        let (tx, rx) = mpsc::channel();
        let tx = Arc::new(Mutex::new(tx));
        let work: WorkFn<&'static str> = Arc::new(move |s| {
            tx.lock().unwrap().send(s).unwrap();
        });

        let executor = Executor::start(Concurrency::ThreadPerConnection, work).unwrap();
        executor.execute("hola").unwrap();
        assert_eq!(rx.recv_timeout(Duration::from_secs(5)).unwrap(), "hola");
        executor.shutdown();
    }
}
