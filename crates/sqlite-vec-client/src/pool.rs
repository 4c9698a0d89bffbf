//! Per-thread connection pool.
//!
//! A SQLite connection must not be used from two threads at once, so the pool
//! never shares one between threads. Each thread gets its own connection on
//! first request and keeps it; "returning" it is a no-op. Once `max_size`
//! threads hold a connection, further threads are refused rather than made
//! to wait.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread::{self, ThreadId};

use rusqlite::Connection;

use crate::connection::create_connection;
use crate::error::{Result, VecClientError};

/// Handle to a pool-owned connection. The slot is emptied when the pool
/// closes the connection; clients still holding the handle then get
/// [`VecClientError::Connection`].
pub type PooledConnection = Arc<Mutex<Option<Connection>>>;

/// Default number of connections (threads) a pool serves.
pub const DEFAULT_POOL_SIZE: usize = 5;

type ConnectionFactory = Box<dyn Fn() -> Result<Connection> + Send + Sync>;

#[derive(Default)]
struct PoolState {
    by_thread: HashMap<ThreadId, PooledConnection>,
    created: usize,
}

/// Bounded pool handing out one connection per calling thread.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use sqlite_vec_client::{ConnectionPool, VecClient};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = Arc::new(ConnectionPool::open("/tmp/vectors.db", 4)?);
/// let client = VecClient::with_pool("documents", Arc::clone(&pool))?;
/// # Ok(())
/// # }
/// ```
pub struct ConnectionPool {
    factory: ConnectionFactory,
    max_size: usize,
    state: Mutex<PoolState>,
}

impl std::fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("max_size", &self.max_size)
            .finish_non_exhaustive()
    }
}

impl ConnectionPool {
    /// Create a pool that builds connections with `factory`.
    pub fn new<F>(factory: F, max_size: usize) -> Result<Self>
    where
        F: Fn() -> Result<Connection> + Send + Sync + 'static,
    {
        if max_size == 0 {
            return Err(VecClientError::Validation(
                "pool_size must be at least 1".to_string(),
            ));
        }
        tracing::debug!(max_size, "initialized connection pool");
        Ok(Self {
            factory: Box::new(factory),
            max_size,
            state: Mutex::new(PoolState::default()),
        })
    }

    /// Create a pool of connections to the database at `path`.
    pub fn open(path: impl Into<PathBuf>, max_size: usize) -> Result<Self> {
        let path = path.into();
        Self::new(move || create_connection(&path), max_size)
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Number of connections created since construction or the last
    /// [`close_all`](Self::close_all).
    pub fn size(&self) -> usize {
        self.lock().map(|s| s.created).unwrap_or(0)
    }

    /// Return the calling thread's connection, creating it on first use.
    pub fn get_connection(&self) -> Result<PooledConnection> {
        let thread = thread::current().id();
        let mut state = self.lock()?;

        if let Some(conn) = state.by_thread.get(&thread) {
            tracing::debug!(?thread, "reused thread connection");
            return Ok(Arc::clone(conn));
        }

        if state.created >= self.max_size {
            tracing::warn!(max_size = self.max_size, "connection pool exhausted");
            return Err(VecClientError::PoolExhausted { max: self.max_size });
        }

        let conn = Arc::new(Mutex::new(Some((self.factory)()?)));
        state.created += 1;
        state.by_thread.insert(thread, Arc::clone(&conn));
        tracing::debug!(
            ?thread,
            created = state.created,
            max_size = self.max_size,
            "created pooled connection"
        );
        Ok(conn)
    }

    /// Connections stay bound to their thread, so this only logs.
    pub fn return_connection(&self, _conn: &PooledConnection) {
        tracing::debug!("connection kept for its thread");
    }

    /// Close every tracked connection and reset the pool.
    ///
    /// Connections still referenced by live clients are closed too; those
    /// clients fail with [`VecClientError::Connection`] from then on. Close
    /// failures are logged, never returned.
    pub fn close_all(&self) {
        let drained: Vec<PooledConnection> = match self.lock() {
            Ok(mut state) => {
                state.created = 0;
                state.by_thread.drain().map(|(_, conn)| conn).collect()
            }
            Err(e) => {
                tracing::warn!(error = %e, "cannot close pool connections");
                return;
            }
        };

        let mut closed = 0usize;
        for slot in drained {
            let taken = slot.lock().unwrap_or_else(|p| p.into_inner()).take();
            let Some(conn) = taken else {
                continue;
            };
            if Arc::strong_count(&slot) > 1 {
                tracing::debug!("closing connection still held by a client");
            }
            match conn.close() {
                Ok(()) => closed += 1,
                Err((_, e)) => tracing::warn!(error = %e, "error closing connection"),
            }
        }
        tracing::info!(closed, "closed pool connections");
    }

    fn lock(&self) -> Result<MutexGuard<'_, PoolState>> {
        self.state
            .lock()
            .map_err(|e| VecClientError::Connection(format!("pool lock poisoned: {e}")))
    }
}

impl Drop for ConnectionPool {
    fn drop(&mut self) {
        self.close_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn memory_pool(size: usize) -> ConnectionPool {
        ConnectionPool::new(|| Ok(Connection::open_in_memory()?), size).unwrap()
    }

    #[test]
    fn zero_size_is_rejected() {
        let err = ConnectionPool::new(|| Ok(Connection::open_in_memory()?), 0).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn same_thread_reuses_connection() {
        let pool = memory_pool(2);
        let a = pool.get_connection().unwrap();
        let b = pool.get_connection().unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(pool.size(), 1);
    }

    #[test]
    fn factory_called_once_per_thread() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let pool = ConnectionPool::new(
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Connection::open_in_memory()?)
            },
            3,
        )
        .unwrap();
        for _ in 0..4 {
            pool.get_connection().unwrap();
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn factory_failure_does_not_consume_capacity() {
        let pool = ConnectionPool::new(
            || Err(VecClientError::Connection("refused".into())),
            1,
        )
        .unwrap();
        assert!(matches!(
            pool.get_connection().unwrap_err(),
            VecClientError::Connection(_)
        ));
        assert_eq!(pool.size(), 0);
    }

    #[test]
    fn close_all_resets_counter() {
        let pool = memory_pool(1);
        drop(pool.get_connection().unwrap());
        pool.close_all();
        assert_eq!(pool.size(), 0);
        let fresh = pool.get_connection().unwrap();
        assert_eq!(pool.size(), 1);
        drop(fresh);
    }

    #[test]
    fn close_all_closes_connections_in_use() {
        let pool = memory_pool(1);
        let held = pool.get_connection().unwrap();
        assert!(held.lock().unwrap().is_some());
        pool.close_all();
        assert_eq!(pool.size(), 0);
        assert!(held.lock().unwrap().is_none());
    }
}
