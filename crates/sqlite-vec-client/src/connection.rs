use std::path::Path;
use std::sync::Once;
use std::time::Duration;

use rusqlite::Connection;

use crate::error::{Result, VecClientError};

/// Path that opens a private in-memory database.
pub const IN_MEMORY: &str = ":memory:";

/// How long a statement waits on another connection's write lock.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Register sqlite-vec as an auto-extension so every connection opened by
/// this process gets `vec0` and the `vec_*` functions.
fn ensure_sqlite_vec_loaded() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        // SAFETY: `sqlite3_vec_init` is the extension entry point compiled into
        // the sqlite-vec crate and linked against the same SQLite as rusqlite.
        // SQLite calls auto-extensions with the standard entry point signature;
        // the cast only restores that signature, which the crate declares
        // without arguments.
        unsafe {
            rusqlite::ffi::sqlite3_auto_extension(Some(std::mem::transmute::<*const (), _>(
                sqlite_vec::sqlite3_vec_init as *const (),
            )));
        }
        tracing::debug!("registered sqlite-vec auto-extension");
    });
}

/// Open a connection with sqlite-vec available and the client's pragmas
/// applied. `path` may be a file or [`IN_MEMORY`].
pub fn create_connection(path: impl AsRef<Path>) -> Result<Connection> {
    let path = path.as_ref();
    ensure_sqlite_vec_loaded();
    tracing::debug!(path = %path.display(), "connecting to database");

    let conn = Connection::open(path).map_err(|e| {
        tracing::error!(path = %path.display(), error = %e, "failed to open database");
        VecClientError::Connection(format!("failed to connect to database: {e}"))
    })?;

    configure(&conn).map_err(|e| {
        tracing::error!(path = %path.display(), error = %e, "failed to configure connection");
        VecClientError::Connection(format!("failed to configure connection: {e}"))
    })?;

    tracing::info!(path = %path.display(), "connected to database");
    Ok(conn)
}

fn configure(conn: &Connection) -> rusqlite::Result<()> {
    // Fails loudly if the extension did not load.
    let _version: String = conn.query_row("SELECT vec_version()", [], |row| row.get(0))?;

    // journal_mode reports the resulting mode as a row (`memory` for in-memory
    // databases), so it is read rather than executed.
    let _mode: String = conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "cache_size", -64_000)?;
    conn.pragma_update(None, "temp_store", "MEMORY")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_connection_has_vec_extension() {
        let conn = create_connection(IN_MEMORY).unwrap();
        let version: String = conn
            .query_row("SELECT vec_version()", [], |r| r.get(0))
            .unwrap();
        assert!(version.starts_with('v'));
    }

    #[test]
    fn unopenable_path_is_a_connection_error() {
        let err = create_connection("/nonexistent-dir/definitely/missing.db").unwrap_err();
        assert!(matches!(err, VecClientError::Connection(_)));
    }
}
