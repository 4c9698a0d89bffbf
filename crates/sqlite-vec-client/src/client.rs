use std::cell::Cell;
use std::path::Path;
use std::sync::Arc;

use rusqlite::types::Value as SqlValue;
use rusqlite::{
    params, params_from_iter, Connection, OptionalExtension, Row, Transaction, TransactionBehavior,
};

use crate::codec;
use crate::connection::{create_connection, IN_MEMORY};
use crate::error::{Result, VecClientError};
use crate::filter::{compile, MetadataFilter};
use crate::io::{self, ExportOptions, ImportOptions};
use crate::pool::{ConnectionPool, PooledConnection};
use crate::scan::RecordIter;
use crate::schema::{self, index_table, DistanceMetric};
use crate::types::{Metadata, Record, RecordUpdate, Rowid, SearchHit};
use crate::validation::{
    validate_dimension, validate_embedding_dimension, validate_lengths_match, validate_limit,
    validate_metadata_filter, validate_offset, validate_table_name, validate_top_k,
};

/// SQLite caps bound parameters per statement (999 on old builds), so bulk
/// statements keyed by rowid are split into chunks of this size.
const MAX_PARAMS_PER_STATEMENT: usize = 500;

/// Page size used by [`VecClient::get_all`] callers that have no preference.
pub const DEFAULT_BATCH_SIZE: usize = 100;

const RECORD_COLUMNS: &str = "rowid, text, metadata, text_embedding";

enum Handle {
    Owned(Connection),
    Pooled {
        conn: PooledConnection,
        pool: Arc<ConnectionPool>,
    },
}

/// Client for one record table and its `vec0` index.
///
/// The client keeps two tables in one database:
/// - `{table}` with `text`, JSON `metadata` and the raw `text_embedding` blob;
/// - `{table}_vec`, a `vec0` virtual table the triggers mirror embeddings into.
///
/// Outside [`transaction`](Self::transaction) every mutating call commits
/// before returning. A client is bound to the thread that created it.
///
/// # Example
///
/// ```rust,no_run
/// use sqlite_vec_client::{DistanceMetric, VecClient};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = VecClient::open("documents", "/tmp/vectors.db")?;
/// client.create_table(3, DistanceMetric::Cosine)?;
/// let ids = client.add(&["hello", "world"], &[[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]], None)?;
/// let hits = client.similarity_search(&[1.0, 0.0, 0.0], 1)?;
/// assert_eq!(hits[0].rowid, ids[0]);
/// # Ok(())
/// # }
/// ```
pub struct VecClient {
    table: String,
    handle: Handle,
    dimension: Cell<Option<usize>>,
    in_transaction: Cell<bool>,
}

impl std::fmt::Debug for VecClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VecClient")
            .field("table", &self.table)
            .field("dimension", &self.dimension.get())
            .field("in_transaction", &self.in_transaction.get())
            .finish_non_exhaustive()
    }
}

impl VecClient {
    /// Open a dedicated connection to the database at `path`.
    pub fn open(table: impl Into<String>, path: impl AsRef<Path>) -> Result<Self> {
        let table = table.into();
        validate_table_name(&table)?;
        let conn = create_connection(path)?;
        Ok(Self::from_handle(table, Handle::Owned(conn)))
    }

    /// Open a client over a private in-memory database.
    pub fn in_memory(table: impl Into<String>) -> Result<Self> {
        Self::open(table, IN_MEMORY)
    }

    /// Wrap an already configured connection; the client takes ownership and
    /// closes it on [`close`](Self::close).
    pub fn with_connection(table: impl Into<String>, conn: Connection) -> Result<Self> {
        let table = table.into();
        validate_table_name(&table)?;
        Ok(Self::from_handle(table, Handle::Owned(conn)))
    }

    /// Use the calling thread's connection from `pool`.
    ///
    /// Clients created on the same thread share one connection. While any of
    /// them is inside [`transaction`](Self::transaction), writes through the
    /// others join that transaction and commit or roll back with it.
    pub fn with_pool(table: impl Into<String>, pool: Arc<ConnectionPool>) -> Result<Self> {
        let table = table.into();
        validate_table_name(&table)?;
        let conn = pool.get_connection()?;
        tracing::debug!(table = %table, "using pooled connection");
        Ok(Self::from_handle(table, Handle::Pooled { conn, pool }))
    }

    fn from_handle(table: String, handle: Handle) -> Self {
        tracing::debug!(table = %table, "initialized client");
        Self {
            table,
            handle,
            dimension: Cell::new(None),
            in_transaction: Cell::new(false),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// True while inside [`transaction`](Self::transaction).
    pub fn in_transaction(&self) -> bool {
        self.in_transaction.get()
    }

    /// Embedding dimension of the index, or `None` if the table has not been
    /// provisioned.
    pub fn dimension(&self) -> Result<Option<usize>> {
        if let Some(dim) = self.dimension.get() {
            return Ok(Some(dim));
        }
        let found = self.with_conn(|conn| schema::discover_dimension(conn, &self.table))?;
        self.dimension.set(found);
        Ok(found)
    }

    // -----------------------------------------------------------------------
    // Schema
    // -----------------------------------------------------------------------

    /// Create the record table, the `vec0` index and the sync triggers.
    ///
    /// Idempotent: on an already provisioned table this changes nothing, and
    /// the dimension of the existing index stays authoritative.
    pub fn create_table(&self, dim: usize, distance: DistanceMetric) -> Result<()> {
        validate_dimension(dim)?;
        tracing::info!(table = %self.table, dim, %distance, "creating table");
        self.write(|conn| schema::provision(conn, &self.table, dim, distance))?;
        self.dimension.set(None);
        let bound = self.dimension()?;
        if bound != Some(dim) {
            tracing::warn!(
                table = %self.table,
                requested = dim,
                existing = ?bound,
                "table already provisioned with a different dimension"
            );
        }
        tracing::debug!(table = %self.table, "table and triggers ready");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Create
    // -----------------------------------------------------------------------

    /// Insert records and return their rowids in input order.
    ///
    /// Metadata defaults to `{}` per record. Shapes and embedding dimensions
    /// are checked before anything is written; on error nothing is inserted.
    pub fn add<S, E>(
        &self,
        texts: &[S],
        embeddings: &[E],
        metadata: Option<&[Metadata]>,
    ) -> Result<Vec<Rowid>>
    where
        S: AsRef<str>,
        E: AsRef<[f32]>,
    {
        validate_lengths_match(texts.len(), embeddings.len(), metadata.map(<[_]>::len))?;
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let dim = self.require_dimension()?;
        for embedding in embeddings {
            validate_embedding_dimension(embedding.as_ref(), dim)?;
        }
        tracing::debug!(table = %self.table, count = texts.len(), "adding records");

        let empty = Metadata::new();
        let mut rows = Vec::with_capacity(texts.len());
        for (i, (text, embedding)) in texts.iter().zip(embeddings).enumerate() {
            let md = metadata.map_or(&empty, |m| &m[i]);
            rows.push((
                text.as_ref(),
                serde_json::to_string(md)?,
                codec::encode(embedding.as_ref()),
            ));
        }

        let sql = format!(
            "INSERT INTO {}(text, metadata, text_embedding) VALUES (?1, ?2, ?3)",
            self.table
        );
        let rowids = self.write(|conn| {
            let mut stmt = conn.prepare_cached(&sql)?;
            let mut rowids = Vec::with_capacity(rows.len());
            for (text, md, blob) in &rows {
                rowids.push(stmt.insert(params![text, md, blob])?);
            }
            Ok(rowids)
        })?;

        tracing::info!(table = %self.table, count = rowids.len(), "added records");
        Ok(rowids)
    }

    // -----------------------------------------------------------------------
    // Read
    // -----------------------------------------------------------------------

    /// Number of rows in the record table.
    pub fn count(&self) -> Result<usize> {
        let sql = format!("SELECT COUNT(1) FROM {}", self.table);
        let n: i64 = self.with_conn(|conn| Ok(conn.query_row(&sql, [], |row| row.get(0))?))?;
        Ok(n.max(0) as usize)
    }

    pub fn get(&self, rowid: Rowid) -> Result<Option<Record>> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM {} WHERE rowid = ?1", self.table);
        self.with_conn(|conn| {
            Ok(conn
                .query_row(&sql, params![rowid], row_to_record)
                .optional()?)
        })
    }

    /// Fetch several records, ordered by rowid. Missing rowids are skipped.
    pub fn get_many(&self, rowids: &[Rowid]) -> Result<Vec<Record>> {
        if rowids.is_empty() {
            return Ok(Vec::new());
        }
        let mut records = Vec::with_capacity(rowids.len());
        self.with_conn(|conn| {
            for chunk in rowids.chunks(MAX_PARAMS_PER_STATEMENT) {
                let sql = format!(
                    "SELECT {RECORD_COLUMNS} FROM {} WHERE rowid IN ({}) ORDER BY rowid",
                    self.table,
                    placeholders(chunk.len())
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(params_from_iter(chunk), row_to_record)?;
                for row in rows {
                    records.push(row?);
                }
            }
            Ok(())
        })?;
        records.sort_by_key(|r| r.rowid);
        Ok(records)
    }

    /// Lazily iterate every record in ascending rowid order, `batch_size`
    /// rows per query. Rows inserted above the cursor during iteration are
    /// picked up; there is no snapshot.
    pub fn get_all(&self, batch_size: usize) -> Result<RecordIter<'_>> {
        validate_limit(batch_size)?;
        tracing::debug!(table = %self.table, batch_size, "scanning all records");
        Ok(RecordIter::new(self, batch_size))
    }

    pub(crate) fn fetch_page(&self, after: Rowid, limit: usize) -> Result<Vec<Record>> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM {} WHERE rowid > ?1 ORDER BY rowid ASC LIMIT ?2",
            self.table
        );
        self.with_conn(|conn| {
            let mut stmt = conn.prepare_cached(&sql)?;
            let rows = stmt.query_map(params![after, limit as i64], row_to_record)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })
    }

    // -----------------------------------------------------------------------
    // Update
    // -----------------------------------------------------------------------

    /// Apply one update. Returns whether a row changed; an update with no
    /// fields, or for a missing rowid, returns `false`.
    pub fn update(&self, update: &RecordUpdate) -> Result<bool> {
        tracing::debug!(table = %self.table, rowid = update.rowid, "updating record");
        let changed = self.update_many(std::slice::from_ref(update))? > 0;
        if changed {
            tracing::debug!(table = %self.table, rowid = update.rowid, "updated record");
        }
        Ok(changed)
    }

    /// Apply several updates atomically and return how many rows changed.
    pub fn update_many(&self, updates: &[RecordUpdate]) -> Result<usize> {
        if updates.iter().all(RecordUpdate::is_empty) {
            return Ok(0);
        }
        if updates.iter().any(|u| u.embedding.is_some()) {
            let dim = self.require_dimension()?;
            for embedding in updates.iter().filter_map(|u| u.embedding.as_deref()) {
                validate_embedding_dimension(embedding, dim)?;
            }
        }

        let mut statements = Vec::with_capacity(updates.len());
        for update in updates {
            if let Some(stmt) = self.update_statement(update)? {
                statements.push(stmt);
            }
        }

        let changed = self.write(|conn| {
            let mut changed = 0usize;
            for (sql, values) in &statements {
                changed += conn.execute(sql, params_from_iter(values))?;
            }
            Ok(changed)
        })?;

        if updates.len() > 1 {
            tracing::info!(table = %self.table, count = changed, "updated records");
        }
        Ok(changed)
    }

    fn update_statement(&self, update: &RecordUpdate) -> Result<Option<(String, Vec<SqlValue>)>> {
        let mut sets = Vec::with_capacity(3);
        let mut values = Vec::with_capacity(4);
        if let Some(text) = &update.text {
            sets.push("text = ?");
            values.push(SqlValue::Text(text.clone()));
        }
        if let Some(metadata) = &update.metadata {
            sets.push("metadata = ?");
            values.push(SqlValue::Text(serde_json::to_string(metadata)?));
        }
        if let Some(embedding) = &update.embedding {
            sets.push("text_embedding = ?");
            values.push(SqlValue::Blob(codec::encode(embedding)));
        }
        if sets.is_empty() {
            return Ok(None);
        }
        values.push(SqlValue::Integer(update.rowid));
        let sql = format!(
            "UPDATE {} SET {} WHERE rowid = ?",
            self.table,
            sets.join(", ")
        );
        Ok(Some((sql, values)))
    }

    // -----------------------------------------------------------------------
    // Delete
    // -----------------------------------------------------------------------

    pub fn delete(&self, rowid: Rowid) -> Result<bool> {
        tracing::debug!(table = %self.table, rowid, "deleting record");
        let sql = format!("DELETE FROM {} WHERE rowid = ?1", self.table);
        let deleted = self.write(|conn| Ok(conn.execute(&sql, params![rowid])?))? > 0;
        if deleted {
            tracing::debug!(table = %self.table, rowid, "deleted record");
        }
        Ok(deleted)
    }

    /// Delete several records atomically and return how many were removed.
    pub fn delete_many(&self, rowids: &[Rowid]) -> Result<usize> {
        if rowids.is_empty() {
            return Ok(0);
        }
        tracing::debug!(table = %self.table, count = rowids.len(), "deleting records");
        let deleted = self.write(|conn| {
            let mut deleted = 0usize;
            for chunk in rowids.chunks(MAX_PARAMS_PER_STATEMENT) {
                let sql = format!(
                    "DELETE FROM {} WHERE rowid IN ({})",
                    self.table,
                    placeholders(chunk.len())
                );
                deleted += conn.execute(&sql, params_from_iter(chunk))?;
            }
            Ok(deleted)
        })?;
        tracing::info!(table = %self.table, count = deleted, "deleted records");
        Ok(deleted)
    }

    // -----------------------------------------------------------------------
    // Metadata queries
    // -----------------------------------------------------------------------

    /// Records whose metadata matches every condition, by ascending rowid.
    pub fn filter_by_metadata(
        &self,
        filter: &MetadataFilter,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Record>> {
        validate_metadata_filter(filter)?;
        validate_limit(limit)?;
        let offset = validate_offset(offset)?;
        tracing::debug!(table = %self.table, ?filter, limit, offset, "filtering by metadata");

        let compiled = compile(filter);
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM {} WHERE {} ORDER BY rowid ASC LIMIT ? OFFSET ?",
            self.table, compiled.predicate
        );
        let mut values = compiled.params;
        values.push(SqlValue::Integer(limit as i64));
        values.push(SqlValue::Integer(offset));

        let records = self.with_conn(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(&values), row_to_record)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })?;
        tracing::debug!(table = %self.table, count = records.len(), "metadata filter matched");
        Ok(records)
    }

    pub fn count_by_metadata(&self, filter: &MetadataFilter) -> Result<usize> {
        validate_metadata_filter(filter)?;
        let compiled = compile(filter);
        let sql = format!(
            "SELECT COUNT(1) FROM {} WHERE {}",
            self.table, compiled.predicate
        );
        let n: i64 = self.with_conn(|conn| {
            Ok(conn.query_row(&sql, params_from_iter(&compiled.params), |row| row.get(0))?)
        })?;
        Ok(n.max(0) as usize)
    }

    // -----------------------------------------------------------------------
    // Similarity search
    // -----------------------------------------------------------------------

    /// The `top_k` nearest records to `embedding`, nearest first.
    pub fn similarity_search(&self, embedding: &[f32], top_k: usize) -> Result<Vec<SearchHit>> {
        validate_top_k(top_k)?;
        validate_embedding_dimension(embedding, self.require_dimension()?)?;
        tracing::debug!(table = %self.table, top_k, "similarity search");

        let sql = format!(
            r#"
            SELECT e.rowid AS rowid, e.text AS text, v.distance AS distance
            FROM {table} AS e
            INNER JOIN {vec_table} AS v ON v.rowid = e.rowid
            WHERE v.text_embedding MATCH ?1 AND k = ?2
            ORDER BY v.distance
            "#,
            table = self.table,
            vec_table = index_table(&self.table),
        );
        let blob = codec::encode(embedding);
        let hits = self.with_conn(|conn| {
            let mut stmt = conn.prepare_cached(&sql)?;
            let rows = stmt.query_map(params![blob, top_k as i64], row_to_hit)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })?;
        tracing::debug!(table = %self.table, count = hits.len(), "similarity search returned");
        Ok(hits)
    }

    /// Nearest-neighbour search narrowed by a metadata filter.
    ///
    /// The `top_k` nearest candidates are taken from the index first and the
    /// filter is applied to that fixed set, so a selective filter can return
    /// fewer than `top_k` hits. No second query backfills the shortfall.
    pub fn similarity_search_with_filter(
        &self,
        embedding: &[f32],
        filter: &MetadataFilter,
        top_k: usize,
    ) -> Result<Vec<SearchHit>> {
        validate_top_k(top_k)?;
        validate_metadata_filter(filter)?;
        validate_embedding_dimension(embedding, self.require_dimension()?)?;
        tracing::debug!(table = %self.table, ?filter, top_k, "filtered similarity search");

        let compiled = compile(filter);
        let sql = format!(
            r#"
            SELECT sim.rowid, sim.text, sim.distance
            FROM (
                SELECT e.rowid AS rowid, e.text AS text, e.metadata AS metadata,
                       v.distance AS distance
                FROM {table} AS e
                INNER JOIN {vec_table} AS v ON v.rowid = e.rowid
                WHERE v.text_embedding MATCH ? AND k = ?
                ORDER BY v.distance
            ) AS sim
            WHERE {predicate}
            ORDER BY sim.distance
            "#,
            table = self.table,
            vec_table = index_table(&self.table),
            predicate = compiled.predicate,
        );
        let mut values = vec![
            SqlValue::Blob(codec::encode(embedding)),
            SqlValue::Integer(top_k as i64),
        ];
        values.extend(compiled.params);

        let hits = self.with_conn(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(&values), row_to_hit)?;
            Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
        })?;
        tracing::debug!(table = %self.table, count = hits.len(), "filtered search returned");
        Ok(hits)
    }

    // -----------------------------------------------------------------------
    // Import / export
    // -----------------------------------------------------------------------

    pub fn export_to_json(
        &self,
        path: impl AsRef<Path>,
        options: &ExportOptions,
    ) -> Result<usize> {
        io::export_to_json(self, path.as_ref(), options)
    }

    pub fn import_from_json(
        &self,
        path: impl AsRef<Path>,
        options: &ImportOptions,
    ) -> Result<usize> {
        io::import_from_json(self, path.as_ref(), options)
    }

    pub fn export_to_csv(
        &self,
        path: impl AsRef<Path>,
        options: &ExportOptions,
    ) -> Result<usize> {
        io::export_to_csv(self, path.as_ref(), options)
    }

    pub fn import_from_csv(
        &self,
        path: impl AsRef<Path>,
        options: &ImportOptions,
    ) -> Result<usize> {
        io::import_from_csv(self, path.as_ref(), options)
    }

    // -----------------------------------------------------------------------
    // Transactions
    // -----------------------------------------------------------------------

    /// Run `f` inside one transaction.
    ///
    /// Mutations made through the client inside `f` do not commit on their
    /// own. If `f` returns `Ok` everything commits once; if it returns `Err`
    /// everything rolls back and that error is returned. Scopes do not nest.
    ///
    /// ```rust,no_run
    /// # use sqlite_vec_client::{RecordUpdate, VecClient};
    /// # fn example(client: &VecClient) -> sqlite_vec_client::Result<()> {
    /// client.transaction(|c| {
    ///     let ids = c.add(&["a"], &[[0.1, 0.2, 0.3]], None)?;
    ///     c.update(&RecordUpdate::new(ids[0]).text("A"))?;
    ///     Ok(())
    /// })?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Self) -> Result<T>,
    {
        let shared_open = self.with_conn(|conn| Ok(!conn.is_autocommit()))?;
        if self.in_transaction.get() || shared_open {
            return Err(VecClientError::Transaction(
                "a transaction is already active on this connection; nesting is not supported"
                    .to_string(),
            ));
        }
        self.exec("BEGIN IMMEDIATE")?;
        let mut scope = TransactionScope::enter(self);
        tracing::debug!(table = %self.table, "transaction started");

        match f(self) {
            Ok(value) => {
                scope.commit()?;
                tracing::debug!(table = %self.table, "transaction committed");
                Ok(value)
            }
            Err(e) => {
                scope.rollback()?;
                tracing::error!(table = %self.table, error = %e, "transaction rolled back");
                Err(e)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Lifecycle
    // -----------------------------------------------------------------------

    /// Close an owned connection or hand a pooled one back. Close failures
    /// are logged, never returned.
    pub fn close(self) {
        tracing::debug!(table = %self.table, "closing client");
        match self.handle {
            Handle::Owned(conn) => match conn.close() {
                Ok(()) => tracing::info!(table = %self.table, "connection closed"),
                Err((_, e)) => {
                    tracing::warn!(table = %self.table, error = %e, "error closing connection")
                }
            },
            Handle::Pooled { conn, pool } => {
                pool.return_connection(&conn);
                tracing::info!(table = %self.table, "connection returned to pool");
            }
        }
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// Run `f` against the connection, mapping "no such table" failures to
    /// [`VecClientError::TableNotFound`].
    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let out = match &self.handle {
            Handle::Owned(conn) => f(conn),
            Handle::Pooled { conn, .. } => {
                let guard = conn.lock().map_err(|e| {
                    VecClientError::Connection(format!("connection lock poisoned: {e}"))
                })?;
                let conn = guard.as_ref().ok_or_else(|| {
                    VecClientError::Connection("connection closed by its pool".to_string())
                })?;
                f(conn)
            }
        };
        out.map_err(|e| self.classify(e))
    }

    /// Run a mutation. Outside a transaction scope it gets its own
    /// transaction and is committed before returning. The write lock is taken
    /// up front so concurrent writers wait on the busy timeout instead of
    /// failing on upgrade.
    ///
    /// A connection already inside a transaction (this client's scope, or a
    /// scope opened by another client sharing the pooled connection) runs
    /// the statement as part of it.
    fn write<T>(&self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let deferred = self.in_transaction.get();
        self.with_conn(|conn| {
            if deferred || !conn.is_autocommit() {
                return f(conn);
            }
            let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
            let out = f(&tx)?;
            tx.commit()?;
            Ok(out)
        })
    }

    fn exec(&self, sql: &str) -> Result<()> {
        self.with_conn(|conn| Ok(conn.execute_batch(sql)?))
    }

    fn require_dimension(&self) -> Result<usize> {
        self.dimension()?.ok_or_else(|| self.table_not_found())
    }

    fn table_not_found(&self) -> VecClientError {
        VecClientError::TableNotFound(format!(
            "table '{}' or '{}' does not exist; call create_table() first",
            self.table,
            index_table(&self.table)
        ))
    }

    fn classify(&self, err: VecClientError) -> VecClientError {
        match err {
            VecClientError::Sqlite(e) if e.to_string().to_lowercase().contains("no such table") => {
                tracing::error!(table = %self.table, error = %e, "table not found");
                self.table_not_found()
            }
            other => other,
        }
    }
}

/// Deferred-commit flag for the duration of [`VecClient::transaction`].
/// Dropping an unfinished scope (a panic in the closure) rolls back.
struct TransactionScope<'a> {
    client: &'a VecClient,
    finished: bool,
}

impl<'a> TransactionScope<'a> {
    fn enter(client: &'a VecClient) -> Self {
        client.in_transaction.set(true);
        Self {
            client,
            finished: false,
        }
    }

    fn finish(&mut self) {
        self.finished = true;
        self.client.in_transaction.set(false);
    }

    fn commit(&mut self) -> Result<()> {
        self.finish();
        if let Err(e) = self.client.exec("COMMIT") {
            if let Err(rollback) = self.client.exec("ROLLBACK") {
                tracing::warn!(error = %rollback, "rollback after failed commit failed");
            }
            return Err(e);
        }
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        self.finish();
        self.client.exec("ROLLBACK")
    }
}

impl Drop for TransactionScope<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.finish();
            if let Err(e) = self.client.exec("ROLLBACK") {
                tracing::warn!(error = %e, "rollback of abandoned transaction failed");
            }
        }
    }
}

fn placeholders(n: usize) -> String {
    vec!["?"; n].join(",")
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<Record> {
    let metadata = match row.get::<_, Option<String>>(2)? {
        Some(raw) if !raw.is_empty() => serde_json::from_str(&raw).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
        })?,
        _ => Metadata::new(),
    };
    let blob: Option<Vec<u8>> = row.get(3)?;
    Ok(Record {
        rowid: row.get(0)?,
        text: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        metadata,
        embedding: blob.as_deref().map(codec::decode).unwrap_or_default(),
    })
}

fn row_to_hit(row: &Row<'_>) -> rusqlite::Result<SearchHit> {
    Ok(SearchHit {
        rowid: row.get(0)?,
        text: row.get::<_, Option<String>>(1)?.unwrap_or_default(),
        distance: row.get(2)?,
    })
}
