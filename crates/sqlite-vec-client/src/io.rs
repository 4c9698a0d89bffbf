//! Bulk export and import in JSON Lines and CSV.
//!
//! Exports read through [`VecClient::get_all`] (or paged
//! [`VecClient::filter_by_metadata`] when a filter is set); imports buffer
//! records and flush them through [`VecClient::add`], so every imported row
//! reaches the index through the normal triggers. Imported records get new
//! rowids; the exported `rowid` is only used for duplicate detection.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::client::VecClient;
use crate::error::{Result, VecClientError};
use crate::filter::MetadataFilter;
use crate::types::{Metadata, Record, Rowid};
use crate::validation::validate_limit;

pub const DEFAULT_IO_BATCH_SIZE: usize = 1000;

/// Options for [`export_to_json`] and [`export_to_csv`].
#[derive(Debug, Clone)]
pub struct ExportOptions {
    pub include_embeddings: bool,
    /// Export only records matching this filter.
    pub filter: Option<MetadataFilter>,
    pub batch_size: usize,
}

impl ExportOptions {
    /// JSON Lines defaults: embeddings included, so the file can be re-imported.
    pub fn json() -> Self {
        Self {
            include_embeddings: true,
            filter: None,
            batch_size: DEFAULT_IO_BATCH_SIZE,
        }
    }

    /// CSV defaults: embeddings left out to keep the file readable.
    pub fn csv() -> Self {
        Self {
            include_embeddings: false,
            ..Self::json()
        }
    }

    pub fn with_embeddings(mut self, include: bool) -> Self {
        self.include_embeddings = include;
        self
    }

    pub fn with_filter(mut self, filter: MetadataFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self::json()
    }
}

/// Options for [`import_from_json`] and [`import_from_csv`].
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Skip records whose exported rowid already exists in the table.
    pub skip_duplicates: bool,
    pub batch_size: usize,
}

impl ImportOptions {
    pub fn new() -> Self {
        Self {
            skip_duplicates: false,
            batch_size: DEFAULT_IO_BATCH_SIZE,
        }
    }

    pub fn with_skip_duplicates(mut self, skip: bool) -> Self {
        self.skip_duplicates = skip;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct JsonRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    rowid: Option<Rowid>,
    text: String,
    #[serde(default)]
    metadata: Metadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    embedding: Option<Vec<f32>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CsvRow {
    #[serde(default)]
    rowid: Option<Rowid>,
    text: String,
    metadata: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    embedding: Option<String>,
}

/// Write records as JSON Lines. Returns the number written.
pub fn export_to_json(client: &VecClient, path: &Path, options: &ExportOptions) -> Result<usize> {
    tracing::info!(path = %path.display(), table = client.table(), "exporting to JSON");
    let mut out = BufWriter::new(create_output(path)?);
    let count = for_each_export(client, options, |record| {
        let line = JsonRecord {
            rowid: Some(record.rowid),
            text: record.text,
            metadata: record.metadata,
            embedding: options.include_embeddings.then_some(record.embedding),
        };
        serde_json::to_writer(&mut out, &line)?;
        out.write_all(b"\n")?;
        Ok(())
    })?;
    out.flush()?;
    tracing::info!(path = %path.display(), count, "exported records");
    Ok(count)
}

/// Write records as CSV with a `rowid,text,metadata[,embedding]` header.
/// Metadata and embeddings are JSON-encoded cells.
pub fn export_to_csv(client: &VecClient, path: &Path, options: &ExportOptions) -> Result<usize> {
    tracing::info!(path = %path.display(), table = client.table(), "exporting to CSV");
    let mut writer = csv::Writer::from_writer(create_output(path)?);
    let mut header = vec!["rowid", "text", "metadata"];
    if options.include_embeddings {
        header.push("embedding");
    }
    writer.write_record(&header)?;

    let count = for_each_export(client, options, |record| {
        let mut row = vec![
            record.rowid.to_string(),
            record.text,
            serde_json::to_string(&record.metadata)?,
        ];
        if options.include_embeddings {
            row.push(serde_json::to_string(&record.embedding)?);
        }
        writer.write_record(&row)?;
        Ok(())
    })?;
    writer.flush()?;
    tracing::info!(path = %path.display(), count, "exported records");
    Ok(count)
}

/// Read JSON Lines written by [`export_to_json`] and add them to the table.
pub fn import_from_json(client: &VecClient, path: &Path, options: &ImportOptions) -> Result<usize> {
    tracing::info!(path = %path.display(), table = client.table(), "importing from JSON");
    let reader = BufReader::new(File::open(path)?);
    let mut batch = ImportBatch::new(client, options)?;

    for (lineno, line) in reader.lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let record: JsonRecord = serde_json::from_str(&line)?;
        let Some(embedding) = record.embedding else {
            return Err(VecClientError::Import(format!(
                "line {}: record is missing 'embedding'; export with embeddings included \
                 to support import",
                lineno + 1
            )));
        };
        batch.push(record.rowid, record.text, record.metadata, embedding)?;
    }

    let count = batch.finish()?;
    tracing::info!(path = %path.display(), count, "imported records");
    Ok(count)
}

/// Read CSV written by [`export_to_csv`] (with embeddings) and add the rows.
pub fn import_from_csv(client: &VecClient, path: &Path, options: &ImportOptions) -> Result<usize> {
    tracing::info!(path = %path.display(), table = client.table(), "importing from CSV");
    let mut reader = csv::Reader::from_reader(File::open(path)?);
    let headers = reader.headers()?.clone();
    if !headers.iter().any(|h| h == "embedding") {
        return Err(VecClientError::Import(
            "CSV file is missing the 'embedding' column; export with embeddings included \
             to support import"
                .to_string(),
        ));
    }
    if !headers.iter().any(|h| h == "text") || !headers.iter().any(|h| h == "metadata") {
        return Err(VecClientError::Import(
            "CSV file must include 'text' and 'metadata' columns".to_string(),
        ));
    }

    let mut batch = ImportBatch::new(client, options)?;
    for (i, row) in reader.deserialize::<CsvRow>().enumerate() {
        let row = row?;
        let embedding = match row.embedding.as_deref().map(str::trim) {
            Some(raw) if !raw.is_empty() => serde_json::from_str::<Vec<f32>>(raw)?,
            _ => {
                return Err(VecClientError::Import(format!(
                    "row {}: record is missing embedding data",
                    i + 1
                )))
            }
        };
        let metadata: Metadata = if row.metadata.trim().is_empty() {
            Metadata::new()
        } else {
            serde_json::from_str(&row.metadata)?
        };
        batch.push(row.rowid, row.text, metadata, embedding)?;
    }

    let count = batch.finish()?;
    tracing::info!(path = %path.display(), count, "imported records");
    Ok(count)
}

fn create_output(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(File::create(path)?)
}

fn for_each_export(
    client: &VecClient,
    options: &ExportOptions,
    mut emit: impl FnMut(Record) -> Result<()>,
) -> Result<usize> {
    validate_limit(options.batch_size)?;
    let mut count = 0usize;
    match &options.filter {
        None => {
            for record in client.get_all(options.batch_size)? {
                emit(record?)?;
                count += 1;
            }
        }
        Some(filter) => {
            let mut offset = 0usize;
            loop {
                let page = client.filter_by_metadata(filter, options.batch_size, offset)?;
                if page.is_empty() {
                    break;
                }
                offset += page.len();
                for record in page {
                    emit(record)?;
                    count += 1;
                }
            }
        }
    }
    Ok(count)
}

/// Buffers imported rows and flushes them through `add` in batches.
struct ImportBatch<'a> {
    client: &'a VecClient,
    options: &'a ImportOptions,
    texts: Vec<String>,
    metadata: Vec<Metadata>,
    embeddings: Vec<Vec<f32>>,
    imported: usize,
}

impl<'a> ImportBatch<'a> {
    fn new(client: &'a VecClient, options: &'a ImportOptions) -> Result<Self> {
        validate_limit(options.batch_size)?;
        Ok(Self {
            client,
            options,
            texts: Vec::new(),
            metadata: Vec::new(),
            embeddings: Vec::new(),
            imported: 0,
        })
    }

    fn push(
        &mut self,
        rowid: Option<Rowid>,
        text: String,
        metadata: Metadata,
        embedding: Vec<f32>,
    ) -> Result<()> {
        if self.options.skip_duplicates {
            if let Some(rowid) = rowid {
                if self.client.get(rowid)?.is_some() {
                    tracing::debug!(rowid, "skipping existing record");
                    return Ok(());
                }
            }
        }
        self.texts.push(text);
        self.metadata.push(metadata);
        self.embeddings.push(embedding);
        if self.texts.len() >= self.options.batch_size {
            self.flush()?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        if self.texts.is_empty() {
            return Ok(());
        }
        self.client
            .add(&self.texts, &self.embeddings, Some(self.metadata.as_slice()))?;
        self.imported += self.texts.len();
        self.texts.clear();
        self.metadata.clear();
        self.embeddings.clear();
        Ok(())
    }

    fn finish(mut self) -> Result<usize> {
        self.flush()?;
        Ok(self.imported)
    }
}
