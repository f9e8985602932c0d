//! CSV output for the stale-user report.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use tracing::info;

use super::filter::OutputRow;
use crate::error::ExportError;

/// Headerless, comma-delimited row writer. Backed by a freshly truncated file
/// unless built with [`CsvSink::from_writer`].
pub struct CsvSink<W: io::Write = File> {
    writer: csv::Writer<W>,
    path: PathBuf,
}

impl CsvSink<File> {
    /// Create or truncate `path`.
    pub fn create(path: &Path) -> Result<Self, ExportError> {
        let file = File::create(path).map_err(|source| ExportError::Create {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(Self::from_writer(file, path))
    }
}

impl<W: io::Write> CsvSink<W> {
    /// Wrap an open writer; `path` is only used in log messages.
    pub fn from_writer(inner: W, path: &Path) -> Self {
        let writer = csv::WriterBuilder::new()
            .has_headers(false)
            .terminator(csv::Terminator::Any(b'\n'))
            .from_writer(inner);

        Self {
            writer,
            path: path.to_path_buf(),
        }
    }

    /// Write every row in order, then flush. Consumes the sink so the file is
    /// closed on return.
    pub fn write_all(mut self, rows: &[OutputRow]) -> Result<usize, ExportError> {
        for row in rows {
            self.writer.serialize(row)?;
        }
        self.writer.flush().map_err(ExportError::Flush)?;

        info!("Wrote {} rows to {}", rows.len(), self.path.display());
        Ok(rows.len())
    }
}
