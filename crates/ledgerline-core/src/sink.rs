//! Sink interface and the Parquet part-file sink

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use parquet::arrow::ArrowWriter;
use parquet::basic::{Compression, ZstdLevel};
use parquet::file::properties::WriterProperties;

use crate::error::SinkError;
use crate::record::TransferRecord;
use crate::schema;

/// Destination for flushed batches.
///
/// A flush is a best-effort append of the whole batch. Duplicate writes
/// across retried flushes are allowed.
pub trait Sink {
    fn flush(&mut self, batch: &[TransferRecord]) -> Result<(), SinkError>;
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn flush(&mut self, batch: &[TransferRecord]) -> Result<(), SinkError> {
        (**self).flush(batch)
    }
}

impl<S: Sink + ?Sized> Sink for &mut S {
    fn flush(&mut self, batch: &[TransferRecord]) -> Result<(), SinkError> {
        (**self).flush(batch)
    }
}

/// Writes each flushed batch as its own `{table}_{NNNNN}.parquet` file.
///
/// Parts are written to a `.tmp` path and renamed once the footer is on
/// disk, so a visible part file is always complete. Numbering continues
/// after the highest existing part, so repeated runs append.
pub struct ParquetSink {
    table: String,
    output_dir: PathBuf,
    props: WriterProperties,
    next_part: usize,
    row_count: usize,
}

impl std::fmt::Debug for ParquetSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParquetSink")
            .field("table", &self.table)
            .field("output_dir", &self.output_dir)
            .field("next_part", &self.next_part)
            .field("row_count", &self.row_count)
            .finish_non_exhaustive()
    }
}

impl ParquetSink {
    pub fn new(table: &str, output_dir: &Path, zstd_level: i32) -> Result<Self, io::Error> {
        fs::create_dir_all(output_dir)?;
        cleanup_tmp_files(output_dir)?;

        let level = ZstdLevel::try_new(zstd_level)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let props = WriterProperties::builder()
            .set_compression(Compression::ZSTD(level))
            .build();
        let next_part = next_part_index(output_dir, table)?;
        if next_part > 0 {
            log::info!(
                "{table}: {next_part} existing parts in {}, appending",
                output_dir.display()
            );
        }

        Ok(Self {
            table: table.to_string(),
            output_dir: output_dir.to_path_buf(),
            props,
            next_part,
            row_count: 0,
        })
    }

    /// Rows written by this sink so far
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    fn part_path(&self, idx: usize) -> PathBuf {
        self.output_dir
            .join(format!("{}_{idx:05}.parquet", self.table))
    }

    /// Write one part file atomically, returning its final path
    pub fn write_part(&mut self, batch: &[TransferRecord]) -> Result<PathBuf, io::Error> {
        let final_path = self.part_path(self.next_part);
        let mut tmp_name = final_path.clone().into_os_string();
        tmp_name.push(".tmp");
        let tmp_path = PathBuf::from(tmp_name);

        let record_batch = schema::to_record_batch(batch).map_err(io::Error::other)?;
        let file = File::create(&tmp_path)?;
        let mut writer =
            ArrowWriter::try_new(file, schema::transfers().clone(), Some(self.props.clone()))
                .map_err(io::Error::other)?;
        writer.write(&record_batch).map_err(io::Error::other)?;
        writer.close().map_err(io::Error::other)?;
        fs::rename(&tmp_path, &final_path)?;

        self.next_part += 1;
        self.row_count += batch.len();
        log::debug!("wrote {} ({} rows)", final_path.display(), batch.len());
        Ok(final_path)
    }
}

impl Sink for ParquetSink {
    fn flush(&mut self, batch: &[TransferRecord]) -> Result<(), SinkError> {
        self.write_part(batch).map(|_| ()).map_err(SinkError::Io)
    }
}

/// One past the highest `{table}_{NNNNN}.parquet` index in `dir`
fn next_part_index(dir: &Path, table: &str) -> io::Result<usize> {
    let prefix = format!("{table}_");
    let mut next = 0;
    for entry in fs::read_dir(dir)? {
        let name = entry?.file_name();
        let Some(name) = name.to_str() else { continue };
        let idx = name
            .strip_prefix(&prefix)
            .and_then(|rest| rest.strip_suffix(".parquet"))
            .and_then(|digits| digits.parse::<usize>().ok());
        if let Some(idx) = idx {
            next = next.max(idx + 1);
        }
    }
    Ok(next)
}

/// Remove stale .tmp files in the output directory
pub fn cleanup_tmp_files(output_dir: &Path) -> io::Result<()> {
    for entry in fs::read_dir(output_dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "tmp") {
            log::warn!("Removing stale tmp file: {}", path.display());
            fs::remove_file(&path)?;
        }
    }
    Ok(())
}
