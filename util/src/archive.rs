//! Delimited archive files
//!
//! An [`Archiver`] writes one header row followed by data rows to a
//! delimited text file, flushing after every row so that a crash never loses
//! more than the row being written.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use csv::{QuoteStyle, WriterBuilder};
pub use csv::Writer;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;
use thiserror::Error;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Field delimiter used by default, a tab.
pub const TAB: u8 = b'\t';

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// An object used to write delimited archive files.
pub struct Archiver<W: Write> {
    writer: Writer<W>,
    header_written: bool,
    num_rows: u64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Could not create the archive file: {0}")]
    CreateError(std::io::Error),

    #[error("Could not write to the archive: {0}")]
    WriteError(csv::Error),

    #[error("Could not flush the archive: {0}")]
    FlushError(std::io::Error),

    #[error("The header has already been written")]
    HeaderAlreadyWritten,

    #[error("Could not recover the underlying writer: {0}")]
    IntoInnerError(String),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Archiver<File> {
    /// Create a new tab-delimited archive file at the given path.
    ///
    /// Parent directories are created if needed, an existing file is
    /// truncated.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, ArchiveError> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent).map_err(ArchiveError::CreateError)?;
        }

        let file = File::create(path.as_ref()).map_err(ArchiveError::CreateError)?;

        Ok(Self::from_writer(file))
    }
}

impl<W: Write> Archiver<W> {
    /// Wrap an arbitrary writer in a tab-delimited archiver.
    pub fn from_writer(writer: W) -> Self {
        Self::with_delimiter(writer, TAB)
    }

    /// Wrap an arbitrary writer using the given field delimiter.
    pub fn with_delimiter(writer: W, delimiter: u8) -> Self {
        let w = WriterBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .quote_style(QuoteStyle::Necessary)
            .from_writer(writer);

        Self {
            writer: w,
            header_written: false,
            num_rows: 0,
        }
    }

    /// Write the header row. May only be called once.
    pub fn write_header<I, T>(&mut self, columns: I) -> Result<(), ArchiveError>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>
    {
        if self.header_written {
            return Err(ArchiveError::HeaderAlreadyWritten)
        }

        self.write_flushed(columns)?;
        self.header_written = true;

        Ok(())
    }

    /// Write one data row and flush it.
    pub fn write_row<I, T>(&mut self, fields: I) -> Result<(), ArchiveError>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>
    {
        self.write_flushed(fields)?;
        self.num_rows += 1;

        Ok(())
    }

    /// Number of data rows written so far, not counting the header.
    pub fn num_rows(&self) -> u64 {
        self.num_rows
    }

    /// Flush and return the underlying writer.
    pub fn into_inner(self) -> Result<W, ArchiveError> {
        self.writer
            .into_inner()
            .map_err(|e| ArchiveError::IntoInnerError(e.error().to_string()))
    }

    fn write_flushed<I, T>(&mut self, fields: I) -> Result<(), ArchiveError>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>
    {
        self.writer.write_record(fields).map_err(ArchiveError::WriteError)?;
        self.writer.flush().map_err(ArchiveError::FlushError)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_header_then_rows() {
        let mut arch = Archiver::from_writer(Vec::new());

        arch.write_header(&["TIME", "ITERATION"]).unwrap();
        arch.write_row(&["12:00:00.000", "1"]).unwrap();
        arch.write_row(&["12:00:00.005", "1"]).unwrap();

        assert_eq!(arch.num_rows(), 2);
        assert!(matches!(
            arch.write_header(&["TIME"]),
            Err(ArchiveError::HeaderAlreadyWritten)
        ));

        let out = String::from_utf8(arch.into_inner().unwrap()).unwrap();
        assert_eq!(out, "TIME\tITERATION\n12:00:00.000\t1\n12:00:00.005\t1\n");
    }
}
