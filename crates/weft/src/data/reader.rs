//! Collaborators that fetch raw rows.
//!
//! Spreadsheet and delimited parsing, database access and decryption live
//! outside this crate. Each is a trait so callers can plug in their own
//! implementation; plain closures with the matching signature also work.

use std::error::Error as StdError;

use camino::Utf8Path;

use super::source::QueryParam;
use crate::row::DataRow;

/// Error returned by a collaborator.
pub type SourceError = Box<dyn StdError + Send + Sync>;

/// Reads worksheets.
pub trait TabularReader: Send + Sync {
    /// Rows of `sheet` (or the first sheet) in the workbook at `path`.
    ///
    /// # Errors
    /// Any failure reading or decoding the workbook.
    fn read_tabular(
        &self,
        path: &Utf8Path,
        sheet: Option<&str>,
        has_header: bool,
    ) -> Result<Vec<DataRow>, SourceError>;
}

/// Reads delimited text files.
pub trait DelimitedReader: Send + Sync {
    /// Rows of the file at `path`.
    ///
    /// # Errors
    /// Any failure reading or decoding the file.
    fn read_delimited(&self, path: &Utf8Path, has_header: bool) -> Result<Vec<DataRow>, SourceError>;
}

/// Reads structured documents.
pub trait DocumentReader: Send + Sync {
    /// Rows of the document at `path`; a single object yields one row.
    ///
    /// # Errors
    /// Any failure reading, decoding or decrypting the document.
    fn read_document(&self, path: &Utf8Path) -> Result<Vec<DataRow>, SourceError>;
}

/// Runs queries against a named connection.
pub trait QueryExecutor: Send + Sync {
    /// Result rows of `query` on `source`.
    ///
    /// # Errors
    /// Any connection or query failure, timeouts included.
    fn execute_query(
        &self,
        source: &str,
        query: &str,
        params: &[QueryParam],
    ) -> Result<Vec<DataRow>, SourceError>;
}

/// Decrypts values marked as `ENC(...)` in documents.
pub trait FieldDecryptor: Send + Sync {
    /// Plain text of `ciphertext`, the text between the parentheses.
    ///
    /// # Errors
    /// Any failure decrypting the value.
    fn decrypt(&self, ciphertext: &str) -> Result<String, SourceError>;
}

impl<F> TabularReader for F
where
    F: Fn(&Utf8Path, Option<&str>, bool) -> Result<Vec<DataRow>, SourceError> + Send + Sync,
{
    fn read_tabular(
        &self,
        path: &Utf8Path,
        sheet: Option<&str>,
        has_header: bool,
    ) -> Result<Vec<DataRow>, SourceError> {
        self(path, sheet, has_header)
    }
}

impl<F> DelimitedReader for F
where
    F: Fn(&Utf8Path, bool) -> Result<Vec<DataRow>, SourceError> + Send + Sync,
{
    fn read_delimited(&self, path: &Utf8Path, has_header: bool) -> Result<Vec<DataRow>, SourceError> {
        self(path, has_header)
    }
}

impl<F> QueryExecutor for F
where
    F: Fn(&str, &str, &[QueryParam]) -> Result<Vec<DataRow>, SourceError> + Send + Sync,
{
    fn execute_query(
        &self,
        source: &str,
        query: &str,
        params: &[QueryParam],
    ) -> Result<Vec<DataRow>, SourceError> {
        self(source, query, params)
    }
}

impl<F> FieldDecryptor for F
where
    F: Fn(&str) -> Result<String, SourceError> + Send + Sync,
{
    fn decrypt(&self, ciphertext: &str) -> Result<String, SourceError> {
        self(ciphertext)
    }
}
