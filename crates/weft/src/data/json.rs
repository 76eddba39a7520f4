//! Built-in JSON document reader.

use std::fmt;
use std::sync::Arc;

use camino::{Utf8Path, Utf8PathBuf};
use serde_json::{Map, Value};
use thiserror::Error;

use super::reader::{DocumentReader, FieldDecryptor, SourceError};
use crate::row::DataRow;

/// Failure reading a JSON document.
#[derive(Debug, Error)]
pub enum JsonDocumentError {
    /// The file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// Document path.
        path: Utf8PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
    /// The text is not valid JSON.
    #[error("invalid JSON: {0}")]
    Syntax(#[from] serde_json::Error),
    /// The root is neither an object nor an array.
    #[error("expected an object or an array of objects at the document root")]
    UnexpectedRoot,
    /// An array element is not an object.
    #[error("element {index} of the document is not an object")]
    NotAnObject {
        /// Zero-based array position.
        index: usize,
    },
    /// An encrypted field could not be decrypted.
    #[error("failed to decrypt field `{field}`: {source}")]
    Decrypt {
        /// Field holding the encrypted value.
        field: String,
        /// Decryptor error.
        source: SourceError,
    },
}

/// Reads an array of objects, or a single object, into rows.
///
/// Strings are kept as they are, other scalars are rendered as JSON text and
/// `null` becomes an empty string. Nested arrays and objects are kept as
/// compact JSON. A string of the form `ENC(...)` is replaced by its
/// decryption when a [`FieldDecryptor`] is configured.
///
/// ```
/// use weft::data::JsonDocumentReader;
///
/// let rows = JsonDocumentReader::new()
///     .parse_str(r#"[{"user": "a", "age": 31}, {"user": "b", "active": true}]"#)
///     .unwrap_or_else(|err| panic!("{err}"));
/// assert_eq!(rows.len(), 2);
/// assert_eq!(rows.first().and_then(|row| row.get("age")), Some("31"));
/// ```
#[derive(Clone, Default)]
pub struct JsonDocumentReader {
    decryptor: Option<Arc<dyn FieldDecryptor>>,
}

impl JsonDocumentReader {
    /// Reader without a decryptor; `ENC(...)` values are kept verbatim.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reader that decrypts `ENC(...)` values with `decryptor`.
    #[must_use]
    pub fn with_decryptor(decryptor: impl FieldDecryptor + 'static) -> Self {
        Self {
            decryptor: Some(Arc::new(decryptor)),
        }
    }

    /// Rows of the document in `text`.
    ///
    /// # Errors
    /// Returns [`JsonDocumentError`] when the text is not JSON, has the wrong
    /// shape, or holds a value the decryptor rejects.
    pub fn parse_str(&self, text: &str) -> Result<Vec<DataRow>, JsonDocumentError> {
        match serde_json::from_str::<Value>(text)? {
            Value::Object(object) => Ok(vec![self.row(object)?]),
            Value::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(index, item)| match item {
                    Value::Object(object) => self.row(object),
                    _ => Err(JsonDocumentError::NotAnObject { index }),
                })
                .collect(),
            _ => Err(JsonDocumentError::UnexpectedRoot),
        }
    }

    fn row(&self, object: Map<String, Value>) -> Result<DataRow, JsonDocumentError> {
        let mut row = DataRow::new();
        for (field, value) in object {
            let text = match value {
                Value::String(text) => self.reveal(&field, text)?,
                Value::Null => String::new(),
                other => other.to_string(),
            };
            row.insert(field, text);
        }
        Ok(row)
    }

    fn reveal(&self, field: &str, text: String) -> Result<String, JsonDocumentError> {
        let Some(decryptor) = &self.decryptor else {
            return Ok(text);
        };
        let Some(ciphertext) = text
            .strip_prefix("ENC(")
            .and_then(|rest| rest.strip_suffix(')'))
        else {
            return Ok(text);
        };
        decryptor
            .decrypt(ciphertext)
            .map_err(|source| JsonDocumentError::Decrypt {
                field: field.to_owned(),
                source,
            })
    }
}

impl DocumentReader for JsonDocumentReader {
    fn read_document(&self, path: &Utf8Path) -> Result<Vec<DataRow>, SourceError> {
        let text = std::fs::read_to_string(path).map_err(|source| JsonDocumentError::Io {
            path: path.to_owned(),
            source,
        })?;
        Ok(self.parse_str(&text)?)
    }
}

impl fmt::Debug for JsonDocumentReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonDocumentReader")
            .field("decrypts", &self.decryptor.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::*;

    fn rot13(ciphertext: &str) -> Result<String, SourceError> {
        Ok(ciphertext
            .chars()
            .map(|c| match c {
                'a'..='m' | 'A'..='M' => char::from(u8::try_from(c).unwrap_or_default() + 13),
                'n'..='z' | 'N'..='Z' => char::from(u8::try_from(c).unwrap_or_default() - 13),
                other => other,
            })
            .collect())
    }

    #[test]
    fn single_object_is_one_row() {
        let rows = JsonDocumentReader::new()
            .parse_str(r#"{"user": "a", "score": 1.5, "tags": ["x"], "note": null}"#)
            .unwrap_or_else(|err| panic!("{err}"));
        assert_eq!(rows.len(), 1);
        let row = rows.first().unwrap_or_else(|| panic!("row missing"));
        assert_eq!(row.get("score"), Some("1.5"));
        assert_eq!(row.get("tags"), Some(r#"["x"]"#));
        assert_eq!(row.get("note"), Some(""));
    }

    #[test]
    fn wrong_shapes_are_rejected() {
        let reader = JsonDocumentReader::new();
        assert!(matches!(
            reader.parse_str("[{}, 3]"),
            Err(JsonDocumentError::NotAnObject { index: 1 })
        ));
        assert!(matches!(
            reader.parse_str("\"text\""),
            Err(JsonDocumentError::UnexpectedRoot)
        ));
        assert!(matches!(reader.parse_str("{"), Err(JsonDocumentError::Syntax(_))));
    }

    #[test]
    fn encrypted_values_are_decrypted() {
        let reader = JsonDocumentReader::with_decryptor(rot13);
        let rows = reader
            .parse_str(r#"{"user": "a", "password": "ENC(frperg)"}"#)
            .unwrap_or_else(|err| panic!("{err}"));
        assert_eq!(rows.first().and_then(|row| row.get("password")), Some("secret"));
    }

    #[test]
    fn encrypted_values_are_kept_without_a_decryptor() {
        let rows = JsonDocumentReader::new()
            .parse_str(r#"{"password": "ENC(frperg)"}"#)
            .unwrap_or_else(|err| panic!("{err}"));
        assert_eq!(rows.first().and_then(|row| row.get("password")), Some("ENC(frperg)"));
    }

    #[test]
    fn decryptor_errors_name_the_field() {
        let reader = JsonDocumentReader::with_decryptor(|_: &str| -> Result<String, SourceError> {
            Err("bad key".into())
        });
        let err = reader.parse_str(r#"{"token": "ENC(zzz)"}"#).err();
        assert!(matches!(err, Some(JsonDocumentError::Decrypt { ref field, .. }) if field == "token"));
    }

    #[test]
    fn reads_documents_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap_or_else(|err| panic!("{err}"));
        file.write_all(br#"[{"user": "a"}, {"user": "b"}]"#)
            .unwrap_or_else(|err| panic!("{err}"));
        let path = Utf8Path::from_path(file.path()).unwrap_or_else(|| panic!("non UTF-8 path"));
        let rows = JsonDocumentReader::new()
            .read_document(path)
            .unwrap_or_else(|err| panic!("{err}"));
        assert_eq!(rows.len(), 2);

        let missing = JsonDocumentReader::new().read_document(Utf8Path::new("/no/such/file.json"));
        assert!(missing.is_err());
    }
}
