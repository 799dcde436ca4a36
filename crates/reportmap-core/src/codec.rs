//! Document codec seam
//!
//! Report data is persisted as an opaque blob; a codec turns source text
//! into a [`Document`] and documents into blobs and back.

use crate::errors::Result;
use crate::model::Document;

pub trait DocumentCodec {
    /// Build a document from human-authored source text
    ///
    /// # Errors
    ///
    /// `Serialization` when the source cannot be parsed.
    fn parse(&self, source: &str) -> Result<Document>;

    /// Encode a document for storage
    ///
    /// # Errors
    ///
    /// `Serialization` when the document cannot be encoded.
    fn serialize(&self, doc: &Document) -> Result<String>;

    /// Decode a stored blob
    ///
    /// # Errors
    ///
    /// `Serialization` when the blob is not a valid encoding.
    fn deserialize(&self, blob: &str) -> Result<Document>;
}
