//! YAML document codec
//!
//! Source files are free-form YAML: mappings become composites, sequences
//! become composites whose children are named by position, and scalars
//! become fields. Stored blobs are the YAML encoding of the document tree,
//! which keeps node order and value types exact.

use std::fs;
use std::path::Path;

use serde_yaml::Value as Yaml;

use reportmap_core::{Document, DocumentCodec, DocumentTree, MapError, NodeId, Result, Value};

use crate::errors::{codec_error, io_error};

#[derive(Debug, Clone, Copy, Default)]
pub struct YamlCodec;

impl YamlCodec {
    pub fn new() -> Self {
        Self
    }

    /// Parse a YAML source file into a document
    ///
    /// # Errors
    ///
    /// `Io` when the file cannot be read, `Serialization` when it is not a
    /// YAML mapping or sequence.
    pub fn read_file(&self, path: &Path) -> Result<Document> {
        let source = fs::read_to_string(path).map_err(|e| io_error("read_document", e))?;
        tracing::debug!(path = %path.display(), bytes = source.len(), "document source read");
        self.parse(&source)
    }
}

/// Integer spelling of a YAML number
///
/// Floats lose their source spelling on parse (`1.10` reads back as `1.1`),
/// so they must be quoted to survive.
fn integer(n: &serde_yaml::Number, what: &str) -> Result<i64> {
    n.as_i64().ok_or_else(|| {
        MapError::Serialization {
            message: format!("non-integer {} {}: quote it to keep its spelling", what, n),
        }
        .into()
    })
}

fn key_name(key: &Yaml) -> Result<String> {
    match key {
        Yaml::String(s) => Ok(s.clone()),
        Yaml::Number(n) => integer(n, "mapping key").map(|i| i.to_string()),
        Yaml::Bool(b) => Ok(b.to_string()),
        Yaml::Tagged(tagged) => key_name(&tagged.value),
        other => Err(MapError::Serialization {
            message: format!("unsupported mapping key: {:?}", other),
        }
        .into()),
    }
}

fn scalar(value: &Yaml) -> Result<Option<Value>> {
    Ok(match value {
        Yaml::Null => Some(Value::Null),
        Yaml::Bool(b) => Some(Value::Text(b.to_string())),
        Yaml::Number(n) => Some(Value::Integer(integer(n, "value")?)),
        Yaml::String(s) => Some(Value::Text(s.clone())),
        Yaml::Tagged(tagged) => scalar(&tagged.value)?,
        Yaml::Sequence(_) | Yaml::Mapping(_) => None,
    })
}

fn build(doc: &mut Document, parent: NodeId, name: &str, value: &Yaml) -> Result<()> {
    if let Some(leaf) = scalar(value)? {
        doc.add_field(parent, name, leaf)?;
        return Ok(());
    }
    let node = doc.add_composite(parent, name)?;
    fill(doc, node, value)
}

fn fill(doc: &mut Document, node: NodeId, value: &Yaml) -> Result<()> {
    match value {
        Yaml::Mapping(map) => {
            for (key, child) in map {
                build(doc, node, &key_name(key)?, child)?;
            }
        }
        Yaml::Sequence(items) => {
            for (idx, child) in items.iter().enumerate() {
                build(doc, node, &idx.to_string(), child)?;
            }
        }
        Yaml::Tagged(tagged) => fill(doc, node, &tagged.value)?,
        _ => {
            return Err(MapError::Serialization {
                message: "document root must be a mapping or a sequence".to_string(),
            }
            .into())
        }
    }
    Ok(())
}

impl DocumentCodec for YamlCodec {
    fn parse(&self, source: &str) -> Result<Document> {
        let yaml: Yaml = serde_yaml::from_str(source).map_err(codec_error)?;
        let mut doc = Document::new();
        let root = doc.root();
        fill(&mut doc, root, &yaml)?;
        Ok(doc)
    }

    fn serialize(&self, doc: &Document) -> Result<String> {
        serde_yaml::to_string(&doc.to_tree()).map_err(codec_error)
    }

    fn deserialize(&self, blob: &str) -> Result<Document> {
        let tree: DocumentTree = serde_yaml::from_str(blob).map_err(codec_error)?;
        Document::from_tree(&tree)
    }
}
