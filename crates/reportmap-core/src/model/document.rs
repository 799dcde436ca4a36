//! Hierarchical report document built from Composite/Component nodes
//!
//! Nodes live in an arena owned by the [`Document`]. A node's parent is an
//! index into that arena, never an owning pointer, so the tree can be walked
//! upwards without reference cycles.

use serde::{Deserialize, Serialize};

use crate::errors::{MapError, Result};

use super::value::Value;

/// Name of every document's root composite
pub const ROOT_NAME: &str = "document";

/// Handle to a node inside one [`Document`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(&self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
enum NodeKind {
    Composite { children: Vec<NodeId> },
    Field { value: Value },
}

/// A Component: name, optional parent, and either children or a value
#[derive(Debug, Clone)]
struct Node {
    name: String,
    parent: Option<NodeId>,
    kind: NodeKind,
}

/// Owned, order-preserving view of a subtree
///
/// Used for equality, fingerprints and by codecs that prefer plain data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DocumentTree {
    Field { name: String, value: Value },
    Composite { name: String, children: Vec<DocumentTree> },
}

impl DocumentTree {
    pub fn name(&self) -> &str {
        match self {
            DocumentTree::Field { name, .. } | DocumentTree::Composite { name, .. } => name,
        }
    }
}

/// Arena-backed Composite tree
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create a document holding only the root composite
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                name: ROOT_NAME.to_string(),
                parent: None,
                kind: NodeKind::Composite {
                    children: Vec::new(),
                },
            }],
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes
            .get(id.0)
            .ok_or_else(|| MapError::UnknownNode { index: id.0 }.into())
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes
            .get_mut(id.0)
            .ok_or_else(|| MapError::UnknownNode { index: id.0 }.into())
    }

    fn push_node(&mut self, name: &str, kind: NodeKind) -> NodeId {
        self.nodes.push(Node {
            name: name.to_string(),
            parent: None,
            kind,
        });
        NodeId(self.nodes.len() - 1)
    }

    /// Create a composite under `parent`
    ///
    /// # Errors
    ///
    /// Fails when `parent` is unknown or is a field.
    pub fn add_composite(&mut self, parent: NodeId, name: &str) -> Result<NodeId> {
        let id = self.push_node(
            name,
            NodeKind::Composite {
                children: Vec::new(),
            },
        );
        self.attach(parent, id)?;
        Ok(id)
    }

    /// Create a field (leaf) under `parent`
    ///
    /// # Errors
    ///
    /// Fails when `parent` is unknown or is a field.
    pub fn add_field(&mut self, parent: NodeId, name: &str, value: Value) -> Result<NodeId> {
        let id = self.push_node(name, NodeKind::Field { value });
        self.attach(parent, id)?;
        Ok(id)
    }

    /// Append `child` to `parent`'s children
    ///
    /// # Errors
    ///
    /// - `MultipleParents` if `child` is already attached somewhere
    /// - `CycleDetected` if `child` is `parent` or one of its ancestors
    /// - `InvalidInput` if `parent` is a field
    pub fn attach(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        let child_node = self.node(child)?;
        if let Some(existing) = child_node.parent {
            return Err(MapError::MultipleParents {
                node: child_node.name.clone(),
                parent: self.node(existing)?.name.clone(),
            }
            .into());
        }
        if child == self.root() || self.ancestors(parent)?.contains(&child) || parent == child {
            return Err(MapError::CycleDetected {
                node: child_node.name.clone(),
            }
            .into());
        }

        let parent_node = self.node_mut(parent)?;
        match &mut parent_node.kind {
            NodeKind::Composite { children } => children.push(child),
            NodeKind::Field { .. } => {
                return Err(MapError::WrongNodeKind {
                    node: parent_node.name.clone(),
                    expected: "composite".to_string(),
                }
                .into())
            }
        }
        self.node_mut(child)?.parent = Some(parent);
        Ok(())
    }

    /// Remove `node` from its parent, leaving it free to be re-attached
    ///
    /// Detached subtrees stay in the arena but are unreachable from the root.
    pub fn detach(&mut self, node: NodeId) -> Result<()> {
        let Some(parent) = self.node(node)?.parent else {
            return Ok(());
        };
        if let NodeKind::Composite { children } = &mut self.node_mut(parent)?.kind {
            children.retain(|c| *c != node);
        }
        self.node_mut(node)?.parent = None;
        Ok(())
    }

    pub fn name(&self, node: NodeId) -> Result<&str> {
        Ok(&self.node(node)?.name)
    }

    pub fn parent(&self, node: NodeId) -> Result<Option<NodeId>> {
        Ok(self.node(node)?.parent)
    }

    /// `Some(node)` for composites, `None` for fields
    pub fn composite(&self, node: NodeId) -> Result<Option<NodeId>> {
        Ok(match self.node(node)?.kind {
            NodeKind::Composite { .. } => Some(node),
            NodeKind::Field { .. } => None,
        })
    }

    /// Children of a composite; empty for fields
    pub fn children(&self, node: NodeId) -> Result<&[NodeId]> {
        Ok(match &self.node(node)?.kind {
            NodeKind::Composite { children } => children.as_slice(),
            NodeKind::Field { .. } => &[],
        })
    }

    /// Ancestors from the immediate parent up to the root
    pub fn ancestors(&self, node: NodeId) -> Result<Vec<NodeId>> {
        let mut out = Vec::new();
        let mut current = self.node(node)?.parent;
        while let Some(id) = current {
            if out.contains(&id) {
                return Err(MapError::Internal {
                    message: format!("parent chain of node {} loops", node.0),
                }
                .into());
            }
            out.push(id);
            current = self.node(id)?.parent;
        }
        Ok(out)
    }

    /// Slash-separated path of names below the root, as accepted by [`Document::find`]
    pub fn path(&self, node: NodeId) -> Result<String> {
        let mut names: Vec<&str> = self
            .ancestors(node)?
            .into_iter()
            .rev()
            .skip(1)
            .map(|id| self.nodes[id.0].name.as_str())
            .collect();
        if node != self.root() {
            names.push(&self.node(node)?.name);
        }
        Ok(names.join("/"))
    }

    /// Locate a node
    ///
    /// A key containing `/` is a path of names from the root; any other key
    /// is matched against node names depth-first, first hit wins.
    pub fn find(&self, key: &str) -> Option<NodeId> {
        if key.contains('/') {
            let mut current = self.root();
            for segment in key.split('/').filter(|s| !s.is_empty()) {
                current = self
                    .children(current)
                    .ok()?
                    .iter()
                    .copied()
                    .find(|c| self.nodes[c.0].name == segment)?;
            }
            return Some(current);
        }

        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            let node = &self.nodes[id.0];
            if id != self.root() && node.name == key {
                return Some(id);
            }
            if let NodeKind::Composite { children } = &node.kind {
                stack.extend(children.iter().rev().copied());
            }
        }
        None
    }

    pub fn value(&self, node: NodeId) -> Result<Option<&Value>> {
        Ok(match &self.node(node)?.kind {
            NodeKind::Field { value } => Some(value),
            NodeKind::Composite { .. } => None,
        })
    }

    /// Overwrite a field's value
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when `node` is a composite.
    pub fn set_value(&mut self, node: NodeId, value: impl Into<Value>) -> Result<()> {
        let target = self.node_mut(node)?;
        match &mut target.kind {
            NodeKind::Field { value: slot } => {
                *slot = value.into();
                Ok(())
            }
            NodeKind::Composite { .. } => Err(MapError::WrongNodeKind {
                node: target.name.clone(),
                expected: "field".to_string(),
            }
            .into()),
        }
    }

    /// `find` followed by `set_value`
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when nothing matches `key` or the match is a composite.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<()> {
        let node = self.find(key).ok_or_else(|| MapError::WrongNodeKind {
            node: key.to_string(),
            expected: "field present in the document".to_string(),
        })?;
        self.set_value(node, value)
    }

    /// Number of nodes reachable from the root, root included
    pub fn len(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self.root()];
        while let Some(id) = stack.pop() {
            count += 1;
            if let NodeKind::Composite { children } = &self.nodes[id.0].kind {
                stack.extend(children.iter().copied());
            }
        }
        count
    }

    /// True when the root has no children
    pub fn is_empty(&self) -> bool {
        self.children(self.root()).map_or(true, |c| c.is_empty())
    }

    /// Owned snapshot of the reachable tree
    pub fn to_tree(&self) -> DocumentTree {
        self.subtree(self.root())
    }

    fn subtree(&self, id: NodeId) -> DocumentTree {
        let node = &self.nodes[id.0];
        match &node.kind {
            NodeKind::Field { value } => DocumentTree::Field {
                name: node.name.clone(),
                value: value.clone(),
            },
            NodeKind::Composite { children } => DocumentTree::Composite {
                name: node.name.clone(),
                children: children.iter().map(|c| self.subtree(*c)).collect(),
            },
        }
    }

    /// Rebuild a document from a tree whose root is a composite
    ///
    /// The tree root's own name is replaced by [`ROOT_NAME`].
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when the tree root is a field.
    pub fn from_tree(tree: &DocumentTree) -> Result<Self> {
        let DocumentTree::Composite { children, .. } = tree else {
            return Err(MapError::WrongNodeKind {
                node: tree.name().to_string(),
                expected: "composite".to_string(),
            }
            .into());
        };
        let mut doc = Document::new();
        let root = doc.root();
        for child in children {
            doc.graft(root, child)?;
        }
        Ok(doc)
    }

    fn graft(&mut self, parent: NodeId, tree: &DocumentTree) -> Result<()> {
        match tree {
            DocumentTree::Field { name, value } => {
                self.add_field(parent, name, value.clone())?;
            }
            DocumentTree::Composite { name, children } => {
                let id = self.add_composite(parent, name)?;
                for child in children {
                    self.graft(id, child)?;
                }
            }
        }
        Ok(())
    }

    /// Stable textual digest of the reachable tree, used as the `data`
    /// identity field of a Report
    pub fn fingerprint(&self) -> String {
        serde_json::to_string(&self.to_tree()).unwrap_or_default()
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.to_tree() == other.to_tree()
    }
}

impl Eq for Document {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ExErrorKind;

    fn sample() -> (Document, NodeId, NodeId) {
        let mut doc = Document::new();
        let root = doc.root();
        let section = doc.add_composite(root, "1").unwrap();
        let field = doc.add_field(section, "1.1A", Value::from(0)).unwrap();
        doc.add_field(section, "1.1B", Value::from("n/a")).unwrap();
        (doc, section, field)
    }

    #[test]
    fn test_find_by_name_and_path() {
        let (doc, section, field) = sample();
        assert_eq!(doc.find("1.1A"), Some(field));
        assert_eq!(doc.find("1/1.1A"), Some(field));
        assert_eq!(doc.find("1"), Some(section));
        assert_eq!(doc.find("missing"), None);
        assert_eq!(doc.find("1/missing"), None);
    }

    #[test]
    fn test_set_value_on_field() {
        let (mut doc, section, field) = sample();
        doc.set("1.1A", 50).unwrap();
        assert_eq!(doc.value(field).unwrap(), Some(&Value::Integer(50)));

        let err = doc.set_value(section, 1).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::InvalidInput);
    }

    #[test]
    fn test_parent_back_reference() {
        let (doc, section, field) = sample();
        assert_eq!(doc.parent(field).unwrap(), Some(section));
        assert_eq!(doc.parent(section).unwrap(), Some(doc.root()));
        assert_eq!(doc.parent(doc.root()).unwrap(), None);
        assert_eq!(doc.path(field).unwrap(), "1/1.1A");
        assert_eq!(doc.composite(section).unwrap(), Some(section));
        assert_eq!(doc.composite(field).unwrap(), None);
    }

    #[test]
    fn test_second_parent_rejected() {
        let (mut doc, _, field) = sample();
        let root = doc.root();
        let other = doc.add_composite(root, "2").unwrap();
        let err = doc.attach(other, field).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::MultipleParents);

        doc.detach(field).unwrap();
        doc.attach(other, field).unwrap();
        assert_eq!(doc.find("2/1.1A"), Some(field));
        assert_eq!(doc.find("1/1.1A"), None);
    }

    #[test]
    fn test_cycle_rejected() {
        let (mut doc, section, _) = sample();
        let inner = doc.add_composite(section, "inner").unwrap();
        doc.detach(section).unwrap();
        let err = doc.attach(inner, section).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::CycleDetected);

        let root = doc.root();
        let err = doc.attach(inner, root).unwrap_err();
        assert_eq!(err.kind(), ExErrorKind::CycleDetected);
    }

    #[test]
    fn test_tree_roundtrip_and_equality() {
        let (doc, _, _) = sample();
        let rebuilt = Document::from_tree(&doc.to_tree()).unwrap();
        assert_eq!(doc, rebuilt);
        assert_eq!(doc.fingerprint(), rebuilt.fingerprint());
        assert_eq!(doc.len(), 4);

        let mut changed = rebuilt.clone();
        changed.set("1.1A", 50).unwrap();
        assert_ne!(doc, changed);
    }
}
