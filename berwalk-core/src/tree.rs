//! Decoded field tree
//!
//! Decoders append nodes to a flat arena; parent/child links are indices into
//! it. Appending is the only mutation decoders perform besides adjusting text
//! and length of nodes they created, which keeps [`FieldTree::rollback`]
//! trivial: a failed speculative decode is undone by truncating the arena.

use crate::datatypes::{FieldRef, FieldValue};
use serde::Serialize;
use std::fmt::Write;

/// Index of a node in a [`FieldTree`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldNode {
    pub name: String,
    pub abbrev: String,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    /// Absolute offset of the bytes this node covers
    pub offset: usize,
    pub length: usize,
    pub value: FieldValue,
    /// Representation of the value
    pub text: String,
    /// Free-form annotations appended after the value
    pub suffix: String,
}

impl FieldNode {
    /// Single-line label: `name: text suffix`
    pub fn label(&self) -> String {
        let mut label = self.name.clone();
        if !self.text.is_empty() {
            label.push_str(": ");
            label.push_str(&self.text);
        }
        label.push_str(&self.suffix);
        label
    }
}

/// Position in a tree that can later be returned to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TreeCheckpoint {
    nodes: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FieldTree {
    nodes: Vec<FieldNode>,
    roots: Vec<NodeId>,
}

impl FieldTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Append a node
    ///
    /// # Arguments
    /// * `parent` - Parent node, `None` for a top-level node
    /// * `name` / `abbrev` - Display name and filter name
    /// * `offset` / `length` - Absolute byte range covered
    /// * `value` - Typed value; its display form becomes the node text
    pub fn add(
        &mut self,
        parent: Option<NodeId>,
        name: impl Into<String>,
        abbrev: impl Into<String>,
        offset: usize,
        length: usize,
        value: FieldValue,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        let text = value.to_string();
        self.nodes.push(FieldNode {
            name: name.into(),
            abbrev: abbrev.into(),
            parent,
            children: Vec::new(),
            offset,
            length,
            value,
            text,
            suffix: String::new(),
        });
        match parent {
            Some(p) => self.nodes[p.0].children.push(id),
            None => self.roots.push(id),
        }
        id
    }

    /// Append a node for a registered field
    pub fn add_field(
        &mut self,
        parent: Option<NodeId>,
        field: FieldRef,
        offset: usize,
        length: usize,
        value: FieldValue,
    ) -> NodeId {
        self.add(parent, field.name, field.abbrev, offset, length, value)
    }

    pub fn node(&self, id: NodeId) -> &FieldNode {
        &self.nodes[id.0]
    }

    pub fn get(&self, id: NodeId) -> Option<&FieldNode> {
        self.nodes.get(id.0)
    }

    pub fn set_text(&mut self, id: NodeId, text: impl Into<String>) {
        self.nodes[id.0].text = text.into();
    }

    pub fn append_text(&mut self, id: NodeId, text: &str) {
        self.nodes[id.0].suffix.push_str(text);
    }

    pub fn set_length(&mut self, id: NodeId, length: usize) {
        self.nodes[id.0].length = length;
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &FieldNode)> {
        self.nodes.iter().enumerate().map(|(i, n)| (NodeId(i), n))
    }

    /// First node (in insertion order) with the given filter name
    pub fn find_by_abbrev(&self, abbrev: &str) -> Option<NodeId> {
        self.iter().find(|(_, n)| n.abbrev == abbrev).map(|(id, _)| id)
    }

    pub fn find_all_by_abbrev<'t>(&'t self, abbrev: &'t str) -> impl Iterator<Item = NodeId> + 't {
        self.iter().filter(move |(_, n)| n.abbrev == abbrev).map(|(id, _)| id)
    }

    pub fn checkpoint(&self) -> TreeCheckpoint {
        TreeCheckpoint {
            nodes: self.nodes.len(),
        }
    }

    /// Drop every node added since `checkpoint`
    pub fn rollback(&mut self, checkpoint: TreeCheckpoint) {
        let keep = checkpoint.nodes;
        if keep >= self.nodes.len() {
            return;
        }
        for i in keep..self.nodes.len() {
            if let Some(parent) = self.nodes[i].parent {
                if parent.0 < keep {
                    self.nodes[parent.0].children.retain(|c| c.0 < keep);
                }
            }
        }
        self.roots.retain(|r| r.0 < keep);
        self.nodes.truncate(keep);
    }

    /// Filter expression selecting this node's value
    ///
    /// `abbrev == literal` for valued nodes, the bare `abbrev` for structural
    /// ones.
    pub fn filter_expression(&self, id: NodeId) -> String {
        let node = self.node(id);
        match node.value.filter_literal() {
            Some(literal) => format!("{} == {}", node.abbrev, literal),
            None => node.abbrev.clone(),
        }
    }

    /// Indented text dump, one label per line
    pub fn render(&self) -> String {
        let mut out = String::new();
        for &root in &self.roots {
            self.render_node(root, 0, &mut out);
        }
        out
    }

    fn render_node(&self, id: NodeId, depth: usize, out: &mut String) {
        let node = self.node(id);
        let _ = writeln!(out, "{:indent$}{}", "", node.label(), indent = depth * 4);
        for &child in &node.children {
            self.render_node(child, depth + 1, out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datatypes::{FieldInfo, FieldKind};

    static VERSION: FieldInfo = FieldInfo::new("version", "test.version", FieldKind::Int32);

    #[test]
    fn test_add_and_render() {
        let mut tree = FieldTree::new();
        let seq = tree.add(None, "SEQUENCE", "ber.unknown.SEQUENCE", 0, 5, FieldValue::None);
        let v = tree.add_field(Some(seq), &VERSION, 2, 3, FieldValue::Signed(2));
        tree.append_text(seq, " (1 item)");

        assert_eq!(tree.roots(), &[seq]);
        assert_eq!(tree.children(seq), &[v]);
        assert_eq!(tree.node(v).parent, Some(seq));
        assert_eq!(tree.render(), "SEQUENCE (1 item)\n    version: 2\n");
    }

    #[test]
    fn test_filter_expression() {
        let mut tree = FieldTree::new();
        let seq = tree.add(None, "SEQUENCE", "ber.unknown.SEQUENCE", 0, 5, FieldValue::None);
        let v = tree.add_field(Some(seq), &VERSION, 2, 3, FieldValue::Signed(2));
        assert_eq!(tree.filter_expression(v), "test.version == 2");
        assert_eq!(tree.filter_expression(seq), "ber.unknown.SEQUENCE");
    }

    #[test]
    fn test_rollback_detaches_children() {
        let mut tree = FieldTree::new();
        let seq = tree.add(None, "SEQUENCE", "s", 0, 10, FieldValue::None);
        let first = tree.add(Some(seq), "a", "a", 2, 1, FieldValue::Unsigned(1));
        let cp = tree.checkpoint();
        let second = tree.add(Some(seq), "b", "b", 3, 1, FieldValue::Unsigned(2));
        tree.add(Some(second), "c", "c", 3, 1, FieldValue::None);
        tree.add(None, "d", "d", 9, 1, FieldValue::None);

        tree.rollback(cp);
        assert_eq!(tree.len(), 2);
        assert_eq!(tree.children(seq), &[first]);
        assert_eq!(tree.roots(), &[seq]);
    }
}
