//! # Node Arena
//!
//! The document is an arena of element nodes addressed by [`NodeId`].
//! Parent/child edges are explicit, so a node can be detached from one
//! parent and attached to another without losing its attributes or
//! subtree. Detached nodes stay in the arena until the document is
//! rebuilt; only nodes reachable from the root are serialized.

use std::fmt;

/// Opaque handle to a node inside an [`XmlDocument`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A single element
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub tag: String,
    /// Attributes in document order
    pub attributes: Vec<(String, String)>,
    pub children: Vec<NodeId>,
    pub text: Option<String>,
    pub parent: Option<NodeId>,
}

impl Node {
    fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            attributes: Vec::new(),
            children: Vec::new(),
            text: None,
            parent: None,
        }
    }
}

/// Attributed element tree
#[derive(Debug, Clone)]
pub struct XmlDocument {
    nodes: Vec<Node>,
    root: NodeId,
}

impl XmlDocument {
    /// Create a document holding only an empty root element
    pub fn new(root_tag: impl Into<String>) -> Self {
        Self {
            nodes: vec![Node::new(root_tag)],
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub(crate) fn set_root(&mut self, root: NodeId) {
        self.root = root;
    }

    /// Build a document with no nodes; the parser fills it
    pub(crate) fn empty() -> Self {
        Self {
            nodes: Vec::new(),
            root: NodeId(0),
        }
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    /// Number of nodes in the arena, detached ones included
    pub fn arena_len(&self) -> usize {
        self.nodes.len()
    }

    pub fn tag(&self, id: NodeId) -> &str {
        &self.node(id).tag
    }

    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        self.node(id)
            .attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn attributes(&self, id: NodeId) -> &[(String, String)] {
        &self.node(id).attributes
    }

    /// Set an attribute, keeping its position if it already exists
    pub fn set_attr(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        let value = value.into();
        let attrs = &mut self.node_mut(id).attributes;
        match attrs.iter_mut().find(|(k, _)| k == name) {
            Some((_, v)) => *v = value,
            None => attrs.push((name.to_string(), value)),
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) -> Option<String> {
        let attrs = &mut self.node_mut(id).attributes;
        let pos = attrs.iter().position(|(k, _)| k == name)?;
        Some(attrs.remove(pos).1)
    }

    pub fn text(&self, id: NodeId) -> Option<&str> {
        self.node(id).text.as_deref()
    }

    pub fn set_text(&mut self, id: NodeId, text: Option<String>) {
        self.node_mut(id).text = text;
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    /// Allocate a detached element
    pub fn create_element(&mut self, tag: impl Into<String>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::new(tag));
        id
    }

    /// Allocate a detached element with attributes
    pub fn create_element_with(&mut self, tag: impl Into<String>, attributes: &[(&str, &str)]) -> NodeId {
        let id = self.create_element(tag);
        for (name, value) in attributes {
            self.set_attr(id, name, *value);
        }
        id
    }

    /// Remove `child` from its current parent, if any
    pub fn detach(&mut self, child: NodeId) {
        if let Some(parent) = self.node(child).parent {
            self.node_mut(parent).children.retain(|c| *c != child);
            self.node_mut(child).parent = None;
        }
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.node_mut(parent).children.push(child);
        self.node_mut(child).parent = Some(parent);
    }

    /// Insert at `index`, clamped to the number of children
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        self.detach(child);
        let children = &mut self.node_mut(parent).children;
        let index = index.min(children.len());
        children.insert(index, child);
        self.node_mut(child).parent = Some(parent);
    }

    /// Detach `child` from `parent`; returns false if it was not a child
    pub fn remove_child(&mut self, parent: NodeId, child: NodeId) -> bool {
        if self.node(child).parent != Some(parent) {
            return false;
        }
        self.detach(child);
        true
    }

    /// Replace the ordered child list of `parent`.
    ///
    /// Previous children missing from `children` are detached; nodes
    /// currently attached elsewhere are moved here.
    pub fn set_children(&mut self, parent: NodeId, children: Vec<NodeId>) {
        let previous = std::mem::take(&mut self.node_mut(parent).children);
        for old in previous {
            self.node_mut(old).parent = None;
        }
        for child in &children {
            self.detach(*child);
            self.node_mut(*child).parent = Some(parent);
        }
        self.node_mut(parent).children = children;
    }

    /// Copy `id` and its whole subtree; the copy is detached
    pub fn deep_clone(&mut self, id: NodeId) -> NodeId {
        let source = self.node(id).clone();
        let copy = self.create_element(source.tag);
        self.node_mut(copy).attributes = source.attributes;
        self.node_mut(copy).text = source.text;
        for child in source.children {
            let child_copy = self.deep_clone(child);
            self.append_child(copy, child_copy);
        }
        copy
    }

    /// Child elements with the given tag, in order
    pub fn child_elements<'a>(&'a self, parent: NodeId, tag: &'a str) -> impl Iterator<Item = NodeId> + 'a {
        self.children(parent)
            .iter()
            .copied()
            .filter(move |c| self.tag(*c) == tag)
    }

    /// First child with `tag` whose attribute `name` equals `value`
    pub fn find_child(&self, parent: NodeId, tag: &str, name: &str, value: &str) -> Option<NodeId> {
        self.child_elements(parent, tag)
            .find(|c| self.attr(*c, name) == Some(value))
    }

    /// All descendants of `id` in document order, `id` itself excluded
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    /// Every attached element with `tag`, in document order
    pub fn find_all(&self, tag: &str) -> Vec<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .filter(|n| self.tag(*n) == tag)
            .collect()
    }

    /// First attached element with `tag` whose attribute `name` equals `value`
    pub fn find_first(&self, tag: &str, name: &str, value: &str) -> Option<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .find(|n| self.tag(*n) == tag && self.attr(*n, name) == Some(value))
    }

    /// Whether `id` is reachable from the root
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == self.root {
                return true;
            }
            match self.parent(current) {
                Some(parent) => current = parent,
                None => return false,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_order_is_preserved() {
        let mut doc = XmlDocument::new("mlt");
        let root = doc.root();
        doc.set_attr(root, "b", "1");
        doc.set_attr(root, "a", "2");
        doc.set_attr(root, "b", "3");

        let names: Vec<&str> = doc.attributes(root).iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(doc.attr(root, "b"), Some("3"));
    }

    #[test]
    fn test_reparenting_detaches_from_old_parent() {
        let mut doc = XmlDocument::new("mlt");
        let root = doc.root();
        let a = doc.create_element("playlist");
        let b = doc.create_element("playlist");
        let entry = doc.create_element("entry");
        doc.append_child(root, a);
        doc.append_child(root, b);
        doc.append_child(a, entry);

        doc.append_child(b, entry);

        assert!(doc.children(a).is_empty());
        assert_eq!(doc.children(b), &[entry]);
        assert_eq!(doc.parent(entry), Some(b));
    }

    #[test]
    fn test_set_children_detaches_dropped_nodes() {
        let mut doc = XmlDocument::new("playlist");
        let root = doc.root();
        let first = doc.create_element("entry");
        let second = doc.create_element("blank");
        doc.append_child(root, first);
        doc.append_child(root, second);

        doc.set_children(root, vec![second]);

        assert_eq!(doc.children(root), &[second]);
        assert!(!doc.is_attached(first));
        assert!(doc.is_attached(second));
    }

    #[test]
    fn test_deep_clone_copies_subtree() {
        let mut doc = XmlDocument::new("mlt");
        let root = doc.root();
        let entry = doc.create_element_with("entry", &[("producer", "p1")]);
        let prop = doc.create_element_with("property", &[("name", "effect")]);
        doc.set_text(prop, Some("blur".to_string()));
        doc.append_child(entry, prop);
        doc.append_child(root, entry);

        let copy = doc.deep_clone(entry);

        assert_ne!(copy, entry);
        assert_eq!(doc.attr(copy, "producer"), Some("p1"));
        let copied_prop = doc.children(copy)[0];
        assert_ne!(copied_prop, prop);
        assert_eq!(doc.text(copied_prop), Some("blur"));
        assert!(!doc.is_attached(copy));
    }

    #[test]
    fn test_find_first_skips_detached_nodes() {
        let mut doc = XmlDocument::new("mlt");
        let root = doc.root();
        let playlist = doc.create_element_with("playlist", &[("id", "p0")]);
        doc.append_child(root, playlist);
        assert_eq!(doc.find_first("playlist", "id", "p0"), Some(playlist));

        doc.remove_child(root, playlist);
        assert_eq!(doc.find_first("playlist", "id", "p0"), None);
    }
}
