use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::{Document, Node};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeType {
    Doc,
    Paragraph,
    Heading,
    BulletList,
    OrderedList,
    ListItem,
    Blockquote,
    Image,
    Text,
    Youtube,
}

impl NodeType {
    pub fn name(self) -> &'static str {
        match self {
            NodeType::Doc => "doc",
            NodeType::Paragraph => "paragraph",
            NodeType::Heading => "heading",
            NodeType::BulletList => "bulletList",
            NodeType::OrderedList => "orderedList",
            NodeType::ListItem => "listItem",
            NodeType::Blockquote => "blockquote",
            NodeType::Image => "image",
            NodeType::Text => "text",
            NodeType::Youtube => "youtube",
        }
    }

    /// Accepts the persisted names, including the legacy `imageComponent`.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "doc" | "document" => NodeType::Doc,
            "paragraph" => NodeType::Paragraph,
            "heading" => NodeType::Heading,
            "bulletList" => NodeType::BulletList,
            "orderedList" => NodeType::OrderedList,
            "listItem" => NodeType::ListItem,
            "blockquote" => NodeType::Blockquote,
            "image" | "imageComponent" => NodeType::Image,
            "text" => NodeType::Text,
            "youtube" => NodeType::Youtube,
            _ => return None,
        })
    }

    /// Elements whose children are text leaves.
    pub fn is_textblock(self) -> bool {
        matches!(
            self,
            NodeType::Paragraph | NodeType::Heading | NodeType::Image
        )
    }

    pub fn is_block(self) -> bool {
        !matches!(self, NodeType::Doc | NodeType::Text | NodeType::ListItem)
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarkType {
    Bold,
    Italic,
    Underline,
    Strike,
    Code,
    Link,
}

impl MarkType {
    pub const ALL: [MarkType; 6] = [
        MarkType::Bold,
        MarkType::Italic,
        MarkType::Underline,
        MarkType::Strike,
        MarkType::Code,
        MarkType::Link,
    ];

    pub fn name(self) -> &'static str {
        match self {
            MarkType::Bold => "bold",
            MarkType::Italic => "italic",
            MarkType::Underline => "underline",
            MarkType::Strike => "strike",
            MarkType::Code => "code",
            MarkType::Link => "link",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        MarkType::ALL.into_iter().find(|m| m.name() == name)
    }

    const fn bit(self) -> u8 {
        1 << self as u8
    }
}

impl fmt::Display for MarkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MarkSet(u8);

impl MarkSet {
    pub const NONE: MarkSet = MarkSet(0);
    pub const ALL: MarkSet = MarkSet(0b11_1111);

    pub fn of(marks: &[MarkType]) -> Self {
        marks.iter().copied().fold(Self::NONE, Self::with)
    }

    pub const fn with(self, mark: MarkType) -> Self {
        MarkSet(self.0 | mark.bit())
    }

    pub const fn contains(self, mark: MarkType) -> bool {
        self.0 & mark.bit() != 0
    }

    pub fn intersect(self, other: MarkSet) -> Self {
        MarkSet(self.0 & other.0)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = MarkType> {
        MarkType::ALL.into_iter().filter(move |m| self.contains(*m))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListKind {
    Bullet,
    Ordered,
}

impl ListKind {
    pub fn node_type(self) -> NodeType {
        match self {
            ListKind::Bullet => NodeType::BulletList,
            ListKind::Ordered => NodeType::OrderedList,
        }
    }

    pub fn from_node_type(node_type: NodeType) -> Option<Self> {
        match node_type {
            NodeType::BulletList => Some(ListKind::Bullet),
            NodeType::OrderedList => Some(ListKind::Ordered),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentModel {
    /// One or more block nodes.
    Blocks,
    /// Zero or more text leaves.
    Inline,
    Single(NodeType),
    OneOrMore(NodeType),
    Leaf,
}

impl ContentModel {
    pub fn allows(&self, child: NodeType) -> bool {
        match self {
            ContentModel::Blocks => child.is_block(),
            ContentModel::Inline => child == NodeType::Text,
            ContentModel::Single(t) | ContentModel::OneOrMore(t) => child == *t,
            ContentModel::Leaf => false,
        }
    }

    fn accepts_count(&self, count: usize) -> bool {
        match self {
            ContentModel::Blocks | ContentModel::OneOrMore(_) => count >= 1,
            ContentModel::Single(_) => count == 1,
            ContentModel::Inline => true,
            ContentModel::Leaf => count == 0,
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            ContentModel::Blocks => "block+",
            ContentModel::Inline => "inline*",
            ContentModel::Single(_) => "exactly one child",
            ContentModel::OneOrMore(_) => "one or more children",
            ContentModel::Leaf => "no children",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkRule {
    pub mark: MarkType,
    /// Whether typing at the trailing edge of the mark extends it.
    pub inclusive: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeSpec {
    pub node_type: NodeType,
    pub content: ContentModel,
    /// Marks allowed on text anywhere below this node.
    pub marks: MarkSet,
    pub draggable: bool,
    pub isolating: bool,
    pub atom: bool,
}

impl NodeSpec {
    pub fn new(node_type: NodeType, content: ContentModel) -> Self {
        Self {
            node_type,
            content,
            marks: MarkSet::ALL,
            draggable: false,
            isolating: false,
            atom: false,
        }
    }

    pub fn marks(mut self, marks: MarkSet) -> Self {
        self.marks = marks;
        self
    }

    pub fn draggable(mut self) -> Self {
        self.draggable = true;
        self
    }

    pub fn isolating(mut self) -> Self {
        self.isolating = true;
        self
    }

    pub fn atom(mut self) -> Self {
        self.atom = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("{child} is not allowed inside {parent}")]
    DisallowedChild { parent: NodeType, child: NodeType },
    #[error("{node} at {path:?} expects {expected}, found {found} children")]
    ChildCount {
        node: NodeType,
        path: Vec<usize>,
        expected: &'static str,
        found: usize,
    },
    #[error("mark {mark} is not allowed at {path:?}")]
    DisallowedMark { mark: MarkType, path: Vec<usize> },
    #[error("no node spec registered for {0}")]
    UnknownNode(NodeType),
    #[error("duplicate node spec: {0}")]
    DuplicateNode(NodeType),
    #[error("duplicate mark rule: {0}")]
    DuplicateMark(MarkType),
}

#[derive(Debug, Clone, Default)]
pub struct Schema {
    nodes: HashMap<NodeType, NodeSpec>,
    marks: HashMap<MarkType, MarkRule>,
}

impl Schema {
    pub fn register_node(&mut self, spec: NodeSpec) -> Result<(), SchemaError> {
        if self.nodes.contains_key(&spec.node_type) {
            return Err(SchemaError::DuplicateNode(spec.node_type));
        }
        self.nodes.insert(spec.node_type, spec);
        Ok(())
    }

    pub fn register_mark(&mut self, rule: MarkRule) -> Result<(), SchemaError> {
        if self.marks.contains_key(&rule.mark) {
            return Err(SchemaError::DuplicateMark(rule.mark));
        }
        self.marks.insert(rule.mark, rule);
        Ok(())
    }

    pub fn spec(&self, node_type: NodeType) -> Option<&NodeSpec> {
        self.nodes.get(&node_type)
    }

    pub fn node_type(&self, node_type: NodeType) -> Option<&ContentModel> {
        self.spec(node_type).map(|s| &s.content)
    }

    pub fn mark_type(&self, mark: MarkType) -> Option<&MarkRule> {
        self.marks.get(&mark)
    }

    pub fn lookup(&self, name: &str) -> Option<&NodeSpec> {
        NodeType::from_name(name).and_then(|t| self.spec(t))
    }

    pub fn is_inclusive(&self, mark: MarkType) -> bool {
        self.mark_type(mark).is_none_or(|rule| rule.inclusive)
    }

    pub fn allows_child(&self, parent: NodeType, child: NodeType) -> bool {
        self.node_type(parent).is_some_and(|m| m.allows(child))
    }

    pub fn ensure_child(&self, parent: NodeType, child: NodeType) -> Result<(), SchemaError> {
        if self.allows_child(parent, child) {
            Ok(())
        } else {
            Err(SchemaError::DisallowedChild { parent, child })
        }
    }

    pub fn allowed_marks(&self, node_type: NodeType) -> MarkSet {
        self.spec(node_type).map_or(MarkSet::NONE, |s| s.marks)
    }

    /// Validates content models and mark whitelists over the whole tree.
    pub fn check(&self, doc: &Document) -> Result<(), SchemaError> {
        let root = self
            .spec(NodeType::Doc)
            .ok_or(SchemaError::UnknownNode(NodeType::Doc))?;
        self.check_children(root, &doc.children, &mut Vec::new(), root.marks)
    }

    fn check_children(
        &self,
        spec: &NodeSpec,
        children: &[Node],
        path: &mut Vec<usize>,
        marks: MarkSet,
    ) -> Result<(), SchemaError> {
        if !spec.content.accepts_count(children.len()) {
            return Err(SchemaError::ChildCount {
                node: spec.node_type,
                path: path.clone(),
                expected: spec.content.describe(),
                found: children.len(),
            });
        }

        for (ix, child) in children.iter().enumerate() {
            let child_type = child.node_type();
            self.ensure_child(spec.node_type, child_type)?;
            path.push(ix);
            match child {
                Node::Text(t) => {
                    if let Some(mark) = t.marks.types().iter().find(|m| !marks.contains(*m)) {
                        return Err(SchemaError::DisallowedMark {
                            mark,
                            path: path.clone(),
                        });
                    }
                }
                Node::Element(el) => {
                    let child_spec = self
                        .spec(child_type)
                        .ok_or(SchemaError::UnknownNode(child_type))?;
                    let inner = marks.intersect(child_spec.marks);
                    self.check_children(child_spec, &el.children, path, inner)?;
                }
                Node::Void(_) => {
                    self.spec(child_type)
                        .ok_or(SchemaError::UnknownNode(child_type))?;
                }
            }
            path.pop();
        }
        Ok(())
    }
}
