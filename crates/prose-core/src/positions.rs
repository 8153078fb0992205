//! Flat position addressing.
//!
//! Every text character occupies one position, atom leaves occupy one, and an
//! element occupies two boundary positions around its content. Positions are
//! derived from the tree on demand and never stored.

use crate::core::{Document, ElementNode, Node, Point, clamp_to_char_boundary};
use crate::ops::Path;
use crate::schema::NodeType;

pub fn node_size(node: &Node) -> usize {
    match node {
        Node::Text(t) => t.text.chars().count(),
        Node::Void(_) => 1,
        Node::Element(el) => content_size(&el.children) + 2,
    }
}

pub fn content_size(children: &[Node]) -> usize {
    children.iter().map(node_size).sum()
}

pub fn doc_size(doc: &Document) -> usize {
    content_size(&doc.children)
}

/// Boundaries of one top-level child.
///
/// `pos` and `from` mark where the content begins. `to` sits after the closing
/// boundary of textblocks and atoms, and at the content end of containers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodePos {
    pub index: usize,
    pub node_type: NodeType,
    pub before: usize,
    pub pos: usize,
    pub from: usize,
    pub to: usize,
    pub content_size: usize,
}

impl NodePos {
    pub fn contains(&self, pos: usize) -> bool {
        pos >= self.from && pos <= self.to
    }

    pub fn content_end(&self) -> usize {
        self.from + self.content_size
    }
}

pub fn top_level(doc: &Document) -> Vec<NodePos> {
    let mut before = 0;
    let mut out = Vec::with_capacity(doc.children.len());
    for (index, node) in doc.children.iter().enumerate() {
        let size = node_size(node);
        let node_type = node.node_type();
        let node_pos = match node {
            Node::Element(_) => {
                let content_size = size - 2;
                let from = before + 1;
                let to = if node_type.is_textblock() {
                    before + size
                } else {
                    from + content_size
                };
                NodePos {
                    index,
                    node_type,
                    before,
                    pos: from,
                    from,
                    to,
                    content_size,
                }
            }
            Node::Text(_) | Node::Void(_) => NodePos {
                index,
                node_type,
                before,
                pos: before,
                from: before,
                to: before + size,
                content_size: 0,
            },
        };
        out.push(node_pos);
        before += size;
    }
    out
}

/// An element whose content range contains a position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ancestor {
    pub node_type: NodeType,
    pub path: Path,
    pub content_start: usize,
    pub content_end: usize,
}

/// Elements enclosing `pos`, outermost first.
pub fn resolve(doc: &Document, pos: usize) -> Vec<Ancestor> {
    let mut out = Vec::new();
    let mut path: Path = Vec::new();
    let mut children: &[Node] = &doc.children;
    let mut start = 0;

    'descend: loop {
        let mut at = start;
        for (ix, node) in children.iter().enumerate() {
            let size = node_size(node);
            if let Node::Element(el) = node {
                let content_start = at + 1;
                let content_end = at + size - 1;
                if pos >= content_start && pos <= content_end {
                    path.push(ix);
                    out.push(Ancestor {
                        node_type: el.node_type(),
                        path: path.clone(),
                        content_start,
                        content_end,
                    });
                    children = &el.children;
                    start = content_start;
                    continue 'descend;
                }
            }
            at += size;
        }
        break;
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextblockRange {
    pub path: Path,
    pub start: usize,
    pub end: usize,
}

/// Content ranges of every textblock in document order.
pub fn textblocks(doc: &Document) -> Vec<TextblockRange> {
    fn walk(children: &[Node], at: &mut usize, path: &mut Path, out: &mut Vec<TextblockRange>) {
        for (ix, node) in children.iter().enumerate() {
            let Node::Element(el) = node else {
                *at += node_size(node);
                continue;
            };
            path.push(ix);
            let start = *at + 1;
            if el.node_type().is_textblock() {
                let end = start + content_size(&el.children);
                out.push(TextblockRange {
                    path: path.clone(),
                    start,
                    end,
                });
                *at = end + 1;
            } else {
                *at = start;
                walk(&el.children, at, path, out);
                *at += 1;
            }
            path.pop();
        }
    }

    let mut out = Vec::new();
    walk(&doc.children, &mut 0, &mut Vec::new(), &mut out);
    out
}

pub fn pos_at_point(doc: &Document, point: &Point) -> Option<usize> {
    let (last, parents) = point.path.split_last()?;
    let mut children: &[Node] = &doc.children;
    let mut at = 0;
    for &ix in parents {
        let Some(Node::Element(el)) = children.get(ix) else {
            return None;
        };
        at += content_size(&children[..ix]) + 1;
        children = &el.children;
    }
    let node = children.get(*last)?;
    at += content_size(&children[..*last]);
    if let Node::Text(t) = node {
        let offset = clamp_to_char_boundary(&t.text, point.offset);
        at += t.text[..offset].chars().count();
    }
    Some(at)
}

/// Text point at `pos`, or the closest textblock edge when `pos` sits between blocks.
pub fn nearest_text_point(doc: &Document, pos: usize) -> Option<Point> {
    let blocks = textblocks(doc);
    let (block, chars) = match blocks.iter().find(|b| pos >= b.start && pos <= b.end) {
        Some(b) => (b, pos - b.start),
        None => match blocks.iter().find(|b| b.start > pos) {
            Some(b) => (b, 0),
            None => {
                let b = blocks.last()?;
                (b, b.end - b.start)
            }
        },
    };
    let el = doc.element(&block.path)?;
    Some(point_in_block(&block.path, el, chars))
}

fn point_in_block(block_path: &[usize], el: &ElementNode, mut chars: usize) -> Point {
    let mut last = None;
    for (ix, child) in el.children.iter().enumerate() {
        match child {
            Node::Text(t) => {
                let len = t.text.chars().count();
                if chars <= len {
                    return Point::new(child_path(block_path, ix), byte_offset(&t.text, chars));
                }
                chars -= len;
                last = Some((ix, t.text.len()));
            }
            _ => chars = chars.saturating_sub(node_size(child)),
        }
    }
    match last {
        Some((ix, len)) => Point::new(child_path(block_path, ix), len),
        None => Point::new(child_path(block_path, 0), 0),
    }
}

pub(crate) fn byte_offset(text: &str, chars: usize) -> usize {
    text.char_indices()
        .nth(chars)
        .map_or(text.len(), |(byte, _)| byte)
}

fn child_path(parent: &[usize], ix: usize) -> Path {
    let mut path = parent.to_vec();
    path.push(ix);
    path
}
