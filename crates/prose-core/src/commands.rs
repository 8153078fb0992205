//! Selection, mark-range and block-lifting helpers shared by the plugins.

use serde_json::Value;

use crate::core::{
    BlockKind, Document, Editor, ElementNode, Marks, Node, Point, PointRange, TextNode,
    clamp_to_char_boundary,
};
use crate::ops::{Op, Path, Transaction};
use crate::plugin::CommandError;
use crate::schema::{ListKind, NodeType};

pub(crate) fn apply_tx(editor: &mut Editor, tx: Transaction, what: &str) -> Result<(), CommandError> {
    if tx.is_empty() {
        return Ok(());
    }
    editor
        .apply(tx)
        .map_err(|e| CommandError::new(format!("Failed to {what}: {e}")))
}

pub(crate) fn str_arg<'a>(args: Option<&'a Value>, key: &str) -> Option<&'a str> {
    args.and_then(|v| v.get(key)).and_then(Value::as_str)
}

pub(crate) fn child_path(parent: &[usize], ix: usize) -> Path {
    let mut path = parent.to_vec();
    path.push(ix);
    path
}

pub(crate) fn ordered_points(sel: &PointRange) -> (Point, Point) {
    let mut start = sel.anchor.clone();
    let mut end = sel.focus.clone();

    if start.path == end.path {
        if end.offset < start.offset {
            std::mem::swap(&mut start, &mut end);
        }
        return (start, end);
    }
    if end.path < start.path {
        std::mem::swap(&mut start, &mut end);
    }
    (start, end)
}

/// Path of the textblock holding the selection focus.
pub(crate) fn focus_block_path(editor: &Editor) -> Option<Path> {
    let focus = &editor.point_selection().focus;
    let (_, block_path) = focus.path.split_last()?;
    let el = editor.doc().element(block_path)?;
    el.node_type().is_textblock().then(|| block_path.to_vec())
}

pub(crate) fn focus_block(editor: &Editor) -> Option<(Path, &ElementNode)> {
    let path = focus_block_path(editor)?;
    let el = editor.doc().element(&path)?;
    Some((path, el))
}

/// Nearest ancestor of `point_path` (inclusive) with the given type.
pub(crate) fn ancestor_path(doc: &Document, point_path: &[usize], node_type: NodeType) -> Option<Path> {
    let mut path: Path = point_path.to_vec();
    while !path.is_empty() {
        if let Some(Node::Element(el)) = doc.node(&path) {
            if el.node_type() == node_type {
                return Some(path);
            }
        }
        path.pop();
    }
    None
}

pub(crate) fn focus_in(editor: &Editor, node_type: NodeType) -> Option<Path> {
    ancestor_path(editor.doc(), &editor.point_selection().focus.path, node_type)
}

pub(crate) fn active_list(editor: &Editor) -> Option<(Path, ListKind)> {
    let focus = &editor.point_selection().focus.path;
    let mut path: Path = focus.clone();
    while !path.is_empty() {
        if let Some(kind) = editor
            .doc()
            .node(&path)
            .and_then(|n| ListKind::from_node_type(n.node_type()))
        {
            return Some((path, kind));
        }
        path.pop();
    }
    None
}

pub(crate) struct TextBlock<'a> {
    pub(crate) path: Path,
    pub(crate) el: &'a ElementNode,
}

pub(crate) fn text_blocks_in_order(doc: &Document) -> Vec<TextBlock<'_>> {
    fn walk<'a>(nodes: &'a [Node], path: &mut Vec<usize>, out: &mut Vec<TextBlock<'a>>) {
        for (ix, node) in nodes.iter().enumerate() {
            let Node::Element(el) = node else {
                continue;
            };

            path.push(ix);

            if el.node_type().is_textblock() {
                out.push(TextBlock {
                    path: path.clone(),
                    el,
                });
            } else {
                walk(&el.children, path, out);
            }

            path.pop();
        }
    }

    let mut out = Vec::new();
    walk(&doc.children, &mut Vec::new(), &mut out);
    out
}

/// Byte offset of a point measured from the start of its textblock.
pub(crate) fn point_global_offset(children: &[Node], child_ix: usize, offset: usize) -> usize {
    let mut global = 0usize;
    for (ix, node) in children.iter().enumerate() {
        let Node::Text(t) = node else {
            continue;
        };
        if ix < child_ix {
            global += t.text.len();
            continue;
        }
        if ix == child_ix {
            global += clamp_to_char_boundary(&t.text, offset);
        }
        break;
    }
    global
}

pub(crate) fn point_for_global_offset(
    block_path: &[usize],
    children: &[Node],
    global_offset: usize,
) -> Point {
    let mut remaining = global_offset;
    for (child_ix, node) in children.iter().enumerate() {
        let Node::Text(t) = node else {
            continue;
        };
        if remaining < t.text.len() {
            return Point::new(
                child_path(block_path, child_ix),
                clamp_to_char_boundary(&t.text, remaining),
            );
        }
        if remaining == t.text.len() {
            if matches!(children.get(child_ix + 1), Some(Node::Text(_))) {
                return Point::new(child_path(block_path, child_ix + 1), 0);
            }
            return Point::new(child_path(block_path, child_ix), t.text.len());
        }
        remaining -= t.text.len();
    }

    // Past the end: clamp to the last leaf.
    for (child_ix, node) in children.iter().enumerate().rev() {
        if let Node::Text(t) = node {
            return Point::new(child_path(block_path, child_ix), t.text.len());
        }
    }

    Point::new(child_path(block_path, 0), 0)
}

fn is_point_in_block(point: &Point, block_path: &[usize]) -> bool {
    point.path.len() == block_path.len() + 1 && point.path.starts_with(block_path)
}

fn total_inline_text_len(children: &[Node]) -> usize {
    children
        .iter()
        .map(|n| match n {
            Node::Text(t) => t.text.len(),
            Node::Element(_) | Node::Void(_) => 0,
        })
        .sum()
}

fn apply_marks_in_block(
    children: &[Node],
    start_global: usize,
    end_global: usize,
    apply: &dyn Fn(Marks) -> Marks,
) -> Vec<Node> {
    if start_global >= end_global {
        return children.to_vec();
    }

    let mut out: Vec<Node> = Vec::new();
    let mut cursor = 0usize;

    for node in children {
        let Node::Text(t) = node else {
            out.push(node.clone());
            continue;
        };
        let node_start = cursor;
        let node_end = cursor + t.text.len();
        cursor = node_end;

        if end_global <= node_start || start_global >= node_end {
            out.push(node.clone());
            continue;
        }

        let sel_start = clamp_to_char_boundary(&t.text, start_global.saturating_sub(node_start));
        let sel_end = clamp_to_char_boundary(&t.text, end_global.saturating_sub(node_start));

        if sel_start == 0 && sel_end == t.text.len() {
            let mut next = t.clone();
            next.marks = apply(next.marks);
            out.push(Node::Text(next));
            continue;
        }

        let prefix = &t.text[..sel_start];
        let middle = &t.text[sel_start..sel_end];
        let suffix = &t.text[sel_end..];

        if !prefix.is_empty() {
            out.push(Node::marked_text(prefix, t.marks.clone()));
        }
        if !middle.is_empty() {
            out.push(Node::marked_text(middle, apply(t.marks.clone())));
        }
        if !suffix.is_empty() {
            out.push(Node::marked_text(suffix, t.marks.clone()));
        }
    }

    if out.is_empty() {
        out.push(Node::text(""));
    }

    out
}

/// Rewrites the marks of every text leaf covered by `sel`, splitting leaves at the edges.
pub(crate) fn apply_mark_range(
    editor: &Editor,
    sel: &PointRange,
    apply: &dyn Fn(Marks) -> Marks,
) -> Result<(Vec<Op>, PointRange), String> {
    let (start, end) = ordered_points(sel);

    let Some(start_block_path) = start.path.split_last().map(|(_, p)| p.to_vec()) else {
        return Err("Selection start is not in a text block".into());
    };
    let Some(end_block_path) = end.path.split_last().map(|(_, p)| p.to_vec()) else {
        return Err("Selection end is not in a text block".into());
    };

    let blocks = text_blocks_in_order(editor.doc());
    let start_index = blocks
        .iter()
        .position(|b| b.path == start_block_path)
        .ok_or_else(|| "Selection start is not in a text block".to_string())?;
    let end_index = blocks
        .iter()
        .position(|b| b.path == end_block_path)
        .ok_or_else(|| "Selection end is not in a text block".to_string())?;

    let (start_index, end_index) = if start_index <= end_index {
        (start_index, end_index)
    } else {
        (end_index, start_index)
    };

    let start_inline_ix = start.path.last().copied().unwrap_or(0);
    let end_inline_ix = end.path.last().copied().unwrap_or(0);

    let mut ops: Vec<Op> = Vec::new();
    let mut new_anchor = sel.anchor.clone();
    let mut new_focus = sel.focus.clone();

    for (block_index, block) in blocks
        .iter()
        .enumerate()
        .take(end_index + 1)
        .skip(start_index)
    {
        let children = block.el.children.as_slice();
        let total_len = total_inline_text_len(children);
        if total_len == 0 {
            continue;
        }

        let start_global = if block_index == start_index {
            point_global_offset(children, start_inline_ix, start.offset)
        } else {
            0
        };
        let end_global = if block_index == end_index {
            point_global_offset(children, end_inline_ix, end.offset)
        } else {
            total_len
        };

        if start_global >= end_global {
            continue;
        }

        let new_children = apply_marks_in_block(children, start_global, end_global, apply);
        ops.extend(replace_children_ops(&block.path, children.len(), &new_children));

        for point in [&mut new_anchor, &mut new_focus] {
            if is_point_in_block(point, &block.path) {
                let global = point_global_offset(
                    children,
                    point.path.last().copied().unwrap_or(0),
                    point.offset,
                );
                *point = point_for_global_offset(&block.path, &new_children, global);
            }
        }
    }

    Ok((
        ops,
        PointRange {
            anchor: new_anchor,
            focus: new_focus,
        },
    ))
}

pub(crate) fn replace_children_ops(parent: &[usize], old_len: usize, new_children: &[Node]) -> Vec<Op> {
    let mut ops = Vec::with_capacity(old_len + new_children.len());
    for child_ix in (0..old_len).rev() {
        ops.push(Op::RemoveNode {
            path: child_path(parent, child_ix),
        });
    }
    for (child_ix, node) in new_children.iter().cloned().enumerate() {
        ops.push(Op::InsertNode {
            path: child_path(parent, child_ix),
            node,
        });
    }
    ops
}

pub(crate) fn all_selected_text_nodes_have(
    editor: &Editor,
    sel: &PointRange,
    get: &dyn Fn(&Marks) -> bool,
) -> Result<bool, String> {
    let (start, end) = ordered_points(sel);
    let (Some((_, start_block)), Some((_, end_block))) =
        (start.path.split_last(), end.path.split_last())
    else {
        return Err("Selection is not in a text block".into());
    };

    let blocks = text_blocks_in_order(editor.doc());
    let start_index = blocks
        .iter()
        .position(|b| b.path == start_block)
        .ok_or_else(|| "Selection start is not in a text block".to_string())?;
    let end_index = blocks
        .iter()
        .position(|b| b.path == end_block)
        .ok_or_else(|| "Selection end is not in a text block".to_string())?;
    let (start_index, end_index) = (start_index.min(end_index), start_index.max(end_index));

    for (block_index, block) in blocks
        .iter()
        .enumerate()
        .take(end_index + 1)
        .skip(start_index)
    {
        let children = block.el.children.as_slice();
        let start_global = if block_index == start_index {
            point_global_offset(children, start.path.last().copied().unwrap_or(0), start.offset)
        } else {
            0
        };
        let end_global = if block_index == end_index {
            point_global_offset(children, end.path.last().copied().unwrap_or(0), end.offset)
        } else {
            total_inline_text_len(children)
        };
        if start_global >= end_global {
            continue;
        }

        let mut cursor = 0usize;
        for node in children {
            let Node::Text(t) = node else {
                continue;
            };
            let node_start = cursor;
            cursor += t.text.len();
            if end_global <= node_start || start_global >= cursor {
                continue;
            }
            if !get(&t.marks) {
                return Ok(false);
            }
        }
    }

    Ok(true)
}

/// Splits the focus leaf so the caret sits in an empty leaf carrying the new marks.
pub(crate) fn toggle_mark_at_caret(
    editor: &Editor,
    apply: impl Fn(Marks) -> Marks,
) -> Result<(Vec<Op>, PointRange), String> {
    let focus = editor.point_selection().focus.clone();
    let (child_ix, block_path) = focus
        .path
        .split_last()
        .ok_or_else(|| "Selection is not in a text node".to_string())?;

    let Some(el) = editor.doc().element(block_path) else {
        return Err("Selection is not in a text block".into());
    };
    let Some(Node::Text(text)) = el.children.get(*child_ix) else {
        return Err("Selection is not in a text node".into());
    };

    let cursor = clamp_to_char_boundary(&text.text, focus.offset);
    let marks_before = text.marks.clone();
    let marks_after = apply(marks_before.clone());

    if text.text.is_empty() {
        return Ok((
            vec![Op::SetTextMarks {
                path: focus.path.clone(),
                marks: marks_after,
            }],
            PointRange::collapsed(Point::new(focus.path.clone(), 0)),
        ));
    }

    let mut replacement: Vec<Node> = Vec::new();
    let mut caret_child_ix = *child_ix;

    let left = &text.text[..cursor];
    let right = &text.text[cursor..];

    if !left.is_empty() {
        replacement.push(Node::marked_text(left, marks_before.clone()));
        caret_child_ix += 1;
    }
    replacement.push(Node::marked_text("", marks_after));
    if !right.is_empty() {
        replacement.push(Node::marked_text(right, marks_before));
    }

    let mut ops: Vec<Op> = vec![Op::RemoveNode {
        path: focus.path.clone(),
    }];
    for (i, node) in replacement.into_iter().enumerate() {
        ops.push(Op::InsertNode {
            path: child_path(block_path, child_ix + i),
            node,
        });
    }

    let selection_after =
        PointRange::collapsed(Point::new(child_path(block_path, caret_child_ix), 0));
    Ok((ops, selection_after))
}

pub(crate) fn active_marks(editor: &Editor) -> Marks {
    let focus = &editor.point_selection().focus;
    match editor.doc().node(&focus.path) {
        Some(Node::Text(text)) => text.marks.clone(),
        _ => Marks::default(),
    }
}

/// A top-level slice that replaces one top-level child after lifting a textblock out of
/// its wrappers.
pub(crate) struct Lifted {
    pub(crate) top_index: usize,
    pub(crate) nodes: Vec<Node>,
    /// Index into `nodes` of the lifted textblock.
    pub(crate) block_index: usize,
}

impl Lifted {
    pub(crate) fn block_mut(&mut self) -> &mut Node {
        &mut self.nodes[self.block_index]
    }

    pub(crate) fn ops(&self) -> Vec<Op> {
        let mut ops = vec![Op::RemoveNode {
            path: vec![self.top_index],
        }];
        for (k, node) in self.nodes.iter().cloned().enumerate() {
            ops.push(Op::InsertNode {
                path: vec![self.top_index + k],
                node,
            });
        }
        ops
    }
}

/// Moves the textblock at `block_path` to the top level, splitting any list around it.
pub(crate) fn lift_block(doc: &Document, block_path: &[usize]) -> Option<Lifted> {
    let top_index = *block_path.first()?;
    let top = doc.children.get(top_index)?;
    if block_path.len() == 1 {
        return Some(Lifted {
            top_index,
            nodes: vec![top.clone()],
            block_index: 0,
        });
    }
    let Node::Element(container) = top else {
        return None;
    };

    match container.node_type() {
        NodeType::Blockquote => Some(Lifted {
            top_index,
            nodes: container.children.clone(),
            block_index: *block_path.get(1)?,
        }),
        NodeType::BulletList | NodeType::OrderedList => {
            let item_ix = *block_path.get(1)?;
            let para_ix = *block_path.get(2)?;
            let Some(Node::Element(item)) = container.children.get(item_ix) else {
                return None;
            };
            let before = &container.children[..item_ix];
            let after = &container.children[item_ix + 1..];

            let mut nodes = Vec::new();
            if !before.is_empty() {
                nodes.push(Node::element(container.kind.clone(), before.to_vec()));
            }
            let block_index = nodes.len() + para_ix;
            nodes.extend(item.children.iter().cloned());
            if !after.is_empty() {
                nodes.push(Node::element(container.kind.clone(), after.to_vec()));
            }
            Some(Lifted {
                top_index,
                nodes,
                block_index,
            })
        }
        _ => None,
    }
}

/// Rebuilds a textblock with a new kind, rewriting the marks of its leaves.
pub(crate) fn retype_textblock(node: &Node, kind: BlockKind, marks: impl Fn(&Marks) -> Marks) -> Node {
    let children = match node {
        Node::Element(el) => el
            .children
            .iter()
            .map(|child| match child {
                Node::Text(t) => Node::Text(TextNode {
                    text: t.text.clone(),
                    marks: marks(&t.marks),
                }),
                other => other.clone(),
            })
            .collect(),
        Node::Text(_) | Node::Void(_) => vec![Node::text("")],
    };
    Node::element(kind, children)
}

/// Maps the selection from a textblock into its rebuilt replacement at `new_block_path`.
pub(crate) fn remap_into_block(
    editor: &Editor,
    old_block_path: &[usize],
    old_children: &[Node],
    new_block_path: &[usize],
    new_children: &[Node],
) -> PointRange {
    let map = |point: &Point| -> Point {
        let global = if is_point_in_block(point, old_block_path) {
            point_global_offset(
                old_children,
                point.path.last().copied().unwrap_or(0),
                point.offset,
            )
        } else {
            0
        };
        point_for_global_offset(new_block_path, new_children, global)
    };
    let sel = editor.point_selection();
    PointRange {
        anchor: map(&sel.anchor),
        focus: map(&sel.focus),
    }
}

pub(crate) fn element_children(node: &Node) -> &[Node] {
    match node {
        Node::Element(el) => &el.children,
        Node::Text(_) | Node::Void(_) => &[],
    }
}

/// Splits inline children at a byte offset measured from the start of the textblock.
pub(crate) fn split_children_at(children: &[Node], global: usize) -> (Vec<Node>, Vec<Node>) {
    let mut left = Vec::new();
    let mut right = Vec::new();
    let mut cursor = 0usize;

    for node in children {
        let Node::Text(t) = node else {
            if cursor < global {
                left.push(node.clone());
            } else {
                right.push(node.clone());
            }
            continue;
        };
        let node_start = cursor;
        cursor += t.text.len();
        if cursor <= global {
            left.push(node.clone());
        } else if node_start >= global {
            right.push(node.clone());
        } else {
            let at = clamp_to_char_boundary(&t.text, global - node_start);
            left.push(Node::marked_text(&t.text[..at], t.marks.clone()));
            right.push(Node::marked_text(&t.text[at..], t.marks.clone()));
        }
    }

    if left.is_empty() {
        left.push(Node::text(""));
    }
    if right.is_empty() {
        right.push(Node::text(""));
    }
    (left, right)
}

/// Byte offset of the selection focus inside its textblock.
pub(crate) fn focus_block_offset(editor: &Editor) -> Option<(Path, usize)> {
    let (path, el) = focus_block(editor)?;
    let focus = &editor.point_selection().focus;
    let offset = point_global_offset(&el.children, focus.path.last().copied()?, focus.offset);
    Some((path, offset))
}

/// Ops placing `nodes` at the top level around the caret.
///
/// An empty top-level paragraph is replaced, a caret at a block edge inserts before or
/// after it and a caret mid-block splits the block. Inside images and containers the
/// nodes land after the top-level block. Returns the ops and the top-level index of the first new node.
pub(crate) fn insert_blocks_at_caret(editor: &Editor, nodes: Vec<Node>) -> (Vec<Op>, usize) {
    let doc = editor.doc();
    let insert_at = |at: usize, nodes: Vec<Node>| -> Vec<Op> {
        nodes
            .into_iter()
            .enumerate()
            .map(|(k, node)| Op::InsertNode {
                path: vec![at + k],
                node,
            })
            .collect()
    };

    let Some((block_path, offset)) = focus_block_offset(editor) else {
        let at = doc.children.len();
        return (insert_at(at, nodes), at);
    };
    let top = block_path[0];
    if block_path.len() > 1 {
        return (insert_at(top + 1, nodes), top + 1);
    }

    let Some(el) = doc.element(&block_path) else {
        return (insert_at(top + 1, nodes), top + 1);
    };
    let total = total_inline_text_len(&el.children);
    if el.node_type() == NodeType::Paragraph && total == 0 {
        let mut ops = vec![Op::RemoveNode {
            path: block_path.clone(),
        }];
        ops.extend(insert_at(top, nodes));
        return (ops, top);
    }
    if offset == 0 && el.node_type() != NodeType::Image {
        return (insert_at(top, nodes), top);
    }
    if offset >= total || el.node_type() == NodeType::Image {
        return (insert_at(top + 1, nodes), top + 1);
    }

    let (left, right) = split_children_at(&el.children, offset);
    let mut ops = vec![Op::RemoveNode {
        path: block_path.clone(),
    }];
    ops.push(Op::InsertNode {
        path: vec![top],
        node: Node::element(el.kind.clone(), left),
    });
    let count = nodes.len();
    ops.extend(insert_at(top + 1, nodes));
    ops.push(Op::InsertNode {
        path: vec![top + 1 + count],
        node: Node::element(el.kind.clone(), right),
    });
    (ops, top + 1)
}
