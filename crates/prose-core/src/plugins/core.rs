use serde_json::Value;

use crate::core::{Document, Node, PointRange};
use crate::navigator::{self, NavState};
use crate::ops::Op;
use crate::plugin::{EditorPlugin, NormalizePass, PluginRegistry, QueryError, QuerySpec};
use crate::schema::{ContentModel, NodeSpec, NodeType};

pub(crate) struct CorePlugin;

impl EditorPlugin for CorePlugin {
    fn id(&self) -> &'static str {
        "core"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![
            NodeSpec::new(NodeType::Doc, ContentModel::Blocks),
            NodeSpec::new(NodeType::Paragraph, ContentModel::Inline),
            NodeSpec::new(NodeType::Text, ContentModel::Leaf),
        ]
    }

    fn normalize_passes(&self) -> Vec<Box<dyn NormalizePass>> {
        vec![
            Box::new(EnsureNonEmptyDocument),
            Box::new(EnsureTextblockHasTextLeaf),
            Box::new(DropStrayEmptyTextLeaves),
            Box::new(MergeAdjacentTextLeaves),
            Box::new(EnsureTrailingParagraph),
        ]
    }

    fn queries(&self) -> Vec<QuerySpec> {
        vec![
            QuerySpec::new("nav.state", |editor, _args| {
                let state = match navigator::nav_state(editor) {
                    NavState::Normal => "normal",
                    NavState::InImage => "in_image",
                    NavState::InBlockquote => "in_blockquote",
                };
                Ok(Value::String(state.to_string()))
            }),
            QuerySpec::new("block.active_types", |editor, _args| {
                serde_json::to_value(editor.active_types())
                    .map_err(|err| QueryError::new(format!("Failed to encode types: {err}")))
            }),
        ]
    }
}

struct EnsureNonEmptyDocument;

impl NormalizePass for EnsureNonEmptyDocument {
    fn id(&self) -> &'static str {
        "core.ensure_non_empty_document"
    }

    fn run(
        &self,
        doc: &Document,
        _selection: &PointRange,
        _registry: &PluginRegistry,
    ) -> Vec<Op> {
        if doc.children.is_empty() {
            return vec![Op::InsertNode {
                path: vec![0],
                node: Node::paragraph(""),
            }];
        }
        Vec::new()
    }
}

struct EnsureTextblockHasTextLeaf;

impl NormalizePass for EnsureTextblockHasTextLeaf {
    fn id(&self) -> &'static str {
        "core.ensure_textblock_has_text_leaf"
    }

    fn run(
        &self,
        doc: &Document,
        _selection: &PointRange,
        _registry: &PluginRegistry,
    ) -> Vec<Op> {
        let mut ops = Vec::new();

        fn walk(children: &[Node], path: &mut Vec<usize>, ops: &mut Vec<Op>) {
            for (ix, node) in children.iter().enumerate() {
                let Node::Element(el) = node else {
                    continue;
                };

                path.push(ix);

                if el.node_type().is_textblock() {
                    let has_text = el.children.iter().any(|n| matches!(n, Node::Text(_)));
                    if !has_text {
                        let mut insert_path = path.clone();
                        insert_path.push(0);
                        ops.push(Op::InsertNode {
                            path: insert_path,
                            node: Node::text(""),
                        });
                    }
                } else {
                    walk(&el.children, path, ops);
                }

                path.pop();
            }
        }

        walk(&doc.children, &mut Vec::new(), &mut ops);
        ops
    }
}

/// Removes empty leaves left behind by caret mark toggles once the caret has moved on.
struct DropStrayEmptyTextLeaves;

impl NormalizePass for DropStrayEmptyTextLeaves {
    fn id(&self) -> &'static str {
        "core.drop_stray_empty_text_leaves"
    }

    fn run(
        &self,
        doc: &Document,
        selection: &PointRange,
        _registry: &PluginRegistry,
    ) -> Vec<Op> {
        let mut ops = Vec::new();

        fn walk(children: &[Node], path: &mut Vec<usize>, selection: &PointRange, ops: &mut Vec<Op>) {
            for (ix, node) in children.iter().enumerate() {
                let Node::Element(el) = node else {
                    continue;
                };

                path.push(ix);

                if !el.node_type().is_textblock() {
                    walk(&el.children, path, selection, ops);
                    path.pop();
                    continue;
                }

                let mut stray: Vec<usize> = el
                    .children
                    .iter()
                    .enumerate()
                    .filter(|(leaf_ix, leaf)| {
                        let Node::Text(t) = leaf else {
                            return false;
                        };
                        if !t.text.is_empty() {
                            return false;
                        }
                        let mut leaf_path = path.clone();
                        leaf_path.push(*leaf_ix);
                        leaf_path != selection.anchor.path && leaf_path != selection.focus.path
                    })
                    .map(|(leaf_ix, _)| leaf_ix)
                    .collect();

                // A block made only of stray leaves keeps its first one.
                if !stray.is_empty() && stray.len() == el.children.len() {
                    stray.remove(0);
                }

                for leaf_ix in stray.into_iter().rev() {
                    let mut remove_path = path.clone();
                    remove_path.push(leaf_ix);
                    ops.push(Op::RemoveNode { path: remove_path });
                }

                path.pop();
            }
        }

        walk(&doc.children, &mut Vec::new(), selection, &mut ops);
        ops
    }
}

struct MergeAdjacentTextLeaves;

impl NormalizePass for MergeAdjacentTextLeaves {
    fn id(&self) -> &'static str {
        "core.merge_adjacent_text_leaves"
    }

    fn run(
        &self,
        doc: &Document,
        _selection: &PointRange,
        _registry: &PluginRegistry,
    ) -> Vec<Op> {
        let mut ops = Vec::new();

        fn walk(children: &[Node], path: &mut Vec<usize>, ops: &mut Vec<Op>) {
            for (ix, node) in children.iter().enumerate() {
                let Node::Element(el) = node else {
                    continue;
                };

                path.push(ix);

                if !el.node_type().is_textblock() {
                    walk(&el.children, path, ops);
                    path.pop();
                    continue;
                }

                let mut ix = el.children.len();
                while ix > 0 {
                    ix -= 1;
                    let Node::Text(right) = &el.children[ix] else {
                        continue;
                    };

                    let mut start = ix;
                    while start > 0 {
                        let Some(Node::Text(left)) = el.children.get(start - 1) else {
                            break;
                        };
                        if left.marks != right.marks {
                            break;
                        }
                        start -= 1;
                    }

                    if start == ix {
                        continue;
                    }

                    let Some(Node::Text(first)) = el.children.get(start) else {
                        continue;
                    };
                    let appended: String = el.children[start + 1..=ix]
                        .iter()
                        .filter_map(|n| match n {
                            Node::Text(t) => Some(t.text.as_str()),
                            _ => None,
                        })
                        .collect();

                    if !appended.is_empty() {
                        let mut insert_text_path = path.clone();
                        insert_text_path.push(start);
                        ops.push(Op::InsertText {
                            path: insert_text_path,
                            offset: first.text.len(),
                            text: appended,
                        });
                    }

                    for remove_ix in (start + 1..=ix).rev() {
                        let mut remove_path = path.clone();
                        remove_path.push(remove_ix);
                        ops.push(Op::RemoveNode { path: remove_path });
                    }

                    ix = start;
                }

                path.pop();
            }
        }

        walk(&doc.children, &mut Vec::new(), &mut ops);
        ops
    }
}

/// Keeps a paragraph after the last block so the caret can always leave it.
struct EnsureTrailingParagraph;

impl NormalizePass for EnsureTrailingParagraph {
    fn id(&self) -> &'static str {
        "core.ensure_trailing_paragraph"
    }

    fn run(
        &self,
        doc: &Document,
        _selection: &PointRange,
        _registry: &PluginRegistry,
    ) -> Vec<Op> {
        match doc.children.last() {
            Some(last) if last.node_type() != NodeType::Paragraph => vec![Op::InsertNode {
                path: vec![doc.children.len()],
                node: Node::paragraph(""),
            }],
            _ => Vec::new(),
        }
    }
}
