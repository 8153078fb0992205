use serde_json::Value;

use crate::commands::{
    apply_tx, child_path, element_children, focus_block, focus_in, lift_block, remap_into_block,
    retype_textblock,
};
use crate::core::{BlockKind, Document, Editor, Marks, Node, Point, PointRange};
use crate::ops::{Op, Transaction};
use crate::plugin::{CommandError, CommandSpec, EditorPlugin, NormalizePass, PluginRegistry, QuerySpec};
use crate::rewrite::{MarkStripRule, RewriteRule};
use crate::schema::{ContentModel, MarkSet, NodeSpec, NodeType};

pub(crate) struct BlockquotePlugin;

impl EditorPlugin for BlockquotePlugin {
    fn id(&self) -> &'static str {
        "blockquote"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![
            NodeSpec::new(NodeType::Blockquote, ContentModel::Single(NodeType::Paragraph))
                .marks(MarkSet::NONE),
        ]
    }

    fn rewrite_rules(&self) -> Vec<Box<dyn RewriteRule>> {
        vec![Box::new(MarkStripRule::new(
            "blockquote.strip_marks",
            NodeType::Blockquote,
            MarkSet::NONE,
        ))]
    }

    fn normalize_passes(&self) -> Vec<Box<dyn NormalizePass>> {
        vec![Box::new(NormalizeBlockquoteChildren)]
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("blockquote.toggle", "Toggle blockquote", |editor, _args| {
                let tx = toggle_blockquote(editor).map_err(CommandError::new)?;
                apply_tx(editor, tx, "toggle blockquote")
            })
            .description("Wrap the active block in a blockquote, or unwrap it.")
            .keywords(["blockquote", "quote"]),
        ]
    }

    fn queries(&self) -> Vec<QuerySpec> {
        vec![QuerySpec::new("blockquote.is_active", |editor, _args| {
            Ok(Value::Bool(focus_in(editor, NodeType::Blockquote).is_some()))
        })]
    }
}

fn toggle_blockquote(editor: &Editor) -> Result<Transaction, String> {
    if let Some(quote_path) = focus_in(editor, NodeType::Blockquote) {
        return unwrap_blockquote(editor, quote_path);
    }

    let (block_path, el) = focus_block(editor).ok_or("Selection is not in a text block")?;
    if el.node_type() == NodeType::Image {
        return Ok(Transaction::default());
    }

    let old_children = el.children.clone();
    let mut lifted = lift_block(editor.doc(), &block_path).ok_or("Cannot lift the active block")?;
    let paragraph = retype_textblock(lifted.block_mut(), BlockKind::Paragraph, |_| {
        Marks::default()
    });
    let new_block_path = vec![lifted.top_index + lifted.block_index, 0];
    let selection_after = remap_into_block(
        editor,
        &block_path,
        &old_children,
        &new_block_path,
        element_children(&paragraph),
    );
    *lifted.block_mut() = Node::element(BlockKind::Blockquote, vec![paragraph]);

    Ok(Transaction::new(lifted.ops())
        .selection_after(selection_after)
        .source("command:blockquote.toggle"))
}

fn unwrap_blockquote(editor: &Editor, quote_path: Vec<usize>) -> Result<Transaction, String> {
    let (quote_ix, parent_path) = quote_path
        .split_last()
        .ok_or_else(|| "Invalid blockquote path".to_string())?;
    let quote_el = editor
        .doc()
        .element(&quote_path)
        .ok_or_else(|| "Blockquote node not found".to_string())?;

    let mut ops: Vec<Op> = vec![Op::RemoveNode {
        path: quote_path.clone(),
    }];
    for (i, node) in quote_el.children.iter().cloned().enumerate() {
        ops.push(Op::InsertNode {
            path: child_path(parent_path, quote_ix + i),
            node,
        });
    }

    let remap_point = |point: &Point| -> Point {
        if point.path.len() < quote_path.len() + 1 || !point.path.starts_with(&quote_path) {
            return point.clone();
        }
        let inner_ix = point.path[quote_path.len()];
        let mut new_path = child_path(parent_path, quote_ix + inner_ix);
        new_path.extend_from_slice(&point.path[quote_path.len() + 1..]);
        Point::new(new_path, point.offset)
    };
    let sel = editor.point_selection();
    let selection_after = PointRange {
        anchor: remap_point(&sel.anchor),
        focus: remap_point(&sel.focus),
    };

    Ok(Transaction::new(ops)
        .selection_after(selection_after)
        .source("command:blockquote.unwrap"))
}

/// Repairs blockquotes to hold exactly one paragraph.
///
/// Extra children move out after the quote, other textblocks become paragraphs and an
/// empty quote gets a fresh paragraph.
struct NormalizeBlockquoteChildren;

impl NormalizePass for NormalizeBlockquoteChildren {
    fn id(&self) -> &'static str {
        "blockquote.single_paragraph"
    }

    fn run(
        &self,
        doc: &Document,
        _selection: &PointRange,
        _registry: &PluginRegistry,
    ) -> Vec<Op> {
        for (ix, node) in doc.children.iter().enumerate() {
            let Node::Element(el) = node else {
                continue;
            };
            if el.node_type() != NodeType::Blockquote {
                continue;
            }

            match el.children.as_slice() {
                [] => {
                    return vec![Op::InsertNode {
                        path: vec![ix, 0],
                        node: Node::paragraph(""),
                    }];
                }
                [first, rest @ ..] => {
                    let first_type = first.node_type();
                    let lift_from = if first_type.is_textblock() || rest.is_empty() {
                        1
                    } else {
                        0
                    };
                    if lift_from < el.children.len() {
                        let mut ops = Vec::new();
                        for k in (lift_from..el.children.len()).rev() {
                            ops.push(Op::RemoveNode { path: vec![ix, k] });
                        }
                        for (offset, child) in el.children[lift_from..].iter().cloned().enumerate() {
                            ops.push(Op::InsertNode {
                                path: vec![ix + 1 + offset],
                                node: child,
                            });
                        }
                        return ops;
                    }
                    if first_type != NodeType::Paragraph {
                        if first_type.is_textblock() {
                            return vec![Op::SetBlock {
                                path: vec![ix, 0],
                                kind: BlockKind::Paragraph,
                            }];
                        }
                        return vec![
                            Op::RemoveNode { path: vec![ix, 0] },
                            Op::InsertNode {
                                path: vec![ix + 1],
                                node: first.clone(),
                            },
                        ];
                    }
                }
            }
        }
        Vec::new()
    }
}
