use serde_json::Value;

use crate::commands::{
    active_list, apply_tx, element_children, focus_block, lift_block, remap_into_block,
    retype_textblock,
};
use crate::core::{BlockKind, Document, Editor, Marks, Node, PointRange};
use crate::ops::{Op, Transaction};
use crate::plugin::{CommandError, CommandSpec, EditorPlugin, NormalizePass, PluginRegistry, QuerySpec};
use crate::schema::{ContentModel, ListKind, NodeSpec, NodeType};

pub(crate) struct ListPlugin;

impl EditorPlugin for ListPlugin {
    fn id(&self) -> &'static str {
        "list"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![
            NodeSpec::new(
                NodeType::BulletList,
                ContentModel::OneOrMore(NodeType::ListItem),
            ),
            NodeSpec::new(
                NodeType::OrderedList,
                ContentModel::OneOrMore(NodeType::ListItem),
            ),
            NodeSpec::new(
                NodeType::ListItem,
                ContentModel::OneOrMore(NodeType::Paragraph),
            ),
        ]
    }

    fn normalize_passes(&self) -> Vec<Box<dyn NormalizePass>> {
        vec![Box::new(NormalizeListStructure)]
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("list.toggle_bullet", "Toggle bulleted list", |editor, _args| {
                let tx = toggle_list(editor, ListKind::Bullet).map_err(CommandError::new)?;
                apply_tx(editor, tx, "toggle bulleted list")
            })
            .keywords(["list", "bullet", "ul"]),
            CommandSpec::new("list.toggle_ordered", "Toggle numbered list", |editor, _args| {
                let tx = toggle_list(editor, ListKind::Ordered).map_err(CommandError::new)?;
                apply_tx(editor, tx, "toggle numbered list")
            })
            .keywords(["list", "numbered", "ordered", "ol"]),
        ]
    }

    fn queries(&self) -> Vec<QuerySpec> {
        vec![QuerySpec::new("list.active_type", |editor, _args| {
            Ok(match active_list(editor) {
                Some((_, ListKind::Bullet)) => Value::String("bullet".into()),
                Some((_, ListKind::Ordered)) => Value::String("ordered".into()),
                None => Value::Null,
            })
        })]
    }
}

fn same_list(node: Option<&Node>, kind: ListKind) -> Option<&[Node]> {
    match node {
        Some(Node::Element(el)) if el.node_type() == kind.node_type() => Some(&el.children),
        _ => None,
    }
}

fn toggle_list(editor: &Editor, kind: ListKind) -> Result<Transaction, String> {
    let source = format!("command:list.toggle:{}", kind.node_type());
    let (block_path, el) = focus_block(editor).ok_or("Selection is not in a text block")?;
    if el.node_type() == NodeType::Image {
        return Ok(Transaction::default());
    }
    let old_children = el.children.clone();

    if let Some((list_path, current)) = active_list(editor) {
        if current != kind {
            return Ok(Transaction::new(vec![Op::SetBlock {
                path: list_path,
                kind: BlockKind::list(kind),
            }])
            .source(source));
        }

        let lifted = lift_block(editor.doc(), &block_path).ok_or("Cannot lift the active block")?;
        let new_block_path = vec![lifted.top_index + lifted.block_index];
        let selection_after = remap_into_block(
            editor,
            &block_path,
            &old_children,
            &new_block_path,
            element_children(&lifted.nodes[lifted.block_index]),
        );
        return Ok(Transaction::new(lifted.ops())
            .selection_after(selection_after)
            .source(source));
    }

    let mut lifted = lift_block(editor.doc(), &block_path).ok_or("Cannot lift the active block")?;
    let paragraph = retype_textblock(lifted.block_mut(), BlockKind::Paragraph, Marks::clone);
    let mut items = vec![Node::element(BlockKind::ListItem, vec![paragraph])];
    let mut item_ix = 0;

    // Join same-kind lists directly above and below the new item.
    let doc = editor.doc();
    let mut remove_from = lifted.top_index;
    let mut remove_to = lifted.top_index;
    if lifted.block_index == 0 && lifted.top_index > 0 {
        if let Some(prev) = same_list(doc.children.get(lifted.top_index - 1), kind) {
            item_ix = prev.len();
            items.splice(0..0, prev.iter().cloned());
            remove_from -= 1;
        }
    }
    if lifted.block_index + 1 == lifted.nodes.len() {
        if let Some(next) = same_list(doc.children.get(lifted.top_index + 1), kind) {
            items.extend(next.iter().cloned());
            remove_to += 1;
        }
    }

    let new_block_path = vec![remove_from + lifted.block_index, item_ix, 0];
    let new_children: &[Node] = match items.get(item_ix) {
        Some(Node::Element(item)) => item.children.first().map(element_children).unwrap_or(&[]),
        _ => &[],
    };
    let selection_after = remap_into_block(
        editor,
        &block_path,
        &old_children,
        &new_block_path,
        new_children,
    );
    *lifted.block_mut() = Node::element(BlockKind::list(kind), items);

    let mut ops: Vec<Op> = (remove_from..=remove_to)
        .rev()
        .map(|ix| Op::RemoveNode { path: vec![ix] })
        .collect();
    ops.extend(
        lifted
            .nodes
            .into_iter()
            .enumerate()
            .map(|(k, node)| Op::InsertNode {
                path: vec![remove_from + k],
                node,
            }),
    );

    Ok(Transaction::new(ops)
        .selection_after(selection_after)
        .source(source))
}

/// Keeps lists made of list items holding paragraphs.
///
/// Empty lists are dropped, stray list items are unwrapped at the top level and
/// other textblocks are retyped or wrapped so every list item holds paragraphs.
struct NormalizeListStructure;

impl NormalizePass for NormalizeListStructure {
    fn id(&self) -> &'static str {
        "list.normalize_structure"
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
            match el.node_type() {
                NodeType::ListItem => {
                    let mut ops = vec![Op::RemoveNode { path: vec![ix] }];
                    ops.extend(el.children.iter().cloned().enumerate().map(|(k, child)| {
                        Op::InsertNode {
                            path: vec![ix + k],
                            node: child,
                        }
                    }));
                    return ops;
                }
                NodeType::BulletList | NodeType::OrderedList => {
                    if el.children.is_empty() {
                        return vec![Op::RemoveNode { path: vec![ix] }];
                    }
                    if let Some(ops) = repair_list(ix, &el.children) {
                        return ops;
                    }
                }
                _ => {}
            }
        }
        Vec::new()
    }
}

fn repair_list(list_ix: usize, items: &[Node]) -> Option<Vec<Op>> {
    for (item_ix, item) in items.iter().enumerate() {
        let path = vec![list_ix, item_ix];
        let Node::Element(item_el) = item else {
            return Some(vec![Op::RemoveNode { path }]);
        };

        if item_el.node_type() != NodeType::ListItem {
            if !item_el.node_type().is_textblock() {
                return Some(vec![Op::RemoveNode { path }]);
            }
            let paragraph = retype_textblock(item, BlockKind::Paragraph, Marks::clone);
            return Some(vec![
                Op::RemoveNode { path: path.clone() },
                Op::InsertNode {
                    path,
                    node: Node::element(BlockKind::ListItem, vec![paragraph]),
                },
            ]);
        }

        if item_el.children.is_empty() {
            return Some(vec![Op::InsertNode {
                path: vec![list_ix, item_ix, 0],
                node: Node::paragraph(""),
            }]);
        }

        for (child_ix, child) in item_el.children.iter().enumerate() {
            let child_path = vec![list_ix, item_ix, child_ix];
            match child.node_type() {
                NodeType::Paragraph => {}
                t if t.is_textblock() => {
                    return Some(vec![Op::SetBlock {
                        path: child_path,
                        kind: BlockKind::Paragraph,
                    }]);
                }
                _ => return Some(vec![Op::RemoveNode { path: child_path }]),
            }
        }
    }
    None
}
