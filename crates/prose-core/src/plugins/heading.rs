use serde_json::Value;

use crate::commands::{
    apply_tx, element_children, focus_block, focus_in, lift_block, remap_into_block,
    retype_textblock,
};
use crate::core::{BlockKind, Document, Editor, Marks, Node, PointRange};
use crate::ops::{Op, Transaction};
use crate::plugin::{
    CommandError, CommandSpec, EditorPlugin, NormalizePass, PluginRegistry, QuerySpec,
};
use crate::rewrite::{MarkStripRule, RewriteRule};
use crate::schema::{ContentModel, MarkSet, MarkType, NodeSpec, NodeType};

pub(crate) struct HeadingPlugin {
    levels: Vec<u8>,
}

impl HeadingPlugin {
    pub(crate) fn new(levels: Vec<u8>) -> Self {
        Self { levels }
    }
}

impl EditorPlugin for HeadingPlugin {
    fn id(&self) -> &'static str {
        "heading"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![NodeSpec::new(NodeType::Heading, ContentModel::Inline).marks(MarkSet::NONE)]
    }

    fn rewrite_rules(&self) -> Vec<Box<dyn RewriteRule>> {
        vec![Box::new(MarkStripRule::new(
            "heading.strip_marks",
            NodeType::Heading,
            MarkSet::NONE,
        ))]
    }

    fn normalize_passes(&self) -> Vec<Box<dyn NormalizePass>> {
        vec![Box::new(NormalizeHeadingLevels {
            levels: self.levels.clone(),
        })]
    }

    fn commands(&self) -> Vec<CommandSpec> {
        let levels = self.levels.clone();
        vec![
            CommandSpec::new("heading.toggle", "Toggle heading", move |editor, args| {
                let level = args
                    .as_ref()
                    .and_then(|v| v.get("level"))
                    .and_then(Value::as_u64)
                    .ok_or_else(|| CommandError::new("Missing args.level"))?;
                let level = u8::try_from(level)
                    .ok()
                    .filter(|l| levels.contains(l))
                    .ok_or_else(|| CommandError::new(format!("Unsupported heading level: {level}")))?;
                let tx = toggle_heading(editor, level).map_err(CommandError::new)?;
                apply_tx(editor, tx, "toggle heading")
            })
            .description("Toggle a heading on the active block, clearing conflicting marks.")
            .keywords(["heading", "title", "h2", "h3"])
            .args_example(serde_json::json!({ "level": 2 })),
        ]
    }

    fn queries(&self) -> Vec<QuerySpec> {
        vec![QuerySpec::new("heading.level", |editor, _args| {
            Ok(active_heading_level(editor).map_or(Value::Null, Value::from))
        })]
    }
}

pub(crate) fn active_heading_level(editor: &Editor) -> Option<u8> {
    let path = focus_in(editor, NodeType::Heading)?;
    editor.doc().element(&path)?.kind.heading_level()
}

fn toggle_heading(editor: &Editor, level: u8) -> Result<Transaction, String> {
    let source = format!("command:heading.toggle:{level}");
    let (block_path, el) = focus_block(editor).ok_or("Selection is not in a text block")?;

    match el.kind {
        BlockKind::Heading { level: current } if current == level => {
            return Ok(Transaction::new(vec![Op::SetBlock {
                path: block_path,
                kind: BlockKind::Paragraph,
            }])
            .source(source));
        }
        BlockKind::Image(_) => return Ok(Transaction::default()),
        _ => {}
    }

    let old_children = el.children.clone();
    let mut lifted = lift_block(editor.doc(), &block_path).ok_or("Cannot lift the active block")?;
    let heading = retype_textblock(lifted.block_mut(), BlockKind::Heading { level }, |marks| {
        let mut marks: Marks = marks.clone();
        for mark in [MarkType::Bold, MarkType::Italic, MarkType::Strike] {
            marks.set(mark, false);
        }
        marks
    });
    *lifted.block_mut() = heading;

    let new_path = vec![lifted.top_index + lifted.block_index];
    let selection_after = remap_into_block(
        editor,
        &block_path,
        &old_children,
        &new_path,
        element_children(&lifted.nodes[lifted.block_index]),
    );

    Ok(Transaction::new(lifted.ops())
        .selection_after(selection_after)
        .source(source))
}

/// Moves heading levels outside the configured set to the closest allowed level.
struct NormalizeHeadingLevels {
    levels: Vec<u8>,
}

impl NormalizeHeadingLevels {
    fn closest(&self, level: u8) -> u8 {
        self.levels
            .iter()
            .copied()
            .min_by_key(|allowed| (allowed.abs_diff(level), *allowed))
            .unwrap_or(level)
    }
}

impl NormalizePass for NormalizeHeadingLevels {
    fn id(&self) -> &'static str {
        "heading.normalize_levels"
    }

    fn run(
        &self,
        doc: &Document,
        _selection: &PointRange,
        _registry: &PluginRegistry,
    ) -> Vec<Op> {
        doc.children
            .iter()
            .enumerate()
            .filter_map(|(ix, node)| {
                let Node::Element(el) = node else {
                    return None;
                };
                let level = el.kind.heading_level()?;
                let closest = self.closest(level);
                (closest != level).then(|| Op::SetBlock {
                    path: vec![ix],
                    kind: BlockKind::Heading { level: closest },
                })
            })
            .collect()
    }
}
