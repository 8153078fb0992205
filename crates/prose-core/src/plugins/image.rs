use serde_json::Value;

use crate::commands::{apply_tx, focus_in, insert_blocks_at_caret, str_arg};
use crate::core::{BlockKind, Editor, ImageAttrs, Node, Point, PointRange};
use crate::image;
use crate::ops::{Op, Transaction};
use crate::plugin::{CommandError, CommandSpec, EditorPlugin, QueryError, QuerySpec};
use crate::rewrite::{MarkStripRule, RewriteRule};
use crate::schema::{ContentModel, MarkSet, MarkType, NodeSpec, NodeType};

const CAPTION_MARKS: MarkSet = MarkSet::NONE.with(MarkType::Bold).with(MarkType::Link);

pub(crate) struct ImagePlugin;

impl EditorPlugin for ImagePlugin {
    fn id(&self) -> &'static str {
        "image"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![
            NodeSpec::new(NodeType::Image, ContentModel::Inline)
                .marks(CAPTION_MARKS)
                .draggable()
                .isolating(),
        ]
    }

    fn rewrite_rules(&self) -> Vec<Box<dyn RewriteRule>> {
        vec![Box::new(MarkStripRule::new(
            "image.strip_marks",
            NodeType::Image,
            CAPTION_MARKS,
        ))]
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("image.insert", "Insert image", |editor, args| {
                let src = str_arg(args.as_ref(), "src")
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .ok_or_else(|| CommandError::new("Missing args.src"))?;
                let attrs = ImageAttrs {
                    alt: str_arg(args.as_ref(), "alt").unwrap_or("").to_string(),
                    ..ImageAttrs::with_src(src)
                };
                let (ops, top) = insert_blocks_at_caret(editor, vec![Node::image(attrs, "")]);
                let tx = Transaction::new(ops)
                    .selection_after(PointRange::collapsed(Point::new(vec![top, 0], 0)))
                    .source("command:image.insert");
                apply_tx(editor, tx, "insert image")
            })
            .description("Insert an already stored image at the caret.")
            .keywords(["image", "picture", "photo"])
            .args_example(serde_json::json!({ "src": "photo.png", "alt": "" })),
            CommandSpec::new("image.set_alt", "Set image alt text", |editor, args| {
                let alt = str_arg(args.as_ref(), "alt").unwrap_or("").trim().to_string();
                if alt.is_empty() {
                    return Ok(());
                }
                let Some(tx) = set_alt(editor, alt) else {
                    return Ok(());
                };
                apply_tx(editor, tx, "set image alt text")
            })
            .keywords(["image", "alt", "description"])
            .args_example(serde_json::json!({ "alt": "A lighthouse at dusk" })),
            CommandSpec::new("image.delete", "Delete image", |editor, _args| {
                image::delete_image(editor)
                    .map(|_| ())
                    .map_err(|e| CommandError::new(format!("Failed to delete image: {e}")))
            })
            .description("Replace the active image with an empty paragraph.")
            .keywords(["image", "delete", "remove"]),
        ]
    }

    fn queries(&self) -> Vec<QuerySpec> {
        vec![
            QuerySpec::new("image.is_active", |editor, _args| {
                Ok(Value::Bool(focus_in(editor, NodeType::Image).is_some()))
            }),
            QuerySpec::new("image.attrs", |editor, _args| {
                let Some(attrs) = focus_in(editor, NodeType::Image)
                    .and_then(|path| editor.doc().element(&path))
                    .and_then(|el| el.kind.image_attrs())
                else {
                    return Ok(Value::Null);
                };
                serde_json::to_value(attrs)
                    .map_err(|err| QueryError::new(format!("Failed to encode image attrs: {err}")))
            }),
        ]
    }
}

fn set_alt(editor: &Editor, alt: String) -> Option<Transaction> {
    let path = focus_in(editor, NodeType::Image)?;
    let mut attrs = editor.doc().element(&path)?.kind.image_attrs()?.clone();
    attrs.alt = alt;
    Some(
        Transaction::new(vec![Op::SetBlock {
            path,
            kind: BlockKind::Image(attrs),
        }])
        .source("command:image.set_alt"),
    )
}
