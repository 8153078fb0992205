use crate::commands::{apply_tx, str_arg};
use crate::core::Node;
use crate::ops::{Op, Transaction};
use crate::plugin::{CommandSpec, EditorPlugin};
use crate::schema::{ContentModel, NodeSpec, NodeType};

pub(crate) struct YoutubePlugin;

impl EditorPlugin for YoutubePlugin {
    fn id(&self) -> &'static str {
        "youtube"
    }

    fn node_specs(&self) -> Vec<NodeSpec> {
        vec![NodeSpec::new(NodeType::Youtube, ContentModel::Leaf).atom()]
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("youtube.insert", "Embed YouTube video", |editor, args| {
                let Some(src) = str_arg(args.as_ref(), "src")
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                else {
                    return Ok(());
                };
                let top = editor
                    .point_selection()
                    .focus
                    .path
                    .first()
                    .map_or(editor.doc().children.len(), |ix| ix + 1);
                let tx = Transaction::new(vec![Op::InsertNode {
                    path: vec![top],
                    node: Node::youtube(src),
                }])
                .source("command:youtube.insert");
                apply_tx(editor, tx, "embed video")
            })
            .description("Embed a video after the active block. Blank sources are ignored.")
            .keywords(["youtube", "video", "embed"])
            .args_example(serde_json::json!({ "src": "https://www.youtube.com/watch?v=dQw4w9WgXcQ" })),
        ]
    }
}
