use serde_json::Value;

use crate::commands::{
    active_marks, all_selected_text_nodes_have, apply_mark_range, apply_tx, child_path, focus_in,
    ordered_points, str_arg, toggle_mark_at_caret,
};
use crate::core::{Document, Editor, Marks, Node, Point, PointRange, clamp_to_char_boundary};
use crate::ops::{Op, Transaction};
use crate::plugin::{CommandError, CommandSpec, EditorPlugin, QueryError, QuerySpec};
use crate::schema::{MarkRule, MarkType, NodeType};

pub(crate) struct MarksPlugin;

impl EditorPlugin for MarksPlugin {
    fn id(&self) -> &'static str {
        "marks"
    }

    fn mark_rules(&self) -> Vec<MarkRule> {
        MarkType::ALL
            .into_iter()
            .map(|mark| MarkRule {
                mark,
                inclusive: matches!(mark, MarkType::Underline | MarkType::Code),
            })
            .collect()
    }

    fn commands(&self) -> Vec<CommandSpec> {
        vec![
            CommandSpec::new("marks.toggle", "Toggle mark", |editor, args| {
                let name = str_arg(args.as_ref(), "mark")
                    .ok_or_else(|| CommandError::new("Missing args.mark"))?;
                let mark = MarkType::from_name(name)
                    .ok_or_else(|| CommandError::new(format!("Unknown mark: {name}")))?;
                let Some(tx) = toggle_mark(editor, mark).map_err(CommandError::new)? else {
                    return Ok(());
                };
                apply_tx(editor, tx, "toggle mark")
            })
            .description("Toggle a formatting mark on the selection or caret. Ignored in headings.")
            .keywords(["bold", "italic", "underline", "strike", "code", "mark"])
            .args_example(serde_json::json!({ "mark": "bold" })),
            CommandSpec::new("link.set", "Set link", |editor, args| {
                let href = str_arg(args.as_ref(), "href").unwrap_or("").to_string();
                let Some(tx) = set_link(editor, href).map_err(CommandError::new)? else {
                    return Ok(());
                };
                apply_tx(editor, tx, "set link")
            })
            .description("Set the link over the extended link range. An empty href removes it.")
            .keywords(["link", "url", "hyperlink", "unlink"])
            .args_example(serde_json::json!({ "href": "https://example.com" })),
            CommandSpec::new("text.insert", "Insert text", |editor, args| {
                let text = str_arg(args.as_ref(), "text")
                    .ok_or_else(|| CommandError::new("Missing args.text"))?
                    .to_string();
                let tx = insert_text(editor, text).map_err(CommandError::new)?;
                apply_tx(editor, tx, "insert text")
            })
            .description("Insert text at the caret, replacing a selection inside one leaf.")
            .keywords(["type", "text", "insert"])
            .args_example(serde_json::json!({ "text": "hello" })),
        ]
    }

    fn queries(&self) -> Vec<QuerySpec> {
        vec![
            QuerySpec::new("marks.get_active", |editor, _args| {
                serde_json::to_value(active_marks(editor))
                    .map_err(|err| QueryError::new(format!("Failed to encode marks: {err}")))
            }),
            QuerySpec::new("marks.is_active", |editor, args| {
                let name = str_arg(args.as_ref(), "mark")
                    .ok_or_else(|| QueryError::new("Missing args.mark"))?;
                let mark = MarkType::from_name(name)
                    .ok_or_else(|| QueryError::new(format!("Unknown mark: {name}")))?;
                Ok(Value::Bool(active_marks(editor).has(mark)))
            }),
            QuerySpec::new("link.href", |editor, _args| {
                Ok(active_marks(editor).link.map_or(Value::Null, Value::String))
            }),
        ]
    }
}

fn toggle_mark(editor: &Editor, mark: MarkType) -> Result<Option<Transaction>, String> {
    if mark == MarkType::Link {
        return Err("Links are set with link.set".into());
    }
    if focus_in(editor, NodeType::Heading).is_some() {
        return Ok(None);
    }

    let source = format!("command:marks.toggle:{mark}");
    let sel = editor.point_selection().clone();
    if sel.is_collapsed() {
        let (ops, selection_after) = toggle_mark_at_caret(editor, |mut marks| {
            let target = !marks.has(mark);
            marks.set(mark, target);
            marks
        })?;
        return Ok(Some(
            Transaction::new(ops)
                .selection_after(selection_after)
                .source(source),
        ));
    }

    let all_set = all_selected_text_nodes_have(editor, &sel, &|m: &Marks| m.has(mark))?;
    let target = !all_set;
    let (ops, selection_after) = apply_mark_range(editor, &sel, &|mut marks: Marks| {
        marks.set(mark, target);
        marks
    })?;
    Ok(Some(
        Transaction::new(ops)
            .selection_after(selection_after)
            .source(source),
    ))
}

/// Leaves around `point` sharing one href, as start and end points.
///
/// A point at the end of a leaf looks at the leaf after it, like a caret would.
fn link_range_around(doc: &Document, point: &Point) -> Option<(Point, Point)> {
    let (leaf_ix, block_path) = point.path.split_last()?;
    let el = doc.element(block_path)?;
    let link_of = |ix: usize| match el.children.get(ix) {
        Some(Node::Text(t)) => t.marks.link.clone(),
        _ => None,
    };

    let mut ix = *leaf_ix;
    let mut href = link_of(ix);
    if href.is_none() {
        if let Some(Node::Text(t)) = el.children.get(ix) {
            if point.offset >= t.text.len() {
                ix += 1;
                href = link_of(ix);
            }
        }
    }
    let href = href?;
    let same_href = |ix: usize| link_of(ix).as_deref() == Some(href.as_str());

    let mut start = ix;
    while start > 0 && same_href(start - 1) {
        start -= 1;
    }
    let mut end = ix;
    while same_href(end + 1) {
        end += 1;
    }
    let end_len = match &el.children[end] {
        Node::Text(t) => t.text.len(),
        _ => 0,
    };
    Some((
        Point::new(child_path(block_path, start), 0),
        Point::new(child_path(block_path, end), end_len),
    ))
}

fn point_key(point: &Point) -> (&[usize], usize) {
    (point.path.as_slice(), point.offset)
}

/// The selection grown to cover the whole link under its start.
fn extended_link_range(editor: &Editor) -> PointRange {
    let sel = editor.point_selection();
    let (sel_start, sel_end) = ordered_points(sel);
    let Some((link_start, link_end)) = link_range_around(editor.doc(), &sel_start) else {
        return sel.clone();
    };
    let anchor = if point_key(&link_start) < point_key(&sel_start) {
        link_start
    } else {
        sel_start
    };
    let focus = if point_key(&link_end) > point_key(&sel_end) {
        link_end
    } else {
        sel_end
    };
    PointRange { anchor, focus }
}

fn set_link(editor: &Editor, href: String) -> Result<Option<Transaction>, String> {
    if focus_in(editor, NodeType::Heading).is_some() {
        return Ok(None);
    }

    let href = href.trim().to_string();
    let link = (!href.is_empty()).then_some(href);
    let sel = extended_link_range(editor);

    let (ops, selection_after) = if sel.is_collapsed() {
        if link.is_none() && active_marks(editor).link.is_none() {
            return Ok(None);
        }
        toggle_mark_at_caret(editor, |mut marks| {
            marks.link = link.clone();
            marks
        })?
    } else {
        apply_mark_range(editor, &sel, &|mut marks: Marks| {
            marks.link = link.clone();
            marks
        })?
    };

    Ok(Some(
        Transaction::new(ops)
            .selection_after(selection_after)
            .source("command:link.set"),
    ))
}

/// Marks typed text receives at `offset` of a leaf: non-inclusive marks end at the leaf edges.
fn marks_for_insert(editor: &Editor, marks: &Marks, text: &str, offset: usize) -> Marks {
    let at_edge = !text.is_empty() && (offset == 0 || offset == text.len());
    if !at_edge {
        return marks.clone();
    }
    let mut out = marks.clone();
    for mark in MarkType::ALL {
        if !editor.schema().is_inclusive(mark) {
            out.set(mark, false);
        }
    }
    out
}

fn insert_text(editor: &Editor, text: String) -> Result<Transaction, String> {
    let sel = editor.point_selection().clone();
    if sel.anchor.path != sel.focus.path {
        return Err("Selection spans several text leaves".into());
    }
    let path = sel.focus.path.clone();
    let Some(Node::Text(leaf)) = editor.doc().node(&path) else {
        return Err("Selection is not in a text node".into());
    };

    let start = clamp_to_char_boundary(&leaf.text, sel.anchor.offset.min(sel.focus.offset));
    let end = clamp_to_char_boundary(&leaf.text, sel.anchor.offset.max(sel.focus.offset));

    let mut ops = Vec::new();
    if start < end {
        ops.push(Op::RemoveText {
            path: path.clone(),
            range: start..end,
        });
    }
    let mut remaining = leaf.text.clone();
    remaining.replace_range(start..end, "");

    let marks = marks_for_insert(editor, &leaf.marks, &remaining, start);
    let (leaf_ix, block_path) = path
        .split_last()
        .ok_or_else(|| "Selection is not in a text node".to_string())?;

    let caret = if marks == leaf.marks {
        let caret = Point::new(path.clone(), start + text.len());
        ops.push(Op::InsertText {
            path,
            offset: start,
            text: text.clone(),
        });
        caret
    } else {
        let ix = if start == 0 { *leaf_ix } else { leaf_ix + 1 };
        let new_path = child_path(block_path, ix);
        let caret = Point::new(new_path.clone(), text.len());
        ops.push(Op::InsertNode {
            path: new_path,
            node: Node::marked_text(text, marks),
        });
        caret
    };

    Ok(Transaction::new(ops)
        .selection_after(PointRange::collapsed(caret))
        .source("command:text.insert"))
}
