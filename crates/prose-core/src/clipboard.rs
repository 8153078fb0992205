//! Paste and drop: HTML slices and image files.

use tracing::debug;

use crate::commands::{
    focus_block_offset, insert_blocks_at_caret, ordered_points, point_for_global_offset,
    point_global_offset, replace_children_ops, split_children_at,
};
use crate::config::PasteProfile;
use crate::core::{ApplyError, BlockKind, Editor, Marks, Node, PointRange, Selection};
use crate::image::{ImageError, ImageFile, UploadTicket, insert_image_file};
use crate::ops::{Op, Transaction};
use crate::positions;
use crate::rewrite::coerce_pasted_headings;
use crate::schema::ListKind;

enum Token<'a> {
    Open { name: String, attrs: &'a str },
    Close { name: String },
    Text(&'a str),
}

fn tokenize(html: &str) -> Vec<Token<'_>> {
    let mut out = Vec::new();
    let mut rest = html;
    while !rest.is_empty() {
        let Some(lt) = rest.find('<') else {
            out.push(Token::Text(rest));
            break;
        };
        if lt > 0 {
            out.push(Token::Text(&rest[..lt]));
        }
        rest = &rest[lt..];

        if let Some(comment) = rest.strip_prefix("<!--") {
            rest = comment.find("-->").map_or("", |end| &comment[end + 3..]);
            continue;
        }
        let Some(gt) = rest.find('>') else {
            out.push(Token::Text(rest));
            break;
        };
        let inner = rest[1..gt].trim();
        rest = &rest[gt + 1..];

        if inner.starts_with('!') || inner.starts_with('?') {
            continue;
        }
        let (closing, inner) = match inner.strip_prefix('/') {
            Some(inner) => (true, inner.trim_start()),
            None => (false, inner.trim_end_matches('/')),
        };
        let name_end = inner
            .find(|c: char| !c.is_ascii_alphanumeric())
            .unwrap_or(inner.len());
        let name = inner[..name_end].to_ascii_lowercase();
        if name.is_empty() {
            continue;
        }
        out.push(if closing {
            Token::Close { name }
        } else {
            Token::Open {
                name,
                attrs: &inner[name_end..],
            }
        });
    }
    out
}

fn attr_value(attrs: &str, key: &str) -> Option<String> {
    let lower = attrs.to_ascii_lowercase();
    let mut from = 0;
    while let Some(found) = lower[from..].find(key) {
        let start = from + found;
        from = start + key.len();
        let boundary = start == 0 || lower.as_bytes()[start - 1].is_ascii_whitespace();
        let after = lower[from..].trim_start();
        if !boundary || !after.starts_with('=') {
            continue;
        }
        let value = attrs[attrs.len() - after.len() + 1..].trim_start();
        let raw = match value.chars().next() {
            Some(q @ ('"' | '\'')) => value[1..].split(q).next().unwrap_or(""),
            _ => value.split_whitespace().next().unwrap_or(""),
        };
        return Some(html_escape::decode_html_entities(raw).into_owned());
    }
    None
}

struct ListFrame {
    kind: ListKind,
    items: Vec<Node>,
    item: Option<Vec<Node>>,
}

#[derive(Default)]
struct SliceBuilder {
    out: Vec<Node>,
    quote: Option<Vec<Node>>,
    lists: Vec<ListFrame>,
    current: Option<(BlockKind, Vec<Node>)>,
    bold: usize,
    italic: usize,
    underline: usize,
    strike: usize,
    code: usize,
    links: Vec<String>,
    skip: usize,
}

impl SliceBuilder {
    fn marks(&self) -> Marks {
        Marks {
            bold: self.bold > 0,
            italic: self.italic > 0,
            underline: self.underline > 0,
            strike: self.strike > 0,
            code: self.code > 0,
            link: self.links.last().cloned(),
        }
    }

    fn push_block(&mut self, node: Node) {
        if let Some(frame) = self.lists.last_mut() {
            frame.item.get_or_insert_with(Vec::new).push(node);
        } else if let Some(quote) = &mut self.quote {
            quote.push(node);
        } else {
            self.out.push(node);
        }
    }

    fn flush(&mut self) {
        if let Some((kind, children)) = self.current.take() {
            self.push_block(Node::element(kind, children));
        }
    }

    fn start(&mut self, kind: BlockKind) {
        self.flush();
        self.current = Some((kind, Vec::new()));
    }

    fn text(&mut self, raw: &str) {
        if self.skip > 0 {
            return;
        }
        let in_text = self
            .current
            .as_ref()
            .is_some_and(|(_, children)| !children.is_empty());

        // Whitespace runs collapse to one space; none at the start of a block.
        let mut text = String::new();
        let mut space = false;
        for c in html_escape::decode_html_entities(raw).chars() {
            if c.is_whitespace() {
                space = true;
                continue;
            }
            if space && (in_text || !text.is_empty()) {
                text.push(' ');
            }
            space = false;
            text.push(c);
        }
        if space && (in_text || !text.is_empty()) {
            text.push(' ');
        }
        if text.is_empty() {
            return;
        }

        let marks = self.marks();
        let (_, children) = self
            .current
            .get_or_insert_with(|| (BlockKind::Paragraph, Vec::new()));
        children.push(Node::marked_text(text, marks));
    }

    fn close_item(&mut self) {
        self.flush();
        if let Some(frame) = self.lists.last_mut() {
            if let Some(mut paragraphs) = frame.item.take() {
                if paragraphs.is_empty() {
                    paragraphs.push(Node::paragraph(""));
                }
                frame.items.push(Node::element(BlockKind::ListItem, paragraphs));
            }
        }
    }

    fn close_list(&mut self) {
        self.close_item();
        let Some(frame) = self.lists.pop() else {
            return;
        };
        // Nested lists are flattened into their parent.
        if let Some(parent) = self.lists.last_mut() {
            if let Some(paragraphs) = parent.item.take() {
                if !paragraphs.is_empty() {
                    parent.items.push(Node::element(BlockKind::ListItem, paragraphs));
                }
            }
            parent.items.extend(frame.items);
            return;
        }
        if !frame.items.is_empty() {
            self.push_block(Node::element(BlockKind::list(frame.kind), frame.items));
        }
    }

    fn close_quote(&mut self) {
        self.flush();
        if let Some(children) = self.quote.take() {
            if !children.is_empty() {
                self.push_block(Node::element(BlockKind::Blockquote, children));
            }
        }
    }

    fn open(&mut self, name: &str, attrs: &str) {
        match name {
            "p" | "div" => self.start(BlockKind::Paragraph),
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                let level = name[1..].parse().unwrap_or(1);
                self.start(BlockKind::Heading { level });
            }
            "br" => self.flush(),
            "blockquote" => {
                self.flush();
                self.close_quote();
                self.quote = Some(Vec::new());
            }
            "ul" | "ol" => {
                self.flush();
                let kind = if name == "ul" {
                    ListKind::Bullet
                } else {
                    ListKind::Ordered
                };
                self.lists.push(ListFrame {
                    kind,
                    items: Vec::new(),
                    item: None,
                });
            }
            "li" => {
                self.close_item();
                if let Some(frame) = self.lists.last_mut() {
                    frame.item = Some(Vec::new());
                }
            }
            "b" | "strong" => self.bold += 1,
            "i" | "em" => self.italic += 1,
            "u" => self.underline += 1,
            "s" | "strike" | "del" => self.strike += 1,
            "code" => self.code += 1,
            "a" => self
                .links
                .push(attr_value(attrs, "href").unwrap_or_default()),
            "script" | "style" | "head" | "title" => self.skip += 1,
            _ => {}
        }
    }

    fn close(&mut self, name: &str) {
        match name {
            "p" | "div" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => self.flush(),
            "blockquote" => self.close_quote(),
            "ul" | "ol" => self.close_list(),
            "li" => self.close_item(),
            "b" | "strong" => self.bold = self.bold.saturating_sub(1),
            "i" | "em" => self.italic = self.italic.saturating_sub(1),
            "u" => self.underline = self.underline.saturating_sub(1),
            "s" | "strike" | "del" => self.strike = self.strike.saturating_sub(1),
            "code" => self.code = self.code.saturating_sub(1),
            "a" => {
                self.links.pop();
            }
            "script" | "style" | "head" | "title" => self.skip = self.skip.saturating_sub(1),
            _ => {}
        }
    }

    fn finish(mut self) -> Vec<Node> {
        while !self.lists.is_empty() {
            self.close_list();
        }
        self.close_quote();
        self.flush();
        self.out
    }
}

/// Parses clipboard HTML into top-level blocks.
///
/// Links with an empty `href` carry no link mark. With [`PasteProfile::Quill`] heading
/// levels are coerced the way the legacy editor pasted them.
pub fn slice_from_html(html: &str, profile: PasteProfile) -> Vec<Node> {
    let mut builder = SliceBuilder::default();
    for token in tokenize(html) {
        match token {
            Token::Open { name, attrs } => builder.open(&name, attrs),
            Token::Close { name } => builder.close(&name),
            Token::Text(text) => builder.text(text),
        }
    }
    let nodes = strip_empty_links(builder.finish());
    match profile {
        PasteProfile::Quill => coerce_pasted_headings(nodes),
        PasteProfile::Schema => nodes,
    }
}

fn strip_empty_links(nodes: Vec<Node>) -> Vec<Node> {
    nodes
        .into_iter()
        .map(|node| match node {
            Node::Text(mut t) => {
                if t.marks.link.as_deref().is_some_and(str::is_empty) {
                    t.marks.link = None;
                }
                Node::Text(t)
            }
            Node::Element(mut el) => {
                el.children = strip_empty_links(el.children);
                Node::Element(el)
            }
            other => other,
        })
        .collect()
}

/// Removes a selection that stays inside one textblock. Wider selections collapse to
/// their start instead.
fn delete_selection(editor: &mut Editor) -> Result<(), ApplyError> {
    let sel = editor.point_selection().clone();
    if sel.is_collapsed() {
        return Ok(());
    }
    let (start, end) = ordered_points(&sel);
    let (Some((start_ix, start_block)), Some((end_ix, end_block))) =
        (start.path.split_last(), end.path.split_last())
    else {
        return Ok(());
    };
    if start_block != end_block {
        editor.set_point_selection(PointRange::collapsed(start));
        return Ok(());
    }
    let Some(el) = editor.doc().element(start_block) else {
        return Ok(());
    };

    let from = point_global_offset(&el.children, *start_ix, start.offset);
    let to = point_global_offset(&el.children, *end_ix, end.offset);
    let (left, rest) = split_children_at(&el.children, from);
    let (_, right) = split_children_at(&rest, to.saturating_sub(from));
    let mut children = left;
    children.extend(right);

    let caret = point_for_global_offset(start_block, &children, from);
    let tx = Transaction::new(replace_children_ops(start_block, el.children.len(), &children))
        .selection_after(PointRange::collapsed(caret))
        .source("paste.replace_selection");
    editor.apply(tx)
}

/// Inserts a parsed slice at the caret, replacing a selection inside one textblock.
///
/// A single paragraph is pasted inline into the active textblock; anything else lands
/// as top-level blocks.
pub fn paste_slice(editor: &mut Editor, nodes: Vec<Node>) -> Result<(), ApplyError> {
    if nodes.is_empty() {
        return Ok(());
    }
    delete_selection(editor)?;

    if let [Node::Element(el)] = nodes.as_slice() {
        if el.kind == BlockKind::Paragraph {
            if let Some((block_path, offset)) = focus_block_offset(editor) {
                return paste_inline(editor, block_path, offset, el.children.clone());
            }
        }
    }

    let count = nodes.len();
    let (ops, top) = insert_blocks_at_caret(editor, nodes);
    editor.apply(Transaction::new(ops).source("paste.blocks"))?;

    let last = top + count - 1;
    if let Some(block) = positions::textblocks(editor.doc())
        .into_iter()
        .rfind(|b| b.path.first() == Some(&last))
    {
        editor.set_selection(Selection::collapsed(block.end));
    }
    debug!(blocks = count, at = top, "pasted blocks");
    Ok(())
}

fn paste_inline(
    editor: &mut Editor,
    block_path: Vec<usize>,
    offset: usize,
    inline: Vec<Node>,
) -> Result<(), ApplyError> {
    let Some(el) = editor.doc().element(&block_path) else {
        return Ok(());
    };
    let pasted_len: usize = inline
        .iter()
        .map(|n| match n {
            Node::Text(t) => t.text.len(),
            _ => 0,
        })
        .sum();
    let (mut children, right) = split_children_at(&el.children, offset);
    children.extend(inline);
    children.extend(right);

    let caret = point_for_global_offset(&block_path, &children, offset + pasted_len);
    let ops: Vec<Op> = replace_children_ops(&block_path, el.children.len(), &children);
    debug!(path = ?block_path, bytes = pasted_len, "pasted inline text");
    editor.apply(
        Transaction::new(ops)
            .selection_after(PointRange::collapsed(caret))
            .source("paste.inline"),
    )
}

pub fn paste_html(editor: &mut Editor, html: &str) -> Result<(), ApplyError> {
    let nodes = slice_from_html(html, editor.config().paste_profile);
    paste_slice(editor, nodes)
}

/// Inserts every image among `files` at the caret, replacing the selection first.
/// Other files are skipped.
pub fn paste_files(editor: &mut Editor, files: Vec<ImageFile>) -> Result<Vec<UploadTicket>, ImageError> {
    delete_selection(editor)?;
    let mut tickets = Vec::new();
    for file in files {
        if !file.is_image() {
            debug!(name = %file.name, mime = %file.mime(), "skipping non-image file");
            continue;
        }
        tickets.push(insert_image_file(editor, file)?);
    }
    Ok(tickets)
}

/// Inserts every image among `files` at the drop position.
pub fn drop_files(
    editor: &mut Editor,
    pos: usize,
    files: Vec<ImageFile>,
) -> Result<Vec<UploadTicket>, ImageError> {
    editor.set_selection(Selection::collapsed(pos));
    paste_files(editor, files)
}
