use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, trace};

use crate::config::EditorConfig;
use crate::image::{UploadId, UploadStatus};
use crate::ops::{Op, Path, Transaction};
use crate::plugin::{CommandError, PluginRegistry, QueryError, TransactionPreview};
use crate::positions;
use crate::schema::{ListKind, MarkSet, MarkType, NodeType, Schema, SchemaError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Document {
    #[serde(default)]
    pub children: Vec<Node>,
}

impl Document {
    pub fn new(children: Vec<Node>) -> Self {
        Self { children }
    }

    pub fn node(&self, path: &[usize]) -> Option<&Node> {
        let (first, rest) = path.split_first()?;
        let mut node = self.children.get(*first)?;
        for &ix in rest {
            node = match node {
                Node::Element(el) => el.children.get(ix)?,
                Node::Void(_) | Node::Text(_) => return None,
            };
        }
        Some(node)
    }

    pub fn element(&self, path: &[usize]) -> Option<&ElementNode> {
        match self.node(path)? {
            Node::Element(el) => Some(el),
            _ => None,
        }
    }

    /// Type of the node holding the children at `parent_path`.
    pub fn parent_type(&self, parent_path: &[usize]) -> Option<NodeType> {
        if parent_path.is_empty() {
            return Some(NodeType::Doc);
        }
        self.node(parent_path).map(Node::node_type)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum Node {
    Element(ElementNode),
    Text(TextNode),
    Void(VoidNode),
}

impl Node {
    pub fn text(text: impl Into<String>) -> Self {
        Node::Text(TextNode {
            text: text.into(),
            marks: Marks::default(),
        })
    }

    pub fn marked_text(text: impl Into<String>, marks: Marks) -> Self {
        Node::Text(TextNode {
            text: text.into(),
            marks,
        })
    }

    pub fn element(kind: BlockKind, children: Vec<Node>) -> Self {
        Node::Element(ElementNode { kind, children })
    }

    pub fn paragraph(text: impl Into<String>) -> Self {
        Node::element(BlockKind::Paragraph, vec![Node::text(text)])
    }

    pub fn heading(level: u8, text: impl Into<String>) -> Self {
        Node::element(BlockKind::Heading { level }, vec![Node::text(text)])
    }

    pub fn blockquote(text: impl Into<String>) -> Self {
        Node::element(BlockKind::Blockquote, vec![Node::paragraph(text)])
    }

    pub fn image(attrs: ImageAttrs, caption: impl Into<String>) -> Self {
        Node::element(BlockKind::Image(attrs), vec![Node::text(caption)])
    }

    pub fn list<I, S>(kind: ListKind, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let items = items
            .into_iter()
            .map(|text| Node::element(BlockKind::ListItem, vec![Node::paragraph(text)]))
            .collect();
        Node::element(BlockKind::list(kind), items)
    }

    pub fn youtube(src: impl Into<String>) -> Self {
        Node::Void(VoidNode {
            kind: VoidKind::Youtube { src: src.into() },
        })
    }

    pub fn node_type(&self) -> NodeType {
        match self {
            Node::Element(el) => el.kind.node_type(),
            Node::Text(_) => NodeType::Text,
            Node::Void(v) => v.kind.node_type(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementNode {
    pub kind: BlockKind,
    #[serde(default)]
    pub children: Vec<Node>,
}

impl ElementNode {
    pub fn node_type(&self) -> NodeType {
        self.kind.node_type()
    }

    /// Concatenated text of the direct text leaves.
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|n| match n {
                Node::Text(t) => Some(t.text.as_str()),
                _ => None,
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BlockKind {
    Paragraph,
    Heading { level: u8 },
    BulletList,
    OrderedList,
    ListItem,
    Blockquote,
    Image(ImageAttrs),
}

impl BlockKind {
    pub fn node_type(&self) -> NodeType {
        match self {
            BlockKind::Paragraph => NodeType::Paragraph,
            BlockKind::Heading { .. } => NodeType::Heading,
            BlockKind::BulletList => NodeType::BulletList,
            BlockKind::OrderedList => NodeType::OrderedList,
            BlockKind::ListItem => NodeType::ListItem,
            BlockKind::Blockquote => NodeType::Blockquote,
            BlockKind::Image(_) => NodeType::Image,
        }
    }

    pub fn list(kind: ListKind) -> Self {
        match kind {
            ListKind::Bullet => BlockKind::BulletList,
            ListKind::Ordered => BlockKind::OrderedList,
        }
    }

    pub fn heading_level(&self) -> Option<u8> {
        match self {
            BlockKind::Heading { level } => Some(*level),
            _ => None,
        }
    }

    pub fn image_attrs(&self) -> Option<&ImageAttrs> {
        match self {
            BlockKind::Image(attrs) => Some(attrs),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ImageAttrs {
    #[serde(default)]
    pub src: String,
    #[serde(default)]
    pub alt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default)]
    pub is_new: bool,
    /// Tags the node while its upload is in flight. Never persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload: Option<UploadId>,
}

impl ImageAttrs {
    pub fn with_src(src: impl Into<String>) -> Self {
        Self {
            src: src.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoidNode {
    pub kind: VoidKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VoidKind {
    Youtube { src: String },
}

impl VoidKind {
    pub fn node_type(&self) -> NodeType {
        match self {
            VoidKind::Youtube { .. } => NodeType::Youtube,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextNode {
    pub text: String,
    #[serde(default)]
    pub marks: Marks,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Marks {
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub underline: bool,
    #[serde(default)]
    pub strike: bool,
    #[serde(default)]
    pub code: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

impl Marks {
    pub fn has(&self, mark: MarkType) -> bool {
        match mark {
            MarkType::Bold => self.bold,
            MarkType::Italic => self.italic,
            MarkType::Underline => self.underline,
            MarkType::Strike => self.strike,
            MarkType::Code => self.code,
            MarkType::Link => self.link.is_some(),
        }
    }

    /// Sets a flag mark. Turning `Link` on requires an href, see [`Marks::link`].
    pub fn set(&mut self, mark: MarkType, on: bool) {
        match mark {
            MarkType::Bold => self.bold = on,
            MarkType::Italic => self.italic = on,
            MarkType::Underline => self.underline = on,
            MarkType::Strike => self.strike = on,
            MarkType::Code => self.code = on,
            MarkType::Link => {
                if !on {
                    self.link = None;
                }
            }
        }
    }

    pub fn types(&self) -> MarkSet {
        MarkType::ALL
            .into_iter()
            .filter(|m| self.has(*m))
            .fold(MarkSet::NONE, MarkSet::with)
    }

    pub fn is_empty(&self) -> bool {
        self.types().is_empty()
    }

    /// Drops every mark not contained in `keep`.
    pub fn retain(&self, keep: MarkSet) -> Marks {
        let mut out = self.clone();
        for mark in MarkType::ALL {
            if !keep.contains(mark) {
                out.set(mark, false);
            }
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    #[serde(default)]
    pub path: Path,
    /// Byte offset into the text leaf at `path`.
    pub offset: usize,
}

impl Point {
    pub fn new(path: Path, offset: usize) -> Self {
        Self { path, offset }
    }
}

/// Path-addressed selection used while ops are applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointRange {
    pub anchor: Point,
    pub focus: Point,
}

impl PointRange {
    pub fn collapsed(point: Point) -> Self {
        Self {
            anchor: point.clone(),
            focus: point,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.focus
    }
}

/// Flat character offsets into the document, `anchor == head` for a caret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub anchor: usize,
    pub head: usize,
}

impl Selection {
    pub fn new(anchor: usize, head: usize) -> Self {
        Self { anchor, head }
    }

    pub fn collapsed(pos: usize) -> Self {
        Self {
            anchor: pos,
            head: pos,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.head
    }

    pub fn from(&self) -> usize {
        self.anchor.min(self.head)
    }

    pub fn to(&self) -> usize {
        self.anchor.max(self.head)
    }
}

pub struct Editor {
    doc: Document,
    selection: PointRange,
    registry: PluginRegistry,
    config: EditorConfig,
    revision: u64,
    pub(crate) uploads: HashMap<UploadId, UploadStatus>,
    pub(crate) next_upload: u64,
}

impl Editor {
    pub fn new(doc: Document, selection: Selection, registry: PluginRegistry) -> Self {
        Self::with_config(doc, selection, registry, EditorConfig::default())
    }

    pub fn with_config(
        doc: Document,
        selection: Selection,
        registry: PluginRegistry,
        config: EditorConfig,
    ) -> Self {
        let config = config.with_defaults();
        let mut editor = Self {
            doc,
            selection: PointRange::collapsed(Point::new(vec![0, 0], 0)),
            registry,
            config,
            revision: 0,
            uploads: HashMap::new(),
            next_upload: 1,
        };
        editor.normalize_in_place();
        editor.set_selection(selection);
        editor
    }

    pub fn with_richtext_plugins() -> Self {
        Self::from_config(Document::default(), EditorConfig::default())
    }

    /// Builds the full plugin set for `config` around `doc`, caret at the first text position.
    pub fn from_config(doc: Document, config: EditorConfig) -> Self {
        let config = config.with_defaults();
        let registry = PluginRegistry::richtext(&config);
        Self::with_config(doc, Selection::collapsed(0), registry, config)
    }

    pub fn doc(&self) -> &Document {
        &self.doc
    }

    pub fn selection(&self) -> Selection {
        let anchor = positions::pos_at_point(&self.doc, &self.selection.anchor).unwrap_or(0);
        let head = positions::pos_at_point(&self.doc, &self.selection.focus).unwrap_or(anchor);
        Selection { anchor, head }
    }

    pub fn point_selection(&self) -> &PointRange {
        &self.selection
    }

    pub fn set_selection(&mut self, selection: Selection) {
        let anchor = positions::nearest_text_point(&self.doc, selection.anchor);
        let focus = positions::nearest_text_point(&self.doc, selection.head);
        if let (Some(anchor), Some(focus)) = (anchor, focus) {
            self.selection = PointRange { anchor, focus };
        }
        self.normalize_selection_in_place();
    }

    pub fn set_point_selection(&mut self, selection: PointRange) {
        self.selection = selection;
        self.normalize_selection_in_place();
    }

    /// Moves the caret to `pos`, snapping to the nearest editable text position.
    pub fn focus(&mut self, pos: usize) {
        self.set_selection(Selection::collapsed(pos));
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn schema(&self) -> &Schema {
        self.registry.schema()
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn is_editable(&self) -> bool {
        self.config.editable
    }

    /// Bumped whenever a transaction changes the document.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Node types enclosing the caret, outermost first.
    pub fn active_types(&self) -> Vec<NodeType> {
        positions::resolve(&self.doc, self.selection().head)
            .into_iter()
            .map(|a| a.node_type)
            .collect()
    }

    pub fn is_active(&self, node_type: NodeType) -> bool {
        self.active_types().contains(&node_type)
    }

    pub fn apply(&mut self, tx: Transaction) -> Result<(), ApplyError> {
        if !self.config.editable {
            return Err(ApplyError::ReadOnly);
        }
        let preview = self.preview_transaction(&tx)?;
        let changed = preview.doc != self.doc;
        self.doc = preview.doc;
        self.selection = preview.selection;
        if changed {
            self.revision += 1;
        }
        trace!(
            source = tx.meta.source.as_deref().unwrap_or("unknown"),
            ops = tx.ops.len(),
            corrected = preview.corrected,
            revision = self.revision,
            "applied transaction"
        );
        Ok(())
    }

    /// Runs `tx` against a copy of the document: ops, normalization, rewrite, schema check.
    pub fn preview_transaction(&self, tx: &Transaction) -> Result<TransactionPreview, ApplyError> {
        let mut doc = self.doc.clone();
        let mut selection = self.selection.clone();
        let schema = self.registry.schema();

        for op in tx.ops.iter().cloned() {
            apply_op_to(&mut doc, &mut selection, op, schema)?;
        }

        if let Some(sel) = &tx.selection_after {
            selection = sel.clone();
        }

        self.normalize_to_fixed_point(&mut doc, &mut selection)?;

        let mut corrected = false;
        if let Some(correction) = self.registry.rewriter().rewrite(&self.doc, &doc, tx) {
            debug!(
                source = correction.meta.source.as_deref().unwrap_or("rewrite"),
                ops = correction.ops.len(),
                "appending corrective transaction"
            );
            for op in correction.ops {
                apply_op_to(&mut doc, &mut selection, op, schema)?;
            }
            self.normalize_to_fixed_point(&mut doc, &mut selection)?;
            corrected = true;
        }

        schema.check(&doc)?;
        let selection = self.registry.normalize_selection(&doc, &selection);

        Ok(TransactionPreview {
            doc,
            selection,
            corrected,
        })
    }

    pub fn run_command(&mut self, id: &str, args: Option<Value>) -> Result<(), CommandError> {
        let Some(command) = self.registry.command(id) else {
            return Err(CommandError::new(format!("Unknown command: {id}")));
        };
        (command.handler)(self, args)
    }

    pub fn run_query_json(&self, id: &str, args: Option<Value>) -> Result<Value, QueryError> {
        let Some(query) = self.registry.query(id) else {
            return Err(QueryError::new(format!("Unknown query: {id}")));
        };
        (query.handler)(self, args)
    }

    pub fn run_query<T>(&self, id: &str, args: Option<Value>) -> Result<T, QueryError>
    where
        T: DeserializeOwned,
    {
        let value = self.run_query_json(id, args)?;
        serde_json::from_value(value)
            .map_err(|err| QueryError::new(format!("Failed to decode query result: {err}")))
    }

    /// Brings a freshly loaded document into shape: normalization plus one rewrite pass.
    fn normalize_in_place(&mut self) {
        let mut doc = std::mem::take(&mut self.doc);
        let mut selection = self.selection.clone();
        if let Err(err) = self.normalize_to_fixed_point(&mut doc, &mut selection) {
            debug!(%err, "initial normalization stopped early");
        }
        let loaded = Transaction::default().source("load");
        if let Some(correction) = self.registry.rewriter().rewrite(&doc, &doc, &loaded) {
            let schema = self.registry.schema();
            for op in correction.ops {
                if let Err(err) = apply_op_to(&mut doc, &mut selection, op, schema) {
                    debug!(%err, "initial rewrite stopped early");
                    break;
                }
            }
        }
        self.doc = doc;
        self.selection = selection;
        self.normalize_selection_in_place();
    }

    fn normalize_selection_in_place(&mut self) {
        self.selection = self
            .registry
            .normalize_selection(&self.doc, &self.selection);
    }

    fn normalize_to_fixed_point(
        &self,
        doc: &mut Document,
        selection: &mut PointRange,
    ) -> Result<(), ApplyError> {
        let schema = self.registry.schema();
        for _ in 0..self.config.max_normalize_iterations {
            let ops = self.registry.normalize(doc, selection);
            if ops.is_empty() {
                return Ok(());
            }
            for op in ops {
                apply_op_to(doc, selection, op, schema)?;
            }
        }
        Err(ApplyError::NormalizeDidNotConverge)
    }
}

fn apply_op_to(
    doc: &mut Document,
    selection: &mut PointRange,
    op: Op,
    schema: &Schema,
) -> Result<(), ApplyError> {
    match op {
        Op::InsertText { path, offset, text } => {
            let text_node = node_text_mut(doc, &path)?;
            let offset = clamp_to_char_boundary(&text_node.text, offset);
            text_node.text.insert_str(offset, &text);
            transform_selection_insert_text(selection, &path, offset, text.len());
        }
        Op::RemoveText { path, range } => {
            let text_node = node_text_mut(doc, &path)?;
            let start =
                clamp_to_char_boundary(&text_node.text, range.start.min(text_node.text.len()));
            let end = clamp_to_char_boundary(&text_node.text, range.end.min(text_node.text.len()));
            if start < end {
                text_node.text.replace_range(start..end, "");
                transform_selection_remove_text(selection, &path, start..end);
            }
        }
        Op::InsertNode { path, node } => {
            let (parent_path, _) = split_parent(&path)?;
            let parent = doc
                .parent_type(parent_path)
                .ok_or_else(|| PathError("Insert parent does not exist".into()))?;
            schema.ensure_child(parent, node.node_type())?;
            insert_node(doc, &path, node)?;
            transform_selection_insert_node(selection, &path);
        }
        Op::RemoveNode { path } => {
            let removed = remove_node(doc, &path)?;
            transform_selection_remove_node(selection, &path, &removed, doc);
        }
        Op::SetBlock { path, kind } => {
            let (parent_path, _) = split_parent(&path)?;
            let parent = doc
                .parent_type(parent_path)
                .ok_or_else(|| PathError("Block parent does not exist".into()))?;
            schema.ensure_child(parent, kind.node_type())?;
            match node_mut(doc, &path)? {
                Node::Element(el) => el.kind = kind,
                Node::Text(_) | Node::Void(_) => {
                    return Err(ApplyError::InvalidPath("Only elements can be retyped".into()));
                }
            }
        }
        Op::SetTextMarks { path, marks } => {
            let text_node = node_text_mut(doc, &path)?;
            text_node.marks = marks;
        }
    }
    Ok(())
}

#[derive(Debug, Error)]
pub enum ApplyError {
    #[error("invalid path: {0}")]
    InvalidPath(String),
    #[error("normalization did not converge")]
    NormalizeDidNotConverge,
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error("editor is read-only")]
    ReadOnly,
}

impl From<PathError> for ApplyError {
    fn from(value: PathError) -> Self {
        ApplyError::InvalidPath(value.0)
    }
}

#[derive(Debug)]
pub struct PathError(pub String);

pub(crate) fn clamp_to_char_boundary(s: &str, mut ix: usize) -> usize {
    ix = ix.min(s.len());
    while ix > 0 && !s.is_char_boundary(ix) {
        ix -= 1;
    }
    ix
}

fn split_parent(path: &[usize]) -> Result<(&[usize], usize), PathError> {
    let (index, parent) = path
        .split_last()
        .ok_or_else(|| PathError("Empty path".into()))?;
    Ok((parent, *index))
}

fn transform_selection_insert_text(
    selection: &mut PointRange,
    path: &[usize],
    offset: usize,
    len: usize,
) {
    for point in [&mut selection.anchor, &mut selection.focus] {
        if point.path == path && point.offset >= offset {
            point.offset = point.offset.saturating_add(len);
        }
    }
}

fn transform_selection_remove_text(
    selection: &mut PointRange,
    path: &[usize],
    range: std::ops::Range<usize>,
) {
    let removed_len = range.end.saturating_sub(range.start);
    for point in [&mut selection.anchor, &mut selection.focus] {
        if point.path != path {
            continue;
        }
        if point.offset <= range.start {
            continue;
        }
        if point.offset >= range.end {
            point.offset = point.offset.saturating_sub(removed_len);
        } else {
            point.offset = range.start;
        }
    }
}

fn transform_selection_insert_node(selection: &mut PointRange, path: &[usize]) {
    if path.is_empty() {
        return;
    }
    let (parent_path, index) = path.split_at(path.len() - 1);
    let index = index[0];

    for point in [&mut selection.anchor, &mut selection.focus] {
        if point.path.len() <= parent_path.len() {
            continue;
        }
        if !point.path.starts_with(parent_path) {
            continue;
        }
        let depth = parent_path.len();
        if point.path[depth] >= index {
            point.path[depth] += 1;
        }
    }
}

fn transform_selection_remove_node(
    selection: &mut PointRange,
    path: &[usize],
    removed: &Node,
    doc_after_remove: &Document,
) {
    if path.is_empty() {
        return;
    }
    let (parent_path, index) = path.split_at(path.len() - 1);
    let index = index[0];

    let merge_prefix_len = match (removed, index.checked_sub(1)) {
        (Node::Text(removed_text), Some(left_index)) => {
            let mut left_path = parent_path.to_vec();
            left_path.push(left_index);
            match doc_after_remove.node(&left_path) {
                Some(Node::Text(left_text))
                    if left_text.marks == removed_text.marks
                        && left_text.text.ends_with(&removed_text.text) =>
                {
                    Some(left_text.text.len().saturating_sub(removed_text.text.len()))
                }
                _ => None,
            }
        }
        _ => None,
    };

    for point in [&mut selection.anchor, &mut selection.focus] {
        if point.path.len() <= parent_path.len() {
            continue;
        }
        if !point.path.starts_with(parent_path) {
            continue;
        }
        let depth = parent_path.len();
        let ix = point.path[depth];
        if ix > index {
            point.path[depth] = ix - 1;
            continue;
        }
        if ix < index {
            continue;
        }

        // Point was inside the removed subtree. Map it to a nearby point.
        if let (Some(prefix), Node::Text(removed_text), Some(left_index)) =
            (merge_prefix_len, removed, index.checked_sub(1))
        {
            point.path.truncate(depth + 1);
            point.path[depth] = left_index;
            point.offset = (prefix + point.offset).min(prefix + removed_text.text.len());
        } else {
            point.path.truncate(depth + 1);
            point.path[depth] = index.saturating_sub(1);
            point.offset = 0;
        }
    }
}

fn node_mut<'a>(doc: &'a mut Document, path: &[usize]) -> Result<&'a mut Node, PathError> {
    let (first, rest) = path
        .split_first()
        .ok_or_else(|| PathError("Empty path".into()))?;
    let len = doc.children.len();
    let mut node = doc
        .children
        .get_mut(*first)
        .ok_or_else(|| PathError(format!("Path out of bounds at depth 0: {first} >= {len}")))?;

    for (depth, &ix) in rest.iter().enumerate() {
        node = match node {
            Node::Element(el) => {
                let len = el.children.len();
                el.children.get_mut(ix).ok_or_else(|| {
                    PathError(format!(
                        "Path out of bounds at depth {}: {ix} >= {len}",
                        depth + 1
                    ))
                })?
            }
            Node::Void(_) | Node::Text(_) => {
                return Err(PathError(format!("Non-container node at depth {depth}")));
            }
        };
    }
    Ok(node)
}

fn node_text_mut<'a>(doc: &'a mut Document, path: &[usize]) -> Result<&'a mut TextNode, PathError> {
    match node_mut(doc, path)? {
        Node::Text(t) => Ok(t),
        _ => Err(PathError("Expected Text node".into())),
    }
}

fn children_mut<'a>(
    doc: &'a mut Document,
    parent_path: &[usize],
) -> Result<&'a mut Vec<Node>, PathError> {
    if parent_path.is_empty() {
        return Ok(&mut doc.children);
    }
    match node_mut(doc, parent_path)? {
        Node::Element(el) => Ok(&mut el.children),
        Node::Void(_) | Node::Text(_) => Err(PathError("Parent is not a container".into())),
    }
}

fn insert_node(doc: &mut Document, path: &[usize], node: Node) -> Result<(), PathError> {
    let (parent_path, index) = split_parent(path)?;
    let children = children_mut(doc, parent_path)?;
    if index > children.len() {
        return Err(PathError(format!(
            "Insert index out of bounds: {index} > {}",
            children.len()
        )));
    }
    children.insert(index, node);
    Ok(())
}

fn remove_node(doc: &mut Document, path: &[usize]) -> Result<Node, PathError> {
    let (parent_path, index) = split_parent(path)?;
    let children = children_mut(doc, parent_path)?;
    if index >= children.len() {
        return Err(PathError(format!(
            "Remove index out of bounds: {index} >= {}",
            children.len()
        )));
    }
    Ok(children.remove(index))
}
