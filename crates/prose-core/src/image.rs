//! Image upload lifecycle: insert with a local preview, complete with the stored asset,
//! delete into an empty paragraph.
//!
//! Pending uploads are tracked by [`UploadId`] rather than tree position, so a completion
//! that arrives after the user removed or moved the image still finds the right node, or
//! nothing at all.

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::commands::{focus_in, insert_blocks_at_caret};
use crate::core::{ApplyError, BlockKind, Editor, ImageAttrs, Node, Point, PointRange};
use crate::ops::{Op, Path, Transaction};
use crate::plugins::find_in_elements;
use crate::schema::NodeType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UploadId(pub u64);

impl fmt::Display for UploadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "upload-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum UploadStatus {
    Pending,
    Uploaded,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageState {
    /// Showing the local preview. Failed uploads stay here.
    PendingUpload,
    Uploaded,
    Deleted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageFile {
    pub name: String,
    pub mime: Option<String>,
    pub bytes: Arc<[u8]>,
}

impl ImageFile {
    pub fn new(name: impl Into<String>, mime: Option<&str>, bytes: impl Into<Arc<[u8]>>) -> Self {
        Self {
            name: name.into(),
            mime: mime.map(str::to_string),
            bytes: bytes.into(),
        }
    }

    /// The declared MIME type, or one guessed from the file name.
    pub fn mime(&self) -> String {
        match &self.mime {
            Some(mime) if !mime.trim().is_empty() => mime.trim().to_ascii_lowercase(),
            _ => mime_guess::from_path(&self.name)
                .first_or_octet_stream()
                .essence_str()
                .to_string(),
        }
    }

    pub fn is_image(&self) -> bool {
        self.mime().starts_with("image/")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    #[serde(default)]
    pub url: String,
    pub name: String,
    pub width: u32,
    pub height: u32,
}

/// Handed back by [`insert_image_file`]; pass it to [`upload_image`] or report the
/// outcome of your own upload with [`finish_upload`].
#[derive(Debug, Clone)]
pub struct UploadTicket {
    pub id: UploadId,
    pub file: ImageFile,
}

/// Stores image bytes somewhere durable.
pub trait ImageUploader {
    fn upload(&self, file: &ImageFile) -> impl Future<Output = anyhow::Result<UploadResponse>>;
}

#[derive(Debug, Error)]
pub enum ImageError {
    #[error("not an image file: {name} ({mime})")]
    NotAnImage { name: String, mime: String },
    #[error(transparent)]
    Apply(#[from] ApplyError),
}

pub fn preview_data_url(file: &ImageFile) -> String {
    format!("data:{};base64,{}", file.mime(), STANDARD.encode(&file.bytes))
}

pub(crate) fn find_upload(editor: &Editor, id: UploadId) -> Option<Path> {
    find_in_elements(editor.doc(), |el, path| {
        let attrs = el.kind.image_attrs()?;
        (attrs.upload == Some(id)).then(|| path.clone())
    })
}

fn image_attrs_at(editor: &Editor, path: &[usize]) -> Option<ImageAttrs> {
    editor.doc().element(path)?.kind.image_attrs().cloned()
}

/// Inserts `file` as a new image at the caret, then immediately swaps in the base64 preview.
pub fn insert_image_file(editor: &mut Editor, file: ImageFile) -> Result<UploadTicket, ImageError> {
    if !file.is_image() {
        return Err(ImageError::NotAnImage {
            mime: file.mime(),
            name: file.name,
        });
    }

    let id = UploadId(editor.next_upload);
    let attrs = ImageAttrs {
        src: format!("blob:{id}"),
        is_new: true,
        upload: Some(id),
        ..ImageAttrs::default()
    };
    let (ops, top) = insert_blocks_at_caret(editor, vec![Node::image(attrs, "")]);
    editor.apply(
        Transaction::new(ops)
            .selection_after(PointRange::collapsed(Point::new(vec![top, 0], 0)))
            .source("image.insert_file"),
    )?;
    editor.next_upload += 1;
    editor.uploads.insert(id, UploadStatus::Pending);

    if let Some(path) = find_upload(editor, id) {
        if let Some(mut attrs) = image_attrs_at(editor, &path) {
            attrs.src = preview_data_url(&file);
            attrs.is_new = false;
            editor.apply(
                Transaction::new(vec![Op::SetBlock {
                    path,
                    kind: BlockKind::Image(attrs),
                }])
                .source("image.preview"),
            )?;
        }
    }
    debug!(%id, name = %file.name, bytes = file.bytes.len(), "image inserted with preview");

    Ok(UploadTicket { id, file })
}

/// Applies the outcome of an upload.
///
/// Success rewrites `src`, `width` and `height` of the tagged image if it is still in
/// the document. Failures are logged and the preview stays.
pub fn finish_upload(
    editor: &mut Editor,
    id: UploadId,
    result: anyhow::Result<UploadResponse>,
) -> Result<(), ApplyError> {
    let response = match result {
        Ok(response) => response,
        Err(err) => {
            warn!(%id, error = %format!("{err:#}"), "image upload failed, keeping preview");
            editor.uploads.insert(id, UploadStatus::Failed);
            return Ok(());
        }
    };

    let Some(path) = find_upload(editor, id) else {
        debug!(%id, "upload finished for an image that is gone");
        editor.uploads.insert(id, UploadStatus::Uploaded);
        return Ok(());
    };
    let Some(mut attrs) = image_attrs_at(editor, &path) else {
        return Ok(());
    };
    attrs.src = response.name;
    attrs.width = Some(response.width);
    attrs.height = Some(response.height);
    attrs.is_new = false;

    editor.apply(
        Transaction::new(vec![Op::SetBlock {
            path,
            kind: BlockKind::Image(attrs),
        }])
        .source("image.upload_complete"),
    )?;
    editor.uploads.insert(id, UploadStatus::Uploaded);
    debug!(%id, "image upload applied");
    Ok(())
}

pub async fn upload_image<U: ImageUploader>(
    editor: &mut Editor,
    uploader: &U,
    ticket: UploadTicket,
) -> Result<(), ApplyError> {
    let result = uploader.upload(&ticket.file).await;
    finish_upload(editor, ticket.id, result)
}

pub fn image_state(editor: &Editor, id: UploadId) -> Option<ImageState> {
    let status = editor.uploads.get(&id)?;
    if find_upload(editor, id).is_none() {
        return Some(ImageState::Deleted);
    }
    Some(match status {
        UploadStatus::Pending | UploadStatus::Failed => ImageState::PendingUpload,
        UploadStatus::Uploaded => ImageState::Uploaded,
    })
}

/// Turns the image holding the caret into an empty paragraph in the same slot.
///
/// The caption is cleared first and the node retyped in a second transaction.
/// Returns `false` when the caret is not in an image.
pub fn delete_image(editor: &mut Editor) -> Result<bool, ApplyError> {
    let Some(path) = focus_in(editor, NodeType::Image) else {
        return Ok(false);
    };
    delete_image_at(editor, path)?;
    Ok(true)
}

pub(crate) fn delete_image_at(editor: &mut Editor, path: Path) -> Result<(), ApplyError> {
    let caption_len = editor
        .doc()
        .element(&path)
        .map_or(0, |el| el.children.len());

    let mut ops: Vec<Op> = (0..caption_len)
        .rev()
        .map(|ix| {
            let mut child = path.clone();
            child.push(ix);
            Op::RemoveNode { path: child }
        })
        .collect();
    let mut leaf = path.clone();
    leaf.push(0);
    ops.push(Op::InsertNode {
        path: leaf.clone(),
        node: Node::text(""),
    });
    editor.apply(
        Transaction::new(ops)
            .selection_after(PointRange::collapsed(Point::new(leaf, 0)))
            .source("image.clear_caption"),
    )?;

    editor.apply(
        Transaction::new(vec![Op::SetBlock {
            path: path.clone(),
            kind: BlockKind::Paragraph,
        }])
        .source("image.delete"),
    )?;
    debug!(?path, "image replaced by empty paragraph");
    Ok(())
}
