//! Caret movement around images and blockquotes.
//!
//! Default keyboard handling does not know how to leave a captioned image or a quote
//! without splitting it, so these keys jump to the neighbouring top-level block instead.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::commands::focus_in;
use crate::core::{ApplyError, Document, Editor};
use crate::image::delete_image_at;
use crate::positions::{self, NodePos};
use crate::schema::NodeType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NavKey {
    Enter,
    ArrowUp,
    ArrowDown,
    Backspace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavState {
    Normal,
    InImage,
    InBlockquote,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    /// The key was consumed; default handling must not run.
    Handled,
    Fallthrough,
}

pub fn nav_state(editor: &Editor) -> NavState {
    if focus_in(editor, NodeType::Image).is_some() {
        NavState::InImage
    } else if focus_in(editor, NodeType::Blockquote).is_some() {
        NavState::InBlockquote
    } else {
        NavState::Normal
    }
}

pub fn handle_key(editor: &mut Editor, key: NavKey) -> Result<KeyOutcome, ApplyError> {
    let state = nav_state(editor);
    let caret = editor.selection().from();
    let blocks = positions::top_level(editor.doc());

    let target = match (key, state) {
        (NavKey::Enter, NavState::InBlockquote) => next_block(&blocks, caret).map(|n| n.pos),
        (NavKey::Enter, NavState::InImage) => next_block(&blocks, caret).map(|n| n.to - 1),
        (NavKey::ArrowUp, NavState::InImage) => match previous_end(&blocks, caret) {
            None => Some(0),
            Some(end) => match text_pos_at_or_before(editor.doc(), end) {
                Some(pos) => Some(pos),
                // Only atoms above: leave the move to default handling.
                None => return Ok(KeyOutcome::Fallthrough),
            },
        },
        (NavKey::ArrowDown, NavState::InImage) => next_block(&blocks, caret).map(|n| {
            let end = n.from + n.content_size;
            if n.node_type == NodeType::Blockquote {
                end - 1
            } else {
                end
            }
        }),
        (NavKey::Backspace, NavState::InImage) => {
            return delete_at_caption_start(editor, &blocks, caret);
        }
        _ => return Ok(KeyOutcome::Fallthrough),
    };

    match target {
        Some(pos) => {
            debug!(?key, ?state, from = caret, to = pos, "caret jump");
            editor.focus(pos);
        }
        None => debug!(?key, ?state, caret, "no block to jump to"),
    }
    Ok(KeyOutcome::Handled)
}

fn next_block(blocks: &[NodePos], caret: usize) -> Option<&NodePos> {
    blocks.iter().find(|n| n.pos > caret)
}

/// Content end of the last block before the one holding the caret.
fn previous_end(blocks: &[NodePos], caret: usize) -> Option<usize> {
    let mut prev = None;
    for n in blocks {
        if n.contains(caret) {
            break;
        }
        prev = Some(n.to - 1);
    }
    prev
}

/// `pos` clamped into the last textblock starting at or before it.
fn text_pos_at_or_before(doc: &Document, pos: usize) -> Option<usize> {
    positions::textblocks(doc)
        .into_iter()
        .rev()
        .find(|b| b.start <= pos)
        .map(|b| pos.min(b.end))
}

fn delete_at_caption_start(
    editor: &mut Editor,
    blocks: &[NodePos],
    caret: usize,
) -> Result<KeyOutcome, ApplyError> {
    let Some(path) = focus_in(editor, NodeType::Image) else {
        return Ok(KeyOutcome::Fallthrough);
    };
    let at_start = editor.selection().is_collapsed()
        && blocks
            .get(path[0])
            .is_some_and(|n| n.node_type == NodeType::Image && n.from == caret);
    if !at_start {
        return Ok(KeyOutcome::Fallthrough);
    }
    delete_image_at(editor, path)?;
    Ok(KeyOutcome::Handled)
}
