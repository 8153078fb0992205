//! Keyboard shortcuts on top of the command surface and the navigator.

use std::fmt;
use std::str::FromStr;

use serde_json::json;
use thiserror::Error;

use crate::commands::focus_in;
use crate::core::Editor;
use crate::navigator::{self, KeyOutcome, NavKey};
use crate::plugin::CommandError;
use crate::schema::NodeType;

/// A parsed shortcut such as `mod-shift-b` or `Enter`.
///
/// `mod`, `cmd`, `ctrl` and `secondary` all name the platform command modifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyCombo {
    pub primary: bool,
    pub shift: bool,
    pub alt: bool,
    pub key: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyComboError {
    #[error("empty key combo")]
    Empty,
    #[error("unknown modifier `{0}`")]
    UnknownModifier(String),
}

impl FromStr for KeyCombo {
    type Err = KeyComboError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        // A trailing `-` is the minus key itself.
        let (mods, key) = match s.strip_suffix("--") {
            Some(rest) => (rest, "-"),
            None => s.rsplit_once('-').unwrap_or(("", s)),
        };
        if key.is_empty() {
            return Err(KeyComboError::Empty);
        }

        let mut combo = KeyCombo {
            primary: false,
            shift: false,
            alt: false,
            key: normalize_key(key),
        };
        for part in mods.split('-').filter(|p| !p.is_empty()) {
            match part.to_ascii_lowercase().as_str() {
                "mod" | "cmd" | "ctrl" | "secondary" | "meta" => combo.primary = true,
                "shift" => combo.shift = true,
                "alt" | "option" => combo.alt = true,
                _ => return Err(KeyComboError::UnknownModifier(part.to_string())),
            }
        }
        Ok(combo)
    }
}

impl fmt::Display for KeyCombo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.primary {
            f.write_str("mod-")?;
        }
        if self.alt {
            f.write_str("alt-")?;
        }
        if self.shift {
            f.write_str("shift-")?;
        }
        f.write_str(&self.key)
    }
}

fn normalize_key(key: &str) -> String {
    match key.to_ascii_lowercase().as_str() {
        "arrowup" => "up".to_string(),
        "arrowdown" => "down".to_string(),
        "return" => "enter".to_string(),
        other => other.to_string(),
    }
}

impl KeyCombo {
    fn plain(&self) -> bool {
        !self.primary && !self.shift && !self.alt
    }

    fn nav_key(&self) -> Option<NavKey> {
        if !self.plain() {
            return None;
        }
        match self.key.as_str() {
            "enter" => Some(NavKey::Enter),
            "up" => Some(NavKey::ArrowUp),
            "down" => Some(NavKey::ArrowDown),
            "backspace" => Some(NavKey::Backspace),
            _ => None,
        }
    }
}

enum Binding {
    Mark(&'static str),
    Blockquote,
}

fn binding(combo: &KeyCombo) -> Option<Binding> {
    if !combo.primary || combo.alt {
        return None;
    }
    match (combo.shift, combo.key.as_str()) {
        (false, "b") => Some(Binding::Mark("bold")),
        (false, "i") => Some(Binding::Mark("italic")),
        (false, "u") => Some(Binding::Mark("underline")),
        (true, "s") => Some(Binding::Mark("strike")),
        (false, "e") => Some(Binding::Mark("code")),
        (true, "b") => Some(Binding::Blockquote),
        _ => None,
    }
}

/// Dispatches a shortcut.
///
/// Formatting shortcuts are swallowed inside headings so the host never applies its own
/// defaults there.
pub fn handle_key_combo(editor: &mut Editor, combo: &KeyCombo) -> Result<KeyOutcome, CommandError> {
    if let Some(key) = combo.nav_key() {
        return navigator::handle_key(editor, key)
            .map_err(|e| CommandError::new(format!("Failed to handle {combo}: {e}")));
    }

    let Some(binding) = binding(combo) else {
        return Ok(KeyOutcome::Fallthrough);
    };
    if focus_in(editor, NodeType::Heading).is_some() {
        return Ok(KeyOutcome::Handled);
    }
    match binding {
        Binding::Mark(mark) => editor.run_command("marks.toggle", Some(json!({ "mark": mark })))?,
        Binding::Blockquote => editor.run_command("blockquote.toggle", None)?,
    }
    Ok(KeyOutcome::Handled)
}
