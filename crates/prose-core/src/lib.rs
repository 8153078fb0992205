mod clipboard;
mod commands;
mod config;
mod core;
mod image;
mod keymap;
mod navigator;
mod ops;
mod plugin;
mod plugins;
pub mod positions;
mod rewrite;
mod schema;
mod serde_value;
mod session;

pub use crate::clipboard::*;
pub use crate::config::*;
pub use crate::core::*;
pub use crate::image::*;
pub use crate::keymap::*;
pub use crate::navigator::*;
pub use crate::ops::*;
pub use crate::plugin::*;
pub use crate::rewrite::*;
pub use crate::schema::*;
pub use crate::serde_value::*;
pub use crate::session::*;
