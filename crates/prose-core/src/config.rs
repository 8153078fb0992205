use serde::{Deserialize, Serialize};

/// How pasted HTML headings are mapped onto the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PasteProfile {
    /// h1 becomes h2, h4 and deeper become paragraphs.
    #[default]
    Quill,
    /// Heading levels are clamped by normalization only.
    Schema,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    pub max_normalize_iterations: usize,
    pub heading_levels: Vec<u8>,
    pub paste_profile: PasteProfile,
    pub editable: bool,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            max_normalize_iterations: 0,
            heading_levels: Vec::new(),
            paste_profile: PasteProfile::default(),
            editable: true,
        }
    }
}

impl EditorConfig {
    pub fn read_only() -> Self {
        Self {
            editable: false,
            ..Self::default()
        }
        .with_defaults()
    }

    pub fn from_json_str(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str::<Self>(s).map(Self::with_defaults)
    }

    pub(crate) fn with_defaults(mut self) -> Self {
        if self.max_normalize_iterations == 0 {
            self.max_normalize_iterations = 100;
        }
        self.heading_levels.retain(|level| (1..=6).contains(level));
        self.heading_levels.sort_unstable();
        self.heading_levels.dedup();
        if self.heading_levels.is_empty() {
            self.heading_levels = vec![2, 3];
        }
        self
    }
}
