//! Persisted JSON form of a document.
//!
//! The shape is the ProseMirror one: `{"type": "doc", "content": [...]}` with text
//! nodes carrying `marks: [{"type": "link", "attrs": {"href": ...}}]`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::core::{BlockKind, Document, ImageAttrs, Marks, Node, TextNode, VoidKind, VoidNode};
use crate::schema::{MarkType, NodeType, SchemaError};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct JsonNode {
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attrs: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<JsonNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub marks: Vec<JsonMark>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonMark {
    #[serde(rename = "type")]
    pub mark_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attrs: Option<Map<String, Value>>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredImageAttrs {
    #[serde(default)]
    src: String,
    #[serde(default)]
    alt: Option<String>,
    #[serde(default)]
    width: Option<u32>,
    #[serde(default)]
    height: Option<u32>,
    #[serde(default)]
    is_new: bool,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("malformed document json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("expected a `doc` root, found `{0}`")]
    NotADocument(String),
    #[error("unknown node type `{0}`")]
    UnknownNode(String),
    #[error("unknown mark `{0}`")]
    UnknownMark(String),
    #[error("invalid attrs on `{node}`: {message}")]
    InvalidAttrs { node: String, message: String },
    #[error("document does not fit the schema: {0}")]
    Schema(#[from] SchemaError),
}

pub fn document_to_json(doc: &Document) -> Value {
    let root = JsonNode {
        node_type: NodeType::Doc.name().to_string(),
        content: doc.children.iter().filter_map(node_to_json).collect(),
        ..JsonNode::default()
    };
    serde_json::to_value(root).unwrap_or(Value::Null)
}

pub fn document_to_json_string(doc: &Document) -> Result<String, serde_json::Error> {
    serde_json::to_string(&document_to_json(doc))
}

pub fn document_from_json_str(s: &str) -> Result<Document, LoadError> {
    let root: JsonNode = serde_json::from_str(s)?;
    document_from_json_node(&root)
}

pub fn document_from_json(value: Value) -> Result<Document, LoadError> {
    let root: JsonNode = serde_json::from_value(value)?;
    document_from_json_node(&root)
}

fn document_from_json_node(root: &JsonNode) -> Result<Document, LoadError> {
    if NodeType::from_name(&root.node_type) != Some(NodeType::Doc) {
        return Err(LoadError::NotADocument(root.node_type.clone()));
    }
    let children = root
        .content
        .iter()
        .map(node_from_json)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Document::new(children))
}

fn attrs_of(node: &JsonNode) -> Value {
    Value::Object(node.attrs.clone().unwrap_or_default())
}

fn invalid_attrs(node: &JsonNode, err: impl ToString) -> LoadError {
    LoadError::InvalidAttrs {
        node: node.node_type.clone(),
        message: err.to_string(),
    }
}

fn node_from_json(node: &JsonNode) -> Result<Node, LoadError> {
    let node_type = NodeType::from_name(&node.node_type)
        .ok_or_else(|| LoadError::UnknownNode(node.node_type.clone()))?;

    let kind = match node_type {
        NodeType::Text => {
            return Ok(Node::Text(TextNode {
                text: node.text.clone().unwrap_or_default(),
                marks: marks_from_json(&node.marks)?,
            }));
        }
        NodeType::Youtube => {
            let src = attrs_of(node)
                .get("src")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            return Ok(Node::Void(VoidNode {
                kind: VoidKind::Youtube { src },
            }));
        }
        NodeType::Doc => return Err(LoadError::NotADocument(node.node_type.clone())),
        NodeType::Paragraph => BlockKind::Paragraph,
        NodeType::Heading => {
            let level = attrs_of(node)
                .get("level")
                .and_then(Value::as_u64)
                .and_then(|l| u8::try_from(l).ok())
                .ok_or_else(|| invalid_attrs(node, "missing heading level"))?;
            BlockKind::Heading { level }
        }
        NodeType::BulletList => BlockKind::BulletList,
        NodeType::OrderedList => BlockKind::OrderedList,
        NodeType::ListItem => BlockKind::ListItem,
        NodeType::Blockquote => BlockKind::Blockquote,
        NodeType::Image => {
            let stored: StoredImageAttrs =
                serde_json::from_value(attrs_of(node)).map_err(|e| invalid_attrs(node, e))?;
            BlockKind::Image(ImageAttrs {
                src: stored.src,
                alt: stored.alt.unwrap_or_default(),
                width: stored.width,
                height: stored.height,
                is_new: stored.is_new,
                upload: None,
            })
        }
    };

    let children = node
        .content
        .iter()
        .map(node_from_json)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Node::element(kind, children))
}

fn marks_from_json(marks: &[JsonMark]) -> Result<Marks, LoadError> {
    let mut out = Marks::default();
    for mark in marks {
        let mark_type = match mark.mark_type.as_str() {
            "strong" => MarkType::Bold,
            "em" => MarkType::Italic,
            name => MarkType::from_name(name)
                .ok_or_else(|| LoadError::UnknownMark(mark.mark_type.clone()))?,
        };
        if mark_type == MarkType::Link {
            out.link = mark
                .attrs
                .as_ref()
                .and_then(|attrs| attrs.get("href"))
                .and_then(Value::as_str)
                .map(str::to_string);
        } else {
            out.set(mark_type, true);
        }
    }
    Ok(out)
}

fn marks_to_json(marks: &Marks) -> Vec<JsonMark> {
    MarkType::ALL
        .into_iter()
        .filter(|m| marks.has(*m))
        .map(|m| JsonMark {
            mark_type: m.name().to_string(),
            attrs: match (m, &marks.link) {
                (MarkType::Link, Some(href)) => {
                    let mut attrs = Map::new();
                    attrs.insert("href".into(), Value::String(href.clone()));
                    Some(attrs)
                }
                _ => None,
            },
        })
        .collect()
}

/// Empty text leaves have no persisted form and are dropped.
fn node_to_json(node: &Node) -> Option<JsonNode> {
    match node {
        Node::Text(t) if t.text.is_empty() => None,
        Node::Text(t) => Some(JsonNode {
            node_type: NodeType::Text.name().to_string(),
            text: Some(t.text.clone()),
            marks: marks_to_json(&t.marks),
            ..JsonNode::default()
        }),
        Node::Void(v) => match &v.kind {
            VoidKind::Youtube { src } => {
                let mut attrs = Map::new();
                attrs.insert("src".into(), Value::String(src.clone()));
                Some(JsonNode {
                    node_type: NodeType::Youtube.name().to_string(),
                    attrs: Some(attrs),
                    ..JsonNode::default()
                })
            }
        },
        Node::Element(el) => {
            let attrs = match &el.kind {
                BlockKind::Heading { level } => {
                    let mut attrs = Map::new();
                    attrs.insert("level".into(), Value::from(*level));
                    Some(attrs)
                }
                BlockKind::Image(image) => {
                    let stored = StoredImageAttrs {
                        src: image.src.clone(),
                        alt: Some(image.alt.clone()),
                        width: image.width,
                        height: image.height,
                        is_new: image.is_new,
                    };
                    match serde_json::to_value(stored) {
                        Ok(Value::Object(map)) => Some(map),
                        _ => None,
                    }
                }
                _ => None,
            };
            Some(JsonNode {
                node_type: el.node_type().name().to_string(),
                attrs,
                content: el.children.iter().filter_map(node_to_json).collect(),
                ..JsonNode::default()
            })
        }
    }
}
