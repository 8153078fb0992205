use tracing::debug;

use crate::core::{BlockKind, Document, Node};
use crate::ops::{Op, Path, Transaction};
use crate::schema::{MarkSet, NodeType};

/// Inspects the state produced by a transaction and returns ops restoring an invariant.
///
/// Rules see the same post-transaction document, so the ops they return must keep
/// the tree shape intact (marks and attributes only).
pub trait RewriteRule: Send + Sync {
    fn id(&self) -> &'static str;
    fn rewrite(&self, old: &Document, new: &Document, tx: &Transaction) -> Vec<Op>;
}

#[derive(Default)]
pub struct TransactionRewriter {
    rules: Vec<Box<dyn RewriteRule>>,
}

impl TransactionRewriter {
    pub fn push(&mut self, rule: Box<dyn RewriteRule>) {
        self.rules.push(rule);
    }

    pub fn rules(&self) -> impl Iterator<Item = &dyn RewriteRule> {
        self.rules.iter().map(|r| r.as_ref())
    }

    /// Composes every rule into at most one corrective transaction.
    pub fn rewrite(&self, old: &Document, new: &Document, tx: &Transaction) -> Option<Transaction> {
        let mut ops = Vec::new();
        let mut fired = Vec::new();
        for rule in &self.rules {
            let rule_ops = rule.rewrite(old, new, tx);
            if !rule_ops.is_empty() {
                fired.push(rule.id());
                ops.extend(rule_ops);
            }
        }
        if ops.is_empty() {
            return None;
        }
        debug!(rules = ?fired, ops = ops.len(), "rewrite rules fired");
        Some(Transaction::new(ops).source(format!("rewrite:{}", fired.join(","))))
    }
}

/// Removes every mark outside `keep` from text below nodes of type `scope`.
pub struct MarkStripRule {
    id: &'static str,
    scope: NodeType,
    keep: MarkSet,
}

impl MarkStripRule {
    pub fn new(id: &'static str, scope: NodeType, keep: MarkSet) -> Self {
        Self { id, scope, keep }
    }
}

impl RewriteRule for MarkStripRule {
    fn id(&self) -> &'static str {
        self.id
    }

    fn rewrite(&self, _old: &Document, new: &Document, _tx: &Transaction) -> Vec<Op> {
        fn walk(
            children: &[Node],
            inside: bool,
            rule: &MarkStripRule,
            path: &mut Path,
            ops: &mut Vec<Op>,
        ) {
            for (ix, node) in children.iter().enumerate() {
                path.push(ix);
                match node {
                    Node::Text(t) if inside => {
                        let kept = t.marks.retain(rule.keep);
                        if kept != t.marks {
                            ops.push(Op::SetTextMarks {
                                path: path.clone(),
                                marks: kept,
                            });
                        }
                    }
                    Node::Element(el) => {
                        let inside = inside || el.node_type() == rule.scope;
                        walk(&el.children, inside, rule, path, ops);
                    }
                    Node::Text(_) | Node::Void(_) => {}
                }
                path.pop();
            }
        }

        let mut ops = Vec::new();
        walk(&new.children, false, self, &mut Vec::new(), &mut ops);
        ops
    }
}

/// Level a pasted heading keeps: h1 becomes h2, h2 and h3 stay, deeper levels become paragraphs.
pub fn coerce_pasted_heading(level: u8) -> Option<u8> {
    match level {
        0 | 1 => Some(2),
        2 | 3 => Some(level),
        _ => None,
    }
}

/// Applies [`coerce_pasted_heading`] to every top-level heading of a pasted slice.
pub fn coerce_pasted_headings(nodes: Vec<Node>) -> Vec<Node> {
    nodes
        .into_iter()
        .map(|node| match node {
            Node::Element(mut el) => {
                if let BlockKind::Heading { level } = el.kind {
                    el.kind = match coerce_pasted_heading(level) {
                        Some(level) => BlockKind::Heading { level },
                        None => BlockKind::Paragraph,
                    };
                }
                Node::Element(el)
            }
            other => other,
        })
        .collect()
}
