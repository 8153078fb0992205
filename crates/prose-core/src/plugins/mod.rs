pub(crate) mod blockquote;
pub(crate) mod core;
pub(crate) mod heading;
pub(crate) mod image;
pub(crate) mod list;
pub(crate) mod marks;
pub(crate) mod youtube;

use crate::core::{Document, ElementNode, Node};
use crate::ops::Path;

/// Calls `visit` for every element in document order, stopping at the first non-empty result.
pub(crate) fn find_in_elements<T>(
    doc: &Document,
    mut visit: impl FnMut(&ElementNode, &Path) -> Option<T>,
) -> Option<T> {
    fn walk<T>(
        children: &[Node],
        path: &mut Path,
        visit: &mut dyn FnMut(&ElementNode, &Path) -> Option<T>,
    ) -> Option<T> {
        for (ix, node) in children.iter().enumerate() {
            let Node::Element(el) = node else {
                continue;
            };
            path.push(ix);
            if let Some(found) = visit(el, path) {
                return Some(found);
            }
            if let Some(found) = walk(&el.children, path, visit) {
                return Some(found);
            }
            path.pop();
        }
        None
    }

    walk(&doc.children, &mut Vec::new(), &mut visit)
}
