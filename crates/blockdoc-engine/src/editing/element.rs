use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EngineError;

/// JSON-safe property value for element props and text marks.
///
/// Stands in for the "anything serializable" bag the block plugins attach to
/// their elements (checked state, language, highlight color, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl From<bool> for PropValue {
    fn from(v: bool) -> Self {
        PropValue::Bool(v)
    }
}

impl From<i64> for PropValue {
    fn from(v: i64) -> Self {
        PropValue::Int(v)
    }
}

impl From<&str> for PropValue {
    fn from(v: &str) -> Self {
        PropValue::Str(v.to_string())
    }
}

impl From<String> for PropValue {
    fn from(v: String) -> Self {
        PropValue::Str(v)
    }
}

/// Selection/deletion semantics of a root element within a block value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NodeKind {
    /// Structural container rendered as its own line box.
    Block,
    /// Inline container living inside a line of text.
    Inline,
    /// Atomic block-level node; holds a single placeholder leaf.
    Void,
    /// Atomic inline node; holds a single placeholder leaf.
    InlineVoid,
}

/// A run of text with independent formatting annotations.
///
/// Marks are orthogonal to tree structure: `bold`, `italic`, `code` and
/// friends are entries in a flat map, not nested elements.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TextLeaf {
    pub text: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub marks: BTreeMap<String, PropValue>,
}

impl TextLeaf {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            marks: BTreeMap::new(),
        }
    }

    /// The empty placeholder leaf kept inside void nodes and emptied
    /// containers so they remain valid cursor targets.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_mark(mut self, name: impl Into<String>, value: impl Into<PropValue>) -> Self {
        self.marks.insert(name.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// A child slot in an element tree: either a nested element or a text run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ElementChild {
    Element(Arc<ElementNode>),
    Text(TextLeaf),
}

impl ElementChild {
    pub fn element(node: ElementNode) -> Self {
        ElementChild::Element(Arc::new(node))
    }

    pub fn text(leaf: TextLeaf) -> Self {
        ElementChild::Text(leaf)
    }

    pub fn as_element(&self) -> Option<&ElementNode> {
        match self {
            ElementChild::Element(node) => Some(node),
            ElementChild::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&TextLeaf> {
        match self {
            ElementChild::Text(leaf) => Some(leaf),
            ElementChild::Element(_) => None,
        }
    }
}

/// A typed node within a block's internal content tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementNode {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub props: BTreeMap<String, PropValue>,
    /// Root marker; only meaningful on the top-level elements of a block.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_type: Option<NodeKind>,
    pub children: Vec<ElementChild>,
}

impl ElementNode {
    /// New element holding a single empty text leaf.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: kind.into(),
            props: BTreeMap::new(),
            node_type: None,
            children: vec![ElementChild::Text(TextLeaf::empty())],
        }
    }

    /// New root element carrying its `node_type` marker.
    pub fn root(kind: impl Into<String>, node_type: NodeKind) -> Self {
        Self {
            node_type: Some(node_type),
            ..Self::new(kind)
        }
    }

    pub fn with_children(mut self, children: Vec<ElementChild>) -> Self {
        self.children = children;
        self
    }

    pub fn with_prop(mut self, name: impl Into<String>, value: impl Into<PropValue>) -> Self {
        self.props.insert(name.into(), value.into());
        self
    }

    pub fn is_void(&self) -> bool {
        matches!(
            self.node_type,
            Some(NodeKind::Void) | Some(NodeKind::InlineVoid)
        )
    }

    /// True when the node holds nothing but empty text leaves.
    pub fn is_blank(&self) -> bool {
        self.children.iter().all(|child| match child {
            ElementChild::Text(leaf) => leaf.is_empty(),
            ElementChild::Element(node) => node.is_blank(),
        })
    }

    /// Concatenated text of every leaf under this node.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        collect_text(&self.children, &mut out);
        out
    }
}

fn collect_text(children: &[ElementChild], out: &mut String) {
    for child in children {
        match child {
            ElementChild::Text(leaf) => out.push_str(&leaf.text),
            ElementChild::Element(node) => collect_text(&node.children, out),
        }
    }
}

/// Location of a node within a block's element tree: child indices from the
/// block value array downward.
///
/// Paths are only valid against the snapshot they were computed from. Any
/// mutation invalidates previously computed paths for affected subtrees;
/// callers re-resolve by node id instead of caching paths across mutations.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Path(pub Vec<usize>);

impl Path {
    pub fn root() -> Self {
        Path(Vec::new())
    }

    pub fn new(indices: impl Into<Vec<usize>>) -> Self {
        Path(indices.into())
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn parent(&self) -> Option<Path> {
        let mut indices = self.0.clone();
        indices.pop()?;
        Some(Path(indices))
    }

    pub fn child(&self, index: usize) -> Path {
        let mut indices = self.0.clone();
        indices.push(index);
        Path(indices)
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }
}

impl From<Vec<usize>> for Path {
    fn from(indices: Vec<usize>) -> Self {
        Path(indices)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "(root)");
        }
        let joined = self
            .0
            .iter()
            .map(|ix| ix.to_string())
            .collect::<Vec<_>>()
            .join(".");
        write!(f, "{joined}")
    }
}

/// Resolve the element at `path`, if any. Paths running through a text leaf
/// resolve to nothing; leaves have no children to address.
pub fn node_at<'a>(value: &'a [Arc<ElementNode>], path: &Path) -> Option<&'a ElementNode> {
    let (first, rest) = path.0.split_first()?;
    let mut node: &ElementNode = value.get(*first)?;
    for &ix in rest {
        node = match node.children.get(ix)? {
            ElementChild::Element(inner) => inner,
            ElementChild::Text(_) => return None,
        };
    }
    Some(node)
}

/// Find the path of the element with `id`, re-deriving it from the current
/// tree rather than trusting any cached location.
pub fn path_of(value: &[Arc<ElementNode>], id: Uuid) -> Option<Path> {
    fn walk(node: &ElementNode, id: Uuid, prefix: &mut Vec<usize>) -> Option<Path> {
        if node.id == id {
            return Some(Path(prefix.clone()));
        }
        for (ix, child) in node.children.iter().enumerate() {
            if let ElementChild::Element(inner) = child {
                prefix.push(ix);
                if let Some(found) = walk(inner, id, prefix) {
                    return Some(found);
                }
                prefix.pop();
            }
        }
        None
    }

    let mut prefix = Vec::new();
    for (ix, root) in value.iter().enumerate() {
        prefix.push(ix);
        if let Some(found) = walk(root, id, &mut prefix) {
            return Some(found);
        }
        prefix.pop();
    }
    None
}

/// Insert `child` at `index` under the node at `parent`.
///
/// Pure: returns a new tree sharing every untouched subtree with the input.
/// The empty path addresses the block value array itself, which only accepts
/// elements (text runs never sit at the top level).
pub fn insert_child(
    value: &[Arc<ElementNode>],
    parent: &Path,
    index: usize,
    child: ElementChild,
) -> Result<Vec<Arc<ElementNode>>, EngineError> {
    if parent.is_root() {
        let ElementChild::Element(node) = child else {
            return Err(EngineError::invariant(
                "text runs cannot sit at the top level of a block",
            ));
        };
        let mut out = value.to_vec();
        let index = index.min(out.len());
        out.insert(index, node);
        return Ok(out);
    }
    map_node(value, parent, |node| {
        if node.is_void() {
            return Err(EngineError::invariant(
                "void elements hold a single placeholder leaf and accept no children",
            ));
        }
        let mut node = node.clone();
        let index = index.min(node.children.len());
        node.children.insert(index, child);
        Ok(node)
    })
}

/// Remove the child at `index` under the node at `parent`.
///
/// Removing the last child of a required-nonempty node fails with
/// `InvariantViolation`; the caller either normalizes or removes the parent
/// as part of a composite operation.
pub fn remove_child(
    value: &[Arc<ElementNode>],
    parent: &Path,
    index: usize,
) -> Result<Vec<Arc<ElementNode>>, EngineError> {
    if parent.is_root() {
        if index >= value.len() {
            return Err(EngineError::PathNotFound {
                path: parent.child(index),
            });
        }
        if value.len() == 1 {
            return Err(EngineError::invariant(
                "a block keeps at least one root element",
            ));
        }
        let mut out = value.to_vec();
        out.remove(index);
        return Ok(out);
    }
    let child_path = parent.child(index);
    map_node(value, parent, |node| {
        if index >= node.children.len() {
            return Err(EngineError::PathNotFound { path: child_path });
        }
        if node.children.len() == 1 {
            return Err(EngineError::invariant(
                "removing the last child would leave a required-nonempty node empty",
            ));
        }
        let mut node = node.clone();
        node.children.remove(index);
        Ok(node)
    })
}

/// Shallow-merge `props` into the node at `path`.
pub fn set_props(
    value: &[Arc<ElementNode>],
    path: &Path,
    props: &BTreeMap<String, PropValue>,
) -> Result<Vec<Arc<ElementNode>>, EngineError> {
    if path.is_root() {
        return Err(EngineError::PathNotFound { path: path.clone() });
    }
    map_node(value, path, |node| {
        let mut node = node.clone();
        for (name, prop) in props {
            node.props.insert(name.clone(), prop.clone());
        }
        Ok(node)
    })
}

/// Merge the sibling at `index + 1` into the sibling at `index` under
/// `parent`.
///
/// Matching elements concatenate children and keep the earlier node's id and
/// props; matching text leaves (identical mark sets) concatenate text.
pub fn merge_siblings(
    value: &[Arc<ElementNode>],
    parent: &Path,
    index: usize,
) -> Result<Vec<Arc<ElementNode>>, EngineError> {
    if parent.is_root() {
        if index + 1 >= value.len() {
            return Err(EngineError::PathNotFound {
                path: parent.child(index + 1),
            });
        }
        let merged = merge_elements(&value[index], &value[index + 1])?;
        let mut out = value.to_vec();
        out[index] = Arc::new(merged);
        out.remove(index + 1);
        return Ok(out);
    }
    let missing = parent.child(index + 1);
    map_node(value, parent, |node| {
        if index + 1 >= node.children.len() {
            return Err(EngineError::PathNotFound { path: missing });
        }
        let merged = merge_children(&node.children[index], &node.children[index + 1])?;
        let mut node = node.clone();
        node.children[index] = merged;
        node.children.remove(index + 1);
        Ok(node)
    })
}

fn merge_children(
    earlier: &ElementChild,
    later: &ElementChild,
) -> Result<ElementChild, EngineError> {
    match (earlier, later) {
        (ElementChild::Element(a), ElementChild::Element(b)) => {
            Ok(ElementChild::element(merge_elements(a, b)?))
        }
        (ElementChild::Text(a), ElementChild::Text(b)) => {
            if a.marks != b.marks {
                return Err(EngineError::invariant(
                    "text runs with different mark sets cannot merge",
                ));
            }
            let mut leaf = a.clone();
            leaf.text.push_str(&b.text);
            Ok(ElementChild::Text(leaf))
        }
        _ => Err(EngineError::invariant(
            "only siblings of matching type can merge",
        )),
    }
}

fn merge_elements(earlier: &ElementNode, later: &ElementNode) -> Result<ElementNode, EngineError> {
    if earlier.kind != later.kind {
        return Err(EngineError::invariant(format!(
            "cannot merge `{}` into `{}`",
            later.kind, earlier.kind
        )));
    }
    let mut merged = earlier.clone();
    merged.children.extend(later.children.iter().cloned());
    Ok(merged)
}

/// Deep copy assigning fresh ids to every element, leaving content (text,
/// marks, props) identical. Used by block duplication to avoid id collisions.
pub fn deep_copy_with_fresh_ids(value: &[Arc<ElementNode>]) -> Vec<Arc<ElementNode>> {
    value
        .iter()
        .map(|root| Arc::new(fresh_copy(root)))
        .collect()
}

fn fresh_copy(node: &ElementNode) -> ElementNode {
    ElementNode {
        id: Uuid::new_v4(),
        kind: node.kind.clone(),
        props: node.props.clone(),
        node_type: node.node_type,
        children: node
            .children
            .iter()
            .map(|child| match child {
                ElementChild::Element(inner) => ElementChild::element(fresh_copy(inner)),
                ElementChild::Text(leaf) => ElementChild::Text(leaf.clone()),
            })
            .collect(),
    }
}

/// Every element id in the tree, in traversal order.
pub fn collect_ids(value: &[Arc<ElementNode>], out: &mut Vec<Uuid>) {
    fn walk(node: &ElementNode, out: &mut Vec<Uuid>) {
        out.push(node.id);
        for child in &node.children {
            if let ElementChild::Element(inner) = child {
                walk(inner, out);
            }
        }
    }
    for root in value {
        walk(root, out);
    }
}

/// Every text leaf in the tree, in traversal order. Toggle conversions use
/// this to re-wrap inline content into another block type's root shape.
pub fn collect_leaves(value: &[Arc<ElementNode>]) -> Vec<TextLeaf> {
    fn walk(children: &[ElementChild], out: &mut Vec<TextLeaf>) {
        for child in children {
            match child {
                ElementChild::Text(leaf) => out.push(leaf.clone()),
                ElementChild::Element(inner) => walk(&inner.children, out),
            }
        }
    }
    let mut out = Vec::new();
    for root in value {
        walk(&root.children, &mut out);
    }
    out
}

/// Concatenated text of every leaf in the block value.
pub fn plain_text(value: &[Arc<ElementNode>]) -> String {
    let mut out = String::new();
    for root in value {
        collect_text(&root.children, &mut out);
    }
    out
}

/// Rebuild the spine from the root down to `path`, applying `f` to the
/// addressed node. Untouched siblings keep their `Arc`s, so readers holding
/// the previous tree never observe a torn state.
fn map_node(
    value: &[Arc<ElementNode>],
    path: &Path,
    f: impl FnOnce(&ElementNode) -> Result<ElementNode, EngineError>,
) -> Result<Vec<Arc<ElementNode>>, EngineError> {
    let Some((&first, rest)) = path.0.split_first() else {
        return Err(EngineError::PathNotFound { path: path.clone() });
    };
    let root = value.get(first).ok_or_else(|| EngineError::PathNotFound {
        path: path.clone(),
    })?;
    let new_root = map_node_inner(root, rest, path, f)?;
    let mut out = value.to_vec();
    out[first] = Arc::new(new_root);
    Ok(out)
}

fn map_node_inner(
    node: &ElementNode,
    rest: &[usize],
    full: &Path,
    f: impl FnOnce(&ElementNode) -> Result<ElementNode, EngineError>,
) -> Result<ElementNode, EngineError> {
    match rest.split_first() {
        None => f(node),
        Some((&ix, tail)) => {
            let child = node
                .children
                .get(ix)
                .ok_or_else(|| EngineError::PathNotFound { path: full.clone() })?;
            let ElementChild::Element(inner) = child else {
                return Err(EngineError::PathNotFound { path: full.clone() });
            };
            let new_inner = map_node_inner(inner, tail, full, f)?;
            let mut node = node.clone();
            node.children[ix] = ElementChild::element(new_inner);
            Ok(node)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn paragraph(text: &str) -> Vec<Arc<ElementNode>> {
        vec![Arc::new(
            ElementNode::root("paragraph", NodeKind::Block)
                .with_children(vec![ElementChild::Text(TextLeaf::new(text))]),
        )]
    }

    // ============ Path resolution tests ============

    #[test]
    fn test_node_at_root_element() {
        let value = paragraph("hello");
        let node = node_at(&value, &Path::new(vec![0])).unwrap();
        assert_eq!(node.kind, "paragraph");
    }

    #[test]
    fn test_node_at_missing_index() {
        let value = paragraph("hello");
        assert!(node_at(&value, &Path::new(vec![3])).is_none());
    }

    #[test]
    fn test_node_at_through_text_leaf_is_none() {
        let value = paragraph("hello");
        // children[0] is a text leaf; descending through it resolves nothing
        assert!(node_at(&value, &Path::new(vec![0, 0, 0])).is_none());
    }

    #[test]
    fn test_path_of_rederives_location() {
        let inner = ElementNode::new("bulleted-list-item");
        let inner_id = inner.id;
        let value = vec![Arc::new(
            ElementNode::root("bulleted-list", NodeKind::Block)
                .with_children(vec![ElementChild::element(inner)]),
        )];

        assert_eq!(path_of(&value, inner_id), Some(Path::new(vec![0, 0])));
        assert_eq!(path_of(&value, Uuid::new_v4()), None);
    }

    // ============ Insert primitive tests ============

    #[test]
    fn test_insert_child_shares_untouched_roots() {
        let mut value = paragraph("one");
        value.push(Arc::new(
            ElementNode::root("paragraph", NodeKind::Block)
                .with_children(vec![ElementChild::Text(TextLeaf::new("two"))]),
        ));

        let out = insert_child(
            &value,
            &Path::new(vec![0]),
            1,
            ElementChild::Text(TextLeaf::new("!")),
        )
        .unwrap();

        // The untouched second root is the same allocation, not a copy.
        assert!(Arc::ptr_eq(&value[1], &out[1]));
        assert_eq!(out[0].children.len(), 2);
        // Input tree is unchanged.
        assert_eq!(value[0].children.len(), 1);
    }

    #[test]
    fn test_insert_at_root_rejects_text() {
        let value = paragraph("x");
        let err = insert_child(
            &value,
            &Path::root(),
            0,
            ElementChild::Text(TextLeaf::new("loose")),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::InvariantViolation { .. }));
    }

    #[test]
    fn test_insert_clamps_out_of_range_index() {
        let value = paragraph("x");
        let out = insert_child(
            &value,
            &Path::new(vec![0]),
            99,
            ElementChild::Text(TextLeaf::new("tail")),
        )
        .unwrap();
        assert_eq!(out[0].children.len(), 2);
        assert_eq!(out[0].children[1].as_text().unwrap().text, "tail");
    }

    #[test]
    fn test_insert_under_missing_ancestor_fails() {
        let value = paragraph("x");
        let err = insert_child(
            &value,
            &Path::new(vec![4, 1]),
            0,
            ElementChild::Text(TextLeaf::empty()),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::PathNotFound { .. }));
    }

    #[test]
    fn test_insert_into_void_fails() {
        let value = vec![Arc::new(ElementNode::root("divider", NodeKind::Void))];
        let err = insert_child(
            &value,
            &Path::new(vec![0]),
            0,
            ElementChild::Text(TextLeaf::new("no")),
        )
        .unwrap_err();
        assert!(matches!(err, EngineError::InvariantViolation { .. }));
    }

    // ============ Remove primitive tests ============

    #[test]
    fn test_remove_child() {
        let value = vec![Arc::new(
            ElementNode::root("paragraph", NodeKind::Block).with_children(vec![
                ElementChild::Text(TextLeaf::new("a")),
                ElementChild::Text(TextLeaf::new("b")),
            ]),
        )];
        let out = remove_child(&value, &Path::new(vec![0]), 0).unwrap();
        assert_eq!(out[0].children.len(), 1);
        assert_eq!(out[0].children[0].as_text().unwrap().text, "b");
    }

    #[test]
    fn test_remove_last_child_fails() {
        let value = paragraph("only");
        let err = remove_child(&value, &Path::new(vec![0]), 0).unwrap_err();
        assert!(matches!(err, EngineError::InvariantViolation { .. }));
    }

    #[test]
    fn test_remove_last_root_fails() {
        let value = paragraph("only");
        let err = remove_child(&value, &Path::root(), 0).unwrap_err();
        assert!(matches!(err, EngineError::InvariantViolation { .. }));
    }

    #[test]
    fn test_remove_missing_index_fails() {
        let value = paragraph("x");
        let err = remove_child(&value, &Path::new(vec![0]), 7).unwrap_err();
        assert!(matches!(err, EngineError::PathNotFound { .. }));
    }

    // ============ Set props tests ============

    #[test]
    fn test_set_props_shallow_merges() {
        let value = vec![Arc::new(
            ElementNode::root("code", NodeKind::Block).with_prop("language", "rust"),
        )];
        let mut patch = BTreeMap::new();
        patch.insert("theme".to_string(), PropValue::from("dark"));

        let out = set_props(&value, &Path::new(vec![0]), &patch).unwrap();

        assert_eq!(out[0].props.get("language"), Some(&PropValue::from("rust")));
        assert_eq!(out[0].props.get("theme"), Some(&PropValue::from("dark")));
        // Original untouched
        assert!(value[0].props.get("theme").is_none());
    }

    #[test]
    fn test_set_props_on_root_path_fails() {
        let value = paragraph("x");
        let err = set_props(&value, &Path::root(), &BTreeMap::new()).unwrap_err();
        assert!(matches!(err, EngineError::PathNotFound { .. }));
    }

    // ============ Merge primitive tests ============

    #[test]
    fn test_merge_sibling_elements_keeps_earlier_id() {
        let a = ElementNode::new("bulleted-list-item");
        let a_id = a.id;
        let b = ElementNode::new("bulleted-list-item");
        let value = vec![Arc::new(
            ElementNode::root("bulleted-list", NodeKind::Block).with_children(vec![
                ElementChild::element(a),
                ElementChild::element(b),
            ]),
        )];

        let out = merge_siblings(&value, &Path::new(vec![0]), 0).unwrap();

        assert_eq!(out[0].children.len(), 1);
        let merged = out[0].children[0].as_element().unwrap();
        assert_eq!(merged.id, a_id);
        assert_eq!(merged.children.len(), 2);
    }

    #[test]
    fn test_merge_mismatched_kinds_fails() {
        let value = vec![Arc::new(
            ElementNode::root("accordion-list", NodeKind::Block).with_children(vec![
                ElementChild::element(ElementNode::new("accordion-list-item")),
                ElementChild::element(ElementNode::new("paragraph")),
            ]),
        )];
        let err = merge_siblings(&value, &Path::new(vec![0]), 0).unwrap_err();
        assert!(matches!(err, EngineError::InvariantViolation { .. }));
    }

    #[test]
    fn test_merge_text_leaves_with_same_marks() {
        let value = vec![Arc::new(
            ElementNode::root("paragraph", NodeKind::Block).with_children(vec![
                ElementChild::Text(TextLeaf::new("bo").with_mark("bold", true)),
                ElementChild::Text(TextLeaf::new("ld").with_mark("bold", true)),
            ]),
        )];
        let out = merge_siblings(&value, &Path::new(vec![0]), 0).unwrap();
        let leaf = out[0].children[0].as_text().unwrap();
        assert_eq!(leaf.text, "bold");
        assert_eq!(leaf.marks.get("bold"), Some(&PropValue::Bool(true)));
    }

    #[test]
    fn test_merge_text_leaves_with_different_marks_fails() {
        let value = vec![Arc::new(
            ElementNode::root("paragraph", NodeKind::Block).with_children(vec![
                ElementChild::Text(TextLeaf::new("a").with_mark("bold", true)),
                ElementChild::Text(TextLeaf::new("b")),
            ]),
        )];
        let err = merge_siblings(&value, &Path::new(vec![0]), 0).unwrap_err();
        assert!(matches!(err, EngineError::InvariantViolation { .. }));
    }

    #[test]
    fn test_merge_missing_sibling_fails() {
        let value = paragraph("x");
        let err = merge_siblings(&value, &Path::root(), 0).unwrap_err();
        assert!(matches!(err, EngineError::PathNotFound { .. }));
    }

    // ============ Fresh copy tests ============

    #[test]
    fn test_deep_copy_assigns_fresh_ids_everywhere() {
        let value = vec![Arc::new(
            ElementNode::root("accordion-list", NodeKind::Block).with_children(vec![
                ElementChild::element(ElementNode::new("accordion-list-item").with_children(
                    vec![ElementChild::Text(TextLeaf::new("body"))],
                )),
            ]),
        )];

        let copy = deep_copy_with_fresh_ids(&value);

        let mut original_ids = Vec::new();
        let mut copied_ids = Vec::new();
        collect_ids(&value, &mut original_ids);
        collect_ids(&copy, &mut copied_ids);

        assert_eq!(original_ids.len(), copied_ids.len());
        for id in &copied_ids {
            assert!(!original_ids.contains(id));
        }
        assert_eq!(plain_text(&value), plain_text(&copy));
    }

    // ============ Text extraction tests ============

    #[test]
    fn test_plain_text_walks_nested_elements() {
        let value = vec![Arc::new(
            ElementNode::root("blockquote", NodeKind::Block).with_children(vec![
                ElementChild::Text(TextLeaf::new("quoted ")),
                ElementChild::element(
                    ElementNode::new("link").with_children(vec![ElementChild::Text(
                        TextLeaf::new("text"),
                    )]),
                ),
            ]),
        )];
        assert_eq!(plain_text(&value), "quoted text");
    }

    #[test]
    fn test_collect_leaves_preserves_marks() {
        let value = vec![Arc::new(
            ElementNode::root("paragraph", NodeKind::Block).with_children(vec![
                ElementChild::Text(TextLeaf::new("plain ")),
                ElementChild::Text(TextLeaf::new("bold").with_mark("bold", true)),
            ]),
        )];
        let leaves = collect_leaves(&value);
        assert_eq!(leaves.len(), 2);
        assert!(leaves[1].marks.contains_key("bold"));
    }

    #[test]
    fn test_path_display() {
        assert_eq!(Path::new(vec![0, 2, 1]).to_string(), "0.2.1");
        assert_eq!(Path::root().to_string(), "(root)");
    }
}
