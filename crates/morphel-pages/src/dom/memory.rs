//! In-memory host tree.
//!
//! Nodes are reference-counted and compare by identity. Parents are held
//! weakly, so dropping the last handle to a detached subtree frees it.

use core::fmt;
use core::hash::{Hash, Hasher};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::{Rc, Weak};

use super::parser::{self, is_raw_text, is_void};
use super::{
	HostError, HostResult, HostTree, NodeKind, PropertyKind, escape_attribute, escape_text,
	native_property,
};
use crate::callback::Event;
use crate::prop::{Prop, format_number};

struct NodeData {
	kind: NodeKind,
	/// Lowercase tag for elements, empty otherwise.
	tag: String,
	/// Content of text and comment nodes.
	text: String,
	attributes: Vec<(String, String)>,
	properties: BTreeMap<String, Prop>,
	children: Vec<MemoryNode>,
	parent: Weak<RefCell<NodeData>>,
	render_root: Option<MemoryNode>,
	/// Set on render roots only.
	host: Weak<RefCell<NodeData>>,
}

/// Handle to a node of a [`MemoryTree`].
#[derive(Clone)]
pub struct MemoryNode(Rc<RefCell<NodeData>>);

impl MemoryNode {
	fn new(kind: NodeKind, tag: &str, text: &str) -> Self {
		Self(Rc::new(RefCell::new(NodeData {
			kind,
			tag: tag.to_ascii_lowercase(),
			text: text.to_string(),
			attributes: Vec::new(),
			properties: BTreeMap::new(),
			children: Vec::new(),
			parent: Weak::new(),
			render_root: None,
			host: Weak::new(),
		})))
	}

	pub(super) fn element(tag: &str) -> Self {
		Self::new(NodeKind::Element, tag, "")
	}

	pub(super) fn text(text: &str) -> Self {
		Self::new(NodeKind::Text, "", text)
	}

	pub(super) fn comment(text: &str) -> Self {
		Self::new(NodeKind::Comment, "", text)
	}

	pub(super) fn fragment() -> Self {
		Self::new(NodeKind::Fragment, "", "")
	}

	pub(super) fn kind(&self) -> NodeKind {
		self.0.borrow().kind
	}

	pub(super) fn tag_name(&self) -> String {
		self.0.borrow().tag.clone()
	}

	fn parent_node(&self) -> Option<MemoryNode> {
		self.0.borrow().parent.upgrade().map(MemoryNode)
	}

	fn host_node(&self) -> Option<MemoryNode> {
		self.0.borrow().host.upgrade().map(MemoryNode)
	}

	fn index_in(&self, parent: &MemoryNode) -> Option<usize> {
		parent.0.borrow().children.iter().position(|child| child == self)
	}

	pub(super) fn last_child(&self) -> Option<MemoryNode> {
		self.0.borrow().children.last().cloned()
	}

	/// Appends `child` without any checks. Used while building parsed trees.
	pub(super) fn push_child(&self, child: &MemoryNode) {
		child.0.borrow_mut().parent = Rc::downgrade(&self.0);
		self.0.borrow_mut().children.push(child.clone());
	}

	pub(super) fn push_text(&self, text: &str) {
		self.0.borrow_mut().text.push_str(text);
	}

	/// Adds an attribute unless one with the same name exists.
	pub(super) fn push_attribute(&self, name: String, value: String) {
		let mut data = self.0.borrow_mut();
		if !data.attributes.iter().any(|(existing, _)| *existing == name) {
			data.attributes.push((name, value));
		}
	}

	fn detach(&self) {
		if let Some(parent) = self.parent_node() {
			parent.0.borrow_mut().children.retain(|child| child != self);
		}
		self.0.borrow_mut().parent = Weak::new();
	}

	fn attach(&self, parent: &MemoryNode, index: usize) {
		self.0.borrow_mut().parent = Rc::downgrade(&parent.0);
		let mut data = parent.0.borrow_mut();
		let index = index.min(data.children.len());
		data.children.insert(index, self.clone());
	}
}

impl PartialEq for MemoryNode {
	fn eq(&self, other: &Self) -> bool {
		Rc::ptr_eq(&self.0, &other.0)
	}
}

impl Eq for MemoryNode {}

impl Hash for MemoryNode {
	fn hash<H: Hasher>(&self, state: &mut H) {
		(Rc::as_ptr(&self.0) as usize).hash(state);
	}
}

impl fmt::Debug for MemoryNode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let Ok(data) = self.0.try_borrow() else {
			return f.write_str("MemoryNode(<borrowed>)");
		};
		match data.kind {
			NodeKind::Element => write!(f, "<{}>", data.tag),
			NodeKind::Text => write!(f, "#text {:?}", data.text),
			NodeKind::Comment => write!(f, "#comment {:?}", data.text),
			NodeKind::Fragment => write!(f, "#fragment[{}]", data.children.len()),
		}
	}
}

/// A host tree held entirely in memory.
///
/// # Example
///
/// ```
/// use morphel_pages::dom::{HostTree, MemoryTree};
///
/// let tree = MemoryTree::new();
/// let fragment = tree.parse_fragment("<p class=note>a &amp; b<br></p>").unwrap();
/// tree.append_child(&tree.document(), &fragment).unwrap();
///
/// assert_eq!(tree.inner_markup(&tree.document()), r#"<p class="note">a &amp; b<br></p>"#);
/// ```
#[derive(Debug, Clone)]
pub struct MemoryTree {
	document: MemoryNode,
}

impl MemoryTree {
	/// Creates a tree with an empty document.
	pub fn new() -> Self {
		Self {
			document: MemoryNode::fragment(),
		}
	}

	/// The document node. Nodes below it are connected.
	pub fn document(&self) -> MemoryNode {
		self.document.clone()
	}

	pub fn create_element(&self, tag: &str) -> MemoryNode {
		MemoryNode::element(tag)
	}

	pub fn create_text(&self, text: &str) -> MemoryNode {
		MemoryNode::text(text)
	}

	pub fn create_comment(&self, text: &str) -> MemoryNode {
		MemoryNode::comment(text)
	}

	/// Returns `true` if `node` is reachable from the document, through
	/// render roots included.
	pub fn is_connected(&self, node: &MemoryNode) -> bool {
		let mut current = node.clone();
		loop {
			if current == self.document {
				return true;
			}
			current = match current.parent_node().or_else(|| current.host_node()) {
				Some(next) => next,
				None => return false,
			};
		}
	}

	/// First element below `scope` with the given tag.
	pub fn find_by_tag(&self, scope: &MemoryNode, tag: &str) -> Option<MemoryNode> {
		let tag = tag.to_ascii_lowercase();
		self.descendants(scope)
			.into_iter()
			.find(|node| node.0.borrow().tag == tag)
	}

	/// Serialized content of the host's render root, empty if it has none.
	pub fn rendered_markup(&self, host: &MemoryNode) -> String {
		self.existing_render_root(host)
			.map(|root| self.inner_markup(&root))
			.unwrap_or_default()
	}

	/// Delivers `event` to the node's `on<event>` callback property.
	///
	/// Returns `true` if a callback ran.
	pub fn dispatch(&self, node: &MemoryNode, event: &str) -> bool {
		let handler = self.property(node, &format!("on{event}"));
		match handler {
			Some(Prop::Callback(callback)) => {
				tracing::debug!(target: "morphel::render", node = ?node, event, "dispatch");
				callback.call(&Event::new(event));
				true
			}
			_ => false,
		}
	}

	fn next_sibling(&self, node: &MemoryNode) -> Option<MemoryNode> {
		let parent = node.parent_node()?;
		let index = node.index_in(&parent)?;
		let sibling = parent.0.borrow().children.get(index + 1).cloned();
		sibling
	}

	fn serialize(&self, node: &MemoryNode, raw_text: bool, out: &mut String) {
		let data = node.0.borrow();
		match data.kind {
			NodeKind::Text if raw_text => out.push_str(&data.text),
			NodeKind::Text => escape_text(&data.text, out),
			NodeKind::Comment => {
				out.push_str("<!--");
				out.push_str(&data.text);
				out.push_str("-->");
			}
			NodeKind::Element => {
				out.push('<');
				out.push_str(&data.tag);
				for (name, value) in &data.attributes {
					out.push(' ');
					out.push_str(name);
					out.push_str("=\"");
					escape_attribute(value, out);
					out.push('"');
				}
				out.push('>');
				if is_void(&data.tag) {
					return;
				}
				let raw = is_raw_text(&data.tag);
				for child in &data.children {
					self.serialize(child, raw, out);
				}
				out.push_str("</");
				out.push_str(&data.tag);
				out.push('>');
			}
			NodeKind::Fragment => {
				for child in &data.children {
					self.serialize(child, false, out);
				}
			}
		}
	}

	fn collect_text(&self, node: &MemoryNode, out: &mut String) {
		let data = node.0.borrow();
		match data.kind {
			NodeKind::Text => out.push_str(&data.text),
			NodeKind::Comment => {}
			NodeKind::Element | NodeKind::Fragment => {
				for child in &data.children {
					self.collect_text(child, out);
				}
			}
		}
	}
}

impl Default for MemoryTree {
	fn default() -> Self {
		Self::new()
	}
}

impl HostTree for MemoryTree {
	type Node = MemoryNode;

	fn kind(&self, node: &MemoryNode) -> NodeKind {
		node.kind()
	}

	fn tag(&self, node: &MemoryNode) -> Option<String> {
		let data = node.0.borrow();
		(data.kind == NodeKind::Element).then(|| data.tag.clone())
	}

	fn children(&self, node: &MemoryNode) -> Vec<MemoryNode> {
		node.0.borrow().children.clone()
	}

	fn parent(&self, node: &MemoryNode) -> Option<MemoryNode> {
		node.parent_node()
	}

	fn attributes(&self, node: &MemoryNode) -> Vec<(String, String)> {
		node.0.borrow().attributes.clone()
	}

	fn get_attribute(&self, node: &MemoryNode, name: &str) -> Option<String> {
		node.0
			.borrow()
			.attributes
			.iter()
			.find(|(existing, _)| existing == name)
			.map(|(_, value)| value.clone())
	}

	fn set_attribute(&self, node: &MemoryNode, name: &str, value: &str) -> HostResult<()> {
		let mut data = node.0.borrow_mut();
		if data.kind != NodeKind::Element {
			return Err(HostError::NotAnElement);
		}
		match data.attributes.iter_mut().find(|(existing, _)| existing == name) {
			Some((_, existing)) => *existing = value.to_string(),
			None => data.attributes.push((name.to_string(), value.to_string())),
		}
		Ok(())
	}

	fn remove_attribute(&self, node: &MemoryNode, name: &str) -> bool {
		let mut data = node.0.borrow_mut();
		let before = data.attributes.len();
		data.attributes.retain(|(existing, _)| existing != name);
		data.attributes.len() != before
	}

	fn insert_before(
		&self,
		parent: &MemoryNode,
		child: &MemoryNode,
		reference: Option<&MemoryNode>,
	) -> HostResult<()> {
		if matches!(parent.kind(), NodeKind::Text | NodeKind::Comment) || self.contains(child, parent) {
			return Err(HostError::HierarchyRequest);
		}
		let reference = match reference {
			Some(node) if node == child => self.next_sibling(child),
			other => other.cloned(),
		};
		if let Some(node) = &reference
			&& node.parent_node().as_ref() != Some(parent)
		{
			return Err(HostError::NotAChild);
		}

		let moved = if child.kind() == NodeKind::Fragment {
			self.children(child)
		} else {
			vec![child.clone()]
		};
		for node in moved {
			node.detach();
			let index = match &reference {
				Some(reference) => reference.index_in(parent).ok_or(HostError::NotAChild)?,
				None => parent.0.borrow().children.len(),
			};
			node.attach(parent, index);
		}
		Ok(())
	}

	fn remove_child(&self, parent: &MemoryNode, child: &MemoryNode) -> HostResult<()> {
		if child.parent_node().as_ref() != Some(parent) {
			return Err(HostError::NotAChild);
		}
		child.detach();
		Ok(())
	}

	fn replace_with(&self, node: &MemoryNode, replacement: &MemoryNode) -> HostResult<()> {
		if node == replacement {
			return Ok(());
		}
		let parent = node.parent_node().ok_or(HostError::Detached)?;
		self.insert_before(&parent, replacement, Some(node))?;
		node.detach();
		Ok(())
	}

	fn text_content(&self, node: &MemoryNode) -> String {
		let mut out = String::new();
		match node.kind() {
			NodeKind::Comment => out.push_str(&node.0.borrow().text),
			_ => self.collect_text(node, &mut out),
		}
		out
	}

	fn outer_markup(&self, node: &MemoryNode) -> String {
		let mut out = String::new();
		let raw = node
			.parent_node()
			.is_some_and(|parent| is_raw_text(&parent.tag_name()));
		self.serialize(node, raw, &mut out);
		out
	}

	fn parse_fragment(&self, markup: &str) -> HostResult<MemoryNode> {
		parser::parse_fragment(markup)
	}

	fn render_root(&self, host: &MemoryNode) -> MemoryNode {
		if let Some(root) = self.existing_render_root(host) {
			return root;
		}
		let root = MemoryNode::fragment();
		root.0.borrow_mut().host = Rc::downgrade(&host.0);
		host.0.borrow_mut().render_root = Some(root.clone());
		root
	}

	fn existing_render_root(&self, host: &MemoryNode) -> Option<MemoryNode> {
		host.0.borrow().render_root.clone()
	}

	fn property_kind(&self, node: &MemoryNode, name: &str) -> PropertyKind {
		match node.kind() {
			NodeKind::Element => native_property(name),
			_ => PropertyKind::Custom,
		}
	}

	fn set_property(&self, node: &MemoryNode, name: &str, value: Prop) -> HostResult<()> {
		let value = match self.property_kind(node, name) {
			PropertyKind::ReadOnly => return Err(HostError::ReadOnly(name.to_string())),
			PropertyKind::Boolean => match value {
				Prop::Bool(_) => value,
				other => {
					return Err(HostError::TypeMismatch {
						name: name.to_string(),
						expected: "boolean",
						found: other.type_name(),
					});
				}
			},
			PropertyKind::Text => match value {
				Prop::Text(_) => value,
				Prop::Number(number) => Prop::Text(format_number(number)),
				other => {
					return Err(HostError::TypeMismatch {
						name: name.to_string(),
						expected: "string",
						found: other.type_name(),
					});
				}
			},
			PropertyKind::Custom => value,
		};
		node.0.borrow_mut().properties.insert(name.to_string(), value);
		Ok(())
	}

	fn property(&self, node: &MemoryNode, name: &str) -> Option<Prop> {
		let stored = node.0.borrow().properties.get(name).cloned();
		match self.property_kind(node, name) {
			PropertyKind::ReadOnly => Some(match name {
				"nodeType" => Prop::Number(f64::from(node.kind().node_type())),
				_ => Prop::Text(node.tag_name().to_ascii_uppercase()),
			}),
			PropertyKind::Boolean => {
				stored.or_else(|| Some(Prop::Bool(self.has_attribute(node, name))))
			}
			PropertyKind::Text => stored.or_else(|| {
				Some(Prop::Text(self.get_attribute(node, name).unwrap_or_default()))
			}),
			PropertyKind::Custom => stored,
		}
	}

	fn properties(&self, node: &MemoryNode) -> Vec<(String, Prop)> {
		node.0
			.borrow()
			.properties
			.iter()
			.map(|(name, value)| (name.clone(), value.clone()))
			.collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::callback::Callback;
	use rstest::{fixture, rstest};
	use std::cell::Cell;

	#[fixture]
	fn tree() -> MemoryTree {
		MemoryTree::new()
	}

	fn list(tree: &MemoryTree, markup: &str) -> MemoryNode {
		let fragment = tree.parse_fragment(markup).unwrap();
		let container = tree.create_element("ul");
		tree.append_child(&container, &fragment).unwrap();
		container
	}

	#[rstest]
	fn test_fragment_insertion_moves_children(tree: MemoryTree) {
		let container = list(&tree, "<li>a</li><li>b</li>");
		assert_eq!(tree.children(&container).len(), 2);
		assert_eq!(tree.inner_markup(&container), "<li>a</li><li>b</li>");
	}

	#[rstest]
	fn test_insert_before_self_is_noop(tree: MemoryTree) {
		let container = list(&tree, "<li>a</li><li>b</li>");
		let first = tree.children(&container)[0].clone();

		tree.insert_before(&container, &first, Some(&first)).unwrap();

		assert_eq!(tree.inner_markup(&container), "<li>a</li><li>b</li>");
	}

	#[rstest]
	fn test_insert_moves_existing_child(tree: MemoryTree) {
		let container = list(&tree, "<li>a</li><li>b</li><li>c</li>");
		let children = tree.children(&container);

		tree.insert_before(&container, &children[2], Some(&children[0])).unwrap();

		assert_eq!(tree.inner_markup(&container), "<li>c</li><li>a</li><li>b</li>");
	}

	#[rstest]
	fn test_replace_and_remove(tree: MemoryTree) {
		let container = list(&tree, "<li>a</li><li>b</li>");
		let children = tree.children(&container);
		let replacement = tree.create_text("x");

		tree.replace_with(&children[0], &replacement).unwrap();
		tree.remove_child(&container, &children[1]).unwrap();

		assert_eq!(tree.inner_markup(&container), "x");
		assert!(tree.parent(&children[0]).is_none());
		assert!(matches!(
			tree.remove_child(&container, &children[1]),
			Err(HostError::NotAChild)
		));
		assert!(matches!(
			tree.replace_with(&children[1], &replacement),
			Err(HostError::Detached)
		));
	}

	#[rstest]
	fn test_cannot_insert_ancestor(tree: MemoryTree) {
		let container = list(&tree, "<li>a</li>");
		let item = tree.children(&container)[0].clone();
		assert!(matches!(
			tree.append_child(&item, &container),
			Err(HostError::HierarchyRequest)
		));
	}

	#[rstest]
	fn test_render_root_is_not_serialized(tree: MemoryTree) {
		let host = tree.create_element("price-tag");
		tree.set_attribute(&host, "key", "main").unwrap();
		let root = tree.render_root(&host);
		let content = tree.parse_fragment("<span>$20.00</span>").unwrap();
		tree.append_child(&root, &content).unwrap();

		assert_eq!(tree.outer_markup(&host), r#"<price-tag key="main"></price-tag>"#);
		assert_eq!(tree.rendered_markup(&host), "<span>$20.00</span>");
		assert_eq!(tree.render_root(&host), root);
	}

	#[rstest]
	fn test_connectivity_through_render_roots(tree: MemoryTree) {
		let host = tree.create_element("x-card");
		tree.append_child(&tree.document(), &host).unwrap();
		let root = tree.render_root(&host);
		let inner = tree.create_element("p");
		tree.append_child(&root, &inner).unwrap();

		assert!(tree.is_connected(&inner));
		tree.remove_child(&tree.document(), &host).unwrap();
		assert!(!tree.is_connected(&inner));
	}

	#[rstest]
	fn test_native_properties(tree: MemoryTree) {
		let input = tree.create_element("input");
		tree.set_attribute(&input, "disabled", "").unwrap();
		tree.set_attribute(&input, "value", "a").unwrap();

		assert_eq!(tree.property(&input, "disabled"), Some(Prop::Bool(true)));
		assert_eq!(tree.property(&input, "value"), Some(Prop::Text("a".to_string())));
		assert_eq!(tree.property(&input, "tagName"), Some(Prop::Text("INPUT".to_string())));
		assert_eq!(tree.property(&input, "nodeType"), Some(Prop::Number(1.0)));

		tree.set_property(&input, "value", Prop::Number(3.0)).unwrap();
		assert_eq!(tree.property(&input, "value"), Some(Prop::Text("3".to_string())));

		assert!(matches!(
			tree.set_property(&input, "tagName", Prop::from("DIV")),
			Err(HostError::ReadOnly(_))
		));
		assert!(matches!(
			tree.set_property(&input, "checked", Prop::from("yes")),
			Err(HostError::TypeMismatch { expected: "boolean", .. })
		));
	}

	#[rstest]
	fn test_dispatch_calls_callback_property(tree: MemoryTree) {
		let button = tree.create_element("button");
		let clicks = Rc::new(Cell::new(0));
		let counter = clicks.clone();
		tree.set_property(
			&button,
			"onclick",
			Prop::Callback(Callback::new(move |_: &Event| counter.set(counter.get() + 1))),
		)
		.unwrap();

		assert!(tree.dispatch(&button, "click"));
		assert!(!tree.dispatch(&button, "input"));
		assert_eq!(clicks.get(), 1);
	}

	#[rstest]
	fn test_text_content_skips_comments(tree: MemoryTree) {
		let fragment = tree.parse_fragment("<p>a<!--note--><b>b</b></p>").unwrap();
		let paragraph = tree.children(&fragment)[0].clone();
		assert_eq!(tree.text_content(&paragraph), "ab");
		let comment = tree.children(&paragraph)[1].clone();
		assert_eq!(tree.text_content(&comment), "note");
	}
}
