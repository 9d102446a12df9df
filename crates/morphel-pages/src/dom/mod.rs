//! Host tree abstraction.
//!
//! The reconciler, the stash bridge and the component shell only talk to
//! the tree through [`HostTree`]. A browser binding would implement it over
//! DOM nodes; [`MemoryTree`] implements it in memory and is what native
//! embedders and the tests use.
//!
//! Render roots are the shadow-root equivalent: a per-host container for
//! the host's rendered output, excluded from [`HostTree::children`] and from
//! [`HostTree::outer_markup`].

mod memory;
mod parser;

use core::fmt;
use core::hash::Hash;

use thiserror::Error;

use crate::prop::Prop;

pub use memory::{MemoryNode, MemoryTree};

/// Node categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
	Element,
	Text,
	Comment,
	/// A detached fragment or a render root.
	Fragment,
}

impl NodeKind {
	/// The numeric node type a browser reports.
	pub fn node_type(self) -> u8 {
		match self {
			Self::Element => 1,
			Self::Text => 3,
			Self::Comment => 8,
			Self::Fragment => 11,
		}
	}
}

/// How a host treats a named property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyKind {
	/// Native boolean property mirrored from a boolean attribute.
	Boolean,
	/// Native string property.
	Text,
	/// Native property that cannot be assigned.
	ReadOnly,
	/// Not native: any value may be stored.
	Custom,
}

impl PropertyKind {
	/// Returns `true` for properties the host defines itself.
	pub fn is_native(self) -> bool {
		!matches!(self, Self::Custom)
	}
}

/// Errors raised by host tree operations.
#[derive(Debug, Error)]
pub enum HostError {
	#[error("Property `{0}` is read-only")]
	ReadOnly(String),

	#[error("Property `{name}` expects a {expected} value, got {found}")]
	TypeMismatch {
		name: String,
		expected: &'static str,
		found: &'static str,
	},

	#[error("Node has no parent")]
	Detached,

	#[error("Reference node is not a child of the target parent")]
	NotAChild,

	#[error("Cannot insert a node into itself or one of its descendants")]
	HierarchyRequest,

	#[error("Operation requires an element node")]
	NotAnElement,

	#[error("Failed to parse markup at byte {offset}: {message}")]
	Parse { offset: usize, message: String },
}

/// Result type for host tree operations.
pub type HostResult<T> = Result<T, HostError>;

/// A mutable tree of element, text and comment nodes.
///
/// Node handles are cheap to clone and compare by identity.
pub trait HostTree {
	type Node: Clone + Eq + Hash + fmt::Debug;

	fn kind(&self, node: &Self::Node) -> NodeKind;

	/// Lowercase tag name of an element.
	fn tag(&self, node: &Self::Node) -> Option<String>;

	/// Child nodes in order. Render roots are not children.
	fn children(&self, node: &Self::Node) -> Vec<Self::Node>;

	fn parent(&self, node: &Self::Node) -> Option<Self::Node>;

	/// Attributes in source order.
	fn attributes(&self, node: &Self::Node) -> Vec<(String, String)>;

	fn get_attribute(&self, node: &Self::Node, name: &str) -> Option<String>;

	fn has_attribute(&self, node: &Self::Node, name: &str) -> bool {
		self.get_attribute(node, name).is_some()
	}

	fn set_attribute(&self, node: &Self::Node, name: &str, value: &str) -> HostResult<()>;

	/// Removes an attribute. Returns `true` if it was present.
	fn remove_attribute(&self, node: &Self::Node, name: &str) -> bool;

	/// Moves `child` under `parent`, before `reference` or at the end.
	///
	/// Inserting a fragment moves the fragment's children instead.
	fn insert_before(
		&self,
		parent: &Self::Node,
		child: &Self::Node,
		reference: Option<&Self::Node>,
	) -> HostResult<()>;

	fn append_child(&self, parent: &Self::Node, child: &Self::Node) -> HostResult<()> {
		self.insert_before(parent, child, None)
	}

	fn remove_child(&self, parent: &Self::Node, child: &Self::Node) -> HostResult<()>;

	/// Puts `replacement` where `node` is and detaches `node`.
	fn replace_with(&self, node: &Self::Node, replacement: &Self::Node) -> HostResult<()>;

	/// Concatenated text of the subtree (the node's own text for text and
	/// comment nodes).
	fn text_content(&self, node: &Self::Node) -> String;

	/// Serialized markup of the node. Render roots are not serialized.
	fn outer_markup(&self, node: &Self::Node) -> String;

	/// Serialized markup of the node's children.
	fn inner_markup(&self, node: &Self::Node) -> String {
		self.children(node)
			.iter()
			.map(|child| self.outer_markup(child))
			.collect()
	}

	/// Parses markup into a detached fragment.
	fn parse_fragment(&self, markup: &str) -> HostResult<Self::Node>;

	/// Returns the host's render root, attaching one on first use.
	fn render_root(&self, host: &Self::Node) -> Self::Node;

	/// Returns the host's render root if one is attached.
	fn existing_render_root(&self, host: &Self::Node) -> Option<Self::Node>;

	fn property_kind(&self, node: &Self::Node, name: &str) -> PropertyKind;

	fn set_property(&self, node: &Self::Node, name: &str, value: Prop) -> HostResult<()>;

	fn property(&self, node: &Self::Node, name: &str) -> Option<Prop>;

	/// Properties stored on the node, native ones included once assigned.
	fn properties(&self, node: &Self::Node) -> Vec<(String, Prop)>;

	/// Element descendants in document order, without entering render roots.
	fn descendants(&self, node: &Self::Node) -> Vec<Self::Node> {
		let mut found = Vec::new();
		let mut stack: Vec<Self::Node> = self.children(node).into_iter().rev().collect();
		while let Some(current) = stack.pop() {
			if self.kind(&current) == NodeKind::Element {
				stack.extend(self.children(&current).into_iter().rev());
				found.push(current);
			}
		}
		found
	}

	/// First element descendant whose attribute `name` equals `value`.
	fn find_by_attribute(&self, scope: &Self::Node, name: &str, value: &str) -> Option<Self::Node> {
		self.descendants(scope)
			.into_iter()
			.find(|node| self.get_attribute(node, name).as_deref() == Some(value))
	}

	/// Returns `true` if `node` is `ancestor` or lies below it.
	fn contains(&self, ancestor: &Self::Node, node: &Self::Node) -> bool {
		let mut current = Some(node.clone());
		while let Some(candidate) = current {
			if &candidate == ancestor {
				return true;
			}
			current = self.parent(&candidate);
		}
		false
	}
}

/// Native properties of elements.
pub(crate) fn native_property(name: &str) -> PropertyKind {
	match name {
		"hidden" | "disabled" | "checked" | "selected" | "open" | "multiple" | "readonly"
		| "required" => PropertyKind::Boolean,
		"id" | "title" | "value" | "lang" | "dir" => PropertyKind::Text,
		"tagName" | "nodeName" | "nodeType" => PropertyKind::ReadOnly,
		_ => PropertyKind::Custom,
	}
}

/// Escapes text content for serialization.
pub(crate) fn escape_text(text: &str, out: &mut String) {
	for ch in text.chars() {
		match ch {
			'&' => out.push_str("&amp;"),
			'<' => out.push_str("&lt;"),
			'>' => out.push_str("&gt;"),
			_ => out.push(ch),
		}
	}
}

/// Escapes an attribute value for serialization inside double quotes.
pub(crate) fn escape_attribute(value: &str, out: &mut String) {
	for ch in value.chars() {
		match ch {
			'&' => out.push_str("&amp;"),
			'"' => out.push_str("&quot;"),
			'<' => out.push_str("&lt;"),
			'>' => out.push_str("&gt;"),
			_ => out.push(ch),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case("hidden", PropertyKind::Boolean)]
	#[case("required", PropertyKind::Boolean)]
	#[case("value", PropertyKind::Text)]
	#[case("tagName", PropertyKind::ReadOnly)]
	#[case("onclick", PropertyKind::Custom)]
	#[case("item", PropertyKind::Custom)]
	fn test_native_property_table(#[case] name: &str, #[case] expected: PropertyKind) {
		assert_eq!(native_property(name), expected);
	}

	#[rstest]
	fn test_escaping() {
		let mut text = String::new();
		escape_text("a < b & \"c\"", &mut text);
		assert_eq!(text, "a &lt; b &amp; \"c\"");

		let mut attribute = String::new();
		escape_attribute("say \"hi\" & go", &mut attribute);
		assert_eq!(attribute, "say &quot;hi&quot; &amp; go");
	}
}
