//! Tree reconciler.
//!
//! [`Reconciler::morph`] makes the children (and attributes) of a live node
//! match those of a freshly parsed fragment while touching as little of the
//! live tree as possible. It walks both child lists with head and tail
//! cursors:
//!
//! 1. live list exhausted: insert the fragment child (or a live child with
//!    the same component key) before the live head;
//! 2. fragment list exhausted: remove the live head;
//! 3. heads have equal content: keep, advance both heads;
//! 4. tails have equal content: keep, retreat both tails;
//! 5. heads are elements with the same tag: recurse, advance both heads;
//! 6. otherwise replace the live head with the fragment head.
//!
//! Content is the text of text nodes, the serialized markup of elements and
//! the text of comments. The reconciler never renders components; it only
//! reports component hosts whose attributes changed.

use crate::dom::{HostResult, HostTree, NodeKind, PropertyKind};
use crate::prop::Prop;

/// Mutations performed by one reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MorphReport<N> {
	pub inserted: usize,
	pub removed: usize,
	pub replaced: usize,
	pub recursed: usize,
	pub attributes_set: usize,
	pub attributes_removed: usize,
	/// Component hosts whose attributes changed.
	pub touched: Vec<N>,
}

impl<N> Default for MorphReport<N> {
	fn default() -> Self {
		Self {
			inserted: 0,
			removed: 0,
			replaced: 0,
			recursed: 0,
			attributes_set: 0,
			attributes_removed: 0,
			touched: Vec::new(),
		}
	}
}

impl<N> MorphReport<N> {
	/// Number of structural operations (inserts, removals, replacements).
	pub fn structural_operations(&self) -> usize {
		self.inserted + self.removed + self.replaced
	}

	/// Number of mutations of any kind.
	pub fn mutations(&self) -> usize {
		self.structural_operations() + self.attributes_set + self.attributes_removed
	}
}

/// Content compared by the cursor rules. Different categories never match.
#[derive(Debug, PartialEq, Eq)]
enum Signature {
	Text(String),
	Element(String),
	Comment(String),
	Other,
}

/// Reconciles live nodes against parsed fragments.
pub struct Reconciler<'a, H: HostTree> {
	host: &'a H,
	is_component: &'a dyn Fn(&str) -> bool,
}

impl<'a, H: HostTree> Reconciler<'a, H> {
	/// `is_component` tells registered component tags apart; only their
	/// `key` attributes count as component keys.
	pub fn new(host: &'a H, is_component: &'a dyn Fn(&str) -> bool) -> Self {
		Self { host, is_component }
	}

	/// Morphs `live` into the shape of `fragment`.
	///
	/// Nodes of `fragment` may be moved into `live`; the fragment should be
	/// discarded afterwards.
	pub fn morph(&self, live: &H::Node, fragment: &H::Node) -> HostResult<MorphReport<H::Node>> {
		let mut report = MorphReport::default();
		self.morph_into(live, fragment, &mut report)?;
		Ok(report)
	}

	fn morph_into(
		&self,
		live: &H::Node,
		fragment: &H::Node,
		report: &mut MorphReport<H::Node>,
	) -> HostResult<()> {
		self.reconcile_attributes(live, fragment, report)?;

		let lc = self.host.children(live);
		let rc = self.host.children(fragment);
		let (mut ls, mut le) = (0, lc.len());
		let (mut rs, mut re) = (0, rc.len());

		while ls < le || rs < re {
			if ls == le {
				let wanted = &rc[rs];
				// Keys are unique among siblings, so a processed node never matches.
				let keyed = self.component_key(wanted).and_then(|key| {
					lc.iter()
						.find(|candidate| self.component_key(candidate).as_deref() == Some(key.as_str()))
				});
				let reference = lc.get(ls);
				match keyed {
					Some(existing) => {
						self.host.insert_before(live, existing, reference)?;
						self.morph_into(existing, wanted, report)?;
						report.recursed += 1;
					}
					None => self.host.insert_before(live, wanted, reference)?,
				}
				report.inserted += 1;
				rs += 1;
			} else if rs == re {
				self.host.remove_child(live, &lc[ls])?;
				report.removed += 1;
				ls += 1;
			} else if self.signature(&lc[ls]) == self.signature(&rc[rs]) {
				ls += 1;
				rs += 1;
			} else if self.signature(&lc[le - 1]) == self.signature(&rc[re - 1]) {
				le -= 1;
				re -= 1;
			} else if self.same_element(&lc[ls], &rc[rs]) {
				self.morph_into(&lc[ls], &rc[rs], report)?;
				report.recursed += 1;
				ls += 1;
				rs += 1;
			} else {
				self.host.replace_with(&lc[ls], &rc[rs])?;
				report.replaced += 1;
				ls += 1;
				rs += 1;
			}
		}
		Ok(())
	}

	fn reconcile_attributes(
		&self,
		live: &H::Node,
		fragment: &H::Node,
		report: &mut MorphReport<H::Node>,
	) -> HostResult<()> {
		if self.host.kind(live) != NodeKind::Element || self.host.kind(fragment) != NodeKind::Element {
			return Ok(());
		}

		let mut changed = false;
		for (name, value) in self.host.attributes(fragment) {
			if self.host.get_attribute(live, &name).as_deref() != Some(value.as_str()) {
				self.host.set_attribute(live, &name, &value)?;
				self.mirror_boolean(live, &name, true);
				report.attributes_set += 1;
				changed = true;
			}
		}
		for (name, _) in self.host.attributes(live) {
			if !self.host.has_attribute(fragment, &name) {
				self.host.remove_attribute(live, &name);
				self.mirror_boolean(live, &name, false);
				report.attributes_removed += 1;
				changed = true;
			}
		}

		if changed && self.is_component_host(live) {
			report.touched.push(live.clone());
		}
		Ok(())
	}

	fn mirror_boolean(&self, node: &H::Node, name: &str, value: bool) {
		if self.host.property_kind(node, name) == PropertyKind::Boolean
			&& let Err(error) = self.host.set_property(node, name, Prop::Bool(value))
		{
			tracing::debug!(target: "morphel::render", name, %error, "boolean mirror failed");
		}
	}

	fn is_component_host(&self, node: &H::Node) -> bool {
		self.host.tag(node).is_some_and(|tag| (self.is_component)(&tag))
	}

	fn component_key(&self, node: &H::Node) -> Option<String> {
		if !self.is_component_host(node) {
			return None;
		}
		self.host.get_attribute(node, "key")
	}

	fn same_element(&self, live: &H::Node, fragment: &H::Node) -> bool {
		match (self.host.tag(live), self.host.tag(fragment)) {
			(Some(a), Some(b)) => a == b,
			_ => false,
		}
	}

	fn signature(&self, node: &H::Node) -> Signature {
		match self.host.kind(node) {
			NodeKind::Text => Signature::Text(self.host.text_content(node)),
			NodeKind::Element => Signature::Element(self.host.outer_markup(node)),
			NodeKind::Comment => Signature::Comment(self.host.text_content(node)),
			NodeKind::Fragment => Signature::Other,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::dom::{MemoryNode, MemoryTree};
	use rstest::{fixture, rstest};

	#[fixture]
	fn tree() -> MemoryTree {
		MemoryTree::new()
	}

	fn is_component(tag: &str) -> bool {
		tag.starts_with("x-")
	}

	fn live(tree: &MemoryTree, markup: &str) -> MemoryNode {
		let container = tree.create_element("div");
		let fragment = tree.parse_fragment(markup).unwrap();
		tree.append_child(&container, &fragment).unwrap();
		container
	}

	fn morph(tree: &MemoryTree, live: &MemoryNode, markup: &str) -> MorphReport<MemoryNode> {
		let fragment = tree.parse_fragment(markup).unwrap();
		Reconciler::new(tree, &is_component).morph(live, &fragment).unwrap()
	}

	#[rstest]
	fn test_identical_markup_is_untouched(tree: MemoryTree) {
		let markup = "<p>a</p>text<!--c--><ul><li>1</li></ul>";
		let container = live(&tree, markup);
		let before = tree.children(&container);

		let report = morph(&tree, &container, markup);

		assert_eq!(report.mutations(), 0);
		assert_eq!(tree.children(&container), before);
	}

	#[rstest]
	fn test_middle_removal_removes_only_that_node(tree: MemoryTree) {
		let container = live(&tree, "<li>A</li><li>B</li><li>C</li>");
		let before = tree.children(&container);

		let report = morph(&tree, &container, "<li>A</li><li>C</li>");

		assert_eq!(report.removed, 1);
		assert_eq!(report.structural_operations(), 1);
		let after = tree.children(&container);
		assert_eq!(after, vec![before[0].clone(), before[2].clone()]);
	}

	#[rstest]
	fn test_append_inserts_at_end(tree: MemoryTree) {
		let container = live(&tree, "<li>A</li>");
		let first = tree.children(&container)[0].clone();

		let report = morph(&tree, &container, "<li>A</li><li>B</li>");

		assert_eq!(report.inserted, 1);
		assert_eq!(tree.children(&container)[0], first);
		assert_eq!(tree.inner_markup(&container), "<li>A</li><li>B</li>");
	}

	#[rstest]
	fn test_keyed_component_survives_insertion_before_it(tree: MemoryTree) {
		let container = live(&tree, r#"<x-row key="b">B</x-row>"#);
		let b = tree.children(&container)[0].clone();

		let report = morph(&tree, &container, r#"<x-row key="a">A</x-row><x-row key="b">B</x-row>"#);

		let children = tree.children(&container);
		assert_eq!(children.len(), 2);
		assert_eq!(children[1], b);
		assert_eq!(report.inserted, 1);
		assert_eq!(report.replaced, 0);
	}

	#[rstest]
	fn test_keyed_component_pulled_back_after_replacement(tree: MemoryTree) {
		let container = live(&tree, r#"<x-item key="x">old</x-item>"#);
		let item = tree.children(&container)[0].clone();

		let report = morph(&tree, &container, r#"<p>new</p><x-item key="x">changed</x-item>"#);

		let children = tree.children(&container);
		assert_eq!(children.len(), 2);
		assert_eq!(children[1], item);
		assert_eq!(tree.inner_markup(&container), r#"<p>new</p><x-item key="x">changed</x-item>"#);
		assert_eq!(report.inserted, 1);
		assert_eq!(report.recursed, 1);
	}

	#[rstest]
	fn test_same_tag_recurses_instead_of_replacing(tree: MemoryTree) {
		let container = live(&tree, "<p>old</p>");
		let paragraph = tree.children(&container)[0].clone();

		let report = morph(&tree, &container, "<p>new</p>");

		assert_eq!(tree.children(&container)[0], paragraph);
		assert_eq!(report.recursed, 1);
		assert_eq!(report.replaced, 1);
		assert_eq!(tree.text_content(&paragraph), "new");
	}

	#[rstest]
	fn test_different_category_is_replaced(tree: MemoryTree) {
		let container = live(&tree, "<b>x</b>");
		let report = morph(&tree, &container, "x");
		assert_eq!(report.replaced, 1);
		assert_eq!(tree.inner_markup(&container), "x");
	}

	#[rstest]
	fn test_attributes_and_boolean_mirror(tree: MemoryTree) {
		let container = live(&tree, r#"<input class="a" disabled>"#);
		let input = tree.children(&container)[0].clone();
		tree.set_property(&input, "disabled", Prop::Bool(true)).unwrap();

		let report = morph(&tree, &container, r#"<input class="b" checked>"#);

		assert_eq!(tree.children(&container)[0], input);
		assert_eq!(report.attributes_set, 2);
		assert_eq!(report.attributes_removed, 1);
		assert_eq!(tree.property(&input, "checked"), Some(Prop::Bool(true)));
		assert_eq!(tree.property(&input, "disabled"), Some(Prop::Bool(false)));
		assert!(report.touched.is_empty());
	}

	#[rstest]
	fn test_component_attribute_change_is_reported(tree: MemoryTree) {
		let container = live(&tree, r#"<x-price amount="20"></x-price>"#);
		let host = tree.children(&container)[0].clone();

		let report = morph(&tree, &container, r#"<x-price amount="30"></x-price>"#);

		assert_eq!(report.touched, vec![host]);
	}

	#[rstest]
	fn test_morph_does_not_enter_render_roots(tree: MemoryTree) {
		let container = live(&tree, "<x-card></x-card>");
		let host = tree.children(&container)[0].clone();
		let root = tree.render_root(&host);
		let inner = tree.parse_fragment("<p>rendered</p>").unwrap();
		tree.append_child(&root, &inner).unwrap();

		let report = morph(&tree, &container, "<x-card></x-card>");

		assert_eq!(report.mutations(), 0);
		assert_eq!(tree.rendered_markup(&host), "<p>rendered</p>");
	}
}
