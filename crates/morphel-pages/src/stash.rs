//! Attribute stash and rehydration.
//!
//! Markup is text, but attribute values may be callbacks, observables or
//! shared objects. When such a value is interpolated into an attribute the
//! [`Stash`] stores it under an opaque key (`el:<n>`) and the key is written
//! instead. After the markup is parsed and reconciled, [`rehydrate`] walks the
//! affected nodes and assigns the stashed values to node properties.
//!
//! Every entry is owned by the instances that emitted it. After a render the
//! owner's entries that were not emitted again are released; an unmounted
//! instance releases all of its entries.

use core::cell::RefCell;
use std::collections::{BTreeSet, HashMap, HashSet};

use morphel_reactive::ComponentId;

use crate::dom::HostTree;
use crate::prop::{Prop, PropIdentity};

#[derive(Debug)]
struct StashEntry {
	identity: PropIdentity,
	value: Prop,
	owners: BTreeSet<ComponentId>,
}

/// Key -> value store for non-serializable attribute values.
#[derive(Debug)]
pub struct Stash {
	prefix: String,
	next_key: u64,
	keys: HashMap<PropIdentity, String>,
	entries: HashMap<String, StashEntry>,
}

impl Stash {
	/// Creates a stash issuing `el:<n>` keys.
	pub fn new() -> Self {
		Self::with_prefix("el")
	}

	/// Creates a stash issuing `<prefix>:<n>` keys.
	pub fn with_prefix(prefix: impl Into<String>) -> Self {
		Self {
			prefix: prefix.into(),
			next_key: 0,
			keys: HashMap::new(),
			entries: HashMap::new(),
		}
	}

	/// Stores `value` on behalf of `owner` and returns its key.
	///
	/// A value already stashed under the same identity keeps its key.
	/// Primitive values have no identity and are not stored.
	pub fn put(&mut self, owner: &ComponentId, value: &Prop) -> Option<String> {
		let identity = value.identity()?;
		let key = match self.keys.get(&identity) {
			Some(key) => key.clone(),
			None => {
				let key = format!("{}:{}", self.prefix, self.next_key);
				self.next_key += 1;
				self.keys.insert(identity.clone(), key.clone());
				key
			}
		};

		let entry = self.entries.entry(key.clone()).or_insert_with(|| StashEntry {
			identity,
			value: value.clone(),
			owners: BTreeSet::new(),
		});
		// Observables re-wrapped on every render share an identity; keep the newest.
		entry.value = value.clone();
		entry.owners.insert(owner.clone());
		Some(key)
	}

	pub fn get(&self, key: &str) -> Option<&Prop> {
		self.entries.get(key).map(|entry| &entry.value)
	}

	pub fn contains_key(&self, key: &str) -> bool {
		self.entries.contains_key(key)
	}

	/// Key under which `value` is stashed, if it is.
	pub fn key_of(&self, value: &Prop) -> Option<&str> {
		let identity = value.identity()?;
		self.keys.get(&identity).map(String::as_str)
	}

	/// Keys owned by `owner`, sorted.
	pub fn keys_of(&self, owner: &ComponentId) -> Vec<String> {
		let mut keys: Vec<String> = self
			.entries
			.iter()
			.filter(|(_, entry)| entry.owners.contains(owner))
			.map(|(key, _)| key.clone())
			.collect();
		keys.sort();
		keys
	}

	/// Releases `owner`'s entries whose keys are not in `kept`.
	///
	/// Returns the number of entries that were freed.
	pub fn sweep(&mut self, owner: &ComponentId, kept: &HashSet<String>) -> usize {
		self.release_where(owner, |key| !kept.contains(key))
	}

	/// Releases every entry of `owner`.
	pub fn drop_owner(&mut self, owner: &ComponentId) -> usize {
		self.release_where(owner, |_| true)
	}

	fn release_where(&mut self, owner: &ComponentId, release: impl Fn(&str) -> bool) -> usize {
		let mut freed = Vec::new();
		for (key, entry) in &mut self.entries {
			if release(key) && entry.owners.remove(owner) && entry.owners.is_empty() {
				freed.push(key.clone());
			}
		}
		for key in &freed {
			if let Some(entry) = self.entries.remove(key) {
				self.keys.remove(&entry.identity);
			}
		}
		if !freed.is_empty() {
			tracing::debug!(target: "morphel::render", owner = %owner, freed = freed.len(), "released stash entries");
		}
		freed.len()
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

impl Default for Stash {
	fn default() -> Self {
		Self::new()
	}
}

/// A stash bound to the instance that is rendering.
///
/// Records every key emitted during the pass so the owner's stale entries
/// can be swept afterwards.
pub struct StashScope<'a> {
	stash: &'a RefCell<Stash>,
	owner: &'a ComponentId,
	emitted: &'a RefCell<HashSet<String>>,
}

impl<'a> StashScope<'a> {
	pub fn new(
		stash: &'a RefCell<Stash>,
		owner: &'a ComponentId,
		emitted: &'a RefCell<HashSet<String>>,
	) -> Self {
		Self {
			stash,
			owner,
			emitted,
		}
	}

	/// Stashes `value` and returns the text to write into the attribute.
	pub(crate) fn put(&self, value: &Prop) -> String {
		match self.stash.borrow_mut().put(self.owner, value) {
			Some(key) => {
				self.emitted.borrow_mut().insert(key.clone());
				key
			}
			None => value.to_attribute_text().unwrap_or_default(),
		}
	}
}

/// `on-click` -> `onClick`.
pub fn camel_case(name: &str) -> String {
	let mut out = String::with_capacity(name.len());
	let mut chars = name.chars().peekable();
	while let Some(ch) = chars.next() {
		match chars.peek() {
			Some(next) if ch == '-' && (next.is_alphanumeric() || *next == '_') => {
				out.extend(next.to_uppercase());
				chars.next();
			}
			_ => out.push(ch),
		}
	}
	out
}

/// Assigns stashed values to the properties of `nodes`.
///
/// For each attribute: a stash key sets the camel-cased property to the
/// stashed value; a native property is left to the host; anything else is
/// copied as text on a best-effort basis. Host failures are logged and
/// skipped. Returns the number of properties assigned.
pub fn rehydrate<H: HostTree>(host: &H, stash: &Stash, nodes: &[H::Node]) -> usize {
	let mut assigned = 0;
	for node in nodes {
		for (name, value) in host.attributes(node) {
			let property = camel_case(&name);
			let prop = match stash.get(&value) {
				Some(stashed) => stashed.clone(),
				None if host.property_kind(node, &name).is_native() => continue,
				None => Prop::Text(value),
			};
			match host.set_property(node, &property, prop) {
				Ok(()) => assigned += 1,
				Err(error) => {
					tracing::debug!(target: "morphel::render", node = ?node, property = %property, %error, "skipped property");
				}
			}
		}
	}
	assigned
}
