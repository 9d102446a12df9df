//! Markup builder.
//!
//! Components return [`Markup`]: trusted markup text. [`Html`] builds it from
//! literal pieces ([`Html::raw`]), escaped interpolations ([`Html::text`])
//! and attribute values ([`Html::attr`]). Attribute values that cannot be
//! written as text (callbacks, observables, shared objects) are stashed and
//! the stash key is written instead.
//!
//! ## Example
//!
//! ```
//! use morphel_pages::markup::{Html, raw};
//!
//! let items = vec![raw("<li>a</li>"), raw("<li>b</li>")];
//! let markup = Html::new()
//!     .raw("<p")
//!     .attr("title", "1 < 2")
//!     .raw(">")
//!     .text("<b>not bold</b>")
//!     .text(0)
//!     .text(None::<&str>)
//!     .raw("</p><ul>")
//!     .text(items)
//!     .raw("</ul>")
//!     .finish();
//!
//! assert_eq!(
//!     markup.as_str(),
//!     r#"<p title="1 &lt; 2">&lt;b&gt;not bold&lt;/b&gt;0</p><ul><li>a</li><li>b</li></ul>"#
//! );
//! ```

use core::fmt;

use morphel_reactive::Tracked;
use serde_json::Value;

use crate::prop::{Prop, format_number};
use crate::stash::StashScope;

/// Trusted markup text.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Markup(String);

impl Markup {
	/// Wraps text that is already valid markup. It is never escaped.
	pub fn new(markup: impl Into<String>) -> Self {
		Self(markup.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}

	pub fn into_string(self) -> String {
		self.0
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

impl fmt::Display for Markup {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

/// Marks `markup` as trusted so interpolation leaves it unescaped.
pub fn raw(markup: impl Into<String>) -> Markup {
	Markup::new(markup)
}

/// Escape HTML special characters
///
/// # Examples
///
/// ```
/// use morphel_pages::markup::escape;
///
/// assert_eq!(escape("<script>alert('x')</script>"), "&lt;script&gt;alert(&#x27;x&#x27;)&lt;/script&gt;");
/// assert_eq!(escape("5 < 10 & 10 > 5"), "5 &lt; 10 &amp; 10 &gt; 5");
/// ```
pub fn escape(text: &str) -> String {
	let mut result = String::with_capacity(text.len() + 10);
	escape_into(text, &mut result);
	result
}

fn escape_into(text: &str, out: &mut String) {
	for ch in text.chars() {
		match ch {
			'&' => out.push_str("&amp;"),
			'<' => out.push_str("&lt;"),
			'>' => out.push_str("&gt;"),
			'"' => out.push_str("&quot;"),
			'\'' => out.push_str("&#x27;"),
			_ => out.push(ch),
		}
	}
}

/// Unescape HTML character references
///
/// Unknown or malformed references are kept literally.
///
/// # Examples
///
/// ```
/// use morphel_pages::markup::unescape;
///
/// assert_eq!(unescape("&lt;div&gt;"), "<div>");
/// assert_eq!(unescape("&#x27;&#39;&apos;"), "'''");
/// assert_eq!(unescape("fish & chips &copy"), "fish & chips &copy");
/// ```
pub fn unescape(text: &str) -> String {
	let mut result = String::with_capacity(text.len());
	let mut rest = text;
	while let Some(amp) = rest.find('&') {
		result.push_str(&rest[..amp]);
		let tail = &rest[amp + 1..];
		let decoded = tail
			.find(';')
			.filter(|&end| end <= 10)
			.and_then(|end| decode_reference(&tail[..end]).map(|ch| (ch, end)));
		match decoded {
			Some((ch, end)) => {
				result.push(ch);
				rest = &tail[end + 1..];
			}
			None => {
				result.push('&');
				rest = tail;
			}
		}
	}
	result.push_str(rest);
	result
}

fn decode_reference(name: &str) -> Option<char> {
	match name {
		"amp" => Some('&'),
		"lt" => Some('<'),
		"gt" => Some('>'),
		"quot" => Some('"'),
		"apos" => Some('\''),
		"nbsp" => Some('\u{a0}'),
		_ => {
			let number = name.strip_prefix('#')?;
			let code = match number.strip_prefix(['x', 'X']) {
				Some(hex) => u32::from_str_radix(hex, 16).ok()?,
				None => number.parse::<u32>().ok()?,
			};
			char::from_u32(code)
		}
	}
}

/// Values that can be interpolated as element content.
///
/// Strings are escaped. [`Markup`] and sequences of it are trusted. `None`,
/// `false` and `null` render nothing; numbers render plainly (zero included).
pub trait ToMarkup {
	fn write_markup(&self, out: &mut String);
}

impl ToMarkup for str {
	fn write_markup(&self, out: &mut String) {
		escape_into(self, out);
	}
}

impl ToMarkup for String {
	fn write_markup(&self, out: &mut String) {
		escape_into(self, out);
	}
}

impl ToMarkup for Markup {
	fn write_markup(&self, out: &mut String) {
		out.push_str(&self.0);
	}
}

impl ToMarkup for [Markup] {
	fn write_markup(&self, out: &mut String) {
		for markup in self {
			out.push_str(&markup.0);
		}
	}
}

impl ToMarkup for Vec<Markup> {
	fn write_markup(&self, out: &mut String) {
		self.as_slice().write_markup(out);
	}
}

impl ToMarkup for bool {
	fn write_markup(&self, out: &mut String) {
		if *self {
			out.push_str("true");
		}
	}
}

impl<T: ToMarkup> ToMarkup for Option<T> {
	fn write_markup(&self, out: &mut String) {
		if let Some(value) = self {
			value.write_markup(out);
		}
	}
}

impl<T: ToMarkup + ?Sized> ToMarkup for &T {
	fn write_markup(&self, out: &mut String) {
		(**self).write_markup(out);
	}
}

macro_rules! impl_to_markup_integer {
	($($ty:ty),*) => {
		$(
			impl ToMarkup for $ty {
				fn write_markup(&self, out: &mut String) {
					out.push_str(&self.to_string());
				}
			}
		)*
	};
}

impl_to_markup_integer!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);

impl ToMarkup for f64 {
	fn write_markup(&self, out: &mut String) {
		out.push_str(&format_number(*self));
	}
}

impl ToMarkup for f32 {
	fn write_markup(&self, out: &mut String) {
		out.push_str(&format_number(f64::from(*self)));
	}
}

impl ToMarkup for Value {
	fn write_markup(&self, out: &mut String) {
		match self {
			Value::Null | Value::Bool(false) => {}
			Value::Bool(true) => out.push_str("true"),
			Value::Number(number) => out.push_str(&number.to_string()),
			Value::String(text) => escape_into(text, out),
			other => escape_into(&other.to_string(), out),
		}
	}
}

impl ToMarkup for Tracked {
	fn write_markup(&self, out: &mut String) {
		match self {
			Tracked::Value(value) => value.write_markup(out),
			Tracked::Observable(observable) => observable.target().write_markup(out),
		}
	}
}

/// Markup builder.
///
/// Created detached with [`Html::new`], or bound to a component's stash
/// through [`RenderContext::html`](crate::RenderContext::html).
pub struct Html<'a> {
	out: String,
	stash: Option<StashScope<'a>>,
}

impl Html<'static> {
	/// A builder without a stash. Non-primitive attribute values render as
	/// empty strings.
	pub fn new() -> Self {
		Self {
			out: String::new(),
			stash: None,
		}
	}
}

impl Default for Html<'static> {
	fn default() -> Self {
		Self::new()
	}
}

impl<'a> Html<'a> {
	pub(crate) fn with_stash(stash: StashScope<'a>) -> Self {
		Self {
			out: String::new(),
			stash: Some(stash),
		}
	}

	/// Appends trusted literal markup.
	pub fn raw(mut self, markup: &str) -> Self {
		self.out.push_str(markup);
		self
	}

	/// Appends an interpolated value.
	pub fn text(mut self, value: impl ToMarkup) -> Self {
		value.write_markup(&mut self.out);
		self
	}

	/// Appends ` name="value"`.
	///
	/// Primitive values are escaped. Callbacks, observables and objects are
	/// stashed and their key is written; repeated interpolation of the same
	/// value reuses its key.
	pub fn attr(mut self, name: &str, value: impl Into<Prop>) -> Self {
		let value = value.into();
		let text = match value.to_attribute_text() {
			Some(text) => text,
			None => match &self.stash {
				Some(stash) => stash.put(&value),
				None => {
					tracing::debug!(target: "morphel::render", attribute = name, "no stash bound; writing empty value");
					String::new()
				}
			},
		};
		self.out.push(' ');
		self.out.push_str(name);
		self.out.push_str("=\"");
		escape_into(&text, &mut self.out);
		self.out.push('"');
		self
	}

	/// Appends the items of `iter`, each rendered by `f`.
	pub fn each<I, F>(mut self, iter: I, mut f: F) -> Self
	where
		I: IntoIterator,
		F: FnMut(Self, I::Item) -> Self,
	{
		for item in iter {
			self = f(self, item);
		}
		self
	}

	pub fn finish(self) -> Markup {
		Markup(self.out)
	}
}
