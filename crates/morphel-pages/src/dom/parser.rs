//! Lenient HTML fragment parser for [`MemoryTree`](super::MemoryTree).
//!
//! Handles void elements, self-closing syntax, quoted, unquoted and bare
//! attributes, character references, comments and raw-text elements. Stray
//! end tags are ignored and unclosed elements are closed at the end of
//! input. The only hard failure is a tag or quoted attribute value that runs
//! into the end of input.

use super::memory::MemoryNode;
use super::{HostError, HostResult, NodeKind};
use crate::markup::unescape;

const VOID_ELEMENTS: &[&str] = &[
	"area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
	"track", "wbr",
];

/// Elements closed implicitly by an opening tag of the same name.
const SELF_NESTING_FORBIDDEN: &[&str] = &["li", "p", "option", "tr", "td", "th", "dt", "dd"];

pub(crate) fn is_void(tag: &str) -> bool {
	VOID_ELEMENTS.contains(&tag)
}

pub(crate) fn is_raw_text(tag: &str) -> bool {
	matches!(tag, "script" | "style")
}

pub(super) fn parse_fragment(markup: &str) -> HostResult<MemoryNode> {
	let root = MemoryNode::fragment();
	let mut parser = Parser {
		src: markup,
		pos: 0,
		root: root.clone(),
		open: Vec::new(),
	};
	parser.run()?;
	Ok(root)
}

struct Parser<'a> {
	src: &'a str,
	pos: usize,
	root: MemoryNode,
	open: Vec<MemoryNode>,
}

impl<'a> Parser<'a> {
	fn run(&mut self) -> HostResult<()> {
		while self.pos < self.src.len() {
			let rest = self.rest();
			if rest.starts_with("<!--") {
				self.comment();
			} else if rest.starts_with("</") {
				self.end_tag();
			} else if rest.starts_with("<!") || rest.starts_with("<?") {
				self.skip_past('>');
			} else if rest.starts_with('<') && rest[1..].starts_with(|c: char| c.is_ascii_alphabetic()) {
				self.start_tag()?;
			} else {
				self.text();
			}
		}
		Ok(())
	}

	fn rest(&self) -> &'a str {
		&self.src[self.pos..]
	}

	fn peek(&self) -> Option<char> {
		self.rest().chars().next()
	}

	fn current(&self) -> &MemoryNode {
		self.open.last().unwrap_or(&self.root)
	}

	fn take_while(&mut self, predicate: impl Fn(char) -> bool) -> &'a str {
		let rest = self.rest();
		let end = rest.find(|c: char| !predicate(c)).unwrap_or(rest.len());
		self.pos += end;
		&rest[..end]
	}

	fn skip_whitespace(&mut self) {
		self.take_while(char::is_whitespace);
	}

	fn skip_past(&mut self, terminator: char) {
		let rest = self.rest();
		self.pos += rest.find(terminator).map_or(rest.len(), |end| end + terminator.len_utf8());
	}

	fn append_text(&self, text: &str) {
		if text.is_empty() {
			return;
		}
		let parent = self.current();
		match parent.last_child() {
			Some(last) if last.kind() == NodeKind::Text => last.push_text(text),
			_ => parent.push_child(&MemoryNode::text(text)),
		}
	}

	fn text(&mut self) {
		let rest = self.rest();
		// A stray `<` is text; always consume at least one character.
		let first = rest.chars().next().map_or(0, char::len_utf8);
		let end = rest[first..].find('<').map_or(rest.len(), |end| end + first);
		self.pos += end;
		self.append_text(&unescape(&rest[..end]));
	}

	fn comment(&mut self) {
		let body = &self.rest()[4..];
		let (content, consumed) = match body.find("-->") {
			Some(end) => (&body[..end], end + 3),
			None => (body, body.len()),
		};
		self.pos += 4 + consumed;
		self.current().push_child(&MemoryNode::comment(content));
	}

	fn end_tag(&mut self) {
		self.pos += 2;
		let name = self
			.take_while(|c| c != '>' && !c.is_whitespace())
			.to_ascii_lowercase();
		self.skip_past('>');
		if let Some(index) = self.open.iter().rposition(|node| node.tag_name() == name) {
			self.open.truncate(index);
		}
	}

	fn start_tag(&mut self) -> HostResult<()> {
		let start = self.pos;
		self.pos += 1;
		let name = self
			.take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | ':' | '_' | '.'))
			.to_ascii_lowercase();
		let element = MemoryNode::element(&name);

		let mut self_closing = false;
		loop {
			self.skip_whitespace();
			match self.peek() {
				None => {
					return Err(HostError::Parse {
						offset: start,
						message: format!("unterminated <{name}> tag"),
					});
				}
				Some('>') => {
					self.pos += 1;
					break;
				}
				Some('/') => {
					self.pos += 1;
					if self.peek() == Some('>') {
						self.pos += 1;
						self_closing = true;
						break;
					}
				}
				Some(_) => self.attribute(&element)?,
			}
		}

		if SELF_NESTING_FORBIDDEN.contains(&name.as_str()) && self.current().tag_name() == name {
			self.open.pop();
		}
		self.current().push_child(&element);

		if is_void(&name) || self_closing {
			return Ok(());
		}
		if is_raw_text(&name) {
			self.raw_text(&element, &name);
			return Ok(());
		}
		self.open.push(element);
		Ok(())
	}

	fn attribute(&mut self, element: &MemoryNode) -> HostResult<()> {
		let start = self.pos;
		let name = self
			.take_while(|c| !c.is_whitespace() && !matches!(c, '=' | '>' | '/' | '"' | '\''))
			.to_ascii_lowercase();
		if name.is_empty() {
			// Stray quote: drop it.
			self.pos += self.peek().map_or(1, char::len_utf8);
			return Ok(());
		}

		self.skip_whitespace();
		let value = if self.peek() == Some('=') {
			self.pos += 1;
			self.skip_whitespace();
			match self.peek() {
				Some(quote @ ('"' | '\'')) => {
					self.pos += 1;
					let rest = self.rest();
					let Some(end) = rest.find(quote) else {
						return Err(HostError::Parse {
							offset: start,
							message: format!("unterminated value of attribute `{name}`"),
						});
					};
					self.pos += end + 1;
					unescape(&rest[..end])
				}
				_ => unescape(self.take_while(|c| !c.is_whitespace() && c != '>')),
			}
		} else {
			String::new()
		};

		element.push_attribute(name, value);
		Ok(())
	}

	fn raw_text(&mut self, element: &MemoryNode, name: &str) {
		let rest = self.rest();
		let closing = format!("</{name}");
		let end = rest
			.to_ascii_lowercase()
			.find(&closing)
			.unwrap_or(rest.len());
		if end > 0 {
			element.push_child(&MemoryNode::text(&rest[..end]));
		}
		self.pos += end;
		if self.pos < self.src.len() {
			self.skip_past('>');
		}
	}
}
