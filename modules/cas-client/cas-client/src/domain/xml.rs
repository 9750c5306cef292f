//! Minimal XML tree for CAS responses and logout requests.
//!
//! Elements are keyed by local name (namespace prefixes dropped). Text is
//! unescaped and trimmed. The tree is built from the whole document, so a
//! document that is not well formed never yields a partial result.

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

const MAX_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub text: String,
    pub children: Vec<Element>,
}

impl Element {
    #[must_use]
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |c| c.name == name)
    }

    #[must_use]
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Trimmed text of the named child, if present and non-empty.
    #[must_use]
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name)
            .map(|c| c.text.as_str())
            .filter(|t| !t.is_empty())
    }
}

/// Parse a complete document into its root element.
///
/// # Errors
///
/// A description of why the document is not a single well-formed element.
pub fn parse(xml: &str) -> Result<Element, String> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                if root.is_some() {
                    return Err("multiple root elements".to_owned());
                }
                if stack.len() >= MAX_DEPTH {
                    return Err("document nested too deeply".to_owned());
                }
                stack.push(open(e)?);
            }
            Ok(Event::Empty(ref e)) => {
                if root.is_some() {
                    return Err("multiple root elements".to_owned());
                }
                let el = open(e)?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(el),
                    None => root = Some(el),
                }
            }
            Ok(Event::Text(ref t)) => {
                let text = t.unescape().map_err(|e| format!("invalid text: {e}"))?;
                append_text(&mut stack, &text)?;
            }
            Ok(Event::CData(c)) => {
                let text = String::from_utf8_lossy(&c.into_inner()).into_owned();
                append_text(&mut stack, text.trim())?;
            }
            Ok(Event::End(_)) => {
                let el = stack
                    .pop()
                    .ok_or_else(|| "unbalanced closing tag".to_owned())?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(el),
                    None => root = Some(el),
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(format!("XML parse error: {e}")),
            Ok(_) => {}
        }
    }

    if !stack.is_empty() {
        return Err("unclosed element".to_owned());
    }
    root.ok_or_else(|| "empty document".to_owned())
}

fn open(e: &BytesStart<'_>) -> Result<Element, String> {
    let name = String::from_utf8_lossy(e.local_name().into_inner()).into_owned();
    let mut attributes = Vec::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|err| format!("invalid attribute on <{name}>: {err}"))?;
        let key = String::from_utf8_lossy(attr.key.local_name().into_inner()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|err| format!("invalid attribute value on <{name}>: {err}"))?
            .into_owned();
        attributes.push((key, value));
    }
    Ok(Element {
        name,
        attributes,
        text: String::new(),
        children: Vec::new(),
    })
}

fn append_text(stack: &mut [Element], text: &str) -> Result<(), String> {
    if text.is_empty() {
        return Ok(());
    }
    let current = stack
        .last_mut()
        .ok_or_else(|| "text outside the root element".to_owned())?;
    current.text.push_str(text);
    Ok(())
}
