//! Attribute paths: the dotted, optionally URN-prefixed references on the
//! left-hand side of every filter comparison, and the target of PATCH
//! style operations.

use std::fmt;

use crate::cursor::Cursor;
use crate::error::{Error, ErrorKind};
use crate::{read_filter, Filter};

/// A parsed attribute path.
///
/// `schema_urn` is only present when the path started with a `urn:`
/// prefix. A path with a URN and no element refers to the extension root
/// itself; a path with neither refers to the whole resource.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    schema_urn: Option<String>,
    elements: Vec<PathElement>,
}

/// One step of a [`Path`]: an attribute name, optionally scoped by a
/// bracketed value filter as in `addresses[type eq "work"]`.
#[derive(Debug, Clone, PartialEq)]
pub struct PathElement {
    name: String,
    value_filter: Option<Filter>,
}

/// Rejection from the path factory: the name does not conform to the SCIM
/// attribute-name syntax.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid attribute name `{0}`: expected a letter followed by letters, digits, `-` or `_`")]
pub struct InvalidAttributeName(pub String);

impl PathElement {
    fn new(name: &str, value_filter: Option<Filter>) -> Result<Self, InvalidAttributeName> {
        if !is_valid_attribute_name(name) {
            return Err(InvalidAttributeName(name.to_string()));
        }
        Ok(Self { name: name.to_string(), value_filter })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value_filter(&self) -> Option<&Filter> {
        self.value_filter.as_ref()
    }
}

impl Path {
    /// The empty path, denoting the whole resource.
    pub fn root() -> Self {
        Self { schema_urn: None, elements: Vec::new() }
    }

    /// The root of a schema extension, with no attribute selected yet.
    pub fn extension_root(schema_urn: impl Into<String>) -> Self {
        Self { schema_urn: Some(schema_urn.into()), elements: Vec::new() }
    }

    fn from_attribute(
        schema_urn: Option<String>,
        name: &str,
        value_filter: Option<Filter>,
    ) -> Result<Self, InvalidAttributeName> {
        Ok(Self { schema_urn, elements: vec![PathElement::new(name, value_filter)?] })
    }

    fn push_sub(
        &mut self,
        name: &str,
        value_filter: Option<Filter>,
    ) -> Result<(), InvalidAttributeName> {
        self.elements.push(PathElement::new(name, value_filter)?);
        Ok(())
    }

    pub fn schema_urn(&self) -> Option<&str> {
        self.schema_urn.as_deref()
    }

    pub fn elements(&self) -> &[PathElement] {
        &self.elements
    }

    /// Whether this path selects a resource or extension root rather than
    /// a concrete attribute.
    pub fn is_root(&self) -> bool {
        self.elements.is_empty()
    }
}

/// SCIM `ATTRNAME`: a letter followed by letters, digits, `-` or `_`.
/// The tokenizers accept a broader alphabet; strictness lives here.
fn is_valid_attribute_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

fn has_urn_prefix(token: &str) -> bool {
    token.len() >= 4 && token.as_bytes()[..4].eq_ignore_ascii_case(b"urn:")
}

/// A period is part of the token rather than an element separator only
/// inside a URN's version segment, e.g. `urn:…:ext:2.0:User`. Without
/// this, the `2.0` would split the URN; with more, dotted sub-attribute
/// paths after the URN (`urn:…:User:manager.displayName`) would not.
fn urn_keeps_period(token: &str) -> bool {
    if !has_urn_prefix(token) {
        return false;
    }
    let segment = &token[token.rfind(':').map_or(0, |i| i + 1)..];
    segment.bytes().all(|b| b.is_ascii_digit() || b == b'.')
}

/// Reads one path token: an attribute name terminated by a `.` (consumed)
/// or by an opening `[` (kept in the token so the caller knows a value
/// filter follows). An empty token is a real token — it means two
/// delimiters in a row — while `None` means the input is exhausted.
fn read_path_token<'a>(cursor: &mut Cursor<'a>) -> Result<Option<String>, Error<'a>> {
    cursor.mark();
    let mut token = String::new();
    loop {
        let position = cursor.position();
        let Some(c) = cursor.read() else { break };
        match c {
            '.' if !urn_keeps_period(&token) => {
                if cursor.is_at_end() {
                    // There is nothing after the period.
                    return Err(Error::new(
                        cursor.input(),
                        cursor.position(),
                        ErrorKind::UnexpectedEndOfInput,
                    ));
                }
                return Ok(Some(token));
            }
            '.' => token.push('.'),
            '[' => {
                token.push('[');
                return Ok(Some(token));
            }
            c if c == '-' || c == '_' || c == ':' || c.is_alphanumeric() => token.push(c),
            c => {
                return Err(Error::new(
                    cursor.input(),
                    position,
                    ErrorKind::UnexpectedCharacter(c),
                ))
            }
        }
    }
    if token.is_empty() {
        Ok(None)
    } else {
        Ok(Some(token))
    }
}

/// Assembles a [`Path`] from the token stream, recursing into the filter
/// parser whenever an element carries a `[…]` value filter.
pub(crate) fn read_path<'a>(cursor: &mut Cursor<'a>) -> Result<Path, Error<'a>> {
    let mut path: Option<Path> = None;

    while let Some(token) = read_path_token(cursor)? {
        let start = cursor.marked();
        if token.is_empty() {
            // Two separators in a row. Only `attr[…].` produces this
            // legitimately: the period right after a value filter.
            let after_value_filter = path
                .as_ref()
                .and_then(|path| path.elements.last())
                .is_some_and(|element| element.value_filter.is_some());
            if !after_value_filter {
                return Err(Error::new(
                    cursor.input(),
                    start,
                    ErrorKind::AttributeNameExpected,
                ));
            }
            continue;
        }

        let mut schema_urn = None;
        let mut name = token.as_str();
        if path.is_none() && has_urn_prefix(name) {
            // Everything up to the last colon is the schema URN, the rest
            // is the attribute name.
            let colon = name.rfind(':').expect("a urn prefix contains a colon");
            let urn = &name[..colon];
            name = &name[colon + 1..];
            if name.is_empty() {
                // The trailing colon references the extension root itself.
                return Ok(Path::extension_root(urn));
            }
            schema_urn = Some(urn.to_string());
        }

        let mut value_filter = None;
        let name = match name.strip_suffix('[') {
            Some(name) => {
                value_filter = Some(read_filter(cursor, true)?);
                name
            }
            None => name,
        };

        let invalid = |e: InvalidAttributeName| {
            Error::new(cursor.input(), start, ErrorKind::InvalidAttributePath(e.to_string()))
        };
        match &mut path {
            Some(existing) => existing.push_sub(name, value_filter).map_err(invalid)?,
            None => {
                path = Some(
                    Path::from_attribute(schema_urn, name, value_filter).map_err(invalid)?,
                )
            }
        }
    }

    Ok(path.unwrap_or_else(Path::root))
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(urn) = &self.schema_urn {
            write!(f, "{urn}:")?;
        }
        for (i, element) in self.elements.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            write!(f, "{element}")?;
        }
        Ok(())
    }
}

impl fmt::Display for PathElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if let Some(filter) = &self.value_filter {
            write!(f, "[{filter}]")?;
        }
        Ok(())
    }
}
