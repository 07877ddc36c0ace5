use std::fmt::Display;

/// A filter or path parse failure.
///
/// Carries the kind of failure, the byte offset in the (trimmed) input
/// where it happened, and the input itself so that `Display` can show the
/// incriminated text under the diagnostic.
#[derive(Debug)]
pub struct Error<'a> {
    input: &'a str,
    position: usize,
    kind: ErrorKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    /// A character outside the token alphabet of the current tokenizer.
    UnexpectedCharacter(char),
    /// The input ended where a token, a literal or a closing group was
    /// still required.
    UnexpectedEndOfInput,
    /// A well-formed token in a position where it cannot appear.
    UnexpectedToken(String),
    /// Two path separators in a row without a value filter in between.
    AttributeNameExpected,
    /// A filter token that should resolve to an attribute path but does
    /// not. The inner diagnostic is embedded.
    InvalidAttributePath(String),
    /// The attribute in front of a `[…]` value filter is not a valid
    /// attribute reference.
    InvalidAttributeReference(String),
    /// `not` was not followed by `(`.
    ExpectedOpenParen,
    /// A `)` without a matching opener, or an unclosed group at the end of
    /// the input.
    UnbalancedParentheses,
    /// An attribute operator outside the known set.
    UnrecognizedOperator(String),
    /// The JSON reader could not produce a scalar at the cursor position.
    InvalidComparisonValue(String),
}

impl<'a> Error<'a> {
    pub(crate) fn new(input: &'a str, position: usize, kind: ErrorKind) -> Self {
        Self { input, position, kind }
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Byte offset into the trimmed input at which the failure occurred.
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn input(&self) -> &'a str {
        self.input
    }

    fn highlight_len(&self) -> usize {
        match &self.kind {
            ErrorKind::UnexpectedCharacter(c) => c.len_utf8(),
            ErrorKind::UnexpectedToken(token) | ErrorKind::UnrecognizedOperator(token) => {
                token.len()
            }
            _ => 0,
        }
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::UnexpectedCharacter(c) => {
                write!(f, "Unexpected character `{}`.", c.escape_debug())
            }
            ErrorKind::UnexpectedEndOfInput => {
                write!(f, "Unexpected end of input.")
            }
            ErrorKind::UnexpectedToken(token) => {
                write!(
                    f,
                    "Found unexpected token `{}`. You probably forgot an `and` or an `or`.",
                    token.escape_debug()
                )
            }
            ErrorKind::AttributeNameExpected => {
                write!(f, "Attribute name expected.")
            }
            ErrorKind::InvalidAttributePath(detail) => {
                write!(f, "Invalid attribute path: {detail}")
            }
            ErrorKind::InvalidAttributeReference(detail) => {
                write!(f, "Invalid attribute reference: {detail}")
            }
            ErrorKind::ExpectedOpenParen => {
                write!(f, "Expected `(` after `not`.")
            }
            ErrorKind::UnbalancedParentheses => {
                write!(f, "Unbalanced parentheses in the filter expression.")
            }
            ErrorKind::UnrecognizedOperator(op) => {
                write!(
                    f,
                    "Unrecognized attribute operator `{}`. Expected one of \
                     `eq`, `ne`, `co`, `sw`, `ew`, `pr`, `gt`, `ge`, `lt`, `le`.",
                    op.escape_debug()
                )
            }
            ErrorKind::InvalidComparisonValue(detail) => {
                write!(f, "Invalid comparison value: {detail}")
            }
        }
    }
}

impl Display for Error<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // First line is the diagnostic, second line the position range and
        // the incriminated input with `\n` and quotes escaped so the
        // format survives multi-line inputs.
        writeln!(f, "{}", self.kind)?;
        write!(
            f,
            "{}:{} {}",
            self.position,
            self.position + self.highlight_len(),
            self.input.escape_debug()
        )
    }
}

impl std::error::Error for Error<'_> {}
