//! A parser for SCIM filter expressions and attribute paths.
//!
//! Grammar (keywords and operators match case-insensitively):
//!
//! ```text
//! filter       = or-expr EOF
//! or-expr      = and-run ("or" and-run)*
//! and-run      = unary ("and" unary)*
//! unary        = "not" "(" filter ")" | "(" filter ")" | primary
//! primary      = path "[" filter "]"                ; complex value filter
//!              | path "pr"                          ; presence test
//!              | path compare-op json-literal
//! compare-op   = "eq" | "ne" | "co" | "sw" | "ew" | "gt" | "ge" | "lt" | "le"
//! path         = [schema-urn ":"] element ("." element)*
//! element      = ATTRNAME ["[" filter "]"]
//! schema-urn   = "urn:" segment (":" segment)*
//! json-literal = string | number | "true" | "false" | "null"
//! ```
//!
//! `and` binds tighter than `or`, and runs of the same logical operator
//! collapse into a single n-ary node: `a eq 1 and b eq 2 and c eq 3`
//! parses to one [`Filter::And`] with three operands.
//!
//! Parsing is a single forward pass over a rewindable cursor. Two
//! tokenizers cooperate on the same cursor (one for paths, one for
//! filters), and the filter parser keeps an output stack of finished
//! sub-filters plus a stack of pending group markers instead of numeric
//! precedence levels. Comparison literals are handed to serde_json, which
//! reads exactly one value and reports how many bytes it consumed.

mod condition;
mod cursor;
mod error;
mod path;
mod value;

use std::collections::VecDeque;
use std::fmt;

use serde_json::Value;

pub use condition::ComparisonOperator;
use cursor::Cursor;
pub use error::{Error, ErrorKind};
use path::read_path;
pub use path::{InvalidAttributeName, Path, PathElement};
use value::read_literal;

/// A parsed filter expression, ready for structural matching by an
/// evaluator.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// `attr pr` — the attribute has a value.
    Present { attribute: Path },
    /// `attr <op> <literal>`, e.g. `userName eq "bjensen"`.
    Comparison { attribute: Path, op: ComparisonOperator, value: Value },
    /// `attr[…]` — a sub-filter scoped to the values of a (typically
    /// multi-valued) attribute.
    Complex { attribute: Path, filter: Box<Filter> },
    /// `not(…)`.
    Not(Box<Filter>),
    /// n-ary conjunction, at least two operands.
    And(Vec<Filter>),
    /// n-ary disjunction, at least two operands.
    Or(Vec<Filter>),
}

/// Parses a filter expression. Leading and trailing whitespace is
/// ignored; everything else must be consumed by the grammar.
///
/// ```
/// use scim_filter_parser::{parse_filter, Filter};
///
/// let filter = parse_filter(r#"emails[type eq "work"] or nickName pr"#).unwrap();
/// assert!(matches!(filter, Filter::Or(_)));
/// ```
pub fn parse_filter(input: &str) -> Result<Filter, Error<'_>> {
    let mut cursor = Cursor::new(input.trim());
    read_filter(&mut cursor, false)
}

/// Parses an attribute path. The empty string is the root path.
///
/// ```
/// use scim_filter_parser::parse_path;
///
/// let path = parse_path("name.givenName").unwrap();
/// assert_eq!(path.elements().len(), 2);
/// ```
pub fn parse_path(input: &str) -> Result<Path, Error<'_>> {
    let mut cursor = Cursor::new(input.trim());
    read_path(&mut cursor)
}

/// Marker pushed on the operator stack while its operands are still being
/// assembled. `OpenParen` and `Not` open a group that a `)` must close;
/// `And` and `Or` are deferred until a group closes or the input ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GroupOp {
    OpenParen,
    Not,
    And,
    Or,
}

/// Whether the previous token leaves the parser in operand position,
/// i.e. the next token must start a new sub-filter.
fn expects_new_filter(previous: Option<&str>) -> bool {
    match previous {
        None => true,
        Some(token) => {
            token == "("
                || token.eq_ignore_ascii_case("not")
                || token.eq_ignore_ascii_case("and")
                || token.eq_ignore_ascii_case("or")
        }
    }
}

/// Reads one filter token, skipping leading spaces: a name, an operator,
/// or one of the structural characters. `(` and `)` (and `]` in
/// value-filter mode) are tokens of their own — when one terminates a
/// longer token it is pushed back for the next read. In normal mode a
/// trailing `[` stays attached to its token so the caller can recognize a
/// complex value filter.
fn read_filter_token<'a>(
    cursor: &mut Cursor<'a>,
    is_value_filter: bool,
) -> Result<Option<String>, Error<'a>> {
    let mut current;
    loop {
        cursor.mark();
        current = cursor.read();
        if current != Some(' ') {
            break;
        }
    }

    let mut token = String::new();
    let mut position = cursor.marked();
    while let Some(c) = current {
        match c {
            ' ' => return Ok(Some(token)),
            '(' | ')' => {
                if token.is_empty() {
                    token.push(c);
                } else {
                    cursor.unread();
                }
                return Ok(Some(token));
            }
            '[' if !is_value_filter => {
                token.push('[');
                return Ok(Some(token));
            }
            ']' if is_value_filter => {
                if token.is_empty() {
                    token.push(']');
                } else {
                    cursor.unread();
                }
                return Ok(Some(token));
            }
            c if c == '-' || c == '_' || c == '.' || c == ':' || c.is_alphanumeric() => {
                token.push(c)
            }
            c => {
                return Err(Error::new(
                    cursor.input(),
                    position,
                    ErrorKind::UnexpectedCharacter(c),
                ))
            }
        }
        position = cursor.position();
        current = cursor.read();
    }

    if token.is_empty() {
        Ok(None)
    } else {
        Ok(Some(token))
    }
}

fn end_of_input<'a>(cursor: &Cursor<'a>) -> Error<'a> {
    Error::new(cursor.input(), cursor.position(), ErrorKind::UnexpectedEndOfInput)
}

fn pop_operand<'a>(cursor: &Cursor<'a>, output: &mut Vec<Filter>) -> Result<Filter, Error<'a>> {
    output.pop().ok_or_else(|| end_of_input(cursor))
}

fn push_nary(operator: GroupOp, components: VecDeque<Filter>, output: &mut Vec<Filter>) {
    let operands = Vec::from(components);
    debug_assert!(operands.len() >= 2);
    output.push(match operator {
        GroupOp::And => Filter::And(operands),
        GroupOp::Or => Filter::Or(operands),
        GroupOp::OpenParen | GroupOp::Not => unreachable!("only logical operators fold"),
    });
}

/// Resolves a filter token as an attribute path, mapping any failure to
/// the given error kind with the inner diagnostic embedded.
fn parse_attribute<'a>(
    cursor: &Cursor<'a>,
    start: usize,
    token: &str,
    kind: fn(String) -> ErrorKind,
) -> Result<Path, Error<'a>> {
    parse_path(token).map_err(|e| Error::new(cursor.input(), start, kind(e.kind().to_string())))
}

/// Pops logical operators until an opening marker or the bottom of the
/// stack, folding each run of identical operators into one n-ary node.
/// Returns the marker that matched the close, or `None` when the stack
/// ran out — the caller decides whether that is an unbalanced `)`.
///
/// Called once more with `at_end` when the input is exhausted; at that
/// point an opening marker still on the stack is an unclosed group.
fn close_grouping<'a>(
    cursor: &Cursor<'a>,
    operators: &mut Vec<GroupOp>,
    output: &mut Vec<Filter>,
    at_end: bool,
) -> Result<Option<GroupOp>, Error<'a>> {
    let mut matched = None;
    let mut repeating: Option<GroupOp> = None;
    let mut components: VecDeque<Filter> = VecDeque::new();

    while let Some(operator) = operators.pop() {
        if matches!(operator, GroupOp::OpenParen | GroupOp::Not) {
            if at_end {
                return Err(Error::new(
                    cursor.input(),
                    cursor.position(),
                    ErrorKind::UnbalancedParentheses,
                ));
            }
            matched = Some(operator);
            break;
        }
        match repeating {
            None => repeating = Some(operator),
            Some(current) if current != operator => {
                // The run ended: collapse it into one node before
                // starting the run of the other operator.
                components.push_front(pop_operand(cursor, output)?);
                push_nary(current, std::mem::take(&mut components), output);
                repeating = Some(operator);
            }
            Some(_) => {}
        }
        components.push_front(pop_operand(cursor, output)?);
    }

    if let Some(repeating) = repeating {
        if !components.is_empty() {
            components.push_front(pop_operand(cursor, output)?);
            push_nary(repeating, components, output);
        }
    }

    Ok(matched)
}

/// The filter parser proper: a single pass over the token stream with an
/// output stack of finished sub-filters and a stack of pending group
/// markers. In value-filter mode (inside `attr[…]`) a lone `]` ends the
/// invocation and is consumed.
pub(crate) fn read_filter<'a>(
    cursor: &mut Cursor<'a>,
    is_value_filter: bool,
) -> Result<Filter, Error<'a>> {
    let mut output: Vec<Filter> = Vec::new();
    let mut operators: Vec<GroupOp> = Vec::new();
    let mut previous: Option<String> = None;

    while let Some(token) = read_filter_token(cursor, is_value_filter)? {
        let start = cursor.marked();
        let operand_position = expects_new_filter(previous.as_deref());

        if token == "(" && operand_position {
            operators.push(GroupOp::OpenParen);
        } else if token.eq_ignore_ascii_case("not") && operand_position {
            // `not` must introduce a group of its own.
            let Some(next) = read_filter_token(cursor, is_value_filter)? else {
                return Err(end_of_input(cursor));
            };
            if next != "(" {
                return Err(Error::new(
                    cursor.input(),
                    cursor.marked(),
                    ErrorKind::ExpectedOpenParen,
                ));
            }
            operators.push(GroupOp::Not);
        } else if token == ")" && !operand_position {
            match close_grouping(cursor, &mut operators, &mut output, false)? {
                None => {
                    return Err(Error::new(
                        cursor.input(),
                        start,
                        ErrorKind::UnbalancedParentheses,
                    ))
                }
                Some(GroupOp::Not) => {
                    // Same as a parenthesized group, except the result is
                    // negated.
                    let inner = pop_operand(cursor, &mut output)?;
                    output.push(Filter::Not(Box::new(inner)));
                }
                Some(_) => {}
            }
        } else if token.eq_ignore_ascii_case("and") && !operand_position {
            operators.push(GroupOp::And);
        } else if token.eq_ignore_ascii_case("or") && !operand_position {
            // Pending ANDs bind tighter: collapse the whole run into a
            // single node before the OR takes its place on the stack.
            let mut components = VecDeque::new();
            while operators.last() == Some(&GroupOp::And) {
                operators.pop();
                components.push_front(pop_operand(cursor, &mut output)?);
            }
            if !components.is_empty() {
                components.push_front(pop_operand(cursor, &mut output)?);
                push_nary(GroupOp::And, components, &mut output);
            }
            operators.push(GroupOp::Or);
        } else if token.ends_with('[') && operand_position {
            // A complex value filter: `attr[sub-filter]`.
            let attribute = parse_attribute(
                cursor,
                start,
                &token[..token.len() - 1],
                ErrorKind::InvalidAttributeReference,
            )?;
            let inner = read_filter(cursor, true)?;
            output.push(Filter::Complex { attribute, filter: Box::new(inner) });
        } else if is_value_filter && token == "]" && !operand_position {
            // End of this bracketed sub-filter; the brace is consumed.
            break;
        } else if operand_position {
            // An attribute path followed by an operator and maybe a value.
            let attribute =
                parse_attribute(cursor, start, &token, ErrorKind::InvalidAttributePath)?;
            let Some(op) = read_filter_token(cursor, is_value_filter)? else {
                return Err(end_of_input(cursor));
            };
            if op.eq_ignore_ascii_case("pr") {
                output.push(Filter::Present { attribute });
            } else {
                let op_start = cursor.marked();
                let value = read_literal(cursor)?;
                let Some(op) = ComparisonOperator::from_token(&op) else {
                    return Err(Error::new(
                        cursor.input(),
                        op_start,
                        ErrorKind::UnrecognizedOperator(op),
                    ));
                };
                output.push(Filter::Comparison { attribute, op, value });
            }
        } else {
            return Err(Error::new(cursor.input(), start, ErrorKind::UnexpectedToken(token)));
        }

        previous = Some(token);
    }

    close_grouping(cursor, &mut operators, &mut output, true)?;

    let Some(filter) = output.pop() else {
        return Err(end_of_input(cursor));
    };
    // Operand and operator tokens strictly alternate, so every fold
    // consumed exactly its run of operands.
    debug_assert!(output.is_empty());
    Ok(filter)
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Filter::Present { attribute } => {
                write!(f, "{{{attribute}}} pr")
            }
            Filter::Comparison { attribute, op, value } => {
                write!(f, "{{{attribute}}} {op} {value}")
            }
            Filter::Complex { attribute, filter } => {
                write!(f, "{{{attribute}}}[{filter}]")
            }
            Filter::Not(filter) => {
                write!(f, "NOT ({filter})")
            }
            Filter::And(operands) => {
                write!(f, "AND[")?;
                for operand in operands {
                    write!(f, "{operand}, ")?;
                }
                write!(f, "]")
            }
            Filter::Or(operands) => {
                write!(f, "OR[")?;
                for operand in operands {
                    write!(f, "{operand}, ")?;
                }
                write!(f, "]")
            }
        }
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;

    fn p(input: &str) -> Filter {
        parse_filter(input).unwrap()
    }

    fn e(input: &str) -> String {
        parse_filter(input).unwrap_err().to_string()
    }

    #[test]
    fn parse() {
        // comparisons over every operator shape
        insta::assert_snapshot!(p(r#"userName eq "bjensen""#), @r###"{userName} eq "bjensen""###);
        insta::assert_snapshot!(p(r#"name.first eq "nAme:fiRst""#), @r###"{name.first} eq "nAme:fiRst""###);
        insta::assert_snapshot!(p(r#"name.first co "nAme:fiRst""#), @r###"{name.first} co "nAme:fiRst""###);
        insta::assert_snapshot!(p(r#"name.first sw "nAme:""#), @r###"{name.first} sw "nAme:""###);
        insta::assert_snapshot!(p(r#"name.first ew ":fiRst""#), @r###"{name.first} ew ":fiRst""###);
        insta::assert_snapshot!(p("weight gt 175.6"), @"{weight} gt 175.6");
        insta::assert_snapshot!(p("weight ge 175"), @"{weight} ge 175");
        insta::assert_snapshot!(p("children lt 6"), @"{children} lt 6");
        insta::assert_snapshot!(p("children le 5"), @"{children} le 5");
        insta::assert_snapshot!(p("unassigned eq null"), @"{unassigned} eq null");
        insta::assert_snapshot!(p("null ne null"), @"{null} ne null");
        insta::assert_snapshot!(p(r#"meta.lastModified ge "2015-02-27T11:29:39Z""#), @r###"{meta.lastModified} ge "2015-02-27T11:29:39Z""###);

        // presence
        insta::assert_snapshot!(p("id pr"), @"{id} pr");
        insta::assert_snapshot!(p("id PR"), @"{id} pr");

        // keywords and operators match case-insensitively
        insta::assert_snapshot!(p("a EQ 1 AND b PR"), @"AND[{a} eq 1, {b} pr, ]");
        insta::assert_snapshot!(p("NOT (a pr)"), @"NOT ({a} pr)");

        // logical combinations
        insta::assert_snapshot!(p("true eq true and false eq false"), @"AND[{true} eq true, {false} eq false, ]");
        insta::assert_snapshot!(p("a eq 1 or b eq 2"), @"OR[{a} eq 1, {b} eq 2, ]");
        insta::assert_snapshot!(p("not(true eq true)"), @"NOT ({true} eq true)");
        insta::assert_snapshot!(p("not (a pr and b pr)"), @"NOT (AND[{a} pr, {b} pr, ])");

        // and binds tighter than or
        insta::assert_snapshot!(p("a eq 1 and b eq 2 or c eq 3"), @"OR[AND[{a} eq 1, {b} eq 2, ], {c} eq 3, ]");
        insta::assert_snapshot!(p("a pr or b pr and c pr"), @"OR[{a} pr, AND[{b} pr, {c} pr, ], ]");

        // runs of the same operator flatten into one node
        insta::assert_snapshot!(p("a eq 1 and b eq 2 and c eq 3"), @"AND[{a} eq 1, {b} eq 2, {c} eq 3, ]");
        insta::assert_snapshot!(p("a eq 1 or b eq 2 or c eq 3"), @"OR[{a} eq 1, {b} eq 2, {c} eq 3, ]");
        insta::assert_snapshot!(p("a eq 1 and b eq 2 and c eq 3 or d eq 4 or e pr"), @"OR[AND[{a} eq 1, {b} eq 2, {c} eq 3, ], {d} eq 4, {e} pr, ]");

        // parentheses group explicitly and are preserved as structure
        insta::assert_snapshot!(p("(a pr and b pr) and c pr"), @"AND[AND[{a} pr, {b} pr, ], {c} pr, ]");
        insta::assert_snapshot!(p("a eq 1 and (b eq 2 or c eq 3)"), @"AND[{a} eq 1, OR[{b} eq 2, {c} eq 3, ], ]");

        // complex value filters
        insta::assert_snapshot!(p(r#"addresses[type eq "work" and primary eq true]"#), @r###"{addresses}[AND[{type} eq "work", {primary} eq true, ]]"###);
        insta::assert_snapshot!(p(r#"addresses[type eq "work"] or nickName pr"#), @r###"OR[{addresses}[{type} eq "work"], {nickName} pr, ]"###);
        insta::assert_snapshot!(p("urn:x:v[sub eq 1] and b pr"), @"AND[{urn:x:v}[{sub} eq 1], {b} pr, ]");

        // a string literal may contain structural characters
        insta::assert_snapshot!(p(r#"a eq "x)y" and b pr"#), @r###"AND[{a} eq "x)y", {b} pr, ]"###);

        // extra spaces are insignificant
        insta::assert_snapshot!(p("  a   eq   1  "), @"{a} eq 1");
    }

    #[test]
    fn error() {
        insta::assert_snapshot!(e("(a eq 1"), @r###"
        Unbalanced parentheses in the filter expression.
        7:7 (a eq 1
        "###);

        insta::assert_snapshot!(e("a eq 1)"), @r###"
        Unbalanced parentheses in the filter expression.
        6:6 a eq 1)
        "###);

        insta::assert_snapshot!(e("a eq 1 and (b eq 2"), @r###"
        Unbalanced parentheses in the filter expression.
        18:18 a eq 1 and (b eq 2
        "###);

        insta::assert_snapshot!(e("a eq 1 and b eq 2)"), @r###"
        Unbalanced parentheses in the filter expression.
        17:17 a eq 1 and b eq 2)
        "###);

        insta::assert_snapshot!(e("not true eq true"), @r###"
        Expected `(` after `not`.
        4:4 not true eq true
        "###);

        insta::assert_snapshot!(e("id pr true"), @r###"
        Found unexpected token `true`. You probably forgot an `and` or an `or`.
        6:10 id pr true
        "###);

        insta::assert_snapshot!(e("a eq 1 b eq 2"), @r###"
        Found unexpected token `b`. You probably forgot an `and` or an `or`.
        7:8 a eq 1 b eq 2
        "###);

        insta::assert_snapshot!(e("a xx 1"), @r###"
        Unrecognized attribute operator `xx`. Expected one of `eq`, `ne`, `co`, `sw`, `ew`, `pr`, `gt`, `ge`, `lt`, `le`.
        2:4 a xx 1
        "###);

        insta::assert_snapshot!(e("a eq"), @r###"
        Unexpected end of input.
        4:4 a eq
        "###);

        insta::assert_snapshot!(e("a pr and not"), @r###"
        Unexpected end of input.
        12:12 a pr and not
        "###);

        insta::assert_snapshot!(e(r#"name.% eq "x""#), @r###"
        Unexpected character `%`.
        5:6 name.% eq \"x\"
        "###);

        insta::assert_snapshot!(e(r#"name..first eq "x""#), @r###"
        Invalid attribute path: Attribute name expected.
        0:0 name..first eq \"x\"
        "###);

        insta::assert_snapshot!(e("x..y[b pr]"), @r###"
        Invalid attribute reference: Attribute name expected.
        0:0 x..y[b pr]
        "###);

        insta::assert_snapshot!(e("emails[]"), @r###"
        Invalid attribute path: Unexpected character `]`.
        7:7 emails[]
        "###);

        // value paths do not nest
        insta::assert_snapshot!(e("a[b[c pr]]"), @r###"
        Unexpected character `[`.
        3:4 a[b[c pr]]
        "###);

        assert!(matches!(
            parse_filter("").unwrap_err().kind(),
            ErrorKind::UnexpectedEndOfInput
        ));
        assert!(matches!(
            parse_filter("a eq tru").unwrap_err().kind(),
            ErrorKind::InvalidComparisonValue(_)
        ));
        assert!(matches!(
            parse_filter("9a[b pr]").unwrap_err().kind(),
            ErrorKind::InvalidAttributeReference(_)
        ));
    }

    #[test]
    fn and_flattens_to_a_single_node() {
        let Filter::And(operands) = p("a eq 1 and b eq 2 and c eq 3") else {
            panic!("expected an And")
        };
        assert_eq!(operands.len(), 3);
        assert!(operands.iter().all(|operand| matches!(operand, Filter::Comparison { .. })));
    }

    #[test]
    fn or_of_ands_nests_correctly() {
        let Filter::Or(operands) = p("a eq 1 and b eq 2 or c eq 3") else {
            panic!("expected an Or")
        };
        assert_eq!(operands.len(), 2);
        assert!(matches!(&operands[0], Filter::And(inner) if inner.len() == 2));
        assert!(matches!(&operands[1], Filter::Comparison { .. }));
    }

    #[test]
    fn comparison_values_are_json_literals() {
        let Filter::Comparison { op, value, .. } = p("weight gt 175.6") else {
            panic!("expected a Comparison")
        };
        assert_eq!(op, ComparisonOperator::GreaterThan);
        assert_eq!(value, serde_json::json!(175.6));

        let Filter::Comparison { value, .. } = p("unassigned eq null") else {
            panic!("expected a Comparison")
        };
        assert_eq!(value, Value::Null);
    }

    #[test]
    fn complex_value_filter_scopes_and_resumes() {
        let Filter::Or(operands) = p(r#"addresses[type eq "work" and primary eq true] or id pr"#)
        else {
            panic!("expected an Or")
        };
        let Filter::Complex { attribute, filter } = &operands[0] else {
            panic!("expected a Complex")
        };
        assert_eq!(attribute.elements()[0].name(), "addresses");
        assert!(matches!(&**filter, Filter::And(inner) if inner.len() == 2));
        assert!(matches!(&operands[1], Filter::Present { .. }));
    }

    #[test]
    fn unterminated_value_filter_is_tolerated() {
        // the closing brace may be missing at the very end of the input
        insta::assert_snapshot!(p(r#"addresses[type eq "work""#), @r###"{addresses}[{type} eq "work"]"###);
    }
}
