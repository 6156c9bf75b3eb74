//! Parameter placeholder tokens.
//!
//! ```text
//! #{name}          scalar parameter, substituted for imported CTEs
//! #{name:default}  scalar parameter with a default (left for the binding layer)
//! ${name}          array parameter (never substituted here)
//! @{name}          macro (never substituted here)
//! ```

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::char,
    combinator::{opt, value},
    sequence::{preceded, tuple},
    IResult,
};

use crate::value::{Mapping, Value};

/// Which sigil introduced a placeholder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sigil {
    /// `#{}`
    Param,
    /// `${}`
    Array,
    /// `@{}`
    Macro,
}

/// A placeholder token found in a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder<'a> {
    pub sigil: Sigil,
    pub name: &'a str,
    pub default: Option<&'a str>,
}

/// True if the string starts with a placeholder sigil (`#{`, `${` or `@{`).
pub fn is_placeholder(s: &str) -> bool {
    let s = s.trim_start();
    s.starts_with("#{") || s.starts_with("${") || s.starts_with("@{")
}

/// Parse a single placeholder token at the start of `input`.
pub fn parse_placeholder(input: &str) -> IResult<&str, Placeholder<'_>> {
    let (input, sigil) = alt((
        value(Sigil::Param, tag("#{")),
        value(Sigil::Array, tag("${")),
        value(Sigil::Macro, tag("@{")),
    ))(input)?;
    let (input, (name, default)) = tuple((
        take_while1(|c: char| c != '}' && c != ':'),
        opt(preceded(char(':'), take_while(|c: char| c != '}'))),
    ))(input)?;
    let (input, _) = char('}')(input)?;

    Ok((input, Placeholder { sigil, name, default }))
}

/// Replace `#{name}` tokens with parameter values.
///
/// Strings are single-quoted, other scalars are rendered as SQL literals.
/// Tokens with a default, unknown names, `${}` and `@{}` are left untouched.
pub fn substitute(text: &str, params: &Mapping) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while !rest.is_empty() {
        if let Ok((remaining, token)) = parse_placeholder(rest) {
            let consumed = &rest[..rest.len() - remaining.len()];
            match (token.sigil, token.default, params.get(token.name)) {
                (Sigil::Param, None, Some(value)) => out.push_str(&format_param(value)),
                _ => out.push_str(consumed),
            }
            rest = remaining;
            continue;
        }
        let mut chars = rest.chars();
        if let Some(c) = chars.next() {
            out.push(c);
        }
        rest = chars.as_str();
    }

    out
}

/// Apply [`substitute`] to every string in a tree.
pub fn substitute_value(value: &Value, params: &Mapping) -> Value {
    match value {
        Value::String(s) => Value::String(substitute(s, params)),
        Value::Sequence(items) => {
            Value::Sequence(items.iter().map(|v| substitute_value(v, params)).collect())
        }
        Value::Mapping(map) => Value::Mapping(
            map.iter()
                .map(|(k, v)| (k.clone(), substitute_value(v, params)))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn format_param(value: &Value) -> String {
    match value {
        Value::String(s) => format!("'{}'", s),
        other => other.to_sql(),
    }
}
