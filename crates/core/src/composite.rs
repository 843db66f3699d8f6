//! Wire codec for parenthesized composite tuples.
//!
//! Both the 8-field shape record and the 6-field author descriptor are
//! stored as a parenthesized comma list: `(a,b,,"c,d",e)`. An empty
//! field is null. Any field containing a comma, parenthesis, backslash,
//! or double quote is double-quoted, with internal quotes and
//! backslashes escaped by a backslash.

/// Errors produced while decoding a composite tuple.
#[derive(Debug, thiserror::Error)]
pub enum TupleError {
    /// The wire form was not wrapped in parentheses.
    #[error("tuple must be wrapped in parentheses: {0:?}")]
    Delimiters(String),

    /// A double-quoted field was never closed.
    #[error("unterminated quoted field in tuple")]
    UnterminatedQuote,

    /// The tuple did not contain the expected number of fields.
    #[error("expected {expected} tuple fields, found {found}")]
    FieldCount { expected: usize, found: usize },

    /// A field that must be numeric did not parse as a number.
    #[error("field {field} is not numeric: {value:?}")]
    Numeric { field: &'static str, value: String },

    /// A field that must hold JSON did not parse as JSON.
    #[error("field {field} is not valid JSON: {source}")]
    Json {
        field: &'static str,
        source: serde_json::Error,
    },
}

/// Split a wire tuple into raw fields. Empty fields map to `None`.
pub fn split_tuple(wire: &str) -> Result<Vec<Option<String>>, TupleError> {
    let inner = wire
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
        .ok_or_else(|| TupleError::Delimiters(wire.to_string()))?;

    let mut fields = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut in_quotes = false;
    let mut chars = inner.chars();

    while let Some(c) = chars.next() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                // Remember that this field was quoted so `""` survives
                // as an empty string rather than collapsing to null.
                quoted = true;
            }
            '\\' if in_quotes => match chars.next() {
                Some(escaped) => current.push(escaped),
                None => return Err(TupleError::UnterminatedQuote),
            },
            ',' if !in_quotes => {
                fields.push(finish_field(std::mem::take(&mut current), quoted));
                quoted = false;
            }
            _ => current.push(c),
        }
    }

    if in_quotes {
        return Err(TupleError::UnterminatedQuote);
    }
    fields.push(finish_field(current, quoted));

    Ok(fields)
}

/// Join raw fields back into a wire tuple, quoting where required.
pub fn join_tuple(fields: &[Option<&str>]) -> String {
    let mut out = String::from("(");
    for (i, field) in fields.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        if let Some(value) = field {
            if needs_quoting(value) {
                out.push('"');
                for c in value.chars() {
                    if c == '"' || c == '\\' {
                        out.push('\\');
                    }
                    out.push(c);
                }
                out.push('"');
            } else {
                out.push_str(value);
            }
        }
    }
    out.push(')');
    out
}

/// Enforce an exact field count on a decoded tuple.
pub fn expect_fields(
    fields: Vec<Option<String>>,
    expected: usize,
) -> Result<Vec<Option<String>>, TupleError> {
    if fields.len() != expected {
        return Err(TupleError::FieldCount {
            expected,
            found: fields.len(),
        });
    }
    Ok(fields)
}

fn finish_field(raw: String, quoted: bool) -> Option<String> {
    if raw.is_empty() && !quoted {
        None
    } else {
        Some(raw)
    }
}

fn needs_quoting(value: &str) -> bool {
    value.is_empty() || value.contains(['(', ')', ',', '"', '\\'])
}
