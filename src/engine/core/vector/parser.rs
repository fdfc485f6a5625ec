use crate::engine::errors::ReduceError;
use crate::engine::types::FieldValue;

/// Parser for string-encoded numeric lists such as `"[1, 4, 532.2]"`.
pub struct VectorParser;

impl VectorParser {
    /// Parse a bracketed, comma-separated list of numeric literals.
    ///
    /// `"[]"` is the empty vector. Every token must be a finite number;
    /// empty tokens (`"[1,,2]"`, `"[1,]"`) are rejected.
    pub fn parse(input: &str) -> Result<Vec<f64>, ReduceError> {
        let s = input.trim();
        let inner = s
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
            .ok_or_else(|| {
                ReduceError::VectorParse(format!("expected a bracketed list, got '{input}'"))
            })?;

        if inner.contains(['[', ']']) {
            return Err(ReduceError::VectorParse(format!(
                "nested brackets are not supported: '{input}'"
            )));
        }

        let inner = inner.trim();
        if inner.is_empty() {
            return Ok(Vec::new());
        }

        inner
            .split(',')
            .enumerate()
            .map(|(idx, token)| {
                let token = token.trim();
                match token.parse::<f64>() {
                    Ok(v) if v.is_finite() => Ok(v),
                    _ => Err(ReduceError::VectorParse(format!(
                        "token {idx} '{token}' is not a number in '{input}'"
                    ))),
                }
            })
            .collect()
    }

    /// Vector carried by a field: native lists pass through, strings are parsed.
    pub fn from_field(value: &FieldValue) -> Result<Vec<f64>, ReduceError> {
        match value {
            FieldValue::List(values) => Ok(values.clone()),
            FieldValue::Str(s) => Self::parse(s),
            other => Err(ReduceError::VectorParse(format!(
                "expected a list, found {}",
                other.kind()
            ))),
        }
    }
}

/// Elementwise `acc += v`; lengths must match.
pub fn add_assign(acc: &mut [f64], v: &[f64]) -> Result<(), (usize, usize)> {
    if acc.len() != v.len() {
        return Err((acc.len(), v.len()));
    }
    for (a, b) in acc.iter_mut().zip(v) {
        *a += b;
    }
    Ok(())
}
