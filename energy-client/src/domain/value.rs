use std::{borrow::Cow, cmp::Ordering};

use serde::{Deserialize, Serialize, Serializer};

/// A single cell read out of a row.
///
/// Missing numeric cells are `Number(NaN)`; they serialize as `null`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Number(f64),
    Text(String),
}

impl Value {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Text(s) => s.trim().parse().ok(),
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Number(n) if n.is_nan())
    }

    /// String form used by substring/prefix tests, lexical comparison and
    /// grouping keys.
    pub fn to_text(&self) -> Cow<'_, str> {
        match self {
            Value::Number(n) => Cow::Owned(format_number(*n)),
            Value::Text(s) => Cow::Borrowed(s),
        }
    }

    /// Ordering used by the table sort. Missing values are not handled here;
    /// callers place them last for either direction.
    pub fn cmp_present(&self, other: &Value) -> Ordering {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a.total_cmp(b),
            _ => self.to_text().cmp(&other.to_text()),
        }
    }
}

/// Integral values print without a fraction (`2018`, `103`); NaN prints empty.
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        String::new()
    } else if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Number(n) if n.is_finite() => serializer.serialize_f64(*n),
            Value::Number(_) => serializer.serialize_none(),
            Value::Text(s) => serializer.serialize_str(s),
        }
    }
}

impl From<Value> for serde_json::Value {
    fn from(v: Value) -> Self {
        match v {
            Value::Number(n) => serde_json::Number::from_f64(n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Text(s) => serde_json::Value::String(s),
        }
    }
}

/// A literal fixed at parse time: either numeric or text, never re-inferred.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Number(f64),
    Text(String),
}

impl Literal {
    pub fn to_text(&self) -> Cow<'_, str> {
        match self {
            Literal::Number(n) => Cow::Owned(format_number(*n)),
            Literal::Text(s) => Cow::Borrowed(s),
        }
    }
}

impl std::fmt::Display for Literal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_render_like_the_dashboard() {
        assert_eq!(format_number(2018.0), "2018");
        assert_eq!(format_number(-3.0), "-3");
        assert_eq!(format_number(12.5), "12.5");
        assert_eq!(format_number(f64::NAN), "");
    }

    #[test]
    fn nan_serializes_as_null() {
        let json =
            serde_json::to_string(&vec![Value::Number(f64::NAN), Value::Number(1.5)]).unwrap();
        assert_eq!(json, "[null,1.5]");
        assert_eq!(serde_json::Value::from(Value::Number(f64::NAN)), serde_json::Value::Null);
    }

    #[test]
    fn literal_accepts_number_or_string() {
        let lits: Vec<Literal> = serde_json::from_str(r#"[3, "MANHATTAN"]"#).unwrap();
        assert_eq!(lits, vec![Literal::Number(3.0), Literal::Text("MANHATTAN".into())]);
    }
}
