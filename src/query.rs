//! Compiled query artifact.

use sea_query::Value;
use serde::ser::{Serialize, SerializeStruct, Serializer};
use std::fmt;

/// Executable query text with its positional `?` values
///
/// Built fresh by every [`QueryAssembler`](crate::QueryAssembler) pass and never
/// mutated afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    text: String,
    values: Vec<Value>,
}

impl Query {
    pub fn new(text: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            text: text.into(),
            values,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn into_parts(self) -> (String, Vec<Value>) {
        (self.text, self.values)
    }

    /// Text with `?` markers rewritten as `$1..$n` for PostgreSQL drivers
    ///
    /// Markers inside single-quoted literals are left alone.
    ///
    /// # Examples
    ///
    /// ```
    /// use sluice::Query;
    ///
    /// let query = Query::new("select * from t x where x.a = ? and x.b = '?' and x.c > ?", vec![]);
    /// assert_eq!(query.numbered(), "select * from t x where x.a = $1 and x.b = '?' and x.c > $2");
    /// ```
    pub fn numbered(&self) -> String {
        number_placeholders(&self.text)
    }
}

pub(crate) fn number_placeholders(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    let mut in_literal = false;
    let mut index = 0usize;
    for c in text.chars() {
        match c {
            '\'' => {
                in_literal = !in_literal;
                out.push(c);
            }
            '?' if !in_literal => {
                index += 1;
                out.push('$');
                out.push_str(&index.to_string());
            }
            _ => out.push(c),
        }
    }
    out
}

/// JSON form of a bound value, used when serializing a [`Query`].
pub(crate) fn value_to_json(value: &Value) -> serde_json::Value {
    use serde_json::Value as Json;
    match value {
        Value::Bool(Some(b)) => Json::from(*b),
        Value::TinyInt(Some(i)) => Json::from(*i),
        Value::SmallInt(Some(i)) => Json::from(*i),
        Value::Int(Some(i)) => Json::from(*i),
        Value::BigInt(Some(i)) => Json::from(*i),
        Value::TinyUnsigned(Some(u)) => Json::from(*u),
        Value::SmallUnsigned(Some(u)) => Json::from(*u),
        Value::Unsigned(Some(u)) => Json::from(*u),
        Value::BigUnsigned(Some(u)) => Json::from(*u),
        Value::Float(Some(f)) => Json::from(*f),
        Value::Double(Some(d)) => Json::from(*d),
        Value::Json(Some(j)) => serde_json::Value::clone(j),
        other => crate::resolve::value_text(other).map_or(Json::Null, Json::String),
    }
}

impl Serialize for Query {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let values: Vec<serde_json::Value> = self.values.iter().map(value_to_json).collect();
        let mut state = serializer.serialize_struct("Query", 2)?;
        state.serialize_field("text", &self.text)?;
        state.serialize_field("values", &values)?;
        state.end()
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_number_placeholders() {
        assert_eq!(number_placeholders("a = ? and b = ?"), "a = $1 and b = $2");
        assert_eq!(number_placeholders("a = '?' or b = ?"), "a = '?' or b = $1");
        assert_eq!(number_placeholders("no markers"), "no markers");
    }

    #[test]
    fn test_serialize_query() {
        let query = Query::new(
            "from Employee e WHERE e.status = ? AND e.age > ?",
            vec![Value::from("ACTIVE"), Value::from(30i32), Value::String(None)],
        );
        let json = serde_json::to_value(&query).unwrap();
        assert_eq!(json["text"], "from Employee e WHERE e.status = ? AND e.age > ?");
        assert_eq!(json["values"], serde_json::json!(["ACTIVE", 30, null]));
    }

    #[test]
    fn test_display_is_text() {
        let query = Query::new("select 1", vec![]);
        assert_eq!(query.to_string(), "select 1");
        assert_eq!(query.into_parts(), ("select 1".to_string(), vec![]));
    }
}
