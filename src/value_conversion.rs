//! Value conversion from bound `sea_query::Value`s to `may_postgres` parameters.
//!
//! Values are first converted into owned, typed parameters; the closure then
//! receives references into that storage, which stay valid for the duration of
//! the call.

use crate::executor::ExecutorError;
use may_postgres::types::ToSql;
use sea_query::Value;

type OwnedParam = Box<dyn ToSql + Sync>;

fn owned<T: ToSql + Sync + 'static>(value: T) -> OwnedParam {
    Box::new(value)
}

fn convert(value: &Value) -> Result<OwnedParam, ExecutorError> {
    let param = match value {
        Value::Bool(b) => owned(*b),
        Value::TinyInt(i) => owned(i.map(i16::from)),
        Value::SmallInt(i) => owned(*i),
        Value::Int(i) => owned(*i),
        Value::BigInt(i) => owned(*i),
        Value::TinyUnsigned(u) => owned(u.map(i16::from)),
        Value::SmallUnsigned(u) => owned(u.map(i32::from)),
        Value::Unsigned(u) => owned(u.map(i64::from)),
        Value::BigUnsigned(Some(u)) => {
            let v = i64::try_from(*u).map_err(|_| {
                ExecutorError::Other(format!(
                    "BigUnsigned value {} exceeds i64::MAX ({}), cannot be safely cast to i64",
                    u,
                    i64::MAX
                ))
            })?;
            owned(Some(v))
        }
        Value::BigUnsigned(None) => owned(None::<i64>),
        Value::Float(f) => owned(*f),
        Value::Double(d) => owned(*d),
        Value::String(s) => owned(s.as_ref().map(|s| s.to_string())),
        Value::Char(c) => owned(c.map(String::from)),
        Value::Bytes(b) => owned(b.as_ref().map(|b| b.to_vec())),
        Value::Json(j) => owned(j.as_ref().map(|j| serde_json::Value::clone(j))),
        Value::ChronoDate(d) => owned(d.as_ref().map(|d| chrono::NaiveDate::clone(d))),
        Value::ChronoTime(t) => owned(t.as_ref().map(|t| chrono::NaiveTime::clone(t))),
        Value::ChronoDateTime(dt) => owned(dt.as_ref().map(|dt| chrono::NaiveDateTime::clone(dt))),
        Value::ChronoDateTimeUtc(dt) => {
            owned(dt.as_ref().map(|dt| chrono::DateTime::<chrono::Utc>::clone(dt)))
        }
        Value::ChronoDateTimeWithTimeZone(dt) => {
            owned(dt.as_ref().map(|dt| chrono::DateTime::<chrono::FixedOffset>::clone(dt)))
        }
        Value::Uuid(u) => owned(u.as_ref().map(|u| uuid::Uuid::clone(u))),
        Value::Decimal(d) => owned(d.as_ref().map(|d| rust_decimal::Decimal::clone(d))),
        _ => {
            return Err(ExecutorError::Other(format!(
                "Unsupported value type in query: {:?}",
                value
            )));
        }
    };
    Ok(param)
}

/// Convert bound values to `may_postgres` parameters and run `f` with them.
///
/// # Errors
///
/// Returns `ExecutorError::Other` if an unsupported value type is encountered,
/// otherwise whatever `f` returns.
pub fn with_converted_params<F, R>(values: &[Value], f: F) -> Result<R, ExecutorError>
where
    F: FnOnce(&[&dyn ToSql]) -> Result<R, ExecutorError>,
{
    let storage = values.iter().map(convert).collect::<Result<Vec<_>, _>>()?;
    let params: Vec<&dyn ToSql> = storage.iter().map(|p| p.as_ref() as &dyn ToSql).collect();
    f(&params)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_converts_every_bound_value() {
        let values = vec![
            Value::from("ACTIVE"),
            Value::from(42i32),
            Value::from(7i64),
            Value::from(true),
            Value::from(NaiveDate::from_ymd_opt(2024, 1, 31).unwrap()),
            Value::String(None),
        ];
        let count = with_converted_params(&values, |params| Ok(params.len())).unwrap();
        assert_eq!(count, 6);
    }

    #[test]
    fn test_big_unsigned_overflow_is_rejected() {
        let values = vec![Value::BigUnsigned(Some(u64::MAX))];
        let result = with_converted_params(&values, |_| Ok(()));
        assert!(matches!(result, Err(ExecutorError::Other(_))));
    }

    #[test]
    fn test_closure_error_propagates() {
        let result: Result<(), _> =
            with_converted_params(&[], |_| Err(ExecutorError::QueryError("boom".to_string())));
        assert!(matches!(result, Err(ExecutorError::QueryError(_))));
    }
}
