//! Value coercion used by ordering comparisons and projection setters.

use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;

use crate::{
    error::{HefestoError, Result},
    value::{Value, ValueType},
};

const DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Converts `value` into an instance of `target`.
///
/// A value that already has the target type is returned unchanged. Anything else goes through
/// its string form, so `cast_value(ValueType::Long, &"42".into())` yields `Value::Long(42)`.
/// Null, lists, records and opaque objects cannot be cast.
pub fn cast_value(target: ValueType, value: &Value) -> Result<Value> {
    if value.value_type() == Some(target) {
        return Ok(value.clone());
    }

    if value.value_type().is_none() {
        return Err(HefestoError::UnsupportedCast(format!(
            "{} from {}",
            target,
            value.type_name()
        )));
    }

    let raw = value.to_string();
    let text = raw.trim();
    let failed = || HefestoError::Coercion {
        value: raw.clone(),
        target,
    };

    let cast = match target {
        ValueType::String => Value::String(raw.clone()),
        ValueType::Byte => Value::Byte(text.parse().map_err(|_| failed())?),
        ValueType::Short => Value::Short(text.parse().map_err(|_| failed())?),
        ValueType::Int => Value::Int(text.parse().map_err(|_| failed())?),
        ValueType::Long => Value::Long(text.parse().map_err(|_| failed())?),
        ValueType::Float => Value::Float(text.parse().map_err(|_| failed())?),
        ValueType::Double => Value::Double(text.parse().map_err(|_| failed())?),
        ValueType::BigInteger => Value::BigInteger(text.parse().map_err(|_| failed())?),
        ValueType::Decimal => Value::Decimal(
            Decimal::from_str(text)
                .or_else(|_| Decimal::from_scientific(text))
                .map_err(|_| failed())?,
        ),
        ValueType::Bool => Value::Bool(text.eq_ignore_ascii_case("true")),
        ValueType::Char => Value::Char(raw.chars().next().ok_or_else(failed)?),
        ValueType::Date => match value {
            Value::DateTime(dt) => Value::Date(dt.date()),
            _ => Value::Date(NaiveDate::parse_from_str(text, "%Y-%m-%d").map_err(|_| failed())?),
        },
        ValueType::DateTime => match value {
            Value::Date(date) => Value::DateTime(date.and_hms_opt(0, 0, 0).ok_or_else(failed)?),
            _ => Value::DateTime(parse_datetime(text).ok_or_else(failed)?),
        },
    };

    Ok(cast)
}

fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(text, "%Y-%m-%d")
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}
