//! Typed cell values and their Sheets API encoding.
//!
//! Dates and date-times are written as serial numbers (days since
//! 1899-12-30) with a number format attached, which is how Sheets stores
//! them internally. Zoned date-times are first shifted into the
//! spreadsheet's own time zone so the cell shows the wall-clock time a
//! user of that spreadsheet would expect.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use chrono_tz::Tz;
use indexmap::IndexMap;

use crate::sheets::types::{CellData, CellFormat, ExtendedValue, NumberFormat, NumberFormatType};

/// An ordered mapping of field name to value.
pub type Row = IndexMap<String, CellValue>;

const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Largest integer magnitude an f64 represents exactly.
const MAX_EXACT_INTEGER: u64 = 1 << 53;

/// A value destined for a single spreadsheet cell.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    /// Written as an empty cell rather than any textual rendering.
    Null,
    String(String),
    Bool(bool),
    /// Written as a number while it fits a double exactly, as text beyond
    /// 2^53 so no digits are lost.
    Integer(i64),
    Number(f64),
    Date(NaiveDate),
    /// Wall-clock date-time, written as-is.
    DateTime(NaiveDateTime),
    /// Date-time with an offset, converted to the spreadsheet zone on write.
    ZonedDateTime(DateTime<FixedOffset>),
    /// Nested mapping. Flattened into `parent[child]` columns before encoding.
    Map(Row),
    List(Vec<CellValue>),
}

impl CellValue {
    /// Encode this value as a cell for `appendCells`/`updateCells`.
    ///
    /// `tz` is the spreadsheet time zone, used only for zoned date-times.
    pub fn to_cell_data(&self, tz: &Tz) -> CellData {
        match self {
            CellValue::Null => CellData::plain(ExtendedValue::StringValue(String::new())),
            CellValue::String(s) => CellData::plain(ExtendedValue::StringValue(s.clone())),
            CellValue::Bool(b) => CellData::plain(ExtendedValue::BoolValue(*b)),
            CellValue::Integer(n) if n.unsigned_abs() <= MAX_EXACT_INTEGER => {
                CellData::plain(ExtendedValue::NumberValue(*n as f64))
            }
            CellValue::Integer(n) => CellData::plain(ExtendedValue::StringValue(n.to_string())),
            CellValue::Number(n) if n.is_finite() => {
                CellData::plain(ExtendedValue::NumberValue(*n))
            }
            CellValue::Number(n) => CellData::plain(ExtendedValue::StringValue(n.to_string())),
            CellValue::Date(d) => CellData::formatted(
                ExtendedValue::NumberValue(serial_date(*d) as f64),
                NumberFormatType::Date,
            ),
            CellValue::DateTime(dt) => CellData::formatted(
                ExtendedValue::NumberValue(serial_datetime(*dt)),
                NumberFormatType::DateTime,
            ),
            CellValue::ZonedDateTime(dt) => {
                let local = tz.from_utc_datetime(&dt.naive_utc()).naive_local();
                CellData::formatted(
                    ExtendedValue::NumberValue(serial_datetime(local)),
                    NumberFormatType::DateTime,
                )
            }
            CellValue::Map(_) | CellValue::List(_) => {
                CellData::plain(ExtendedValue::StringValue(self.to_json().to_string()))
            }
        }
    }

    /// Convert a JSON value into a cell value.
    ///
    /// With `detect_dates`, strings in RFC 3339 or `YYYY-MM-DD` form become
    /// date cells instead of text.
    pub fn from_json(value: serde_json::Value, detect_dates: bool) -> Self {
        match value {
            serde_json::Value::Null => CellValue::Null,
            serde_json::Value::Bool(b) => CellValue::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => CellValue::Integer(i),
                None => CellValue::Number(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => {
                if detect_dates {
                    if let Some(date_value) = parse_date_string(&s) {
                        return date_value;
                    }
                }
                CellValue::String(s)
            }
            serde_json::Value::Array(items) => CellValue::List(
                items
                    .into_iter()
                    .map(|v| CellValue::from_json(v, detect_dates))
                    .collect(),
            ),
            serde_json::Value::Object(map) => CellValue::Map(
                map.into_iter()
                    .map(|(k, v)| (k, CellValue::from_json(v, detect_dates)))
                    .collect(),
            ),
        }
    }

    /// JSON rendering, used when a composite value lands in a single cell.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            CellValue::Null => serde_json::Value::Null,
            CellValue::String(s) => serde_json::Value::String(s.clone()),
            CellValue::Bool(b) => serde_json::Value::Bool(*b),
            CellValue::Integer(n) => serde_json::Value::from(*n),
            CellValue::Number(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or_else(|| serde_json::Value::String(n.to_string())),
            CellValue::Date(d) => serde_json::Value::String(d.to_string()),
            CellValue::DateTime(dt) => serde_json::Value::String(dt.to_string()),
            CellValue::ZonedDateTime(dt) => serde_json::Value::String(dt.to_rfc3339()),
            CellValue::Map(map) => serde_json::Value::Object(
                map.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
            CellValue::List(items) => {
                serde_json::Value::Array(items.iter().map(CellValue::to_json).collect())
            }
        }
    }
}

fn parse_date_string(s: &str) -> Option<CellValue> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(CellValue::ZonedDateTime(dt));
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(CellValue::DateTime(dt));
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .map(CellValue::Date)
}

fn epoch_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1899, 12, 30).unwrap_or(NaiveDate::MIN)
}

/// Whole days between the Sheets epoch and `date`.
pub fn serial_date(date: NaiveDate) -> i64 {
    (date - epoch_date()).num_days()
}

/// Fractional days between the Sheets epoch and `value`.
pub fn serial_datetime(value: NaiveDateTime) -> f64 {
    let epoch = epoch_date().and_time(NaiveTime::MIN);
    (value - epoch).num_milliseconds() as f64 / MILLIS_PER_DAY
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        CellValue::String(value.to_string())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        CellValue::String(value)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Bool(value)
    }
}

impl From<i32> for CellValue {
    fn from(value: i32) -> Self {
        CellValue::Integer(value.into())
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Integer(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<NaiveDate> for CellValue {
    fn from(value: NaiveDate) -> Self {
        CellValue::Date(value)
    }
}

impl From<NaiveDateTime> for CellValue {
    fn from(value: NaiveDateTime) -> Self {
        CellValue::DateTime(value)
    }
}

impl<Z: TimeZone> From<DateTime<Z>> for CellValue {
    fn from(value: DateTime<Z>) -> Self {
        CellValue::ZonedDateTime(value.fixed_offset())
    }
}

impl From<Row> for CellValue {
    fn from(value: Row) -> Self {
        CellValue::Map(value)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(CellValue::Null)
    }
}

impl From<serde_json::Value> for CellValue {
    fn from(value: serde_json::Value) -> Self {
        CellValue::from_json(value, false)
    }
}

impl CellData {
    fn plain(value: ExtendedValue) -> Self {
        Self {
            user_entered_value: value,
            user_entered_format: None,
        }
    }

    fn formatted(value: ExtendedValue, kind: NumberFormatType) -> Self {
        Self {
            user_entered_value: value,
            user_entered_format: Some(CellFormat {
                number_format: NumberFormat { kind },
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn encode(value: CellValue) -> serde_json::Value {
        serde_json::to_value(value.to_cell_data(&chrono_tz::America::Vancouver)).unwrap()
    }

    #[test]
    fn test_scalar_encoding() {
        assert_eq!(
            encode("hello".into()),
            json!({"userEnteredValue": {"stringValue": "hello"}})
        );
        assert_eq!(
            encode(true.into()),
            json!({"userEnteredValue": {"boolValue": true}})
        );
        assert_eq!(
            encode(42i64.into()),
            json!({"userEnteredValue": {"numberValue": 42.0}})
        );
        assert_eq!(
            encode(1.5.into()),
            json!({"userEnteredValue": {"numberValue": 1.5}})
        );
    }

    #[test]
    fn test_null_is_empty_string() {
        assert_eq!(
            encode(CellValue::Null),
            json!({"userEnteredValue": {"stringValue": ""}})
        );
        assert_eq!(
            encode(Option::<i64>::None.into()),
            json!({"userEnteredValue": {"stringValue": ""}})
        );
    }

    #[test]
    fn test_large_integers_keep_every_digit() {
        assert_eq!(
            encode(9_007_199_254_740_992i64.into()),
            json!({"userEnteredValue": {"numberValue": 9007199254740992.0}})
        );
        assert_eq!(
            encode(9_007_199_254_740_993i64.into()),
            json!({"userEnteredValue": {"stringValue": "9007199254740993"}})
        );
        assert_eq!(
            encode(i64::MIN.into()),
            json!({"userEnteredValue": {"stringValue": "-9223372036854775808"}})
        );
    }

    #[test]
    fn test_non_finite_number_falls_back_to_text() {
        assert_eq!(
            encode(f64::NAN.into()),
            json!({"userEnteredValue": {"stringValue": "NaN"}})
        );
    }

    #[test]
    fn test_date_encoding() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(serial_date(date), 45306);
        assert_eq!(
            encode(date.into()),
            json!({
                "userEnteredFormat": {"numberFormat": {"type": "DATE"}},
                "userEnteredValue": {"numberValue": 45306.0}
            })
        );
    }

    #[test]
    fn test_serial_epoch_and_known_values() {
        assert_eq!(serial_date(NaiveDate::from_ymd_opt(1899, 12, 30).unwrap()), 0);
        assert_eq!(serial_date(NaiveDate::from_ymd_opt(1900, 1, 1).unwrap()), 2);
        assert_eq!(serial_date(NaiveDate::from_ymd_opt(1899, 12, 29).unwrap()), -1);
    }

    #[test]
    fn test_naive_datetime_encoding() {
        let dt = NaiveDate::from_ymd_opt(2024, 1, 15)
            .unwrap()
            .and_hms_opt(18, 0, 0)
            .unwrap();
        assert_eq!(serial_datetime(dt), 45306.75);
        assert_eq!(
            encode(dt.into()),
            json!({
                "userEnteredFormat": {"numberFormat": {"type": "DATE_TIME"}},
                "userEnteredValue": {"numberValue": 45306.75}
            })
        );
    }

    #[test]
    fn test_zoned_datetime_converted_to_sheet_zone() {
        // 20:00 UTC in January is 12:00 in Vancouver (UTC-8).
        let utc = Utc.with_ymd_and_hms(2024, 1, 15, 20, 0, 0).unwrap();
        let encoded = encode(utc.into());
        assert_eq!(encoded["userEnteredValue"]["numberValue"], json!(45306.5));
        assert_eq!(
            encoded["userEnteredFormat"]["numberFormat"]["type"],
            json!("DATE_TIME")
        );

        let tokyo = chrono_tz::Asia::Tokyo;
        let cell = CellValue::from(utc).to_cell_data(&tokyo);
        // 20:00 UTC is 05:00 the next day in Tokyo.
        let ExtendedValue::NumberValue(serial) = cell.user_entered_value else {
            panic!("expected number");
        };
        assert!((serial - (45307.0 + 5.0 / 24.0)).abs() < 1e-9);
    }

    #[test]
    fn test_composite_values_render_as_json_text() {
        let list = CellValue::List(vec![1i64.into(), "two".into()]);
        assert_eq!(
            encode(list),
            json!({"userEnteredValue": {"stringValue": "[1,\"two\"]"}})
        );
    }

    #[test]
    fn test_from_json() {
        let value = CellValue::from(json!({"a": 1, "b": [true, null], "c": 2.5}));
        let CellValue::Map(map) = value else {
            panic!("expected map");
        };
        assert_eq!(map["a"], CellValue::Integer(1));
        assert_eq!(
            map["b"],
            CellValue::List(vec![CellValue::Bool(true), CellValue::Null])
        );
        assert_eq!(map["c"], CellValue::Number(2.5));
    }

    #[test]
    fn test_from_json_detect_dates() {
        assert_eq!(
            CellValue::from_json(json!("2024-01-15"), true),
            CellValue::Date(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap())
        );
        assert!(matches!(
            CellValue::from_json(json!("2024-01-15T10:00:00Z"), true),
            CellValue::ZonedDateTime(_)
        ));
        assert!(matches!(
            CellValue::from_json(json!("2024-01-15T10:00:00"), true),
            CellValue::DateTime(_)
        ));
        assert_eq!(
            CellValue::from_json(json!("2024-01-15"), false),
            CellValue::String("2024-01-15".to_string())
        );
        assert_eq!(
            CellValue::from_json(json!("not a date"), true),
            CellValue::String("not a date".to_string())
        );
    }
}
