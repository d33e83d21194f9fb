//! A timestamp that tolerates the loose date text found in flight feeds.
//!
//! Two codecs are exposed. The document codec reads RFC 3339 strings and maps
//! the `"0000-00-00"` and empty sentinels to the zero instant. The storage codec
//! reads SQL column values, where dates are stored as plain `YYYY-MM-DD` text.
//! Both write RFC 3339 back out.

use crate::util::fmt::ErrorChainDisplay;
use chrono::{
    DateTime, FixedOffset, NaiveDate, NaiveTime, ParseError, SecondsFormat, TimeZone, Timelike,
};
use log::warn;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, Value, ValueRef};
use serde::{de::Error as _, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Display, Formatter};

const ZERO_DATE_SENTINEL: &str = "0000-00-00";
const STORAGE_DATE_FORMAT: &str = "%Y-%m-%d";

/// A timestamp conversion error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("malformed timestamp '{value}'")]
    MalformedTimestamp {
        value: String,
        #[source]
        source: Option<ParseError>,
    },
    #[error("unsupported storage value of kind '{0}'")]
    UnsupportedStorageValue(&'static str),
}

/// A column value as handed over by a storage layer.
#[derive(Clone, Debug, PartialEq)]
pub enum StorageValue {
    Null,
    Instant(DateTime<FixedOffset>),
    Bytes(Vec<u8>),
    Text(String),
    Integer(i64),
    Real(f64),
}

impl StorageValue {
    /// Returns a short name of the value kind.
    pub fn kind(&self) -> &'static str {
        match self {
            StorageValue::Null => "null",
            StorageValue::Instant(_) => "instant",
            StorageValue::Bytes(_) => "bytes",
            StorageValue::Text(_) => "text",
            StorageValue::Integer(_) => "integer",
            StorageValue::Real(_) => "real",
        }
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for StorageValue {
    fn from(value: DateTime<Tz>) -> Self {
        StorageValue::Instant(value.fixed_offset())
    }
}

impl<'a> From<ValueRef<'a>> for StorageValue {
    fn from(value: ValueRef<'a>) -> Self {
        match value {
            ValueRef::Null => StorageValue::Null,
            ValueRef::Integer(i) => StorageValue::Integer(i),
            ValueRef::Real(r) => StorageValue::Real(r),
            ValueRef::Text(t) => match std::str::from_utf8(t) {
                Ok(s) => StorageValue::Text(s.to_owned()),
                Err(_) => StorageValue::Bytes(t.to_vec()),
            },
            ValueRef::Blob(b) => StorageValue::Bytes(b.to_vec()),
        }
    }
}

/// A point in time, or the zero instant when the source had no usable value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct FlexibleTimestamp {
    instant: DateTime<FixedOffset>,
}

impl FlexibleTimestamp {
    /// Returns the zero instant, `0001-01-01T00:00:00Z`.
    pub fn zero() -> Self {
        let instant = NaiveDate::from_ymd_opt(1, 1, 1)
            .unwrap_or_default()
            .and_time(NaiveTime::default())
            .and_utc()
            .fixed_offset();
        Self { instant }
    }

    pub fn instant(&self) -> DateTime<FixedOffset> {
        self.instant
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::zero()
    }

    /// Parses a document field (the string inside JSON quotes).
    ///
    /// Empty text and `"0000-00-00"` produce the zero instant. Anything else
    /// must be RFC 3339; failures are logged before being returned.
    pub fn parse_document_field(text: &str) -> Result<Self, Error> {
        if text.is_empty() || text == ZERO_DATE_SENTINEL {
            return Ok(Self::zero());
        }

        let parsed = match DateTime::parse_from_rfc3339(text) {
            // chrono also takes a space separator and a leap second.
            Ok(instant)
                if matches!(text.as_bytes().get(10), Some(b'T' | b't'))
                    && instant.nanosecond() < 1_000_000_000 =>
            {
                Ok(instant)
            }
            Ok(_) => Err(malformed(text, None)),
            Err(source) => Err(malformed(text, Some(source))),
        };

        match parsed {
            Ok(instant) => Ok(Self { instant }),
            Err(err) => {
                warn!("failed to parse document timestamp: {}", ErrorChainDisplay(&err));
                Err(err)
            }
        }
    }

    /// Renders the instant for a document field.
    pub fn to_document_text(&self) -> String {
        self.to_rfc3339()
    }

    /// Converts a storage column value.
    ///
    /// Text and bytes are read as a bare `YYYY-MM-DD` date at midnight UTC.
    pub fn from_storage_value(value: StorageValue) -> Result<Self, Error> {
        match value {
            StorageValue::Null => Ok(Self::zero()),
            StorageValue::Instant(instant) => Ok(Self { instant }),
            StorageValue::Bytes(bytes) => Self::parse_storage_date(&String::from_utf8_lossy(&bytes)),
            StorageValue::Text(text) => Self::parse_storage_date(&text),
            other => Err(Error::UnsupportedStorageValue(other.kind())),
        }
    }

    /// Renders the instant for a storage column.
    ///
    /// The zero instant is written as is, so it does not read back as null.
    pub fn to_storage_text(&self) -> String {
        self.to_rfc3339()
    }

    fn parse_storage_date(text: &str) -> Result<Self, Error> {
        let date = NaiveDate::parse_from_str(text, STORAGE_DATE_FORMAT)
            .map_err(|source| malformed(text, Some(source)))?;
        if !is_storage_date_shape(text) {
            return Err(malformed(text, None));
        }
        let instant = date.and_time(NaiveTime::default()).and_utc().fixed_offset();
        Ok(Self { instant })
    }

    fn to_rfc3339(&self) -> String {
        self.instant.to_rfc3339_opts(SecondsFormat::AutoSi, true)
    }
}

fn malformed(text: &str, source: Option<ParseError>) -> Error {
    Error::MalformedTimestamp {
        value: text.to_owned(),
        source,
    }
}

/// Checks for exactly `DDDD-DD-DD`; chrono alone allows fewer digits, signs and padding.
fn is_storage_date_shape(text: &str) -> bool {
    let bytes = text.as_bytes();
    bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        })
}

impl Default for FlexibleTimestamp {
    fn default() -> Self {
        Self::zero()
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for FlexibleTimestamp {
    fn from(value: DateTime<Tz>) -> Self {
        Self {
            instant: value.fixed_offset(),
        }
    }
}

impl Display for FlexibleTimestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_rfc3339())
    }
}

impl Serialize for FlexibleTimestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_document_text())
    }
}

impl<'de> Deserialize<'de> for FlexibleTimestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // JSON null reads as an empty field.
        let text = match Option::<String>::deserialize(deserializer) {
            Ok(text) => text.unwrap_or_default(),
            Err(err) => {
                warn!("failed to parse document timestamp: {err}");
                return Err(err);
            }
        };
        Self::parse_document_field(&text).map_err(D::Error::custom)
    }
}

impl FromSql for FlexibleTimestamp {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        Self::from_storage_value(value.into()).map_err(|err| FromSqlError::Other(Box::new(err)))
    }
}

impl ToSql for FlexibleTimestamp {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::Owned(Value::Text(self.to_storage_text())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Utc};
    use rusqlite::Connection;

    const ZERO_TEXT: &str = "0001-01-01T00:00:00Z";

    fn query_column(sql: &str) -> rusqlite::Result<FlexibleTimestamp> {
        let conn = Connection::open_in_memory()?;
        conn.query_row(sql, [], |row| row.get(0))
    }

    fn conversion_error(result: rusqlite::Result<FlexibleTimestamp>) -> Error {
        match result {
            Err(rusqlite::Error::FromSqlConversionFailure(_, _, err)) => {
                match err.downcast::<Error>() {
                    Ok(err) => *err,
                    Err(err) => panic!("unexpected error {err}"),
                }
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn test_zero_instant() {
        let zero = FlexibleTimestamp::zero();
        assert!(zero.is_zero());
        assert_eq!(zero, FlexibleTimestamp::default());
        assert_eq!(zero.instant().year(), 1);
        assert_eq!(zero.to_string(), ZERO_TEXT);
    }

    #[test]
    fn test_document_sentinels() {
        for text in ["", "0000-00-00"] {
            let ts = FlexibleTimestamp::parse_document_field(text).unwrap();
            assert!(ts.is_zero(), "{text:?} should be zero");
        }
    }

    #[test]
    fn test_document_rfc3339() {
        let samples = [
            "2024-01-02T15:04:05Z",
            "2024-01-02T15:04:05+02:00",
            "2023-12-31T23:59:59.123456-07:30",
            "1999-02-28T00:00:00.5Z",
        ];
        for text in samples {
            let ts = FlexibleTimestamp::parse_document_field(text).unwrap();
            let expected = DateTime::parse_from_rfc3339(text).unwrap();
            assert_eq!(ts.instant(), expected);
            assert!(!ts.is_zero());

            let written = ts.to_storage_text();
            assert_eq!(DateTime::parse_from_rfc3339(&written).unwrap(), expected);
        }
    }

    #[test]
    fn test_document_keeps_offset() {
        let ts = FlexibleTimestamp::parse_document_field("2024-01-02T15:04:05+02:00").unwrap();
        assert_eq!(ts.instant().offset().local_minus_utc(), 2 * 3600);
        assert_eq!(ts.to_document_text(), "2024-01-02T15:04:05+02:00");
    }

    #[test]
    fn test_document_malformed() {
        let samples = [
            "2024-01-02",
            "0000-00-00T00:00:00Z",
            "2024-13-01T00:00:00Z",
            "2024-01-02T15:04:05",
            "tomorrow",
            " ",
            "0000-00-00 ",
            "2024-01-02 15:04:05Z",
            "2024-01-02T15:04:60Z",
            "2024-01-02T23:59:60.5+01:00",
        ];
        for text in samples {
            let err = FlexibleTimestamp::parse_document_field(text).unwrap_err();
            assert!(
                matches!(&err, Error::MalformedTimestamp { value, .. } if value == text),
                "{text:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn test_json_field() {
        #[derive(Debug, Deserialize, Serialize)]
        struct Record {
            #[serde(default)]
            flight_date: FlexibleTimestamp,
        }

        let record: Record = serde_json::from_str(r#"{"flight_date": "0000-00-00"}"#).unwrap();
        assert!(record.flight_date.is_zero());

        // Zero does not write back as the sentinel or as an empty string.
        assert_eq!(record.flight_date.to_storage_text(), ZERO_TEXT);
        assert_eq!(
            serde_json::to_string(&record).unwrap(),
            format!(r#"{{"flight_date":"{ZERO_TEXT}"}}"#)
        );

        let record: Record = serde_json::from_str(r#"{"flight_date": null}"#).unwrap();
        assert!(record.flight_date.is_zero());

        let record: Record = serde_json::from_str("{}").unwrap();
        assert!(record.flight_date.is_zero());

        let record: Record =
            serde_json::from_str(r#"{"flight_date": "2024-01-02T15:04:05Z"}"#).unwrap();
        assert_eq!(record.flight_date.instant().hour(), 15);

        let err = serde_json::from_str::<Record>(r#"{"flight_date": "02/01/2024"}"#).unwrap_err();
        assert!(err.to_string().contains("malformed timestamp '02/01/2024'"));

        assert!(serde_json::from_str::<Record>(r#"{"flight_date": 20240102}"#).is_err());
    }

    #[test]
    fn test_storage_null() {
        let ts = FlexibleTimestamp::from_storage_value(StorageValue::Null).unwrap();
        assert!(ts.is_zero());
    }

    #[test]
    fn test_storage_instant() {
        let instant = DateTime::parse_from_rfc3339("2024-03-15T08:30:00-05:00").unwrap();
        let ts = FlexibleTimestamp::from_storage_value(instant.into()).unwrap();
        assert_eq!(ts.instant(), instant);
        assert_eq!(ts.instant().offset(), instant.offset());

        let now = Utc::now();
        let ts = FlexibleTimestamp::from_storage_value(now.into()).unwrap();
        assert_eq!(ts.instant(), now);
    }

    #[test]
    fn test_storage_date_text() {
        for value in [
            StorageValue::Text("2024-03-15".to_owned()),
            StorageValue::Bytes(b"2024-03-15".to_vec()),
        ] {
            let ts = FlexibleTimestamp::from_storage_value(value).unwrap();
            let instant = ts.instant();
            assert_eq!((instant.year(), instant.month(), instant.day()), (2024, 3, 15));
            assert_eq!(instant.time(), NaiveTime::default());
            assert_eq!(ts.to_storage_text(), "2024-03-15T00:00:00Z");
        }
    }

    #[test]
    fn test_storage_malformed() {
        for value in [
            StorageValue::Text("0000-00-00".to_owned()),
            StorageValue::Text(String::new()),
            StorageValue::Text("2024-03-15T00:00:00Z".to_owned()),
            StorageValue::Bytes(vec![0xff, 0xfe]),
            StorageValue::Text("24-03-15".to_owned()),
            StorageValue::Text("2024-3-15".to_owned()),
            StorageValue::Text("+2024-03-15".to_owned()),
            StorageValue::Text(" 2024-03-15".to_owned()),
            StorageValue::Bytes(b"2024-03-5 ".to_vec()),
        ] {
            let err = FlexibleTimestamp::from_storage_value(value).unwrap_err();
            assert!(matches!(err, Error::MalformedTimestamp { .. }), "{err:?}");
        }
    }

    #[test]
    fn test_storage_unsupported() {
        let err = FlexibleTimestamp::from_storage_value(StorageValue::Integer(20240315)).unwrap_err();
        assert!(matches!(err, Error::UnsupportedStorageValue("integer")));

        let err = FlexibleTimestamp::from_storage_value(StorageValue::Real(1.5)).unwrap_err();
        assert!(matches!(err, Error::UnsupportedStorageValue("real")));
    }

    #[test]
    fn test_sqlite_columns() {
        assert!(query_column("SELECT NULL").unwrap().is_zero());

        let ts = query_column("SELECT '2024-03-15'").unwrap();
        assert_eq!(ts.to_string(), "2024-03-15T00:00:00Z");

        let ts = query_column("SELECT CAST('2024-03-15' AS BLOB)").unwrap();
        assert_eq!(ts.to_string(), "2024-03-15T00:00:00Z");

        let err = conversion_error(query_column("SELECT 42"));
        assert!(matches!(err, Error::UnsupportedStorageValue("integer")));

        let err = conversion_error(query_column("SELECT 'soon'"));
        assert!(matches!(err, Error::MalformedTimestamp { value, .. } if value == "soon"));
    }

    #[test]
    fn test_sqlite_write() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute("CREATE TABLE flights (created_at TEXT)", []).unwrap();

        let ts = FlexibleTimestamp::parse_document_field("2024-01-02T15:04:05Z").unwrap();
        conn.execute("INSERT INTO flights VALUES (?1)", [&ts]).unwrap();
        conn.execute("INSERT INTO flights VALUES (?1)", [&FlexibleTimestamp::zero()])
            .unwrap();

        let mut stmt = conn.prepare("SELECT created_at FROM flights").unwrap();
        let stored: Vec<String> = stmt
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(stored, ["2024-01-02T15:04:05Z", ZERO_TEXT]);

        // Written text is RFC 3339 while the column reader expects a bare date.
        let err = conversion_error(conn.query_row(
            "SELECT created_at FROM flights LIMIT 1",
            [],
            |row| row.get::<_, FlexibleTimestamp>(0),
        ));
        assert!(matches!(err, Error::MalformedTimestamp { .. }));
    }
}
