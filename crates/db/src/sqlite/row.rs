//! Hilfsfunktionen fuer das Lesen von Zeilen
//!
//! UUIDs und Zeitstempel liegen als TEXT in SQLite.

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row as _;
use uuid::Uuid;

use crate::error::DbError;
use crate::repository::DbResult;

/// Formatiert einen Zeitstempel fuer die Speicherung (RFC3339, Millisekunden)
pub(crate) fn zeitstempel(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub(crate) fn parse_timestamp(s: &str) -> DbResult<DateTime<Utc>> {
    chrono::DateTime::parse_from_rfc3339(s)
        .or_else(|_| {
            // Fallback fuer SQLite datetime()-Format ohne 'T' und 'Z'
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
                .map(|ndt| ndt.and_utc().fixed_offset())
        })
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DbError::intern(format!("Ungueltige Zeitangabe '{s}': {e}")))
}

pub(crate) fn uuid_spalte<T: From<Uuid>>(row: &SqliteRow, spalte: &str) -> DbResult<T> {
    let s: String = row.try_get(spalte)?;
    Uuid::parse_str(&s)
        .map(T::from)
        .map_err(|e| DbError::intern(format!("Ungueltige {spalte} UUID '{s}': {e}")))
}

pub(crate) fn opt_uuid_spalte<T: From<Uuid>>(row: &SqliteRow, spalte: &str) -> DbResult<Option<T>> {
    let s: Option<String> = row.try_get(spalte)?;
    s.as_deref()
        .map(|s| {
            Uuid::parse_str(s)
                .map(T::from)
                .map_err(|e| DbError::intern(format!("Ungueltige {spalte} UUID '{s}': {e}")))
        })
        .transpose()
}

pub(crate) fn zeit_spalte(row: &SqliteRow, spalte: &str) -> DbResult<DateTime<Utc>> {
    let s: String = row.try_get(spalte)?;
    parse_timestamp(&s)
}

pub(crate) fn opt_zeit_spalte(row: &SqliteRow, spalte: &str) -> DbResult<Option<DateTime<Utc>>> {
    let s: Option<String> = row.try_get(spalte)?;
    s.as_deref().map(parse_timestamp).transpose()
}

pub(crate) fn bool_spalte(row: &SqliteRow, spalte: &str) -> DbResult<bool> {
    let v: i64 = row.try_get(spalte)?;
    Ok(v != 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zeitstempel_rundlauf() {
        let jetzt = Utc::now();
        let geparst = parse_timestamp(&zeitstempel(jetzt)).unwrap();
        assert_eq!(geparst.timestamp_millis(), jetzt.timestamp_millis());
    }

    #[test]
    fn sqlite_datetime_format() {
        let dt = parse_timestamp("2024-03-01 12:30:00").unwrap();
        assert_eq!(dt.timestamp(), 1_709_296_200);
    }
}
