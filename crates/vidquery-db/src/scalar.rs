//! Single-value query results
//!
//! Generated analytics queries return one row with one column. The column
//! type depends on the aggregate the model picked (`COUNT` gives `INT8`,
//! `SUM` over integers gives `NUMERIC`, `AVG` gives `NUMERIC`, and so on), so
//! the value is decoded by inspecting the column's Postgres type.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;
use sqlx::{Column, Row, TypeInfo};
use uuid::Uuid;

use crate::{DbError, DbResult};

/// A decoded scalar from the first column of a result row
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Int(i64),
    Float(f64),
    Decimal(Decimal),
    Bool(bool),
    Text(String),
    Uuid(Uuid),
    Timestamp(DateTime<Utc>),
    NaiveTimestamp(NaiveDateTime),
    Date(NaiveDate),
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{}", v),
            Self::Float(v) if v.is_finite() && v.fract() == 0.0 => write!(f, "{:.1}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::Decimal(v) => write!(f, "{}", v),
            Self::Bool(true) => write!(f, "True"),
            Self::Bool(false) => write!(f, "False"),
            Self::Text(v) => write!(f, "{}", v),
            Self::Uuid(v) => write!(f, "{}", v),
            Self::Timestamp(v) => write!(f, "{}", v.format("%Y-%m-%d %H:%M:%S%:z")),
            Self::NaiveTimestamp(v) => write!(f, "{}", v.format("%Y-%m-%d %H:%M:%S")),
            Self::Date(v) => write!(f, "{}", v.format("%Y-%m-%d")),
        }
    }
}

/// Render an optional scalar for a chat reply; absence of a value reads as zero.
pub fn render_scalar(value: Option<&ScalarValue>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "0".to_string(),
    }
}

/// Decode the first column of `row`. SQL `NULL` decodes to `None`.
pub fn decode_first_column(row: &PgRow) -> DbResult<Option<ScalarValue>> {
    let column = row
        .columns()
        .first()
        .ok_or_else(|| DbError::InvalidInput("query returned no columns".to_string()))?;

    let type_name = column.type_info().name().to_uppercase();

    let value = match type_name.as_str() {
        "INT2" => row.try_get::<Option<i16>, _>(0)?.map(|v| ScalarValue::Int(v.into())),
        "INT4" => row.try_get::<Option<i32>, _>(0)?.map(|v| ScalarValue::Int(v.into())),
        "INT8" => row.try_get::<Option<i64>, _>(0)?.map(ScalarValue::Int),
        "FLOAT4" => row.try_get::<Option<f32>, _>(0)?.map(|v| ScalarValue::Float(v.into())),
        "FLOAT8" => row.try_get::<Option<f64>, _>(0)?.map(ScalarValue::Float),
        "NUMERIC" => row.try_get::<Option<Decimal>, _>(0)?.map(ScalarValue::Decimal),
        "BOOL" => row.try_get::<Option<bool>, _>(0)?.map(ScalarValue::Bool),
        "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => {
            row.try_get::<Option<String>, _>(0)?.map(ScalarValue::Text)
        }
        "UUID" => row.try_get::<Option<Uuid>, _>(0)?.map(ScalarValue::Uuid),
        "TIMESTAMPTZ" => row
            .try_get::<Option<DateTime<Utc>>, _>(0)?
            .map(ScalarValue::Timestamp),
        "TIMESTAMP" => row
            .try_get::<Option<NaiveDateTime>, _>(0)?
            .map(ScalarValue::NaiveTimestamp),
        "DATE" => row.try_get::<Option<NaiveDate>, _>(0)?.map(ScalarValue::Date),
        other => {
            return Err(DbError::UnsupportedType(format!(
                "column {} has type {}",
                column.name(),
                other
            )))
        }
    };

    Ok(value)
}
