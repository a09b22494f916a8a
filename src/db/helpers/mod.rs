use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;

use crate::models::WorkDuration;

pub fn to_u8(value: i64, field: &str) -> Result<u8> {
    u8::try_from(value).map_err(|_| anyhow!("{field} out of range: {value}"))
}

pub fn duration_from_ms(value: i64, field: &str) -> Result<WorkDuration> {
    if value < 0 {
        return Err(anyhow!("{field} contains negative value {value}"));
    }
    Ok(WorkDuration::from_millis(value))
}

pub fn parse_date(value: &str, field: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .with_context(|| format!("failed to parse {field}"))
}
