use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{params, Row};

use crate::{
    db::{
        helpers::{duration_from_ms, parse_date, to_u8},
        Database,
    },
    models::{BreakRecord, DailyRecord},
};

fn row_to_record(row: &Row) -> Result<DailyRecord> {
    let record_date: String = row.get("record_date")?;
    let total_work_ms: i64 = row.get("total_work_ms")?;
    let total_break_ms: i64 = row.get("total_break_ms")?;
    let efficiency: i64 = row.get("efficiency")?;
    let breaks_json: String = row.get("breaks_json")?;
    let breaks: Vec<BreakRecord> =
        serde_json::from_str(&breaks_json).context("failed to parse breaks_json")?;

    Ok(DailyRecord {
        session_id: row.get("session_id")?,
        date: parse_date(&record_date, "record_date")?,
        check_in_time: row.get("check_in_time")?,
        check_out_time: row.get("check_out_time")?,
        total_work_time: duration_from_ms(total_work_ms, "total_work_ms")?,
        total_break_time: duration_from_ms(total_break_ms, "total_break_ms")?,
        breaks,
        efficiency: to_u8(efficiency, "efficiency")?,
    })
}

impl Database {
    pub async fn insert_daily_record(&self, record: &DailyRecord) -> Result<()> {
        let record = record.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO daily_records (session_id, record_date, check_in_time, check_out_time,
                     total_work_ms, total_break_ms, efficiency, breaks_json, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    record.session_id,
                    record.date.format("%Y-%m-%d").to_string(),
                    record.check_in_time,
                    record.check_out_time,
                    record.total_work_time.as_millis(),
                    record.total_break_time.as_millis(),
                    i64::from(record.efficiency),
                    serde_json::to_string(&record.breaks)?,
                    Utc::now().to_rfc3339(),
                ],
            )
            .context("failed to insert daily record")?;
            Ok(())
        })
        .await
    }

    /// All archived records in insertion order.
    pub async fn fetch_daily_records(&self) -> Result<Vec<DailyRecord>> {
        self.execute(|conn| {
            let mut stmt = conn.prepare(
                "SELECT session_id, record_date, check_in_time, check_out_time,
                        total_work_ms, total_break_ms, efficiency, breaks_json
                 FROM daily_records
                 ORDER BY id ASC",
            )?;
            let mut rows = stmt.query([])?;
            let mut records = Vec::new();
            while let Some(row) = rows.next()? {
                records.push(row_to_record(row)?);
            }
            Ok(records)
        })
        .await
    }
}
