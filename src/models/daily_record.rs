use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{BreakRecord, WorkDuration};

/// Archived summary of one completed work day. Written once at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
    pub date: NaiveDate,
    pub check_in_time: String,
    pub check_out_time: String,
    pub total_work_time: WorkDuration,
    pub total_break_time: WorkDuration,
    #[serde(default)]
    pub breaks: Vec<BreakRecord>,
    pub efficiency: u8,
}
