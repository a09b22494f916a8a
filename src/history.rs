//! Read-only views over archived daily records.

use chrono::NaiveDate;
use serde::Serialize;

use crate::{
    models::{DailyRecord, WorkDuration},
    tracker::accrual::efficiency,
};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySummary {
    pub days: usize,
    pub total_work_time: WorkDuration,
    pub total_break_time: WorkDuration,
    /// Mean of the per-day efficiencies, rounded. 100 for an empty range.
    pub average_efficiency: u8,
    /// Efficiency of the summed work and break minutes.
    pub overall_efficiency: u8,
}

/// Archived records ordered by date. Records sharing a date keep their
/// insertion order.
#[derive(Debug, Clone, Default)]
pub struct DailyHistory {
    records: Vec<DailyRecord>,
}

impl DailyHistory {
    pub fn new(mut records: Vec<DailyRecord>) -> Self {
        records.sort_by_key(|record| record.date);
        Self { records }
    }

    pub fn records(&self) -> &[DailyRecord] {
        &self.records
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn latest(&self) -> Option<&DailyRecord> {
        self.records.last()
    }

    pub fn on(&self, date: NaiveDate) -> Vec<&DailyRecord> {
        self.records.iter().filter(|r| r.date == date).collect()
    }

    /// Records with `from <= date <= to`.
    pub fn between(&self, from: NaiveDate, to: NaiveDate) -> Vec<&DailyRecord> {
        self.records
            .iter()
            .filter(|r| r.date >= from && r.date <= to)
            .collect()
    }

    pub fn summary(&self) -> HistorySummary {
        summarize(self.records.iter())
    }

    pub fn summary_between(&self, from: NaiveDate, to: NaiveDate) -> HistorySummary {
        summarize(self.between(from, to).into_iter())
    }
}

fn summarize<'a>(records: impl Iterator<Item = &'a DailyRecord>) -> HistorySummary {
    let mut days = 0usize;
    let mut work_ms = 0i64;
    let mut break_ms = 0i64;
    let mut efficiency_sum = 0u64;

    for record in records {
        days += 1;
        work_ms += record.total_work_time.as_millis();
        break_ms += record.total_break_time.as_millis();
        efficiency_sum += u64::from(record.efficiency);
    }

    let total_work_time = WorkDuration::from_millis(work_ms);
    let total_break_time = WorkDuration::from_millis(break_ms);
    let average_efficiency = if days == 0 {
        100
    } else {
        ((efficiency_sum as f64) / (days as f64)).round() as u8
    };

    HistorySummary {
        days,
        total_work_time,
        total_break_time,
        average_efficiency,
        overall_efficiency: efficiency(
            total_work_time.total_minutes(),
            total_break_time.total_minutes(),
        ),
    }
}
