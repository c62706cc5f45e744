// src/models/report.rs

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Date-range presets offered to faculty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekFilter {
    #[default]
    Current,
    Last,
    All,
}

/// Inclusive calendar date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Every date in the range, ascending. Empty if `start > end`.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start.iter_days().take_while(move |d| *d <= self.end)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttemptStatus {
    Completed,
    Missed,
}

/// One (student, date) cell of the performance table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportRow {
    pub student_id: i64,
    pub full_name: String,
    pub class: Option<String>,
    pub date: NaiveDate,
    pub status: AttemptStatus,
    pub score: Option<i64>,
    pub percentage: Option<i64>,
    pub time_taken: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportStats {
    pub total_students: i64,
    pub completed_today: i64,
    pub missed_today: i64,
    /// Mean percentage over the filtered attempts, rounded. 0 when there are none.
    pub average_score: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceReport {
    pub range: DateRange,
    pub rows: Vec<ReportRow>,
    pub stats: ReportStats,
}

/// Query string for the faculty report.
#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    pub class: Option<String>,
    #[serde(default)]
    pub week: WeekFilter,
}
