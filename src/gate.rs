//! Priority gate derivation.
//!
//! Pure functions over a snapshot of the two task collections. The clock
//! and the week-start convention are explicit parameters, so every output
//! is a deterministic function of (collections, now, week_start) and tests
//! run against pinned instants instead of the wall clock.
//!
//! The gating rule itself is deliberately blunt: one pending academic task
//! locks the whole secondary board, regardless of priority or type.

use crate::board::{AcademicTask, SecondaryTask};
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

// ── Urgency ────────────────────────────────────────────────────

/// Due-date proximity label for a pending task. Checks are evaluated top
/// to bottom and the first match wins, so a task due today is DUE_TODAY
/// even though it is also within the seven-day window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Urgency {
    Overdue,
    DueToday,
    DueTomorrow,
    DueSoon,
    Normal,
}

/// Which day opens the week for the "due this week" stat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeekStart {
    #[default]
    Monday,
    Sunday,
}

/// Classify a due date against `now`. Calendar days, not 24h windows:
/// anything due earlier today is DUE_TODAY, never OVERDUE.
pub fn classify_urgency(due: DateTime<Utc>, now: DateTime<Utc>) -> Urgency {
    let today = now.date_naive();
    let due_day = due.date_naive();

    if due_day < today {
        Urgency::Overdue
    } else if due_day == today {
        Urgency::DueToday
    } else if Some(due_day) == today.succ_opt() {
        Urgency::DueTomorrow
    } else if (due_day - today).num_days() <= 7 {
        Urgency::DueSoon
    } else {
        Urgency::Normal
    }
}

// ── Gate state ─────────────────────────────────────────────────

/// A pending academic task plus its derived badge.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingAcademic {
    #[serde(flatten)]
    pub task: AcademicTask,
    pub urgency: Urgency,
}

/// Read-only dashboard snapshot. Everything the frontend renders comes
/// from this one struct.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GateState {
    pub is_locked: bool,
    pub pending_academic_count: usize,
    pub completed_today_count: usize,
    pub due_this_week_count: usize,
    pub pending_secondary_count: usize,
    pub pending_academic: Vec<PendingAcademic>,
    pub completed_academic: Vec<AcademicTask>,
    pub pending_secondary: Vec<SecondaryTask>,
    pub completed_secondary: Vec<SecondaryTask>,
}

/// Derive the full dashboard view from the current collections.
///
/// List ordering is total (ties broken by id) so two calls on identical
/// input at the same instant produce identical output:
/// - pending academic: due date ascending
/// - completed academic / secondary: last touched first
/// - pending secondary: creation order
pub fn compute_gate_state(
    academic: &[AcademicTask],
    secondary: &[SecondaryTask],
    now: DateTime<Utc>,
    week_start: WeekStart,
) -> GateState {
    let today = now.date_naive();
    let week_end = end_of_week(today, week_start);

    let mut pending: Vec<&AcademicTask> =
        academic.iter().filter(|t| !t.completed).collect();
    pending.sort_by(|a, b| a.due_date.cmp(&b.due_date).then(a.id.cmp(&b.id)));

    let mut completed_academic: Vec<AcademicTask> =
        academic.iter().filter(|t| t.completed).cloned().collect();
    completed_academic.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(a.id.cmp(&b.id)));

    let completed_today_count = completed_academic
        .iter()
        .filter(|t| t.updated_at.date_naive() == today)
        .count();

    // Inclusive of today through the last day of the current week. A task
    // already overdue as of now is never counted here.
    let due_this_week_count = pending
        .iter()
        .filter(|t| {
            let due_day = t.due_date.date_naive();
            due_day >= today && due_day <= week_end
        })
        .count();

    let mut pending_secondary: Vec<SecondaryTask> =
        secondary.iter().filter(|t| !t.completed).cloned().collect();
    pending_secondary.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

    let mut completed_secondary: Vec<SecondaryTask> =
        secondary.iter().filter(|t| t.completed).cloned().collect();
    completed_secondary.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then(a.id.cmp(&b.id)));

    let pending_academic: Vec<PendingAcademic> = pending
        .into_iter()
        .map(|t| PendingAcademic {
            urgency: classify_urgency(t.due_date, now),
            task: t.clone(),
        })
        .collect();

    GateState {
        is_locked: !pending_academic.is_empty(),
        pending_academic_count: pending_academic.len(),
        completed_today_count,
        due_this_week_count,
        pending_secondary_count: pending_secondary.len(),
        pending_academic,
        completed_academic,
        pending_secondary,
        completed_secondary,
    }
}

/// Last calendar day of the week containing `today`, inclusive.
fn end_of_week(today: NaiveDate, week_start: WeekStart) -> NaiveDate {
    let into_week = match week_start {
        WeekStart::Monday => today.weekday().num_days_from_monday(),
        WeekStart::Sunday => today.weekday().num_days_from_sunday(),
    };
    today + Duration::days(6 - i64::from(into_week))
}

// ── Tests ──────────────────────────────────────────────────────
