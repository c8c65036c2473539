//! Core data models for the Pont Chaban-Delmas service
//!
//! This module contains the types representing scheduled bridge closures as
//! published by the Bordeaux Métropole open data platform, plus the pure
//! logic deriving closure windows and the current bridge state from them.

pub mod bridge;

pub use bridge::{BridgeClient, BridgeError};

use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// One scheduled closure of the bridge, as published in the
/// `previsions_pont_chaban` dataset.
///
/// Field names on the wire are French; they are kept verbatim in the serde
/// renames so fixtures and the upstream API stay byte-compatible.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeRecord {
    /// Name of the vessel the bridge lifts for
    #[serde(rename = "bateau")]
    pub vessel: String,
    /// Day the closure starts
    #[serde(rename = "date_passage")]
    pub date: NaiveDate,
    /// Wall-clock time road traffic closes, e.g. "20:45"
    #[serde(rename = "fermeture_a_la_circulation")]
    pub closes_at: String,
    /// Wall-clock time road traffic reopens
    #[serde(rename = "re_ouverture_a_la_circulation")]
    pub reopens_at: String,
    /// Kind of closure announced by the operator
    #[serde(rename = "type_de_fermeture")]
    pub closure_kind: String,
    /// "oui" when the bridge closes in both directions
    #[serde(rename = "fermeture_totale")]
    pub total_closure: String,
}

/// Resolved closing and reopening instants of one record, in local
/// Bordeaux wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClosurePeriod {
    /// When road traffic closes
    pub start: NaiveDateTime,
    /// When road traffic reopens
    pub end: NaiveDateTime,
}

impl BridgeRecord {
    /// Resolves the closure window of this record.
    ///
    /// The dataset stores the date once and both times as bare wall-clock
    /// strings. A reopening time earlier than the closing time means the
    /// bridge reopens the following day (overnight closure).
    ///
    /// # Returns
    /// * `Some(ClosurePeriod)` when both times parse
    /// * `None` when either time is malformed; callers skip such records
    pub fn closure_period(&self) -> Option<ClosurePeriod> {
        let closes = parse_wall_clock(&self.closes_at)?;
        let reopens = parse_wall_clock(&self.reopens_at)?;

        let start = self.date.and_time(closes);
        let end = if reopens < closes {
            // Reopens past midnight, on the next day
            self.date.checked_add_days(Days::new(1))?.and_time(reopens)
        } else {
            self.date.and_time(reopens)
        };

        Some(ClosurePeriod { start, end })
    }
}

/// Parses the dataset's wall-clock strings; most rows are "HH:MM" but some
/// carry seconds.
fn parse_wall_clock(raw: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .ok()
}

/// Snapshot of the bridge derived from the closure schedule at a given
/// moment.
#[derive(Debug, Clone, Serialize)]
pub struct BridgeState {
    /// True while a closure window covers `now` (the deck is lifted and
    /// road traffic is stopped)
    pub is_elevated: bool,
    /// The closure currently in progress, if any
    pub current_event: Option<BridgeRecord>,
    /// Closures that start after `now`, soonest first
    pub upcoming_events: Vec<BridgeRecord>,
}

impl BridgeState {
    /// Computes the bridge state at `now`, given in local Bordeaux time.
    ///
    /// Records whose times cannot be resolved are skipped. The remaining
    /// records are ordered by closing time; the current event is the one
    /// whose window contains `now`, and everything starting later is
    /// upcoming.
    pub fn compute(records: &[BridgeRecord], now: NaiveDateTime) -> Self {
        let mut dated: Vec<(ClosurePeriod, &BridgeRecord)> = records
            .iter()
            .filter_map(|record| {
                let period = record.closure_period();
                if period.is_none() {
                    tracing::debug!(vessel = %record.vessel, "skipping record with unparseable times");
                }
                period.map(|p| (p, record))
            })
            .collect();
        dated.sort_by_key(|(period, _)| period.start);

        let current_event = dated
            .iter()
            .find(|(period, _)| period.start <= now && now <= period.end)
            .map(|(_, record)| (*record).clone());

        let upcoming_events = dated
            .iter()
            .filter(|(period, _)| period.start > now)
            .map(|(_, record)| (*record).clone())
            .collect();

        Self {
            is_elevated: current_event.is_some(),
            current_event,
            upcoming_events,
        }
    }
}
