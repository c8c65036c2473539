//! iCalendar feed of the bridge closures
//!
//! This module renders the closure schedule as an RFC 5545 VCALENDAR so
//! users can subscribe from Google Agenda, Apple Calendar and the like.
//! Output rules that matter for interoperability: CRLF line endings,
//! backslash-escaped text values, and folding of lines over 75 octets.

use chrono::{DateTime, Utc};

use crate::data::BridgeRecord;

/// Display name of the subscription calendar
const CALENDAR_NAME: &str = "Pont Chaban-Delmas - Fermetures";
/// Description shown by calendar clients
const CALENDAR_DESCRIPTION: &str = "Calendrier des fermetures du Pont Chaban-Delmas à Bordeaux";
/// Olson timezone of every event
const TIMEZONE: &str = "Europe/Paris";
/// Location attached to every event
const LOCATION: &str = "Pont Chaban-Delmas, Bordeaux, France";

/// Maximum octets per physical content line before folding
const FOLD_OCTETS: usize = 75;

/// Renders the closure schedule as an iCalendar document.
///
/// Events are timed in `Europe/Paris` wall-clock time via `TZID` so they
/// stay correct across DST changes. `now` stamps the `DTSTAMP` property.
/// Records whose times cannot be resolved are skipped.
pub fn render_calendar(records: &[BridgeRecord], now: DateTime<Utc>) -> String {
    let mut lines: Vec<String> = Vec::with_capacity(records.len() * 9 + 10);

    lines.push("BEGIN:VCALENDAR".to_string());
    lines.push("VERSION:2.0".to_string());
    lines.push("PRODID:-//pontchaban//Previsions Pont Chaban-Delmas//FR".to_string());
    lines.push("CALSCALE:GREGORIAN".to_string());
    lines.push(format!("NAME:{}", escape_text(CALENDAR_NAME)));
    lines.push(format!("X-WR-CALNAME:{}", escape_text(CALENDAR_NAME)));
    lines.push(format!("X-WR-CALDESC:{}", escape_text(CALENDAR_DESCRIPTION)));
    lines.push(format!("X-WR-TIMEZONE:{}", TIMEZONE));

    let stamp = now.format("%Y%m%dT%H%M%SZ").to_string();
    for record in records {
        let Some(period) = record.closure_period() else {
            tracing::debug!(vessel = %record.vessel, "skipping calendar event with unparseable times");
            continue;
        };

        lines.push("BEGIN:VEVENT".to_string());
        lines.push(format!(
            "UID:{}-{}@pont-chaban-delmas",
            period.start.format("%Y%m%dT%H%M%S"),
            vessel_slug(&record.vessel)
        ));
        lines.push(format!("DTSTAMP:{}", stamp));
        lines.push(format!(
            "DTSTART;TZID={}:{}",
            TIMEZONE,
            period.start.format("%Y%m%dT%H%M%S")
        ));
        lines.push(format!(
            "DTEND;TZID={}:{}",
            TIMEZONE,
            period.end.format("%Y%m%dT%H%M%S")
        ));
        lines.push(format!(
            "SUMMARY:{}",
            escape_text(&format!("Fermeture Pont Chaban-Delmas - {}", record.vessel))
        ));
        lines.push(format!(
            "DESCRIPTION:{}",
            escape_text(&format!(
                "Type de fermeture: {}, Fermeture totale: {}",
                record.closure_kind, record.total_closure
            ))
        ));
        lines.push(format!("LOCATION:{}", escape_text(LOCATION)));
        lines.push("END:VEVENT".to_string());
    }

    lines.push("END:VCALENDAR".to_string());

    let mut out = String::new();
    for line in &lines {
        out.push_str(&fold_line(line));
        out.push_str("\r\n");
    }
    out
}

/// Escapes a text property value per RFC 5545 section 3.3.11.
fn escape_text(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            ',' => out.push_str("\\,"),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            _ => out.push(c),
        }
    }
    out
}

/// Folds a content line onto continuation lines of at most 75 octets,
/// splitting only at character boundaries. Continuation lines begin with a
/// space that counts toward their 75 octets.
fn fold_line(line: &str) -> String {
    if line.len() <= FOLD_OCTETS {
        return line.to_string();
    }

    let mut out = String::with_capacity(line.len() + 8);
    let mut used = 0;
    for c in line.chars() {
        let width = c.len_utf8();
        if used + width > FOLD_OCTETS {
            out.push_str("\r\n ");
            used = 1;
        }
        out.push(c);
        used += width;
    }
    out
}

/// Reduces a vessel name to a stable ASCII slug for event UIDs.
fn vessel_slug(vessel: &str) -> String {
    let mut slug = String::with_capacity(vessel.len());
    let mut pending_dash = false;
    for c in vessel.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            slug.push(c.to_ascii_lowercase());
            pending_dash = false;
        } else {
            pending_dash = true;
        }
    }
    if slug.is_empty() {
        slug.push_str("navire");
    }
    slug
}
