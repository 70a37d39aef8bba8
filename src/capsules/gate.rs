// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Time gate.
//!
//! A capsule is open iff `now >= release_date`, boundary inclusive. The
//! state is computed on every read and never stored, so it moves from
//! sealed to open exactly once, whenever the clock crosses the boundary.
//!
//! Release dates are accepted in one format only, `YYYY-MM-DD`, and mean
//! midnight UTC at the start of that day.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::ValidationError;

/// The only accepted release date format.
pub const RELEASE_DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a release date string into the instant the capsule opens.
///
/// Surrounding whitespace is ignored; anything else that is not exactly
/// `YYYY-MM-DD` is rejected. `01-02-2030` is not silently read as a day
/// in another convention.
pub fn parse_release_date(input: &str) -> Result<DateTime<Utc>, ValidationError> {
    let trimmed = input.trim();
    Some(trimmed)
        // chrono's %Y takes a sign and any width, %m and %d a single digit
        .filter(|s| is_canonical_shape(s))
        .and_then(|s| NaiveDate::parse_from_str(s, RELEASE_DATE_FORMAT).ok())
        .map(|date| date.and_time(NaiveTime::MIN).and_utc())
        .ok_or_else(|| ValidationError::InvalidDateFormat {
            input: input.to_string(),
        })
}

/// Four year digits, two month digits and two day digits, dash separated.
fn is_canonical_shape(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, b)| match i {
            4 | 7 => *b == b'-',
            _ => b.is_ascii_digit(),
        })
}

/// Whether a capsule with this release instant is open at `now`.
pub fn is_open(release_date: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now >= release_date
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GateState {
    Open,
    Sealed { available_on: NaiveDate },
}

impl GateState {
    pub fn evaluate(release_date: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        if is_open(release_date, now) {
            GateState::Open
        } else {
            GateState::Sealed {
                available_on: release_date.date_naive(),
            }
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, GateState::Open)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn release() -> DateTime<Utc> {
        parse_release_date("2030-01-02").unwrap()
    }

    #[test]
    fn parses_canonical_format_as_midnight_utc() {
        assert_eq!(
            release(),
            Utc.with_ymd_and_hms(2030, 1, 2, 0, 0, 0).unwrap()
        );
        assert_eq!(parse_release_date(" 2030-01-02\n").unwrap(), release());
    }

    #[test]
    fn rejects_other_formats() {
        for bad in [
            "",
            "tomorrow",
            "02-01-2030",
            "2030/01/02",
            "2030-13-01",
            "2030-02-30",
            "2030-01-02T00:00:00Z",
            "+12030-01-02",
            "+2030-1-02",
            "+2030-01-2",
            "-999-01-02",
            "+999-01-02",
            "2030-1-002",
            "２０３０-01-02",
        ] {
            assert!(
                matches!(
                    parse_release_date(bad),
                    Err(ValidationError::InvalidDateFormat { .. })
                ),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn boundary_is_inclusive() {
        let at = release();
        let tick = Duration::nanoseconds(1);

        assert!(!is_open(at, at - tick));
        assert!(is_open(at, at));
        assert!(is_open(at, at + tick));
    }

    #[test]
    fn sealed_state_carries_release_day() {
        let at = release();
        assert_eq!(
            GateState::evaluate(at, at - Duration::seconds(1)),
            GateState::Sealed {
                available_on: NaiveDate::from_ymd_opt(2030, 1, 2).unwrap()
            }
        );
        assert!(GateState::evaluate(at, at).is_open());
    }

    #[test]
    fn gate_serializes_with_status_tag() {
        let sealed = GateState::Sealed {
            available_on: NaiveDate::from_ymd_opt(2030, 1, 2).unwrap(),
        };
        let json = serde_json::to_value(sealed).unwrap();
        assert_eq!(json["status"], "sealed");
        assert_eq!(json["available_on"], "2030-01-02");
        assert_eq!(serde_json::to_value(GateState::Open).unwrap()["status"], "open");
    }
}
