//! `{mode}_{agent_id}_{order_type}_{timestamp}.json`

use crate::error::FilenameError;
use aet_schemas::{Mode, OrderType};
use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use std::sync::OnceLock;

pub const UNKNOWN: &str = "unknown";
pub const SENTINEL_TIMESTAMP: &str = "00000000000000000000";

const EXTENSION: &str = ".json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilenameFields {
    pub mode: Mode,
    pub agent_id: String,
    pub order_type: OrderType,
    /// The raw 20-digit stamp, kept verbatim for response naming.
    pub timestamp: String,
    pub issued_at: NaiveDateTime,
}

pub fn validate_filename(name: &str) -> Result<FilenameFields, FilenameError> {
    let stem = name
        .strip_suffix(EXTENSION)
        .ok_or(FilenameError::MissingExtension)?;

    let parts: Vec<&str> = stem.split('_').collect();
    let [mode, agent_id, order_type, timestamp] = parts.as_slice() else {
        return Err(FilenameError::PartCount(parts.len()));
    };

    let mode = Mode::parse(mode).ok_or_else(|| FilenameError::Mode(mode.to_string()))?;

    if !is_agent_id(agent_id) {
        return Err(FilenameError::AgentId(agent_id.to_string()));
    }

    let order_type =
        OrderType::parse(order_type).ok_or_else(|| FilenameError::OrderType(order_type.to_string()))?;

    let issued_at = parse_timestamp(timestamp)?;

    Ok(FilenameFields {
        mode,
        agent_id: agent_id.to_string(),
        order_type,
        timestamp: timestamp.to_string(),
        issued_at,
    })
}

/// `[a-z0-9]{1,20}`
pub fn is_agent_id(s: &str) -> bool {
    static AGENT_ID: OnceLock<Option<Regex>> = OnceLock::new();
    AGENT_ID
        .get_or_init(|| Regex::new(r"^[a-z0-9]{1,20}$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(s))
}

fn is_twenty_digits(s: &str) -> bool {
    s.len() == 20 && s.bytes().all(|b| b.is_ascii_digit())
}

/// `YYYYMMDDHHMMSSffffff`, microsecond precision.
///
/// Fields are sliced by position because chrono's `%Y` is greedy over a
/// run of digits.
pub fn parse_timestamp(ts: &str) -> Result<NaiveDateTime, FilenameError> {
    if !is_twenty_digits(ts) {
        return Err(FilenameError::TimestampDigits(ts.to_string()));
    }

    let field = |range: std::ops::Range<usize>| -> u32 {
        ts[range].bytes().fold(0, |acc, b| acc * 10 + u32::from(b - b'0'))
    };
    let calendar = |reason| FilenameError::TimestampCalendar {
        value: ts.to_string(),
        reason,
    };

    let year = field(0..4) as i32;
    let date = NaiveDate::from_ymd_opt(year, field(4..6), field(6..8))
        .ok_or_else(|| calendar("no such calendar date"))?;
    date.and_hms_micro_opt(field(8..10), field(10..12), field(12..14), field(14..20))
        .ok_or_else(|| calendar("no such time of day"))
}

/// Identity fields recovered from a rejected filename, for the error
/// outcome.
///
/// Every field is either a value that passed its own component check or a
/// sentinel, so the result is always safe to use as a path component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SalvagedFields {
    pub mode: String,
    pub agent_id: String,
    pub order_type: String,
    pub timestamp: String,
    pub client_order_id: String,
}

impl SalvagedFields {
    pub fn unknown() -> Self {
        Self {
            mode: UNKNOWN.to_string(),
            agent_id: UNKNOWN.to_string(),
            order_type: UNKNOWN.to_string(),
            timestamp: SENTINEL_TIMESTAMP.to_string(),
            client_order_id: UNKNOWN.to_string(),
        }
    }
}

impl From<&FilenameFields> for SalvagedFields {
    fn from(f: &FilenameFields) -> Self {
        Self {
            mode: f.mode.as_str().to_string(),
            agent_id: f.agent_id.clone(),
            order_type: f.order_type.as_str().to_string(),
            timestamp: f.timestamp.clone(),
            client_order_id: UNKNOWN.to_string(),
        }
    }
}

pub fn salvage_filename(name: &str) -> SalvagedFields {
    let stem = name.strip_suffix(EXTENSION).unwrap_or(name);
    let parts: Vec<&str> = stem.split('_').collect();
    let [mode, agent_id, order_type, timestamp] = parts.as_slice() else {
        return SalvagedFields::unknown();
    };

    let keep = |ok: bool, v: &str, fallback: &str| -> String {
        if ok {
            v.to_string()
        } else {
            fallback.to_string()
        }
    };

    SalvagedFields {
        mode: keep(Mode::parse(mode).is_some(), *mode, UNKNOWN),
        agent_id: keep(is_agent_id(agent_id), *agent_id, UNKNOWN),
        order_type: keep(OrderType::parse(order_type).is_some(), *order_type, UNKNOWN),
        timestamp: keep(is_twenty_digits(timestamp), *timestamp, SENTINEL_TIMESTAMP),
        client_order_id: UNKNOWN.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_four_components() {
        let f = validate_filename("paper_testbot_stockbuy_20260214120000000000.json").unwrap();
        assert_eq!(f.mode, Mode::Paper);
        assert_eq!(f.agent_id, "testbot");
        assert_eq!(f.order_type, OrderType::StockBuy);
        assert_eq!(f.timestamp, "20260214120000000000");
        assert_eq!(f.issued_at.to_string(), "2026-02-14 12:00:00");
    }

    #[test]
    fn microseconds_are_kept() {
        let f = validate_filename("live_a1_accountinfo_20251231235959123456.json").unwrap();
        assert_eq!(f.issued_at.and_utc().timestamp_subsec_micros(), 123456);
    }

    #[test]
    fn extension_is_required() {
        assert_eq!(
            validate_filename("paper_testbot_stockbuy_20260214120000000000.txt"),
            Err(FilenameError::MissingExtension)
        );
        assert_eq!(
            validate_filename("paper_testbot_stockbuy_20260214120000000000"),
            Err(FilenameError::MissingExtension)
        );
    }

    #[test]
    fn part_count_must_be_four() {
        assert_eq!(
            validate_filename("paper_test_bot_stockbuy_20260214120000000000.json"),
            Err(FilenameError::PartCount(5))
        );
        assert_eq!(
            validate_filename("paper_stockbuy_20260214120000000000.json"),
            Err(FilenameError::PartCount(3))
        );
        assert_eq!(validate_filename(".json"), Err(FilenameError::PartCount(1)));
    }

    #[test]
    fn component_values_are_checked_in_order() {
        assert!(matches!(
            validate_filename("PAPER_testbot_stockbuy_20260214120000000000.json"),
            Err(FilenameError::Mode(m)) if m == "PAPER"
        ));
        assert!(matches!(
            validate_filename("paper_TestBot_stockbuy_20260214120000000000.json"),
            Err(FilenameError::AgentId(_))
        ));
        assert!(matches!(
            validate_filename("paper_abcdefghijklmnopqrstu_stockbuy_20260214120000000000.json"),
            Err(FilenameError::AgentId(_))
        ));
        assert!(matches!(
            validate_filename("paper_testbot_futures_20260214120000000000.json"),
            Err(FilenameError::OrderType(_))
        ));
    }

    #[test]
    fn twenty_character_agent_id_is_allowed() {
        assert!(validate_filename("paper_abcdefghij0123456789_positions_20260214120000000000.json").is_ok());
    }

    #[test]
    fn digit_pattern_and_calendar_errors_differ() {
        assert!(matches!(
            validate_filename("paper_testbot_stockbuy_2026021412000000000.json"),
            Err(FilenameError::TimestampDigits(_))
        ));
        assert!(matches!(
            validate_filename("paper_testbot_stockbuy_2026021412000000000a.json"),
            Err(FilenameError::TimestampDigits(_))
        ));
        assert!(matches!(
            validate_filename("paper_testbot_stockbuy_20261314120000000000.json"),
            Err(FilenameError::TimestampCalendar { .. })
        ));
        assert!(matches!(
            validate_filename("paper_testbot_stockbuy_20260230120000000000.json"),
            Err(FilenameError::TimestampCalendar { .. })
        ));
        assert!(matches!(
            validate_filename("paper_testbot_stockbuy_20260214250000000000.json"),
            Err(FilenameError::TimestampCalendar { .. })
        ));
    }

    #[test]
    fn error_messages_name_the_offending_value() {
        let e = validate_filename("paper_testbot_futures_20260214120000000000.json").unwrap_err();
        let msg = e.to_string();
        assert!(msg.starts_with("Invalid order_type 'futures'. Must be one of: stockbuy, stocksell"));
        assert!(msg.ends_with("cancelorder"));
    }

    #[test]
    fn salvage_keeps_only_valid_components() {
        let s = salvage_filename("paper_Bad.Agent_stockbuy_2026.json");
        assert_eq!(s.mode, "paper");
        assert_eq!(s.agent_id, UNKNOWN);
        assert_eq!(s.order_type, "stockbuy");
        assert_eq!(s.timestamp, SENTINEL_TIMESTAMP);
        assert_eq!(s.client_order_id, UNKNOWN);
    }

    #[test]
    fn salvage_rejects_path_like_components() {
        let s = salvage_filename("paper_.._stockbuy_20260214120000000000.json");
        assert_eq!(s.agent_id, UNKNOWN);
        assert_eq!(s.timestamp, "20260214120000000000");
    }

    #[test]
    fn salvage_with_wrong_part_count_is_all_sentinels() {
        assert_eq!(salvage_filename("garbage.json"), SalvagedFields::unknown());
        assert_eq!(salvage_filename("a_b_c_d_e.json"), SalvagedFields::unknown());
    }
}
