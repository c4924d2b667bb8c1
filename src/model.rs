use chrono::NaiveDate;
use serde::Serialize;

/// Reason stored on an absent row until the call gateway writes back.
pub const PENDING_CALL_REASON: &str = "Pending Call...";

pub const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Student {
    pub roll: String,
    pub name: String,
    pub phone: String,
    pub parent_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttendanceStatus {
    Present,
    Absent,
}

impl AttendanceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            AttendanceStatus::Present => "PRESENT",
            AttendanceStatus::Absent => "ABSENT",
        }
    }
}

/// One row of the ledger, identified by (student_roll, date).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttendanceRecord {
    pub student_roll: String,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub reason: String,
}

impl AttendanceRecord {
    pub fn is_absent(&self) -> bool {
        self.status == AttendanceStatus::Absent
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallRequest {
    pub phone: String,
    pub roll: String,
}

impl CallRequest {
    pub fn for_student(student: &Student) -> Self {
        Self {
            phone: student.phone.clone(),
            roll: student.roll.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmissionOutcome {
    pub date_persisted: bool,
    pub calls_attempted: usize,
    pub calls_failed_to_dispatch: Vec<String>,
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT).ok()
}

/// Strips spacing and dashes and prefixes `default_country_code` when the
/// number carries no leading `+`. Returns None when nothing dialable remains.
pub fn normalize_phone(raw: &str, default_country_code: &str) -> Option<String> {
    let compact: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-' && *c != '(' && *c != ')')
        .collect();
    let (plus, digits) = match compact.strip_prefix('+') {
        Some(rest) => (true, rest),
        None => (false, compact.as_str()),
    };
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    if plus {
        Some(format!("+{}", digits))
    } else {
        Some(format!("{}{}", default_country_code, digits))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_phone_keeps_e164_and_prefixes_local_numbers() {
        assert_eq!(
            normalize_phone("+91 98765-43210", "+91").as_deref(),
            Some("+919876543210")
        );
        assert_eq!(
            normalize_phone("9876543210", "+91").as_deref(),
            Some("+919876543210")
        );
        assert_eq!(
            normalize_phone("(555) 010-0199", "+1").as_deref(),
            Some("+15550100199")
        );
        assert_eq!(normalize_phone("   ", "+91"), None);
        assert_eq!(normalize_phone("+", "+91"), None);
        assert_eq!(normalize_phone("12ab", "+91"), None);
    }

    #[test]
    fn submission_outcome_serializes_with_wire_names() {
        let out = SubmissionOutcome {
            date_persisted: true,
            calls_attempted: 2,
            calls_failed_to_dispatch: vec!["B".to_string()],
        };
        assert_eq!(
            serde_json::to_value(&out).expect("serialize"),
            serde_json::json!({
                "datePersisted": true,
                "callsAttempted": 2,
                "callsFailedToDispatch": ["B"],
            })
        );
    }

    #[test]
    fn dates_use_iso_calendar_days() {
        let d = parse_date("2026-10-16").expect("date");
        assert_eq!(format_date(d), "2026-10-16");
        assert_eq!(parse_date("16/10/2026"), None);
    }
}
