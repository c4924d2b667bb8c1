use crate::model::{AttendanceRecord, AttendanceStatus, Student, PENDING_CALL_REASON};
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashSet};

/// Builds one ledger row per roster student, in roster order.
///
/// Rolls in `present_rolls` that the roster does not know are dropped; see
/// [`unknown_rolls`] for reporting them.
pub fn reconcile(
    roster: &[Student],
    present_rolls: &HashSet<String>,
    date: NaiveDate,
) -> Vec<AttendanceRecord> {
    roster
        .iter()
        .map(|s| {
            let status = if present_rolls.contains(&s.roll) {
                AttendanceStatus::Present
            } else {
                AttendanceStatus::Absent
            };
            let reason = match status {
                AttendanceStatus::Present => String::new(),
                AttendanceStatus::Absent => PENDING_CALL_REASON.to_string(),
            };
            AttendanceRecord {
                student_roll: s.roll.clone(),
                date,
                status,
                reason,
            }
        })
        .collect()
}

/// Roster students whose reconciled row is ABSENT, in roster order.
pub fn absentees<'a>(roster: &'a [Student], records: &[AttendanceRecord]) -> Vec<&'a Student> {
    let absent: HashSet<&str> = records
        .iter()
        .filter(|r| r.is_absent())
        .map(|r| r.student_roll.as_str())
        .collect();
    roster
        .iter()
        .filter(|s| absent.contains(s.roll.as_str()))
        .collect()
}

/// Present rolls with no roster entry, sorted for stable logging.
pub fn unknown_rolls(roster: &[Student], present_rolls: &HashSet<String>) -> BTreeSet<String> {
    let known: HashSet<&str> = roster.iter().map(|s| s.roll.as_str()).collect();
    present_rolls
        .iter()
        .filter(|r| !known.contains(r.as_str()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn student(roll: &str) -> Student {
        Student {
            roll: roll.to_string(),
            name: format!("Student {}", roll),
            phone: "+910000000000".to_string(),
            parent_name: String::new(),
        }
    }

    fn rolls(v: &[&str]) -> HashSet<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 16).expect("date")
    }

    #[test]
    fn marks_present_and_absent_in_roster_order() {
        let roster = vec![student("A"), student("B"), student("C")];
        let records = reconcile(&roster, &rolls(&["A", "C"]), day());

        let got: Vec<(&str, AttendanceStatus, &str)> = records
            .iter()
            .map(|r| (r.student_roll.as_str(), r.status, r.reason.as_str()))
            .collect();
        assert_eq!(
            got,
            vec![
                ("A", AttendanceStatus::Present, ""),
                ("B", AttendanceStatus::Absent, PENDING_CALL_REASON),
                ("C", AttendanceStatus::Present, ""),
            ]
        );
        assert!(records.iter().all(|r| r.date == day()));

        let absent: Vec<&str> = absentees(&roster, &records)
            .into_iter()
            .map(|s| s.roll.as_str())
            .collect();
        assert_eq!(absent, vec!["B"]);
    }

    #[test]
    fn empty_roster_yields_no_records() {
        let records = reconcile(&[], &rolls(&["A"]), day());
        assert!(records.is_empty());
        assert!(absentees(&[], &records).is_empty());
    }

    #[test]
    fn unknown_present_rolls_are_ignored() {
        let roster = vec![student("A"), student("B")];
        let present = rolls(&["A", "ZZ-999"]);
        let records = reconcile(&roster, &present, day());

        assert_eq!(records.len(), roster.len());
        assert!(records.iter().all(|r| r.student_roll != "ZZ-999"));
        assert_eq!(
            unknown_rolls(&roster, &present).into_iter().collect::<Vec<_>>(),
            vec!["ZZ-999".to_string()]
        );
    }

    #[test]
    fn every_roster_member_gets_exactly_one_record() {
        let roster: Vec<Student> = (0..40).map(|i| student(&format!("R{:02}", i))).collect();
        let present: HashSet<String> = (0..40)
            .filter(|i| i % 3 == 0)
            .map(|i| format!("R{:02}", i))
            .collect();

        let records = reconcile(&roster, &present, day());
        assert_eq!(records.len(), roster.len());
        for r in &records {
            let expected = if present.contains(&r.student_roll) {
                AttendanceStatus::Present
            } else {
                AttendanceStatus::Absent
            };
            assert_eq!(r.status, expected, "roll {}", r.student_roll);
        }
        assert_eq!(records, reconcile(&roster, &present, day()));
    }
}
