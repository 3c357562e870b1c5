use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::models::{EnrollmentRecord, FollowupSummary, PendingSignature};

// Delay tiers for unsigned contracts, in days since the store first saw
// the enrollment.
pub const WARNING_DELAY_DAYS: i64 = 3;
pub const CRITICAL_DELAY_DAYS: i64 = 7;

fn is_unsigned(record: &EnrollmentRecord) -> bool {
    let signature = record.signature.trim();
    signature.is_empty() || signature == "NENHUM"
}

pub fn days_delayed(created_at: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (now - created_at).num_days().max(0)
}

/// Which unsigned enrollments need chasing, oldest first, with delay tiers
/// and per-vendor pending counts.
pub fn summarize(records: &[EnrollmentRecord], now: DateTime<Utc>) -> FollowupSummary {
    let digital = records.iter().filter(|r| r.signature == "DIGITAL").count();
    let in_person = records
        .iter()
        .filter(|r| r.signature == "PRESENCIAL")
        .count();

    let mut unsigned: Vec<&EnrollmentRecord> =
        records.iter().filter(|r| is_unsigned(r)).collect();
    unsigned.sort_by(|a, b| a.created_at.cmp(&b.created_at));

    let mut critical = 0usize;
    let mut warning = 0usize;
    let mut per_vendor: Vec<(String, usize)> = Vec::new();
    let mut vendor_idx: HashMap<String, usize> = HashMap::new();
    let mut pending = Vec::new();

    for record in unsigned.iter() {
        let delay = days_delayed(record.created_at, now);
        if delay >= CRITICAL_DELAY_DAYS {
            critical += 1;
        } else if delay >= WARNING_DELAY_DAYS {
            warning += 1;
        }

        let i = *vendor_idx
            .entry(record.attendant.clone())
            .or_insert_with(|| {
                per_vendor.push((record.attendant.clone(), 0));
                per_vendor.len() - 1
            });
        per_vendor[i].1 += 1;

        pending.push(PendingSignature {
            student: record.student.clone(),
            phone: record.phone.clone(),
            package: record.package.clone(),
            class_name: record.class_name.clone(),
            attendant: record.attendant.clone(),
            days_delayed: delay,
        });
    }

    per_vendor.sort_by(|a, b| b.1.cmp(&a.1));

    FollowupSummary {
        total_enrollments: records.len(),
        digital,
        in_person,
        unsigned: pending.len(),
        critical,
        warning,
        per_vendor,
        pending,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use uuid::Uuid;

    fn record(student: &str, attendant: &str, signature: &str, days_ago: i64) -> EnrollmentRecord {
        let now = Utc.with_ymd_and_hms(2024, 6, 15, 9, 0, 0).unwrap();
        EnrollmentRecord {
            id: Uuid::new_v4(),
            enrolled_on: "01/06/2024".to_string(),
            contract: "3001".to_string(),
            student: student.to_string(),
            phone: String::new(),
            package: "ROBÓTICA".to_string(),
            status: "ATIVO".to_string(),
            class_name: "TURMA C".to_string(),
            total_billed: "1200".to_string(),
            total_collected: "0".to_string(),
            installment: String::new(),
            payment_plan: String::new(),
            acquisition_channel: String::new(),
            attendant: attendant.to_string(),
            referrer: String::new(),
            scholarship: String::new(),
            first_due: String::new(),
            due_day: 10,
            signature: signature.to_string(),
            created_at: now - Duration::days(days_ago),
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 9, 0, 0).unwrap()
    }

    #[test]
    fn only_unsigned_enrollments_are_pending() {
        let records = vec![
            record("Maria", "Ana", "DIGITAL", 1),
            record("José", "Ana", "PRESENCIAL", 1),
            record("Paula", "Ana", "NENHUM", 1),
            record("Rui", "Beto", "", 1),
        ];

        let summary = summarize(&records, now());
        assert_eq!(summary.total_enrollments, 4);
        assert_eq!(summary.digital, 1);
        assert_eq!(summary.in_person, 1);
        assert_eq!(summary.unsigned, 2);
        assert_eq!(summary.pending.len(), 2);
    }

    #[test]
    fn pending_list_is_oldest_first() {
        let records = vec![
            record("Maria", "Ana", "NENHUM", 2),
            record("José", "Ana", "NENHUM", 20),
            record("Paula", "Beto", "NENHUM", 5),
        ];

        let summary = summarize(&records, now());
        let students: Vec<&str> = summary.pending.iter().map(|p| p.student.as_str()).collect();
        assert_eq!(students, vec!["José", "Paula", "Maria"]);
    }

    #[test]
    fn delay_tiers_split_at_three_and_seven_days() {
        let records = vec![
            record("Maria", "Ana", "NENHUM", 1),
            record("José", "Ana", "NENHUM", 3),
            record("Paula", "Ana", "NENHUM", 6),
            record("Rui", "Ana", "NENHUM", 7),
            record("Clara", "Ana", "NENHUM", 30),
        ];

        let summary = summarize(&records, now());
        assert_eq!(summary.warning, 2);
        assert_eq!(summary.critical, 2);
    }

    #[test]
    fn vendors_rank_by_pending_count() {
        let records = vec![
            record("Maria", "Ana", "NENHUM", 1),
            record("José", "Beto", "NENHUM", 1),
            record("Paula", "Beto", "NENHUM", 1),
            record("Rui", "Ana", "DIGITAL", 1),
        ];

        let summary = summarize(&records, now());
        assert_eq!(summary.per_vendor[0], ("Beto".to_string(), 2));
        assert_eq!(summary.per_vendor[1], ("Ana".to_string(), 1));
    }

    #[test]
    fn future_timestamps_clamp_to_zero_delay() {
        assert_eq!(days_delayed(now() + Duration::days(2), now()), 0);
    }
}
