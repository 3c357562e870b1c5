use std::collections::HashMap;
use std::fmt::Write;

use chrono::{Datelike, Duration, NaiveDate};

use crate::models::{DashboardStats, EnrollmentRecord, VendorPerformance, WeeklyBucket};
use crate::stats;

// Weekly bucketing stops after ~3 years of weeks even if the data claims
// a wider range.
const MAX_WEEKS: usize = 150;

/// Date a record counts under for time bucketing: the enrollment label when
/// it parses, otherwise the day the store first saw the record.
pub fn enrollment_date(record: &EnrollmentRecord) -> NaiveDate {
    stats::parse_enrollment_date(&record.enrolled_on)
        .unwrap_or_else(|| record.created_at.date_naive())
}

/// Seven-day enrollment buckets from the first day of the month of the
/// earliest record through the latest record.
pub fn weekly_evolution(records: &[EnrollmentRecord]) -> Vec<WeeklyBucket> {
    if records.is_empty() {
        return Vec::new();
    }

    let mut dates: Vec<NaiveDate> = records.iter().map(enrollment_date).collect();
    dates.sort();
    let last = dates[dates.len() - 1];
    let mut start = dates[0].with_day(1).unwrap_or(dates[0]);

    let mut weeks = Vec::new();
    while start <= last && weeks.len() < MAX_WEEKS {
        let end = start + Duration::days(6);
        let count = dates.iter().filter(|d| **d >= start && **d <= end).count();
        weeks.push(WeeklyBucket {
            week: start.format("%d/%m/%y").to_string(),
            label: format!(
                "{} to {}",
                start.format("%d/%m/%y"),
                end.format("%d/%m/%y")
            ),
            count,
        });
        start += Duration::days(7);
    }

    weeks
}

/// Per-attendant volume, money, and signature-channel breakdown, busiest
/// vendors first.
pub fn vendor_performance(records: &[EnrollmentRecord]) -> Vec<VendorPerformance> {
    let mut rows: Vec<VendorPerformance> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    for record in records {
        let i = *index.entry(record.attendant.clone()).or_insert_with(|| {
            rows.push(VendorPerformance {
                name: record.attendant.clone(),
                enrollment_count: 0,
                total_value: 0.0,
                total_received: 0.0,
                collection_rate: 0.0,
                digital: 0,
                in_person: 0,
                unsigned: 0,
            });
            rows.len() - 1
        });

        rows[i].enrollment_count += 1;
        rows[i].total_value += stats::clean_amount(&record.total_billed);
        rows[i].total_received += stats::clean_amount(&record.total_collected);
        match record.signature.as_str() {
            "DIGITAL" => rows[i].digital += 1,
            "PRESENCIAL" => rows[i].in_person += 1,
            _ => rows[i].unsigned += 1,
        }
    }

    for row in rows.iter_mut() {
        row.collection_rate = if row.total_value > 0.0 {
            (row.total_received / row.total_value) * 100.0
        } else {
            0.0
        };
    }

    rows.sort_by(|a, b| b.enrollment_count.cmp(&a.enrollment_count));
    rows
}

fn money(value: f64) -> String {
    format!("R$ {value:.2}")
}

pub fn build_report(
    scope: Option<&str>,
    records: &[EnrollmentRecord],
    stats: &DashboardStats,
) -> String {
    let weeks = weekly_evolution(records);
    let vendors = vendor_performance(records);

    let digital = records.iter().filter(|r| r.signature == "DIGITAL").count();
    let in_person = records
        .iter()
        .filter(|r| r.signature == "PRESENCIAL")
        .count();
    let unsigned = records.len() - digital - in_person;
    let pending_balance = stats.total_sales - stats.total_received;

    let mut output = String::new();
    let scope_label = scope.unwrap_or("all enrollments");

    let _ = writeln!(output, "# Enrollment Report");
    let _ = writeln!(output, "Generated for {scope_label}");
    let _ = writeln!(output);
    let _ = writeln!(output, "## General Summary");
    let _ = writeln!(output, "- Enrollments: {}", stats.total_enrollments);
    let _ = writeln!(output, "- Total billed: {}", money(stats.total_sales));
    let _ = writeln!(output, "- Total collected: {}", money(stats.total_received));
    let _ = writeln!(output, "- Pending balance: {}", money(pending_balance));
    let _ = writeln!(output, "- Average ticket: {}", money(stats.average_ticket));
    let _ = writeln!(
        output,
        "- Signatures: {digital} digital, {in_person} in person, {unsigned} pending"
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Weekly Evolution");
    if weeks.is_empty() {
        let _ = writeln!(output, "No enrollments recorded.");
    } else {
        for week in weeks.iter() {
            let _ = writeln!(output, "- {}: {} enrollments", week.label, week.count);
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Vendor Performance");
    if vendors.is_empty() {
        let _ = writeln!(output, "No enrollments recorded.");
    } else {
        for vendor in vendors.iter() {
            let _ = writeln!(
                output,
                "- {}: {} enrollments, {} billed, {} collected ({:.1}%), {} digital / {} in person / {} pending",
                vendor.name,
                vendor.enrollment_count,
                money(vendor.total_value),
                money(vendor.total_received),
                vendor.collection_rate,
                vendor.digital,
                vendor.in_person,
                vendor.unsigned
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Enrollments by Course");
    if stats.course_metrics.is_empty() {
        let _ = writeln!(output, "No enrollments recorded.");
    } else {
        let mut courses = stats.course_metrics.clone();
        courses.sort_by(|a, b| b.enrollment_count.cmp(&a.enrollment_count));
        for course in courses.iter() {
            let _ = writeln!(
                output,
                "- {}: {} enrollments, {} billed",
                course.name,
                course.enrollment_count,
                money(course.total_sales)
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Daily Enrollments");
    if stats.daily_enrollments.is_empty() {
        let _ = writeln!(output, "No dated enrollments in this window.");
    } else {
        for day in stats.daily_enrollments.iter() {
            let _ = writeln!(output, "- {}: {}", day.date, day.count);
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn record_on(enrolled_on: &str, attendant: &str, signature: &str) -> EnrollmentRecord {
        EnrollmentRecord {
            id: Uuid::new_v4(),
            enrolled_on: enrolled_on.to_string(),
            contract: "2001".to_string(),
            student: "João Lima".to_string(),
            phone: String::new(),
            package: "INFORMÁTICA".to_string(),
            status: "ATIVO".to_string(),
            class_name: "TURMA A".to_string(),
            total_billed: "1000".to_string(),
            total_collected: "400".to_string(),
            installment: String::new(),
            payment_plan: String::new(),
            acquisition_channel: String::new(),
            attendant: attendant.to_string(),
            referrer: String::new(),
            scholarship: String::new(),
            first_due: String::new(),
            due_day: 5,
            signature: signature.to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 10, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn weekly_buckets_start_at_month_start_of_earliest_record() {
        let records = vec![
            record_on("10/01/2024", "Ana", "DIGITAL"),
            record_on("25/01/2024", "Ana", "DIGITAL"),
        ];

        let weeks = weekly_evolution(&records);
        assert_eq!(weeks[0].week, "01/01/24");
        assert_eq!(weeks.len(), 4);

        let bucketed: usize = weeks.iter().map(|w| w.count).sum();
        assert_eq!(bucketed, 2);
        // 10/01 falls in the second seven-day window, 25/01 in the fourth
        assert_eq!(weeks[1].count, 1);
        assert_eq!(weeks[3].count, 1);
    }

    #[test]
    fn weekly_buckets_fall_back_to_store_timestamp() {
        let records = vec![record_on("not-a-date", "Ana", "DIGITAL")];
        let weeks = weekly_evolution(&records);
        // created_at is 10/01/2024, so bucketing starts at 01/01/24
        assert_eq!(weeks[0].week, "01/01/24");
        let bucketed: usize = weeks.iter().map(|w| w.count).sum();
        assert_eq!(bucketed, 1);
    }

    #[test]
    fn no_records_means_no_buckets() {
        assert!(weekly_evolution(&[]).is_empty());
    }

    #[test]
    fn vendor_rows_split_by_signature_channel() {
        let records = vec![
            record_on("10/01/2024", "Ana", "DIGITAL"),
            record_on("11/01/2024", "Ana", "PRESENCIAL"),
            record_on("12/01/2024", "Ana", "NENHUM"),
            record_on("13/01/2024", "Beto", ""),
        ];

        let vendors = vendor_performance(&records);
        assert_eq!(vendors.len(), 2);
        assert_eq!(vendors[0].name, "Ana");
        assert_eq!(vendors[0].enrollment_count, 3);
        assert_eq!(vendors[0].digital, 1);
        assert_eq!(vendors[0].in_person, 1);
        assert_eq!(vendors[0].unsigned, 1);
        assert!((vendors[0].collection_rate - 40.0).abs() < 0.001);
        assert_eq!(vendors[1].name, "Beto");
        assert_eq!(vendors[1].unsigned, 1);
    }

    #[test]
    fn collection_rate_is_zero_when_nothing_was_billed() {
        let mut record = record_on("10/01/2024", "Ana", "DIGITAL");
        record.total_billed = String::new();
        record.total_collected = String::new();

        let vendors = vendor_performance(&[record]);
        assert_eq!(vendors[0].collection_rate, 0.0);
    }

    #[test]
    fn report_covers_every_section() {
        let records = vec![
            record_on("10/01/2024", "Ana", "DIGITAL"),
            record_on("11/01/2024", "Beto", "NENHUM"),
        ];
        let stats = crate::stats::compute_stats(&records);
        let report = build_report(Some("TURMA A"), &records, &stats);

        assert!(report.contains("# Enrollment Report"));
        assert!(report.contains("Generated for TURMA A"));
        assert!(report.contains("## General Summary"));
        assert!(report.contains("- Enrollments: 2"));
        assert!(report.contains("- Pending balance: R$ 1200.00"));
        assert!(report.contains("1 digital, 0 in person, 1 pending"));
        assert!(report.contains("## Weekly Evolution"));
        assert!(report.contains("## Vendor Performance"));
        assert!(report.contains("## Enrollments by Course"));
        assert!(report.contains("INFORMÁTICA: 2 enrollments"));
        assert!(report.contains("## Daily Enrollments"));
        assert!(report.contains("- 10/01/2024: 1"));
    }

    #[test]
    fn empty_report_still_renders() {
        let stats = crate::stats::compute_stats(&[]);
        let report = build_report(None, &[], &stats);
        assert!(report.contains("Generated for all enrollments"));
        assert!(report.contains("No enrollments recorded."));
    }
}
