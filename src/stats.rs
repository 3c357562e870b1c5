use std::collections::{BTreeSet, HashMap};

use chrono::NaiveDate;

use crate::models::{DailyEnrollment, DashboardStats, EnrollmentRecord, GroupMetric, StatusCount};

/// Normalize a raw amount field from the school-system export into a value
/// in whole currency units. Exports mix `R$ 1.234,56` and `1,234.56`
/// conventions, sometimes with escape characters; whichever separator
/// appears last is taken as the decimal mark. Unparseable input is zero so
/// one bad cell never blocks the dashboard.
pub fn clean_amount(raw: &str) -> f64 {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || matches!(c, ',' | '.' | '-'))
        .collect();
    if cleaned.is_empty() {
        return 0.0;
    }

    let last_comma = cleaned.rfind(',');
    let last_dot = cleaned.rfind('.');
    let normalized = match (last_comma, last_dot) {
        (Some(comma), Some(dot)) if comma > dot => {
            cleaned.replace('.', "").replace(',', ".")
        }
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        (Some(_), None) => cleaned.replacen(',', ".", 1),
        _ => cleaned,
    };

    round2(normalized.parse::<f64>().unwrap_or(0.0))
}

/// Parse a `DD/MM/YYYY` enrollment date label, tolerating backslash-escaped
/// slashes. Anything else (wrong shape, out-of-range components) is None.
pub fn parse_enrollment_date(raw: &str) -> Option<NaiveDate> {
    let cleaned = raw.replace('\\', "");
    let cleaned = cleaned.trim();
    let parts: Vec<&str> = cleaned.split('/').collect();
    if parts.len() != 3 {
        return None;
    }
    let day: u32 = parts[0].trim().parse().ok()?;
    let month: u32 = parts[1].trim().parse().ok()?;
    let year: i32 = parts[2].trim().parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Single pass over the enrollment set producing everything the dashboard
/// renders. Pure and total: malformed amounts count as zero, malformed
/// dates drop out of the daily series only, and an empty input yields an
/// all-zero result.
pub fn compute_stats(records: &[EnrollmentRecord]) -> DashboardStats {
    let mut total_sales = 0.0;
    let mut total_received = 0.0;
    let mut classes: BTreeSet<String> = BTreeSet::new();

    // Vec keeps first-seen order; the map only remembers positions. Ties in
    // the later sort then fall back to encounter order.
    let mut attendants: Vec<GroupMetric> = Vec::new();
    let mut attendant_idx: HashMap<String, usize> = HashMap::new();
    let mut courses: Vec<GroupMetric> = Vec::new();
    let mut course_idx: HashMap<String, usize> = HashMap::new();
    let mut statuses: Vec<StatusCount> = Vec::new();
    let mut status_idx: HashMap<String, usize> = HashMap::new();
    let mut days: HashMap<String, (usize, NaiveDate)> = HashMap::new();

    for record in records {
        let billed = clean_amount(&record.total_billed);
        let collected = clean_amount(&record.total_collected);

        classes.insert(record.class_name.clone());
        total_sales += billed;
        total_received += collected;

        let idx = *attendant_idx
            .entry(record.attendant.clone())
            .or_insert_with(|| {
                attendants.push(GroupMetric {
                    name: record.attendant.clone(),
                    total_sales: 0.0,
                    total_received: 0.0,
                    enrollment_count: 0,
                });
                attendants.len() - 1
            });
        attendants[idx].total_sales += billed;
        attendants[idx].total_received += collected;
        attendants[idx].enrollment_count += 1;

        let idx = *course_idx.entry(record.package.clone()).or_insert_with(|| {
            courses.push(GroupMetric {
                name: record.package.clone(),
                total_sales: 0.0,
                total_received: 0.0,
                enrollment_count: 0,
            });
            courses.len() - 1
        });
        courses[idx].total_sales += billed;
        courses[idx].total_received += collected;
        courses[idx].enrollment_count += 1;

        let idx = *status_idx.entry(record.status.clone()).or_insert_with(|| {
            statuses.push(StatusCount {
                name: record.status.clone(),
                count: 0,
            });
            statuses.len() - 1
        });
        statuses[idx].count += 1;

        if let Some(parsed) = parse_enrollment_date(&record.enrolled_on) {
            let label = record.enrolled_on.trim().to_string();
            let bucket = days.entry(label).or_insert((0, parsed));
            bucket.0 += 1;
        }
    }

    let total_enrollments = records.len();
    let average_ticket = if total_enrollments > 0 {
        total_sales / total_enrollments as f64
    } else {
        0.0
    };

    for metric in attendants.iter_mut().chain(courses.iter_mut()) {
        metric.total_sales = round2(metric.total_sales);
        metric.total_received = round2(metric.total_received);
    }
    attendants.sort_by(|a, b| {
        b.total_sales
            .partial_cmp(&a.total_sales)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    courses.sort_by(|a, b| {
        b.total_sales
            .partial_cmp(&a.total_sales)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let mut daily: Vec<DailyEnrollment> = days
        .into_iter()
        .map(|(date, (count, raw_date))| DailyEnrollment {
            date,
            count,
            raw_date,
        })
        .collect();
    daily.sort_by(|a, b| a.raw_date.cmp(&b.raw_date).then_with(|| a.date.cmp(&b.date)));

    DashboardStats {
        total_sales: round2(total_sales),
        total_received: round2(total_received),
        total_enrollments,
        average_ticket: round2(average_ticket),
        available_classes: classes.into_iter().collect(),
        attendant_metrics: attendants,
        course_metrics: courses,
        status_distribution: statuses,
        daily_enrollments: daily,
    }
}
