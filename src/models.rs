use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

/// One enrollment as stored by the record store. Amount and date fields
/// carry the raw text from the school-system export; normalization is the
/// aggregator's job.
#[derive(Debug, Clone)]
pub struct EnrollmentRecord {
    pub id: Uuid,
    pub enrolled_on: String,
    pub contract: String,
    pub student: String,
    pub phone: String,
    pub package: String,
    pub status: String,
    pub class_name: String,
    pub total_billed: String,
    pub total_collected: String,
    pub installment: String,
    pub payment_plan: String,
    pub acquisition_channel: String,
    pub attendant: String,
    pub referrer: String,
    pub scholarship: String,
    pub first_due: String,
    pub due_day: i32,
    pub signature: String,
    pub created_at: DateTime<Utc>,
}

/// Per-attendant or per-course rollup.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct GroupMetric {
    pub name: String,
    pub total_sales: f64,
    pub total_received: f64,
    pub enrollment_count: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StatusCount {
    pub name: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DailyEnrollment {
    pub date: String,
    pub count: usize,
    pub raw_date: NaiveDate,
}

/// Everything the dashboard renders, recomputed from scratch on each call.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DashboardStats {
    pub total_sales: f64,
    pub total_received: f64,
    pub total_enrollments: usize,
    pub average_ticket: f64,
    pub available_classes: Vec<String>,
    pub attendant_metrics: Vec<GroupMetric>,
    pub course_metrics: Vec<GroupMetric>,
    pub status_distribution: Vec<StatusCount>,
    pub daily_enrollments: Vec<DailyEnrollment>,
}

/// Seven-day enrollment bucket for the weekly evolution section.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WeeklyBucket {
    pub week: String,
    pub label: String,
    pub count: usize,
}

/// Per-vendor report row: volume, money, and signature-channel breakdown.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct VendorPerformance {
    pub name: String,
    pub enrollment_count: usize,
    pub total_value: f64,
    pub total_received: f64,
    pub collection_rate: f64,
    pub digital: usize,
    pub in_person: usize,
    pub unsigned: usize,
}

/// One unsigned enrollment awaiting signature follow-up.
#[derive(Debug, Clone, Serialize)]
pub struct PendingSignature {
    pub student: String,
    pub phone: String,
    pub package: String,
    pub class_name: String,
    pub attendant: String,
    pub days_delayed: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct FollowupSummary {
    pub total_enrollments: usize,
    pub digital: usize,
    pub in_person: usize,
    pub unsigned: usize,
    pub critical: usize,
    pub warning: usize,
    pub per_vendor: Vec<(String, usize)>,
    pub pending: Vec<PendingSignature>,
}
