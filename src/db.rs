use anyhow::Context;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::EnrollmentRecord;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let enrollments = vec![
        (
            "seed-001",
            "05/01/2026",
            "10234",
            "Maria Souza",
            "11 98888-1001",
            "INFORMÁTICA",
            "ATIVO",
            "TURMA A",
            "R$ 2.400,00",
            "R$ 800,00",
            "Ana Ribeiro",
            "DIGITAL",
        ),
        (
            "seed-002",
            "12/01/2026",
            "10235",
            "João Lima",
            "11 98888-1002",
            "INGLÊS",
            "ATIVO",
            "TURMA B",
            "R$ 3.600,00",
            "R$ 3.600,00",
            "Ana Ribeiro",
            "PRESENCIAL",
        ),
        (
            "seed-003",
            "20/01/2026",
            "10236",
            "Paula Castro",
            "11 98888-1003",
            "ROBÓTICA",
            "CANCELADO",
            "TURMA A",
            "R$ 1.800,00",
            "R$ 0,00",
            "Beto Farias",
            "NENHUM",
        ),
        (
            "seed-004",
            "02/02/2026",
            "10237",
            "Rui Teixeira",
            "11 98888-1004",
            "INFORMÁTICA",
            "ATIVO",
            "SEM TURMA",
            "R$ 2.400,00",
            "R$ 1.200,00",
            "Beto Farias",
            "NENHUM",
        ),
    ];

    for (
        source_key,
        enrolled_on,
        contract,
        student,
        phone,
        package,
        status,
        class_name,
        billed,
        collected,
        attendant,
        signature,
    ) in enrollments
    {
        sqlx::query(
            r#"
            INSERT INTO enrollment_dashboard.enrollments
            (id, enrolled_on, contract, student, phone, package, status, class_name,
             total_billed, total_collected, attendant, signature, source_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(enrolled_on)
        .bind(contract)
        .bind(student)
        .bind(phone)
        .bind(package)
        .bind(status)
        .bind(class_name)
        .bind(billed)
        .bind(collected)
        .bind(attendant)
        .bind(signature)
        .bind(source_key)
        .execute(pool)
        .await?;
    }

    Ok(())
}

pub async fn fetch_enrollments(
    pool: &PgPool,
    class: Option<&str>,
    attendant: Option<&str>,
) -> anyhow::Result<Vec<EnrollmentRecord>> {
    let mut query = String::from(
        "SELECT id, enrolled_on, contract, student, phone, package, status, \
         class_name, total_billed, total_collected, installment, payment_plan, \
         acquisition_channel, attendant, referrer, scholarship, first_due, \
         due_day, signature, created_at \
         FROM enrollment_dashboard.enrollments",
    );

    if class.is_some() {
        query.push_str(" WHERE class_name = $1");
    } else if attendant.is_some() {
        query.push_str(" WHERE attendant = $1");
    }
    query.push_str(" ORDER BY created_at, contract");

    let mut rows = sqlx::query(&query);

    if let Some(value) = class {
        rows = rows.bind(value);
    } else if let Some(value) = attendant {
        rows = rows.bind(value);
    }

    let records = rows.fetch_all(pool).await?;
    let mut enrollments = Vec::new();

    for row in records {
        enrollments.push(EnrollmentRecord {
            id: row.get("id"),
            enrolled_on: row.get("enrolled_on"),
            contract: row.get("contract"),
            student: row.get("student"),
            phone: row.get("phone"),
            package: row.get("package"),
            status: row.get("status"),
            class_name: row.get("class_name"),
            total_billed: row.get("total_billed"),
            total_collected: row.get("total_collected"),
            installment: row.get("installment"),
            payment_plan: row.get("payment_plan"),
            acquisition_channel: row.get("acquisition_channel"),
            attendant: row.get("attendant"),
            referrer: row.get("referrer"),
            scholarship: row.get("scholarship"),
            first_due: row.get("first_due"),
            due_day: row.get("due_day"),
            signature: row.get("signature"),
            created_at: row.get("created_at"),
        });
    }

    Ok(enrollments)
}

/// One row out of a school-system CSV export, fields still in their raw
/// text form.
#[derive(Debug, Clone)]
pub struct CsvEnrollment {
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
}

fn fold_accents(input: &str) -> String {
    input
        .chars()
        .map(|c| match c {
            'Á' | 'À' | 'Â' | 'Ã' | 'Ä' => 'A',
            'É' | 'È' | 'Ê' | 'Ë' => 'E',
            'Í' | 'Ì' | 'Î' | 'Ï' => 'I',
            'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' => 'O',
            'Ú' | 'Ù' | 'Û' | 'Ü' => 'U',
            'Ç' => 'C',
            other => other,
        })
        .collect()
}

fn normalize_header(header: &str) -> String {
    fold_accents(&header.trim().to_uppercase())
}

fn find_column(headers: &[String], keywords: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| keywords.iter().any(|k| h.contains(k)))
}

fn field<'a>(record: &'a csv::StringRecord, index: Option<usize>) -> &'a str {
    index.and_then(|i| record.get(i)).unwrap_or("").trim()
}

fn or_default(value: &str, default: &str) -> String {
    if value.is_empty() {
        default.to_string()
    } else {
        value.to_string()
    }
}

/// Parse a school-system CSV export. Exports vary in delimiter (`;` or
/// `,`) and in header spelling, so columns are located by keyword after
/// uppercasing and accent folding.
pub fn parse_enrollment_csv(text: &str) -> anyhow::Result<Vec<CsvEnrollment>> {
    let delimiter = if text.lines().next().unwrap_or("").contains(';') {
        b';'
    } else {
        b','
    };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .context("CSV export has no header line")?
        .iter()
        .map(normalize_header)
        .collect();

    let idx_date = find_column(&headers, &["DATA MATRICULA"]);
    let idx_contract = find_column(&headers, &["CONTRATO"]);
    let idx_student = find_column(&headers, &["ALUNO"]);
    let idx_phone = find_column(&headers, &["TELEFONE"]);
    let idx_package = find_column(&headers, &["PACOTE", "CURSO"]);
    let idx_status = find_column(&headers, &["SITUACAO"]);
    let idx_class = find_column(&headers, &["TURMA"]);
    let idx_billed = find_column(&headers, &["TOTAL A RECEBER"]);
    let idx_collected = find_column(&headers, &["TOTAL RECEBIDO"]);
    let idx_installment = find_column(&headers, &["VALOR PARCELA"]);
    let idx_plan = find_column(&headers, &["PLANO DE PAGAMENTO"]);
    let idx_channel = find_column(&headers, &["FORMA DE CONHECIMENTO"]);
    let idx_attendant = find_column(&headers, &["ATENDENTE"]);
    let idx_referrer = find_column(&headers, &["DIVULGADOR"]);
    let idx_scholarship = find_column(&headers, &["BOLSA"]);
    let idx_first_due = find_column(&headers, &["ENTRADA"]);
    let idx_due_day = find_column(&headers, &["DIA VENCIMENTO"]);
    let idx_signature = find_column(&headers, &["ASSINATURA"]);

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result?;
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }

        rows.push(CsvEnrollment {
            enrolled_on: field(&record, idx_date).to_string(),
            contract: field(&record, idx_contract).to_string(),
            student: field(&record, idx_student).to_string(),
            phone: field(&record, idx_phone).to_string(),
            package: or_default(field(&record, idx_package), "OUTROS"),
            status: or_default(field(&record, idx_status), "ATIVO"),
            class_name: or_default(field(&record, idx_class), "SEM TURMA"),
            total_billed: field(&record, idx_billed).to_string(),
            total_collected: field(&record, idx_collected).to_string(),
            installment: field(&record, idx_installment).to_string(),
            payment_plan: field(&record, idx_plan).to_string(),
            acquisition_channel: field(&record, idx_channel).to_string(),
            attendant: or_default(field(&record, idx_attendant), "NÃO INFORMADO"),
            referrer: field(&record, idx_referrer).to_string(),
            scholarship: field(&record, idx_scholarship).to_string(),
            first_due: field(&record, idx_first_due).to_string(),
            due_day: field(&record, idx_due_day).parse().unwrap_or(0),
            signature: or_default(field(&record, idx_signature), "NENHUM"),
        });
    }

    Ok(rows)
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    let text = std::fs::read_to_string(csv_path)
        .with_context(|| format!("failed to read {}", csv_path.display()))?;
    let rows = parse_enrollment_csv(&text)?;

    let file_name = csv_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "import".to_string());

    let mut inserted = 0usize;
    for (position, row) in rows.iter().enumerate() {
        // Duplicate contract numbers are legitimate, so idempotency keys on
        // the file name and row position instead.
        let source_key = format!("{file_name}:{position}");

        let result = sqlx::query(
            r#"
            INSERT INTO enrollment_dashboard.enrollments
            (id, enrolled_on, contract, student, phone, package, status, class_name,
             total_billed, total_collected, installment, payment_plan,
             acquisition_channel, attendant, referrer, scholarship, first_due,
             due_day, signature, source_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14,
                    $15, $16, $17, $18, $19, $20)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&row.enrolled_on)
        .bind(&row.contract)
        .bind(&row.student)
        .bind(&row.phone)
        .bind(&row.package)
        .bind(&row.status)
        .bind(&row.class_name)
        .bind(&row.total_billed)
        .bind(&row.total_collected)
        .bind(&row.installment)
        .bind(&row.payment_plan)
        .bind(&row.acquisition_channel)
        .bind(&row.attendant)
        .bind(&row.referrer)
        .bind(&row.scholarship)
        .bind(&row.first_due)
        .bind(row.due_day)
        .bind(&row.signature)
        .bind(source_key)
        .execute(pool)
        .await?;

        if result.rows_affected() > 0 {
            inserted += 1;
        }
    }

    Ok(inserted)
}
