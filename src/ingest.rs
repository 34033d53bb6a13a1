//! Bulk ingestion of tabular company data.
//!
//! [`parse`] partitions an upload into accepted records and per-row
//! diagnostics. Only structural problems fail the whole batch. [`import`]
//! turns accepted records into listings and keeps a history row per upload.
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::io::Read;
use thiserror::Error;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::db::uploads::{self, UploadProgress};
use crate::db::{listings, Pool};
use crate::error::Result;
use crate::identity::Identity;
use crate::listing::new_active_listing;
use crate::model::{ListingInput, Upload};

const FIELD_COUNT: usize = 6;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("failed to read upload: {0}")]
    Csv(#[from] csv::Error),
    #[error("upload has no readable rows")]
    Empty,
    #[error("upload must contain a header row and at least one data row")]
    HeaderOnly,
}

/// One normalized data row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestRecord {
    /// Source row, counting the header as row 1.
    #[serde(skip)]
    pub row: usize,
    pub serial_number: i64,
    pub company_name: String,
    pub address: String,
    pub phone_number: String,
    pub email: String,
    pub products: String,
}

impl IngestRecord {
    /// Comma separated product tags, trimmed, empties dropped.
    pub fn product_tags(&self) -> Vec<String> {
        self.products
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestReport {
    pub accepted: Vec<IngestRecord>,
    pub diagnostics: Vec<String>,
}

/// Parse a headed CSV source. Row numbers in diagnostics count records, with
/// the header as row 1, so quoted cells spanning lines do not shift them.
/// Bytes that are not valid UTF-8 are replaced rather than failing the batch.
pub fn parse<R: Read>(source: R) -> std::result::Result<IngestReport, IngestError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(source);

    let mut total_rows = 0usize;
    let mut report = IngestReport::default();
    for (index, record) in reader.byte_records().enumerate() {
        let record = record?;
        total_rows += 1;
        if index == 0 {
            continue;
        }
        let row_number = index + 1;

        let mut fields: Vec<String> = record
            .iter()
            .map(|f| String::from_utf8_lossy(f).trim().to_string())
            .collect();
        if fields.iter().all(|f| f.is_empty()) {
            continue;
        }
        fields.resize(FIELD_COUNT.max(fields.len()), String::new());

        if fields[1].is_empty() {
            report
                .diagnostics
                .push(format!("Row {row_number}: Missing company name, skipped"));
            continue;
        }
        let mut fields = fields.into_iter();
        let serial = fields.next().unwrap_or_default();
        let data_row = i64::try_from(index).unwrap_or(i64::MAX);
        report.accepted.push(IngestRecord {
            row: row_number,
            serial_number: serial.parse().unwrap_or(data_row),
            company_name: fields.next().unwrap_or_default(),
            address: fields.next().unwrap_or_default(),
            phone_number: fields.next().unwrap_or_default(),
            email: fields.next().unwrap_or_default(),
            products: fields.next().unwrap_or_default(),
        });
    }

    match total_rows {
        0 => Err(IngestError::Empty),
        1 => Err(IngestError::HeaderOnly),
        _ => Ok(report),
    }
}

/// Outcome of [`import`]: the parse result plus the created listing count.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    pub upload_id: String,
    pub total_records: usize,
    pub created: usize,
    pub errors: Vec<String>,
}

/// Parse `source` and create one active listing per accepted record.
///
/// A listing that fails to store becomes a diagnostic; the rest of the batch
/// still goes in.
#[instrument(skip_all, fields(file = %file_name, by = %uploader.username))]
pub async fn import<R: Read>(
    pool: &Pool,
    source: R,
    file_name: &str,
    category: &str,
    uploader: &Identity,
) -> Result<ImportSummary> {
    let report = parse(source)?;

    let upload = Upload {
        id: Uuid::new_v4().to_string(),
        file_name: file_name.to_string(),
        file_url: String::new(),
        category: category.to_string(),
        uploaded_by: uploader.username.clone(),
        status: "processing".to_string(),
        records_count: 0,
        success_count: 0,
        error_count: 0,
        errors: Vec::new(),
        uploaded_at: Utc::now(),
        processed_at: None,
    };
    uploads::insert_upload(pool, &upload).await?;

    let mut errors = report.diagnostics.clone();
    let mut created = 0usize;
    for record in &report.accepted {
        let listing = new_active_listing(ListingInput {
            company_name: record.company_name.clone(),
            email: record.email.clone(),
            phone: record.phone_number.clone(),
            address: record.address.clone(),
            category: category.to_string(),
            products: record.product_tags(),
            ..Default::default()
        });
        match listings::insert_listing(pool, &listing).await {
            Ok(()) => created += 1,
            Err(e) => {
                warn!(row = record.row, error = %e, "failed to store imported row");
                errors.push(format!(
                    "Row {}: {} could not be stored: {e}",
                    record.row, record.company_name
                ));
            }
        }
    }

    let total_records = report.accepted.len() + report.diagnostics.len();
    let progress = UploadProgress {
        records_count: to_i64(total_records),
        success_count: to_i64(created),
        error_count: to_i64(errors.len()),
        errors: &errors,
        status: "completed",
        processed_at: Utc::now(),
    };
    uploads::update_upload_progress(pool, &upload.id, &progress).await?;
    info!(
        upload = %upload.id,
        total_records,
        created,
        errors = errors.len(),
        "bulk import finished"
    );

    Ok(ImportSummary {
        upload_id: upload.id,
        total_records,
        created,
        errors,
    })
}

/// Upload history, newest first.
pub async fn history(pool: &Pool) -> Result<Vec<Upload>> {
    uploads::query_uploads(pool).await
}

fn to_i64(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}
