//! Bulk CSV import of brands, phones and reviews

use serde::Serialize;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

use crate::db::Store;
use crate::error::{Result, StoreError};

const BRAND_COLUMN: &str = "brand_name";
const PHONE_COLUMN: &str = "phone_name";
const REVIEW_COLUMN: &str = "review_text";

/// Summary of one import run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportReport {
    /// Data rows read (header excluded)
    pub rows_read: usize,
    /// Rows missing a brand, phone or review text
    pub rows_skipped: usize,
    pub reviews_inserted: usize,
    /// Distinct brands referenced by imported rows
    pub brands: usize,
    /// Distinct phones referenced by imported rows
    pub phones: usize,
}

impl Store {
    /// Import a CSV file; see [`Store::import_csv`]
    pub async fn import_csv_file(&self, path: impl AsRef<Path>, delimiter: u8) -> Result<ImportReport> {
        let path = path.as_ref();
        info!("Importing reviews from {}", path.display());
        let file = std::fs::File::open(path)?;
        self.import_csv(file, delimiter).await
    }

    /// Import delimited text with `brand_name`, `phone_name` and
    /// `review_text` header columns.
    ///
    /// Fields are trimmed and a missing field counts as empty; rows with any
    /// empty field are skipped. Brands and phones are created on first use.
    /// The whole import runs in one transaction.
    pub async fn import_csv<R: Read + Send>(&self, reader: R, delimiter: u8) -> Result<ImportReport> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .flexible(true)
            .from_reader(reader);

        let headers = csv_reader.headers()?.clone();
        let column = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| StoreError::MissingColumn(name.to_string()))
        };
        let brand_idx = column(BRAND_COLUMN)?;
        let phone_idx = column(PHONE_COLUMN)?;
        let review_idx = column(REVIEW_COLUMN)?;

        let mut report = ImportReport::default();
        let mut brand_ids: HashMap<String, i64> = HashMap::new();
        let mut phone_ids: HashMap<(i64, String), i64> = HashMap::new();
        let mut tx = self.begin().await?;

        for record in csv_reader.records() {
            let record = record?;
            report.rows_read += 1;

            let field = |idx: usize| record.get(idx).unwrap_or("").trim();
            let (brand, phone, review) = (field(brand_idx), field(phone_idx), field(review_idx));

            if brand.is_empty() || phone.is_empty() || review.is_empty() {
                debug!(row = report.rows_read, "Skipping incomplete row");
                report.rows_skipped += 1;
                continue;
            }

            let brand_id = match brand_ids.get(brand) {
                Some(&id) => id,
                None => {
                    let id = tx.get_or_create_brand(brand).await?;
                    brand_ids.insert(brand.to_string(), id);
                    id
                }
            };

            let phone_key = (brand_id, phone.to_string());
            let phone_id = match phone_ids.get(&phone_key) {
                Some(&id) => id,
                None => {
                    let id = tx.get_or_create_phone(brand_id, phone).await?;
                    phone_ids.insert(phone_key, id);
                    id
                }
            };

            tx.insert_review(phone_id, review).await?;
            report.reviews_inserted += 1;
        }

        tx.commit().await?;

        report.brands = brand_ids.len();
        report.phones = phone_ids.len();
        info!(
            rows = report.rows_read,
            skipped = report.rows_skipped,
            reviews = report.reviews_inserted,
            "Import complete"
        );
        Ok(report)
    }
}
