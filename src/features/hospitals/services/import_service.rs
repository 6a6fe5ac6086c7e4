use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;

use crate::core::error::{AppError, Result};
use crate::features::hospitals::dtos::{ImportHospitalsDto, ImportSummaryDto, RawHospitalRecord};
use crate::features::hospitals::models::{Coordinates, HospitalProfile, NewHospital};
use crate::features::hospitals::repositories::HospitalRepository;
use crate::features::hospitals::services::Geocoder;
use crate::shared::constants::MAX_IMPORT_ERRORS;
use crate::shared::validation::{COMPACT_DATE_REGEX, NON_DIGIT_REGEX, WHITESPACE_REGEX};

// =============================================================================
// CLEANING
// =============================================================================

/// Keeps digits only
pub fn clean_phone(phone: &str) -> String {
    NON_DIGIT_REGEX.replace_all(phone, "").into_owned()
}

/// Removes all whitespace
pub fn clean_address(address: &str) -> String {
    WHITESPACE_REGEX.replace_all(address, "").into_owned()
}

/// `YYYYMMDD` to `YYYY-MM-DD` when it is a real date, otherwise trimmed as-is
pub fn format_issued_date(date: &str) -> String {
    let date = date.trim();
    if COMPACT_DATE_REGEX.is_match(date) {
        if let Ok(parsed) = NaiveDate::parse_from_str(date, "%Y%m%d") {
            return parsed.format("%Y-%m-%d").to_string();
        }
    }
    date.to_string()
}

pub fn clean_record(raw: &RawHospitalRecord) -> HospitalProfile {
    HospitalProfile {
        name: raw.name.trim().to_string(),
        address: clean_address(&raw.address),
        phone: clean_phone(&raw.phone),
        county: raw.county.trim().to_string(),
        veterinarian: raw.veterinarian.trim().to_string(),
        license_type: raw.license_type.trim().to_string(),
        license_no: raw.license_no.trim().to_string(),
        status: raw.status.trim().to_string(),
        issued_date: format_issued_date(&raw.issued_date),
    }
}

// =============================================================================
// IMPORT
// =============================================================================

enum RecordAction {
    Created,
    Updated,
}

struct RecordOutcome {
    action: RecordAction,
    geocoded: bool,
}

/// Per-run state: summary counters plus geocoder pacing
struct ImportRun {
    summary: ImportSummaryDto,
    geocode: bool,
    geocoder_calls: usize,
    /// Licences created earlier in this run; a dry run writes nothing, so
    /// repeats within the batch are recognised here instead of in the repository
    created_licenses: HashSet<String>,
}

/// Batch upsert of source records keyed by licence number
pub struct HospitalImportService {
    repository: Arc<dyn HospitalRepository>,
    geocoder: Option<Arc<dyn Geocoder>>,
    request_delay: Duration,
}

impl HospitalImportService {
    pub fn new(
        repository: Arc<dyn HospitalRepository>,
        geocoder: Option<Arc<dyn Geocoder>>,
        request_delay: Duration,
    ) -> Self {
        Self {
            repository,
            geocoder,
            request_delay,
        }
    }

    pub async fn import(&self, dto: &ImportHospitalsDto) -> Result<ImportSummaryDto> {
        if dto.geocode && self.geocoder.is_none() {
            tracing::warn!("Geocoding requested but no geocoder is configured; skipping lookups");
        }

        tracing::info!(
            "Importing {} hospital records (geocode={}, dry_run={})",
            dto.records.len(),
            dto.geocode,
            dto.dry_run
        );

        let mut run = ImportRun {
            summary: ImportSummaryDto {
                total: dto.records.len(),
                dry_run: dto.dry_run,
                ..Default::default()
            },
            geocode: dto.geocode && !dto.dry_run,
            geocoder_calls: 0,
            created_licenses: HashSet::new(),
        };

        for (index, raw) in dto.records.iter().enumerate() {
            match self.import_record(&mut run, raw, dto.dry_run).await {
                Ok(outcome) => {
                    match outcome.action {
                        RecordAction::Created => run.summary.created += 1,
                        RecordAction::Updated => run.summary.updated += 1,
                    }
                    if outcome.geocoded {
                        run.summary.geocoded += 1;
                    }
                }
                Err(e) => {
                    tracing::warn!("Failed to import record {}: {}", index + 1, e);
                    run.summary.failed += 1;
                    if run.summary.errors.len() < MAX_IMPORT_ERRORS {
                        run.summary.errors.push(format!(
                            "record {} ({}): {}",
                            index + 1,
                            raw.name.trim(),
                            e
                        ));
                    }
                }
            }
        }

        let summary = run.summary;
        tracing::info!(
            "Hospital import finished: total={}, created={}, updated={}, failed={}, geocoded={}, dry_run={}",
            summary.total,
            summary.created,
            summary.updated,
            summary.failed,
            summary.geocoded,
            summary.dry_run
        );

        Ok(summary)
    }

    async fn import_record(
        &self,
        run: &mut ImportRun,
        raw: &RawHospitalRecord,
        dry_run: bool,
    ) -> Result<RecordOutcome> {
        let profile = clean_record(raw);
        if profile.name.is_empty() {
            return Err(AppError::Validation("機構名稱 is empty".to_string()));
        }

        let existing = if profile.license_no.is_empty() {
            None
        } else {
            match self.repository.get_by_license_no(&profile.license_no).await {
                Ok(hospital) => Some(hospital),
                Err(AppError::NotFound(_)) => None,
                Err(e) => return Err(e),
            }
        };

        match existing {
            Some(mut hospital) => {
                let (coordinates, geocoded) = match hospital.coordinates() {
                    Some(kept) => (Some(kept), false),
                    None => self.lookup(run, &profile.address).await,
                };

                if !dry_run {
                    hospital.replace_profile(profile, coordinates)?;
                    self.repository.update(&hospital).await?;
                }

                Ok(RecordOutcome {
                    action: RecordAction::Updated,
                    geocoded,
                })
            }
            None if dry_run && run.created_licenses.contains(&profile.license_no) => {
                Ok(RecordOutcome {
                    action: RecordAction::Updated,
                    geocoded: false,
                })
            }
            None => {
                let (coordinates, geocoded) = self.lookup(run, &profile.address).await;

                let license_no = profile.license_no.clone();
                let mut new = NewHospital::new(profile);
                if let Some(c) = coordinates {
                    new = new.with_coordinates(c)?;
                }
                if !dry_run {
                    self.repository.create(new).await?;
                }
                if !license_no.is_empty() {
                    run.created_licenses.insert(license_no);
                }

                Ok(RecordOutcome {
                    action: RecordAction::Created,
                    geocoded,
                })
            }
        }
    }

    /// Best-effort geocoding; failures and implausible results yield `None`
    async fn lookup(&self, run: &mut ImportRun, address: &str) -> (Option<Coordinates>, bool) {
        let geocoder = match &self.geocoder {
            Some(geocoder) if run.geocode && !address.is_empty() => geocoder,
            _ => return (None, false),
        };

        if run.geocoder_calls > 0 && !self.request_delay.is_zero() {
            tokio::time::sleep(self.request_delay).await;
        }
        run.geocoder_calls += 1;

        match geocoder.geocode(address).await {
            Ok(Some(c)) if c.is_valid() && !c.is_null_island() => (Some(c), true),
            Ok(Some(c)) => {
                tracing::warn!(
                    "Discarding implausible geocoder result ({}, {}) for {}",
                    c.latitude,
                    c.longitude,
                    address
                );
                (None, false)
            }
            Ok(None) => {
                tracing::debug!("No geocoder result for {}", address);
                (None, false)
            }
            Err(e) => {
                tracing::warn!("Geocoding failed for {}: {}", address, e);
                (None, false)
            }
        }
    }
}
