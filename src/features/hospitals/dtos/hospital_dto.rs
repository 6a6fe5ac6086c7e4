use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::features::hospitals::models::{Coordinates, Hospital, HospitalProfile};
use crate::features::hospitals::repositories::SearchFacets;

// =============================================================================
// QUERY PARAMETERS
// =============================================================================

/// Query parameters for `GET /api/hospitals`
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct SearchHospitalsQuery {
    /// Whitespace-separated terms matched against name, address and veterinarian
    pub keyword: Option<String>,
    pub county: Option<String>,
    pub status: Option<String>,
    pub license_type: Option<String>,
    /// Search centre latitude (used with `longitude`)
    pub latitude: Option<f64>,
    /// Search centre longitude (used with `latitude`)
    pub longitude: Option<f64>,
    /// Radius in km around the centre; ignored unless > 0
    pub radius: Option<f64>,
    /// Page number (1-indexed, default: 1)
    #[param(minimum = 1)]
    pub page: Option<i64>,
    /// Items per page (default: 20, max: 100)
    #[param(minimum = 1, maximum = 100)]
    pub limit: Option<i64>,
    /// `relevance`, `name` or `distance`
    #[param(example = "relevance")]
    pub sort_by: Option<String>,
}

/// Query parameters for `GET /api/hospitals/nearby`
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct NearbyHospitalsQuery {
    pub latitude: f64,
    pub longitude: f64,
    /// Default: 10
    pub radius_km: Option<f64>,
    /// Default: 50
    pub limit: Option<i64>,
}

/// Exactly one of `phone` or `license_no`
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
pub struct LookupHospitalQuery {
    pub phone: Option<String>,
    pub license_no: Option<String>,
}

// =============================================================================
// REQUEST BODIES
// =============================================================================

/// Request DTO for creating a hospital
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateHospitalDto {
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,

    #[validate(length(min = 1, max = 500, message = "Address must be 1-500 characters"))]
    pub address: String,

    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub county: String,
    #[serde(default)]
    pub veterinarian: String,
    #[serde(default)]
    pub license_type: String,
    #[serde(default)]
    pub license_no: String,
    #[serde(default)]
    pub status: String,
    /// `YYYY-MM-DD`
    #[serde(default)]
    pub issued_date: String,

    #[validate(range(min = -90.0, max = 90.0, message = "Latitude must be between -90 and 90"))]
    pub latitude: Option<f64>,

    #[validate(range(
        min = -180.0,
        max = 180.0,
        message = "Longitude must be between -180 and 180"
    ))]
    pub longitude: Option<f64>,
}

impl CreateHospitalDto {
    pub fn to_profile(&self) -> HospitalProfile {
        HospitalProfile {
            name: self.name.trim().to_string(),
            address: self.address.trim().to_string(),
            phone: self.phone.trim().to_string(),
            county: self.county.trim().to_string(),
            veterinarian: self.veterinarian.trim().to_string(),
            license_type: self.license_type.trim().to_string(),
            license_no: self.license_no.trim().to_string(),
            status: self.status.trim().to_string(),
            issued_date: self.issued_date.trim().to_string(),
        }
    }
}

/// Whole-record replace, guarded by the version the client last read
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct UpdateHospitalDto {
    #[serde(flatten)]
    #[validate(nested)]
    pub hospital: CreateHospitalDto,
    pub version: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChangeStatusDto {
    /// Free text, e.g. `開業`
    pub status: String,
    pub version: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateLocationDto {
    pub latitude: f64,
    pub longitude: f64,
    pub version: i64,
}

/// One record of the government veterinary hospital dataset, keyed as published
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct RawHospitalRecord {
    #[serde(rename = "縣市", default)]
    pub county: String,
    #[serde(rename = "字號", default)]
    pub license_no: String,
    #[serde(rename = "執照類別", default)]
    pub license_type: String,
    #[serde(rename = "狀態", default)]
    pub status: String,
    #[serde(rename = "機構名稱", default)]
    pub name: String,
    #[serde(rename = "負責獸醫", default)]
    pub veterinarian: String,
    #[serde(rename = "機構電話", default)]
    pub phone: String,
    #[serde(rename = "發照日期", default)]
    pub issued_date: String,
    #[serde(rename = "機構地址", default)]
    pub address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ImportHospitalsDto {
    pub records: Vec<RawHospitalRecord>,
    /// Look up coordinates for records without a valid location
    #[serde(default)]
    pub geocode: bool,
    /// Report what would happen without writing
    #[serde(default)]
    pub dry_run: bool,
}

// =============================================================================
// RESPONSES
// =============================================================================

/// Response DTO for a hospital
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HospitalResponseDto {
    pub id: Uuid,
    pub name: String,
    pub address: String,
    pub phone: String,
    pub county: String,
    pub veterinarian: String,
    pub license_type: String,
    pub license_no: String,
    pub status: String,
    /// `status` is `開業`
    pub is_operating: bool,
    pub issued_date: String,
    /// `null` when the location is unknown
    pub coordinates: Option<Coordinates>,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Hospital> for HospitalResponseDto {
    fn from(h: Hospital) -> Self {
        let coordinates = h.coordinates();
        let is_operating = h.is_operating();
        let profile = h.profile().clone();
        Self {
            id: h.id(),
            name: profile.name,
            address: profile.address,
            phone: profile.phone,
            county: profile.county,
            veterinarian: profile.veterinarian,
            license_type: profile.license_type,
            license_no: profile.license_no,
            status: profile.status,
            is_operating,
            issued_date: profile.issued_date,
            coordinates,
            version: h.version(),
            created_at: h.created_at(),
            updated_at: h.updated_at(),
        }
    }
}

/// Corpus-wide counts over every record matching the search filter
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HospitalStatsDto {
    pub total_hospitals: i64,
    pub by_status: BTreeMap<String, i64>,
    pub by_license_type: BTreeMap<String, i64>,
    pub by_county: BTreeMap<String, i64>,
}

impl From<SearchFacets> for HospitalStatsDto {
    fn from(facets: SearchFacets) -> Self {
        Self {
            total_hospitals: facets.total(),
            by_status: facets.by_status,
            by_license_type: facets.by_license_type,
            by_county: facets.by_county,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SearchHospitalsResponseDto {
    pub hospitals: Vec<HospitalResponseDto>,
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub stats: HospitalStatsDto,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NearbyHospitalsResponseDto {
    pub hospitals: Vec<HospitalResponseDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StatusCountsResponseDto {
    pub counts: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeleteHospitalResponseDto {
    pub id: Uuid,
    pub deleted: bool,
}

/// Outcome of a batch import
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ImportSummaryDto {
    pub total: usize,
    pub created: usize,
    pub updated: usize,
    pub failed: usize,
    pub geocoded: usize,
    pub dry_run: bool,
    /// Per-record failure messages (capped)
    pub errors: Vec<String>,
}
