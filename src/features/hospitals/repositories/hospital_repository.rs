use std::collections::BTreeMap;

use async_trait::async_trait;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::hospitals::models::{keyword_terms, Coordinates, GeoRadius, Hospital, NewHospital};
use crate::shared::types::Pagination;

/// Filter half of a search. Blank strings mean "no filter".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HospitalFilter {
    keyword: Option<String>,
    county: Option<String>,
    status: Option<String>,
    license_type: Option<String>,
    within: Option<GeoRadius>,
}

fn non_blank(value: impl Into<String>) -> Option<String> {
    let value = value.into();
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

impl HospitalFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = non_blank(keyword);
        self
    }

    pub fn with_county(mut self, county: impl Into<String>) -> Self {
        self.county = non_blank(county);
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = non_blank(status);
        self
    }

    pub fn with_license_type(mut self, license_type: impl Into<String>) -> Self {
        self.license_type = non_blank(license_type);
        self
    }

    pub fn within(mut self, area: GeoRadius) -> Self {
        self.within = Some(area);
        self
    }

    pub fn keyword(&self) -> Option<&str> {
        self.keyword.as_deref()
    }

    pub fn county(&self) -> Option<&str> {
        self.county.as_deref()
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn license_type(&self) -> Option<&str> {
        self.license_type.as_deref()
    }

    pub fn area(&self) -> Option<GeoRadius> {
        self.within
    }

    pub fn keyword_terms(&self) -> Vec<String> {
        self.keyword.as_deref().map(keyword_terms).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub enum HospitalSort {
    /// Id ascending, i.e. insertion order
    #[default]
    Default,
    /// Keyword score descending, then name, then id
    Relevance,
    /// Name, then id
    Name,
    /// Distance from the centre ascending, unknown locations last, then id
    Distance(Coordinates),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchOptions {
    pub filter: HospitalFilter,
    pub sort: HospitalSort,
    pub limit: i64,
    pub skip: i64,
}

impl SearchOptions {
    pub fn new(filter: HospitalFilter) -> Self {
        let pagination = Pagination::default();
        Self {
            filter,
            sort: HospitalSort::Default,
            limit: pagination.limit,
            skip: pagination.skip(),
        }
    }

    pub fn sorted_by(mut self, sort: HospitalSort) -> Self {
        self.sort = sort;
        self
    }

    pub fn paginate(mut self, pagination: Pagination) -> Self {
        self.limit = pagination.limit;
        self.skip = pagination.skip();
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NearbyOptions {
    pub area: GeoRadius,
    pub limit: i64,
}

/// One page of hospitals plus the number of matches before paging
#[derive(Debug, Clone)]
pub struct SearchResult {
    pub hospitals: Vec<Hospital>,
    pub total: i64,
}

/// Grouped counts over every record matching a filter.
/// Empty values are counted under `""`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFacets {
    pub by_status: BTreeMap<String, i64>,
    pub by_license_type: BTreeMap<String, i64>,
    pub by_county: BTreeMap<String, i64>,
}

impl SearchFacets {
    pub fn total(&self) -> i64 {
        self.by_status.values().sum()
    }
}

/// Storage contract for hospital records.
///
/// Implementations translate storage failures into [`AppError`]:
/// a missing record is `NotFound`, a `license_no` collision is
/// `DuplicateEntry`, a stale `version` on update is `UpdateConflict`.
#[async_trait]
pub trait HospitalRepository: Send + Sync {
    async fn create(&self, hospital: NewHospital) -> Result<Hospital>;

    async fn get_by_id(&self, id: Uuid) -> Result<Hospital>;

    /// First exact match, oldest id first
    async fn get_by_phone(&self, phone: &str) -> Result<Hospital>;

    /// First exact match, oldest id first
    async fn get_by_license_no(&self, license_no: &str) -> Result<Hospital>;

    async fn search(&self, options: &SearchOptions) -> Result<SearchResult>;

    async fn facets(&self, filter: &HospitalFilter) -> Result<SearchFacets>;

    /// Within the radius, ascending by distance (ties by id), capped at the limit
    async fn get_nearby(&self, options: &NearbyOptions) -> Result<Vec<Hospital>>;

    /// Full-field replace guarded by `hospital.version()`; returns the stored record
    async fn update(&self, hospital: &Hospital) -> Result<Hospital>;

    async fn delete(&self, id: Uuid) -> Result<()>;

    async fn count_by_status(&self) -> Result<BTreeMap<String, i64>>;
}

/// Rejects a blank exact-match lookup value
pub fn require_lookup_value<'a>(field: &str, value: &'a str) -> Result<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::BadRequest(format!("{} must not be empty", field)));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_blank_values_are_no_filter() {
        let filter = HospitalFilter::new()
            .with_keyword("   ")
            .with_county("")
            .with_status(" 開業 ")
            .with_license_type("\t");

        assert_eq!(filter.keyword(), None);
        assert_eq!(filter.county(), None);
        assert_eq!(filter.status(), Some("開業"));
        assert_eq!(filter.license_type(), None);
        assert!(filter.keyword_terms().is_empty());
    }

    #[test]
    fn test_search_options_paginate() {
        let options = SearchOptions::new(HospitalFilter::new())
            .paginate(Pagination::normalize(Some(3), Some(10)));
        assert_eq!(options.limit, 10);
        assert_eq!(options.skip, 20);
        assert_eq!(options.sort, HospitalSort::Default);
    }

    #[test]
    fn test_require_lookup_value() {
        assert_eq!(require_lookup_value("phone", " 0223 ").unwrap(), "0223");
        assert!(matches!(
            require_lookup_value("phone", "  "),
            Err(AppError::BadRequest(_))
        ));
    }
}
