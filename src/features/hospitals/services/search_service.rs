use std::sync::Arc;

use crate::core::error::Result;
use crate::features::hospitals::dtos::{
    HospitalResponseDto, SearchHospitalsQuery, SearchHospitalsResponseDto,
};
use crate::features::hospitals::models::{Coordinates, GeoRadius};
use crate::features::hospitals::repositories::{
    HospitalFilter, HospitalRepository, HospitalSort, SearchOptions,
};
use crate::shared::types::Pagination;

/// Keyword / facet search over the hospital directory
pub struct SearchHospitalsService {
    repository: Arc<dyn HospitalRepository>,
}

impl SearchHospitalsService {
    pub fn new(repository: Arc<dyn HospitalRepository>) -> Self {
        Self { repository }
    }

    pub async fn search(&self, query: &SearchHospitalsQuery) -> Result<SearchHospitalsResponseDto> {
        let pagination = Pagination::normalize(query.page, query.limit);
        let center = search_center(query);

        let mut filter = HospitalFilter::new()
            .with_keyword(query.keyword.clone().unwrap_or_default())
            .with_county(query.county.clone().unwrap_or_default())
            .with_status(query.status.clone().unwrap_or_default())
            .with_license_type(query.license_type.clone().unwrap_or_default());

        if let (Some(center), Some(radius)) = (center, query.radius) {
            match GeoRadius::new(center, radius) {
                Some(area) => filter = filter.within(area),
                None => tracing::warn!("Ignoring non-positive search radius {}", radius),
            }
        }

        let sort = resolve_sort(
            query.sort_by.as_deref(),
            filter.keyword().is_some(),
            center,
        );

        tracing::info!(
            "Searching hospitals: keyword={:?}, county={:?}, status={:?}, license_type={:?}, within={:?}, sort={:?}, page={}, limit={}",
            filter.keyword(),
            filter.county(),
            filter.status(),
            filter.license_type(),
            filter.area(),
            sort,
            pagination.page,
            pagination.limit
        );

        let options = SearchOptions::new(filter)
            .sorted_by(sort)
            .paginate(pagination);

        let result = self.repository.search(&options).await?;
        let facets = self.repository.facets(&options.filter).await?;

        tracing::info!(
            "Hospital search matched {} records, returning {}",
            result.total,
            result.hospitals.len()
        );

        Ok(SearchHospitalsResponseDto {
            hospitals: result
                .hospitals
                .into_iter()
                .map(HospitalResponseDto::from)
                .collect(),
            total: result.total,
            page: pagination.page,
            limit: pagination.limit,
            stats: facets.into(),
        })
    }
}

/// A valid centre from the query, if both components were given
fn search_center(query: &SearchHospitalsQuery) -> Option<Coordinates> {
    let (latitude, longitude) = match (query.latitude, query.longitude) {
        (Some(latitude), Some(longitude)) => (latitude, longitude),
        (None, None) => return None,
        _ => {
            tracing::warn!("Ignoring search centre with only one coordinate component");
            return None;
        }
    };

    let center = Coordinates::new(latitude, longitude);
    if center.is_valid() {
        Some(center)
    } else {
        tracing::warn!(
            "Ignoring invalid search centre ({}, {})",
            latitude,
            longitude
        );
        None
    }
}

fn resolve_sort(sort_by: Option<&str>, has_keyword: bool, center: Option<Coordinates>) -> HospitalSort {
    match sort_by.map(str::trim).filter(|s| !s.is_empty()) {
        Some("distance") => center.map_or(HospitalSort::Default, HospitalSort::Distance),
        Some("relevance") => HospitalSort::Relevance,
        Some("name") => HospitalSort::Name,
        None if has_keyword => HospitalSort::Relevance,
        _ => HospitalSort::Default,
    }
}
