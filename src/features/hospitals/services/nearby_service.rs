use std::sync::Arc;

use crate::core::error::{AppError, Result};
use crate::features::hospitals::dtos::{
    HospitalResponseDto, NearbyHospitalsQuery, NearbyHospitalsResponseDto,
};
use crate::features::hospitals::models::{Coordinates, GeoRadius};
use crate::features::hospitals::repositories::{HospitalRepository, NearbyOptions};
use crate::shared::constants::{DEFAULT_NEARBY_LIMIT, DEFAULT_NEARBY_RADIUS_KM, MAX_PAGE_SIZE};

/// Radius-bounded proximity search
pub struct ListNearbyHospitalsService {
    repository: Arc<dyn HospitalRepository>,
}

impl ListNearbyHospitalsService {
    pub fn new(repository: Arc<dyn HospitalRepository>) -> Self {
        Self { repository }
    }

    pub async fn list(&self, query: &NearbyHospitalsQuery) -> Result<NearbyHospitalsResponseDto> {
        let center = Coordinates::try_new(query.latitude, query.longitude)?;

        let radius_km = query
            .radius_km
            .filter(|r| r.is_finite() && *r > 0.0)
            .unwrap_or(DEFAULT_NEARBY_RADIUS_KM);
        let limit = query
            .limit
            .filter(|l| *l > 0)
            .unwrap_or(DEFAULT_NEARBY_LIMIT)
            .min(MAX_PAGE_SIZE);

        let area = GeoRadius::new(center, radius_km).ok_or_else(|| {
            AppError::Internal(format!("Rejected nearby radius {} km", radius_km))
        })?;

        tracing::info!(
            "Listing hospitals near ({}, {}) within {} km, limit={}",
            center.latitude,
            center.longitude,
            radius_km,
            limit
        );

        let hospitals = self
            .repository
            .get_nearby(&NearbyOptions { area, limit })
            .await?;

        tracing::info!("Found {} nearby hospitals", hospitals.len());

        Ok(NearbyHospitalsResponseDto {
            hospitals: hospitals.into_iter().map(HospitalResponseDto::from).collect(),
        })
    }
}
