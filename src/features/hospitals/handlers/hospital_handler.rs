use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};

use crate::core::error::Result;
use crate::core::extractor::AppQuery;
use crate::features::hospitals::dtos::{
    HospitalResponseDto, LookupHospitalQuery, NearbyHospitalsQuery, NearbyHospitalsResponseDto,
    SearchHospitalsQuery, SearchHospitalsResponseDto, StatusCountsResponseDto,
};
use crate::features::hospitals::services::{
    HospitalService, ListNearbyHospitalsService, SearchHospitalsService,
};
use crate::shared::types::{ApiResponse, Meta};

/// State for public hospital handlers
#[derive(Clone)]
pub struct HospitalState {
    pub search_service: Arc<SearchHospitalsService>,
    pub nearby_service: Arc<ListNearbyHospitalsService>,
    pub hospital_service: Arc<HospitalService>,
}

/// Search hospitals by keyword, county, status, licence type and radius
#[utoipa::path(
    get,
    path = "/api/hospitals",
    params(SearchHospitalsQuery),
    responses(
        (status = 200, description = "One page of hospitals plus corpus-wide stats", body = ApiResponse<SearchHospitalsResponseDto>),
        (status = 400, description = "Malformed query parameters")
    ),
    tag = "hospitals"
)]
pub async fn search_hospitals(
    State(state): State<HospitalState>,
    AppQuery(query): AppQuery<SearchHospitalsQuery>,
) -> Result<Json<ApiResponse<SearchHospitalsResponseDto>>> {
    let result = state.search_service.search(&query).await?;
    let meta = Meta {
        total: result.total,
    };
    Ok(Json(ApiResponse::success(Some(result), None, Some(meta))))
}

/// List hospitals near a point, nearest first
#[utoipa::path(
    get,
    path = "/api/hospitals/nearby",
    params(NearbyHospitalsQuery),
    responses(
        (status = 200, description = "Hospitals within the radius", body = ApiResponse<NearbyHospitalsResponseDto>),
        (status = 400, description = "Missing or invalid coordinates")
    ),
    tag = "hospitals"
)]
pub async fn list_nearby_hospitals(
    State(state): State<HospitalState>,
    AppQuery(query): AppQuery<NearbyHospitalsQuery>,
) -> Result<Json<ApiResponse<NearbyHospitalsResponseDto>>> {
    let result = state.nearby_service.list(&query).await?;
    let meta = Meta {
        total: result.hospitals.len() as i64,
    };
    Ok(Json(ApiResponse::success(Some(result), None, Some(meta))))
}

/// Count hospitals per status over the whole directory
#[utoipa::path(
    get,
    path = "/api/hospitals/status-counts",
    responses(
        (status = 200, description = "Status counts", body = ApiResponse<StatusCountsResponseDto>)
    ),
    tag = "hospitals"
)]
pub async fn get_status_counts(
    State(state): State<HospitalState>,
) -> Result<Json<ApiResponse<StatusCountsResponseDto>>> {
    let counts = state.hospital_service.count_by_status().await?;
    Ok(Json(ApiResponse::success(Some(counts), None, None)))
}

/// Find a hospital by exact phone number or licence number
#[utoipa::path(
    get,
    path = "/api/hospitals/lookup",
    params(LookupHospitalQuery),
    responses(
        (status = 200, description = "Hospital found", body = ApiResponse<HospitalResponseDto>),
        (status = 400, description = "Neither or both of phone and license_no given"),
        (status = 404, description = "Hospital not found")
    ),
    tag = "hospitals"
)]
pub async fn lookup_hospital(
    State(state): State<HospitalState>,
    AppQuery(query): AppQuery<LookupHospitalQuery>,
) -> Result<Json<ApiResponse<HospitalResponseDto>>> {
    let hospital = state.hospital_service.lookup(&query).await?;
    Ok(Json(ApiResponse::success(Some(hospital), None, None)))
}

/// Get a hospital by ID
#[utoipa::path(
    get,
    path = "/api/hospitals/{id}",
    params(
        ("id" = String, Path, description = "Hospital ID (UUID)")
    ),
    responses(
        (status = 200, description = "Hospital details", body = ApiResponse<HospitalResponseDto>),
        (status = 400, description = "Malformed hospital ID"),
        (status = 404, description = "Hospital not found")
    ),
    tag = "hospitals"
)]
pub async fn get_hospital(
    State(state): State<HospitalState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<HospitalResponseDto>>> {
    let hospital = state.hospital_service.get_detail(&id).await?;
    Ok(Json(ApiResponse::success(Some(hospital), None, None)))
}
