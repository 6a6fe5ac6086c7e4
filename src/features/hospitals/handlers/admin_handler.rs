use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use crate::core::error::Result;
use crate::core::extractor::AppJson;
use crate::features::hospitals::dtos::{
    ChangeStatusDto, CreateHospitalDto, DeleteHospitalResponseDto, HospitalResponseDto,
    ImportHospitalsDto, ImportSummaryDto, UpdateHospitalDto, UpdateLocationDto,
};
use crate::features::hospitals::services::{HospitalImportService, HospitalService};
use crate::shared::types::ApiResponse;

/// State for administrative hospital handlers
#[derive(Clone)]
pub struct AdminHospitalState {
    pub hospital_service: Arc<HospitalService>,
    pub import_service: Arc<HospitalImportService>,
}

/// Create a hospital
#[utoipa::path(
    post,
    path = "/api/admin/hospitals",
    request_body = CreateHospitalDto,
    responses(
        (status = 201, description = "Hospital created", body = ApiResponse<HospitalResponseDto>),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "license_no already exists")
    ),
    tag = "admin",
    security(("basic_auth" = []))
)]
pub async fn create_hospital(
    State(state): State<AdminHospitalState>,
    AppJson(dto): AppJson<CreateHospitalDto>,
) -> Result<(StatusCode, Json<ApiResponse<HospitalResponseDto>>)> {
    let hospital = state.hospital_service.create(&dto).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(
            Some(hospital),
            Some("Hospital created".to_string()),
            None,
        )),
    ))
}

/// Replace every field of a hospital
#[utoipa::path(
    put,
    path = "/api/admin/hospitals/{id}",
    params(
        ("id" = String, Path, description = "Hospital ID (UUID)")
    ),
    request_body = UpdateHospitalDto,
    responses(
        (status = 200, description = "Hospital updated", body = ApiResponse<HospitalResponseDto>),
        (status = 400, description = "Validation error"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Hospital not found"),
        (status = 409, description = "Version conflict or duplicate license_no")
    ),
    tag = "admin",
    security(("basic_auth" = []))
)]
pub async fn update_hospital(
    State(state): State<AdminHospitalState>,
    Path(id): Path<String>,
    AppJson(dto): AppJson<UpdateHospitalDto>,
) -> Result<Json<ApiResponse<HospitalResponseDto>>> {
    let hospital = state.hospital_service.update(&id, &dto).await?;
    Ok(Json(ApiResponse::success(Some(hospital), None, None)))
}

/// Change the status of a hospital
#[utoipa::path(
    patch,
    path = "/api/admin/hospitals/{id}/status",
    params(
        ("id" = String, Path, description = "Hospital ID (UUID)")
    ),
    request_body = ChangeStatusDto,
    responses(
        (status = 200, description = "Status changed", body = ApiResponse<HospitalResponseDto>),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Hospital not found"),
        (status = 409, description = "Version conflict")
    ),
    tag = "admin",
    security(("basic_auth" = []))
)]
pub async fn change_hospital_status(
    State(state): State<AdminHospitalState>,
    Path(id): Path<String>,
    AppJson(dto): AppJson<ChangeStatusDto>,
) -> Result<Json<ApiResponse<HospitalResponseDto>>> {
    let hospital = state.hospital_service.change_status(&id, &dto).await?;
    Ok(Json(ApiResponse::success(Some(hospital), None, None)))
}

/// Set the location of a hospital
#[utoipa::path(
    put,
    path = "/api/admin/hospitals/{id}/location",
    params(
        ("id" = String, Path, description = "Hospital ID (UUID)")
    ),
    request_body = UpdateLocationDto,
    responses(
        (status = 200, description = "Location updated", body = ApiResponse<HospitalResponseDto>),
        (status = 400, description = "Invalid coordinates"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Hospital not found"),
        (status = 409, description = "Version conflict")
    ),
    tag = "admin",
    security(("basic_auth" = []))
)]
pub async fn update_hospital_location(
    State(state): State<AdminHospitalState>,
    Path(id): Path<String>,
    AppJson(dto): AppJson<UpdateLocationDto>,
) -> Result<Json<ApiResponse<HospitalResponseDto>>> {
    let hospital = state.hospital_service.update_location(&id, &dto).await?;
    Ok(Json(ApiResponse::success(Some(hospital), None, None)))
}

/// Delete a hospital
#[utoipa::path(
    delete,
    path = "/api/admin/hospitals/{id}",
    params(
        ("id" = String, Path, description = "Hospital ID (UUID)")
    ),
    responses(
        (status = 200, description = "Hospital deleted", body = ApiResponse<DeleteHospitalResponseDto>),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Hospital not found")
    ),
    tag = "admin",
    security(("basic_auth" = []))
)]
pub async fn delete_hospital(
    State(state): State<AdminHospitalState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<DeleteHospitalResponseDto>>> {
    let result = state.hospital_service.delete(&id).await?;
    Ok(Json(ApiResponse::success(Some(result), None, None)))
}

/// Import records from the veterinary hospital dataset
#[utoipa::path(
    post,
    path = "/api/admin/hospitals/import",
    request_body = ImportHospitalsDto,
    responses(
        (status = 200, description = "Import summary", body = ApiResponse<ImportSummaryDto>),
        (status = 400, description = "Malformed body"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "admin",
    security(("basic_auth" = []))
)]
pub async fn import_hospitals(
    State(state): State<AdminHospitalState>,
    AppJson(dto): AppJson<ImportHospitalsDto>,
) -> Result<Json<ApiResponse<ImportSummaryDto>>> {
    let summary = state.import_service.import(&dto).await?;
    Ok(Json(ApiResponse::success(Some(summary), None, None)))
}
