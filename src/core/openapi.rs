use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::features::hospitals::{dtos as hospitals_dtos, handlers as hospitals_handlers, models};
use crate::shared::types::{ApiResponse, Meta};

#[derive(OpenApi)]
#[openapi(
    paths(
        // Hospitals (public)
        hospitals_handlers::hospital_handler::search_hospitals,
        hospitals_handlers::hospital_handler::list_nearby_hospitals,
        hospitals_handlers::hospital_handler::get_status_counts,
        hospitals_handlers::hospital_handler::lookup_hospital,
        hospitals_handlers::hospital_handler::get_hospital,
        // Admin
        hospitals_handlers::admin_handler::create_hospital,
        hospitals_handlers::admin_handler::update_hospital,
        hospitals_handlers::admin_handler::change_hospital_status,
        hospitals_handlers::admin_handler::update_hospital_location,
        hospitals_handlers::admin_handler::delete_hospital,
        hospitals_handlers::admin_handler::import_hospitals,
    ),
    components(
        schemas(
            // Shared
            Meta,
            models::Coordinates,
            // Hospitals
            hospitals_dtos::HospitalResponseDto,
            hospitals_dtos::HospitalStatsDto,
            hospitals_dtos::SearchHospitalsResponseDto,
            hospitals_dtos::NearbyHospitalsResponseDto,
            hospitals_dtos::StatusCountsResponseDto,
            ApiResponse<hospitals_dtos::HospitalResponseDto>,
            ApiResponse<hospitals_dtos::SearchHospitalsResponseDto>,
            ApiResponse<hospitals_dtos::NearbyHospitalsResponseDto>,
            ApiResponse<hospitals_dtos::StatusCountsResponseDto>,
            // Admin
            hospitals_dtos::CreateHospitalDto,
            hospitals_dtos::UpdateHospitalDto,
            hospitals_dtos::ChangeStatusDto,
            hospitals_dtos::UpdateLocationDto,
            hospitals_dtos::RawHospitalRecord,
            hospitals_dtos::ImportHospitalsDto,
            hospitals_dtos::ImportSummaryDto,
            hospitals_dtos::DeleteHospitalResponseDto,
            ApiResponse<hospitals_dtos::ImportSummaryDto>,
            ApiResponse<hospitals_dtos::DeleteHospitalResponseDto>,
        )
    ),
    tags(
        (name = "hospitals", description = "Veterinary hospital directory (public)"),
        (name = "admin", description = "Hospital maintenance and import (basic auth)"),
    ),
    modifiers(&SecurityAddon),
    info(
        title = "Petlog Hospitals API",
        version = "0.1.0",
        description = "API documentation for the Petlog veterinary hospital directory",
    )
)]
pub struct ApiDoc;

/// Adds the HTTP basic security scheme used by admin endpoints
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "basic_auth",
                SecurityScheme::Http(HttpBuilder::new().scheme(HttpAuthScheme::Basic).build()),
            );
        }
    }
}

/// Modifier to override OpenAPI info from config
pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_hospital_paths() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/hospitals",
            "/api/hospitals/nearby",
            "/api/hospitals/{id}",
            "/api/admin/hospitals/import",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {}", path);
        }

        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("basic_auth"));
    }

    #[test]
    fn test_swagger_info_modifier_overrides_info() {
        let mut doc = ApiDoc::openapi();
        SwaggerInfoModifier {
            title: "Custom".to_string(),
            version: "9.9.9".to_string(),
            description: "Overridden".to_string(),
        }
        .modify(&mut doc);

        assert_eq!(doc.info.title, "Custom");
        assert_eq!(doc.info.version, "9.9.9");
        assert_eq!(doc.info.description.as_deref(), Some("Overridden"));
    }
}
