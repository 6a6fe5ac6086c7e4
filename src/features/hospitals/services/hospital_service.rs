use std::sync::Arc;

use uuid::Uuid;
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::features::hospitals::dtos::{
    ChangeStatusDto, CreateHospitalDto, DeleteHospitalResponseDto, HospitalResponseDto,
    LookupHospitalQuery, StatusCountsResponseDto, UpdateHospitalDto, UpdateLocationDto,
};
use crate::features::hospitals::models::{Coordinates, NewHospital};
use crate::features::hospitals::repositories::HospitalRepository;
use crate::features::hospitals::services::import_service::format_issued_date;

/// Parses a hospital id from a path segment
pub fn parse_hospital_id(id: &str) -> Result<Uuid> {
    Uuid::parse_str(id.trim())
        .map_err(|_| AppError::InvalidId(format!("'{}' is not a valid hospital id", id)))
}

/// Both or neither of latitude/longitude
fn optional_coordinates(latitude: Option<f64>, longitude: Option<f64>) -> Result<Option<Coordinates>> {
    match (latitude, longitude) {
        (Some(latitude), Some(longitude)) => Coordinates::try_new(latitude, longitude).map(Some),
        (None, None) => Ok(None),
        _ => Err(AppError::Validation(
            "latitude and longitude must be given together".to_string(),
        )),
    }
}

/// Detail, lookup and administrative operations on single hospitals
pub struct HospitalService {
    repository: Arc<dyn HospitalRepository>,
}

impl HospitalService {
    pub fn new(repository: Arc<dyn HospitalRepository>) -> Self {
        Self { repository }
    }

    pub async fn get_detail(&self, id: &str) -> Result<HospitalResponseDto> {
        let id = parse_hospital_id(id)?;
        let hospital = self.repository.get_by_id(id).await?;
        Ok(hospital.into())
    }

    /// Exact lookup by phone or licence number; exactly one must be given
    pub async fn lookup(&self, query: &LookupHospitalQuery) -> Result<HospitalResponseDto> {
        let phone = query.phone.as_deref().filter(|p| !p.trim().is_empty());
        let license_no = query.license_no.as_deref().filter(|l| !l.trim().is_empty());

        let hospital = match (phone, license_no) {
            (Some(phone), None) => self.repository.get_by_phone(phone).await?,
            (None, Some(license_no)) => self.repository.get_by_license_no(license_no).await?,
            _ => {
                return Err(AppError::BadRequest(
                    "Exactly one of phone or license_no is required".to_string(),
                ))
            }
        };

        Ok(hospital.into())
    }

    pub async fn count_by_status(&self) -> Result<StatusCountsResponseDto> {
        let counts = self.repository.count_by_status().await?;
        Ok(StatusCountsResponseDto { counts })
    }

    pub async fn create(&self, dto: &CreateHospitalDto) -> Result<HospitalResponseDto> {
        dto.validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;

        // Compact dataset dates (YYYYMMDD) are stored as YYYY-MM-DD
        let mut new =
            NewHospital::new(dto.to_profile()).with_issued_date(format_issued_date(&dto.issued_date));
        if let Some(coordinates) = optional_coordinates(dto.latitude, dto.longitude)? {
            new = new.with_coordinates(coordinates)?;
        }

        let hospital = self.repository.create(new).await?;

        tracing::info!(
            "Hospital created: id={}, license_no={:?}",
            hospital.id(),
            hospital.profile().license_no
        );

        Ok(hospital.into())
    }

    pub async fn update(&self, id: &str, dto: &UpdateHospitalDto) -> Result<HospitalResponseDto> {
        let id = parse_hospital_id(id)?;
        dto.validate()
            .map_err(|e| AppError::Validation(e.to_string()))?;
        let coordinates = optional_coordinates(dto.hospital.latitude, dto.hospital.longitude)?;

        let mut hospital = self.repository.get_by_id(id).await?;
        let mut profile = dto.hospital.to_profile();
        profile.issued_date = format_issued_date(&profile.issued_date);
        hospital.replace_profile(profile, coordinates)?;
        hospital.set_version(dto.version);

        let updated = self.repository.update(&hospital).await?;
        tracing::info!("Hospital updated: id={}, version={}", id, updated.version());

        Ok(updated.into())
    }

    pub async fn change_status(&self, id: &str, dto: &ChangeStatusDto) -> Result<HospitalResponseDto> {
        let id = parse_hospital_id(id)?;

        let mut hospital = self.repository.get_by_id(id).await?;
        hospital.change_status(dto.status.trim());
        hospital.set_version(dto.version);

        let updated = self.repository.update(&hospital).await?;
        tracing::info!(
            "Hospital status changed: id={}, status={:?}",
            id,
            updated.profile().status
        );

        Ok(updated.into())
    }

    pub async fn update_location(
        &self,
        id: &str,
        dto: &UpdateLocationDto,
    ) -> Result<HospitalResponseDto> {
        let id = parse_hospital_id(id)?;
        let coordinates = Coordinates::try_new(dto.latitude, dto.longitude)?;

        let mut hospital = self.repository.get_by_id(id).await?;
        hospital.update_location(coordinates)?;
        hospital.set_version(dto.version);

        let updated = self.repository.update(&hospital).await?;
        tracing::info!(
            "Hospital location updated: id={}, coordinates=({}, {})",
            id,
            coordinates.latitude,
            coordinates.longitude
        );

        Ok(updated.into())
    }

    pub async fn delete(&self, id: &str) -> Result<DeleteHospitalResponseDto> {
        let id = parse_hospital_id(id)?;
        self.repository.delete(id).await?;
        tracing::info!("Hospital deleted: id={}", id);

        Ok(DeleteHospitalResponseDto { id, deleted: true })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::hospitals::repositories::InMemoryHospitalRepository;
    use crate::shared::test_helpers::{seed_hospital, HospitalProfileBuilder};

    fn setup() -> (Arc<InMemoryHospitalRepository>, HospitalService) {
        let repo = Arc::new(InMemoryHospitalRepository::new());
        let service = HospitalService::new(repo.clone());
        (repo, service)
    }

    fn create_dto(name: &str, license_no: &str) -> CreateHospitalDto {
        CreateHospitalDto {
            name: name.to_string(),
            address: "臺北市大安區復興南路一段1號".to_string(),
            license_no: license_no.to_string(),
            status: "開業".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_hospital_id() {
        let id = Uuid::now_v7();
        assert_eq!(parse_hospital_id(&id.to_string()).unwrap(), id);
        assert!(matches!(
            parse_hospital_id("not-a-uuid"),
            Err(AppError::InvalidId(_))
        ));
    }

    #[tokio::test]
    async fn test_get_detail_invalid_and_missing_id() {
        let (repo, service) = setup();

        assert!(matches!(
            service.get_detail("123").await,
            Err(AppError::InvalidId(_))
        ));
        assert_eq!(repo.calls(), 0);

        assert!(matches!(
            service.get_detail(&Uuid::now_v7().to_string()).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_create_and_duplicate_license() {
        let (_repo, service) = setup();

        let created = service.create(&create_dto("Happy Vet", "北市獸字第001號")).await.unwrap();
        assert_eq!(created.version, 1);
        assert_eq!(created.coordinates, None);

        let err = service
            .create(&create_dto("Other Vet", "北市獸字第001號"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::DuplicateEntry(_)));

        // Empty licence numbers never collide
        service.create(&create_dto("No Licence A", "")).await.unwrap();
        service.create(&create_dto("No Licence B", "")).await.unwrap();
    }

    #[tokio::test]
    async fn test_create_normalizes_issued_date() {
        let (_repo, service) = setup();

        let mut dto = create_dto("Happy Vet", "北市獸字第002號");
        dto.issued_date = "20190315".to_string();
        let created = service.create(&dto).await.unwrap();
        assert_eq!(created.issued_date, "2019-03-15");
        assert!(created.is_operating);

        let mut dto = create_dto("Closed Vet", "北市獸字第003號");
        dto.status = "歇業".to_string();
        dto.issued_date = "2019/03/15".to_string();
        let created = service.create(&dto).await.unwrap();
        assert_eq!(created.issued_date, "2019/03/15");
        assert!(!created.is_operating);
    }

    #[tokio::test]
    async fn test_create_validation() {
        let (repo, service) = setup();

        let err = service.create(&create_dto("", "")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let mut dto = create_dto("Happy Vet", "");
        dto.latitude = Some(95.0);
        dto.longitude = Some(121.0);
        assert!(matches!(
            service.create(&dto).await,
            Err(AppError::Validation(_))
        ));

        dto.latitude = Some(25.0);
        dto.longitude = None;
        assert!(matches!(
            service.create(&dto).await,
            Err(AppError::Validation(_))
        ));
        assert_eq!(repo.calls(), 0);
    }

    #[tokio::test]
    async fn test_lookup() {
        let (repo, service) = setup();
        let hospital = seed_hospital(
            &repo,
            HospitalProfileBuilder::new("Happy Vet")
                .phone("0223456789")
                .license_no("北市獸字第002號")
                .build(),
            None,
        )
        .await;

        let by_phone = service
            .lookup(&LookupHospitalQuery {
                phone: Some("0223456789".to_string()),
                license_no: None,
            })
            .await
            .unwrap();
        assert_eq!(by_phone.id, hospital.id());

        let by_license = service
            .lookup(&LookupHospitalQuery {
                phone: None,
                license_no: Some("北市獸字第002號".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(by_license.id, hospital.id());

        assert!(matches!(
            service.lookup(&LookupHospitalQuery::default()).await,
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            service
                .lookup(&LookupHospitalQuery {
                    phone: Some("   ".to_string()),
                    license_no: None,
                })
                .await,
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            service
                .lookup(&LookupHospitalQuery {
                    phone: Some("0900000000".to_string()),
                    license_no: None,
                })
                .await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_version_conflict() {
        let (_repo, service) = setup();
        let created = service.create(&create_dto("Happy Vet", "")).await.unwrap();
        let id = created.id.to_string();

        let updated = service
            .change_status(
                &id,
                &ChangeStatusDto {
                    status: "歇業".to_string(),
                    version: 1,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.version, 2);
        assert_eq!(updated.status, "歇業");

        // A second writer still holding version 1
        let err = service
            .update(
                &id,
                &UpdateHospitalDto {
                    hospital: create_dto("Stale Vet", ""),
                    version: 1,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::UpdateConflict(_)));

        let detail = service.get_detail(&id).await.unwrap();
        assert_eq!(detail.name, "Happy Vet");
        assert_eq!(detail.version, 2);
    }

    #[tokio::test]
    async fn test_update_replaces_whole_record() {
        let (_repo, service) = setup();
        let mut dto = create_dto("Happy Vet", "L-1");
        dto.latitude = Some(25.0);
        dto.longitude = Some(121.5);
        dto.veterinarian = "Dr. Lin".to_string();
        let created = service.create(&dto).await.unwrap();

        let updated = service
            .update(
                &created.id.to_string(),
                &UpdateHospitalDto {
                    hospital: create_dto("Renamed Vet", "L-1"),
                    version: created.version,
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "Renamed Vet");
        assert_eq!(updated.veterinarian, "");
        assert_eq!(updated.coordinates, None);
        assert_eq!(updated.version, 2);
    }

    #[tokio::test]
    async fn test_update_location() {
        let (_repo, service) = setup();
        let created = service.create(&create_dto("Happy Vet", "")).await.unwrap();
        let id = created.id.to_string();

        let err = service
            .update_location(
                &id,
                &UpdateLocationDto {
                    latitude: 200.0,
                    longitude: 121.0,
                    version: 1,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidCoordinates { .. }));

        let updated = service
            .update_location(
                &id,
                &UpdateLocationDto {
                    latitude: 25.04,
                    longitude: 121.57,
                    version: 1,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.coordinates, Some(Coordinates::new(25.04, 121.57)));
    }

    #[tokio::test]
    async fn test_delete_and_count_by_status() {
        let (_repo, service) = setup();
        let a = service.create(&create_dto("A Vet", "")).await.unwrap();
        service.create(&create_dto("B Vet", "")).await.unwrap();

        let counts = service.count_by_status().await.unwrap();
        assert_eq!(counts.counts.get("開業"), Some(&2));

        service.delete(&a.id.to_string()).await.unwrap();
        assert!(matches!(
            service.delete(&a.id.to_string()).await,
            Err(AppError::NotFound(_))
        ));

        let counts = service.count_by_status().await.unwrap();
        assert_eq!(counts.counts.get("開業"), Some(&1));
    }
}
