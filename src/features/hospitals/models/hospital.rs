use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::hospitals::models::Coordinates;
use crate::shared::constants::{MAX_KEYWORD_TERMS, STATUS_OPERATING};

/// Descriptive fields of a hospital. An empty string means "not provided".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HospitalProfile {
    pub name: String,
    pub address: String,
    pub phone: String,
    pub county: String,
    pub veterinarian: String,
    pub license_type: String,
    pub license_no: String,
    pub status: String,
    /// `YYYY-MM-DD` once cleaned by the import
    pub issued_date: String,
}

/// A persisted hospital record.
///
/// Coordinates, when present, are always valid: every constructor and setter
/// goes through [`Coordinates::is_valid`].
#[derive(Debug, Clone, PartialEq)]
pub struct Hospital {
    id: Uuid,
    profile: HospitalProfile,
    coordinates: Option<Coordinates>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Hospital {
    /// Rebuilds a record read back from storage
    pub fn from_parts(
        id: Uuid,
        profile: HospitalProfile,
        coordinates: Option<Coordinates>,
        version: i64,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self> {
        if let Some(c) = coordinates {
            if !c.is_valid() {
                return Err(AppError::invalid_coordinates(c.latitude, c.longitude));
            }
        }

        Ok(Self {
            id,
            profile,
            coordinates,
            version,
            created_at,
            updated_at,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn profile(&self) -> &HospitalProfile {
        &self.profile
    }

    pub fn coordinates(&self) -> Option<Coordinates> {
        self.coordinates
    }

    pub fn version(&self) -> i64 {
        self.version
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Used by a write to assert which stored version it was based on
    pub fn set_version(&mut self, version: i64) {
        self.version = version;
    }

    /// Status is free text; no validation
    pub fn change_status(&mut self, status: impl Into<String>) {
        self.profile.status = status.into();
        self.touch();
    }

    pub fn update_location(&mut self, coordinates: Coordinates) -> Result<()> {
        if !coordinates.is_valid() {
            return Err(AppError::invalid_coordinates(
                coordinates.latitude,
                coordinates.longitude,
            ));
        }
        self.coordinates = Some(coordinates);
        self.touch();
        Ok(())
    }

    /// Whole-record replace of the descriptive fields and the location
    pub fn replace_profile(
        &mut self,
        profile: HospitalProfile,
        coordinates: Option<Coordinates>,
    ) -> Result<()> {
        if let Some(c) = coordinates {
            if !c.is_valid() {
                return Err(AppError::invalid_coordinates(c.latitude, c.longitude));
            }
        }
        self.profile = profile;
        self.coordinates = coordinates;
        self.touch();
        Ok(())
    }

    #[allow(dead_code)]
    pub fn is_nearby(&self, center: &Coordinates, radius_km: f64) -> bool {
        self.coordinates
            .is_some_and(|c| c.is_nearby(center, radius_km))
    }

    #[allow(dead_code)]
    pub fn distance_km(&self, center: &Coordinates) -> Option<f64> {
        self.coordinates.map(|c| c.distance_km(center))
    }

    pub fn is_operating(&self) -> bool {
        self.profile.status == STATUS_OPERATING
    }

    /// Whether any term is a case-insensitive substring of name, address or veterinarian
    #[allow(dead_code)]
    pub fn matches_keyword(&self, terms: &[String]) -> bool {
        let fields = self.searchable_fields();
        terms.iter().any(|term| {
            let term = term.to_lowercase();
            fields.iter().any(|field| field.contains(&term))
        })
    }

    /// Keyword score, summed over terms:
    /// name 3 (+1 if the name starts with the term), veterinarian 2, address 1.
    #[allow(dead_code)]
    pub fn relevance(&self, terms: &[String]) -> i64 {
        let [name, address, veterinarian] = self.searchable_fields();
        terms
            .iter()
            .map(|term| {
                let term = term.to_lowercase();
                let mut score = 0;
                if name.contains(&term) {
                    score += 3;
                }
                if name.starts_with(&term) {
                    score += 1;
                }
                if veterinarian.contains(&term) {
                    score += 2;
                }
                if address.contains(&term) {
                    score += 1;
                }
                score
            })
            .sum()
    }

    #[allow(dead_code)]
    fn searchable_fields(&self) -> [String; 3] {
        [
            self.profile.name.to_lowercase(),
            self.profile.address.to_lowercase(),
            self.profile.veterinarian.to_lowercase(),
        ]
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// An unsaved hospital; the repository assigns id and version on create.
#[derive(Debug, Clone, PartialEq)]
pub struct NewHospital {
    pub profile: HospitalProfile,
    coordinates: Option<Coordinates>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl NewHospital {
    pub fn new(profile: HospitalProfile) -> Self {
        let now = Utc::now();
        Self {
            profile,
            coordinates: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_coordinates(mut self, coordinates: Coordinates) -> Result<Self> {
        if !coordinates.is_valid() {
            return Err(AppError::invalid_coordinates(
                coordinates.latitude,
                coordinates.longitude,
            ));
        }
        self.coordinates = Some(coordinates);
        Ok(self)
    }

    pub fn with_issued_date(mut self, issued_date: impl Into<String>) -> Self {
        self.profile.issued_date = issued_date.into();
        self
    }

    pub fn coordinates(&self) -> Option<Coordinates> {
        self.coordinates
    }
}

/// Splits a keyword on whitespace into at most [`MAX_KEYWORD_TERMS`] terms
pub fn keyword_terms(keyword: &str) -> Vec<String> {
    keyword
        .split_whitespace()
        .take(MAX_KEYWORD_TERMS)
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(name: &str, address: &str, veterinarian: &str) -> HospitalProfile {
        HospitalProfile {
            name: name.to_string(),
            address: address.to_string(),
            veterinarian: veterinarian.to_string(),
            status: STATUS_OPERATING.to_string(),
            ..Default::default()
        }
    }

    fn hospital(profile: HospitalProfile, coordinates: Option<Coordinates>) -> Hospital {
        let now = Utc::now();
        Hospital::from_parts(Uuid::now_v7(), profile, coordinates, 1, now, now).unwrap()
    }

    #[test]
    fn test_from_parts_rejects_invalid_coordinates() {
        let now = Utc::now();
        let result = Hospital::from_parts(
            Uuid::now_v7(),
            HospitalProfile::default(),
            Some(Coordinates::new(91.0, 0.0)),
            1,
            now,
            now,
        );
        assert!(matches!(result, Err(AppError::InvalidCoordinates { .. })));
    }

    #[test]
    fn test_change_status_refreshes_updated_at() {
        let mut h = hospital(profile("Happy Vet", "", ""), None);
        let before = h.updated_at();
        h.change_status("歇業");
        assert_eq!(h.profile().status, "歇業");
        assert!(h.updated_at() >= before);
        assert!(!h.is_operating());
    }

    #[test]
    fn test_update_location() {
        let mut h = hospital(profile("Happy Vet", "", ""), None);
        assert!(matches!(
            h.update_location(Coordinates::new(200.0, 0.0)),
            Err(AppError::InvalidCoordinates { .. })
        ));
        assert_eq!(h.coordinates(), None);

        h.update_location(Coordinates::new(25.04, 121.57)).unwrap();
        assert_eq!(h.coordinates(), Some(Coordinates::new(25.04, 121.57)));
    }

    #[test]
    fn test_is_nearby_without_coordinates() {
        let h = hospital(profile("Happy Vet", "", ""), None);
        assert!(!h.is_nearby(&Coordinates::new(25.0, 121.0), 20_000.0));
    }

    #[test]
    fn test_relevance_weights() {
        let h = hospital(
            profile("Happy Paws Clinic", "1 Happy Road", "Dr. Paws"),
            None,
        );
        // name contains + name prefix + address
        assert_eq!(h.relevance(&["happy".to_string()]), 3 + 1 + 1);
        // name contains + veterinarian
        assert_eq!(h.relevance(&["PAWS".to_string()]), 3 + 2);
        assert_eq!(h.relevance(&["zzz".to_string()]), 0);
        assert_eq!(
            h.relevance(&["happy".to_string(), "paws".to_string()]),
            5 + 5
        );
    }

    #[test]
    fn test_matches_keyword_any_term() {
        let h = hospital(profile("大安動物醫院", "臺北市大安區", "王小明"), None);
        assert!(h.matches_keyword(&["動物".to_string()]));
        assert!(h.matches_keyword(&["nothing".to_string(), "小明".to_string()]));
        assert!(!h.matches_keyword(&["台中".to_string()]));
    }

    #[test]
    fn test_keyword_terms_caps_count() {
        assert_eq!(keyword_terms("  a  b\tc "), vec!["a", "b", "c"]);
        assert_eq!(keyword_terms("1 2 3 4 5 6 7 8 9 10").len(), MAX_KEYWORD_TERMS);
        assert!(keyword_terms("   ").is_empty());
    }

    #[test]
    fn test_new_hospital_builders() {
        let new = NewHospital::new(profile("Happy Vet", "", ""))
            .with_issued_date("2019-03-15")
            .with_coordinates(Coordinates::new(25.0, 121.0))
            .unwrap();
        assert_eq!(new.profile.issued_date, "2019-03-15");
        assert_eq!(new.coordinates(), Some(Coordinates::new(25.0, 121.0)));
        assert_eq!(new.created_at, new.updated_at);

        assert!(NewHospital::new(HospitalProfile::default())
            .with_coordinates(Coordinates::new(0.0, 181.0))
            .is_err());
    }
}
