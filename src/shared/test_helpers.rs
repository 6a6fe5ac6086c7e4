use fake::faker::address::en::StreetName;
use fake::faker::name::en::Name;
use fake::Fake;

use crate::features::hospitals::models::{Coordinates, Hospital, HospitalProfile, NewHospital};
use crate::features::hospitals::repositories::{HospitalRepository, InMemoryHospitalRepository};

/// Profile with the given name and empty optional fields
pub struct HospitalProfileBuilder {
    profile: HospitalProfile,
}

impl HospitalProfileBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            profile: HospitalProfile {
                name: name.to_string(),
                ..Default::default()
            },
        }
    }

    pub fn address(mut self, address: &str) -> Self {
        self.profile.address = address.to_string();
        self
    }

    pub fn veterinarian(mut self, veterinarian: &str) -> Self {
        self.profile.veterinarian = veterinarian.to_string();
        self
    }

    pub fn county(mut self, county: &str) -> Self {
        self.profile.county = county.to_string();
        self
    }

    pub fn status(mut self, status: &str) -> Self {
        self.profile.status = status.to_string();
        self
    }

    pub fn license_no(mut self, license_no: &str) -> Self {
        self.profile.license_no = license_no.to_string();
        self
    }

    pub fn license_type(mut self, license_type: &str) -> Self {
        self.profile.license_type = license_type.to_string();
        self
    }

    pub fn phone(mut self, phone: &str) -> Self {
        self.profile.phone = phone.to_string();
        self
    }

    pub fn build(self) -> HospitalProfile {
        self.profile
    }
}

/// Profile with a fake veterinarian and street address
pub fn hospital_profile(name: &str, county: &str, status: &str) -> HospitalProfile {
    let veterinarian: String = Name().fake();
    let street: String = StreetName().fake();
    HospitalProfileBuilder::new(name)
        .county(county)
        .status(status)
        .veterinarian(&veterinarian)
        .address(&format!("{} {}", county, street))
        .license_type("動物醫院")
        .build()
}

pub async fn seed_hospital(
    repo: &InMemoryHospitalRepository,
    profile: HospitalProfile,
    coordinates: Option<Coordinates>,
) -> Hospital {
    let mut new = NewHospital::new(profile);
    if let Some(c) = coordinates {
        new = new.with_coordinates(c).unwrap();
    }
    repo.create(new).await.unwrap()
}
