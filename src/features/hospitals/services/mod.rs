pub mod geocoding_service;
pub mod hospital_service;
pub mod import_service;
pub mod nearby_service;
pub mod search_service;

pub use geocoding_service::{Geocoder, NominatimGeocoder};
pub use hospital_service::HospitalService;
pub use import_service::HospitalImportService;
pub use nearby_service::ListNearbyHospitalsService;
pub use search_service::SearchHospitalsService;
