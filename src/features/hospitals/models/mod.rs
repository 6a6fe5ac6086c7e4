mod coordinates;
mod hospital;

pub use coordinates::{Coordinates, GeoRadius, EARTH_RADIUS_KM};
pub use hospital::{keyword_terms, Hospital, HospitalProfile, NewHospital};
