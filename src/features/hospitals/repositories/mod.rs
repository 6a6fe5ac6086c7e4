mod hospital_repository;
#[cfg(test)]
mod memory_hospital_repository;
mod pg_hospital_repository;

pub use hospital_repository::{
    require_lookup_value, HospitalFilter, HospitalRepository, HospitalSort, NearbyOptions,
    SearchFacets, SearchOptions, SearchResult,
};
#[cfg(test)]
pub use memory_hospital_repository::InMemoryHospitalRepository;
pub use pg_hospital_repository::PgHospitalRepository;
