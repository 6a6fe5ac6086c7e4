//! Veterinary hospital directory feature.
//!
//! Records come from the government veterinary hospital dataset, either through
//! the batch import or the admin write endpoints. Coordinates are optional: a
//! hospital without a location still shows up in keyword searches but never in
//! radius or nearby results.
//!
//! ## Endpoints
//!
//! | Method | Endpoint | Description |
//! |--------|----------|-------------|
//! | GET | `/api/hospitals` | Search with filters, pagination and stats |
//! | GET | `/api/hospitals/nearby` | Hospitals near a point, nearest first |
//! | GET | `/api/hospitals/status-counts` | Count per status |
//! | GET | `/api/hospitals/lookup` | Find by phone or licence number |
//! | GET | `/api/hospitals/{id}` | Get hospital by ID |
//! | POST | `/api/admin/hospitals` | Create a hospital |
//! | PUT | `/api/admin/hospitals/{id}` | Replace a hospital |
//! | DELETE | `/api/admin/hospitals/{id}` | Delete a hospital |
//! | PATCH | `/api/admin/hospitals/{id}/status` | Change status |
//! | PUT | `/api/admin/hospitals/{id}/location` | Set coordinates |
//! | POST | `/api/admin/hospitals/import` | Batch import with optional geocoding |
//!
//! Admin endpoints sit behind HTTP basic auth.

pub mod dtos;
pub mod handlers;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;

pub use repositories::{HospitalRepository, PgHospitalRepository};
pub use services::{
    Geocoder, HospitalImportService, HospitalService, ListNearbyHospitalsService,
    NominatimGeocoder, SearchHospitalsService,
};
