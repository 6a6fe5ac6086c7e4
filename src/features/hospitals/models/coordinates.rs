use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::core::error::{AppError, Result};

/// Mean earth radius used for all great-circle distances
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Length of one degree of latitude on the sphere above
const KM_PER_DEGREE: f64 = EARTH_RADIUS_KM * std::f64::consts::PI / 180.0;

/// Above this latitude the longitude bound of a [`BoundingBox`] is dropped
const POLAR_LATITUDE_LIMIT: f64 = 89.0;

/// WGS84 latitude/longitude pair in degrees
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Coordinates {
    #[schema(example = 25.033)]
    pub latitude: f64,
    #[schema(example = 121.5654)]
    pub longitude: f64,
}

impl Coordinates {
    /// Unchecked constructor; use [`Coordinates::try_new`] for untrusted input.
    pub const fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    pub fn try_new(latitude: f64, longitude: f64) -> Result<Self> {
        let coordinates = Self::new(latitude, longitude);
        if coordinates.is_valid() {
            Ok(coordinates)
        } else {
            Err(AppError::invalid_coordinates(latitude, longitude))
        }
    }

    /// Both components in range. NaN fails both range checks.
    pub fn is_valid(&self) -> bool {
        (-90.0..=90.0).contains(&self.latitude) && (-180.0..=180.0).contains(&self.longitude)
    }

    /// (0, 0) is what a failed geocoder lookup usually looks like
    pub fn is_null_island(&self) -> bool {
        self.latitude == 0.0 && self.longitude == 0.0
    }

    /// Haversine great-circle distance in kilometres
    #[allow(dead_code)]
    pub fn distance_km(&self, other: &Coordinates) -> f64 {
        let lat1_rad = self.latitude.to_radians();
        let lat2_rad = other.latitude.to_radians();
        let delta_lat = (other.latitude - self.latitude).to_radians();
        let delta_lon = (other.longitude - self.longitude).to_radians();

        let a = (delta_lat / 2.0).sin().powi(2)
            + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);
        let c = 2.0 * a.min(1.0).sqrt().asin();

        EARTH_RADIUS_KM * c
    }

    #[allow(dead_code)]
    pub fn is_nearby(&self, other: &Coordinates, radius_km: f64) -> bool {
        if !self.is_valid() || !other.is_valid() {
            return false;
        }
        self.distance_km(other) <= radius_km
    }
}

/// Degree box enclosing a circle, used as an index-friendly pre-filter
/// before the exact haversine check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_latitude: f64,
    pub max_latitude: f64,
    /// `None` when the box touches a pole or wraps the antimeridian
    pub longitude_range: Option<(f64, f64)>,
}

impl BoundingBox {
    pub fn around(center: &Coordinates, radius_km: f64) -> Self {
        let lat_delta = radius_km / KM_PER_DEGREE;
        let min_latitude = (center.latitude - lat_delta).max(-90.0);
        let max_latitude = (center.latitude + lat_delta).min(90.0);

        // The widest longitude span is at the box edge nearest the pole
        let widest = min_latitude.abs().max(max_latitude.abs());
        let longitude_range = if widest >= POLAR_LATITUDE_LIMIT {
            None
        } else {
            let lon_delta = lat_delta / widest.to_radians().cos().abs().max(0.01);
            let min_longitude = center.longitude - lon_delta;
            let max_longitude = center.longitude + lon_delta;
            if min_longitude < -180.0 || max_longitude > 180.0 {
                None
            } else {
                Some((min_longitude, max_longitude))
            }
        };

        Self {
            min_latitude,
            max_latitude,
            longitude_range,
        }
    }

    #[allow(dead_code)]
    pub fn contains(&self, point: &Coordinates) -> bool {
        if point.latitude < self.min_latitude || point.latitude > self.max_latitude {
            return false;
        }
        match self.longitude_range {
            Some((min, max)) => point.longitude >= min && point.longitude <= max,
            None => true,
        }
    }
}

/// A valid centre plus a finite positive radius
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoRadius {
    center: Coordinates,
    radius_km: f64,
}

impl GeoRadius {
    pub fn new(center: Coordinates, radius_km: f64) -> Option<Self> {
        if center.is_valid() && radius_km.is_finite() && radius_km > 0.0 {
            Some(Self { center, radius_km })
        } else {
            None
        }
    }

    pub fn center(&self) -> Coordinates {
        self.center
    }

    pub fn radius_km(&self) -> f64 {
        self.radius_km
    }

    pub fn bounding_box(&self) -> BoundingBox {
        BoundingBox::around(&self.center, self.radius_km)
    }

    #[allow(dead_code)]
    pub fn contains(&self, point: &Coordinates) -> bool {
        self.center.is_nearby(point, self.radius_km)
    }
}
