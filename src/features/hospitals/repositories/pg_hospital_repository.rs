use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::hospitals::models::{
    Coordinates, GeoRadius, Hospital, HospitalProfile, NewHospital, EARTH_RADIUS_KM,
};
use crate::features::hospitals::repositories::{
    require_lookup_value, HospitalFilter, HospitalRepository, HospitalSort, NearbyOptions,
    SearchFacets, SearchOptions, SearchResult,
};
use crate::shared::validation::{escape_like, like_pattern};

const HOSPITAL_COLUMNS: &str = "id, name, address, phone, county, veterinarian, license_type, \
     license_no, status, issued_date, latitude, longitude, version, created_at, updated_at";

/// Raw `hospitals` row
#[derive(Debug, FromRow)]
struct HospitalRow {
    id: Uuid,
    name: String,
    address: String,
    phone: String,
    county: String,
    veterinarian: String,
    license_type: String,
    license_no: String,
    status: String,
    issued_date: String,
    latitude: Option<f64>,
    longitude: Option<f64>,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<HospitalRow> for Hospital {
    type Error = AppError;

    fn try_from(row: HospitalRow) -> Result<Self> {
        let coordinates = match (row.latitude, row.longitude) {
            (Some(latitude), Some(longitude)) => Some(Coordinates::try_new(latitude, longitude)?),
            (None, None) => None,
            _ => {
                return Err(AppError::Internal(format!(
                    "Hospital {} has only one coordinate component",
                    row.id
                )))
            }
        };

        Hospital::from_parts(
            row.id,
            HospitalProfile {
                name: row.name,
                address: row.address,
                phone: row.phone,
                county: row.county,
                veterinarian: row.veterinarian,
                license_type: row.license_type,
                license_no: row.license_no,
                status: row.status,
                issued_date: row.issued_date,
            },
            coordinates,
            row.version,
            row.created_at,
            row.updated_at,
        )
    }
}

#[derive(Debug, FromRow)]
struct FacetRow {
    facet: String,
    value: String,
    count: i64,
}

#[derive(Debug, FromRow)]
struct StatusCountRow {
    status: String,
    count: i64,
}

/// Decodes rows one by one; a row that fails to decode is logged and skipped.
fn decode_hospitals(
    rows: impl IntoIterator<Item = std::result::Result<HospitalRow, sqlx::Error>>,
    operation: &str,
) -> Vec<Hospital> {
    rows.into_iter()
        .filter_map(|row| {
            let decoded = row.map_err(AppError::from).and_then(Hospital::try_from);
            match decoded {
                Ok(hospital) => Some(hospital),
                Err(e) => {
                    tracing::warn!("Skipping undecodable hospital row in {}: {}", operation, e);
                    None
                }
            }
        })
        .collect()
}

/// PostgreSQL implementation of [`HospitalRepository`]
pub struct PgHospitalRepository {
    pool: PgPool,
}

impl PgHospitalRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn decode_rows(rows: Vec<PgRow>, operation: &str) -> Vec<Hospital> {
        decode_hospitals(rows.iter().map(HospitalRow::from_row), operation)
    }

    async fn fetch_one_where(&self, column: &str, value: &str) -> Result<Option<Hospital>> {
        let mut qb = QueryBuilder::<Postgres>::new(format!(
            "SELECT {} FROM hospitals WHERE {} = ",
            HOSPITAL_COLUMNS, column
        ));
        qb.push_bind(value);
        qb.push(" ORDER BY id ASC LIMIT 1");

        let row = qb
            .build_query_as::<HospitalRow>()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to fetch hospital by {} '{}': {:?}", column, value, e);
                AppError::Database(e)
            })?;

        row.map(Hospital::try_from).transpose()
    }

    async fn exists(&self, id: Uuid) -> Result<bool> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM hospitals WHERE id = $1)")
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to check hospital {} existence: {:?}", id, e);
                AppError::Database(e)
            })
    }
}

/// Haversine distance in km from `center` to the row's point (NULL if unknown)
fn push_distance_km(qb: &mut QueryBuilder<'_, Postgres>, center: Coordinates) {
    qb.push("(")
        .push_bind(EARTH_RADIUS_KM)
        .push(" * 2 * ASIN(SQRT(LEAST(1.0, POWER(SIN(RADIANS(latitude - ")
        .push_bind(center.latitude)
        .push(") / 2), 2) + COS(RADIANS(")
        .push_bind(center.latitude)
        .push(")) * COS(RADIANS(latitude)) * POWER(SIN(RADIANS(longitude - ")
        .push_bind(center.longitude)
        .push(") / 2), 2)))))");
}

fn push_within(qb: &mut QueryBuilder<'_, Postgres>, area: GeoRadius) {
    let bbox = area.bounding_box();
    qb.push(" AND latitude BETWEEN ")
        .push_bind(bbox.min_latitude)
        .push(" AND ")
        .push_bind(bbox.max_latitude);
    if let Some((min_longitude, max_longitude)) = bbox.longitude_range {
        qb.push(" AND longitude BETWEEN ")
            .push_bind(min_longitude)
            .push(" AND ")
            .push_bind(max_longitude);
    }
    qb.push(" AND ");
    push_distance_km(qb, area.center());
    qb.push(" <= ").push_bind(area.radius_km());
}

fn push_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: &HospitalFilter) {
    qb.push(" WHERE TRUE");

    let terms = filter.keyword_terms();
    if !terms.is_empty() {
        qb.push(" AND (");
        for (i, term) in terms.iter().enumerate() {
            if i > 0 {
                qb.push(" OR ");
            }
            let pattern = like_pattern(term);
            qb.push("name ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR address ILIKE ")
                .push_bind(pattern.clone())
                .push(" OR veterinarian ILIKE ")
                .push_bind(pattern);
        }
        qb.push(")");
    }
    if let Some(county) = filter.county() {
        qb.push(" AND county = ").push_bind(county.to_string());
    }
    if let Some(status) = filter.status() {
        qb.push(" AND status = ").push_bind(status.to_string());
    }
    if let Some(license_type) = filter.license_type() {
        qb.push(" AND license_type = ")
            .push_bind(license_type.to_string());
    }
    if let Some(area) = filter.area() {
        push_within(qb, area);
    }
}

/// Same weights as [`Hospital::relevance`]; `terms` must not be empty
fn push_relevance(qb: &mut QueryBuilder<'_, Postgres>, terms: &[String]) {
    qb.push("(");
    for (i, term) in terms.iter().enumerate() {
        if i > 0 {
            qb.push(" + ");
        }
        let pattern = like_pattern(term);
        qb.push("(CASE WHEN name ILIKE ")
            .push_bind(pattern.clone())
            .push(" THEN 3 ELSE 0 END) + (CASE WHEN name ILIKE ")
            .push_bind(format!("{}%", escape_like(term)))
            .push(" THEN 1 ELSE 0 END) + (CASE WHEN veterinarian ILIKE ")
            .push_bind(pattern.clone())
            .push(" THEN 2 ELSE 0 END) + (CASE WHEN address ILIKE ")
            .push_bind(pattern)
            .push(" THEN 1 ELSE 0 END)");
    }
    qb.push(")");
}

fn push_order(qb: &mut QueryBuilder<'_, Postgres>, sort: HospitalSort, filter: &HospitalFilter) {
    qb.push(" ORDER BY ");
    match sort {
        HospitalSort::Default => {
            qb.push("id ASC");
        }
        HospitalSort::Name => {
            qb.push("name ASC, id ASC");
        }
        HospitalSort::Relevance => {
            // Without terms every score is 0, leaving name then id
            let terms = filter.keyword_terms();
            if !terms.is_empty() {
                push_relevance(qb, &terms);
                qb.push(" DESC, ");
            }
            qb.push("name ASC, id ASC");
        }
        HospitalSort::Distance(center) => {
            push_distance_km(qb, center);
            qb.push(" ASC NULLS LAST, id ASC");
        }
    }
}

fn map_write_error(operation: &str, e: sqlx::Error, license_no: &str) -> AppError {
    if let sqlx::Error::Database(ref db) = e {
        if db.is_unique_violation() {
            tracing::warn!("Duplicate license_no '{}' on {}", license_no, operation);
            return AppError::DuplicateEntry(format!(
                "Hospital with license_no '{}' already exists",
                license_no
            ));
        }
    }
    tracing::error!("Failed to {}: {:?}", operation, e);
    AppError::Database(e)
}

#[async_trait]
impl HospitalRepository for PgHospitalRepository {
    async fn create(&self, hospital: NewHospital) -> Result<Hospital> {
        let id = Uuid::now_v7();
        let coordinates = hospital.coordinates();
        let profile = &hospital.profile;

        let sql = format!(
            r#"
            INSERT INTO hospitals (
                id, name, address, phone, county, veterinarian, license_type,
                license_no, status, issued_date, latitude, longitude, version,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, 1, $13, $14)
            RETURNING {}
            "#,
            HOSPITAL_COLUMNS
        );

        let row = sqlx::query_as::<_, HospitalRow>(&sql)
            .bind(id)
            .bind(&profile.name)
            .bind(&profile.address)
            .bind(&profile.phone)
            .bind(&profile.county)
            .bind(&profile.veterinarian)
            .bind(&profile.license_type)
            .bind(&profile.license_no)
            .bind(&profile.status)
            .bind(&profile.issued_date)
            .bind(coordinates.map(|c| c.latitude))
            .bind(coordinates.map(|c| c.longitude))
            .bind(hospital.created_at)
            .bind(hospital.updated_at)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_write_error("create hospital", e, &profile.license_no))?;

        Hospital::try_from(row)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Hospital> {
        let sql = format!("SELECT {} FROM hospitals WHERE id = $1", HOSPITAL_COLUMNS);

        let row = sqlx::query_as::<_, HospitalRow>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to fetch hospital {}: {:?}", id, e);
                AppError::Database(e)
            })?
            .ok_or_else(|| AppError::NotFound(format!("Hospital with id {} not found", id)))?;

        Hospital::try_from(row)
    }

    async fn get_by_phone(&self, phone: &str) -> Result<Hospital> {
        let phone = require_lookup_value("phone", phone)?;
        self.fetch_one_where("phone", phone)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Hospital with phone {} not found", phone)))
    }

    async fn get_by_license_no(&self, license_no: &str) -> Result<Hospital> {
        let license_no = require_lookup_value("license_no", license_no)?;
        self.fetch_one_where("license_no", license_no)
            .await?
            .ok_or_else(|| {
                AppError::NotFound(format!("Hospital with license_no {} not found", license_no))
            })
    }

    async fn search(&self, options: &SearchOptions) -> Result<SearchResult> {
        let mut count_qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM hospitals");
        push_filter(&mut count_qb, &options.filter);

        let total = count_qb
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to count hospitals: {:?}", e);
                AppError::Database(e)
            })?;

        let mut qb =
            QueryBuilder::<Postgres>::new(format!("SELECT {} FROM hospitals", HOSPITAL_COLUMNS));
        push_filter(&mut qb, &options.filter);
        push_order(&mut qb, options.sort, &options.filter);
        qb.push(" LIMIT ")
            .push_bind(options.limit)
            .push(" OFFSET ")
            .push_bind(options.skip);

        let rows = qb.build().fetch_all(&self.pool).await.map_err(|e| {
            tracing::error!("Failed to search hospitals: {:?}", e);
            AppError::Database(e)
        })?;

        Ok(SearchResult {
            hospitals: Self::decode_rows(rows, "search"),
            total,
        })
    }

    async fn facets(&self, filter: &HospitalFilter) -> Result<SearchFacets> {
        let mut qb = QueryBuilder::<Postgres>::new(
            r#"
            SELECT
                CASE
                    WHEN GROUPING(status) = 0 THEN 'status'
                    WHEN GROUPING(license_type) = 0 THEN 'license_type'
                    ELSE 'county'
                END AS facet,
                COALESCE(status, license_type, county) AS value,
                COUNT(*) AS count
            FROM hospitals
            "#,
        );
        push_filter(&mut qb, filter);
        qb.push(" GROUP BY GROUPING SETS ((status), (license_type), (county))");

        let rows = qb
            .build_query_as::<FacetRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to aggregate hospital facets: {:?}", e);
                AppError::Database(e)
            })?;

        let mut facets = SearchFacets::default();
        for row in rows {
            let bucket = match row.facet.as_str() {
                "status" => &mut facets.by_status,
                "license_type" => &mut facets.by_license_type,
                _ => &mut facets.by_county,
            };
            *bucket.entry(row.value).or_insert(0) += row.count;
        }

        Ok(facets)
    }

    async fn get_nearby(&self, options: &NearbyOptions) -> Result<Vec<Hospital>> {
        let center = options.area.center();
        let filter = HospitalFilter::new().within(options.area);

        let mut qb =
            QueryBuilder::<Postgres>::new(format!("SELECT {} FROM hospitals", HOSPITAL_COLUMNS));
        push_filter(&mut qb, &filter);
        push_order(&mut qb, HospitalSort::Distance(center), &filter);
        qb.push(" LIMIT ").push_bind(options.limit);

        let rows = qb.build().fetch_all(&self.pool).await.map_err(|e| {
            tracing::error!(
                "Failed to list hospitals near ({}, {}): {:?}",
                center.latitude,
                center.longitude,
                e
            );
            AppError::Database(e)
        })?;

        Ok(Self::decode_rows(rows, "get_nearby"))
    }

    async fn update(&self, hospital: &Hospital) -> Result<Hospital> {
        let profile = hospital.profile();
        let coordinates = hospital.coordinates();

        let sql = format!(
            r#"
            UPDATE hospitals
            SET name = $1, address = $2, phone = $3, county = $4, veterinarian = $5,
                license_type = $6, license_no = $7, status = $8, issued_date = $9,
                latitude = $10, longitude = $11, updated_at = $12,
                version = version + 1
            WHERE id = $13 AND version = $14
            RETURNING {}
            "#,
            HOSPITAL_COLUMNS
        );

        let row = sqlx::query_as::<_, HospitalRow>(&sql)
            .bind(&profile.name)
            .bind(&profile.address)
            .bind(&profile.phone)
            .bind(&profile.county)
            .bind(&profile.veterinarian)
            .bind(&profile.license_type)
            .bind(&profile.license_no)
            .bind(&profile.status)
            .bind(&profile.issued_date)
            .bind(coordinates.map(|c| c.latitude))
            .bind(coordinates.map(|c| c.longitude))
            .bind(hospital.updated_at())
            .bind(hospital.id())
            .bind(hospital.version())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_write_error("update hospital", e, &profile.license_no))?;

        if let Some(row) = row {
            return Hospital::try_from(row);
        }

        if self.exists(hospital.id()).await? {
            tracing::warn!(
                "Version conflict updating hospital {} (expected version {})",
                hospital.id(),
                hospital.version()
            );
            Err(AppError::UpdateConflict(format!(
                "Hospital {} was modified concurrently (expected version {})",
                hospital.id(),
                hospital.version()
            )))
        } else {
            Err(AppError::NotFound(format!(
                "Hospital with id {} not found",
                hospital.id()
            )))
        }
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM hospitals WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                tracing::error!("Failed to delete hospital {}: {:?}", id, e);
                AppError::Database(e)
            })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "Hospital with id {} not found",
                id
            )));
        }

        Ok(())
    }

    async fn count_by_status(&self) -> Result<BTreeMap<String, i64>> {
        let rows = sqlx::query_as::<_, StatusCountRow>(
            "SELECT status, COUNT(*) AS count FROM hospitals GROUP BY status",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to count hospitals by status: {:?}", e);
            AppError::Database(e)
        })?;

        Ok(rows.into_iter().map(|r| (r.status, r.count)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(name: &str, latitude: Option<f64>, longitude: Option<f64>) -> HospitalRow {
        let now = Utc::now();
        HospitalRow {
            id: Uuid::now_v7(),
            name: name.to_string(),
            address: String::new(),
            phone: String::new(),
            county: String::new(),
            veterinarian: String::new(),
            license_type: String::new(),
            license_no: String::new(),
            status: String::new(),
            issued_date: String::new(),
            latitude,
            longitude,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_decode_hospitals_skips_bad_rows() {
        let rows = vec![
            Ok(row("located", Some(25.033), Some(121.5654))),
            Ok(row("half", Some(25.033), None)),
            Err(sqlx::Error::ColumnNotFound("latitude".to_string())),
            Ok(row("out of range", Some(95.0), Some(121.0))),
            Ok(row("unlocated", None, None)),
        ];

        let hospitals = decode_hospitals(rows, "search");

        let names: Vec<&str> = hospitals.iter().map(|h| h.profile().name.as_str()).collect();
        assert_eq!(names, vec!["located", "unlocated"]);
        assert_eq!(hospitals[1].coordinates(), None);
    }

    #[test]
    fn test_push_filter_builds_all_predicates() {
        let filter = HospitalFilter::new()
            .with_keyword("動物 醫院")
            .with_county("臺北市")
            .with_status("開業")
            .with_license_type("動物醫院")
            .within(GeoRadius::new(Coordinates::new(25.033, 121.5654), 5.0).unwrap());

        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM hospitals");
        push_filter(&mut qb, &filter);
        let sql = qb.sql();

        assert!(sql.contains("name ILIKE $1 OR address ILIKE $2 OR veterinarian ILIKE $3"));
        assert!(sql.contains(" OR name ILIKE $4"));
        assert!(sql.contains("county = $7"));
        assert!(sql.contains("status = $8"));
        assert!(sql.contains("license_type = $9"));
        assert!(sql.contains("latitude BETWEEN $10 AND $11"));
        assert!(sql.contains("longitude BETWEEN $12 AND $13"));
        assert!(sql.contains("ASIN(SQRT("));
    }

    #[test]
    fn test_push_filter_without_predicates() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM hospitals");
        push_filter(&mut qb, &HospitalFilter::new());
        assert_eq!(qb.sql(), "SELECT COUNT(*) FROM hospitals WHERE TRUE");
    }

    #[test]
    fn test_push_order_variants() {
        let filter = HospitalFilter::new().with_keyword("happy");

        let mut qb = QueryBuilder::<Postgres>::new("");
        push_order(&mut qb, HospitalSort::Relevance, &filter);
        assert!(qb.sql().contains("THEN 3 ELSE 0 END"));
        assert!(qb.sql().ends_with(" DESC, name ASC, id ASC"));

        let mut qb = QueryBuilder::<Postgres>::new("");
        push_order(&mut qb, HospitalSort::Relevance, &HospitalFilter::new());
        assert_eq!(qb.sql(), " ORDER BY name ASC, id ASC");

        let mut qb = QueryBuilder::<Postgres>::new("");
        push_order(&mut qb, HospitalSort::Default, &filter);
        assert_eq!(qb.sql(), " ORDER BY id ASC");

        let mut qb = QueryBuilder::<Postgres>::new("");
        push_order(
            &mut qb,
            HospitalSort::Distance(Coordinates::new(25.0, 121.0)),
            &filter,
        );
        assert!(qb.sql().ends_with(" ASC NULLS LAST, id ASC"));
    }

    #[test]
    fn test_row_with_half_coordinates_is_rejected() {
        let now = Utc::now();
        let row = HospitalRow {
            id: Uuid::now_v7(),
            name: "Happy Vet".to_string(),
            address: String::new(),
            phone: String::new(),
            county: String::new(),
            veterinarian: String::new(),
            license_type: String::new(),
            license_no: String::new(),
            status: String::new(),
            issued_date: String::new(),
            latitude: Some(25.0),
            longitude: None,
            version: 1,
            created_at: now,
            updated_at: now,
        };
        assert!(matches!(
            Hospital::try_from(row),
            Err(AppError::Internal(_))
        ));
    }
}
