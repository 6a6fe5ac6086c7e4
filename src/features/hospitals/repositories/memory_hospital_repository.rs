use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::hospitals::models::{Hospital, NewHospital};
use crate::features::hospitals::repositories::{
    require_lookup_value, HospitalFilter, HospitalRepository, HospitalSort, NearbyOptions,
    SearchFacets, SearchOptions, SearchResult,
};

/// In-process [`HospitalRepository`] with the same semantics as the
/// PostgreSQL one. Counts every call so tests can assert storage was not hit.
#[derive(Default)]
pub struct InMemoryHospitalRepository {
    hospitals: RwLock<Vec<Hospital>>,
    calls: AtomicUsize,
}

impl InMemoryHospitalRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(AtomicOrdering::SeqCst)
    }

    fn record_call(&self) {
        self.calls.fetch_add(1, AtomicOrdering::SeqCst);
    }

    fn license_taken(hospitals: &[Hospital], license_no: &str, except: Option<Uuid>) -> bool {
        !license_no.is_empty()
            && hospitals
                .iter()
                .any(|h| h.profile().license_no == license_no && Some(h.id()) != except)
    }

    fn duplicate(license_no: &str) -> AppError {
        AppError::DuplicateEntry(format!(
            "Hospital with license_no '{}' already exists",
            license_no
        ))
    }

    fn first_match(hospitals: &[Hospital], pred: impl Fn(&Hospital) -> bool) -> Option<Hospital> {
        hospitals
            .iter()
            .filter(|h| pred(h))
            .min_by_key(|h| h.id())
            .cloned()
    }
}

fn matches_filter(hospital: &Hospital, filter: &HospitalFilter) -> bool {
    let profile = hospital.profile();
    let terms = filter.keyword_terms();

    (terms.is_empty() || hospital.matches_keyword(&terms))
        && filter.county().map_or(true, |c| profile.county == c)
        && filter.status().map_or(true, |s| profile.status == s)
        && filter
            .license_type()
            .map_or(true, |t| profile.license_type == t)
        && filter.area().map_or(true, |area| {
            hospital
                .coordinates()
                .is_some_and(|c| area.contains(&c))
        })
}

fn compare(a: &Hospital, b: &Hospital, sort: HospitalSort, terms: &[String]) -> Ordering {
    match sort {
        HospitalSort::Default => a.id().cmp(&b.id()),
        HospitalSort::Name => a
            .profile()
            .name
            .cmp(&b.profile().name)
            .then_with(|| a.id().cmp(&b.id())),
        HospitalSort::Relevance => b
            .relevance(terms)
            .cmp(&a.relevance(terms))
            .then_with(|| a.profile().name.cmp(&b.profile().name))
            .then_with(|| a.id().cmp(&b.id())),
        HospitalSort::Distance(center) => {
            let by_distance = match (a.distance_km(&center), b.distance_km(&center)) {
                (Some(da), Some(db)) => da.total_cmp(&db),
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
            by_distance.then_with(|| a.id().cmp(&b.id()))
        }
    }
}

fn paginate(hospitals: Vec<Hospital>, skip: i64, limit: i64) -> Vec<Hospital> {
    let skip = usize::try_from(skip).unwrap_or(usize::MAX);
    let limit = usize::try_from(limit).unwrap_or(0);
    hospitals.into_iter().skip(skip).take(limit).collect()
}

#[async_trait]
impl HospitalRepository for InMemoryHospitalRepository {
    async fn create(&self, hospital: NewHospital) -> Result<Hospital> {
        self.record_call();
        let mut hospitals = self.hospitals.write().await;

        if Self::license_taken(&hospitals, &hospital.profile.license_no, None) {
            return Err(Self::duplicate(&hospital.profile.license_no));
        }

        let coordinates = hospital.coordinates();
        let created = Hospital::from_parts(
            Uuid::now_v7(),
            hospital.profile,
            coordinates,
            1,
            hospital.created_at,
            hospital.updated_at,
        )?;
        hospitals.push(created.clone());
        Ok(created)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Hospital> {
        self.record_call();
        let hospitals = self.hospitals.read().await;
        hospitals
            .iter()
            .find(|h| h.id() == id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("Hospital with id {} not found", id)))
    }

    async fn get_by_phone(&self, phone: &str) -> Result<Hospital> {
        self.record_call();
        let phone = require_lookup_value("phone", phone)?;
        let hospitals = self.hospitals.read().await;
        Self::first_match(&hospitals, |h| h.profile().phone == phone)
            .ok_or_else(|| AppError::NotFound(format!("Hospital with phone {} not found", phone)))
    }

    async fn get_by_license_no(&self, license_no: &str) -> Result<Hospital> {
        self.record_call();
        let license_no = require_lookup_value("license_no", license_no)?;
        let hospitals = self.hospitals.read().await;
        Self::first_match(&hospitals, |h| h.profile().license_no == license_no)
            .ok_or_else(|| {
                AppError::NotFound(format!("Hospital with license_no {} not found", license_no))
            })
    }

    async fn search(&self, options: &SearchOptions) -> Result<SearchResult> {
        self.record_call();
        let hospitals = self.hospitals.read().await;
        let terms = options.filter.keyword_terms();

        let mut matched: Vec<Hospital> = hospitals
            .iter()
            .filter(|h| matches_filter(h, &options.filter))
            .cloned()
            .collect();
        matched.sort_by(|a, b| compare(a, b, options.sort, &terms));

        let total = matched.len() as i64;
        Ok(SearchResult {
            hospitals: paginate(matched, options.skip, options.limit),
            total,
        })
    }

    async fn facets(&self, filter: &HospitalFilter) -> Result<SearchFacets> {
        self.record_call();
        let hospitals = self.hospitals.read().await;

        let mut facets = SearchFacets::default();
        for h in hospitals.iter().filter(|h| matches_filter(h, filter)) {
            let profile = h.profile();
            *facets.by_status.entry(profile.status.clone()).or_insert(0) += 1;
            *facets
                .by_license_type
                .entry(profile.license_type.clone())
                .or_insert(0) += 1;
            *facets.by_county.entry(profile.county.clone()).or_insert(0) += 1;
        }
        Ok(facets)
    }

    async fn get_nearby(&self, options: &NearbyOptions) -> Result<Vec<Hospital>> {
        self.record_call();
        let hospitals = self.hospitals.read().await;
        let center = options.area.center();

        let mut nearby: Vec<Hospital> = hospitals
            .iter()
            .filter(|h| h.coordinates().is_some_and(|c| options.area.contains(&c)))
            .cloned()
            .collect();
        nearby.sort_by(|a, b| compare(a, b, HospitalSort::Distance(center), &[]));

        Ok(paginate(nearby, 0, options.limit))
    }

    async fn update(&self, hospital: &Hospital) -> Result<Hospital> {
        self.record_call();
        let mut hospitals = self.hospitals.write().await;

        let index = hospitals
            .iter()
            .position(|h| h.id() == hospital.id())
            .ok_or_else(|| {
                AppError::NotFound(format!("Hospital with id {} not found", hospital.id()))
            })?;

        let stored_version = hospitals[index].version();
        if stored_version != hospital.version() {
            return Err(AppError::UpdateConflict(format!(
                "Hospital {} was modified concurrently (expected version {})",
                hospital.id(),
                hospital.version()
            )));
        }

        if Self::license_taken(&hospitals, &hospital.profile().license_no, Some(hospital.id())) {
            return Err(Self::duplicate(&hospital.profile().license_no));
        }

        let mut updated = hospital.clone();
        updated.set_version(stored_version + 1);
        hospitals[index] = updated.clone();
        Ok(updated)
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.record_call();
        let mut hospitals = self.hospitals.write().await;
        let before = hospitals.len();
        hospitals.retain(|h| h.id() != id);
        if hospitals.len() == before {
            return Err(AppError::NotFound(format!(
                "Hospital with id {} not found",
                id
            )));
        }
        Ok(())
    }

    async fn count_by_status(&self) -> Result<BTreeMap<String, i64>> {
        self.record_call();
        let hospitals = self.hospitals.read().await;
        let mut counts = BTreeMap::new();
        for h in hospitals.iter() {
            *counts.entry(h.profile().status.clone()).or_insert(0) += 1;
        }
        Ok(counts)
    }
}
