//! Search/filter construction for list endpoints.
//!
//! Query parameters are turned into a [`Predicate`] tree that every store
//! backend understands, plus a [`Sort`] and a [`PageRequest`]. The in-memory
//! evaluation in [`Predicate::matches`] is the reference semantics; the SQL
//! rendering in `wayfarer-store` must agree with it.

use std::cmp::Ordering;

use chrono::DateTime;
use serde::Serialize;
use serde_json::Value;

use crate::{CoreError, FieldError};

const EARTH_RADIUS_M: f64 = 6_371_000.0;
pub const DEFAULT_RADIUS_KM: f64 = 50.0;

// ============================================================================
// Predicate
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Matches every document.
    All,
    And(Vec<Predicate>),
    Or(Vec<Predicate>),
    /// Case-insensitive substring match. Array fields match on any element.
    Contains { field: String, term: String },
    /// Exact match. Array fields match when any element equals `value`.
    Eq { field: String, value: Value },
    /// Inclusive numeric bounds, each optional.
    Range {
        field: String,
        min: Option<f64>,
        max: Option<f64>,
    },
    /// GeoJSON point field within `max_distance_m` of the given centre.
    Near {
        field: String,
        lng: f64,
        lat: f64,
        max_distance_m: f64,
    },
}

impl Predicate {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Predicate::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn and(self, other: Predicate) -> Self {
        match (self, other) {
            (Predicate::All, p) | (p, Predicate::All) => p,
            (Predicate::And(mut left), Predicate::And(right)) => {
                left.extend(right);
                Predicate::And(left)
            }
            (Predicate::And(mut left), p) => {
                left.push(p);
                Predicate::And(left)
            }
            (p, other) => Predicate::And(vec![p, other]),
        }
    }

    pub fn matches(&self, doc: &Value) -> bool {
        match self {
            Predicate::All => true,
            Predicate::And(parts) => parts.iter().all(|p| p.matches(doc)),
            Predicate::Or(parts) => parts.iter().any(|p| p.matches(doc)),
            Predicate::Contains { field, term } => {
                let needle = term.to_lowercase();
                match lookup(doc, field) {
                    Some(Value::String(s)) => s.to_lowercase().contains(&needle),
                    Some(Value::Array(items)) => items.iter().any(|item| {
                        item.as_str()
                            .map(|s| s.to_lowercase().contains(&needle))
                            .unwrap_or(false)
                    }),
                    _ => false,
                }
            }
            Predicate::Eq { field, value } => match lookup(doc, field) {
                Some(Value::Array(items)) if !value.is_array() => items.contains(value),
                Some(found) => found == value,
                None => value.is_null(),
            },
            Predicate::Range { field, min, max } => {
                match lookup(doc, field).and_then(Value::as_f64) {
                    Some(x) => min.map_or(true, |m| x >= m) && max.map_or(true, |m| x <= m),
                    None => false,
                }
            }
            Predicate::Near {
                field,
                lng,
                lat,
                max_distance_m,
            } => {
                let coords = lookup(doc, field)
                    .and_then(|v| v.get("coordinates"))
                    .and_then(Value::as_array);
                match coords.map(|c| (c.first().and_then(Value::as_f64), c.get(1).and_then(Value::as_f64))) {
                    Some((Some(doc_lng), Some(doc_lat))) => {
                        haversine_m(*lat, *lng, doc_lat, doc_lng) <= *max_distance_m
                    }
                    _ => false,
                }
            }
        }
    }
}

/// Resolve a dotted path (`address.city`) inside a JSON document.
pub fn lookup<'a>(doc: &'a Value, field: &str) -> Option<&'a Value> {
    field.split('.').try_fold(doc, |current, key| current.get(key))
}

pub fn field_path(field: &str) -> Vec<String> {
    field.split('.').map(str::to_string).collect()
}

/// Great-circle distance in meters.
pub fn haversine_m(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().asin()
}

// ============================================================================
// Filter builder
// ============================================================================

/// Centre point and radius for proximity search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoRadius {
    pub lat: f64,
    pub lng: f64,
    pub radius_km: f64,
}

impl GeoRadius {
    /// All three absent means no geo filter. Supplying only one coordinate is an error.
    pub fn from_params(
        lat: Option<f64>,
        lng: Option<f64>,
        radius_km: Option<f64>,
    ) -> Result<Option<GeoRadius>, CoreError> {
        let (lat, lng) = match (lat, lng) {
            (None, None) if radius_km.is_none() => return Ok(None),
            (Some(lat), Some(lng)) => (lat, lng),
            _ => {
                return Err(CoreError::validation(
                    "lat",
                    "lat and lng must be supplied together",
                ))
            }
        };

        let mut errors = Vec::new();
        if !(-90.0..=90.0).contains(&lat) {
            errors.push(FieldError::field("lat", "latitude must be between -90 and 90"));
        }
        if !(-180.0..=180.0).contains(&lng) {
            errors.push(FieldError::field("lng", "longitude must be between -180 and 180"));
        }
        let radius_km = radius_km.unwrap_or(DEFAULT_RADIUS_KM);
        if radius_km <= 0.0 || !radius_km.is_finite() {
            errors.push(FieldError::field("radius", "radius must be a positive number of kilometers"));
        }
        if !errors.is_empty() {
            return Err(CoreError::Validation(errors));
        }

        Ok(Some(GeoRadius { lat, lng, radius_km }))
    }

    pub fn radius_m(&self) -> f64 {
        self.radius_km * 1000.0
    }
}

/// Collects optional filters into a single AND-combined [`Predicate`].
///
/// Absent parameters are skipped. Invalid ones are collected and reported
/// together from [`FilterBuilder::build`].
#[derive(Debug, Default)]
pub struct FilterBuilder {
    clauses: Vec<Predicate>,
    errors: Vec<FieldError>,
}

impl FilterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Free-text search over several fields, OR-combined.
    pub fn search(mut self, term: Option<&str>, fields: &[&str]) -> Self {
        if let Some(term) = term.map(str::trim).filter(|t| !t.is_empty()) {
            let any = fields
                .iter()
                .map(|f| Predicate::Contains {
                    field: (*f).to_string(),
                    term: term.to_string(),
                })
                .collect();
            self.clauses.push(Predicate::Or(any));
        }
        self
    }

    pub fn contains(mut self, field: &str, value: Option<&str>) -> Self {
        if let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) {
            self.clauses.push(Predicate::Contains {
                field: field.to_string(),
                term: value.to_string(),
            });
        }
        self
    }

    pub fn eq<V: Into<Value>>(mut self, field: &str, value: Option<V>) -> Self {
        if let Some(value) = value {
            self.clauses.push(Predicate::eq(field, value));
        }
        self
    }

    /// Always-on condition, e.g. ownership or publication state.
    pub fn require(mut self, predicate: Predicate) -> Self {
        self.clauses.push(predicate);
        self
    }

    /// Bounds are reported against `param` (e.g. `price` → `minPrice`/`maxPrice`).
    pub fn range(mut self, field: &str, param: &str, min: Option<f64>, max: Option<f64>) -> Self {
        for (bound, value) in [("min", min), ("max", max)] {
            if let Some(v) = value {
                if !v.is_finite() || v < 0.0 {
                    self.errors.push(FieldError::field(
                        format!("{}{}", bound, capitalize(param)),
                        "must be a non-negative number",
                    ));
                }
            }
        }
        if let (Some(lo), Some(hi)) = (min, max) {
            if lo > hi {
                self.errors.push(FieldError::field(
                    format!("min{}", capitalize(param)),
                    format!("min{0} must not exceed max{0}", capitalize(param)),
                ));
                return self;
            }
        }
        if min.is_some() || max.is_some() {
            self.clauses.push(Predicate::Range {
                field: field.to_string(),
                min,
                max,
            });
        }
        self
    }

    pub fn near(mut self, field: &str, geo: Option<GeoRadius>) -> Self {
        if let Some(geo) = geo {
            self.clauses.push(Predicate::Near {
                field: field.to_string(),
                lng: geo.lng,
                lat: geo.lat,
                max_distance_m: geo.radius_m(),
            });
        }
        self
    }

    pub fn build(self) -> Result<Predicate, CoreError> {
        if !self.errors.is_empty() {
            return Err(CoreError::Validation(self.errors));
        }
        Ok(match self.clauses.len() {
            0 => Predicate::All,
            1 => self.clauses.into_iter().next().unwrap_or(Predicate::All),
            _ => Predicate::And(self.clauses),
        })
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// ============================================================================
// Sorting
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sort {
    pub field: String,
    pub direction: SortDirection,
}

impl Sort {
    /// Default ordering: newest first.
    pub fn newest_first() -> Self {
        Sort {
            field: "createdAt".to_string(),
            direction: SortDirection::Desc,
        }
    }

    pub fn asc(field: &str) -> Self {
        Sort {
            field: field.to_string(),
            direction: SortDirection::Asc,
        }
    }

    /// `sort_by` must be one of `allowed` (or `createdAt`).
    pub fn parse(sort_by: Option<&str>, sort_order: Option<&str>, allowed: &[&str]) -> Result<Sort, CoreError> {
        let direction = match sort_order.map(|s| s.trim().to_ascii_lowercase()) {
            None => SortDirection::Desc,
            Some(ref s) if s == "asc" || s == "1" => SortDirection::Asc,
            Some(ref s) if s == "desc" || s == "-1" => SortDirection::Desc,
            Some(_) => return Err(CoreError::validation("sortOrder", "sortOrder must be 'asc' or 'desc'")),
        };

        let field = match sort_by.map(str::trim).filter(|s| !s.is_empty()) {
            None => "createdAt",
            Some(f) if f == "createdAt" || allowed.contains(&f) => f,
            Some(_) => {
                return Err(CoreError::validation(
                    "sortBy",
                    format!("sortBy must be one of: createdAt, {}", allowed.join(", ")),
                ))
            }
        };

        Ok(Sort {
            field: field.to_string(),
            direction,
        })
    }

    /// Compare two documents on the sort field.
    pub fn compare(&self, a: &Value, b: &Value) -> Ordering {
        let ord = compare_values(lookup(a, &self.field), lookup(b, &self.field));
        match self.direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    }
}

/// Missing sorts before present. Timestamp strings compare chronologically.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => {
            match (DateTime::parse_from_rfc3339(x), DateTime::parse_from_rfc3339(y)) {
                (Ok(dx), Ok(dy)) => dx.cmp(&dy),
                _ => x.to_lowercase().cmp(&y.to_lowercase()),
            }
        }
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

// ============================================================================
// Pagination
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    pub default_limit: u64,
    pub max_limit: u64,
}

impl Default for PageLimits {
    fn default() -> Self {
        Self {
            default_limit: 10,
            max_limit: 100,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u64,
    pub limit: u64,
}

impl PageRequest {
    pub fn resolve(page: Option<u64>, limit: Option<u64>, limits: &PageLimits) -> Result<Self, CoreError> {
        let page = page.unwrap_or(1);
        let limit = limit.unwrap_or(limits.default_limit);

        let mut errors = Vec::new();
        if page < 1 {
            errors.push(FieldError::field("page", "page must be at least 1"));
        }
        if limit < 1 || limit > limits.max_limit {
            errors.push(FieldError::field(
                "limit",
                format!("limit must be between 1 and {}", limits.max_limit),
            ));
        }
        if !errors.is_empty() {
            return Err(CoreError::Validation(errors));
        }

        Ok(Self { page, limit })
    }

    /// Saturates, so an absurd page number reads as past the end.
    pub fn skip(&self) -> u64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u64,
    pub total_pages: u64,
    pub total_items: u64,
    pub items_per_page: u64,
}

impl Pagination {
    pub fn new(page: PageRequest, total_items: u64) -> Self {
        Self {
            current_page: page.page,
            total_pages: total_items.div_ceil(page.limit),
            total_items,
            items_per_page: page.limit,
        }
    }
}

// ============================================================================
// Find query
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct FindQuery {
    pub filter: Predicate,
    pub sort: Sort,
    pub skip: u64,
    pub limit: Option<u64>,
}

impl FindQuery {
    pub fn new(filter: Predicate) -> Self {
        Self {
            filter,
            sort: Sort::newest_first(),
            skip: 0,
            limit: None,
        }
    }

    pub fn sorted(mut self, sort: Sort) -> Self {
        self.sort = sort;
        self
    }

    pub fn page(mut self, page: PageRequest) -> Self {
        self.skip = page.skip();
        self.limit = Some(page.limit);
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }
}
