//! Rendering of [`Predicate`] and [`Sort`] into SQL over the `documents` table.
//!
//! Every user-supplied value, JSON paths included, is a bound parameter.
//! Paths bind as `text[]` and are read with `body #> $n`.

use sqlx::types::Json;
use sqlx::{Postgres, QueryBuilder};
use wayfarer_core::search::field_path;
use wayfarer_core::{Predicate, Sort, SortDirection};

const EARTH_RADIUS_M: f64 = 6_371_000.0;

pub fn push_predicate(qb: &mut QueryBuilder<'_, Postgres>, predicate: &Predicate) {
    match predicate {
        Predicate::All => {
            qb.push("TRUE");
        }
        Predicate::And(parts) => push_joined(qb, parts, " AND ", "TRUE"),
        Predicate::Or(parts) => push_joined(qb, parts, " OR ", "FALSE"),
        Predicate::Contains { field, term } => {
            let pattern = format!("%{}%", escape_like(term));
            let path = field_path(field);

            qb.push("((jsonb_typeof(body #> ");
            qb.push_bind(path.clone());
            qb.push(") = 'string' AND body #>> ");
            qb.push_bind(path.clone());
            qb.push(" ILIKE ");
            qb.push_bind(pattern.clone());
            qb.push(") OR (jsonb_typeof(body #> ");
            qb.push_bind(path.clone());
            qb.push(") = 'array' AND EXISTS (SELECT 1 FROM jsonb_array_elements(body #> ");
            qb.push_bind(path);
            qb.push(") AS e(value) WHERE jsonb_typeof(e.value) = 'string' AND e.value #>> '{}' ILIKE ");
            qb.push_bind(pattern);
            qb.push(")))");
        }
        Predicate::Eq { field, value } => {
            let path = field_path(field);
            if value.is_null() {
                qb.push("(body #> ");
                qb.push_bind(path.clone());
                qb.push(" IS NULL OR body #> ");
                qb.push_bind(path);
                qb.push(" = 'null'::jsonb)");
            } else if value.is_array() {
                qb.push("(body #> ");
                qb.push_bind(path);
                qb.push(" = ");
                qb.push_bind(Json(value.clone()));
                qb.push(")");
            } else {
                // Scalars also match arrays that contain them
                qb.push("(body #> ");
                qb.push_bind(path.clone());
                qb.push(" = ");
                qb.push_bind(Json(value.clone()));
                qb.push(" OR (jsonb_typeof(body #> ");
                qb.push_bind(path.clone());
                qb.push(") = 'array' AND body #> ");
                qb.push_bind(path);
                qb.push(" @> jsonb_build_array(");
                qb.push_bind(Json(value.clone()));
                qb.push(")))");
            }
        }
        Predicate::Range { field, min, max } => {
            let path = field_path(field);
            qb.push("(jsonb_typeof(body #> ");
            qb.push_bind(path.clone());
            qb.push(") = 'number'");
            if let Some(min) = min {
                qb.push(" AND (body #>> ");
                qb.push_bind(path.clone());
                qb.push(")::float8 >= ");
                qb.push_bind(*min);
            }
            if let Some(max) = max {
                qb.push(" AND (body #>> ");
                qb.push_bind(path.clone());
                qb.push(")::float8 <= ");
                qb.push_bind(*max);
            }
            qb.push(")");
        }
        Predicate::Near {
            field,
            lng,
            lat,
            max_distance_m,
        } => {
            let path = field_path(field);
            qb.push("(jsonb_typeof((body #> ");
            qb.push_bind(path.clone());
            qb.push(") -> 'coordinates') = 'array' AND ");
            qb.push(EARTH_RADIUS_M * 2.0);
            qb.push(" * asin(sqrt(power(sin(radians((");
            push_coordinate(qb, &path, 1);
            qb.push(" - ");
            qb.push_bind(*lat);
            qb.push(") / 2)), 2) + cos(radians(");
            qb.push_bind(*lat);
            qb.push(")) * cos(radians(");
            push_coordinate(qb, &path, 1);
            qb.push(")) * power(sin(radians((");
            push_coordinate(qb, &path, 0);
            qb.push(" - ");
            qb.push_bind(*lng);
            qb.push(") / 2)), 2))) <= ");
            qb.push_bind(*max_distance_m);
            qb.push(")");
        }
    }
}

fn push_joined(qb: &mut QueryBuilder<'_, Postgres>, parts: &[Predicate], separator: &str, empty: &str) {
    if parts.is_empty() {
        qb.push(empty);
        return;
    }
    qb.push("(");
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            qb.push(separator);
        }
        push_predicate(qb, part);
    }
    qb.push(")");
}

/// `coordinates[index]` of a GeoJSON point as float8. Index 0 is longitude.
fn push_coordinate(qb: &mut QueryBuilder<'_, Postgres>, path: &[String], index: u8) {
    qb.push("((body #> ");
    qb.push_bind(path.to_vec());
    qb.push(format!(") -> 'coordinates' ->> {})::float8", index));
}

/// Timestamps sort on their columns; everything else on the document value.
pub fn push_order_by(qb: &mut QueryBuilder<'_, Postgres>, sort: &Sort) {
    let (direction, nulls) = match sort.direction {
        SortDirection::Asc => ("ASC", "NULLS FIRST"),
        SortDirection::Desc => ("DESC", "NULLS LAST"),
    };

    qb.push(" ORDER BY ");
    match sort.field.as_str() {
        "createdAt" => {
            qb.push(format!("created_at {}", direction));
        }
        "updatedAt" => {
            qb.push(format!("updated_at {}", direction));
        }
        field => {
            let path = field_path(field);
            qb.push("CASE WHEN jsonb_typeof(body #> ");
            qb.push_bind(path.clone());
            qb.push(") = 'string' THEN lower(body #>> ");
            qb.push_bind(path.clone());
            qb.push(format!(") END {} {}, body #> ", direction, nulls));
            qb.push_bind(path);
            qb.push(format!(" {} {}", direction, nulls));
        }
    }
    qb.push(", id ASC");
}

/// Escape `%`, `_` and `\` so a search term matches literally under ILIKE.
pub fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wayfarer_core::FilterBuilder;

    fn render(predicate: &Predicate) -> String {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT body FROM documents WHERE collection = ");
        qb.push_bind("hotels");
        qb.push(" AND ");
        push_predicate(&mut qb, predicate);
        qb.sql().to_string()
    }

    #[test]
    fn test_all_renders_true() {
        assert!(render(&Predicate::All).ends_with("AND TRUE"));
        assert!(render(&Predicate::Or(vec![])).ends_with("AND FALSE"));
    }

    #[test]
    fn test_values_are_bound_not_inlined() {
        let filter = FilterBuilder::new()
            .search(Some("x'; DROP TABLE documents; --"), &["name", "description"])
            .eq("address.city", Some("Lisbon"))
            .build()
            .unwrap();
        let sql = render(&filter);
        assert!(!sql.contains("DROP TABLE"));
        assert!(!sql.contains("Lisbon"));
        assert!(!sql.contains("address"));
        assert!(sql.contains("ILIKE $"));
        assert!(sql.contains(" OR "));
        assert!(sql.contains(" AND "));
    }

    #[test]
    fn test_eq_matches_array_members() {
        let sql = render(&Predicate::eq("amenities", json!("Spa")));
        assert!(sql.contains("@> jsonb_build_array($"));
        let sql = render(&Predicate::eq("tags", json!(["a", "b"])));
        assert!(!sql.contains("jsonb_build_array"));
    }

    #[test]
    fn test_range_only_renders_present_bounds() {
        let sql = render(&Predicate::Range {
            field: "pricePerNight".to_string(),
            min: Some(50.0),
            max: None,
        });
        assert!(sql.contains(">= $"));
        assert!(!sql.contains("<= $"));
    }

    #[test]
    fn test_near_uses_haversine() {
        let sql = render(&Predicate::Near {
            field: "location".to_string(),
            lng: -9.14,
            lat: 38.72,
            max_distance_m: 5_000.0,
        });
        assert!(sql.contains("asin(sqrt("));
        assert!(sql.contains("->> 0)::float8"));
        assert!(sql.contains("->> 1)::float8"));
    }

    #[test]
    fn test_order_by_created_uses_column() {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT body FROM documents");
        push_order_by(&mut qb, &Sort::newest_first());
        assert_eq!(qb.sql(), "SELECT body FROM documents ORDER BY created_at DESC, id ASC");

        let mut qb = QueryBuilder::<Postgres>::new("SELECT body FROM documents");
        push_order_by(&mut qb, &Sort::asc("name"));
        assert!(qb.sql().contains("lower(body #>> $2) END ASC NULLS FIRST"));
    }

    #[test]
    fn test_like_escape() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("plain"), "plain");
    }
}
