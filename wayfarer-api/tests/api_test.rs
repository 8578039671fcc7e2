use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use tower::ServiceExt;
use wayfarer_api::middleware::Claims;
use wayfarer_api::state::AuthConfig;
use wayfarer_api::{app, AppState};
use wayfarer_core::DocumentStore;
use wayfarer_store::app_config::BusinessRules;
use wayfarer_store::MemoryDocumentStore;

const SECRET: &str = "test-secret";

struct TestApp {
    router: Router,
    admin: String,
    user: String,
    other: String,
}

fn token(sub: &str, role: &str) -> String {
    let claims = Claims {
        sub: sub.to_string(),
        role: role.to_string(),
        exp: (chrono::Utc::now().timestamp() + 3600) as usize,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET.as_bytes())).unwrap()
}

fn test_app_with_storage(storage_root: PathBuf) -> TestApp {
    let store: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::new());
    let rules = BusinessRules {
        tax_rate: 0.10,
        default_page_size: 10,
        max_page_size: 100,
        rate_limit_per_minute: 120,
    };
    let state = AppState::new(
        store,
        None,
        AuthConfig {
            secret: SECRET.to_string(),
        },
        rules,
        storage_root,
    );

    TestApp {
        router: app(state),
        admin: token("admin-1", "ADMIN"),
        user: token("user-1", "USER"),
        other: token("user-2", "USER"),
    }
}

fn test_app() -> TestApp {
    test_app_with_storage(PathBuf::from("storage"))
}

impl TestApp {
    async fn call(&self, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    async fn create_destination(&self, name: &str) -> String {
        let (status, body) = self
            .call(
                "POST",
                "/api/v1/destinations/admin",
                Some(&self.admin),
                Some(json!({
                    "name": name,
                    "description": "Hills, trams and custard tarts",
                    "city": "Lisbon",
                    "country": "Portugal",
                    "category": "city",
                    "tags": ["food", "history"],
                    "rating": 4.7,
                    "location": { "type": "Point", "coordinates": [-9.1393, 38.7223] }
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["data"]["id"].as_str().unwrap().to_string()
    }

    /// Hotel with one double room at 100/night and a 1.5x summer season.
    async fn create_hotel(&self, destination_id: &str) -> (String, String) {
        let (status, body) = self
            .call(
                "POST",
                "/api/v1/hotels/admin",
                Some(&self.admin),
                Some(json!({
                    "name": "Sea View",
                    "description": "Rooms over the river",
                    "destinationId": destination_id,
                    "address": { "street": "Rua Augusta 1", "city": "Lisbon", "country": "Portugal" },
                    "starRating": 4,
                    "amenities": ["wifi", "pool"],
                    "rooms": [{
                        "roomNumber": "101",
                        "roomType": "double",
                        "capacity": 2,
                        "basePrice": 100,
                        "seasonalPricing": [{
                            "name": "summer",
                            "startDate": "2024-06-01",
                            "endDate": "2024-08-31",
                            "multiplier": 1.5
                        }]
                    }]
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        (
            body["data"]["id"].as_str().unwrap().to_string(),
            body["data"]["rooms"][0]["id"].as_str().unwrap().to_string(),
        )
    }

    async fn create_vehicle(&self, is_available: bool) -> String {
        let (status, body) = self
            .call(
                "POST",
                "/api/v1/vehicles/admin",
                Some(&self.admin),
                Some(json!({
                    "make": "Toyota",
                    "model": "Corolla",
                    "year": 2022,
                    "category": "sedan",
                    "capacity": 5,
                    "dailyRate": 45,
                    "isAvailable": is_available,
                    "city": "Lisbon",
                    "insuranceOptions": [{ "name": "Full", "dailyRate": 12.5 }]
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{}", body);
        body["data"]["id"].as_str().unwrap().to_string()
    }
}

// ============================================================================
// CRUD, pagination and envelopes
// ============================================================================

#[tokio::test]
async fn test_create_then_get_returns_submitted_fields() {
    let app = test_app();
    let id = app.create_destination("Lisbon").await;

    let (status, body) = app.call("GET", &format!("/api/v1/destinations/public/{}", id), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["name"], "Lisbon");
    assert_eq!(body["data"]["country"], "Portugal");
    assert_eq!(body["data"]["tags"], json!(["food", "history"]));
    assert_eq!(body["data"]["location"]["coordinates"][0], -9.1393);
}

#[tokio::test]
async fn test_pagination_metadata_and_page_past_end() {
    let app = test_app();
    for name in ["Lisbon", "Porto", "Faro"] {
        app.create_destination(name).await;
    }

    let (status, body) = app
        .call("GET", "/api/v1/destinations/public?page=2&limit=2&sortBy=name&sortOrder=asc", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["name"], "Porto");
    assert_eq!(body["pagination"]["currentPage"], 2);
    assert_eq!(body["pagination"]["totalPages"], 2);
    assert_eq!(body["pagination"]["totalItems"], 3);
    assert_eq!(body["pagination"]["itemsPerPage"], 2);

    let (status, body) = app.call("GET", "/api/v1/destinations/public?page=9&limit=2", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));
    assert_eq!(body["pagination"]["totalItems"], 3);
}

#[tokio::test]
async fn test_huge_page_number_is_past_the_end() {
    let app = test_app();
    app.create_destination("Lisbon").await;

    for page in ["18446744073709551615", "9223372036854775809"] {
        let (status, body) = app
            .call("GET", &format!("/api/v1/destinations/public?page={}&limit=2", page), None, None)
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"], json!([]));
        assert_eq!(body["pagination"]["totalItems"], 1);
    }
}

#[tokio::test]
async fn test_search_and_filters() {
    let app = test_app();
    app.create_destination("Lisbon").await;
    app.create_destination("Sintra").await;

    let (_, body) = app.call("GET", "/api/v1/destinations/public?searchTerm=SINT", None, None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    assert_eq!(body["data"][0]["name"], "Sintra");

    let (status, body) = app.call("GET", "/api/v1/destinations/public?lat=38.7&lng=-9.1&radius=10", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["totalItems"], 2);

    let (status, body) = app.call("GET", "/api/v1/destinations/public?lat=38.7", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["path"], "lat");
}

#[tokio::test]
async fn test_invalid_sort_and_limit_are_rejected() {
    let app = test_app();
    let (status, body) = app.call("GET", "/api/v1/destinations/public?sortBy=password", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["path"], "sortBy");

    let (status, _) = app.call("GET", "/api/v1/destinations/public?limit=500", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_validation_error_envelope() {
    let app = test_app();
    let (status, body) = app
        .call(
            "POST",
            "/api/v1/destinations/admin",
            Some(&app.admin),
            Some(json!({ "name": "", "description": "x", "city": "Lisbon", "country": "Portugal" })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["errors"][0]["path"], "name");
    assert_eq!(body["errors"][0]["message"], "name is required");
}

#[tokio::test]
async fn test_malformed_json_is_a_bad_request() {
    let app = test_app();
    let (status, body) = app
        .call("POST", "/api/v1/faqs/admin", Some(&app.admin), Some(json!({ "question": 42 })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["type"], "body");
}

#[tokio::test]
async fn test_unknown_route_and_missing_record() {
    let app = test_app();
    let (status, body) = app.call("GET", "/api/v1/nowhere", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);

    let (status, body) = app
        .call("GET", &format!("/api/v1/hotels/public/{}", uuid::Uuid::new_v4()), None, None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["errors"][0]["type"], "not_found");
}

// ============================================================================
// Authentication
// ============================================================================

#[tokio::test]
async fn test_admin_routes_require_admin_token() {
    let app = test_app();
    let body = json!({ "name": "X", "description": "x", "city": "c", "country": "c" });

    let (status, response) = app.call("POST", "/api/v1/destinations/admin", None, Some(body.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(response["success"], false);

    let (status, _) = app
        .call("POST", "/api/v1/destinations/admin", Some("not-a-jwt"), Some(body.clone()))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .call("POST", "/api/v1/destinations/admin", Some(&app.user), Some(body))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_user_routes_require_token() {
    let app = test_app();
    let (status, _) = app.call("GET", "/api/v1/trips", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app.call("GET", "/api/v1/trips", Some(&app.user), None).await;
    assert_eq!(status, StatusCode::OK);
}

// ============================================================================
// Hotels and bookings
// ============================================================================

#[tokio::test]
async fn test_hotel_availability_example() {
    let app = test_app();
    let destination_id = app.create_destination("Lisbon").await;
    let (hotel_id, room_id) = app.create_hotel(&destination_id).await;

    let (status, body) = app
        .call(
            "GET",
            &format!(
                "/api/v1/hotels/public/{}/availability?checkIn=2024-06-01&checkOut=2024-06-03&guests=2",
                hotel_id
            ),
            None,
            None,
        )
        .await;

    assert_eq!(status, StatusCode::OK, "{}", body);
    let data = &body["data"];
    assert_eq!(data["nights"], 2);
    let rooms = data["availableRooms"].as_array().unwrap();
    assert_eq!(rooms.len(), 1);
    assert_eq!(rooms[0]["room"]["id"], room_id.as_str());
    let quote = &rooms[0]["calculatedPrice"];
    assert_eq!(quote["seasonalPrice"].as_f64(), Some(150.0));
    assert_eq!(quote["totalPrice"].as_f64(), Some(300.0));
}

#[tokio::test]
async fn test_availability_requires_dates() {
    let app = test_app();
    let destination_id = app.create_destination("Lisbon").await;
    let (hotel_id, _) = app.create_hotel(&destination_id).await;

    let (status, body) = app
        .call(
            "GET",
            &format!("/api/v1/hotels/public/{}/availability?checkOut=2024-06-03", hotel_id),
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["path"], "checkIn");
}

#[tokio::test]
async fn test_hotel_requires_existing_destination() {
    let app = test_app();
    let (status, body) = app
        .call(
            "POST",
            "/api/v1/hotels/admin",
            Some(&app.admin),
            Some(json!({
                "name": "Ghost",
                "description": "Nowhere",
                "destinationId": uuid::Uuid::new_v4(),
                "address": { "city": "Lisbon", "country": "Portugal" },
                "starRating": 3
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["path"], "destinationId");
}

#[tokio::test]
async fn test_overlapping_seasons_rejected() {
    let app = test_app();
    let destination_id = app.create_destination("Lisbon").await;
    let (hotel_id, _) = app.create_hotel(&destination_id).await;

    let (status, body) = app
        .call(
            "POST",
            &format!("/api/v1/hotels/admin/{}/rooms", hotel_id),
            Some(&app.admin),
            Some(json!({
                "roomNumber": "102",
                "roomType": "suite",
                "capacity": 4,
                "basePrice": 200,
                "seasonalPricing": [
                    { "name": "summer", "startDate": "2024-06-01", "endDate": "2024-08-31", "multiplier": 1.5 },
                    { "name": "festival", "startDate": "2024-06-10", "endDate": "2024-06-14", "multiplier": 2 }
                ]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["path"], "seasonalPricing");
}

#[tokio::test]
async fn test_room_management_keeps_cheapest_price() {
    let app = test_app();
    let destination_id = app.create_destination("Lisbon").await;
    let (hotel_id, _) = app.create_hotel(&destination_id).await;
    let room = |number: &str, price: i64| {
        json!({ "roomNumber": number, "roomType": "single", "capacity": 1, "basePrice": price })
    };

    let (status, body) = app
        .call("POST", &format!("/api/v1/hotels/admin/{}/rooms", hotel_id), Some(&app.admin), Some(room("102", 80)))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["pricePerNight"].as_f64(), Some(80.0));

    let (status, _) = app
        .call("POST", &format!("/api/v1/hotels/admin/{}/rooms", hotel_id), Some(&app.admin), Some(room("102", 90)))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let cheap_room = body["data"]["rooms"][1]["id"].as_str().unwrap().to_string();
    let (status, body) = app
        .call(
            "DELETE",
            &format!("/api/v1/hotels/admin/{}/rooms/{}", hotel_id, cheap_room),
            Some(&app.admin),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["pricePerNight"].as_f64(), Some(100.0));

    let (_, body) = app.call("GET", "/api/v1/hotels/public?minPrice=90&maxPrice=120", None, None).await;
    assert_eq!(body["pagination"]["totalItems"], 1);
}

#[tokio::test]
async fn test_book_cancel_and_rebook_room() {
    let app = test_app();
    let destination_id = app.create_destination("Lisbon").await;
    let (hotel_id, room_id) = app.create_hotel(&destination_id).await;
    let booking = json!({
        "hotelId": hotel_id,
        "roomId": room_id,
        "checkIn": "2024-06-01",
        "checkOut": "2024-06-03",
        "guests": 2
    });

    let (status, body) = app
        .call("POST", "/api/v1/bookings/hotels", Some(&app.user), Some(booking.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    let reservation = &body["data"];
    assert!(reservation["reference"].as_str().unwrap().starts_with('H'));
    assert_eq!(reservation["status"], "Confirmed");
    assert_eq!(reservation["price"]["basePrice"].as_f64(), Some(300.0));
    assert_eq!(reservation["price"]["totalPrice"].as_f64(), Some(330.0));
    let reservation_id = reservation["id"].as_str().unwrap().to_string();

    // The same room is no longer offered or bookable
    let availability = format!(
        "/api/v1/hotels/public/{}/availability?checkIn=2024-06-02&checkOut=2024-06-04&guests=1",
        hotel_id
    );
    let (_, body) = app.call("GET", &availability, None, None).await;
    assert_eq!(body["data"]["availableRooms"], json!([]));
    let (status, _) = app
        .call("POST", "/api/v1/bookings/hotels", Some(&app.other), Some(booking.clone()))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Other users cannot see or cancel it
    let (status, _) = app
        .call("GET", &format!("/api/v1/bookings/{}", reservation_id), Some(&app.other), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app
        .call("GET", &format!("/api/v1/bookings/{}", reservation_id), Some(&app.admin), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app
        .call("PUT", &format!("/api/v1/bookings/{}/cancel", reservation_id), Some(&app.user), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "Cancelled");

    let (status, _) = app
        .call("PUT", &format!("/api/v1/bookings/{}/cancel", reservation_id), Some(&app.user), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // Cancelled reservations no longer block
    let (_, body) = app.call("GET", &availability, None, None).await;
    assert_eq!(body["data"]["availableRooms"].as_array().unwrap().len(), 1);
    let (status, _) = app
        .call("POST", "/api/v1/bookings/hotels", Some(&app.other), Some(booking))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, body) = app.call("GET", "/api/v1/bookings?status=Cancelled", Some(&app.user), None).await;
    assert_eq!(body["pagination"]["totalItems"], 1);
    let (_, body) = app.call("GET", "/api/v1/bookings/admin", Some(&app.admin), None).await;
    assert_eq!(body["pagination"]["totalItems"], 2);
}

#[tokio::test]
async fn test_inverted_booking_dates_rejected() {
    let app = test_app();
    let destination_id = app.create_destination("Lisbon").await;
    let (hotel_id, room_id) = app.create_hotel(&destination_id).await;

    let (status, body) = app
        .call(
            "POST",
            "/api/v1/bookings/hotels",
            Some(&app.user),
            Some(json!({
                "hotelId": hotel_id,
                "roomId": room_id,
                "checkIn": "2024-06-03",
                "checkOut": "2024-06-01",
                "guests": 1
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["path"], "checkOut");
}

// ============================================================================
// Vehicles
// ============================================================================

#[tokio::test]
async fn test_unavailable_vehicle_cannot_be_rented() {
    let app = test_app();
    let vehicle_id = app.create_vehicle(false).await;

    let (status, body) = app
        .call(
            "POST",
            "/api/v1/bookings/vehicles",
            Some(&app.user),
            Some(json!({ "vehicleId": vehicle_id, "startDate": "2030-01-01", "endDate": "2030-01-04" })),
        )
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);

    let (_, body) = app
        .call(
            "GET",
            &format!("/api/v1/vehicles/public/{}/availability?startDate=2030-01-01&endDate=2030-01-04", vehicle_id),
            None,
            None,
        )
        .await;
    assert_eq!(body["data"]["isAvailable"], false);
    assert!(body["data"]["reason"].is_string());
}

#[tokio::test]
async fn test_vehicle_rental_flips_and_restores_flag() {
    let app = test_app();
    let vehicle_id = app.create_vehicle(true).await;

    let (status, body) = app
        .call(
            "POST",
            "/api/v1/bookings/vehicles",
            Some(&app.user),
            Some(json!({
                "vehicleId": vehicle_id,
                "startDate": "2030-01-01",
                "endDate": "2030-01-04",
                "insuranceOption": "full"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert!(body["data"]["reference"].as_str().unwrap().starts_with('V'));
    assert_eq!(body["data"]["price"]["basePrice"].as_f64(), Some(135.0));
    assert_eq!(body["data"]["price"]["extra"].as_f64(), Some(37.5));
    let reservation_id = body["data"]["id"].as_str().unwrap().to_string();

    let (_, body) = app
        .call("GET", &format!("/api/v1/vehicles/public/{}", vehicle_id), None, None)
        .await;
    assert_eq!(body["data"]["isAvailable"], false);

    let (_, body) = app.call("GET", "/api/v1/vehicles/public?isAvailable=true", None, None).await;
    assert_eq!(body["pagination"]["totalItems"], 0);

    let (status, _) = app
        .call("PUT", &format!("/api/v1/bookings/{}/cancel", reservation_id), Some(&app.user), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app
        .call("GET", &format!("/api/v1/vehicles/public/{}", vehicle_id), None, None)
        .await;
    assert_eq!(body["data"]["isAvailable"], true);
}

#[tokio::test]
async fn test_unknown_insurance_option() {
    let app = test_app();
    let vehicle_id = app.create_vehicle(true).await;

    let (status, body) = app
        .call(
            "POST",
            "/api/v1/bookings/vehicles",
            Some(&app.user),
            Some(json!({
                "vehicleId": vehicle_id,
                "startDate": "2030-01-01",
                "endDate": "2030-01-02",
                "insuranceOption": "Platinum"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["path"], "insuranceOption");
}

// ============================================================================
// Favorites, FAQs, trips, notifications
// ============================================================================

#[tokio::test]
async fn test_duplicate_favorite_conflicts() {
    let app = test_app();
    let destination_id = app.create_destination("Lisbon").await;
    let favorite = json!({ "itemType": "destination", "itemId": destination_id });

    let (status, body) = app
        .call("POST", "/api/v1/favorites", Some(&app.user), Some(favorite.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let favorite_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = app
        .call("POST", "/api/v1/favorites", Some(&app.user), Some(favorite.clone()))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    // Another user may favorite the same item
    let (status, _) = app
        .call("POST", "/api/v1/favorites", Some(&app.other), Some(favorite))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let check = format!("/api/v1/favorites/check/destination/{}", destination_id);
    let (_, body) = app.call("GET", &check, Some(&app.user), None).await;
    assert_eq!(body["data"]["isFavorite"], true);
    assert_eq!(body["data"]["favoriteId"], favorite_id.as_str());

    let (status, _) = app
        .call("DELETE", &format!("/api/v1/favorites/{}", favorite_id), Some(&app.other), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = app
        .call("DELETE", &format!("/api/v1/favorites/{}", favorite_id), Some(&app.user), None)
        .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = app.call("GET", &check, Some(&app.user), None).await;
    assert_eq!(body["data"]["isFavorite"], false);
}

#[tokio::test]
async fn test_favorite_of_missing_item() {
    let app = test_app();
    let (status, _) = app
        .call(
            "POST",
            "/api/v1/favorites",
            Some(&app.user),
            Some(json!({ "itemType": "hotel", "itemId": uuid::Uuid::new_v4() })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_duplicate_faq_question_conflicts() {
    let app = test_app();
    let faq = |question: &str| json!({ "question": question, "answer": "From your bookings page.", "category": "booking" });

    let (status, _) = app
        .call("POST", "/api/v1/faqs/admin", Some(&app.admin), Some(faq("How do I cancel?")))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = app
        .call("POST", "/api/v1/faqs/admin", Some(&app.admin), Some(faq("how do i CANCEL?")))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);

    let (status, _) = app
        .call("POST", "/api/v1/faqs/admin", Some(&app.admin), Some(faq("How do I cancel a rental?")))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, body) = app.call("GET", "/api/v1/faqs/public?category=booking", None, None).await;
    assert_eq!(body["pagination"]["totalItems"], 2);
}

#[tokio::test]
async fn test_faq_question_length_counts_trimmed_text() {
    let app = test_app();
    let (status, body) = app
        .call(
            "POST",
            "/api/v1/faqs/admin",
            Some(&app.admin),
            Some(json!({ "question": "      Hi?      ", "answer": "Hello.", "category": "general" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["path"], "question");

    let (status, body) = app
        .call(
            "POST",
            "/api/v1/faqs/admin",
            Some(&app.admin),
            Some(json!({ "question": "  Can I bring pets?  ", "answer": "Some hotels allow them.", "category": "general" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["question"], "Can I bring pets?");
}

// ============================================================================
// Activities
// ============================================================================

fn activity(destination_id: &str, name: &str, duration_hours: f64, is_active: bool) -> Value {
    json!({
        "name": name,
        "description": "Guided outing",
        "destinationId": destination_id,
        "category": "tour",
        "price": 40,
        "durationHours": duration_hours,
        "maxParticipants": 12,
        "difficulty": "easy",
        "isActive": is_active
    })
}

#[tokio::test]
async fn test_inactive_activity_hidden_from_public() {
    let app = test_app();
    let destination_id = app.create_destination("Lisbon").await;

    let (status, _) = app
        .call("POST", "/api/v1/activities/admin", Some(&app.admin), Some(activity(&destination_id, "Tram ride", 2.0, true)))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = app
        .call("POST", "/api/v1/activities/admin", Some(&app.admin), Some(activity(&destination_id, "Night walk", 3.0, false)))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let hidden_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = app.call("GET", "/api/v1/activities/public", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["totalItems"], 1);
    assert_eq!(body["data"][0]["name"], "Tram ride");

    let (status, _) = app.call("GET", &format!("/api/v1/activities/public/{}", hidden_id), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = app
        .call(
            "PUT",
            &format!("/api/v1/activities/admin/{}", hidden_id),
            Some(&app.admin),
            Some(activity(&destination_id, "Night walk", 3.0, true)),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{}", body);

    let (status, body) = app.call("GET", &format!("/api/v1/activities/public/{}", hidden_id), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["name"], "Night walk");
}

#[tokio::test]
async fn test_activity_requires_existing_destination() {
    let app = test_app();
    let missing = uuid::Uuid::new_v4().to_string();

    let (status, body) = app
        .call("POST", "/api/v1/activities/admin", Some(&app.admin), Some(activity(&missing, "Tram ride", 2.0, true)))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["path"], "destinationId");

    let destination_id = app.create_destination("Lisbon").await;
    let (_, body) = app
        .call("POST", "/api/v1/activities/admin", Some(&app.admin), Some(activity(&destination_id, "Tram ride", 2.0, true)))
        .await;
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = app
        .call(
            "PUT",
            &format!("/api/v1/activities/admin/{}", id),
            Some(&app.admin),
            Some(activity(&missing, "Tram ride", 2.0, true)),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["path"], "destinationId");
}

#[tokio::test]
async fn test_activity_duration_filter() {
    let app = test_app();
    let destination_id = app.create_destination("Lisbon").await;
    for (name, hours) in [("Tram ride", 1.5), ("Sintra day trip", 8.0), ("Fado evening", 3.0)] {
        let (status, _) = app
            .call("POST", "/api/v1/activities/admin", Some(&app.admin), Some(activity(&destination_id, name, hours, true)))
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = app
        .call("GET", "/api/v1/activities/public?minDuration=2&maxDuration=4", None, None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["pagination"]["totalItems"], 1);
    assert_eq!(body["data"][0]["name"], "Fado evening");

    let (_, body) = app.call("GET", "/api/v1/activities/public?minDuration=3", None, None).await;
    assert_eq!(body["pagination"]["totalItems"], 2);

    let (status, _) = app
        .call("GET", "/api/v1/activities/public?minDuration=5&maxDuration=2", None, None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_trip_budget_tracks_items() {
    let app = test_app();
    let (status, body) = app
        .call(
            "POST",
            "/api/v1/trips",
            Some(&app.user),
            Some(json!({
                "name": "Portugal",
                "startDate": "2024-06-01",
                "endDate": "2024-06-07",
                "travelers": 2,
                "budget": { "total": 1000, "currency": "eur" }
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    assert_eq!(body["data"]["budget"]["currency"], "EUR");
    let trip = format!("/api/v1/trips/{}", body["data"]["id"].as_str().unwrap());

    let (_, body) = app
        .call(
            "POST",
            &format!("{}/items", trip),
            Some(&app.user),
            Some(json!({ "category": "accommodation", "title": "Sea View", "cost": 300 })),
        )
        .await;
    assert_eq!(body["data"]["budget"]["remaining"].as_f64(), Some(700.0));
    let hotel_item = body["data"]["accommodations"][0]["id"].as_str().unwrap().to_string();

    let (_, body) = app
        .call(
            "POST",
            &format!("{}/items", trip),
            Some(&app.user),
            Some(json!({ "category": "meals", "title": "Dinner", "cost": 50 })),
        )
        .await;
    assert_eq!(body["data"]["budget"]["spent"]["meals"].as_f64(), Some(50.0));
    assert_eq!(body["data"]["budget"]["remaining"].as_f64(), Some(650.0));

    let (status, body) = app
        .call("DELETE", &format!("{}/items/{}", trip, hotel_item), Some(&app.user), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["budget"]["spent"]["accommodation"].as_f64(), Some(0.0));
    assert_eq!(body["data"]["budget"]["remaining"].as_f64(), Some(950.0));

    // Private trips are invisible to other users
    let (status, _) = app.call("GET", &trip, Some(&app.other), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_trip_destinations() {
    let app = test_app();
    let lisbon = app.create_destination("Lisbon").await;
    let (_, body) = app
        .call(
            "POST",
            "/api/v1/trips",
            Some(&app.user),
            Some(json!({
                "name": "Portugal",
                "startDate": "2024-06-01",
                "endDate": "2024-06-07",
                "travelers": 1,
                "isPublic": true,
                "budget": { "total": 500 }
            })),
        )
        .await;
    let trip = format!("/api/v1/trips/{}", body["data"]["id"].as_str().unwrap());

    let stop = json!({ "destinationId": lisbon, "arrivalDate": "2024-06-01" });
    let (status, body) = app
        .call("POST", &format!("{}/destinations", trip), Some(&app.user), Some(stop.clone()))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["destinations"][0]["order"], 1);

    let (status, _) = app
        .call("POST", &format!("{}/destinations", trip), Some(&app.user), Some(stop))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app
        .call(
            "POST",
            &format!("{}/destinations", trip),
            Some(&app.user),
            Some(json!({ "destinationId": uuid::Uuid::new_v4() })),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Public trips are readable but not editable by others
    let (status, _) = app.call("GET", &trip, Some(&app.other), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = app.call("DELETE", &trip, Some(&app.other), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_booking_notifications_and_read_all() {
    let app = test_app();
    let vehicle_id = app.create_vehicle(true).await;
    let (status, _) = app
        .call(
            "POST",
            "/api/v1/bookings/vehicles",
            Some(&app.user),
            Some(json!({ "vehicleId": vehicle_id, "startDate": "2030-01-01", "endDate": "2030-01-02" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = app
        .call(
            "POST",
            "/api/v1/notifications/admin",
            Some(&app.admin),
            Some(json!({ "userId": "user-1", "title": "Welcome", "message": "Enjoy your trip", "kind": "promotion" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, body) = app.call("GET", "/api/v1/notifications?unread=true", Some(&app.user), None).await;
    assert_eq!(body["pagination"]["totalItems"], 2);
    let (_, body) = app.call("GET", "/api/v1/notifications", Some(&app.other), None).await;
    assert_eq!(body["pagination"]["totalItems"], 0);

    let (status, body) = app.call("PUT", "/api/v1/notifications/read-all", Some(&app.user), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["updated"], 2);

    let (_, body) = app.call("GET", "/api/v1/notifications?unread=true", Some(&app.user), None).await;
    assert_eq!(body["pagination"]["totalItems"], 0);
    let (_, body) = app.call("GET", "/api/v1/notifications", Some(&app.user), None).await;
    assert_eq!(body["pagination"]["totalItems"], 2);
}

// ============================================================================
// Static files
// ============================================================================

#[tokio::test]
async fn test_storage_serves_files() {
    let root = std::env::temp_dir().join(format!("wayfarer-storage-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(root.join("hotels")).unwrap();
    std::fs::write(root.join("hotels").join("lobby.txt"), "welcome").unwrap();

    let app = test_app_with_storage(root.clone());
    let response = app
        .router
        .clone()
        .oneshot(Request::builder().uri("/storage/hotels/lobby.txt").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()["content-type"].to_str().unwrap().starts_with("text/plain"));

    let (status, _) = app.call("GET", "/storage/hotels/missing.png", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    std::fs::remove_dir_all(root).unwrap();
}
