use std::path::PathBuf;
use std::sync::Arc;

use rust_decimal::Decimal;
use wayfarer_booking::BookingService;
use wayfarer_catalog::{PricingConfig, PricingEngine};
use wayfarer_core::{Document, DocumentStore, PageLimits, Repository};
use wayfarer_store::app_config::{BusinessRules, Config};
use wayfarer_store::RedisClient;

#[derive(Clone)]
pub struct AuthConfig {
    pub secret: String,
}

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub bookings: Arc<BookingService>,
    /// Rate limiting is skipped without Redis.
    pub redis: Option<Arc<RedisClient>>,
    pub auth: AuthConfig,
    pub business_rules: BusinessRules,
    pub storage_root: PathBuf,
}

impl AppState {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        redis: Option<Arc<RedisClient>>,
        auth: AuthConfig,
        business_rules: BusinessRules,
        storage_root: PathBuf,
    ) -> Self {
        let defaults = PricingConfig::default();
        let tax_rate = Decimal::try_from(business_rules.tax_rate)
            .map(|rate| rate.round_dp(6))
            .unwrap_or(defaults.tax_rate);
        let pricing = PricingEngine::new(PricingConfig { tax_rate });

        Self {
            bookings: Arc::new(BookingService::new(store.clone(), pricing)),
            store,
            redis,
            auth,
            business_rules,
            storage_root,
        }
    }

    pub fn from_config(store: Arc<dyn DocumentStore>, redis: Option<Arc<RedisClient>>, config: &Config) -> Self {
        Self::new(
            store,
            redis,
            AuthConfig {
                secret: config.auth.jwt_secret.clone(),
            },
            config.business_rules.clone(),
            PathBuf::from(&config.storage.root),
        )
    }

    pub fn repo<T: Document>(&self) -> Repository<T> {
        Repository::new(self.store.clone())
    }

    pub fn page_limits(&self) -> PageLimits {
        PageLimits {
            default_limit: self.business_rules.default_page_size,
            max_limit: self.business_rules.max_page_size,
        }
    }
}
