use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use wayfarer_shared::{DateWindow, InsuranceOption, PriceBreakdown, Room, SeasonalRate, Vehicle};

use crate::availability::overlaps;

const SECONDS_PER_DAY: i64 = 86_400;

/// Adjustments added on top of `rate * units`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modifier {
    /// Percentage of the base price, e.g. `0.10` for 10% tax.
    Tax(Decimal),
    /// Flat amount per unit, e.g. an insurance option's daily rate.
    DailyAddon(Decimal),
}

/// Billable nights/days: `ceil((end - start) / 1 day)`, at least 1 for a non-empty window.
pub fn billable_units(window: &DateWindow) -> u32 {
    let seconds = (window.end - window.start).num_seconds();
    if seconds <= 0 {
        return 0;
    }
    let days = (seconds + SECONDS_PER_DAY - 1) / SECONDS_PER_DAY;
    u32::try_from(days).unwrap_or(u32::MAX)
}

pub fn compute_price(rate: Decimal, units: u32, modifiers: &[Modifier]) -> PriceBreakdown {
    let units = Decimal::from(units);
    let base_price = (rate * units).round_dp(2);

    let extra: Decimal = modifiers
        .iter()
        .map(|m| match m {
            Modifier::Tax(pct) => base_price * pct,
            Modifier::DailyAddon(amount) => amount * units,
        })
        .sum();
    let extra = extra.round_dp(2);

    PriceBreakdown {
        base_price,
        extra,
        total_price: base_price + extra,
    }
}

/// Rate for a stay starting at `check_in`. The first season containing the
/// check-in calendar date (inclusive at both ends) wins.
pub fn seasonal_rate(base: Decimal, seasons: &[SeasonalRate], check_in: DateTime<Utc>) -> Decimal {
    let day = check_in.date_naive();
    seasons
        .iter()
        .find(|s| s.start_date.date_naive() <= day && day <= s.end_date.date_naive())
        .map(|s| (base * s.multiplier).round_dp(2))
        .unwrap_or(base)
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PricingError {
    #[error("season '{0}' ends before it starts")]
    InvertedSeason(String),
    #[error("season '{0}' must have a positive multiplier")]
    InvalidMultiplier(String),
    #[error("seasons '{first}' and '{second}' overlap")]
    OverlappingSeasons { first: String, second: String },
}

/// Reject malformed or overlapping seasons so the first-match rule never needs a tie-break.
pub fn validate_seasons(seasons: &[SeasonalRate]) -> Result<(), PricingError> {
    for season in seasons {
        if season.end_date < season.start_date {
            return Err(PricingError::InvertedSeason(season.name.clone()));
        }
        if season.multiplier <= Decimal::ZERO {
            return Err(PricingError::InvalidMultiplier(season.name.clone()));
        }
    }

    for (i, a) in seasons.iter().enumerate() {
        for b in &seasons[i + 1..] {
            let wa = DateWindow::new(a.start_date, a.end_date);
            let wb = DateWindow::new(b.start_date, b.end_date);
            if overlaps(&wa, &wb) {
                return Err(PricingError::OverlappingSeasons {
                    first: a.name.clone(),
                    second: b.name.clone(),
                });
            }
        }
    }

    Ok(())
}

// ============================================================================
// Engine
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingConfig {
    /// Tax applied to hotel bookings, as a fraction.
    pub tax_rate: Decimal,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            tax_rate: Decimal::new(10, 2),
        }
    }
}

/// Price shown next to an available room in search results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomQuote {
    pub nightly_rate: Decimal,
    pub seasonal_price: Decimal,
    pub nights: u32,
    pub total_price: Decimal,
}

pub struct PricingEngine {
    config: PricingConfig,
}

impl PricingEngine {
    pub fn new(config: PricingConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PricingConfig {
        &self.config
    }

    /// Search-time quote: seasonal rate times nights, no tax.
    pub fn quote_room(&self, room: &Room, window: &DateWindow) -> RoomQuote {
        let nights = billable_units(window);
        let seasonal_price = seasonal_rate(room.base_price, &room.seasonal_pricing, window.start);
        let price = compute_price(seasonal_price, nights, &[]);

        RoomQuote {
            nightly_rate: room.base_price,
            seasonal_price,
            nights,
            total_price: price.total_price,
        }
    }

    /// Booking price for a room, with tax as the extra.
    pub fn price_room_booking(&self, room: &Room, window: &DateWindow) -> PriceBreakdown {
        let nights = billable_units(window);
        let rate = seasonal_rate(room.base_price, &room.seasonal_pricing, window.start);
        compute_price(rate, nights, &[Modifier::Tax(self.config.tax_rate)])
    }

    /// Rental price for a vehicle, with the chosen insurance as the extra.
    pub fn price_vehicle_rental(
        &self,
        vehicle: &Vehicle,
        window: &DateWindow,
        insurance: Option<&InsuranceOption>,
    ) -> PriceBreakdown {
        let days = billable_units(window);
        let modifiers: Vec<Modifier> = insurance
            .map(|option| Modifier::DailyAddon(option.daily_rate))
            .into_iter()
            .collect();
        compute_price(vehicle.daily_rate, days, &modifiers)
    }
}

impl Default for PricingEngine {
    fn default() -> Self {
        Self::new(PricingConfig::default())
    }
}
