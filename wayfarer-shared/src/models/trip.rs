use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TripStatus {
    #[default]
    Planning,
    Booked,
    Ongoing,
    Completed,
    Cancelled,
}

/// A user's itinerary. Budget figures are derived from the item lists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trip {
    pub id: Uuid,
    pub user_id: String,
    pub name: String,
    pub description: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub travelers: u32,
    #[serde(default)]
    pub status: TripStatus,
    #[serde(default)]
    pub is_public: bool,
    #[serde(default)]
    pub destinations: Vec<TripDestination>,
    #[serde(default)]
    pub accommodations: Vec<TripItem>,
    #[serde(default)]
    pub transportation: Vec<TripItem>,
    #[serde(default)]
    pub activities: Vec<TripItem>,
    #[serde(default)]
    pub meals: Vec<TripItem>,
    #[serde(default)]
    pub other_expenses: Vec<TripItem>,
    pub budget: Budget,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripDestination {
    pub destination_id: Uuid,
    pub order: u32,
    pub arrival_date: Option<DateTime<Utc>>,
    pub departure_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TripItem {
    pub id: Uuid,
    pub title: String,
    /// Hotel, activity or reservation this item points at, if any.
    pub reference_id: Option<Uuid>,
    pub date: Option<DateTime<Utc>>,
    pub cost: Decimal,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BudgetCategory {
    Accommodation,
    Transportation,
    Activities,
    Meals,
    Other,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Budget {
    pub total: Decimal,
    pub currency: String,
    #[serde(default)]
    pub spent: SpentBreakdown,
    pub remaining: Decimal,
}

impl Budget {
    pub fn new(total: Decimal, currency: String) -> Self {
        Self {
            total,
            currency,
            spent: SpentBreakdown::default(),
            remaining: total,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpentBreakdown {
    pub accommodation: Decimal,
    pub transportation: Decimal,
    pub activities: Decimal,
    pub meals: Decimal,
    pub other: Decimal,
}

impl SpentBreakdown {
    pub fn sum(&self) -> Decimal {
        self.accommodation + self.transportation + self.activities + self.meals + self.other
    }
}

impl Trip {
    pub fn items_mut(&mut self, category: BudgetCategory) -> &mut Vec<TripItem> {
        match category {
            BudgetCategory::Accommodation => &mut self.accommodations,
            BudgetCategory::Transportation => &mut self.transportation,
            BudgetCategory::Activities => &mut self.activities,
            BudgetCategory::Meals => &mut self.meals,
            BudgetCategory::Other => &mut self.other_expenses,
        }
    }

    pub fn add_item(&mut self, category: BudgetCategory, item: TripItem) {
        self.items_mut(category).push(item);
        self.recompute_budget();
    }

    /// Remove an item from whichever list holds it.
    pub fn remove_item(&mut self, item_id: Uuid) -> Option<TripItem> {
        let lists = [
            &mut self.accommodations,
            &mut self.transportation,
            &mut self.activities,
            &mut self.meals,
            &mut self.other_expenses,
        ];
        let mut removed = None;
        for list in lists {
            if let Some(pos) = list.iter().position(|i| i.id == item_id) {
                removed = Some(list.remove(pos));
                break;
            }
        }
        if removed.is_some() {
            self.recompute_budget();
        }
        removed
    }

    /// `remaining = total - sum(spent)`, with `spent` summed from the item lists.
    pub fn recompute_budget(&mut self) {
        fn total(items: &[TripItem]) -> Decimal {
            items.iter().map(|i| i.cost).sum()
        }

        self.budget.spent = SpentBreakdown {
            accommodation: total(&self.accommodations),
            transportation: total(&self.transportation),
            activities: total(&self.activities),
            meals: total(&self.meals),
            other: total(&self.other_expenses),
        };
        self.budget.remaining = self.budget.total - self.budget.spent.sum();
    }

    /// Append a stop. Returns false if the destination is already on the trip.
    pub fn add_destination(
        &mut self,
        destination_id: Uuid,
        arrival_date: Option<DateTime<Utc>>,
        departure_date: Option<DateTime<Utc>>,
    ) -> bool {
        if self.destinations.iter().any(|d| d.destination_id == destination_id) {
            return false;
        }
        let order = self.destinations.len() as u32 + 1;
        self.destinations.push(TripDestination {
            destination_id,
            order,
            arrival_date,
            departure_date,
        });
        true
    }

    /// Drop a stop and renumber the remaining ones from 1.
    pub fn remove_destination(&mut self, destination_id: Uuid) -> bool {
        let before = self.destinations.len();
        self.destinations.retain(|d| d.destination_id != destination_id);
        if self.destinations.len() == before {
            return false;
        }
        self.destinations.sort_by_key(|d| d.order);
        for (idx, stop) in self.destinations.iter_mut().enumerate() {
            stop.order = idx as u32 + 1;
        }
        true
    }
}
