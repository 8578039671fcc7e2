use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FavoriteItemType {
    Destination,
    Hotel,
    Vehicle,
    Activity,
}

impl FavoriteItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            FavoriteItemType::Destination => "destination",
            FavoriteItemType::Hotel => "hotel",
            FavoriteItemType::Vehicle => "vehicle",
            FavoriteItemType::Activity => "activity",
        }
    }
}

impl std::str::FromStr for FavoriteItemType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "destination" => Ok(FavoriteItemType::Destination),
            "hotel" => Ok(FavoriteItemType::Hotel),
            "vehicle" => Ok(FavoriteItemType::Vehicle),
            "activity" => Ok(FavoriteItemType::Activity),
            other => Err(format!("unknown item type '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Favorite {
    pub id: Uuid,
    pub user_id: String,
    pub item_type: FavoriteItemType,
    pub item_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Favorite {
    pub fn new(user_id: String, item_type: FavoriteItemType, item_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            item_type,
            item_id,
            created_at: now,
            updated_at: now,
        }
    }
}
