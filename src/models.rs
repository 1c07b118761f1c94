use std::{fmt, str::FromStr};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize, Serializer};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: {value:?}")]
pub struct UnknownValue {
    pub kind: &'static str,
    pub value: String,
}

/// Declares a closed set of wire identifiers with `as_str`, `Display` and `FromStr`.
macro_rules! wire_enum {
    ($(#[$meta:meta])* $name:ident, $kind:literal { $($variant:ident => $wire:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $wire)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownValue;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                match value {
                    $($wire => Ok($name::$variant),)+
                    _ => Err(UnknownValue {
                        kind: $kind,
                        value: value.to_string(),
                    }),
                }
            }
        }
    };
}

wire_enum!(Category, "category" {
    Academic => "academic",
    Social => "social",
    Sports => "sports",
    Arts => "arts",
});

wire_enum!(CostTier, "cost tier" {
    Free => "free",
    Paid => "paid",
});

wire_enum!(DietaryTag, "dietary tag" {
    Vegetarian => "vegetarian",
    Vegan => "vegan",
    GlutenFree => "gluten-free",
    Halal => "halal",
    Kosher => "kosher",
});

wire_enum!(
    /// A concrete meal period. The symbolic "now" lives in `pipeline::meal::MealSelector`.
    MealPeriod, "meal period" {
    Breakfast => "breakfast",
    Lunch => "lunch",
    Dinner => "dinner",
});

wire_enum!(DiningLocation, "dining location" {
    HallA => "hallA",
    HallB => "hallB",
    Cafe => "cafe",
});

impl Default for DiningLocation {
    fn default() -> Self {
        DiningLocation::HallA
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Event {
    pub id: u32,
    pub title: String,
    pub date: NaiveDate,
    pub time: String,
    pub location: String,
    pub category: Category,
    pub cost: CostTier,
    pub description: String,
    pub popularity: Option<i64>,
}

impl Event {
    pub fn date_label(&self) -> String {
        self.date.format("%-m/%-d/%Y").to_string()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct DiningItem {
    pub name: String,
    pub location: DiningLocation,
    pub meal: MealPeriod,
    pub tags: Vec<DietaryTag>,
}

impl DiningItem {
    pub fn tag_list(&self) -> String {
        self.tags
            .iter()
            .map(DietaryTag::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Calories {
    Known(f64),
    Unknown,
}

impl Serialize for Calories {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Calories::Known(kcal) => serializer.serialize_f64(*kcal),
            Calories::Unknown => serializer.serialize_str("unknown"),
        }
    }
}

impl fmt::Display for Calories {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Calories::Known(kcal) => write!(f, "{kcal}"),
            Calories::Unknown => f.write_str("unknown"),
        }
    }
}

/// Nutrition metadata attached to a dining item.
#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct Enrichment {
    pub grade: String,
    #[serde(rename = "caloriesPer100g")]
    pub calories: Calories,
    pub labels: String,
}

pub const GRADE_UNAVAILABLE: &str = "N/A";
pub const DEFAULT_LABEL: &str = "General";

impl Enrichment {
    pub fn fallback() -> Self {
        Self {
            grade: GRADE_UNAVAILABLE.to_string(),
            calories: Calories::Unknown,
            labels: DEFAULT_LABEL.to_string(),
        }
    }
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct EnrichedItem {
    #[serde(flatten)]
    pub item: DiningItem,
    pub enrichment: Enrichment,
}

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Announcement {
    pub title: String,
    pub body: String,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct Forecast {
    pub name: String,
    pub short_forecast: String,
    pub temperature: i64,
    pub temperature_unit: String,
}

#[derive(Serialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct Hours {
    pub open: u32,
    pub close: u32,
}

impl Hours {
    pub fn is_open(&self, hour: u32) -> bool {
        hour >= self.open && hour < self.close
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_names_round_trip_through_from_str() {
        for tag in DietaryTag::ALL {
            assert_eq!(tag.as_str().parse::<DietaryTag>(), Ok(*tag));
        }
        assert_eq!("hallB".parse::<DiningLocation>(), Ok(DiningLocation::HallB));
        assert!("hallC".parse::<DiningLocation>().is_err());
    }

    #[test]
    fn calories_serialize_as_number_or_unknown() {
        let known = serde_json::to_value(Calories::Known(52.0)).expect("serialize");
        assert_eq!(known, serde_json::json!(52.0));
        let unknown = serde_json::to_value(Calories::Unknown).expect("serialize");
        assert_eq!(unknown, serde_json::json!("unknown"));
    }

    #[test]
    fn hours_close_is_exclusive() {
        let hours = Hours { open: 7, close: 20 };
        assert!(!hours.is_open(6));
        assert!(hours.is_open(7));
        assert!(hours.is_open(19));
        assert!(!hours.is_open(20));
    }
}
