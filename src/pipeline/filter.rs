use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::meal::MealSelector;
use super::sort::SortKey;
use crate::models::{
    Category, CostTier, DietaryTag, DiningItem, DiningLocation, Event, MealPeriod,
};
use crate::utils::empty_as_none;

/// A conjunction of optional constraints over one record type.
pub trait Predicate<R> {
    fn matches(&self, record: &R) -> bool;
}

/// Keeps the records satisfying `predicate`, in their original order.
pub fn filter<R: Clone, P: Predicate<R>>(records: &[R], predicate: &P) -> Vec<R> {
    records
        .iter()
        .filter(|record| predicate.matches(record))
        .cloned()
        .collect()
}

fn satisfies<T: PartialEq>(wanted: Option<T>, actual: T) -> bool {
    wanted.map_or(true, |wanted| wanted == actual)
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventSelection {
    #[serde(deserialize_with = "empty_as_none")]
    pub date: Option<NaiveDate>,
    #[serde(deserialize_with = "empty_as_none")]
    pub category: Option<Category>,
    #[serde(deserialize_with = "empty_as_none")]
    pub cost: Option<CostTier>,
    pub search: Option<String>,
    pub sort: SortKey,
}

impl EventSelection {
    fn search_term(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(|q| q.trim().to_lowercase())
            .filter(|q| !q.is_empty())
    }
}

impl Predicate<Event> for EventSelection {
    fn matches(&self, event: &Event) -> bool {
        satisfies(self.date, event.date)
            && satisfies(self.category, event.category)
            && satisfies(self.cost, event.cost)
            && self.search_term().map_or(true, |q| {
                format!("{}{}{}", event.title, event.location, event.description)
                    .to_lowercase()
                    .contains(&q)
            })
    }
}

/// Dining filters as selected, with the meal possibly still symbolic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiningSelection {
    #[serde(deserialize_with = "empty_as_none")]
    pub location: Option<DiningLocation>,
    pub meal: MealSelector,
    #[serde(deserialize_with = "empty_as_none")]
    pub diet: Option<DietaryTag>,
}

impl Default for DiningSelection {
    fn default() -> Self {
        Self {
            location: Some(DiningLocation::default()),
            meal: MealSelector::Now,
            diet: None,
        }
    }
}

impl DiningSelection {
    pub fn resolve(&self, hour: u32) -> DiningCriteria {
        DiningCriteria {
            location: self.location,
            meal: self.meal.resolve(hour),
            diet: self.diet,
        }
    }
}

/// Dining filters after the meal selector has been pinned to a period.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiningCriteria {
    pub location: Option<DiningLocation>,
    pub meal: MealPeriod,
    pub diet: Option<DietaryTag>,
}

impl Predicate<DiningItem> for DiningCriteria {
    fn matches(&self, item: &DiningItem) -> bool {
        satisfies(self.location, item.location)
            && item.meal == self.meal
            && self.diet.map_or(true, |diet| item.tags.contains(&diet))
    }
}
