use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::models::{DietaryTag, DiningLocation};
use crate::pipeline::{DiningSelection, MealSelector};
use crate::store::{BlobStore, StoreError};

pub const DINING_PREFS_KEY: &str = "diningPrefs";
pub const FAVORITES_KEY: &str = "favorites";

/// Persisted dining filter choice. Field values are kept as the raw strings
/// the page submitted; absent fields take the page defaults on read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiningPrefs {
    pub location: String,
    pub meal: String,
    pub diet: String,
}

impl Default for DiningPrefs {
    fn default() -> Self {
        Self {
            location: DiningLocation::default().as_str().to_string(),
            meal: MealSelector::Now.as_str().to_string(),
            diet: String::new(),
        }
    }
}

impl DiningPrefs {
    /// Values that no longer parse fall back to the defaults. An empty
    /// location was saved from "all locations" and stays unrestricted.
    pub fn to_selection(&self) -> DiningSelection {
        let location = match self.location.trim() {
            "" => None,
            value => value
                .parse::<DiningLocation>()
                .ok()
                .or(Some(DiningLocation::default())),
        };
        DiningSelection {
            location,
            meal: self.meal.parse::<MealSelector>().unwrap_or_default(),
            diet: self.diet.parse::<DietaryTag>().ok(),
        }
    }

    pub fn summary(&self) -> String {
        let diet = if self.diet.is_empty() {
            "any"
        } else {
            self.diet.as_str()
        };
        let location = if self.location.is_empty() {
            "all locations"
        } else {
            self.location.as_str()
        };
        format!("{location}, {}, {diet}", self.meal)
    }
}

impl From<&DiningSelection> for DiningPrefs {
    fn from(selection: &DiningSelection) -> Self {
        Self {
            location: selection
                .location
                .map(|location| location.as_str().to_string())
                .unwrap_or_default(),
            meal: selection.meal.as_str().to_string(),
            diet: selection
                .diet
                .map(|diet| diet.as_str().to_string())
                .unwrap_or_default(),
        }
    }
}

pub fn favorite_for_event(title: &str) -> String {
    format!("Event: {title}")
}

pub fn favorite_for_menu(name: &str) -> String {
    format!("Menu: {name}")
}

/// Dining preferences and favorites on top of a blob store.
///
/// Reads never fail: a missing, unreadable or corrupt blob is reported as
/// absent. Writes surface store errors to the caller.
pub struct Preferences<B: BlobStore> {
    store: B,
}

impl<B: BlobStore> Preferences<B> {
    pub fn new(store: B) -> Self {
        Self { store }
    }

    pub fn save_dining(&self, prefs: &DiningPrefs) -> Result<(), StoreError> {
        let blob = serde_json::to_string(prefs)?;
        self.store.put(DINING_PREFS_KEY, &blob)
    }

    pub fn load_dining(&self) -> Option<DiningPrefs> {
        let blob = self.read_blob(DINING_PREFS_KEY)?;
        match serde_json::from_str(&blob) {
            Ok(prefs) => Some(prefs),
            Err(err) => {
                warn!("ignoring unparseable {DINING_PREFS_KEY} blob: {err}");
                None
            }
        }
    }

    /// Appends without deduplication and returns the updated list.
    pub fn append_favorite(&self, description: &str) -> Result<Vec<String>, StoreError> {
        let mut favorites = self.list_favorites();
        favorites.push(description.to_string());
        let blob = serde_json::to_string(&favorites)?;
        self.store.put(FAVORITES_KEY, &blob)?;
        Ok(favorites)
    }

    pub fn list_favorites(&self) -> Vec<String> {
        let Some(blob) = self.read_blob(FAVORITES_KEY) else {
            return Vec::new();
        };
        serde_json::from_str(&blob).unwrap_or_else(|err| {
            warn!("ignoring unparseable {FAVORITES_KEY} blob: {err}");
            Vec::new()
        })
    }

    fn read_blob(&self, key: &str) -> Option<String> {
        self.store.get(key).unwrap_or_else(|err| {
            warn!("failed to read {key}: {err}");
            None
        })
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::models::MealPeriod;
    use crate::store::Store;

    fn preferences() -> Preferences<Store> {
        Preferences::new(Store::open_in_memory().expect("open store"))
    }

    #[test]
    fn dining_prefs_round_trip() {
        let prefs = preferences();
        let saved = DiningPrefs {
            location: "hallB".to_string(),
            meal: "lunch".to_string(),
            diet: "vegan".to_string(),
        };
        prefs.save_dining(&saved).expect("save");
        assert_eq!(prefs.load_dining(), Some(saved));
    }

    #[test]
    fn nothing_saved_loads_as_none() {
        assert_eq!(preferences().load_dining(), None);
    }

    #[test]
    fn save_overwrites() {
        let prefs = preferences();
        prefs.save_dining(&DiningPrefs::default()).expect("save");
        let cafe = DiningPrefs {
            location: "cafe".to_string(),
            ..DiningPrefs::default()
        };
        prefs.save_dining(&cafe).expect("save");
        assert_eq!(prefs.load_dining(), Some(cafe));
    }

    #[test]
    fn corrupt_blob_is_treated_as_absent() {
        let store = Store::open_in_memory().expect("open store");
        store.put(DINING_PREFS_KEY, "{not json").expect("put");
        store.put(FAVORITES_KEY, r#"{"oops":true}"#).expect("put");
        let prefs = Preferences::new(store);
        assert_eq!(prefs.load_dining(), None);
        assert!(prefs.list_favorites().is_empty());
        assert_eq!(
            prefs.append_favorite("Menu: Muffin").expect("append"),
            vec!["Menu: Muffin".to_string()]
        );
    }

    #[test]
    fn absent_fields_take_defaults() {
        let store = Store::open_in_memory().expect("open store");
        store.put(DINING_PREFS_KEY, r#"{"diet":"halal"}"#).expect("put");
        let loaded = Preferences::new(store).load_dining().expect("prefs");
        assert_eq!(
            loaded,
            DiningPrefs {
                location: "hallA".to_string(),
                meal: "now".to_string(),
                diet: "halal".to_string(),
            }
        );
    }

    #[test]
    fn favorites_start_empty_and_keep_insertion_order() {
        let prefs = preferences();
        assert!(prefs.list_favorites().is_empty());
        prefs.append_favorite("Menu: Oatmeal").expect("append");
        assert_eq!(prefs.list_favorites(), vec!["Menu: Oatmeal".to_string()]);

        prefs.append_favorite("Event: Movie Night").expect("append");
        prefs.append_favorite("Menu: Oatmeal").expect("append");
        assert_eq!(
            prefs.list_favorites(),
            vec![
                "Menu: Oatmeal".to_string(),
                "Event: Movie Night".to_string(),
                "Menu: Oatmeal".to_string(),
            ]
        );
    }

    #[test]
    fn prefs_convert_to_selection_leniently() {
        let prefs = DiningPrefs {
            location: "cafe".to_string(),
            meal: "dinner".to_string(),
            diet: "kosher".to_string(),
        };
        let selection = prefs.to_selection();
        assert_eq!(selection.location, Some(DiningLocation::Cafe));
        assert_eq!(selection.meal, MealSelector::Period(MealPeriod::Dinner));
        assert_eq!(selection.diet, Some(DietaryTag::Kosher));

        let stale = DiningPrefs {
            location: "hallZ".to_string(),
            meal: "brunch".to_string(),
            diet: "paleo".to_string(),
        };
        assert_eq!(stale.to_selection(), DiningSelection::default());
        assert_eq!(DiningPrefs::from(&selection), prefs);
    }

    #[test]
    fn all_locations_survive_a_save_and_reload() {
        let prefs = preferences();
        let selection = DiningSelection {
            location: None,
            meal: MealSelector::Period(MealPeriod::Lunch),
            diet: None,
        };
        prefs
            .save_dining(&DiningPrefs::from(&selection))
            .expect("save");
        let loaded = prefs.load_dining().expect("prefs");
        assert_eq!(loaded.summary(), "all locations, lunch, any");
        assert_eq!(loaded.to_selection(), selection);
    }

    #[test]
    fn summary_shows_any_for_empty_diet() {
        assert_eq!(DiningPrefs::default().summary(), "hallA, now, any");
    }
}
