use std::{fmt, str::FromStr};

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::models::{MealPeriod, UnknownValue};

const NOW: &str = "now";

/// Last hour (exclusive) that still counts as breakfast.
const BREAKFAST_UNTIL: u32 = 11;
/// Last hour (exclusive) that still counts as lunch.
const LUNCH_UNTIL: u32 = 16;

/// Meal selection as chosen by the user: a concrete period, or "now".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MealSelector {
    #[default]
    Now,
    Period(MealPeriod),
}

impl MealSelector {
    pub fn as_str(&self) -> &'static str {
        match self {
            MealSelector::Now => NOW,
            MealSelector::Period(period) => period.as_str(),
        }
    }

    pub fn resolve(self, hour: u32) -> MealPeriod {
        resolve(self, hour)
    }
}

/// Maps a selector to a concrete meal period for the given wall-clock hour.
pub fn resolve(selector: MealSelector, hour: u32) -> MealPeriod {
    match selector {
        MealSelector::Period(period) => period,
        MealSelector::Now if hour < BREAKFAST_UNTIL => MealPeriod::Breakfast,
        MealSelector::Now if hour < LUNCH_UNTIL => MealPeriod::Lunch,
        MealSelector::Now => MealPeriod::Dinner,
    }
}

impl fmt::Display for MealSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MealSelector {
    type Err = UnknownValue;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value == NOW {
            return Ok(MealSelector::Now);
        }
        value
            .parse::<MealPeriod>()
            .map(MealSelector::Period)
            .map_err(|_| UnknownValue {
                kind: "meal",
                value: value.to_string(),
            })
    }
}

impl From<MealPeriod> for MealSelector {
    fn from(period: MealPeriod) -> Self {
        MealSelector::Period(period)
    }
}

impl Serialize for MealSelector {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for MealSelector {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(MealSelector::Now);
        }
        trimmed.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_resolves_by_hour() {
        assert_eq!(resolve(MealSelector::Now, 9), MealPeriod::Breakfast);
        assert_eq!(resolve(MealSelector::Now, 13), MealPeriod::Lunch);
        assert_eq!(resolve(MealSelector::Now, 19), MealPeriod::Dinner);
    }

    #[test]
    fn window_edges() {
        assert_eq!(resolve(MealSelector::Now, 0), MealPeriod::Breakfast);
        assert_eq!(resolve(MealSelector::Now, 10), MealPeriod::Breakfast);
        assert_eq!(resolve(MealSelector::Now, 11), MealPeriod::Lunch);
        assert_eq!(resolve(MealSelector::Now, 15), MealPeriod::Lunch);
        assert_eq!(resolve(MealSelector::Now, 16), MealPeriod::Dinner);
        assert_eq!(resolve(MealSelector::Now, 23), MealPeriod::Dinner);
    }

    #[test]
    fn concrete_period_passes_through() {
        for hour in 0..24 {
            assert_eq!(
                resolve(MealSelector::Period(MealPeriod::Dinner), hour),
                MealPeriod::Dinner
            );
        }
        let once = resolve(MealSelector::Now, 12);
        assert_eq!(resolve(once.into(), 20), once);
    }

    #[test]
    fn parses_wire_values() {
        assert_eq!("now".parse::<MealSelector>(), Ok(MealSelector::Now));
        assert_eq!(
            "lunch".parse::<MealSelector>(),
            Ok(MealSelector::Period(MealPeriod::Lunch))
        );
        assert!("brunch".parse::<MealSelector>().is_err());
    }
}
