use chrono::{Days, NaiveDate};
use once_cell::sync::Lazy;

use crate::models::{
    Announcement, Category, CostTier, DietaryTag, DiningItem, DiningLocation, Event, Hours,
    MealPeriod,
};

const EVENT_TITLES: [&str; 5] = [
    "Movie Night",
    "Career Fair",
    "Intramural Volleyball Finals",
    "Art Showcase",
    "STEM Expo",
];

const EVENT_LOCATION: &str = "Student Center";

/// Builds the session's event list, one event per day starting at `today`.
pub fn generate_events(today: NaiveDate) -> Vec<Event> {
    EVENT_TITLES
        .iter()
        .enumerate()
        .map(|(i, title)| {
            let odd = i % 2 == 1;
            let hour = 17 + (i % 4) as u32;
            let minutes = if odd { "30" } else { "00" };
            let date = today
                .checked_add_days(Days::new(i as u64))
                .unwrap_or(today);
            Event {
                id: i as u32 + 1,
                title: title.to_string(),
                date,
                time: format!("{}:{minutes} {}", twelve_hour(hour), meridiem(hour)),
                location: EVENT_LOCATION.to_string(),
                category: if odd { Category::Academic } else { Category::Social },
                cost: if odd { CostTier::Free } else { CostTier::Paid },
                description: format!("Join us for {title}!"),
                popularity: Some(100 - 10 * i as i64),
            }
        })
        .collect()
}

fn twelve_hour(hour: u32) -> u32 {
    match hour {
        0 => 12,
        h if h > 12 => h - 12,
        h => h,
    }
}

fn meridiem(hour: u32) -> &'static str {
    if hour >= 12 {
        "PM"
    } else {
        "AM"
    }
}

static DINING_ITEMS: Lazy<Vec<DiningItem>> = Lazy::new(|| {
    use DietaryTag::*;
    use DiningLocation::*;
    use MealPeriod::*;

    let rows: [(&str, DiningLocation, MealPeriod, &[DietaryTag]); 32] = [
        ("Scrambled Eggs", HallA, Breakfast, &[GlutenFree]),
        ("Bacon", HallA, Breakfast, &[GlutenFree]),
        ("Hash Browns", HallA, Breakfast, &[]),
        ("Whole Wheat Toast", HallA, Breakfast, &[Vegetarian]),
        ("Grilled Chicken Sandwich", HallA, Lunch, &[]),
        ("French Fries", HallA, Lunch, &[Vegetarian]),
        ("Caesar Salad", HallA, Lunch, &[]),
        ("Baked Salmon", HallA, Dinner, &[GlutenFree]),
        ("Roasted Vegetables", HallA, Dinner, &[Vegan, GlutenFree]),
        ("Mashed Potatoes", HallA, Dinner, &[Vegetarian, GlutenFree]),
        ("Oatmeal Bar", HallB, Breakfast, &[Vegetarian, GlutenFree]),
        ("Greek Yogurt Parfait", HallB, Breakfast, &[Vegetarian, GlutenFree]),
        ("Fresh Fruit", HallB, Breakfast, &[Vegan, GlutenFree]),
        ("Quinoa Bowl", HallB, Lunch, &[Vegan, GlutenFree]),
        ("Veggie Wrap", HallB, Lunch, &[Vegan]),
        ("Lentil Soup", HallB, Lunch, &[Vegan, GlutenFree]),
        ("Tofu Stir Fry", HallB, Dinner, &[Vegan, GlutenFree]),
        ("Brown Rice", HallB, Dinner, &[Vegan, GlutenFree]),
        ("Steamed Broccoli", HallB, Dinner, &[Vegan, GlutenFree]),
        ("Avocado Toast", Cafe, Breakfast, &[Vegetarian]),
        ("Breakfast Burrito", Cafe, Breakfast, &[]),
        ("Muffin", Cafe, Breakfast, &[Vegetarian]),
        ("Turkey Panini", Cafe, Lunch, &[]),
        ("Tomato Basil Soup", Cafe, Lunch, &[Vegetarian, GlutenFree]),
        ("Caesar Wrap", Cafe, Lunch, &[]),
        ("Pizza Slice (Cheese)", Cafe, Dinner, &[Vegetarian]),
        ("Pizza Slice (Pepperoni)", Cafe, Dinner, &[]),
        ("Pasta Alfredo", Cafe, Dinner, &[Vegetarian]),
        ("Side Salad", Cafe, Dinner, &[Vegan, GlutenFree]),
        ("Halal Beef Gyro", HallA, Lunch, &[Halal]),
        ("Kosher Salmon", HallB, Dinner, &[Kosher, GlutenFree]),
        ("Gluten-Free Pancakes", HallB, Breakfast, &[GlutenFree, Vegetarian]),
    ];

    rows.into_iter()
        .map(|(name, location, meal, tags)| DiningItem {
            name: name.to_string(),
            location,
            meal,
            tags: tags.to_vec(),
        })
        .collect()
});

pub fn dining_items() -> Vec<DiningItem> {
    DINING_ITEMS.clone()
}

pub fn hours_for(location: DiningLocation) -> Hours {
    match location {
        DiningLocation::HallA => Hours { open: 7, close: 20 },
        DiningLocation::HallB => Hours { open: 8, close: 21 },
        DiningLocation::Cafe => Hours { open: 7, close: 18 },
    }
}

pub fn announcements() -> Vec<Announcement> {
    vec![
        Announcement {
            title: "Campus Safety Drill".to_string(),
            body: "Practice scheduled for Monday at 10 AM.".to_string(),
        },
        Announcement {
            title: "Library Renovation".to_string(),
            body: "New study pods opening this week!".to_string(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn generated_events_follow_daily_schedule() {
        let today = NaiveDate::from_ymd_opt(2024, 3, 4).expect("valid date");
        let events = generate_events(today);
        assert_eq!(events.len(), 5);

        let first = &events[0];
        assert_eq!(first.id, 1);
        assert_eq!(first.date, today);
        assert_eq!(first.time, "5:00 PM");
        assert_eq!(first.category, Category::Social);
        assert_eq!(first.cost, CostTier::Paid);
        assert_eq!(first.popularity, Some(100));
        assert_eq!(first.description, "Join us for Movie Night!");

        let second = &events[1];
        assert_eq!(second.date, NaiveDate::from_ymd_opt(2024, 3, 5).expect("valid date"));
        assert_eq!(second.time, "6:30 PM");
        assert_eq!(second.category, Category::Academic);
        assert_eq!(second.cost, CostTier::Free);

        let last = &events[4];
        assert_eq!(last.time, "5:00 PM");
        assert_eq!(last.popularity, Some(60));
    }

    #[test]
    fn event_ids_are_unique() {
        let today = NaiveDate::from_ymd_opt(2024, 12, 30).expect("valid date");
        let events = generate_events(today);
        let ids: HashSet<u32> = events.iter().map(|e| e.id).collect();
        assert_eq!(ids.len(), events.len());
    }

    #[test]
    fn menu_names_are_unique_within_the_list() {
        let items = dining_items();
        assert_eq!(items.len(), 32);
        let names: HashSet<&str> = items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names.len(), items.len());
    }
}
