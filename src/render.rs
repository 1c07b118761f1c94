//! HTML for the three pages. Every data string goes through `escape_html`.

use crate::config::Page;
use crate::models::{Category, CostTier, DietaryTag, DiningLocation, Event, MealPeriod};
use crate::pipeline::{EventSelection, Listing, MealSelector, SortKey};
use crate::session::{HomeView, MenuView};
use crate::utils::escape_html as esc;

pub const NO_EVENTS: &str = "No events match your filters.";
pub const NO_MENU_ITEMS: &str = "No menu items match your filters.";
pub const NO_FAVORITES: &str = "No favorites yet. Save events or menu items to see them here.";
pub const WEATHER_UNAVAILABLE: &str = "Weather unavailable.";

fn layout(title: &str, pages: &[Page], body: &str) -> String {
    let nav = pages
        .iter()
        .map(|page| match page {
            Page::Home => r#"<a href="/">Home</a>"#,
            Page::Events => r#"<a href="/events">Events</a>"#,
            Page::Dining => r#"<a href="/dining">Dining</a>"#,
        })
        .collect::<Vec<_>>()
        .join(" | ");
    format!(
        "<!doctype html>\n<html lang=\"en\">\n<head><meta charset=\"utf-8\"><title>{} · Campus Life</title></head>\n<body>\n<nav>{nav}</nav>\n<main>\n{body}\n</main>\n</body>\n</html>\n",
        esc(title)
    )
}

fn notice_html(notice: Option<&str>) -> String {
    notice
        .map(|text| format!("<p class=\"notice\" role=\"status\">{}</p>\n", esc(text)))
        .unwrap_or_default()
}

fn options<T: Copy + PartialEq>(
    values: &[T],
    selected: Option<T>,
    label: impl Fn(T) -> &'static str,
) -> String {
    values
        .iter()
        .map(|value| {
            let mark = if selected == Some(*value) {
                " selected"
            } else {
                ""
            };
            let wire = label(*value);
            format!("<option value=\"{wire}\"{mark}>{wire}</option>")
        })
        .collect()
}

fn any_option(selected: bool, text: &str) -> String {
    let mark = if selected { " selected" } else { "" };
    format!("<option value=\"\"{mark}>{text}</option>")
}

pub fn home_page(view: &HomeView, pages: &[Page], notice: Option<&str>) -> String {
    let mut body = String::from("<h1>Campus Life</h1>\n");
    body.push_str(&notice_html(notice));

    body.push_str("<section id=\"announcements\"><h2>Announcements</h2>\n");
    for announcement in &view.announcements {
        body.push_str(&format!(
            "<div><strong>{}</strong><p>{}</p></div>\n",
            esc(&announcement.title),
            esc(&announcement.body)
        ));
    }
    body.push_str("</section>\n");

    body.push_str("<section id=\"weatherBlock\"><h2>Weather</h2>\n");
    match &view.weather {
        Some(forecast) => body.push_str(&format!(
            "<div>{}</div><div>{}</div><div>{}&deg;{}</div>\n",
            esc(&forecast.name),
            esc(&forecast.short_forecast),
            forecast.temperature,
            esc(&forecast.temperature_unit)
        )),
        None => body.push_str(&format!("<p>{WEATHER_UNAVAILABLE}</p>\n")),
    }
    body.push_str("</section>\n");

    if pages.contains(&Page::Events) {
        body.push_str("<section id=\"eventsPreview\"><h2>Upcoming Events</h2>\n");
        for event in &view.upcoming {
            body.push_str(&format!(
                "<div><strong>{}</strong> <span>{} • {} • {}</span> {}</div>\n",
                esc(&event.title),
                event.date_label(),
                esc(&event.time),
                esc(&event.location),
                action_button(event.id, "save", "Save")
            ));
        }
        body.push_str("</section>\n");
    }

    body.push_str("<section id=\"favoritesList\"><h2>Favorites</h2>\n");
    if view.favorites.is_empty() {
        body.push_str(&format!("<p>{NO_FAVORITES}</p>\n"));
    } else {
        body.push_str("<ul>\n");
        for favorite in &view.favorites {
            body.push_str(&format!("<li>{}</li>\n", esc(favorite)));
        }
        body.push_str("</ul>\n");
    }
    body.push_str("</section>");

    layout("Home", pages, &body)
}

fn action_button(event_id: u32, action: &str, label: &str) -> String {
    format!(
        "<form method=\"post\" action=\"/events/{event_id}/{action}\" style=\"display:inline\"><button data-action=\"{action}\">{label}</button></form>"
    )
}

fn event_filter_form(selection: &EventSelection) -> String {
    let date = selection
        .date
        .map(|date| date.to_string())
        .unwrap_or_default();
    let search = selection.search.as_deref().unwrap_or_default();
    let sort_option = |key: SortKey, label: &str| {
        let mark = if selection.sort == key { " selected" } else { "" };
        format!("<option value=\"{}\"{mark}>{label}</option>", key.as_str())
    };
    format!(
        "<form method=\"get\" action=\"/events\">\n\
         <input type=\"date\" name=\"date\" value=\"{date}\">\n\
         <select name=\"category\">{}{}</select>\n\
         <select name=\"cost\">{}{}</select>\n\
         <input type=\"search\" name=\"search\" value=\"{}\">\n\
         <select name=\"sort\">{}{}</select>\n\
         <button>Apply</button>\n</form>\n",
        any_option(selection.category.is_none(), "All categories"),
        options(Category::ALL, selection.category, |c| c.as_str()),
        any_option(selection.cost.is_none(), "Any cost"),
        options(CostTier::ALL, selection.cost, |c| c.as_str()),
        esc(search),
        sort_option(SortKey::Date, "Date"),
        sort_option(SortKey::Popularity, "Popularity"),
    )
}

fn event_card(event: &Event) -> String {
    format!(
        "<article class=\"card\">\n<h3>{}</h3>\n<p>{} • {}</p>\n<p>{} • {} • {}</p>\n<div>{} {} {}</div>\n</article>\n",
        esc(&event.title),
        event.date_label(),
        esc(&event.time),
        esc(&event.location),
        event.category,
        event.cost,
        action_button(event.id, "preview", "Details"),
        action_button(event.id, "rsvp", "RSVP"),
        action_button(event.id, "save", "Save"),
    )
}

pub fn event_preview(event: &Event) -> String {
    format!(
        "<section id=\"eventPreview\">\n<h3>{}</h3>\n<p>{} • {} • {}</p>\n<p>{}</p>\n</section>\n",
        esc(&event.title),
        event.date_label(),
        esc(&event.time),
        esc(&event.location),
        esc(&event.description)
    )
}

pub fn events_page(
    selection: &EventSelection,
    listing: &Listing<Event>,
    preview: Option<&Event>,
    pages: &[Page],
    notice: Option<&str>,
) -> String {
    let mut body = String::from("<h1>Events</h1>\n");
    body.push_str(&notice_html(notice));
    body.push_str(&event_filter_form(selection));
    body.push_str("<section id=\"eventsList\">\n");
    match listing {
        Listing::Empty => body.push_str(&format!("<p>{NO_EVENTS}</p>\n")),
        Listing::Items(events) => {
            for event in events {
                body.push_str(&event_card(event));
            }
        }
    }
    body.push_str("</section>\n");
    if let Some(event) = preview {
        body.push_str(&event_preview(event));
    }
    layout("Events", pages, &body)
}

fn dining_filter_form(view: &MenuView) -> String {
    let selection = &view.selection;
    let meal_options = std::iter::once(MealSelector::Now)
        .chain(MealPeriod::ALL.iter().copied().map(MealSelector::Period))
        .map(|meal| {
            let mark = if selection.meal == meal { " selected" } else { "" };
            format!("<option value=\"{meal}\"{mark}>{meal}</option>")
        })
        .collect::<String>();
    let fields = format!(
        "<select name=\"location\">{}{}</select>\n\
         <select name=\"meal\">{meal_options}</select>\n\
         <select name=\"diet\">{}{}</select>\n",
        any_option(selection.location.is_none(), "All locations"),
        options(DiningLocation::ALL, selection.location, |l| l.as_str()),
        any_option(selection.diet.is_none(), "Any diet"),
        options(DietaryTag::ALL, selection.diet, |d| d.as_str()),
    );
    format!(
        "<form method=\"get\" action=\"/dining\">\n{fields}<button>Apply</button>\n</form>\n\
         <form method=\"post\" action=\"/dining/clear\"><button>Clear</button></form>\n\
         <form method=\"post\" action=\"/dining/prefs\">\n{fields}<button>Save preferences</button>\n</form>\n"
    )
}

pub fn dining_page(view: &MenuView, pages: &[Page], notice: Option<&str>) -> String {
    let mut body = String::from("<h1>Dining</h1>\n");
    body.push_str(&notice_html(notice));
    body.push_str(&dining_filter_form(view));

    if let Some(saved) = &view.saved {
        body.push_str(&format!(
            "<p id=\"savedPrefs\">Saved: {}</p>\n",
            esc(&saved.summary())
        ));
    }

    if let (Some(hours), Some(open_now)) = (view.hours, view.open_now) {
        let (status_class, status) = if open_now {
            ("text-success", "Open Now")
        } else {
            ("text-danger", "Closed Now")
        };
        body.push_str(&format!(
            "<section id=\"hoursStatus\"><p>Today: {}:00 – {}:00</p><p class=\"{status_class}\">{status}</p></section>\n",
            hours.open, hours.close
        ));
    }

    let selection = &view.selection;
    let current_filters = format!(
        "<input type=\"hidden\" name=\"location\" value=\"{}\">\
         <input type=\"hidden\" name=\"meal\" value=\"{}\">\
         <input type=\"hidden\" name=\"diet\" value=\"{}\">",
        selection.location.map(|l| l.as_str()).unwrap_or_default(),
        selection.meal.as_str(),
        selection.diet.map(|d| d.as_str()).unwrap_or_default(),
    );

    body.push_str(&format!(
        "<section id=\"menuList\" data-meal=\"{}\">\n",
        view.meal
    ));
    match &view.items {
        Listing::Empty => body.push_str(&format!("<p>{NO_MENU_ITEMS}</p>\n")),
        Listing::Items(items) => {
            for entry in items {
                let item = &entry.item;
                let info = &entry.enrichment;
                let diets = item.tag_list();
                body.push_str(&format!(
                    "<article class=\"card\">\n<h3>{}</h3>\n<div>NutriScore: {} • {} kcal/100g</div>\n<div>{}</div>\n<div>Location: {} • Meal: {} • Diets: {}</div>\n\
                     <form method=\"post\" action=\"/dining/favorite\"><input type=\"hidden\" name=\"name\" value=\"{}\">{current_filters}<button aria-label=\"Save {}\">♥</button></form>\n</article>\n",
                    esc(&item.name),
                    esc(&info.grade),
                    info.calories,
                    esc(&info.labels),
                    item.location,
                    item.meal,
                    if diets.is_empty() { "—".to_string() } else { diets },
                    esc(&item.name),
                    esc(&item.name),
                ));
            }
        }
    }
    body.push_str("</section>");

    layout("Dining", pages, &body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;
    use crate::models::{Calories, EnrichedItem, Enrichment, Forecast, Hours};
    use crate::pipeline::DiningSelection;
    use crate::preferences::DiningPrefs;

    const ALL_PAGES: [Page; 3] = [Page::Home, Page::Events, Page::Dining];

    fn menu_view(items: Listing<EnrichedItem>) -> MenuView {
        MenuView {
            selection: DiningSelection::default(),
            location: Some(DiningLocation::HallA),
            meal: MealPeriod::Lunch,
            hours: Some(Hours { open: 7, close: 20 }),
            open_now: Some(true),
            items,
            saved: None,
        }
    }

    #[test]
    fn empty_event_listing_shows_message() {
        let html = events_page(
            &EventSelection::default(),
            &Listing::Empty,
            None,
            &ALL_PAGES,
            None,
        );
        assert!(html.contains(NO_EVENTS));
    }

    #[test]
    fn event_cards_carry_action_identifiers() {
        let events = catalog::generate_events("2024-09-02".parse().expect("iso date"));
        let html = events_page(
            &EventSelection::default(),
            &Listing::from(events.clone()),
            Some(&events[1]),
            &ALL_PAGES,
            Some("Saved to favorites: Movie Night"),
        );
        assert!(html.contains("/events/1/preview"));
        assert!(html.contains("/events/5/rsvp"));
        assert!(html.contains("data-action=\"save\""));
        assert!(html.contains("Join us for Career Fair!"));
        assert!(html.contains("Saved to favorites: Movie Night"));
    }

    #[test]
    fn menu_cards_show_escaped_enrichment() {
        let mut item = catalog::dining_items()[4].clone();
        item.name = "Mac & Cheese".to_string();
        let entry = EnrichedItem {
            item,
            enrichment: Enrichment {
                grade: "B".to_string(),
                calories: Calories::Known(164.0),
                labels: "General".to_string(),
            },
        };
        let html = dining_page(&menu_view(Listing::from(vec![entry])), &ALL_PAGES, None);
        assert!(html.contains("<h3>Mac &amp; Cheese</h3>"));
        assert!(html.contains("NutriScore: B • 164 kcal/100g"));
        assert!(html.contains("Diets: —"));
        assert!(html.contains("Open Now"));
    }

    #[test]
    fn empty_menu_and_saved_prefs() {
        let mut view = menu_view(Listing::Empty);
        view.saved = Some(DiningPrefs::default());
        view.open_now = Some(false);
        let html = dining_page(&view, &ALL_PAGES, None);
        assert!(html.contains(NO_MENU_ITEMS));
        assert!(html.contains("Saved: hallA, now, any"));
        assert!(html.contains("Closed Now"));
        assert!(html.contains("<option value=\"now\" selected>now</option>"));
    }

    #[test]
    fn home_shows_weather_or_placeholder() {
        let mut view = HomeView {
            announcements: catalog::announcements(),
            upcoming: Vec::new(),
            favorites: Vec::new(),
            weather: None,
        };
        let html = home_page(&view, &ALL_PAGES, None);
        assert!(html.contains(WEATHER_UNAVAILABLE));
        assert!(html.contains(NO_FAVORITES));

        view.weather = Some(Forecast {
            name: "Tonight".to_string(),
            short_forecast: "Clear".to_string(),
            temperature: 41,
            temperature_unit: "F".to_string(),
        });
        view.favorites = vec!["Menu: Oatmeal".to_string()];
        let html = home_page(&view, &[Page::Home], None);
        assert!(html.contains("41&deg;F"));
        assert!(html.contains("<li>Menu: Oatmeal</li>"));
        assert!(!html.contains("href=\"/dining\""));
    }

    #[test]
    fn all_locations_menu_omits_hours_and_keeps_filters_on_favorites() {
        let mut view = menu_view(Listing::from(vec![EnrichedItem {
            item: catalog::dining_items()[0].clone(),
            enrichment: Enrichment::fallback(),
        }]));
        view.selection = DiningSelection {
            location: None,
            meal: MealSelector::Period(MealPeriod::Breakfast),
            diet: Some(DietaryTag::GlutenFree),
        };
        view.location = None;
        view.hours = None;
        view.open_now = None;

        let html = dining_page(&view, &ALL_PAGES, None);
        assert!(!html.contains("hoursStatus"));
        assert!(!html.contains("Open Now"));
        assert!(html.contains(
            "<input type=\"hidden\" name=\"location\" value=\"\"><input type=\"hidden\" name=\"meal\" value=\"breakfast\"><input type=\"hidden\" name=\"diet\" value=\"gluten-free\">"
        ));
    }
}
