use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, NaiveDate, Timelike, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::catalog;
use crate::enrichment::{EnrichmentCache, EnrichmentSource};
use crate::error::AppError;
use crate::models::{
    Announcement, DiningItem, DiningLocation, EnrichedItem, Event, Forecast, Hours, MealPeriod,
};
use crate::pipeline::{self, DiningSelection, EventSelection, Listing};
use crate::preferences::{favorite_for_event, favorite_for_menu, DiningPrefs, Preferences};
use crate::store::Store;
use crate::weather::WeatherSource;

const HOME_PREVIEW_LEN: usize = 3;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Tz>;

    fn hour(&self) -> u32 {
        self.now().hour()
    }

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Wall clock in the campus time zone.
pub struct SystemClock {
    tz: Tz,
}

impl SystemClock {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Tz> {
        Utc::now().with_timezone(&self.tz)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

/// One browser talking to the server. Dining renders are ordered per client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(pub u64);

/// Orders render passes: only the most recently started pass may commit.
#[derive(Debug, Default)]
pub struct RenderGeneration(AtomicU64);

impl RenderGeneration {
    pub fn begin(&self) -> Ticket {
        Ticket(self.0.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.0.load(Ordering::SeqCst) == ticket.0
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    ApplyEventFilters(EventSelection),
    PreviewEvent(u32),
    Rsvp(u32),
    SaveEvent(u32),
    ApplyDiningFilters(DiningSelection),
    ClearDiningFilters,
    SaveDiningPrefs(DiningSelection),
    SaveMenuItem(String),
}

/// Buttons on an event card, keyed by their action identifier.
const EVENT_ACTIONS: [(&str, fn(u32) -> Action); 3] = [
    ("preview", Action::PreviewEvent),
    ("rsvp", Action::Rsvp),
    ("save", Action::SaveEvent),
];

impl Action {
    pub fn for_event(identifier: &str, event_id: u32) -> Option<Action> {
        EVENT_ACTIONS
            .iter()
            .find(|(name, _)| *name == identifier)
            .map(|(_, build)| build(event_id))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MenuView {
    pub selection: DiningSelection,
    pub location: Option<DiningLocation>,
    pub meal: MealPeriod,
    /// Absent when the menu spans every location.
    pub hours: Option<Hours>,
    pub open_now: Option<bool>,
    pub items: Listing<EnrichedItem>,
    pub saved: Option<DiningPrefs>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HomeView {
    pub announcements: Vec<Announcement>,
    pub upcoming: Vec<Event>,
    pub favorites: Vec<String>,
    pub weather: Option<Forecast>,
}

#[derive(Debug)]
pub enum Outcome {
    Events {
        selection: EventSelection,
        listing: Listing<Event>,
    },
    EventPreview(Event),
    Rsvp(Event),
    Menu(MenuView),
    PrefsSaved(DiningPrefs),
    FavoriteSaved {
        description: String,
        favorites: Vec<String>,
    },
    /// The same client started a newer dining render while this one was
    /// waiting on enrichment.
    Superseded,
}

/// Everything one page session needs: immutable master lists plus the
/// enrichment memo, preference store and clock.
pub struct Session {
    events: Vec<Event>,
    dining: Vec<DiningItem>,
    enrichment: EnrichmentCache,
    weather: Arc<dyn WeatherSource>,
    preferences: Arc<Preferences<Store>>,
    clock: Arc<dyn Clock>,
    next_client: AtomicU64,
    generations: Mutex<HashMap<ClientId, Arc<RenderGeneration>>>,
}

impl Session {
    pub fn new(
        preferences: Preferences<Store>,
        enrichment: Arc<dyn EnrichmentSource>,
        weather: Arc<dyn WeatherSource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let events = catalog::generate_events(clock.today());
        let dining = catalog::dining_items();
        info!(
            events = events.len(),
            menu_items = dining.len(),
            "session initialized"
        );
        Self {
            events,
            dining,
            enrichment: EnrichmentCache::new(enrichment),
            weather,
            preferences: Arc::new(preferences),
            clock,
            next_client: AtomicU64::new(0),
            generations: Mutex::new(HashMap::new()),
        }
    }

    pub fn new_client(&self) -> ClientId {
        ClientId(self.next_client.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn event(&self, id: u32) -> Result<&Event, AppError> {
        self.events
            .iter()
            .find(|event| event.id == id)
            .ok_or_else(|| AppError::NotFound(format!("event {id}")))
    }

    /// Dispatches without a client; dining renders are never superseded.
    pub async fn dispatch(&self, action: Action) -> Result<Outcome, AppError> {
        self.dispatch_for(None, action).await
    }

    pub async fn dispatch_for(
        &self,
        client: Option<ClientId>,
        action: Action,
    ) -> Result<Outcome, AppError> {
        debug!(?client, ?action, "dispatch");
        match action {
            Action::ApplyEventFilters(selection) => {
                let listing = pipeline::run_events(&self.events, &selection);
                Ok(Outcome::Events { selection, listing })
            }
            Action::PreviewEvent(id) => Ok(Outcome::EventPreview(self.event(id)?.clone())),
            Action::Rsvp(id) => Ok(Outcome::Rsvp(self.event(id)?.clone())),
            Action::SaveEvent(id) => {
                let description = favorite_for_event(&self.event(id)?.title);
                self.save_favorite(description).await
            }
            Action::ApplyDiningFilters(selection) => self.menu(client, selection).await,
            Action::ClearDiningFilters => self.menu(client, DiningSelection::default()).await,
            Action::SaveDiningPrefs(selection) => {
                let prefs = DiningPrefs::from(&selection);
                let store = Arc::clone(&self.preferences);
                let to_save = prefs.clone();
                tokio::task::spawn_blocking(move || store.save_dining(&to_save)).await??;
                info!(prefs = %prefs.summary(), "dining preferences saved");
                Ok(Outcome::PrefsSaved(prefs))
            }
            Action::SaveMenuItem(name) => {
                let name = name.trim();
                if name.is_empty() {
                    return Err(AppError::BadRequest("menu item name is required".into()));
                }
                self.save_favorite(favorite_for_menu(name)).await
            }
        }
    }

    /// Selection to show when the dining page opens: the saved one, if any.
    pub async fn initial_dining_selection(&self) -> Result<DiningSelection, AppError> {
        Ok(self
            .saved_prefs()
            .await?
            .map(|prefs| prefs.to_selection())
            .unwrap_or_default())
    }

    pub async fn favorites(&self) -> Result<Vec<String>, AppError> {
        let store = Arc::clone(&self.preferences);
        Ok(tokio::task::spawn_blocking(move || store.list_favorites()).await?)
    }

    pub async fn home(&self) -> Result<HomeView, AppError> {
        let weather = match self.weather.current().await {
            Ok(forecast) => Some(forecast),
            Err(err) => {
                warn!("weather unavailable: {err}");
                None
            }
        };
        Ok(HomeView {
            announcements: catalog::announcements(),
            upcoming: self.events.iter().take(HOME_PREVIEW_LEN).cloned().collect(),
            favorites: self.favorites().await?,
            weather,
        })
    }

    async fn saved_prefs(&self) -> Result<Option<DiningPrefs>, AppError> {
        let store = Arc::clone(&self.preferences);
        Ok(tokio::task::spawn_blocking(move || store.load_dining()).await?)
    }

    async fn save_favorite(&self, description: String) -> Result<Outcome, AppError> {
        let store = Arc::clone(&self.preferences);
        let to_append = description.clone();
        let favorites =
            tokio::task::spawn_blocking(move || store.append_favorite(&to_append)).await??;
        info!(favorite = %description, "saved to favorites");
        Ok(Outcome::FavoriteSaved {
            description,
            favorites,
        })
    }

    fn generation_for(&self, client: ClientId) -> Arc<RenderGeneration> {
        let mut guard = self.generations.lock().expect("render generations poisoned");
        Arc::clone(guard.entry(client).or_default())
    }

    async fn menu(
        &self,
        client: Option<ClientId>,
        selection: DiningSelection,
    ) -> Result<Outcome, AppError> {
        let pass = client.map(|client| {
            let generation = self.generation_for(client);
            let ticket = generation.begin();
            (generation, ticket)
        });
        let hour = self.clock.hour();
        let (criteria, listing) = pipeline::run_dining(&self.dining, &selection, hour);
        let items = self.enrichment.enrich_all(listing.items()).await;

        if let Some((generation, ticket)) = &pass {
            if !generation.is_current(*ticket) {
                debug!(?client, ?ticket, "dining render superseded");
                return Ok(Outcome::Superseded);
            }
        }

        let hours = criteria.location.map(catalog::hours_for);
        Ok(Outcome::Menu(MenuView {
            location: criteria.location,
            meal: criteria.meal,
            hours,
            open_now: hours.map(|hours| hours.is_open(hour)),
            items: items.into(),
            saved: self.saved_prefs().await?,
            selection,
        }))
    }
}
