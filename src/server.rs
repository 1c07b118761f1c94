use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::{
        header::{COOKIE, SET_COOKIE},
        HeaderMap, HeaderValue, StatusCode, Uri,
    },
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::{AppConfig, Page};
use crate::error::AppError;
use crate::models::Event;
use crate::pipeline::{DiningSelection, EventSelection, Listing};
use crate::render;
use crate::session::{Action, ClientId, MenuView, Outcome, Session};

const CLIENT_COOKIE: &str = "campus_client";

pub struct AppState {
    pub session: Session,
    pub config: AppConfig,
}

type Shared = Arc<AppState>;

/// Registers routes only for the pages the config enables.
pub fn router(state: Shared) -> Router {
    let mut router = Router::new();

    if state.config.serves(Page::Home) {
        router = router.route("/", get(home));
    }
    if state.config.serves(Page::Events) {
        router = router
            .route("/events", get(events))
            .route("/events/:id", get(event_detail))
            .route("/events/:id/:action", post(event_action))
            .route("/api/events", get(api_events));
    }
    if state.config.serves(Page::Dining) {
        router = router
            .route("/dining", get(dining))
            .route("/dining/clear", post(dining_clear))
            .route("/dining/prefs", post(dining_prefs))
            .route("/dining/favorite", post(dining_favorite))
            .route("/api/dining", get(api_dining));
    }

    router
        .route("/api/favorites", get(api_favorites).post(api_add_favorite))
        .with_state(state)
}

fn unexpected(outcome: Outcome) -> AppError {
    AppError::Internal(format!("unexpected outcome: {outcome:?}"))
}

fn superseded() -> Response {
    (
        StatusCode::CONFLICT,
        "A newer dining request from this browser replaced this one.",
    )
        .into_response()
}

fn client_cookie(headers: &HeaderMap) -> Option<ClientId> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == CLIENT_COOKIE)
        .and_then(|(_, id)| id.parse().ok())
        .map(ClientId)
}

/// The caller's client id, plus a `Set-Cookie` value when one was just assigned.
fn identify(state: &AppState, headers: &HeaderMap) -> (ClientId, Option<HeaderValue>) {
    if let Some(client) = client_cookie(headers) {
        return (client, None);
    }
    let client = state.session.new_client();
    debug!(?client, "assigned client cookie");
    let cookie = HeaderValue::from_str(&format!(
        "{CLIENT_COOKIE}={}; Path=/; HttpOnly; SameSite=Lax",
        client.0
    ))
    .ok();
    (client, cookie)
}

fn with_cookie(mut response: Response, cookie: Option<HeaderValue>) -> Response {
    if let Some(cookie) = cookie {
        response.headers_mut().insert(SET_COOKIE, cookie);
    }
    response
}

async fn home(State(state): State<Shared>) -> Result<Html<String>, AppError> {
    let view = state.session.home().await?;
    Ok(Html(render::home_page(&view, &state.config.pages, None)))
}

async fn event_listing(
    state: &AppState,
    selection: EventSelection,
) -> Result<(EventSelection, Listing<Event>), AppError> {
    match state
        .session
        .dispatch(Action::ApplyEventFilters(selection))
        .await?
    {
        Outcome::Events { selection, listing } => Ok((selection, listing)),
        other => Err(unexpected(other)),
    }
}

async fn events_page_with(
    state: &AppState,
    preview: Option<&Event>,
    notice: Option<&str>,
) -> Result<Html<String>, AppError> {
    let (selection, listing) = event_listing(state, EventSelection::default()).await?;
    Ok(Html(render::events_page(
        &selection,
        &listing,
        preview,
        &state.config.pages,
        notice,
    )))
}

async fn events(
    State(state): State<Shared>,
    Query(selection): Query<EventSelection>,
) -> Result<Html<String>, AppError> {
    let (selection, listing) = event_listing(&state, selection).await?;
    Ok(Html(render::events_page(
        &selection,
        &listing,
        None,
        &state.config.pages,
        None,
    )))
}

async fn event_detail(
    State(state): State<Shared>,
    Path(id): Path<u32>,
) -> Result<Html<String>, AppError> {
    match state.session.dispatch(Action::PreviewEvent(id)).await? {
        Outcome::EventPreview(event) => events_page_with(&state, Some(&event), None).await,
        other => Err(unexpected(other)),
    }
}

async fn event_action(
    State(state): State<Shared>,
    Path((id, identifier)): Path<(u32, String)>,
) -> Result<Html<String>, AppError> {
    let action = Action::for_event(&identifier, id)
        .ok_or_else(|| AppError::BadRequest(format!("unknown action {identifier:?}")))?;
    match state.session.dispatch(action).await? {
        Outcome::EventPreview(event) => events_page_with(&state, Some(&event), None).await,
        Outcome::Rsvp(event) => {
            let notice = format!("RSVP for {}", event.title);
            events_page_with(&state, None, Some(&notice)).await
        }
        Outcome::FavoriteSaved { description, .. } => {
            let notice = format!("Saved to favorites: {description}");
            events_page_with(&state, None, Some(&notice)).await
        }
        other => Err(unexpected(other)),
    }
}

/// Runs a dining render action on behalf of the calling browser.
async fn menu_page(
    state: &AppState,
    headers: &HeaderMap,
    action: Action,
    notice: Option<&str>,
) -> Result<Response, AppError> {
    let (client, cookie) = identify(state, headers);
    let response = match state.session.dispatch_for(Some(client), action).await?
    {
        Outcome::Menu(view) => {
            Html(render::dining_page(&view, &state.config.pages, notice)).into_response()
        }
        Outcome::Superseded => superseded(),
        other => return Err(unexpected(other)),
    };
    Ok(with_cookie(response, cookie))
}

/// Reads the dining selection from the query string. A bare `/dining`
/// restores the saved preferences.
async fn dining_selection(state: &AppState, uri: &Uri) -> Result<DiningSelection, AppError> {
    match uri.query() {
        None => state.session.initial_dining_selection().await,
        Some(_) => Query::<DiningSelection>::try_from_uri(uri)
            .map(|Query(selection)| selection)
            .map_err(|rejection| AppError::BadRequest(rejection.body_text())),
    }
}

async fn dining(
    State(state): State<Shared>,
    headers: HeaderMap,
    uri: Uri,
) -> Result<Response, AppError> {
    let selection = dining_selection(&state, &uri).await?;
    menu_page(&state, &headers, Action::ApplyDiningFilters(selection), None).await
}

async fn dining_clear(
    State(state): State<Shared>,
    headers: HeaderMap,
) -> Result<Response, AppError> {
    menu_page(&state, &headers, Action::ClearDiningFilters, None).await
}

async fn dining_prefs(
    State(state): State<Shared>,
    headers: HeaderMap,
    Form(selection): Form<DiningSelection>,
) -> Result<Response, AppError> {
    match state
        .session
        .dispatch(Action::SaveDiningPrefs(selection.clone()))
        .await?
    {
        Outcome::PrefsSaved(prefs) => {
            info!(prefs = %prefs.summary(), "preferences saved from form");
            menu_page(&state, &headers, Action::ApplyDiningFilters(selection), None).await
        }
        other => Err(unexpected(other)),
    }
}

/// Heart button on a menu card; carries the filters the page was showing.
#[derive(Debug, Deserialize)]
struct MenuFavorite {
    name: String,
    #[serde(flatten)]
    selection: DiningSelection,
}

async fn dining_favorite(
    State(state): State<Shared>,
    headers: HeaderMap,
    Form(favorite): Form<MenuFavorite>,
) -> Result<Response, AppError> {
    let notice = match state
        .session
        .dispatch(Action::SaveMenuItem(favorite.name))
        .await?
    {
        Outcome::FavoriteSaved { description, .. } => {
            format!("Saved to favorites: {description}")
        }
        other => return Err(unexpected(other)),
    };
    menu_page(
        &state,
        &headers,
        Action::ApplyDiningFilters(favorite.selection),
        Some(&notice),
    ).await
}

async fn api_events(
    State(state): State<Shared>,
    Query(selection): Query<EventSelection>,
) -> Result<Json<Listing<Event>>, AppError> {
    let (_, listing) = event_listing(&state, selection).await?;
    Ok(Json(listing))
}

async fn api_dining(
    State(state): State<Shared>,
    headers: HeaderMap,
    uri: Uri,
) -> Result<Response, AppError> {
    let selection = dining_selection(&state, &uri).await?;
    let (client, cookie) = identify(&state, &headers);
    let response = match state
        .session
        .dispatch_for(Some(client), Action::ApplyDiningFilters(selection))
        .await?
    {
        Outcome::Menu(view) => Json::<MenuView>(view).into_response(),
        Outcome::Superseded => superseded(),
        other => return Err(unexpected(other)),
    };
    Ok(with_cookie(response, cookie))
}

async fn api_favorites(State(state): State<Shared>) -> Result<Json<Vec<String>>, AppError> {
    Ok(Json(state.session.favorites().await?))
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum NewFavorite {
    Event { id: u32 },
    Menu { name: String },
}

async fn api_add_favorite(
    State(state): State<Shared>,
    Json(favorite): Json<NewFavorite>,
) -> Result<Json<Vec<String>>, AppError> {
    let action = match favorite {
        NewFavorite::Event { id } => Action::SaveEvent(id),
        NewFavorite::Menu { name } => Action::SaveMenuItem(name),
    };
    match state.session.dispatch(action).await? {
        Outcome::FavoriteSaved { favorites, .. } => Ok(Json(favorites)),
        other => Err(unexpected(other)),
    }
}
