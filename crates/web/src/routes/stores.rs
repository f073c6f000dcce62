//! Store listing, detail and add/edit route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Multipart, Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use tracing::instrument;

use delicious_core::{Page, StoreId};

use crate::error::{AppError, NotFoundTemplate, Result};
use crate::filters;
use crate::middleware::{OptionalAuth, RequireAuth};
use crate::models::{Populate, Review, Store, StoreDetails, User};
use crate::routes::messages::{MessageQuery, Notice, photo_error_code, store_error_code};
use crate::services::photos::{PhotoError, PhotoUpload};
use crate::services::stores::{StoreError, StoreInput, StoreService};
use crate::state::AppState;

/// Tags offered as checkboxes on the store form.
pub const TAG_CHOICES: &[&str] = &[
    "Wifi",
    "Open Late",
    "Family Friendly",
    "Vegetarian",
    "Licensed",
];

// =============================================================================
// View Models
// =============================================================================

/// A store as shown in a grid of cards.
pub struct StoreCard {
    pub store: Store,
    pub hearted: bool,
    pub editable: bool,
    pub review_count: usize,
}

impl StoreCard {
    /// Cards for `stores` as seen by `viewer`.
    #[must_use]
    pub fn for_viewer(stores: Vec<StoreDetails>, viewer: Option<&User>) -> Vec<Self> {
        stores
            .into_iter()
            .map(|details| {
                let review_count = details.review_count();
                let store = details.store;
                Self {
                    hearted: viewer.is_some_and(|u| u.hearts.contains(store.id)),
                    editable: viewer.is_some_and(|u| u.id == store.author_id),
                    review_count,
                    store,
                }
            })
            .collect()
    }
}

/// Current values of the store form fields.
#[derive(Default)]
pub struct StoreFormValues {
    pub name: String,
    pub description: String,
    pub address: String,
    pub lng: String,
    pub lat: String,
    pub photo: Option<String>,
}

impl From<&Store> for StoreFormValues {
    fn from(store: &Store) -> Self {
        let point = store.location.coordinates;
        Self {
            name: store.name.clone(),
            description: store.description.clone().unwrap_or_default(),
            address: store.location.address.clone(),
            lng: point.lng().to_string(),
            lat: point.lat().to_string(),
            photo: store.photo.clone(),
        }
    }
}

/// A tag checkbox on the store form.
pub struct TagChoice {
    pub name: &'static str,
    pub checked: bool,
}

fn tag_choices(selected: &[String]) -> Vec<TagChoice> {
    TAG_CHOICES
        .iter()
        .map(|&name| TagChoice {
            name,
            checked: selected.iter().any(|t| t == name),
        })
        .collect()
}

// =============================================================================
// Templates
// =============================================================================

/// Store listing page template.
#[derive(Template, WebTemplate)]
#[template(path = "stores.html")]
pub struct StoresTemplate {
    pub user: Option<User>,
    pub notice: Option<Notice>,
    pub cards: Vec<StoreCard>,
    pub page: Page,
}

/// Store detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "store.html")]
pub struct StoreTemplate {
    pub user: Option<User>,
    pub notice: Option<Notice>,
    pub store: Store,
    pub reviews: Vec<Review>,
    pub hearted: bool,
    pub editable: bool,
    pub map_url: String,
}

/// Add/edit store form template.
#[derive(Template, WebTemplate)]
#[template(path = "edit_store.html")]
pub struct EditStoreTemplate {
    pub user: Option<User>,
    pub notice: Option<Notice>,
    pub title: String,
    pub action: String,
    pub form: StoreFormValues,
    pub tag_choices: Vec<TagChoice>,
}

// =============================================================================
// Listing
// =============================================================================

/// First page of the store listing.
pub async fn index(
    state: State<AppState>,
    auth: OptionalAuth,
    query: Query<MessageQuery>,
) -> Result<impl IntoResponse> {
    render_page(state, auth, 1, query).await
}

/// Page N of the store listing.
pub async fn page(
    state: State<AppState>,
    auth: OptionalAuth,
    Path(number): Path<u64>,
    query: Query<MessageQuery>,
) -> Result<impl IntoResponse> {
    render_page(state, auth, number, query).await
}

#[instrument(skip(state, user, query))]
async fn render_page(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    requested: u64,
    Query(query): Query<MessageQuery>,
) -> Result<StoresTemplate> {
    let listing = StoreService::new(state.repos())
        .list_page(requested, Populate::Reviews)
        .await?;

    let notice = if listing.page.clamped {
        Some(Notice::info(format!(
            "Hey! You asked for page {requested}. But that doesn't exist. So I put you on page {}.",
            listing.page.number
        )))
    } else {
        query.notice()
    };

    Ok(StoresTemplate {
        cards: StoreCard::for_viewer(listing.stores, user.as_ref()),
        user,
        notice,
        page: listing.page,
    })
}

// =============================================================================
// Detail
// =============================================================================

/// Store detail page with reviews.
#[instrument(skip(state, user, query))]
pub async fn show(
    State(state): State<AppState>,
    OptionalAuth(user): OptionalAuth,
    Path(slug): Path<String>,
    Query(query): Query<MessageQuery>,
) -> Result<Response> {
    let details = StoreService::new(state.repos())
        .get_by_slug(&slug, Populate::Reviews)
        .await?;

    let Some(details) = details else {
        return Ok((
            axum::http::StatusCode::NOT_FOUND,
            NotFoundTemplate::new(user, format!("No store lives at /store/{slug}.")),
        )
            .into_response());
    };

    let store = details.store;
    let point = store.location.coordinates;
    Ok(StoreTemplate {
        hearted: user.as_ref().is_some_and(|u| u.hearts.contains(store.id)),
        editable: user.as_ref().is_some_and(|u| u.id == store.author_id),
        map_url: format!(
            "https://www.openstreetmap.org/?mlat={lat}&mlon={lng}#map=15/{lat}/{lng}",
            lat = point.lat(),
            lng = point.lng()
        ),
        user,
        notice: query.notice(),
        store,
        reviews: details.reviews.unwrap_or_default(),
    }
    .into_response())
}

// =============================================================================
// Add / Edit
// =============================================================================

/// Empty store form.
pub async fn add_page(
    RequireAuth(user): RequireAuth,
    Query(query): Query<MessageQuery>,
) -> impl IntoResponse {
    EditStoreTemplate {
        user: Some(user),
        notice: query.notice(),
        title: "Add Store".to_string(),
        action: "/add".to_string(),
        form: StoreFormValues::default(),
        tag_choices: tag_choices(&[]),
    }
}

/// Store form filled with an existing store. Owner only.
#[instrument(skip(state, user, query), fields(user_id = %user.id))]
pub async fn edit_page(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<StoreId>,
    Query(query): Query<MessageQuery>,
) -> Result<impl IntoResponse> {
    let store = StoreService::new(state.repos())
        .get_for_edit(user.id, id)
        .await?;

    Ok(EditStoreTemplate {
        user: Some(user),
        notice: query.notice(),
        title: format!("Edit {}", store.name),
        action: format!("/add/{id}"),
        tag_choices: tag_choices(&store.tags),
        form: StoreFormValues::from(&store),
    })
}

/// Handle the new store form.
#[instrument(skip(state, user, multipart), fields(user_id = %user.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    multipart: Multipart,
) -> Result<Response> {
    let (input, upload) = read_store_form(multipart).await?;

    let photo = match save_photo(&state, upload.as_ref()).await {
        Ok(photo) => photo,
        Err(e) => return photo_failure(e, "/add"),
    };

    match StoreService::new(state.repos())
        .create(user.id, &input, photo.clone())
        .await
    {
        Ok(store) => Ok(Redirect::to(&format!("/store/{}?success=store_created", store.slug))
            .into_response()),
        Err(e) => {
            discard_photo(&state, photo.as_deref()).await;
            store_form_failure(e, "/add")
        }
    }
}

/// Handle the edit store form. Owner only.
#[instrument(skip(state, user, multipart), fields(user_id = %user.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Path(id): Path<StoreId>,
    multipart: Multipart,
) -> Result<Response> {
    let service = StoreService::new(state.repos());
    // reject non-owners before anything touches the disk
    service.get_for_edit(user.id, id).await?;

    let (input, upload) = read_store_form(multipart).await?;
    let back = format!("/stores/{id}/edit");

    let photo = match save_photo(&state, upload.as_ref()).await {
        Ok(photo) => photo,
        Err(e) => return photo_failure(e, &back),
    };

    match service.update(user.id, id, &input, photo.clone()).await {
        Ok(store) => Ok(Redirect::to(&format!("/store/{}?success=store_updated", store.slug))
            .into_response()),
        Err(e) => {
            discard_photo(&state, photo.as_deref()).await;
            store_form_failure(e, &back)
        }
    }
}

/// Redirect back to the form for input errors; propagate the rest.
fn store_form_failure(err: StoreError, back: &str) -> Result<Response> {
    match store_error_code(&err) {
        Some(code) => Ok(redirect_with_error(back, code)),
        None => Err(err.into()),
    }
}

fn redirect_with_error(path: &str, code: &str) -> Response {
    Redirect::to(&format!("{path}?error={code}")).into_response()
}

/// Redirect back to the form for a rejected file type; propagate the rest.
fn photo_failure(err: PhotoError, back: &str) -> Result<Response> {
    match photo_error_code(&err) {
        Some(code) => {
            tracing::info!(error = %err, "Rejected photo upload");
            Ok(redirect_with_error(back, code))
        }
        None => Err(err.into()),
    }
}

async fn save_photo(
    state: &AppState,
    upload: Option<&PhotoUpload>,
) -> std::result::Result<Option<String>, PhotoError> {
    match upload {
        Some(upload) => state.photos().save(upload).await.map(Some),
        None => Ok(None),
    }
}

async fn discard_photo(state: &AppState, photo: Option<&str>) {
    if let Some(name) = photo {
        state.photos().discard(name).await;
    }
}

/// Read the multipart store form.
async fn read_store_form(
    mut multipart: Multipart,
) -> Result<(StoreInput, Option<PhotoUpload>)> {
    let mut input = StoreInput::default();
    let mut photo = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_owned();

        if name == "photo" {
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_owned();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::BadRequest(e.body_text()))?;
            // browsers send an empty part when no file was picked
            if !bytes.is_empty() {
                photo = Some(PhotoUpload {
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| AppError::BadRequest(e.body_text()))?;
        match name.as_str() {
            "name" => input.name = value,
            "description" => input.description = value,
            "tags" => input.tags.push(value),
            "address" => input.address = value,
            "lng" => input.lng = Some(value),
            "lat" => input.lat = Some(value),
            _ => {}
        }
    }

    Ok((input, photo))
}
