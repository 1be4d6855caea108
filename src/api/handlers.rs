use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use crate::logic::{
    EditError, FieldError, ListingPage, ListingParams, ListingQuery, ResourceEditor,
};
use crate::model::{Formatting, Id, Resource, UserContext};
use crate::store::traits::{DestinationOptions, ResourceStore};

/// Shared handler state: the store plus presentation settings.
#[derive(Debug)]
pub struct AppState<S> {
    pub store: Arc<S>,
    pub formatting: Formatting,
}

impl<S> AppState<S> {
    pub fn new(store: Arc<S>, formatting: Formatting) -> Self {
        Self { store, formatting }
    }
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            formatting: self.formatting.clone(),
        }
    }
}

/// Simple health check endpoint
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub timestamp: String,
}

pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: &str) -> Self {
        Self {
            error: message.to_string(),
        }
    }
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);

/// One entry of a form's destination select list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectOption {
    pub id: Id,
    pub text: String,
}

/// Everything a create or edit form needs to render, including after a
/// rejected submission.
#[derive(Debug, Serialize)]
pub struct FormView<R> {
    pub record: Option<R>,
    /// The raw body, echoed when it could not be bound to a record.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submitted: Option<Value>,
    pub destinations: Vec<SelectOption>,
    pub errors: Vec<FieldError>,
}

fn not_found() -> ApiError {
    (StatusCode::NOT_FOUND, Json(ErrorResponse::new("Not found")))
}

fn internal_error(context: &str, err: &dyn std::fmt::Display) -> ApiError {
    log::error!("{}: {}", context, err);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new("An unexpected error occurred")),
    )
}

fn edit_error<R: Resource>(err: EditError<R>) -> ApiError {
    match err {
        EditError::NotFound => not_found(),
        EditError::Invalid { errors, .. } => (
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ErrorResponse::new(&format!(
                "{} field(s) failed validation",
                errors.len()
            ))),
        ),
        EditError::Conflict { id } => internal_error(
            R::LABEL,
            &format!("record {} was modified concurrently", id),
        ),
        EditError::Storage(e) => internal_error(R::LABEL, &e),
    }
}

fn require_admin<R: Resource>(user: &UserContext) -> Result<(), ApiError> {
    if R::ADMIN_WRITES && !user.is_admin() {
        log::warn!(
            "User {} without admin role attempted to modify {}",
            user.user_id,
            R::ROUTE
        );
        return Err((
            StatusCode::FORBIDDEN,
            Json(ErrorResponse::new("Administrator role required")),
        ));
    }
    Ok(())
}

/// Route ids that are not integers address nothing.
fn parse_id(raw: &str) -> Option<Id> {
    raw.trim().parse().ok()
}

async fn select_options<S, R>(store: &S) -> Result<Vec<SelectOption>, ApiError>
where
    S: DestinationOptions + ?Sized,
    R: Resource,
{
    let destinations = store
        .list_destinations()
        .await
        .map_err(|e| internal_error("Failed to list destinations", &e))?;

    Ok(destinations
        .iter()
        .filter_map(|destination| {
            let id = destination.id?;
            R::destination_label(destination).map(|text| SelectOption { id, text })
        })
        .collect())
}

async fn form_view<S, R>(
    store: &S,
    record: Option<R>,
    errors: Vec<FieldError>,
) -> Result<FormView<R>, ApiError>
where
    S: DestinationOptions + ?Sized,
    R: Resource,
{
    Ok(FormView {
        record,
        submitted: None,
        destinations: select_options::<S, R>(store).await?,
        errors,
    })
}

/// Redisplay the form for invalid input, everything else is an error status.
async fn rejected_submission<S, R>(store: &S, err: EditError<R>) -> Result<Response, ApiError>
where
    S: DestinationOptions + ?Sized,
    R: Resource,
{
    match err {
        EditError::Invalid { input, errors } => {
            log::debug!("{} submission rejected: {:?}", R::LABEL, errors);
            let form = form_view::<S, R>(store, Some(input), errors).await?;
            Ok((StatusCode::UNPROCESSABLE_ENTITY, Json(form)).into_response())
        }
        other => Err(edit_error(other)),
    }
}

/// A body that does not bind to a record fails like a validation error:
/// missing required inputs are reported per field, anything else as a
/// form-level error.
fn bind_submission<R: Resource>(
    body: Result<Json<Value>, JsonRejection>,
) -> Result<R, (Option<Value>, Vec<FieldError>)> {
    let Json(value) = match body {
        Ok(body) => body,
        Err(rejection) => {
            return Err((None, vec![FieldError::new("", rejection.body_text())]));
        }
    };

    match serde_json::from_value::<R>(value.clone()) {
        Ok(record) => Ok(record),
        Err(err) => {
            let mut errors: Vec<FieldError> = R::REQUIRED_INPUTS
                .iter()
                .filter(|field| value.get(**field).map_or(true, Value::is_null))
                .map(|field| FieldError::new(field, format!("The {} field is required.", field)))
                .collect();
            if errors.is_empty() {
                errors.push(FieldError::new(
                    "",
                    format!("The submitted value is invalid: {}", err),
                ));
            }
            Err((Some(value), errors))
        }
    }
}

async fn unbound_submission<S, R>(
    store: &S,
    submitted: Option<Value>,
    errors: Vec<FieldError>,
) -> Result<Response, ApiError>
where
    S: DestinationOptions + ?Sized,
    R: Resource,
{
    log::debug!("{} submission could not be bound: {:?}", R::LABEL, errors);
    let mut form = form_view::<S, R>(store, None, errors).await?;
    form.submitted = submitted;
    Ok((StatusCode::UNPROCESSABLE_ENTITY, Json(form)).into_response())
}

fn back_to_listing<R: Resource>() -> Response {
    Redirect::to(&format!("/{}", R::ROUTE)).into_response()
}

pub async fn list<S, R>(
    State(state): State<AppState<S>>,
    _user: UserContext,
    Query(params): Query<ListingParams<R::Filter>>,
) -> Result<Json<ListingPage<R::View, R::Filter>>, ApiError>
where
    S: ResourceStore<R> + 'static,
    R: Resource,
{
    let page = ListingQuery::<R>::from_params(params)
        .execute(&*state.store)
        .await
        .map_err(|e| internal_error(R::LABEL, &e))?;

    Ok(Json(page.map(|detail| R::present(detail, &state.formatting))))
}

pub async fn details<S, R>(
    State(state): State<AppState<S>>,
    _user: UserContext,
    Path(id): Path<String>,
) -> Result<Json<R::View>, ApiError>
where
    S: ResourceStore<R> + 'static,
    R: Resource,
{
    let detail = ResourceEditor::<R>::read(&*state.store, parse_id(&id))
        .await
        .map_err(edit_error)?;

    Ok(Json(R::present(detail, &state.formatting)))
}

pub async fn create_form<S, R>(
    State(state): State<AppState<S>>,
    user: UserContext,
) -> Result<Json<FormView<R>>, ApiError>
where
    S: ResourceStore<R> + DestinationOptions + 'static,
    R: Resource,
{
    require_admin::<R>(&user)?;
    Ok(Json(form_view::<S, R>(&*state.store, None, Vec::new()).await?))
}

pub async fn create<S, R>(
    State(state): State<AppState<S>>,
    user: UserContext,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError>
where
    S: ResourceStore<R> + DestinationOptions + 'static,
    R: Resource,
{
    require_admin::<R>(&user)?;
    let input = match bind_submission::<R>(body) {
        Ok(input) => input,
        Err((submitted, errors)) => {
            return unbound_submission::<S, R>(&*state.store, submitted, errors).await
        }
    };
    match ResourceEditor::create(&*state.store, input).await {
        Ok(_) => Ok(back_to_listing::<R>()),
        Err(err) => rejected_submission(&*state.store, err).await,
    }
}

pub async fn edit_form<S, R>(
    State(state): State<AppState<S>>,
    user: UserContext,
    Path(id): Path<String>,
) -> Result<Json<FormView<R>>, ApiError>
where
    S: ResourceStore<R> + DestinationOptions + 'static,
    R: Resource,
{
    require_admin::<R>(&user)?;
    let record = ResourceEditor::<R>::find(&*state.store, parse_id(&id))
        .await
        .map_err(edit_error)?;

    Ok(Json(
        form_view::<S, R>(&*state.store, Some(record), Vec::new()).await?,
    ))
}

pub async fn edit<S, R>(
    State(state): State<AppState<S>>,
    user: UserContext,
    Path(id): Path<String>,
    body: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError>
where
    S: ResourceStore<R> + DestinationOptions + 'static,
    R: Resource,
{
    require_admin::<R>(&user)?;
    let input = match bind_submission::<R>(body) {
        Ok(input) => input,
        Err((submitted, errors)) => {
            return unbound_submission::<S, R>(&*state.store, submitted, errors).await
        }
    };
    match ResourceEditor::update(&*state.store, parse_id(&id), input).await {
        Ok(()) => Ok(back_to_listing::<R>()),
        Err(err) => rejected_submission(&*state.store, err).await,
    }
}

pub async fn delete_confirm<S, R>(
    State(state): State<AppState<S>>,
    user: UserContext,
    Path(id): Path<String>,
) -> Result<Json<R::View>, ApiError>
where
    S: ResourceStore<R> + 'static,
    R: Resource,
{
    require_admin::<R>(&user)?;
    let detail = ResourceEditor::<R>::delete_confirmation(&*state.store, parse_id(&id))
        .await
        .map_err(edit_error)?;

    Ok(Json(R::present(detail, &state.formatting)))
}

pub async fn delete<S, R>(
    State(state): State<AppState<S>>,
    user: UserContext,
    Path(id): Path<String>,
) -> Result<Response, ApiError>
where
    S: ResourceStore<R> + 'static,
    R: Resource,
{
    require_admin::<R>(&user)?;
    let id = parse_id(&id).ok_or_else(not_found)?;
    ResourceEditor::<R>::delete(&*state.store, id)
        .await
        .map_err(edit_error)?;

    Ok(back_to_listing::<R>())
}
