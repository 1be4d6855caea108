use axum::{routing::get, Router};
use std::path::Path;
use tower_http::services::ServeDir;

use crate::api::handlers::{self, AppState};
use crate::model::{Destination, Offer, Resource, Trip};
use crate::store::traits::{DestinationOptions, ResourceStore, Store};

pub fn create_router<S: Store + 'static>(static_dir: impl AsRef<Path>) -> Router<AppState<S>> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        .merge(resource_routes::<S, Destination>())
        .merge(resource_routes::<S, Trip>())
        .merge(resource_routes::<S, Offer>())
        // Destination images and other assets
        .nest_service("/static", ServeDir::new(static_dir))
}

/// Listing, details and the create/edit/delete forms of one resource.
fn resource_routes<S, R>() -> Router<AppState<S>>
where
    S: ResourceStore<R> + DestinationOptions + 'static,
    R: Resource,
{
    let base = format!("/{}", R::ROUTE);

    Router::new()
        .route(&base, get(handlers::list::<S, R>))
        .route(
            &format!("{}/details/:id", base),
            get(handlers::details::<S, R>),
        )
        .route(
            &format!("{}/create", base),
            get(handlers::create_form::<S, R>).post(handlers::create::<S, R>),
        )
        .route(
            &format!("{}/edit/:id", base),
            get(handlers::edit_form::<S, R>).post(handlers::edit::<S, R>),
        )
        .route(
            &format!("{}/delete/:id", base),
            get(handlers::delete_confirm::<S, R>).post(handlers::delete::<S, R>),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Formatting;
    use crate::store::MemoryStore;
    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app() -> Router {
        let state = AppState::new(Arc::new(MemoryStore::new()), Formatting::default());
        create_router::<MemoryStore>("static").with_state(state)
    }

    fn admin_request(method: &str, uri: &str, body: Body) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("x-user-id", "admin-1")
            .header("x-user-roles", "Admin")
            .header(header::CONTENT_TYPE, "application/json")
            .body(body)
            .unwrap()
    }

    #[tokio::test]
    async fn health_needs_no_user() {
        let response = app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn listing_without_user_is_unauthorized() {
        let response = app()
            .oneshot(Request::get("/trips").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn create_redirects_to_listing() {
        let body = serde_json::json!({ "name": "Plovdiv", "country": "Bulgaria" });
        let response = app()
            .oneshot(admin_request(
                "POST",
                "/destinations/create",
                Body::from(body.to_string()),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/destinations");
    }

    #[tokio::test]
    async fn null_id_is_not_found() {
        let response = app()
            .oneshot(admin_request("GET", "/offers/edit/null", Body::empty()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
