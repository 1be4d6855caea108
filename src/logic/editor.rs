//! Create, read, update and delete for a single record of any resource.
//!
//! Store failures other than the expected outcomes (missing rows, version
//! conflicts) are not handled here and surface as `EditError::Storage`.

use std::fmt::Debug;
use std::marker::PhantomData;

use crate::logic::validate::FieldError;
use crate::model::{Id, Resource};
use crate::store::traits::{ResourceStore, WriteOutcome};

#[derive(Debug, thiserror::Error)]
pub enum EditError<R: Debug> {
    #[error("record not found")]
    NotFound,
    /// The input is handed back untouched so the form can be redisplayed.
    #[error("validation failed on {} field(s)", .errors.len())]
    Invalid { input: R, errors: Vec<FieldError> },
    #[error("concurrency conflict on record {id}")]
    Conflict { id: Id },
    #[error(transparent)]
    Storage(#[from] anyhow::Error),
}

pub type EditResult<T, R> = Result<T, EditError<R>>;

pub struct ResourceEditor<R> {
    _resource: PhantomData<R>,
}

impl<R: Resource> ResourceEditor<R> {
    pub async fn create<S>(store: &S, mut input: R) -> EditResult<R, R>
    where
        S: ResourceStore<R> + ?Sized,
    {
        input.set_id(None);
        let errors = input.validate();
        if !errors.is_empty() {
            return Err(EditError::Invalid { input, errors });
        }

        input.prepare_insert();
        let created = store.insert(input).await?;
        log::info!("{} {:?} created", R::LABEL, created.id());
        Ok(created)
    }

    /// Detail read with related data resolved; a missing id is not found.
    pub async fn read<S>(store: &S, id: Option<Id>) -> EditResult<R::Detail, R>
    where
        S: ResourceStore<R> + ?Sized,
    {
        let id = id.ok_or(EditError::NotFound)?;
        store.get_detail(id).await?.ok_or(EditError::NotFound)
    }

    /// Bare record for the edit form.
    pub async fn find<S>(store: &S, id: Option<Id>) -> EditResult<R, R>
    where
        S: ResourceStore<R> + ?Sized,
    {
        let id = id.ok_or(EditError::NotFound)?;
        store.find(id).await?.ok_or(EditError::NotFound)
    }

    pub async fn update<S>(store: &S, path_id: Option<Id>, input: R) -> EditResult<(), R>
    where
        S: ResourceStore<R> + ?Sized,
    {
        let id = match (path_id, input.id()) {
            (Some(path_id), Some(body_id)) if path_id == body_id => path_id,
            _ => return Err(EditError::NotFound),
        };

        let errors = input.validate();
        if !errors.is_empty() {
            return Err(EditError::Invalid { input, errors });
        }

        match store.update(&input).await? {
            WriteOutcome::Applied => {
                log::info!("{} {} updated", R::LABEL, id);
                Ok(())
            }
            WriteOutcome::Conflict => {
                if store.exists(id).await? {
                    log::error!("{} {} changed concurrently; update rejected", R::LABEL, id);
                    Err(EditError::Conflict { id })
                } else {
                    Err(EditError::NotFound)
                }
            }
        }
    }

    /// What the delete confirmation page shows.
    pub async fn delete_confirmation<S>(store: &S, id: Option<Id>) -> EditResult<R::Detail, R>
    where
        S: ResourceStore<R> + ?Sized,
    {
        Self::read(store, id).await
    }

    /// Deleting a record that is already gone succeeds.
    pub async fn delete<S>(store: &S, id: Id) -> EditResult<(), R>
    where
        S: ResourceStore<R> + ?Sized,
    {
        if store.delete(id).await? {
            log::info!("{} {} deleted", R::LABEL, id);
        } else {
            log::debug!("{} {} already absent; nothing to delete", R::LABEL, id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Destination, Trip};
    use crate::store::MemoryStore;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    async fn seeded() -> (MemoryStore, Destination) {
        let store = MemoryStore::new();
        let destination =
            ResourceEditor::create(&store, Destination::new("Lisbon", "Portugal"))
                .await
                .unwrap();
        (store, destination)
    }

    fn trip(destination_id: Id) -> Trip {
        Trip {
            id: None,
            name: "City break".to_string(),
            departure_date: NaiveDate::from_ymd_opt(2025, 9, 12).unwrap(),
            destination_id,
            price: Decimal::new(45000, 2),
            seats: 20,
            version: 0,
        }
    }

    #[tokio::test]
    async fn create_assigns_identity_and_ignores_body_id() {
        let (store, _) = seeded().await;
        let mut input = Destination::new("Porto", "Portugal");
        input.id = Some(999);

        let created = ResourceEditor::create(&store, input).await.unwrap();
        assert_eq!(created.id, Some(2));
    }

    #[tokio::test]
    async fn invalid_create_returns_input_and_writes_nothing() {
        let (store, _) = seeded().await;
        let input = Destination::new("", "Portugal");

        let err = ResourceEditor::create(&store, input.clone()).await.unwrap_err();
        match err {
            EditError::Invalid { input: returned, errors } => {
                assert_eq!(returned, input);
                assert_eq!(errors[0].field, "name");
            }
            other => panic!("expected validation failure, got {:?}", other),
        }
        assert_eq!(store.row_counts(), (1, 0, 0));
    }

    #[tokio::test]
    async fn read_of_missing_or_null_id_is_not_found() {
        let (store, _) = seeded().await;

        assert!(matches!(
            ResourceEditor::<Destination>::read(&store, None).await,
            Err(EditError::NotFound)
        ));
        assert!(matches!(
            ResourceEditor::<Destination>::read(&store, Some(42)).await,
            Err(EditError::NotFound)
        ));
    }

    #[tokio::test]
    async fn trip_detail_resolves_destination() {
        let (store, destination) = seeded().await;
        let created = ResourceEditor::create(&store, trip(destination.id.unwrap()))
            .await
            .unwrap();

        let detail = ResourceEditor::<Trip>::read(&store, created.id).await.unwrap();
        assert_eq!(detail.destination.name, "Lisbon");
    }

    #[tokio::test]
    async fn update_with_mismatched_ids_is_not_found_and_writes_nothing() {
        let (store, mut destination) = seeded().await;
        destination.name = "Renamed".to_string();

        let err = ResourceEditor::update(&store, Some(7), destination.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, EditError::NotFound));

        let stored = ResourceEditor::<Destination>::find(&store, destination.id)
            .await
            .unwrap();
        assert_eq!(stored.name, "Lisbon");
    }

    #[tokio::test]
    async fn invalid_update_returns_input() {
        let (store, mut destination) = seeded().await;
        destination.country = String::new();

        let err = ResourceEditor::update(&store, destination.id, destination.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, EditError::Invalid { .. }));
    }

    #[tokio::test]
    async fn update_of_vanished_record_is_not_found() {
        let (store, destination) = seeded().await;
        let id = destination.id.unwrap();
        ResourceEditor::<Destination>::delete(&store, id).await.unwrap();

        let err = ResourceEditor::update(&store, Some(id), destination)
            .await
            .unwrap_err();
        assert!(matches!(err, EditError::NotFound));
    }

    #[tokio::test]
    async fn update_of_trip_removed_by_destination_cascade_is_not_found() {
        let (store, destination) = seeded().await;
        let destination_id = destination.id.unwrap();
        let created = ResourceEditor::create(&store, trip(destination_id))
            .await
            .unwrap();
        ResourceEditor::<Destination>::delete(&store, destination_id)
            .await
            .unwrap();

        let mut edited = created.clone();
        edited.name = "Too late".to_string();
        let err = ResourceEditor::update(&store, created.id, edited)
            .await
            .unwrap_err();
        assert!(matches!(err, EditError::NotFound));
    }

    #[tokio::test]
    async fn stale_version_is_an_unrecovered_conflict() {
        let (store, destination) = seeded().await;
        let id = destination.id;

        let mut first = destination.clone();
        first.name = "Lisboa".to_string();
        ResourceEditor::update(&store, id, first).await.unwrap();

        let mut stale = destination;
        stale.name = "Olisipo".to_string();
        let err = ResourceEditor::update(&store, id, stale).await.unwrap_err();
        assert!(matches!(err, EditError::Conflict { .. }));
    }

    #[tokio::test]
    async fn deleting_a_missing_record_is_a_no_op() {
        let (store, _) = seeded().await;

        ResourceEditor::<Destination>::delete(&store, 404).await.unwrap();
        assert_eq!(store.row_counts(), (1, 0, 0));
    }

    #[tokio::test]
    async fn trip_against_missing_destination_fails_at_the_store() {
        let (store, _) = seeded().await;

        let err = ResourceEditor::create(&store, trip(77)).await.unwrap_err();
        assert!(matches!(err, EditError::Storage(_)));
        assert_eq!(store.row_counts(), (1, 0, 0));
    }
}
