use crate::model::{Destination, Id, Offer, Predicate, Resource, SortSpec, Trip};
use anyhow::Result;

/// Rows to skip and rows to take for one listing page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub offset: u64,
    pub limit: u64,
}

/// Result of a version-checked write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Applied,
    /// The targeted row vanished or its version moved on since it was read.
    Conflict,
}

/// Persistence gateway for one record type.
///
/// Predicates are ANDed; every write commits in its own transaction.
#[async_trait::async_trait]
pub trait ResourceStore<R: Resource>: Send + Sync {
    /// Count rows matching all predicates
    async fn count(&self, predicates: &[Predicate]) -> Result<u64>;
    /// One sorted page of matching rows, related data resolved
    async fn page(
        &self,
        predicates: &[Predicate],
        sort: SortSpec,
        window: PageWindow,
    ) -> Result<Vec<R::Detail>>;
    /// Get a row with its related data resolved
    async fn get_detail(&self, id: Id) -> Result<Option<R::Detail>>;
    /// Get the bare row
    async fn find(&self, id: Id) -> Result<Option<R>>;
    async fn exists(&self, id: Id) -> Result<bool>;
    /// Insert a new row; the store assigns its identity
    async fn insert(&self, record: R) -> Result<R>;
    /// Update the row matching the record's id and version
    async fn update(&self, record: &R) -> Result<WriteOutcome>;
    /// Delete by id, returning whether a row was removed
    async fn delete(&self, id: Id) -> Result<bool>;
}

/// Destinations offered in trip and offer form select lists.
#[async_trait::async_trait]
pub trait DestinationOptions: Send + Sync {
    async fn list_destinations(&self) -> Result<Vec<Destination>>;
}

pub trait Store:
    ResourceStore<Destination>
    + ResourceStore<Trip>
    + ResourceStore<Offer>
    + DestinationOptions
    + Send
    + Sync
{
}

impl<T> Store for T where
    T: ResourceStore<Destination>
        + ResourceStore<Trip>
        + ResourceStore<Offer>
        + DestinationOptions
        + Send
        + Sync
{
}
