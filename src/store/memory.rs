use anyhow::{bail, Result};
use itertools::Itertools;
use parking_lot::RwLock;
use std::collections::BTreeMap;

use crate::model::{
    Destination, Direction, Id, Offer, OfferDetail, Predicate, Resource, Searchable, SortSpec,
    Trip, TripDetail,
};
use crate::store::traits::{DestinationOptions, PageWindow, ResourceStore, WriteOutcome};

#[derive(Debug)]
struct Table<R> {
    rows: BTreeMap<Id, R>,
    last_id: Id,
}

impl<R> Default for Table<R> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            last_id: 0,
        }
    }
}

impl<R: Resource> Table<R> {
    fn insert(&mut self, mut record: R) -> R {
        self.last_id += 1;
        record.set_id(Some(self.last_id));
        record.set_version(0);
        self.rows.insert(self.last_id, record.clone());
        record
    }

    /// Whether the row exists at the version the caller read.
    fn holds_version(&self, record: &R) -> bool {
        record
            .id()
            .and_then(|id| self.rows.get(&id))
            .is_some_and(|current| current.version() == record.version())
    }

    /// Replace the row if the caller saw its current version.
    fn update(&mut self, record: &R, keep: impl FnOnce(&R, &mut R)) -> WriteOutcome {
        let Some(id) = record.id() else {
            return WriteOutcome::Conflict;
        };
        match self.rows.get_mut(&id) {
            Some(current) if current.version() == record.version() => {
                let mut next = record.clone();
                keep(current, &mut next);
                next.set_version(current.version() + 1);
                *current = next;
                WriteOutcome::Applied
            }
            _ => WriteOutcome::Conflict,
        }
    }
}

#[derive(Debug, Default)]
struct Tables {
    destinations: Table<Destination>,
    trips: Table<Trip>,
    offers: Table<Offer>,
}

impl Tables {
    fn destination(&self, id: Id) -> Result<&Destination> {
        match self.destinations.rows.get(&id) {
            Some(destination) => Ok(destination),
            None => bail!("foreign key violation: destination {} does not exist", id),
        }
    }

    fn trip_detail(&self, trip: &Trip) -> Result<TripDetail> {
        Ok(TripDetail {
            trip: trip.clone(),
            destination: self.destination(trip.destination_id)?.clone(),
        })
    }

    fn offer_detail(&self, offer: &Offer) -> Result<OfferDetail> {
        Ok(OfferDetail {
            offer: offer.clone(),
            destination: self.destination(offer.destination_id)?.clone(),
        })
    }
}

/// In-process store with the same contract as `PostgresStore`: foreign
/// keys are checked on write, destination deletes cascade and updates are
/// version-checked.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Row counts as `(destinations, trips, offers)`
    pub fn row_counts(&self) -> (usize, usize, usize) {
        let tables = self.tables.read();
        (
            tables.destinations.rows.len(),
            tables.trips.rows.len(),
            tables.offers.rows.len(),
        )
    }
}

fn matching<D: Searchable>(rows: Vec<D>, predicates: &[Predicate]) -> Vec<D> {
    rows.into_iter()
        .filter(|row| predicates.iter().all(|predicate| predicate.matches(row)))
        .collect()
}

/// Sort by the requested column, ties by id ascending, then cut the window.
fn sorted_page<D: Searchable>(rows: Vec<D>, sort: SortSpec, window: PageWindow) -> Vec<D> {
    let offset = usize::try_from(window.offset).unwrap_or(usize::MAX);
    let limit = usize::try_from(window.limit).unwrap_or(usize::MAX);

    rows.into_iter()
        .sorted_by(|a, b| {
            let by_column = a.sort_value(sort.field).cmp(&b.sort_value(sort.field));
            let by_column = match sort.direction {
                Direction::Asc => by_column,
                Direction::Desc => by_column.reverse(),
            };
            by_column.then_with(|| a.row_id().cmp(&b.row_id()))
        })
        .skip(offset)
        .take(limit)
        .collect()
}

#[async_trait::async_trait]
impl ResourceStore<Destination> for MemoryStore {
    async fn count(&self, predicates: &[Predicate]) -> Result<u64> {
        let rows = self.tables.read().destinations.rows.values().cloned().collect();
        Ok(matching(rows, predicates).len() as u64)
    }

    async fn page(
        &self,
        predicates: &[Predicate],
        sort: SortSpec,
        window: PageWindow,
    ) -> Result<Vec<Destination>> {
        let rows = self.tables.read().destinations.rows.values().cloned().collect();
        Ok(sorted_page(matching(rows, predicates), sort, window))
    }

    async fn get_detail(&self, id: Id) -> Result<Option<Destination>> {
        Ok(self.tables.read().destinations.rows.get(&id).cloned())
    }

    async fn find(&self, id: Id) -> Result<Option<Destination>> {
        Ok(self.tables.read().destinations.rows.get(&id).cloned())
    }

    async fn exists(&self, id: Id) -> Result<bool> {
        Ok(self.tables.read().destinations.rows.contains_key(&id))
    }

    async fn insert(&self, record: Destination) -> Result<Destination> {
        Ok(self.tables.write().destinations.insert(record))
    }

    async fn update(&self, record: &Destination) -> Result<WriteOutcome> {
        Ok(self
            .tables
            .write()
            .destinations
            .update(record, |current, next| next.created_on = current.created_on))
    }

    async fn delete(&self, id: Id) -> Result<bool> {
        let mut tables = self.tables.write();
        if tables.destinations.rows.remove(&id).is_none() {
            return Ok(false);
        }
        tables.trips.rows.retain(|_, trip| trip.destination_id != id);
        tables.offers.rows.retain(|_, offer| offer.destination_id != id);
        Ok(true)
    }
}

#[async_trait::async_trait]
impl ResourceStore<Trip> for MemoryStore {
    async fn count(&self, predicates: &[Predicate]) -> Result<u64> {
        let tables = self.tables.read();
        let rows = tables
            .trips
            .rows
            .values()
            .map(|trip| tables.trip_detail(trip))
            .collect::<Result<Vec<_>>>()?;
        Ok(matching(rows, predicates).len() as u64)
    }

    async fn page(
        &self,
        predicates: &[Predicate],
        sort: SortSpec,
        window: PageWindow,
    ) -> Result<Vec<TripDetail>> {
        let tables = self.tables.read();
        let rows = tables
            .trips
            .rows
            .values()
            .map(|trip| tables.trip_detail(trip))
            .collect::<Result<Vec<_>>>()?;
        Ok(sorted_page(matching(rows, predicates), sort, window))
    }

    async fn get_detail(&self, id: Id) -> Result<Option<TripDetail>> {
        let tables = self.tables.read();
        tables
            .trips
            .rows
            .get(&id)
            .map(|trip| tables.trip_detail(trip))
            .transpose()
    }

    async fn find(&self, id: Id) -> Result<Option<Trip>> {
        Ok(self.tables.read().trips.rows.get(&id).cloned())
    }

    async fn exists(&self, id: Id) -> Result<bool> {
        Ok(self.tables.read().trips.rows.contains_key(&id))
    }

    async fn insert(&self, record: Trip) -> Result<Trip> {
        let mut tables = self.tables.write();
        tables.destination(record.destination_id)?;
        Ok(tables.trips.insert(record))
    }

    async fn update(&self, record: &Trip) -> Result<WriteOutcome> {
        let mut tables = self.tables.write();
        if !tables.trips.holds_version(record) {
            return Ok(WriteOutcome::Conflict);
        }
        tables.destination(record.destination_id)?;
        Ok(tables.trips.update(record, |_, _| {}))
    }

    async fn delete(&self, id: Id) -> Result<bool> {
        Ok(self.tables.write().trips.rows.remove(&id).is_some())
    }
}

#[async_trait::async_trait]
impl ResourceStore<Offer> for MemoryStore {
    async fn count(&self, predicates: &[Predicate]) -> Result<u64> {
        let tables = self.tables.read();
        let rows = tables
            .offers
            .rows
            .values()
            .map(|offer| tables.offer_detail(offer))
            .collect::<Result<Vec<_>>>()?;
        Ok(matching(rows, predicates).len() as u64)
    }

    async fn page(
        &self,
        predicates: &[Predicate],
        sort: SortSpec,
        window: PageWindow,
    ) -> Result<Vec<OfferDetail>> {
        let tables = self.tables.read();
        let rows = tables
            .offers
            .rows
            .values()
            .map(|offer| tables.offer_detail(offer))
            .collect::<Result<Vec<_>>>()?;
        Ok(sorted_page(matching(rows, predicates), sort, window))
    }

    async fn get_detail(&self, id: Id) -> Result<Option<OfferDetail>> {
        let tables = self.tables.read();
        tables
            .offers
            .rows
            .get(&id)
            .map(|offer| tables.offer_detail(offer))
            .transpose()
    }

    async fn find(&self, id: Id) -> Result<Option<Offer>> {
        Ok(self.tables.read().offers.rows.get(&id).cloned())
    }

    async fn exists(&self, id: Id) -> Result<bool> {
        Ok(self.tables.read().offers.rows.contains_key(&id))
    }

    async fn insert(&self, record: Offer) -> Result<Offer> {
        let mut tables = self.tables.write();
        tables.destination(record.destination_id)?;
        Ok(tables.offers.insert(record))
    }

    async fn update(&self, record: &Offer) -> Result<WriteOutcome> {
        let mut tables = self.tables.write();
        if !tables.offers.holds_version(record) {
            return Ok(WriteOutcome::Conflict);
        }
        tables.destination(record.destination_id)?;
        Ok(tables.offers.update(record, |_, _| {}))
    }

    async fn delete(&self, id: Id) -> Result<bool> {
        Ok(self.tables.write().offers.rows.remove(&id).is_some())
    }
}

#[async_trait::async_trait]
impl DestinationOptions for MemoryStore {
    async fn list_destinations(&self) -> Result<Vec<Destination>> {
        Ok(self
            .tables
            .read()
            .destinations
            .rows
            .values()
            .cloned()
            .collect())
    }
}
