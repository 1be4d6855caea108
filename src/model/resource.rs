use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt::Debug;

use crate::logic::validate::FieldError;
use crate::model::{Destination, Formatting, Id, Predicate, Searchable, SortSpec};

/// A fixed enumeration of sort orders a listing accepts.
///
/// Keys travel as plain strings in the `sortOrder` query parameter. The
/// default order is represented by the empty key.
pub trait SortKey: Copy + Eq + Debug + Send + Sync + 'static {
    const ALL: &'static [Self];

    /// Sortable columns as `(label, ascending, descending)`.
    const COLUMNS: &'static [(&'static str, Self, Self)];

    fn key(self) -> &'static str;

    fn order(self) -> SortSpec;

    fn fallback() -> Self;

    /// Unknown or absent keys fall back to the resource's default order.
    fn parse(raw: Option<&str>) -> Self {
        let raw = raw.unwrap_or_default();
        Self::ALL
            .iter()
            .copied()
            .find(|candidate| candidate.key() == raw)
            .unwrap_or_else(Self::fallback)
    }
}

pub trait ListingFilter:
    Serialize + DeserializeOwned + Default + Clone + Debug + Send + Sync + 'static
{
    fn predicates(&self) -> Vec<Predicate>;
}

/// Record-type description the listing builder and editors are generic over.
pub trait Resource: Serialize + DeserializeOwned + Clone + Debug + Send + Sync + 'static {
    type Filter: ListingFilter;
    type Sort: SortKey;
    /// The record with its related data resolved.
    type Detail: Searchable + Serialize + Clone + Debug + Send + Sync + 'static;
    type View: Serialize + Send + 'static;

    /// Plural route segment, e.g. `destinations`.
    const ROUTE: &'static str;
    const LABEL: &'static str;
    const ADMIN_WRITES: bool = true;
    /// Non-text fields a submission must carry to bind at all.
    const REQUIRED_INPUTS: &'static [&'static str] = &[];

    fn id(&self) -> Option<Id>;
    fn set_id(&mut self, id: Option<Id>);
    fn version(&self) -> i32;
    fn set_version(&mut self, version: i32);

    fn validate(&self) -> Vec<FieldError>;

    /// Server-side stamping before the first insert.
    fn prepare_insert(&mut self) {}

    /// How a destination is labelled in this record's form select list.
    fn destination_label(_destination: &Destination) -> Option<String> {
        None
    }

    fn present(detail: Self::Detail, formatting: &Formatting) -> Self::View;
}
