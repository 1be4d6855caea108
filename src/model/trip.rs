use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::logic::validate::{FieldError, FieldValidator};
use crate::model::{
    search_term, Destination, Field, Formatting, Id, ListingFilter, Predicate, Resource,
    Searchable, SortKey, SortSpec, SortValue,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trip {
    #[serde(default)]
    pub id: Option<Id>,
    #[serde(default)]
    pub name: String,
    pub departure_date: NaiveDate,
    pub destination_id: Id,
    pub price: Decimal,
    #[serde(default)]
    pub seats: i32,
    #[serde(default)]
    pub version: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TripDetail {
    #[serde(flatten)]
    pub trip: Trip,
    pub destination: Destination,
}

/// One term matched against the trip name or its destination's country.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TripFilter {
    #[serde(default)]
    pub search: Option<String>,
}

impl ListingFilter for TripFilter {
    fn predicates(&self) -> Vec<Predicate> {
        search_term(&self.search)
            .map(|term| Predicate::any_of(&[Field::Name, Field::DestinationCountry], term))
            .into_iter()
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TripSort {
    NameAsc,
    NameDesc,
    PriceAsc,
    PriceDesc,
}

impl SortKey for TripSort {
    const ALL: &'static [Self] = &[Self::NameAsc, Self::NameDesc, Self::PriceAsc, Self::PriceDesc];
    const COLUMNS: &'static [(&'static str, Self, Self)] = &[
        ("name", Self::NameAsc, Self::NameDesc),
        ("price", Self::PriceAsc, Self::PriceDesc),
    ];

    fn key(self) -> &'static str {
        match self {
            Self::NameAsc => "",
            Self::NameDesc => "name_desc",
            Self::PriceAsc => "price_asc",
            Self::PriceDesc => "price_desc",
        }
    }

    fn order(self) -> SortSpec {
        match self {
            Self::NameAsc => SortSpec::asc(Field::Name),
            Self::NameDesc => SortSpec::desc(Field::Name),
            Self::PriceAsc => SortSpec::asc(Field::Price),
            Self::PriceDesc => SortSpec::desc(Field::Price),
        }
    }

    fn fallback() -> Self {
        Self::NameAsc
    }
}

impl Searchable for TripDetail {
    fn text(&self, field: Field) -> Option<&str> {
        match field {
            Field::Name => Some(&self.trip.name),
            Field::DestinationName => Some(&self.destination.name),
            Field::DestinationCountry | Field::Country => Some(&self.destination.country),
            _ => None,
        }
    }

    fn sort_value(&self, field: Field) -> SortValue {
        match field {
            Field::Id => SortValue::Int(i64::from(self.row_id())),
            Field::Price => SortValue::Decimal(self.trip.price),
            _ => self
                .text(field)
                .map(|text| SortValue::Text(text.to_lowercase()))
                .unwrap_or(SortValue::Missing),
        }
    }

    fn row_id(&self) -> Id {
        self.trip.id.unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TripView {
    #[serde(flatten)]
    pub detail: TripDetail,
    pub price_display: String,
    pub departure_display: String,
}

impl Resource for Trip {
    type Filter = TripFilter;
    type Sort = TripSort;
    type Detail = TripDetail;
    type View = TripView;

    const ROUTE: &'static str = "trips";
    const LABEL: &'static str = "Trip";
    const REQUIRED_INPUTS: &'static [&'static str] = &["departure_date", "destination_id", "price"];

    fn id(&self) -> Option<Id> {
        self.id
    }

    fn set_id(&mut self, id: Option<Id>) {
        self.id = id;
    }

    fn version(&self) -> i32 {
        self.version
    }

    fn set_version(&mut self, version: i32) {
        self.version = version;
    }

    fn validate(&self) -> Vec<FieldError> {
        FieldValidator::new()
            .required("name", &self.name, 120)
            .finish()
    }

    fn prepare_insert(&mut self) {
        self.version = 0;
    }

    fn destination_label(destination: &Destination) -> Option<String> {
        Some(destination.country.clone())
    }

    fn present(detail: Self::Detail, formatting: &Formatting) -> Self::View {
        TripView {
            price_display: formatting.price(&detail.trip.price),
            departure_display: formatting.date(&detail.trip.departure_date),
            detail,
        }
    }
}
