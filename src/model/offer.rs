use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::logic::validate::{FieldError, FieldValidator};
use crate::model::{
    search_term, Destination, Field, Formatting, Id, ListingFilter, Predicate, Resource,
    Searchable, SortKey, SortSpec, SortValue,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Offer {
    #[serde(default)]
    pub id: Option<Id>,
    #[serde(default)]
    pub title: String,
    pub destination_id: Id,
    pub price: Decimal,
    #[serde(default)]
    pub payment_method: Option<String>,
    pub start_date: NaiveDate,
    #[serde(default)]
    pub version: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OfferDetail {
    #[serde(flatten)]
    pub offer: Offer,
    pub destination: Destination,
}

/// One term matched against the offer title or its destination's name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OfferFilter {
    #[serde(default)]
    pub search: Option<String>,
}

impl ListingFilter for OfferFilter {
    fn predicates(&self) -> Vec<Predicate> {
        search_term(&self.search)
            .map(|term| Predicate::any_of(&[Field::Title, Field::DestinationName], term))
            .into_iter()
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OfferSort {
    IdAsc,
    PriceAsc,
    PriceDesc,
}

impl SortKey for OfferSort {
    const ALL: &'static [Self] = &[Self::IdAsc, Self::PriceAsc, Self::PriceDesc];
    const COLUMNS: &'static [(&'static str, Self, Self)] =
        &[("price", Self::PriceAsc, Self::PriceDesc)];

    fn key(self) -> &'static str {
        match self {
            Self::IdAsc => "",
            Self::PriceAsc => "price_asc",
            Self::PriceDesc => "price_desc",
        }
    }

    fn order(self) -> SortSpec {
        match self {
            Self::IdAsc => SortSpec::asc(Field::Id),
            Self::PriceAsc => SortSpec::asc(Field::Price),
            Self::PriceDesc => SortSpec::desc(Field::Price),
        }
    }

    fn fallback() -> Self {
        Self::IdAsc
    }
}

impl Searchable for OfferDetail {
    fn text(&self, field: Field) -> Option<&str> {
        match field {
            Field::Title | Field::Name => Some(&self.offer.title),
            Field::DestinationName => Some(&self.destination.name),
            Field::DestinationCountry | Field::Country => Some(&self.destination.country),
            _ => None,
        }
    }

    fn sort_value(&self, field: Field) -> SortValue {
        match field {
            Field::Id => SortValue::Int(i64::from(self.row_id())),
            Field::Price => SortValue::Decimal(self.offer.price),
            _ => self
                .text(field)
                .map(|text| SortValue::Text(text.to_lowercase()))
                .unwrap_or(SortValue::Missing),
        }
    }

    fn row_id(&self) -> Id {
        self.offer.id.unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OfferView {
    #[serde(flatten)]
    pub detail: OfferDetail,
    pub price_display: String,
    pub start_display: String,
}

impl Resource for Offer {
    type Filter = OfferFilter;
    type Sort = OfferSort;
    type Detail = OfferDetail;
    type View = OfferView;

    const ROUTE: &'static str = "offers";
    const LABEL: &'static str = "Offer";
    const REQUIRED_INPUTS: &'static [&'static str] = &["destination_id", "price", "start_date"];

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
            .required("title", &self.title, 120)
            .optional("payment_method", self.payment_method.as_deref(), 50)
            .finish()
    }

    fn prepare_insert(&mut self) {
        self.version = 0;
    }

    fn destination_label(destination: &Destination) -> Option<String> {
        Some(format!("{} ({})", destination.name, destination.country))
    }

    fn present(detail: Self::Detail, formatting: &Formatting) -> Self::View {
        OfferView {
            price_display: formatting.price(&detail.offer.price),
            start_display: formatting.date(&detail.offer.start_date),
            detail,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_order_is_by_id() {
        assert_eq!(OfferSort::parse(Some("name_desc")), OfferSort::IdAsc);
        assert_eq!(OfferSort::IdAsc.order(), SortSpec::asc(Field::Id));
    }

    #[test]
    fn payment_method_is_bounded() {
        let offer = Offer {
            id: None,
            title: "Early booking".to_string(),
            destination_id: 1,
            price: Decimal::new(49900, 2),
            payment_method: Some("c".repeat(51)),
            start_date: NaiveDate::from_ymd_opt(2025, 6, 1).unwrap(),
            version: 0,
        };

        let errors = offer.validate();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "payment_method");
    }

    #[test]
    fn select_label_shows_name_and_country() {
        let destination = Destination::new("Santorini", "Greece");
        assert_eq!(
            Offer::destination_label(&destination).as_deref(),
            Some("Santorini (Greece)")
        );
    }
}
