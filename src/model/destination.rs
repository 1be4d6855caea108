use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::logic::validate::{FieldError, FieldValidator};
use crate::model::{
    search_term, Field, Formatting, Id, ListingFilter, Predicate, Resource, Searchable, SortKey,
    SortSpec, SortValue,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Destination {
    #[serde(default)]
    pub id: Option<Id>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default = "Utc::now")]
    pub created_on: DateTime<Utc>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub version: i32,
}

impl Destination {
    pub fn new(name: &str, country: &str) -> Self {
        Self {
            id: None,
            name: name.to_string(),
            country: country.to_string(),
            description: None,
            image_url: None,
            created_on: Utc::now(),
            is_active: true,
            version: 0,
        }
    }
}

/// Name and country are independent constraints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DestinationFilter {
    #[serde(rename = "searchName", default)]
    pub search_name: Option<String>,
    #[serde(rename = "searchCountry", default)]
    pub search_country: Option<String>,
}

impl ListingFilter for DestinationFilter {
    fn predicates(&self) -> Vec<Predicate> {
        let mut predicates = Vec::new();
        if let Some(term) = search_term(&self.search_name) {
            predicates.push(Predicate::any_of(&[Field::Name], term));
        }
        if let Some(term) = search_term(&self.search_country) {
            predicates.push(Predicate::any_of(&[Field::Country], term));
        }
        predicates
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestinationSort {
    NameAsc,
    NameDesc,
    CountryAsc,
    CountryDesc,
}

impl SortKey for DestinationSort {
    const ALL: &'static [Self] = &[
        Self::NameAsc,
        Self::NameDesc,
        Self::CountryAsc,
        Self::CountryDesc,
    ];
    const COLUMNS: &'static [(&'static str, Self, Self)] = &[
        ("name", Self::NameAsc, Self::NameDesc),
        ("country", Self::CountryAsc, Self::CountryDesc),
    ];

    fn key(self) -> &'static str {
        match self {
            Self::NameAsc => "",
            Self::NameDesc => "name_desc",
            Self::CountryAsc => "country",
            Self::CountryDesc => "country_desc",
        }
    }

    fn order(self) -> SortSpec {
        match self {
            Self::NameAsc => SortSpec::asc(Field::Name),
            Self::NameDesc => SortSpec::desc(Field::Name),
            Self::CountryAsc => SortSpec::asc(Field::Country),
            Self::CountryDesc => SortSpec::desc(Field::Country),
        }
    }

    fn fallback() -> Self {
        Self::NameAsc
    }
}

impl Searchable for Destination {
    fn text(&self, field: Field) -> Option<&str> {
        match field {
            Field::Name | Field::DestinationName => Some(&self.name),
            Field::Country | Field::DestinationCountry => Some(&self.country),
            _ => None,
        }
    }

    fn sort_value(&self, field: Field) -> SortValue {
        match field {
            Field::Id => SortValue::Int(i64::from(self.row_id())),
            _ => self
                .text(field)
                .map(|text| SortValue::Text(text.to_lowercase()))
                .unwrap_or(SortValue::Missing),
        }
    }

    fn row_id(&self) -> Id {
        self.id.unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DestinationView {
    #[serde(flatten)]
    pub destination: Destination,
    pub created_on_display: String,
}

impl Resource for Destination {
    type Filter = DestinationFilter;
    type Sort = DestinationSort;
    type Detail = Destination;
    type View = DestinationView;

    const ROUTE: &'static str = "destinations";
    const LABEL: &'static str = "Destination";

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
            .required("name", &self.name, 100)
            .required("country", &self.country, 100)
            .optional("description", self.description.as_deref(), 200)
            .finish()
    }

    fn prepare_insert(&mut self) {
        self.created_on = Utc::now();
        self.version = 0;
    }

    fn present(detail: Self::Detail, formatting: &Formatting) -> Self::View {
        DestinationView {
            created_on_display: formatting.timestamp(&detail.created_on),
            destination: detail,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_and_country_filters_are_both_applied() {
        let filter = DestinationFilter {
            search_name: Some("Sun".to_string()),
            search_country: Some("Bul".to_string()),
        };
        let predicates = filter.predicates();

        assert_eq!(predicates.len(), 2);
        assert_eq!(predicates[0].fields, vec![Field::Name]);
        assert_eq!(predicates[1].fields, vec![Field::Country]);
    }

    #[test]
    fn unknown_sort_falls_back_to_name_ascending() {
        assert_eq!(DestinationSort::parse(None), DestinationSort::NameAsc);
        assert_eq!(DestinationSort::parse(Some("bogus")), DestinationSort::NameAsc);
        assert_eq!(
            DestinationSort::parse(Some("country_desc")),
            DestinationSort::CountryDesc
        );
    }

    #[test]
    fn description_over_200_chars_is_rejected() {
        let mut destination = Destination::new("Varna", "Bulgaria");
        destination.description = Some("x".repeat(201));

        let errors = destination.validate();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "description");
    }
}
