use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub type Id = i32;

/// Every column a listing can filter or sort on, across the three resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Id,
    Name,
    Title,
    Country,
    Price,
    DestinationName,
    DestinationCountry,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub field: Field,
    pub direction: Direction,
}

impl SortSpec {
    pub const fn asc(field: Field) -> Self {
        Self {
            field,
            direction: Direction::Asc,
        }
    }

    pub const fn desc(field: Field) -> Self {
        Self {
            field,
            direction: Direction::Desc,
        }
    }
}

/// Case-insensitive substring match of `term` against any of `fields`.
///
/// A listing's predicates are combined with AND; the fields inside one
/// predicate are alternatives (OR).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    pub fields: Vec<Field>,
    pub term: String,
}

impl Predicate {
    pub fn any_of(fields: &[Field], term: &str) -> Self {
        Self {
            fields: fields.to_vec(),
            term: term.to_string(),
        }
    }

    pub fn matches<T: Searchable + ?Sized>(&self, row: &T) -> bool {
        let needle = self.term.to_lowercase();
        self.fields.iter().any(|field| {
            row.text(*field)
                .map(|value| value.to_lowercase().contains(&needle))
                .unwrap_or(false)
        })
    }
}

/// Comparable value of a sortable column.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum SortValue {
    Int(i64),
    Text(String),
    Decimal(Decimal),
    Missing,
}

/// In-process access to the filterable and sortable columns of a row.
pub trait Searchable {
    fn text(&self, field: Field) -> Option<&str>;
    fn sort_value(&self, field: Field) -> SortValue;
    fn row_id(&self) -> Id;
}

/// Turns a filter value into a search term, dropping blank input.
pub fn search_term(raw: &Option<String>) -> Option<&str> {
    raw.as_deref().filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Row {
        name: String,
        country: String,
    }

    impl Searchable for Row {
        fn text(&self, field: Field) -> Option<&str> {
            match field {
                Field::Name => Some(&self.name),
                Field::Country => Some(&self.country),
                _ => None,
            }
        }

        fn sort_value(&self, _field: Field) -> SortValue {
            SortValue::Missing
        }

        fn row_id(&self) -> Id {
            1
        }
    }

    #[test]
    fn predicate_matches_any_field_ignoring_case() {
        let row = Row {
            name: "Sunny Beach".to_string(),
            country: "Bulgaria".to_string(),
        };

        assert!(Predicate::any_of(&[Field::Name, Field::Country], "BULG").matches(&row));
        assert!(Predicate::any_of(&[Field::Name], "sunny").matches(&row));
        assert!(!Predicate::any_of(&[Field::Name], "bulg").matches(&row));
        assert!(!Predicate::any_of(&[Field::Title], "sunny").matches(&row));
    }

    #[test]
    fn blank_search_terms_are_dropped() {
        assert_eq!(search_term(&None), None);
        assert_eq!(search_term(&Some("   ".to_string())), None);
        assert_eq!(search_term(&Some(" Rome".to_string())), Some(" Rome"));
    }
}
