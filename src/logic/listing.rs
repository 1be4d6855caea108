use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::model::{ListingFilter, Resource, SortKey};
use crate::store::traits::{PageWindow, ResourceStore};

pub const PAGE_SIZE: u64 = 5;

/// Raw listing query string: the resource's filter fields plus sort and page.
///
/// `page` stays a string so a malformed value degrades to the first page
/// instead of rejecting the request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingParams<F> {
    #[serde(flatten)]
    pub filter: F,
    #[serde(rename = "sortOrder", default)]
    pub sort_order: Option<String>,
    #[serde(default)]
    pub page: Option<String>,
}

/// One page of a listing plus what the presentation layer needs to render
/// the filter form, the sort links and the pager.
#[derive(Debug, Clone, Serialize)]
pub struct ListingPage<T, F> {
    pub items: Vec<T>,
    pub current_page: u64,
    pub total_pages: u64,
    pub total_items: u64,
    pub page_size: u64,
    pub filter: F,
    pub current_sort: Option<String>,
    /// Column label to the sort key its header link should request next.
    pub sort_toggles: BTreeMap<&'static str, &'static str>,
}

impl<T, F> ListingPage<T, F> {
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> ListingPage<U, F> {
        ListingPage {
            items: self.items.into_iter().map(f).collect(),
            current_page: self.current_page,
            total_pages: self.total_pages,
            total_items: self.total_items,
            page_size: self.page_size,
            filter: self.filter,
            current_sort: self.current_sort,
            sort_toggles: self.sort_toggles,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ListingQuery<R: Resource> {
    pub filter: R::Filter,
    pub sort: R::Sort,
    pub raw_sort: Option<String>,
    pub page: u64,
}

impl<R: Resource> ListingQuery<R> {
    pub fn from_params(params: ListingParams<R::Filter>) -> Self {
        Self {
            sort: R::Sort::parse(params.sort_order.as_deref()),
            page: parse_page(params.page.as_deref()),
            raw_sort: params.sort_order,
            filter: params.filter,
        }
    }

    pub fn window(&self) -> PageWindow {
        PageWindow {
            offset: (self.page - 1).saturating_mul(PAGE_SIZE),
            limit: PAGE_SIZE,
        }
    }

    pub async fn execute<S>(self, store: &S) -> Result<ListingPage<R::Detail, R::Filter>>
    where
        S: ResourceStore<R> + ?Sized,
    {
        let predicates = self.filter.predicates();
        let total_items = store.count(&predicates).await?;
        let items = store
            .page(&predicates, self.sort.order(), self.window())
            .await?;

        log::debug!(
            "{} listing: page {} of {} ({} matching, sort {:?})",
            R::LABEL,
            self.page,
            total_pages(total_items),
            total_items,
            self.sort
        );

        Ok(ListingPage {
            items,
            current_page: self.page,
            total_pages: total_pages(total_items),
            total_items,
            page_size: PAGE_SIZE,
            sort_toggles: sort_toggles(self.sort),
            filter: self.filter,
            current_sort: self.raw_sort,
        })
    }
}

pub fn total_pages(total_items: u64) -> u64 {
    total_items.div_ceil(PAGE_SIZE)
}

/// Pages are 1-based; anything below 1 or unparsable means the first page.
pub fn parse_page(raw: Option<&str>) -> u64 {
    raw.and_then(|value| value.trim().parse::<i64>().ok())
        .and_then(|page| u64::try_from(page).ok())
        .filter(|page| *page >= 1)
        .unwrap_or(1)
}

/// For each sortable column, the key a click on its header should request:
/// descending when that column is currently ascending, ascending otherwise.
pub fn sort_toggles<K: SortKey>(current: K) -> BTreeMap<&'static str, &'static str> {
    K::COLUMNS
        .iter()
        .map(|(label, asc, desc)| {
            let next = if current == *asc { *desc } else { *asc };
            (*label, next.key())
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Destination, DestinationFilter, DestinationSort, OfferSort, TripSort};

    #[test]
    fn total_pages_rounds_up() {
        assert_eq!(total_pages(0), 0);
        assert_eq!(total_pages(1), 1);
        assert_eq!(total_pages(5), 1);
        assert_eq!(total_pages(6), 2);
        assert_eq!(total_pages(7), 2);
        assert_eq!(total_pages(11), 3);
    }

    #[test]
    fn page_numbers_below_one_clamp_to_first_page() {
        assert_eq!(parse_page(None), 1);
        assert_eq!(parse_page(Some("0")), 1);
        assert_eq!(parse_page(Some("-3")), 1);
        assert_eq!(parse_page(Some("abc")), 1);
        assert_eq!(parse_page(Some("4")), 4);
    }

    #[test]
    fn window_skips_previous_pages() {
        let query = ListingQuery::<Destination>::from_params(ListingParams {
            filter: DestinationFilter::default(),
            sort_order: None,
            page: Some("3".to_string()),
        });

        assert_eq!(
            query.window(),
            PageWindow {
                offset: 10,
                limit: 5
            }
        );
    }

    #[test]
    fn raw_sort_is_echoed_even_when_unrecognized() {
        let query = ListingQuery::<Destination>::from_params(ListingParams {
            filter: DestinationFilter::default(),
            sort_order: Some("bogus".to_string()),
            page: None,
        });

        assert_eq!(query.sort, DestinationSort::NameAsc);
        assert_eq!(query.raw_sort.as_deref(), Some("bogus"));
    }

    #[test]
    fn toggles_flip_only_the_active_column() {
        let toggles = sort_toggles(DestinationSort::NameAsc);
        assert_eq!(toggles["name"], "name_desc");
        assert_eq!(toggles["country"], "country");

        let toggles = sort_toggles(DestinationSort::CountryAsc);
        assert_eq!(toggles["name"], "");
        assert_eq!(toggles["country"], "country_desc");

        let toggles = sort_toggles(OfferSort::IdAsc);
        assert_eq!(toggles.len(), 1);
        assert_eq!(toggles["price"], "price_asc");
    }

    #[test]
    fn toggling_twice_returns_to_the_original_key() {
        for start in TripSort::ALL.iter().copied() {
            for (label, _, _) in TripSort::COLUMNS {
                let once = TripSort::parse(Some(sort_toggles(start)[label]));
                let twice = TripSort::parse(Some(sort_toggles(once)[label]));
                assert_eq!(sort_toggles(twice)[label], sort_toggles(start)[label]);
                assert_ne!(once, twice);
            }
        }
    }
}
