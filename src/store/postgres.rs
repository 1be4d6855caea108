use anyhow::{anyhow, Context, Result};
use sqlx::{
    postgres::{PgPoolOptions, PgRow},
    PgPool, Postgres, QueryBuilder, Row,
};

use crate::model::{
    Destination, Direction, Field, Id, Offer, OfferDetail, Predicate, SortSpec, Trip, TripDetail,
};
use crate::store::traits::{DestinationOptions, PageWindow, ResourceStore, WriteOutcome};

/// Destination columns, aliased so every query maps them the same way.
macro_rules! destination_columns {
    () => {
        "d.id AS d_id, d.name AS d_name, d.country AS d_country, \
         d.description AS d_description, d.image_url AS d_image_url, \
         d.created_on AS d_created_on, d.is_active AS d_is_active, d.version AS d_version"
    };
}

const DESTINATION_COLUMNS: &str = destination_columns!();

/// How one resource's listing maps onto SQL.
struct Listing {
    label: &'static str,
    from: &'static str,
    select: &'static str,
    id_column: &'static str,
    joins_destination: bool,
    column: fn(Field) -> Option<&'static str>,
}

const DESTINATIONS: Listing = Listing {
    label: "destinations",
    from: " FROM destinations d",
    select: concat!("SELECT ", destination_columns!()),
    id_column: "d.id",
    joins_destination: false,
    column: |field| match field {
        Field::Id => Some("d.id"),
        Field::Name | Field::DestinationName => Some("d.name"),
        Field::Country | Field::DestinationCountry => Some("d.country"),
        _ => None,
    },
};

const TRIPS: Listing = Listing {
    label: "trips",
    from: " FROM trips t JOIN destinations d ON d.id = t.destination_id",
    select: "SELECT t.id, t.name, t.departure_date, t.destination_id, t.price, t.seats, t.version",
    id_column: "t.id",
    joins_destination: true,
    column: |field| match field {
        Field::Id => Some("t.id"),
        Field::Name => Some("t.name"),
        Field::Price => Some("t.price"),
        Field::DestinationName => Some("d.name"),
        Field::Country | Field::DestinationCountry => Some("d.country"),
        Field::Title => None,
    },
};

const OFFERS: Listing = Listing {
    label: "offers",
    from: " FROM offers o JOIN destinations d ON d.id = o.destination_id",
    select: "SELECT o.id, o.title, o.destination_id, o.price, o.payment_method, o.start_date, o.version",
    id_column: "o.id",
    joins_destination: true,
    column: |field| match field {
        Field::Id => Some("o.id"),
        Field::Title | Field::Name => Some("o.title"),
        Field::Price => Some("o.price"),
        Field::DestinationName => Some("d.name"),
        Field::Country | Field::DestinationCountry => Some("d.country"),
    },
};

fn is_text(field: Field) -> bool {
    !matches!(field, Field::Id | Field::Price)
}

/// `%term%` with LIKE wildcards in the term matched literally.
fn like_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

impl Listing {
    fn column_for(&self, field: Field) -> Result<&'static str> {
        (self.column)(field)
            .ok_or_else(|| anyhow!("{:?} is not a column of {}", field, self.label))
    }

    fn push_where(&self, qb: &mut QueryBuilder<'_, Postgres>, predicates: &[Predicate]) -> Result<()> {
        for (i, predicate) in predicates.iter().enumerate() {
            qb.push(if i == 0 { " WHERE (" } else { " AND (" });
            for (j, field) in predicate.fields.iter().enumerate() {
                if j > 0 {
                    qb.push(" OR ");
                }
                qb.push(self.column_for(*field)?)
                    .push(" ILIKE ")
                    .push_bind(like_pattern(&predicate.term))
                    .push(" ESCAPE '\\'");
            }
            qb.push(")");
        }
        Ok(())
    }

    fn count_query(&self, predicates: &[Predicate]) -> Result<QueryBuilder<'static, Postgres>> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*)");
        qb.push(self.from);
        self.push_where(&mut qb, predicates)?;
        Ok(qb)
    }

    fn page_query(
        &self,
        predicates: &[Predicate],
        sort: SortSpec,
        window: PageWindow,
    ) -> Result<QueryBuilder<'static, Postgres>> {
        let mut qb = QueryBuilder::new(self.select);
        if self.joins_destination {
            qb.push(", ").push(DESTINATION_COLUMNS);
        }
        qb.push(self.from);
        self.push_where(&mut qb, predicates)?;

        let column = self.column_for(sort.field)?;
        qb.push(" ORDER BY ");
        if is_text(sort.field) {
            qb.push("LOWER(").push(column).push(")");
        } else {
            qb.push(column);
        }
        qb.push(match sort.direction {
            Direction::Asc => " ASC",
            Direction::Desc => " DESC",
        });
        qb.push(", ").push(self.id_column).push(" ASC");

        qb.push(" LIMIT ")
            .push_bind(i64::try_from(window.limit).unwrap_or(i64::MAX))
            .push(" OFFSET ")
            .push_bind(i64::try_from(window.offset).unwrap_or(i64::MAX));
        Ok(qb)
    }
}

fn destination_from_row(row: &PgRow) -> Result<Destination> {
    Ok(Destination {
        id: Some(row.try_get("d_id")?),
        name: row.try_get("d_name")?,
        country: row.try_get("d_country")?,
        description: row.try_get("d_description")?,
        image_url: row.try_get("d_image_url")?,
        created_on: row.try_get("d_created_on")?,
        is_active: row.try_get("d_is_active")?,
        version: row.try_get("d_version")?,
    })
}

fn trip_from_row(row: &PgRow) -> Result<Trip> {
    Ok(Trip {
        id: Some(row.try_get("id")?),
        name: row.try_get("name")?,
        departure_date: row.try_get("departure_date")?,
        destination_id: row.try_get("destination_id")?,
        price: row.try_get("price")?,
        seats: row.try_get("seats")?,
        version: row.try_get("version")?,
    })
}

fn offer_from_row(row: &PgRow) -> Result<Offer> {
    Ok(Offer {
        id: Some(row.try_get("id")?),
        title: row.try_get("title")?,
        destination_id: row.try_get("destination_id")?,
        price: row.try_get("price")?,
        payment_method: row.try_get("payment_method")?,
        start_date: row.try_get("start_date")?,
        version: row.try_get("version")?,
    })
}

fn trip_detail_from_row(row: &PgRow) -> Result<TripDetail> {
    Ok(TripDetail {
        trip: trip_from_row(row)?,
        destination: destination_from_row(row)?,
    })
}

fn offer_detail_from_row(row: &PgRow) -> Result<OfferDetail> {
    Ok(OfferDetail {
        offer: offer_from_row(row)?,
        destination: destination_from_row(row)?,
    })
}

#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Create a new PostgreSQL store with the given database URL
    pub async fn new(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .context("Failed to create PostgreSQL connection pool")?;

        Ok(Self { pool })
    }

    /// Run the embedded schema migrations
    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .context("Failed to run database migrations")?;
        Ok(())
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn count_rows(&self, listing: &Listing, predicates: &[Predicate]) -> Result<u64> {
        let count: i64 = listing
            .count_query(predicates)?
            .build()
            .fetch_one(&self.pool)
            .await
            .with_context(|| format!("Failed to count {}", listing.label))?
            .try_get(0)?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    async fn page_rows(
        &self,
        listing: &Listing,
        predicates: &[Predicate],
        sort: SortSpec,
        window: PageWindow,
    ) -> Result<Vec<PgRow>> {
        listing
            .page_query(predicates, sort, window)?
            .build()
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("Failed to list {}", listing.label))
    }

    async fn delete_row(&self, table: &str, id: Id) -> Result<bool> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(&format!("DELETE FROM {} WHERE id = $1", table))
            .bind(id)
            .execute(&mut *tx)
            .await
            .with_context(|| format!("Failed to delete from {}", table))?;
        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn row_exists(&self, table: &str, id: Id) -> Result<bool> {
        let exists: bool = sqlx::query(&format!(
            "SELECT EXISTS(SELECT 1 FROM {} WHERE id = $1)",
            table
        ))
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .with_context(|| format!("Failed to check {}", table))?
        .try_get(0)?;
        Ok(exists)
    }
}

fn outcome(rows_affected: u64) -> WriteOutcome {
    if rows_affected == 0 {
        WriteOutcome::Conflict
    } else {
        WriteOutcome::Applied
    }
}

#[async_trait::async_trait]
impl ResourceStore<Destination> for PostgresStore {
    async fn count(&self, predicates: &[Predicate]) -> Result<u64> {
        self.count_rows(&DESTINATIONS, predicates).await
    }

    async fn page(
        &self,
        predicates: &[Predicate],
        sort: SortSpec,
        window: PageWindow,
    ) -> Result<Vec<Destination>> {
        self.page_rows(&DESTINATIONS, predicates, sort, window)
            .await?
            .iter()
            .map(destination_from_row)
            .collect()
    }

    async fn get_detail(&self, id: Id) -> Result<Option<Destination>> {
        ResourceStore::<Destination>::find(self, id).await
    }

    async fn find(&self, id: Id) -> Result<Option<Destination>> {
        let row = sqlx::query(&format!("{} FROM destinations d WHERE d.id = $1", DESTINATIONS.select))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch destination")?;

        row.as_ref().map(destination_from_row).transpose()
    }

    async fn exists(&self, id: Id) -> Result<bool> {
        self.row_exists("destinations", id).await
    }

    async fn insert(&self, mut record: Destination) -> Result<Destination> {
        let mut tx = self.pool.begin().await?;
        let id: Id = sqlx::query(
            r#"
            INSERT INTO destinations (name, country, description, image_url, created_on, is_active, version)
            VALUES ($1, $2, $3, $4, $5, $6, 0)
            RETURNING id
            "#,
        )
        .bind(&record.name)
        .bind(&record.country)
        .bind(&record.description)
        .bind(&record.image_url)
        .bind(record.created_on)
        .bind(record.is_active)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to insert destination")?
        .try_get("id")?;
        tx.commit().await?;

        record.id = Some(id);
        record.version = 0;
        Ok(record)
    }

    async fn update(&self, record: &Destination) -> Result<WriteOutcome> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            r#"
            UPDATE destinations SET
                name = $1,
                country = $2,
                description = $3,
                image_url = $4,
                is_active = $5,
                version = version + 1
            WHERE id = $6 AND version = $7
            "#,
        )
        .bind(&record.name)
        .bind(&record.country)
        .bind(&record.description)
        .bind(&record.image_url)
        .bind(record.is_active)
        .bind(record.id)
        .bind(record.version)
        .execute(&mut *tx)
        .await
        .context("Failed to update destination")?;
        tx.commit().await?;

        Ok(outcome(result.rows_affected()))
    }

    async fn delete(&self, id: Id) -> Result<bool> {
        self.delete_row("destinations", id).await
    }
}

#[async_trait::async_trait]
impl ResourceStore<Trip> for PostgresStore {
    async fn count(&self, predicates: &[Predicate]) -> Result<u64> {
        self.count_rows(&TRIPS, predicates).await
    }

    async fn page(
        &self,
        predicates: &[Predicate],
        sort: SortSpec,
        window: PageWindow,
    ) -> Result<Vec<TripDetail>> {
        self.page_rows(&TRIPS, predicates, sort, window)
            .await?
            .iter()
            .map(trip_detail_from_row)
            .collect()
    }

    async fn get_detail(&self, id: Id) -> Result<Option<TripDetail>> {
        let row = sqlx::query(&format!(
            "{}, {}{} WHERE t.id = $1",
            TRIPS.select, DESTINATION_COLUMNS, TRIPS.from
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch trip")?;

        row.as_ref().map(trip_detail_from_row).transpose()
    }

    async fn find(&self, id: Id) -> Result<Option<Trip>> {
        let row = sqlx::query(&format!("{} FROM trips t WHERE t.id = $1", TRIPS.select))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch trip")?;

        row.as_ref().map(trip_from_row).transpose()
    }

    async fn exists(&self, id: Id) -> Result<bool> {
        self.row_exists("trips", id).await
    }

    async fn insert(&self, mut record: Trip) -> Result<Trip> {
        let mut tx = self.pool.begin().await?;
        let id: Id = sqlx::query(
            r#"
            INSERT INTO trips (name, departure_date, destination_id, price, seats, version)
            VALUES ($1, $2, $3, $4, $5, 0)
            RETURNING id
            "#,
        )
        .bind(&record.name)
        .bind(record.departure_date)
        .bind(record.destination_id)
        .bind(record.price)
        .bind(record.seats)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to insert trip")?
        .try_get("id")?;
        tx.commit().await?;

        record.id = Some(id);
        record.version = 0;
        Ok(record)
    }

    async fn update(&self, record: &Trip) -> Result<WriteOutcome> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            r#"
            UPDATE trips SET
                name = $1,
                departure_date = $2,
                destination_id = $3,
                price = $4,
                seats = $5,
                version = version + 1
            WHERE id = $6 AND version = $7
            "#,
        )
        .bind(&record.name)
        .bind(record.departure_date)
        .bind(record.destination_id)
        .bind(record.price)
        .bind(record.seats)
        .bind(record.id)
        .bind(record.version)
        .execute(&mut *tx)
        .await
        .context("Failed to update trip")?;
        tx.commit().await?;

        Ok(outcome(result.rows_affected()))
    }

    async fn delete(&self, id: Id) -> Result<bool> {
        self.delete_row("trips", id).await
    }
}

#[async_trait::async_trait]
impl ResourceStore<Offer> for PostgresStore {
    async fn count(&self, predicates: &[Predicate]) -> Result<u64> {
        self.count_rows(&OFFERS, predicates).await
    }

    async fn page(
        &self,
        predicates: &[Predicate],
        sort: SortSpec,
        window: PageWindow,
    ) -> Result<Vec<OfferDetail>> {
        self.page_rows(&OFFERS, predicates, sort, window)
            .await?
            .iter()
            .map(offer_detail_from_row)
            .collect()
    }

    async fn get_detail(&self, id: Id) -> Result<Option<OfferDetail>> {
        let row = sqlx::query(&format!(
            "{}, {}{} WHERE o.id = $1",
            OFFERS.select, DESTINATION_COLUMNS, OFFERS.from
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch offer")?;

        row.as_ref().map(offer_detail_from_row).transpose()
    }

    async fn find(&self, id: Id) -> Result<Option<Offer>> {
        let row = sqlx::query(&format!("{} FROM offers o WHERE o.id = $1", OFFERS.select))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch offer")?;

        row.as_ref().map(offer_from_row).transpose()
    }

    async fn exists(&self, id: Id) -> Result<bool> {
        self.row_exists("offers", id).await
    }

    async fn insert(&self, mut record: Offer) -> Result<Offer> {
        let mut tx = self.pool.begin().await?;
        let id: Id = sqlx::query(
            r#"
            INSERT INTO offers (title, destination_id, price, payment_method, start_date, version)
            VALUES ($1, $2, $3, $4, $5, 0)
            RETURNING id
            "#,
        )
        .bind(&record.title)
        .bind(record.destination_id)
        .bind(record.price)
        .bind(&record.payment_method)
        .bind(record.start_date)
        .fetch_one(&mut *tx)
        .await
        .context("Failed to insert offer")?
        .try_get("id")?;
        tx.commit().await?;

        record.id = Some(id);
        record.version = 0;
        Ok(record)
    }

    async fn update(&self, record: &Offer) -> Result<WriteOutcome> {
        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            r#"
            UPDATE offers SET
                title = $1,
                destination_id = $2,
                price = $3,
                payment_method = $4,
                start_date = $5,
                version = version + 1
            WHERE id = $6 AND version = $7
            "#,
        )
        .bind(&record.title)
        .bind(record.destination_id)
        .bind(record.price)
        .bind(&record.payment_method)
        .bind(record.start_date)
        .bind(record.id)
        .bind(record.version)
        .execute(&mut *tx)
        .await
        .context("Failed to update offer")?;
        tx.commit().await?;

        Ok(outcome(result.rows_affected()))
    }

    async fn delete(&self, id: Id) -> Result<bool> {
        self.delete_row("offers", id).await
    }
}

#[async_trait::async_trait]
impl DestinationOptions for PostgresStore {
    async fn list_destinations(&self) -> Result<Vec<Destination>> {
        let rows = sqlx::query(&format!("{} FROM destinations d ORDER BY d.id", DESTINATIONS.select))
            .fetch_all(&self.pool)
            .await
            .context("Failed to list destinations")?;

        rows.iter().map(destination_from_row).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("Rome"), "%Rome%");
        assert_eq!(like_pattern("50%_off\\"), "%50\\%\\_off\\\\%");
    }

    #[test]
    fn trip_search_joins_destination_country() {
        let predicates = vec![Predicate::any_of(
            &[Field::Name, Field::DestinationCountry],
            "gr",
        )];
        let qb = TRIPS
            .page_query(
                &predicates,
                SortSpec::desc(Field::Price),
                PageWindow {
                    offset: 5,
                    limit: 5,
                },
            )
            .unwrap();

        let sql = qb.sql();
        assert!(sql.contains("JOIN destinations d ON d.id = t.destination_id"));
        assert!(sql.contains("WHERE (t.name ILIKE $1 ESCAPE '\\' OR d.country ILIKE $2 ESCAPE '\\')"));
        assert!(sql.contains("ORDER BY t.price DESC, t.id ASC LIMIT $3 OFFSET $4"));
    }

    #[test]
    fn destination_filters_are_anded_and_sorted_case_insensitively() {
        let predicates = vec![
            Predicate::any_of(&[Field::Name], "sun"),
            Predicate::any_of(&[Field::Country], "bul"),
        ];
        let qb = DESTINATIONS.count_query(&predicates).unwrap();
        assert_eq!(
            qb.sql(),
            "SELECT COUNT(*) FROM destinations d WHERE (d.name ILIKE $1 ESCAPE '\\') AND (d.country ILIKE $2 ESCAPE '\\')"
        );

        let qb = DESTINATIONS
            .page_query(&[], SortSpec::asc(Field::Country), PageWindow { offset: 0, limit: 5 })
            .unwrap();
        assert!(qb.sql().contains("ORDER BY LOWER(d.country) ASC, d.id ASC"));
    }

    #[test]
    fn every_listing_reads_the_same_destination_columns() {
        assert_eq!(
            DESTINATIONS.select,
            format!("SELECT {}", DESTINATION_COLUMNS)
        );
        let qb = OFFERS
            .page_query(&[], SortSpec::asc(Field::Id), PageWindow { offset: 0, limit: 5 })
            .unwrap();
        assert!(qb.sql().contains(DESTINATION_COLUMNS));
    }

    #[test]
    fn unknown_column_is_an_error() {
        let predicates = vec![Predicate::any_of(&[Field::Title], "x")];
        assert!(TRIPS.count_query(&predicates).is_err());
    }
}
