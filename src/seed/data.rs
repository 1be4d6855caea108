use crate::model::{Destination, Id, Offer, Trip};
use crate::store::traits::{ResourceStore, Store};
use anyhow::{Context, Result};
use chrono::NaiveDate;
use rust_decimal::Decimal;

/// Demo catalog: destinations, then trips and offers pointing at them.
///
/// Does nothing when destinations already exist.
pub async fn load_seed_data<S: Store>(store: &S) -> Result<()> {
    if ResourceStore::<Destination>::count(store, &[]).await? > 0 {
        log::info!("Destinations already present; skipping seed data");
        return Ok(());
    }

    let destinations = load_destinations(store).await?;
    load_trips(store, &destinations).await?;
    load_offers(store, &destinations).await?;

    log::info!(
        "Seed data loaded: {} destinations with trips and offers",
        destinations.len()
    );
    Ok(())
}

fn destination(name: &str, country: &str, description: &str, image: &str) -> Destination {
    let mut destination = Destination::new(name, country);
    destination.description = Some(description.to_string());
    destination.image_url = Some(format!("/static/images/{}", image));
    destination
}

fn date(year: i32, month: u32, day: u32) -> Result<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, day)
        .with_context(|| format!("invalid seed date {}-{}-{}", year, month, day))
}

async fn load_destinations<S: Store>(store: &S) -> Result<Vec<Id>> {
    let catalog = vec![
        destination("Sunny Beach", "Bulgaria", "Long sandy beach on the Black Sea coast", "sunny-beach.jpg"),
        destination("Bansko", "Bulgaria", "Ski resort at the foot of the Pirin mountains", "bansko.jpg"),
        destination("Santorini", "Greece", "Whitewashed villages above the caldera", "santorini.jpg"),
        destination("Rome", "Italy", "The Eternal City", "rome.jpg"),
        destination("Barcelona", "Spain", "Gaudi, tapas and the Mediterranean", "barcelona.jpg"),
        destination("Lisbon", "Portugal", "Seven hills and the Tagus river", "lisbon.jpg"),
        destination("Vienna", "Austria", "Imperial palaces and coffee houses", "vienna.jpg"),
    ];

    let mut ids = Vec::with_capacity(catalog.len());
    for mut record in catalog {
        record.version = 0;
        let created = ResourceStore::<Destination>::insert(store, record).await?;
        ids.extend(created.id);
    }
    Ok(ids)
}

async fn load_trips<S: Store>(store: &S, destinations: &[Id]) -> Result<()> {
    let trips = [
        ("Black Sea Summer", 0, date(2025, 7, 5)?, Decimal::new(64900, 2), 40),
        ("Pirin Ski Week", 1, date(2025, 1, 18)?, Decimal::new(89000, 2), 24),
        ("Cyclades Island Hopping", 2, date(2025, 6, 12)?, Decimal::new(129900, 2), 18),
        ("Roman Holiday", 3, date(2025, 4, 20)?, Decimal::new(75000, 2), 30),
        ("Catalan Weekend", 4, date(2025, 5, 9)?, Decimal::new(49900, 2), 25),
        ("Atlantic Coast Tour", 5, date(2025, 9, 1)?, Decimal::new(99000, 2), 20),
    ];

    for (name, index, departure_date, price, seats) in trips {
        let Some(&destination_id) = destinations.get(index) else {
            continue;
        };
        let trip = Trip {
            id: None,
            name: name.to_string(),
            departure_date,
            destination_id,
            price,
            seats,
            version: 0,
        };
        ResourceStore::<Trip>::insert(store, trip).await?;
    }
    Ok(())
}

async fn load_offers<S: Store>(store: &S, destinations: &[Id]) -> Result<()> {
    let offers = [
        ("Early booking -20%", 0, Decimal::new(51900, 2), Some("Bank transfer"), date(2025, 3, 1)?),
        ("Last minute Santorini", 2, Decimal::new(99900, 2), Some("Card"), date(2025, 6, 1)?),
        ("Vienna Christmas markets", 6, Decimal::new(45000, 2), None, date(2025, 12, 1)?),
    ];

    for (title, index, price, payment_method, start_date) in offers {
        let Some(&destination_id) = destinations.get(index) else {
            continue;
        };
        let offer = Offer {
            id: None,
            title: title.to_string(),
            destination_id,
            price,
            payment_method: payment_method.map(str::to_string),
            start_date,
            version: 0,
        };
        ResourceStore::<Offer>::insert(store, offer).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    #[tokio::test]
    async fn seeding_is_idempotent() {
        let store = MemoryStore::new();

        load_seed_data(&store).await.unwrap();
        let first = store.row_counts();
        load_seed_data(&store).await.unwrap();

        assert_eq!(first, (7, 6, 3));
        assert_eq!(store.row_counts(), first);
    }
}
