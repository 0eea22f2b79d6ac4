use chrono::{TimeZone, Utc};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::review::{Rating, Review, sort_newest_first};
use crate::store::KeyValueStore;

use super::{ReviewSource, SourceKind};

pub const LOCAL_KEY: &str = "goldensky_reviews";

/// Reviews kept entirely in the local store. The store is the primary copy,
/// so it never expires and is never pruned.
pub struct LocalSource<S> {
    store: S,
}

impl<S: KeyValueStore> LocalSource<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Stored records in storage order, or `None` if the key was never written.
    fn read(&self) -> Result<Option<Vec<Review>>> {
        let Some(raw) = self.store.get(LOCAL_KEY)? else {
            return Ok(None);
        };
        match serde_json::from_str::<Vec<Review>>(&raw) {
            Ok(reviews) => Ok(Some(reviews)),
            Err(e) => {
                warn!(error = %e, "corrupted local reviews, treating as empty");
                Ok(Some(Vec::new()))
            }
        }
    }

    fn write(&self, reviews: &[Review]) -> Result<()> {
        let json = serde_json::to_string(reviews)
            .map_err(|e| Error::Store(format!("failed to serialize local reviews: {e}")))?;
        self.store.set(LOCAL_KEY, &json)
    }

    /// Prepend a record to the stored list.
    pub fn append(&self, review: &Review) -> Result<()> {
        let mut reviews = self.read()?.unwrap_or_default();
        reviews.insert(0, review.clone());
        self.write(&reviews)?;
        debug!(id = %review.id, total = reviews.len(), "appended local review");
        Ok(())
    }

    /// Stored records newest-first, empty if the key was never written.
    /// Unlike `fetch_reviews`, this never seeds the starter reviews.
    pub fn stored_reviews(&self) -> Result<Vec<Review>> {
        let mut reviews = self.read()?.unwrap_or_default();
        sort_newest_first(&mut reviews);
        Ok(reviews)
    }

    /// Locally submitted records still awaiting moderation.
    pub fn pending_reviews(&self) -> Result<Vec<Review>> {
        Ok(self
            .read()?
            .unwrap_or_default()
            .into_iter()
            .filter(|r| r.pending)
            .collect())
    }
}

impl<S: KeyValueStore> ReviewSource for LocalSource<S> {
    fn fetch_reviews(&self) -> Result<Vec<Review>> {
        let mut reviews = match self.read()? {
            Some(reviews) => reviews,
            None => {
                let seeded = sample_reviews();
                self.write(&seeded)?;
                info!(count = seeded.len(), "seeded local review store");
                seeded
            }
        };
        sort_newest_first(&mut reviews);
        debug!(count = reviews.len(), "fetched local reviews");
        Ok(reviews)
    }

    fn kind(&self) -> SourceKind {
        SourceKind::Local
    }
}

/// Starter testimonials written on first use of an empty store.
pub fn sample_reviews() -> Vec<Review> {
    let samples = [
        (
            "1",
            "Sarah M.",
            "sarah@example.com",
            5,
            (2024, 2, 15),
            "Amazing experience! The sunset desert safari was breathtaking. Our guide Ahmed was \
             very knowledgeable and made us feel safe throughout the dune bashing. The Inland Sea \
             visit was magical and the photos turned out incredible. Will definitely recommend to \
             friends visiting Qatar!",
        ),
        (
            "2",
            "James R.",
            "james@example.com",
            5,
            (2024, 1, 20),
            "Perfect family adventure! The kids loved the camel ride and sand boarding. \
             Professional service from pickup to dropoff. The driver was punctual and the vehicle \
             was very comfortable. Highly recommended for families!",
        ),
        (
            "3",
            "Fatima A.",
            "fatima@example.com",
            4,
            (2023, 12, 10),
            "Great value for money! The Inland Sea visit was magical. Very organized tour with \
             excellent photo opportunities. The only minor issue was that we waited 10 minutes \
             for pickup, but everything else was perfect.",
        ),
    ];

    samples
        .into_iter()
        .filter_map(|(id, name, email, stars, (y, m, d), content)| {
            Some(Review {
                id: id.to_string(),
                issue_number: None,
                name: name.to_string(),
                email: email.to_string(),
                tour: "Half Day Desert Safari".to_string(),
                content: content.to_string(),
                rating: Rating::new(stars)?,
                created_at: Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).single()?,
                approved: true,
                verified: true,
                pending: false,
                source_url: None,
                comments: 0,
                labels: Vec::new(),
            })
        })
        .collect()
}
