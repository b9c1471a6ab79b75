use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::types::{
    CostPrice, EntryId, EntryName, FailCount, ImageUrl, LocationId, Sku, Weight,
};

/// Number of consecutive download failures after which an entry stops being
/// selected for image backfill.
pub const IMAGE_FAILURE_THRESHOLD: i32 = 3;

/// A product in the catalog, keyed by its SKU.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: EntryId,
    pub sku: Sku,
    pub name: EntryName,
    pub weight: Weight,
    pub cost_price: CostPrice,
    pub stock_location_id: Option<LocationId>,
    /// Raw image location. Other writers may store values that are not valid
    /// URLs, so validation happens at download time.
    pub image_url: Option<String>,
    #[serde(skip)]
    pub image: Option<Vec<u8>>,
    pub image_fail_count: FailCount,
    pub image_download_failed: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Where an entry stands with respect to image backfill.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageState {
    /// No image URL recorded.
    Missing,
    /// URL recorded, payload not yet downloaded.
    Pending,
    /// Payload stored.
    Downloaded,
    /// Retries exhausted; excluded until an operator resets the entry.
    Failed,
}

impl CatalogEntry {
    pub fn has_image(&self) -> bool {
        self.image.as_ref().is_some_and(|bytes| !bytes.is_empty())
    }

    pub fn image_state(&self) -> ImageState {
        if self.has_image() {
            ImageState::Downloaded
        } else if self.image_download_failed {
            ImageState::Failed
        } else if self
            .image_url
            .as_deref()
            .is_some_and(|url| !url.trim().is_empty())
        {
            ImageState::Pending
        } else {
            ImageState::Missing
        }
    }
}

/// Information required to create a new [`CatalogEntry`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCatalogEntry {
    pub sku: Sku,
    pub name: EntryName,
    pub weight: Weight,
    pub cost_price: CostPrice,
    pub stock_location_id: Option<LocationId>,
    pub image_url: Option<ImageUrl>,
}

impl NewCatalogEntry {
    pub fn new(sku: Sku, name: EntryName) -> Self {
        Self {
            sku,
            name,
            weight: Weight::default(),
            cost_price: CostPrice::default(),
            stock_location_id: None,
            image_url: None,
        }
    }
}

/// Partial update of an existing entry. `None` leaves the field untouched.
///
/// Setting `image_url` also clears the stored payload and failure
/// bookkeeping so the entry becomes pending again.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogEntryChanges {
    pub name: Option<EntryName>,
    pub weight: Option<Weight>,
    pub cost_price: Option<CostPrice>,
    pub stock_location_id: Option<LocationId>,
    pub image_url: Option<ImageUrl>,
}

impl CatalogEntryChanges {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.weight.is_none()
            && self.cost_price.is_none()
            && self.stock_location_id.is_none()
            && self.image_url.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn entry() -> CatalogEntry {
        let now = DateTime::from_timestamp(0, 0).unwrap().naive_utc();
        CatalogEntry {
            id: EntryId::new(1).unwrap(),
            sku: Sku::new("SKU-1").unwrap(),
            name: EntryName::new("Mug").unwrap(),
            weight: Weight::default(),
            cost_price: CostPrice::default(),
            stock_location_id: None,
            image_url: None,
            image: None,
            image_fail_count: FailCount::default(),
            image_download_failed: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn image_state_follows_url_payload_and_flag() {
        let mut e = entry();
        assert_eq!(e.image_state(), ImageState::Missing);

        e.image_url = Some("https://cdn.example.com/mug.jpg".into());
        assert_eq!(e.image_state(), ImageState::Pending);

        e.image = Some(vec![]);
        assert_eq!(e.image_state(), ImageState::Pending);

        e.image_download_failed = true;
        assert_eq!(e.image_state(), ImageState::Failed);

        e.image = Some(vec![1, 2, 3]);
        assert_eq!(e.image_state(), ImageState::Downloaded);
    }

    #[test]
    fn empty_changes_are_detected() {
        assert!(CatalogEntryChanges::default().is_empty());
        let changes = CatalogEntryChanges {
            weight: Some(Weight::new(1.0).unwrap()),
            ..Default::default()
        };
        assert!(!changes.is_empty());
    }
}
