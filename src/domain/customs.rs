use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::domain::types::{CustomsId, DeclaredPrice, EntryId};

/// Export customs declaration data kept alongside a catalog entry.
///
/// There is at most one record per entry and it is removed together with the
/// entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomsMetadata {
    pub id: CustomsId,
    pub entry_id: EntryId,
    /// Listing page the product was sourced from.
    pub source_url: Option<String>,
    pub declared_name_en: Option<String>,
    pub declared_name_cn: Option<String>,
    pub declared_price: DeclaredPrice,
    pub updated_at: NaiveDateTime,
}

/// Values written when creating or overwriting a [`CustomsMetadata`] record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewCustomsMetadata {
    pub entry_id: EntryId,
    pub source_url: Option<String>,
    pub declared_name_en: Option<String>,
    pub declared_name_cn: Option<String>,
    pub declared_price: DeclaredPrice,
}
