use chrono::NaiveDateTime;
use diesel::prelude::*;

use crate::domain::customs::{
    CustomsMetadata as DomainCustomsMetadata, NewCustomsMetadata as DomainNewCustomsMetadata,
};
use crate::domain::types::{DeclaredPrice, TypeConstraintError};

/// Diesel model representing the `customs_metadata` table.
#[derive(Debug, Clone, Identifiable, Queryable, Selectable)]
#[diesel(table_name = crate::schema::customs_metadata)]
pub struct CustomsMetadata {
    pub id: i32,
    pub entry_id: i32,
    pub source_url: Option<String>,
    pub declared_name_en: Option<String>,
    pub declared_name_cn: Option<String>,
    pub declared_price: f64,
    pub updated_at: NaiveDateTime,
}

/// Insertable/patchable form of [`CustomsMetadata`].
///
/// Optional columns are written as `NULL` when absent so an overwrite clears
/// values the new row no longer carries.
#[derive(Debug, Insertable, AsChangeset)]
#[diesel(table_name = crate::schema::customs_metadata)]
#[diesel(treat_none_as_null = true)]
pub struct NewCustomsMetadata<'a> {
    pub entry_id: i32,
    pub source_url: Option<&'a str>,
    pub declared_name_en: Option<&'a str>,
    pub declared_name_cn: Option<&'a str>,
    pub declared_price: f64,
    pub updated_at: NaiveDateTime,
}

impl TryFrom<CustomsMetadata> for DomainCustomsMetadata {
    type Error = TypeConstraintError;

    fn try_from(metadata: CustomsMetadata) -> Result<Self, Self::Error> {
        Ok(Self {
            id: metadata.id.try_into()?,
            entry_id: metadata.entry_id.try_into()?,
            source_url: metadata.source_url,
            declared_name_en: metadata.declared_name_en,
            declared_name_cn: metadata.declared_name_cn,
            declared_price: DeclaredPrice::new(metadata.declared_price)?,
            updated_at: metadata.updated_at,
        })
    }
}

impl<'a> NewCustomsMetadata<'a> {
    pub fn from_domain(metadata: &'a DomainNewCustomsMetadata, now: NaiveDateTime) -> Self {
        Self {
            entry_id: metadata.entry_id.get(),
            source_url: metadata.source_url.as_deref(),
            declared_name_en: metadata.declared_name_en.as_deref(),
            declared_name_cn: metadata.declared_name_cn.as_deref(),
            declared_price: metadata.declared_price.get(),
            updated_at: now,
        }
    }
}
