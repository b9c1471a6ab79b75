//! Column layouts of the marketplace export templates.
//!
//! Each supported export is described by a [`PlatformProfile`] in a static
//! table. Supporting a new marketplace means adding a table entry; the
//! reconciliation code never branches on the platform tag.

use serde::Serialize;

use crate::domain::types::{EntryName, Sku, TypeConstraintError};

/// Zero-based column positions of the fields read from a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColumnMapping {
    pub sku: usize,
    pub name_en: usize,
    pub name_cn: usize,
    pub image_url: usize,
    pub declared_url: usize,
    pub declared_name_en: usize,
    pub declared_name_cn: usize,
    pub declared_price: usize,
    pub weight: usize,
    pub cost: usize,
}

/// How a display name is built for a newly created entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NamingRule {
    /// English name, else Chinese name, else the SKU.
    PreferEnglish,
    /// English name, Chinese name and SKU joined with spaces.
    Concatenate,
}

impl NamingRule {
    pub fn display_name(
        self,
        name_en: &str,
        name_cn: &str,
        sku: &Sku,
    ) -> Result<EntryName, TypeConstraintError> {
        let name_en = name_en.trim();
        let name_cn = name_cn.trim();
        match self {
            Self::PreferEnglish => {
                let name = [name_en, name_cn]
                    .into_iter()
                    .find(|name| !name.is_empty())
                    .unwrap_or(sku.as_str());
                EntryName::new(name)
            }
            Self::Concatenate => {
                let name = [name_en, name_cn, sku.as_str()]
                    .into_iter()
                    .filter(|part| !part.is_empty())
                    .collect::<Vec<_>>()
                    .join(" ");
                EntryName::new(name)
            }
        }
    }
}

/// A marketplace export template.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PlatformProfile {
    pub tag: &'static str,
    pub columns: ColumnMapping,
    pub naming: NamingRule,
}

/// Generic template used for unknown platforms.
pub const DEFAULT_PROFILE: PlatformProfile = PlatformProfile {
    tag: "default",
    columns: ColumnMapping {
        sku: 0,
        name_cn: 2,
        name_en: 3,
        image_url: 6,
        weight: 7,
        cost: 8,
        declared_url: 13,
        declared_name_en: 15,
        declared_name_cn: 16,
        declared_price: 18,
    },
    naming: NamingRule::PreferEnglish,
};

const PROFILES: &[PlatformProfile] = &[
    PlatformProfile {
        tag: "dianxiaomi",
        columns: ColumnMapping {
            sku: 0,
            name_cn: 1,
            name_en: 2,
            image_url: 3,
            weight: 4,
            cost: 5,
            declared_url: 6,
            declared_name_en: 7,
            declared_name_cn: 8,
            declared_price: 9,
        },
        naming: NamingRule::Concatenate,
    },
    PlatformProfile {
        tag: "mabangerp",
        columns: ColumnMapping {
            sku: 1,
            name_cn: 2,
            name_en: 3,
            image_url: 5,
            weight: 8,
            cost: 9,
            declared_url: 12,
            declared_name_cn: 13,
            declared_name_en: 14,
            declared_price: 15,
        },
        naming: NamingRule::PreferEnglish,
    },
];

/// Marketplace tags offered by the upload form, with their display labels.
pub const KNOWN_PLATFORMS: &[(&str, &str)] = &[
    ("dianxiaomi", "店小秘"),
    ("mabangerp", "马帮ERP"),
    ("odoo", "Odoo"),
    ("shopify", "Shopify"),
    ("woocommerce", "WooCommerce"),
    ("magento", "Magento"),
    ("ebay", "eBay"),
    ("amazon", "Amazon"),
    ("wish", "Wish"),
    ("aliexpress", "AliExpress"),
    ("lazada", "Lazada"),
    ("shopee", "Shopee"),
    ("jd", "京东"),
    ("taobao", "淘宝"),
    ("tmall", "天猫"),
    ("pinduoduo", "拼多多"),
    ("suning", "苏宁易购"),
    ("dangdang", "当当网"),
    ("yihaodian", "一号店"),
    ("vipshop", "唯品会"),
    ("tianmao", "天猫国际"),
    ("kaola", "考拉海购"),
];

/// Returns the column layout for a platform tag, falling back to
/// [`DEFAULT_PROFILE`] for tags without a dedicated layout.
pub fn columns_for(platform: &str) -> &'static PlatformProfile {
    let platform = platform.trim();
    PROFILES
        .iter()
        .find(|profile| profile.tag.eq_ignore_ascii_case(platform))
        .unwrap_or(&DEFAULT_PROFILE)
}

/// Whether the import form accepts `platform`.
pub fn is_known_platform(platform: &str) -> bool {
    let platform = platform.trim();
    platform.eq_ignore_ascii_case(DEFAULT_PROFILE.tag)
        || KNOWN_PLATFORMS
            .iter()
            .any(|(tag, _)| tag.eq_ignore_ascii_case(platform))
}
