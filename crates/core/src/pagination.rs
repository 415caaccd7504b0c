//! Paginated list envelopes and page-number generation.
//!
//! List endpoints answer with `{ "<entity>": [...], "pagination": {...} }`
//! where the item key varies per entity (`students`, `notifications`, ...).
//! [`Paginated::from_value`] normalises that into one shape.

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Serialize};

/// Maximum number of numbered buttons rendered by [`page_numbers`].
pub const MAX_PAGES_SHOWN: u32 = 5;

/// Pagination metadata attached to list responses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageInfo {
    #[serde(default)]
    pub total: u64,
    #[serde(default)]
    pub pages: u32,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub limit: Option<u32>,
}

/// A page of items plus its pagination metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub pagination: PageInfo,
}

impl<T: DeserializeOwned> Paginated<T> {
    /// Decode a list response body.
    ///
    /// Items are looked up under `items_key`, then `items`, then `data`. A
    /// bare JSON array is accepted as a single unpaginated page. Missing
    /// pagination metadata is synthesised from the item count.
    pub fn from_value(body: &serde_json::Value, items_key: &str) -> Result<Self, serde_json::Error> {
        let raw_items = if body.is_array() {
            Some(body)
        } else {
            [items_key, "items", "data"]
                .iter()
                .find_map(|key| body.get(*key).filter(|v| v.is_array()))
        };

        let raw_items = raw_items.ok_or_else(|| {
            serde_json::Error::custom(format!("list response has no `{items_key}` array"))
        })?;
        let items: Vec<T> = serde_json::from_value(raw_items.clone())?;

        let pagination = match body.get("pagination") {
            Some(meta) => serde_json::from_value(meta.clone())?,
            None => PageInfo {
                total: items.len() as u64,
                pages: 1,
                page: Some(1),
                limit: None,
            },
        };

        Ok(Self { items, pagination })
    }
}

/// One entry of a pagination control.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageItem {
    Page(u32),
    Ellipsis,
}

/// Build the page-number strip for `current` out of `total_pages`.
///
/// Up to [`MAX_PAGES_SHOWN`] pages are listed verbatim. Past that, the
/// first and last page are always present, the neighbours of `current`
/// are shown, and skipped runs collapse into an [`PageItem::Ellipsis`].
pub fn page_numbers(current: u32, total_pages: u32) -> Vec<PageItem> {
    if total_pages <= MAX_PAGES_SHOWN {
        return (1..=total_pages).map(PageItem::Page).collect();
    }

    let current = current.clamp(1, total_pages);
    let mut items = vec![PageItem::Page(1)];

    if current > 3 {
        items.push(PageItem::Ellipsis);
    }

    let start = current.saturating_sub(1).max(2);
    let end = (current + 1).min(total_pages - 1);
    items.extend((start..=end).map(PageItem::Page));

    if current < total_pages - 2 {
        items.push(PageItem::Ellipsis);
    }

    items.push(PageItem::Page(total_pages));
    items
}
