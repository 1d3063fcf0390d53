//! Measured resources and their aggregation.
//!
//! [`Resource`] is one discrete network fetch attributable to the page;
//! [`ResourceCollection`] is the ordered capture list plus aggregates
//! that are always re-derivable by folding the list.

// ============================================================================
// Imports
// ============================================================================

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::classify::ResourceType;

// ============================================================================
// Resource
// ============================================================================

/// One discrete network fetch, classified.
///
/// Immutable once built; `transfer_size` is always at least 1 byte
/// (zero-length completions are normalized at construction).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// Resource URL.
    pub url: String,

    /// Served content type, possibly empty.
    #[serde(rename = "contentType")]
    pub content_type: String,

    /// Wire bytes transferred, >= 1.
    #[serde(rename = "transferSize")]
    pub transfer_size: u64,

    /// HTTP status code, 0 if unknown.
    #[serde(rename = "httpStatus")]
    pub http_status: u16,

    /// Semantic category.
    #[serde(rename = "resourceType")]
    pub resource_type: ResourceType,
}

impl Resource {
    /// Builds a resource, normalizing a zero transfer size to 1.
    #[must_use]
    pub fn new(
        url: impl Into<String>,
        content_type: impl Into<String>,
        transfer_size: u64,
        http_status: u16,
        resource_type: ResourceType,
    ) -> Self {
        Self {
            url: url.into(),
            content_type: content_type.into(),
            transfer_size: transfer_size.max(1),
            http_status,
            resource_type,
        }
    }
}

// ============================================================================
// ResourceCollection
// ============================================================================

/// Ordered resource list plus fold-derived aggregates.
///
/// The aggregates are maintained incrementally on push but are by
/// construction equal to a fold over the list; `recompute` restores
/// them from scratch and is used to assert that invariant in tests.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceCollection {
    /// Resources in capture order.
    resources: Vec<Resource>,

    /// Sum of all transfer sizes.
    #[serde(rename = "totalTransferSize")]
    total_transfer_size: u64,

    /// Transfer size per category.
    #[serde(rename = "sizeByType")]
    size_by_type: BTreeMap<ResourceType, u64>,
}

impl ResourceCollection {
    /// Creates an empty collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a collection by folding a list of resources.
    #[must_use]
    pub fn from_resources(resources: Vec<Resource>) -> Self {
        let mut collection = Self::new();
        for resource in resources {
            collection.push(resource);
        }
        collection
    }

    /// Appends a resource, updating aggregates.
    pub fn push(&mut self, resource: Resource) {
        self.total_transfer_size += resource.transfer_size;
        *self.size_by_type.entry(resource.resource_type).or_default() += resource.transfer_size;
        self.resources.push(resource);
    }

    /// Merges another list in capture order, skipping URLs already present.
    ///
    /// Returns how many resources were actually added.
    pub fn merge(&mut self, incoming: impl IntoIterator<Item = Resource>) -> usize {
        let mut added = 0;
        for resource in incoming {
            if self.contains_url(&resource.url) {
                continue;
            }
            self.push(resource);
            added += 1;
        }
        added
    }

    /// Returns `true` if a resource with this URL was already captured.
    #[must_use]
    pub fn contains_url(&self, url: &str) -> bool {
        self.resources.iter().any(|r| r.url == url)
    }

    /// Resources in capture order.
    #[inline]
    #[must_use]
    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    /// Number of captured resources.
    #[inline]
    #[must_use]
    pub fn count(&self) -> usize {
        self.resources.len()
    }

    /// Returns `true` if nothing was captured.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Sum of all transfer sizes.
    #[inline]
    #[must_use]
    pub fn total_transfer_size(&self) -> u64 {
        self.total_transfer_size
    }

    /// Transfer size captured for one category.
    #[must_use]
    pub fn size_of_type(&self, resource_type: ResourceType) -> u64 {
        self.size_by_type.get(&resource_type).copied().unwrap_or(0)
    }

    /// Transfer size per category.
    #[inline]
    #[must_use]
    pub fn size_by_type(&self) -> &BTreeMap<ResourceType, u64> {
        &self.size_by_type
    }

    /// Rebuilds the aggregates by folding the resource list.
    pub fn recompute(&mut self) {
        self.total_transfer_size = self.resources.iter().map(|r| r.transfer_size).sum();
        self.size_by_type.clear();
        for resource in &self.resources {
            *self.size_by_type.entry(resource.resource_type).or_default() +=
                resource.transfer_size;
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;

    fn css(url: &str, size: u64) -> Resource {
        Resource::new(url, "text/css", size, 200, ResourceType::Css)
    }

    #[test]
    fn test_zero_size_normalized() {
        let r = Resource::new("https://x.com/a", "", 0, 200, ResourceType::Other);
        assert_eq!(r.transfer_size, 1);
    }

    #[test]
    fn test_push_updates_aggregates() {
        let mut collection = ResourceCollection::new();
        collection.push(css("https://x.com/a.css", 100));
        collection.push(css("https://x.com/b.css", 200));

        assert_eq!(collection.count(), 2);
        assert_eq!(collection.total_transfer_size(), 300);
        assert_eq!(collection.size_of_type(ResourceType::Css), 300);
        assert_eq!(collection.size_of_type(ResourceType::Js), 0);
    }

    #[test]
    fn test_merge_dedupes_by_url() {
        let mut collection = ResourceCollection::new();
        collection.push(css("https://x.com/a.css", 100));

        let added = collection.merge(vec![
            css("https://x.com/a.css", 999),
            css("https://x.com/b.css", 50),
        ]);

        assert_eq!(added, 1);
        assert_eq!(collection.count(), 2);
        assert_eq!(collection.total_transfer_size(), 150);
    }

    #[test]
    fn test_capture_order_preserved() {
        let mut collection = ResourceCollection::new();
        collection.push(css("https://x.com/1", 1));
        collection.push(css("https://x.com/2", 1));
        collection.push(css("https://x.com/3", 1));

        let urls: Vec<_> = collection.resources().iter().map(|r| r.url.as_str()).collect();
        assert_eq!(urls, ["https://x.com/1", "https://x.com/2", "https://x.com/3"]);
    }

    proptest! {
        // Aggregates always equal a fold over the list
        #[test]
        fn prop_aggregates_match_fold(sizes in proptest::collection::vec(0u64..100_000, 0..32)) {
            let mut collection = ResourceCollection::new();
            for (i, size) in sizes.iter().enumerate() {
                let kind = ResourceType::ALL[i % ResourceType::ALL.len()];
                collection.push(Resource::new(format!("https://x.com/{i}"), "", *size, 200, kind));
            }

            let folded: u64 = collection.resources().iter().map(|r| r.transfer_size).sum();
            prop_assert_eq!(collection.total_transfer_size(), folded);

            let mut recomputed = collection.clone();
            recomputed.recompute();
            prop_assert_eq!(recomputed.total_transfer_size(), collection.total_transfer_size());
            prop_assert_eq!(recomputed.size_by_type(), collection.size_by_type());

            let by_type_sum: u64 = collection.size_by_type().values().sum();
            prop_assert_eq!(by_type_sum, folded);
        }
    }
}
