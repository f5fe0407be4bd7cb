//! Static `service id -> transport address` routing table.
//!
//! Built once at startup from defaults plus configuration overrides and
//! read-only afterwards.

use std::collections::BTreeMap;

/// Where one backend service listens, and which operation patterns it serves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntry {
    pub service_id: String,
    pub address: String,
    /// Pattern prefixes such as `"orders."`. Empty means every pattern.
    pub patterns: Vec<String>,
}

impl RouteEntry {
    pub fn new(service_id: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            service_id: service_id.into(),
            address: address.into(),
            patterns: Vec::new(),
        }
    }

    pub fn serving<I, P>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        self.patterns = patterns.into_iter().map(Into::into).collect();
        self
    }

    pub fn serves(&self, pattern: &str) -> bool {
        self.patterns.is_empty() || self.patterns.iter().any(|p| pattern.starts_with(p.as_str()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouteError {
    #[error("no route configured for service `{0}`")]
    UnknownService(String),
    #[error("service `{service}` does not serve pattern `{pattern}`")]
    PatternNotServed { service: String, pattern: String },
    #[error("invalid route specification `{0}` (expected `service=address`)")]
    InvalidSpec(String),
}

#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    entries: BTreeMap<String, RouteEntry>,
}

impl RouteTable {
    pub fn new(entries: impl IntoIterator<Item = RouteEntry>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|e| (e.service_id.clone(), e))
                .collect(),
        }
    }

    /// The backend services of the shop and their default queue addresses.
    pub fn defaults() -> Self {
        Self::new([
            RouteEntry::new("users", "users.requests").serving(["users.", "auth."]),
            RouteEntry::new("products", "products.requests").serving(["products."]),
            RouteEntry::new("categories", "categories.requests").serving(["categories."]),
            RouteEntry::new("cart", "cart.requests").serving(["cart."]),
            RouteEntry::new("orders", "orders.requests").serving(["orders."]),
            RouteEntry::new("payments", "payments.requests").serving(["payments."]),
            RouteEntry::new("addresses", "addresses.requests").serving(["addresses."]),
        ])
    }

    /// Replace addresses of known services; unknown services are added
    /// serving every pattern.
    pub fn with_overrides<'a>(mut self, overrides: impl IntoIterator<Item = &'a (String, String)>) -> Self {
        for (service_id, address) in overrides {
            self.entries
                .entry(service_id.clone())
                .and_modify(|e| e.address = address.clone())
                .or_insert_with(|| RouteEntry::new(service_id.clone(), address.clone()));
        }
        self
    }

    /// Parse `service=address,service=address`.
    pub fn parse_overrides(spec: &str) -> Result<Vec<(String, String)>, RouteError> {
        spec.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|item| {
                let (service, address) = item
                    .split_once('=')
                    .ok_or_else(|| RouteError::InvalidSpec(item.to_string()))?;
                let (service, address) = (service.trim(), address.trim());
                if service.is_empty() || address.is_empty() {
                    return Err(RouteError::InvalidSpec(item.to_string()));
                }
                Ok((service.to_string(), address.to_string()))
            })
            .collect()
    }

    pub fn resolve(&self, service_id: &str) -> Option<&RouteEntry> {
        self.entries.get(service_id)
    }

    /// Startup check that `service_id` exists and accepts `pattern`.
    pub fn ensure_serves(&self, service_id: &str, pattern: &str) -> Result<(), RouteError> {
        let entry = self
            .resolve(service_id)
            .ok_or_else(|| RouteError::UnknownService(service_id.to_string()))?;
        if entry.serves(pattern) {
            Ok(())
        } else {
            Err(RouteError::PatternNotServed {
                service: service_id.to_string(),
                pattern: pattern.to_string(),
            })
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = &RouteEntry> {
        self.entries.values()
    }
}
