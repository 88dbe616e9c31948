//! # App Catalog
//!
//! Icon and homepage lookup for the podcast apps that send payments. Loaded
//! once per session from `/apps.json`; a missing catalog just means generic
//! icons.

use std::collections::HashMap;

use crate::retrieve::AppInfo;

/// Icon used for apps the catalog does not know.
pub const GENERIC_ICON: &str = "generic";

/// What a row shows for its app.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppBadge {
    /// Icon name or URL.
    pub icon: String,
    /// Homepage, when known.
    pub url: Option<String>,
}

/// # App Catalog
///
/// Case- and whitespace-insensitive app name lookup.
#[derive(Debug, Clone, Default)]
pub struct AppCatalog {
    apps: HashMap<String, AppInfo>,
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

impl AppCatalog {
    /// Catalog over the raw `/apps.json` map.
    pub fn new(raw: HashMap<String, AppInfo>) -> Self {
        let apps = raw
            .into_iter()
            .map(|(name, info)| (normalize(&name), info))
            .collect();
        Self { apps }
    }

    /// Number of known apps.
    pub fn len(&self) -> usize {
        self.apps.len()
    }

    /// True when nothing was loaded.
    pub fn is_empty(&self) -> bool {
        self.apps.is_empty()
    }

    /// Badge for `app`, falling back to [`GENERIC_ICON`].
    pub fn lookup(&self, app: &str) -> AppBadge {
        match self.apps.get(&normalize(app)) {
            Some(info) => AppBadge {
                icon: if info.icon.is_empty() {
                    GENERIC_ICON.to_string()
                } else {
                    info.icon.clone()
                },
                url: info.url.clone(),
            },
            None => AppBadge {
                icon: GENERIC_ICON.to_string(),
                url: None,
            },
        }
    }
}
