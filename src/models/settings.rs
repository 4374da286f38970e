//! Site-wide settings singleton.

use serde::{Deserialize, Serialize};

/// One entry of the header menu, with its target already resolved to a path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MenuItem {
    pub label: String,
    pub href: String,
}

/// A navigation menu document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Menu {
    pub title: String,
    #[serde(default)]
    pub items: Vec<MenuItem>,
}

/// The `siteSettings` singleton.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SiteSettings {
    pub site_title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_seo: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header_menu: Option<Menu>,
}
