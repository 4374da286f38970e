//! Page documents (home page and landing pages).

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::AppError;

/// Which page document type a page was loaded from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum PageKind {
    HomePage,
    LandingPage,
}

impl PageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PageKind::HomePage => "homePage",
            PageKind::LandingPage => "landingPage",
        }
    }
}

impl FromStr for PageKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "homePage" => Ok(PageKind::HomePage),
            "landingPage" => Ok(PageKind::LandingPage),
            other => Err(AppError::Internal(format!("Unknown page kind: {}", other))),
        }
    }
}

/// A page as fetched from the content store. Blocks stay raw JSON until resolved.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    #[serde(rename = "_id")]
    pub id: String,
    pub kind: PageKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seo_title: Option<String>,
    #[serde(default)]
    pub heros: Vec<Value>,
    #[serde(default)]
    pub sections: Vec<Value>,
}
