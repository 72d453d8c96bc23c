//! Response bodies of the setlist.fm user endpoints.

use serde::{Deserialize, Serialize};
use setlist_core::Concert;

/// `GET /user/{userId}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct UserProfile {
    /// setlist.fm user id.
    pub user_id: String,
    /// Full name, when the user filled it in.
    pub fullname: Option<String>,
    /// Self-description.
    pub about: Option<String>,
    /// Profile page URL.
    pub url: Option<String>,
}

impl UserProfile {
    /// Best name to show for this user: full name, then user id.
    ///
    /// Returns `None` when the profile carries neither.
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.fullname
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .or_else(|| Some(self.user_id.as_str()).filter(|id| !id.is_empty()))
    }
}

/// `GET /user/{userId}/attended?p={page}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AttendedPage {
    /// Concerts on this page, newest first as served by the API.
    pub setlist: Vec<Concert>,
    /// Total attended concerts across all pages.
    pub total: u32,
    /// 1-based page number.
    pub page: u32,
    /// Page size used by the API.
    pub items_per_page: u32,
}

impl AttendedPage {
    /// Whether later pages may hold more concerts.
    #[must_use]
    pub fn has_more(&self, fetched_so_far: usize) -> bool {
        let total = self.total as usize;
        let page_size = self.items_per_page as usize;
        !self.setlist.is_empty()
            && fetched_so_far < total
            && (page_size == 0 || self.setlist.len() >= page_size)
    }
}
