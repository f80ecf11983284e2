//! Typed views of service payloads.
//!
//! `Outcome::Found` keeps the raw JSON so nothing the service sends is lost;
//! these structs are what callers usually want out of it.

use serde::{Deserialize, Serialize};

/// A recorded security incident, as returned by the breach endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Breach {
    /// Stable identifier, used in `breach/{name}` lookups
    pub name: String,

    pub title: String,

    /// Domain of the breached service; may be empty
    #[serde(default)]
    pub domain: String,

    /// Date the breach occurred (YYYY-MM-DD)
    pub breach_date: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_date: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_date: Option<String>,

    /// Number of accounts exposed
    pub pwn_count: u64,

    /// HTML description
    #[serde(default)]
    pub description: String,

    /// Kinds of data exposed (e.g. "Email addresses", "Passwords")
    #[serde(default)]
    pub data_classes: Vec<String>,

    #[serde(default)]
    pub is_verified: bool,

    #[serde(default)]
    pub is_fabricated: bool,

    #[serde(default)]
    pub is_sensitive: bool,

    #[serde(default)]
    pub is_retired: bool,

    #[serde(default)]
    pub is_spam_list: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_path: Option<String>,
}

impl Breach {
    /// Whether this breach exposed passwords.
    pub fn exposes_passwords(&self) -> bool {
        self.data_classes
            .iter()
            .any(|class| class.eq_ignore_ascii_case("passwords"))
    }
}
