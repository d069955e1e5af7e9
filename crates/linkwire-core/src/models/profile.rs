use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// OpenID Connect userinfo claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserInfo {
    /// Member id; becomes the credential's subject.
    pub sub: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub given_name: Option<String>,
    #[serde(default)]
    pub family_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub email_verified: Option<bool>,
    #[serde(default)]
    pub picture: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Locale {
    pub country: String,
    pub language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MultiLocaleString {
    #[serde(default)]
    pub localized: HashMap<String, String>,
    #[serde(rename = "preferredLocale")]
    pub preferred_locale: Locale,
}

impl MultiLocaleString {
    /// Value for the preferred locale, else any localized value, else "".
    pub fn preferred(&self) -> &str {
        let key = format!(
            "{}_{}",
            self.preferred_locale.language, self.preferred_locale.country
        );
        self.localized
            .get(&key)
            .or_else(|| self.localized.values().next())
            .map(String::as_str)
            .unwrap_or("")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailedProfile {
    pub id: String,
    #[serde(rename = "firstName")]
    pub first_name: MultiLocaleString,
    #[serde(rename = "lastName")]
    pub last_name: MultiLocaleString,
    #[serde(default)]
    pub headline: Option<MultiLocaleString>,
}

impl DetailedProfile {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.preferred(), self.last_name.preferred())
            .trim()
            .to_string()
    }

    pub fn headline(&self) -> Option<&str> {
        self.headline.as_ref().map(|h| h.preferred()).filter(|h| !h.is_empty())
    }
}
