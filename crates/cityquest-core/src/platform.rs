//! Client platform descriptor.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// The family of client a request came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlatformKind {
    /// A browser, desktop or mobile.
    Web,
    /// The native iOS app.
    Ios,
    /// The native Android app.
    Android,
    /// Nothing could be determined.
    Unknown,
}

impl fmt::Display for PlatformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Web => "web",
            Self::Ios => "ios",
            Self::Android => "android",
            Self::Unknown => "unknown",
        })
    }
}

/// Platform descriptor attached to every stored progress event.
///
/// Serializes to a flat object: `{"type": "web", "browser": ..., ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Platform {
    /// Client family.
    #[serde(rename = "type")]
    pub kind: PlatformKind,
    /// Family-specific details.
    #[serde(flatten)]
    pub metadata: BTreeMap<String, String>,
}

impl Platform {
    /// A platform about which nothing is known.
    #[must_use]
    pub fn unknown() -> Self {
        Self {
            kind: PlatformKind::Unknown,
            metadata: BTreeMap::new(),
        }
    }

    /// A browser client.
    #[must_use]
    pub fn web(browser: &str, browser_version: &str, os: &str) -> Self {
        Self {
            kind: PlatformKind::Web,
            metadata: BTreeMap::from([
                ("browser".to_owned(), browser.to_owned()),
                ("browser_version".to_owned(), browser_version.to_owned()),
                ("os".to_owned(), os.to_owned()),
            ]),
        }
    }

    /// The native iOS app.
    #[must_use]
    pub fn ios(app_version: &str, os_version: &str, device_model: &str) -> Self {
        Self::mobile(PlatformKind::Ios, app_version, os_version, device_model)
    }

    /// The native Android app.
    #[must_use]
    pub fn android(app_version: &str, os_version: &str, device_model: &str) -> Self {
        Self::mobile(PlatformKind::Android, app_version, os_version, device_model)
    }

    fn mobile(kind: PlatformKind, app_version: &str, os_version: &str, device_model: &str) -> Self {
        Self {
            kind,
            metadata: BTreeMap::from([
                ("app_version".to_owned(), app_version.to_owned()),
                ("os_version".to_owned(), os_version.to_owned()),
                ("device_model".to_owned(), device_model.to_owned()),
            ]),
        }
    }

    /// Looks up a metadata field.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    /// Returns `true` for browser clients.
    #[must_use]
    pub fn is_web(&self) -> bool {
        self.kind == PlatformKind::Web
    }

    /// Returns `true` for the native apps.
    #[must_use]
    pub fn is_mobile(&self) -> bool {
        matches!(self.kind, PlatformKind::Ios | PlatformKind::Android)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_web_platform_serializes_flat() {
        let platform = Platform::web("Firefox", "120.0", "Linux");

        let json = serde_json::to_value(&platform).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "type": "web",
                "browser": "Firefox",
                "browser_version": "120.0",
                "os": "Linux",
            })
        );
    }

    #[test]
    fn test_platform_deserializes_from_flat_object() {
        let json = serde_json::json!({
            "type": "android",
            "app_version": "2.0.5",
            "os_version": "13",
            "device_model": "Pixel 7",
        });

        let platform: Platform = serde_json::from_value(json).unwrap();

        assert_eq!(platform, Platform::android("2.0.5", "13", "Pixel 7"));
        assert!(platform.is_mobile());
        assert!(!platform.is_web());
    }

    #[test]
    fn test_unknown_platform_has_no_metadata() {
        let platform = Platform::unknown();

        assert_eq!(platform.kind, PlatformKind::Unknown);
        assert!(platform.metadata.is_empty());
        assert_eq!(
            serde_json::to_value(&platform).unwrap(),
            serde_json::json!({ "type": "unknown" })
        );
    }
}
