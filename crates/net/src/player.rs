//! Player detail record served by `/player_<id>.json`.

use crate::skin::{SkinBlock, SkinError};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Errors emitted while decoding a player detail document.
#[derive(Debug, Error)]
pub enum PlayerDetailError {
    /// Wrap serde parsing issues.
    #[error("failed to parse player detail: {0}")]
    Parse(#[from] serde_json::Error),
    /// The embedded skin is not a valid thumbnail.
    #[error("invalid skin in player detail: {0}")]
    Skin(#[from] SkinError),
}

#[derive(Debug, Deserialize)]
struct RawPlayerDetail {
    name: String,
    #[serde(default)]
    display: Option<String>,
    #[serde(default)]
    version: Option<Value>,
    #[serde(default)]
    skin: Option<String>,
}

/// Details of a single player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerDetail {
    /// Account name.
    pub name: String,
    /// Display name, may contain markup. Falls back to `name`.
    pub display: String,
    /// Client version string, if reported.
    pub version: Option<String>,
    /// Skin thumbnail, if the server has one.
    pub skin: Option<SkinBlock>,
}

impl PlayerDetail {
    /// Parse the JSON document. Newlines are dropped before parsing, including raw ones
    /// inside string values.
    pub fn from_json(text: &str) -> Result<Self, PlayerDetailError> {
        let text = text.replace('\n', "");
        let raw: RawPlayerDetail = serde_json::from_str(&text)?;
        let skin = match raw.skin.as_deref() {
            Some(encoded) if !encoded.is_empty() => Some(SkinBlock::from_base64(encoded)?),
            _ => None,
        };
        let version = raw.version.and_then(|v| match v {
            Value::String(s) => Some(s),
            Value::Null => None,
            other => Some(other.to_string()),
        });
        Ok(Self {
            display: raw.display.unwrap_or_else(|| raw.name.clone()),
            name: raw.name,
            version,
            skin,
        })
    }

    /// Whether the account name differs from the display name and should be shown too.
    pub fn show_account_name(&self) -> bool {
        self.name != self.display
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::skin::SKIN_BYTES;

    #[test]
    fn full_document() {
        let skin = SkinBlock::from_slice(&[7; SKIN_BYTES]).unwrap();
        let text = format!(
            r#"{{"name":"steve","display":"{{gold}}Steve","version":"1.20.1","skin":"{}"}}"#,
            skin.to_base64()
        );
        let detail = PlayerDetail::from_json(&text).unwrap();
        assert_eq!(detail.name, "steve");
        assert_eq!(detail.display, "{gold}Steve");
        assert_eq!(detail.version.as_deref(), Some("1.20.1"));
        assert_eq!(detail.skin, Some(skin));
        assert!(detail.show_account_name());
    }

    #[test]
    fn minimal_document() {
        let detail = PlayerDetail::from_json("{\"name\":\"alex\",\n\"version\":340}").unwrap();
        assert_eq!(detail.display, "alex");
        assert_eq!(detail.version.as_deref(), Some("340"));
        assert!(detail.skin.is_none());
        assert!(!detail.show_account_name());
    }

    #[test]
    fn raw_newlines_inside_strings_are_dropped() {
        let text = "{\"name\":\"steve\",\"display\":\"{gold}Ste\nve\",\n\"version\":\"1.20\"}";
        let detail = PlayerDetail::from_json(text).unwrap();
        assert_eq!(detail.display, "{gold}Steve");
        assert_eq!(detail.version.as_deref(), Some("1.20"));
    }

    #[test]
    fn bad_skin_is_rejected() {
        let err = PlayerDetail::from_json(r#"{"name":"a","skin":"AAAA"}"#).unwrap_err();
        assert!(matches!(err, PlayerDetailError::Skin(_)));
    }

    #[test]
    fn missing_name_is_rejected() {
        let err = PlayerDetail::from_json(r#"{"display":"a"}"#).unwrap_err();
        assert!(matches!(err, PlayerDetailError::Parse(_)));
    }
}
