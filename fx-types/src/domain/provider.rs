//! Provider selection tokens.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Token a caller uses to ask the factory for a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    /// Whatever provider was registered first.
    #[default]
    Default,
    Frankfurter,
    Static,
}

impl ProviderType {
    /// The concrete provider kind this token asks for, if any.
    pub fn wanted_kind(&self) -> Option<ProviderKind> {
        match self {
            ProviderType::Default => None,
            ProviderType::Frankfurter => Some(ProviderKind::Frankfurter),
            ProviderType::Static => Some(ProviderKind::Static),
        }
    }
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProviderType::Default => "default",
            ProviderType::Frankfurter => "frankfurter",
            ProviderType::Static => "static",
        };
        write!(f, "{}", name)
    }
}

impl std::str::FromStr for ProviderType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "default" => Ok(ProviderType::Default),
            "frankfurter" => Ok(ProviderType::Frankfurter),
            "static" => Ok(ProviderType::Static),
            other => Err(format!("Unknown provider type: {}", other)),
        }
    }
}

/// What a registered provider actually is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderKind {
    Frankfurter,
    Static,
    /// Anything without a dedicated selection token (test doubles, ad-hoc sources).
    Generic,
}
