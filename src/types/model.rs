use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Error, Result};

/// Identifier of a model served by the completion provider.
///
/// The set is closed; whether a model is still served is decided by the
/// provider, not here.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ModelId {
    /// Llama 3 70B with an 8192 token context.
    Llama3x70b,

    /// Llama 3 8B with an 8192 token context.
    Llama3x8b,

    /// Mixtral 8x7B with a 32768 token context.
    Mixtral8x7b,

    /// Gemma 7B instruction tuned.
    Gemma7bIt,
}

impl ModelId {
    /// Every selectable model, in presentation order.
    pub const ALL: [ModelId; 4] = [
        ModelId::Llama3x70b,
        ModelId::Llama3x8b,
        ModelId::Mixtral8x7b,
        ModelId::Gemma7bIt,
    ];

    /// The identifier sent on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelId::Llama3x70b => "llama3-70b-8192",
            ModelId::Llama3x8b => "llama3-8b-8192",
            ModelId::Mixtral8x7b => "mixtral-8x7b-32768",
            ModelId::Gemma7bIt => "gemma-7b-it",
        }
    }
}

impl Default for ModelId {
    fn default() -> Self {
        ModelId::ALL[0]
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        ModelId::ALL
            .into_iter()
            .find(|model| model.as_str() == s)
            .ok_or_else(|| {
                Error::validation(
                    format!("unknown model '{s}'"),
                    Some("model".to_string()),
                )
            })
    }
}

impl Serialize for ModelId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ModelId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_serialization() {
        let json = serde_json::to_string(&ModelId::Mixtral8x7b).unwrap();
        assert_eq!(json, r#""mixtral-8x7b-32768""#);
    }

    #[test]
    fn model_deserialization() {
        let model: ModelId = serde_json::from_str(r#""gemma-7b-it""#).unwrap();
        assert_eq!(model, ModelId::Gemma7bIt);
        assert!(serde_json::from_str::<ModelId>(r#""gpt-4""#).is_err());
    }

    #[test]
    fn parse_every_model() {
        for model in ModelId::ALL {
            assert_eq!(model.as_str().parse::<ModelId>().unwrap(), model);
        }
        assert_eq!(
            " llama3-8b-8192 ".parse::<ModelId>().unwrap(),
            ModelId::Llama3x8b
        );
    }

    #[test]
    fn parse_unknown_model() {
        let err = "llama2-70b-4096".parse::<ModelId>().unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("llama2-70b-4096"));
    }

    #[test]
    fn default_is_first() {
        assert_eq!(ModelId::default(), ModelId::Llama3x70b);
        assert_eq!(ModelId::default().to_string(), "llama3-70b-8192");
    }
}
