//! Selection of the model used for the next turn.

use crate::error::Result;
use crate::types::ModelId;

/// Heading shown above the model list.
pub const SELECTOR_TITLE: &str = "Chat with Llama3 + α";

/// Lets the user pick one model out of the fixed enumeration.
///
/// The choice applies to the next request only; turns already in the
/// transcript do not record which model produced them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSelector {
    models: [ModelId; 4],
    current: ModelId,
}

impl ModelSelector {
    /// Create a selector on the first model of the list.
    pub fn new() -> Self {
        Self {
            models: ModelId::ALL,
            current: ModelId::ALL[0],
        }
    }

    /// Create a selector with the given initial choice.
    pub fn with_model(model: ModelId) -> Self {
        Self {
            current: model,
            ..Self::new()
        }
    }

    /// The models offered, in presentation order.
    pub fn models(&self) -> &[ModelId] {
        &self.models
    }

    /// The current choice.
    pub fn select(&self) -> ModelId {
        self.current
    }

    /// Change the current choice.
    pub fn choose(&mut self, model: ModelId) {
        self.current = model;
    }

    /// Change the current choice by identifier.
    ///
    /// An identifier outside the enumeration leaves the choice unchanged.
    pub fn choose_str(&mut self, id: &str) -> Result<ModelId> {
        let model = id.parse::<ModelId>()?;
        self.choose(model);
        Ok(model)
    }
}

impl Default for ModelSelector {
    fn default() -> Self {
        Self::new()
    }
}
