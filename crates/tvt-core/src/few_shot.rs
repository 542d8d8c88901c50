use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExampleField {
    Tactile,
    Text,
    Output,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Example {
    #[serde(default)]
    pub id: u32,
    #[serde(default)]
    pub tactile: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub output: String,
}

impl Example {
    pub fn empty(id: u32) -> Self {
        Self {
            id,
            ..Self::default()
        }
    }

    pub fn has_content(&self) -> bool {
        !self.tactile.is_empty() || !self.text.is_empty() || !self.output.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExampleSetError {
    #[error("At least one example must remain")]
    LastExample,
    #[error("No example with id {0}")]
    UnknownId(u32),
}

/// Ordered few-shot examples. Never empty; ids are unique.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExampleSet {
    examples: Vec<Example>,
}

impl Default for ExampleSet {
    fn default() -> Self {
        Self {
            examples: vec![Example::empty(1)],
        }
    }
}

impl ExampleSet {
    /// Builds a set from loaded examples, renumbering duplicate or zero ids.
    pub fn from_examples(examples: Vec<Example>) -> Self {
        let mut set = Self {
            examples: Vec::with_capacity(examples.len().max(1)),
        };
        for mut example in examples {
            if example.id == 0 || set.get(example.id).is_some() {
                example.id = set.fresh_id();
            }
            set.examples.push(example);
        }
        if set.examples.is_empty() {
            return Self::default();
        }
        set
    }

    pub fn demo() -> Self {
        let entry = |id: u32, tactile: &str, text: &str, output: &str| Example {
            id,
            tactile: tactile.to_string(),
            text: text.to_string(),
            output: output.to_string(),
        };
        Self {
            examples: vec![
                entry(
                    1,
                    "Smooth, metallic surface with low friction",
                    "Industrial steel plate",
                    "A smooth steel object likely used in construction or manufacturing. The metallic properties suggest it's used for structural applications.",
                ),
                entry(
                    2,
                    "Rough, grainy texture with high friction",
                    "Abrasive material for surface finishing",
                    "This is sandpaper or similar abrasive material. The high friction tactile data aligns with its use for smoothing surfaces.",
                ),
                entry(
                    3,
                    "Soft, flexible material with medium grip",
                    "Protective covering material",
                    "This appears to be rubber or silicone material used for protection or grip enhancement in various applications.",
                ),
            ],
        }
    }

    /// Max id + 1. When the id space is exhausted the set is renumbered from 1
    /// first, so the returned id never collides.
    fn fresh_id(&mut self) -> u32 {
        let max = self.examples.iter().map(|example| example.id).max();
        if let Some(id) = max.unwrap_or(0).checked_add(1) {
            return id;
        }
        let mut next = 0;
        for example in &mut self.examples {
            next += 1;
            example.id = next;
        }
        next + 1
    }

    pub fn add(&mut self) -> u32 {
        let id = self.fresh_id();
        self.examples.push(Example::empty(id));
        id
    }

    pub fn remove(&mut self, id: u32) -> Result<(), ExampleSetError> {
        let index = self
            .examples
            .iter()
            .position(|example| example.id == id)
            .ok_or(ExampleSetError::UnknownId(id))?;
        if self.examples.len() == 1 {
            return Err(ExampleSetError::LastExample);
        }
        self.examples.remove(index);
        Ok(())
    }

    pub fn update(
        &mut self,
        id: u32,
        field: ExampleField,
        value: impl Into<String>,
    ) -> Result<(), ExampleSetError> {
        let example = self
            .examples
            .iter_mut()
            .find(|example| example.id == id)
            .ok_or(ExampleSetError::UnknownId(id))?;
        let value = value.into();
        match field {
            ExampleField::Tactile => example.tactile = value,
            ExampleField::Text => example.text = value,
            ExampleField::Output => example.output = value,
        }
        Ok(())
    }

    pub fn get(&self, id: u32) -> Option<&Example> {
        self.examples.iter().find(|example| example.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Example> {
        self.examples.iter()
    }

    pub fn with_content(&self) -> impl Iterator<Item = &Example> {
        self.examples.iter().filter(|example| example.has_content())
    }

    pub fn has_content(&self) -> bool {
        self.examples.iter().any(Example::has_content)
    }

    pub fn len(&self) -> usize {
        self.examples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.examples.is_empty()
    }
}
