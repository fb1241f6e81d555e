use serde::{Deserialize, Serialize};

/// One configured comment style (§4.6, §9's "polymorphic comment agents
/// → plain configuration records"). The selector hands generation off to
/// one of these, or rejects outright.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WriterConfig {
    pub name: String,
    pub instructions: String,
    pub min_length: usize,
    pub max_length: usize,
    #[serde(default)]
    pub model: Option<String>,
}

/// Configuration for the comment generator (writers + selector), §6's
/// `commentGenerator` group.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommentGeneratorConfig {
    pub writers: Vec<WriterConfig>,
    pub selector_model: String,
    pub selector_instructions: String,
}

impl Default for CommentGeneratorConfig {
    fn default() -> Self {
        Self {
            writers: default_writers(),
            selector_model: "gpt-5-mini".to_string(),
            selector_instructions: String::new(),
        }
    }
}

impl CommentGeneratorConfig {
    pub fn validate(&self) -> Result<(), WriterConfigError> {
        if self.writers.is_empty() {
            return Err(WriterConfigError::NoWriters);
        }
        for writer in &self.writers {
            if writer.min_length > writer.max_length {
                return Err(WriterConfigError::InvertedLengthRange {
                    name: writer.name.clone(),
                    min: writer.min_length,
                    max: writer.max_length,
                });
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum WriterConfigError {
    #[error("comment generator config requires at least one writer")]
    NoWriters,
    #[error("writer `{name}` has min_length {min} > max_length {max}")]
    InvertedLengthRange { name: String, min: usize, max: usize },
}

/// The six built-in writer styles referenced in §6.
fn default_writers() -> Vec<WriterConfig> {
    [
        ("observational", "Note what is happening, plainly and briefly.", 20, 140),
        ("analytical", "Explain why this moment matters, with one concrete reason.", 30, 180),
        ("enthusiastic", "React with genuine energy to the moment.", 15, 120),
        ("skeptical", "Raise the obvious question or counterpoint.", 20, 140),
        ("summarizing", "Condense the arc of the conversation so far.", 30, 200),
        ("humorous", "Find the lighter angle without undercutting the moment.", 15, 120),
    ]
    .into_iter()
    .map(|(name, instructions, min_length, max_length)| WriterConfig {
        name: name.to_string(),
        instructions: instructions.to_string(),
        min_length,
        max_length,
        model: None,
    })
    .collect()
}
