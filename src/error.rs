use std::path::PathBuf;
use thiserror::Error;

/// Failures the engine can surface to its caller.
///
/// Outside strict mode most of these are logged, counted and skipped; the
/// variants exist so strict mode can abort with the same detail.
#[derive(Error, Debug)]
pub enum CompatError {
    #[error("schema drift on item {item}: {detail}")]
    SchemaDrift { item: String, detail: String },
    #[error("rule source {}: {message}", path.display())]
    RuleSource { path: PathBuf, message: String },
    #[error("stim buffs: {detail}")]
    StimBuff { detail: String },
    #[error("feature '{feature}' failed: {source}")]
    Feature {
        feature: &'static str,
        #[source]
        source: Box<CompatError>,
    },
}

pub type Result<T> = std::result::Result<T, CompatError>;

/// Structural mismatch found while walking a single template.
///
/// Carries no item id; callers attach it with [`SchemaDrift::on_item`] once
/// they know which template was being read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaDrift {
    pub detail: String,
}

impl SchemaDrift {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
        }
    }

    pub fn on_item(self, item: &str) -> CompatError {
        CompatError::SchemaDrift {
            item: item.to_string(),
            detail: self.detail,
        }
    }
}

impl std::fmt::Display for SchemaDrift {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.detail)
    }
}
