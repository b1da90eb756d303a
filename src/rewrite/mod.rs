//! The ordered rewrite pipeline.
//!
//! A file's text flows through the stages in declaration order. Later stages
//! rely on earlier ones: the routing stage expects `next/router` imports to
//! already name `useNavigate`, the data-fetching stage merges into whatever
//! `react` import the earlier stages left behind.

mod components;
mod data_fetching;
mod imports;
mod routing;
pub mod scanner;

pub use components::{ComponentStage, ADDED_ATTRIBUTES, TAG_RENAMES};
pub use data_fetching::DataFetchingStage;
pub use imports::ImportStage;
pub use routing::{RoutingStage, ATTRIBUTE_RENAMES};

/// One transform applied by the [`RewriteEngine`].
///
/// Implementations are stateless. `apply` must return the text unchanged
/// when nothing matches, must leave text outside the constructs it matched
/// untouched, and must be idempotent on its own output.
pub trait RewriteStage: Send + Sync {
    fn name(&self) -> &'static str;

    /// Cheap pre-check; `apply` is skipped when this is false.
    fn matches(&self, text: &str) -> bool;

    fn apply(&self, text: &str) -> String;
}

/// A stage bound to its position in the pipeline.
pub struct RewriteRule {
    pub index: usize,
    stage: Box<dyn RewriteStage>,
}

impl RewriteRule {
    pub fn name(&self) -> &'static str {
        self.stage.name()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteOutcome {
    pub text: String,
    /// Stages whose output differed from their input, in pipeline order.
    pub applied: Vec<&'static str>,
}

pub struct RewriteEngine {
    rules: Vec<RewriteRule>,
}

impl RewriteEngine {
    /// An engine with no stages; `rewrite` is the identity.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Imports, routing, components, data fetching, in that order.
    pub fn standard() -> Self {
        Self::empty()
            .with_stage(ImportStage)
            .with_stage(RoutingStage)
            .with_stage(ComponentStage)
            .with_stage(DataFetchingStage)
    }

    /// Append a stage after the existing ones.
    pub fn with_stage(mut self, stage: impl RewriteStage + 'static) -> Self {
        let index = self.rules.len();
        self.rules.push(RewriteRule {
            index,
            stage: Box::new(stage),
        });
        self
    }

    pub fn rules(&self) -> &[RewriteRule] {
        &self.rules
    }

    pub fn rewrite(&self, content: &str) -> String {
        self.rewrite_traced(content).text
    }

    pub fn rewrite_traced(&self, content: &str) -> RewriteOutcome {
        let mut text = content.to_string();
        let mut applied = Vec::new();

        for rule in &self.rules {
            if !rule.stage.matches(&text) {
                continue;
            }
            let next = rule.stage.apply(&text);
            if next != text {
                tracing::debug!(stage = rule.name(), index = rule.index, "stage rewrote text");
                applied.push(rule.name());
                text = next;
            }
        }

        RewriteOutcome { text, applied }
    }
}

impl Default for RewriteEngine {
    fn default() -> Self {
        Self::standard()
    }
}
