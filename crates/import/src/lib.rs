pub mod condition;
pub mod csv;
pub mod engine;
pub mod rules;
pub mod ruleset;

pub use condition::{
    AmountBasis, Comparison, Condition, ConditionError, Degenerate, Evaluation, MatchMode, TextPattern,
};
pub use crate::csv::{import_statement, parse_statement, RowDefect, StatementError};
pub use engine::{categorize, category_counts, CategorizationEngine, CategorizationReport, Diagnostic, PassMode};
pub use rules::{ConditionRecord, InvalidRuleDefinition, Rule, RuleDefect, RuleRecord};
pub use ruleset::{RuleFormat, RuleSet, RuleSetError};
