//! Clause group composition.
//!
//! Override tokens are rendered into SQL boolean fragments and collected
//! under a group name (usually the operator, `and` / `or`). Each group later
//! fills the `{name}` placeholder of the same name in the query template.

use tracing::{debug, info};

use super::tokenizer::{parse_condition, Condition, Operator};
use crate::error::Result;

/// A named, ordered list of SQL fragments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClauseGroup {
    pub name: String,
    pub values: Vec<String>,
}

impl ClauseGroup {
    pub fn new(name: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }

    /// Joins the fragments with single spaces.
    pub fn joined(&self) -> String {
        self.values.join(" ")
    }
}

/// How new fragments combine with an existing group of the same name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MergeMode {
    /// Append after the existing fragments.
    #[default]
    Append,
    /// Replace the existing fragments.
    Replace,
}

impl MergeMode {
    /// Maps an `--override` style flag to a mode.
    pub fn from_override(override_existing: bool) -> Self {
        if override_existing {
            Self::Replace
        } else {
            Self::Append
        }
    }
}

/// Accumulates clause groups keyed by name, in first-insertion order.
#[derive(Debug, Clone, Default)]
pub struct StatementComposer {
    groups: Vec<ClauseGroup>,
}

impl StatementComposer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses `tokens` and merges the rendered fragments into group `operator`.
    ///
    /// Every token is parsed before the state is touched, so a malformed
    /// token leaves the composer unchanged.
    pub fn compose_group<S: AsRef<str>>(
        &mut self,
        operator: &str,
        tokens: &[S],
        override_existing: bool,
    ) -> Result<()> {
        let keyword = operator.to_uppercase();
        let fragments = tokens
            .iter()
            .map(|token| parse_condition(token.as_ref()).map(|cond| render_fragment(&keyword, &cond)))
            .collect::<Result<Vec<_>>>()?;

        info!(
            "compose {} ({} condition{}, override={})",
            operator,
            fragments.len(),
            if fragments.len() == 1 { "" } else { "s" },
            override_existing
        );
        self.upsert(operator, fragments, MergeMode::from_override(override_existing));
        Ok(())
    }

    /// Appends raw fragments to group `name`, creating it if needed.
    pub fn merge_named(&mut self, name: &str, fragments: Vec<String>) {
        self.upsert(name, fragments, MergeMode::Append);
    }

    /// Inserts or updates group `name` according to `mode`.
    pub fn upsert(&mut self, name: &str, values: Vec<String>, mode: MergeMode) {
        debug!("upsert {} {:?} {:?}", name, mode, values);
        match self.groups.iter_mut().find(|g| g.name == name) {
            Some(group) => match mode {
                MergeMode::Append => group.values.extend(values),
                MergeMode::Replace => group.values = values,
            },
            None => self.groups.push(ClauseGroup::new(name, values)),
        }
    }

    /// Returns the accumulated groups.
    pub fn current_groups(&self) -> &[ClauseGroup] {
        &self.groups
    }

    /// Returns the group with the given name.
    pub fn group(&self, name: &str) -> Option<&ClauseGroup> {
        self.groups.iter().find(|g| g.name == name)
    }
}

/// Renders one condition as `KEYWORD key <comparison>`.
fn render_fragment(keyword: &str, cond: &Condition) -> String {
    let key = &cond.key;
    match (cond.op, cond.list_values()) {
        (Operator::Equals, Some(items)) => format!("{keyword} {key} IN {}", quote_list(&items)),
        (Operator::Equals, None) => format!("{keyword} {key} = '{}'", cond.value),
        (Operator::Like, _) => format!("{keyword} {key} LIKE '%{}%'", cond.value),
        (Operator::NotEquals, Some(items)) => {
            format!("{keyword} {key} NOT IN {}", quote_list(&items))
        }
        (Operator::NotEquals, None) => format!("{keyword} {key} != '{}'", cond.value),
    }
}

/// Renders `('a', 'b')`.
fn quote_list(items: &[&str]) -> String {
    let quoted: Vec<String> = items.iter().map(|item| format!("'{item}'")).collect();
    format!("({})", quoted.join(", "))
}
