//! Final SQL assembly.
//!
//! Clause groups are spliced into their `{name}` placeholders and any
//! placeholder left over afterwards is removed, so that groups the caller did
//! not supply vanish instead of reaching the engine as literal braces.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use super::composer::ClauseGroup;

static ANY_PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{.*?\}").expect("placeholder pattern is valid"));

/// Replaces every `{group.name}` in `template` with the group's joined fragments.
pub fn assemble(template: &str, groups: &[ClauseGroup]) -> String {
    groups.iter().fold(template.to_string(), |sql, group| {
        let placeholder = format!("{{{}}}", group.name);
        sql.replace(&placeholder, &group.joined())
    })
}

/// Removes any remaining `{...}` span (shortest match).
pub fn strip_unresolved(sql: &str) -> String {
    let stripped = ANY_PLACEHOLDER.replace_all(sql, "");
    if stripped != sql {
        debug!("stripped unresolved placeholders");
    }
    stripped.into_owned()
}
