//! Candidate preparation: sanitized names and isolated sources.

use crate::isolate::{Isolation, isolate, is_valid_identifier};
use crate::module::BenchmarkModule;
use std::collections::HashSet;

/// One implementation ready for the sandbox
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Name as given in the module description, used in all output
    pub raw_name: String,
    /// Identifier-safe name the entry point is bound to
    pub name: String,
    /// Source as given in the module description
    pub source: String,
    /// Rewritten source and how the entry point was bound
    pub isolation: Isolation,
}

/// Strip a raw implementation name down to a legal identifier.
///
/// Only ASCII alphanumerics and `_` survive. An empty result becomes
/// `candidate_<index>`; a result that is still not a legal identifier
/// (leading digit, reserved word) gets a `_` prefix.
pub fn sanitize_name(raw: &str, index: usize) -> String {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();

    if cleaned.is_empty() {
        format!("candidate_{index}")
    } else if is_valid_identifier(&cleaned) {
        cleaned
    } else {
        format!("_{cleaned}")
    }
}

/// Sanitize and isolate every implementation, in module order.
///
/// Names that collide after sanitizing get a numeric suffix so that every
/// candidate binds a distinct identifier.
pub fn prepare_candidates(module: &BenchmarkModule) -> Vec<Candidate> {
    let entry_point = module.entry_point.as_deref();
    let mut taken = HashSet::new();

    module
        .implementations
        .iter()
        .enumerate()
        .map(|(index, (raw_name, source))| {
            let base = sanitize_name(raw_name, index);
            let mut name = base.clone();
            let mut suffix = 2;
            while !taken.insert(name.clone()) {
                name = format!("{base}_{suffix}");
                suffix += 1;
            }
            if name != *raw_name {
                tracing::debug!(raw = %raw_name, sanitized = %name, "renamed candidate");
            }

            let isolation = isolate(source, entry_point, &name);
            Candidate {
                raw_name: raw_name.clone(),
                name,
                source: source.clone(),
                isolation,
            }
        })
        .collect()
}
