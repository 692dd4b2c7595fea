//! Normalisation of user-supplied converter flags.

use crate::identifier::Template;

/// Flags that take a value and are managed by the orchestrator.
const MANAGED_FLAGS: &[&str] = &["-o", "-d"];
const TEMPLATE_FLAG: &str = "-f";

/// User flags split into a template override and pass-through flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedFlags {
    /// Template given with `-f`, if any.
    pub template: Option<Template>,
    /// Remaining flags in their original order.
    pub extra: Vec<String>,
}

/// Pulls `-f <template>` out of `flags` and drops `-o`/`-d` with their values.
///
/// The last `-f` wins.
pub fn normalize_flags(flags: &[String]) -> NormalizedFlags {
    let mut normalized = NormalizedFlags::default();
    let mut iter = flags.iter();
    while let Some(flag) = iter.next() {
        if flag == TEMPLATE_FLAG {
            if let Some(value) = iter.next() {
                normalized.template = Some(Template::new(value.as_str()));
            }
        } else if MANAGED_FLAGS.contains(&flag.as_str()) {
            iter.next();
        } else {
            normalized.extra.push(flag.clone());
        }
    }
    normalized
}
