//! `@name` token substitution

use crate::types::ReplacementSet;

/// Replace every literal `@name` in `text` with the value bound to `name`.
///
/// Matching is plain substring replacement with no token boundaries, so
/// `@id` also matches inside `@identifier`. Names are applied longest first
/// (ties by name), which makes `@AB` win over `@A`. Values are not rescanned
/// for the name currently being applied, but a later, shorter name may still
/// match text introduced by an earlier value.
pub fn substitute(text: &str, replacements: &ReplacementSet) -> String {
    let mut out = text.to_string();
    for (name, value) in replacements.ordered_pairs() {
        let token = format!("@{}", name);
        if out.contains(&token) {
            out = out.replace(&token, value);
        }
    }
    out
}
