//! Identifier derivation for generated code
//!
//! Field names in schemas are camel case. Generated constants are upper snake
//! case and generated methods lower snake case; both insert `_` only where an
//! uppercase letter directly follows a lowercase one.

use std::collections::HashSet;

/// Upper-snake-case constant name for a field: `lastFetchTime` -> `LAST_FETCH_TIME`
pub fn constant_name(field: &str) -> String {
    split_camel(field).to_uppercase()
}

/// Lower-snake-case method suffix for a field: `baseUrl` -> `base_url`
pub fn method_suffix(field: &str) -> String {
    split_camel(field).to_lowercase()
}

fn split_camel(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for c in name.chars() {
        if c.is_uppercase() && prev_lower {
            out.push('_');
        }
        prev_lower = c.is_lowercase();
        out.push(c);
    }
    out
}

/// Returns `base`, or `base` with the smallest numeric suffix not yet used
pub fn unique_name(base: &str, used: &mut HashSet<String>) -> String {
    if used.insert(base.to_string()) {
        return base.to_string();
    }
    let mut n = 2;
    loop {
        let candidate = format!("{}{}", base, n);
        if used.insert(candidate.clone()) {
            return candidate;
        }
        n += 1;
    }
}
