//! `${name}` placeholder expansion.
//!
//! Configuration values such as `${cache}/static/export` or
//! `images/${date}` reference values known only at run time. A lone `$` not
//! followed by `{` passes through unchanged.

use crate::error::{CoreError, Result};

/// Expand every `${name}` in `template` using `lookup`.
///
/// `lookup` returns `Ok(None)` for names it does not know, which is reported
/// as [`CoreError::Placeholder`]; a `${` without a closing `}` is
/// [`CoreError::UnterminatedPlaceholder`]. Errors returned by `lookup` itself
/// are propagated unchanged.
pub fn expand<F>(template: &str, mut lookup: F) -> Result<String>
where
    F: FnMut(&str) -> Result<Option<String>>,
{
    let mut result = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after
            .find('}')
            .ok_or_else(|| CoreError::unterminated_placeholder(after, template))?;

        let name = after[..end].trim();
        match lookup(name)? {
            Some(value) => result.push_str(&value),
            None => return Err(CoreError::placeholder(name, template)),
        }

        rest = &after[end + 1..];
    }

    result.push_str(rest);
    Ok(result)
}

/// List the placeholder names referenced by `template`, in order.
///
/// An unclosed `${` ends the scan.
#[must_use]
pub fn placeholders(template: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut rest = template;

    while let Some(start) = rest.find("${") {
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            break;
        };
        names.push(after[..end].trim().to_string());
        rest = &after[end + 1..];
    }

    names
}
