//! Link templates with `{name}` placeholders.

use serde::Serialize;

/// An immutable URL template such as
/// `https://explorer.ooni.io/measurement/{report_id}?input={input}`.
///
/// Placeholders without a matching value are left untouched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct LinkTemplate(String);

impl LinkTemplate {
    pub fn new(template: &str) -> Self {
        Self(template.to_string())
    }

    /// Substitute each `{name}` with its value in a single pass over the
    /// template. Values are inserted verbatim and never re-scanned.
    pub fn render(&self, values: &[(&str, &str)]) -> String {
        let mut out = String::with_capacity(self.0.len());
        let mut rest = self.0.as_str();

        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let tail = &rest[open..];

            let Some(close) = tail.find('}') else {
                break;
            };
            let name = &tail[1..close];

            match values.iter().find(|(key, _)| *key == name) {
                Some((_, value)) => out.push_str(value),
                None => out.push_str(&tail[..=close]),
            }
            rest = &tail[close + 1..];
        }

        if let Some(open) = rest.find('{') {
            // Unterminated placeholder.
            out.push_str(&rest[open..]);
        } else {
            out.push_str(rest);
        }
        out
    }
}
