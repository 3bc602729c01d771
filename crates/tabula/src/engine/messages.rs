use crate::config::MessageRule;

use regex::Regex;
use tabula_core::Error;

/// Rewrites driver failures into messages fit for the end user.
#[derive(Debug, Default)]
pub(super) struct Messages {
    rules: Vec<(Regex, String)>,
}

impl Messages {
    /// Rules with an invalid pattern are skipped.
    pub(super) fn new(rules: &[MessageRule]) -> Messages {
        let rules = rules
            .iter()
            .filter_map(|rule| match Regex::new(&rule.pattern) {
                Ok(regex) => Some((regex, rule.message.clone())),
                Err(err) => {
                    tracing::warn!(pattern = %rule.pattern, error = %err, "ignoring message rule");
                    None
                }
            })
            .collect();
        Messages { rules }
    }

    /// Driver failures become [`Error::query_failed`]: the first matching
    /// rule supplies the message, otherwise the raw driver text is kept.
    /// Other errors pass through.
    pub(super) fn translate(&self, err: Error) -> Error {
        if !err.is_driver_operation_failed() {
            return err;
        }
        let raw = err.to_string();

        for (regex, template) in &self.rules {
            if let Some(caps) = regex.captures(&raw) {
                let mut message = String::new();
                caps.expand(template, &mut message);
                return Error::query_failed(message, raw);
            }
        }
        Error::query_failed(raw.clone(), raw)
    }
}
