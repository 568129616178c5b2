//! Once-per-invocation deprecation notices.

use std::collections::HashSet;

/// Where a deprecated name was used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Usage {
    Filter,
    Sort,
    OutputParameter,
    Element,
}

impl Usage {
    fn as_str(self) -> &'static str {
        match self {
            Usage::Filter => "data source filter",
            Usage::Sort => "data source sort",
            Usage::OutputParameter => "data source output parameter",
            Usage::Element => "data source field",
        }
    }
}

/// A recorded deprecation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeprecationNotice {
    pub usage: Usage,
    pub deprecated: String,
    pub replacement: String,
}

/// Collects deprecated usages, logging each distinct one once.
///
/// Owned by a single invocation; pass a fresh log per `execute`.
#[derive(Debug, Default)]
pub struct DeprecationLog {
    seen: HashSet<(Usage, String)>,
    notices: Vec<DeprecationNotice>,
}

impl DeprecationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `deprecated` was used; `replacement` is the modern name.
    pub fn notice(&mut self, usage: Usage, deprecated: &str, replacement: &str) {
        if !self.seen.insert((usage, deprecated.to_string())) {
            return;
        }
        tracing::warn!(
            deprecated,
            replacement,
            "the `{deprecated}` {} is deprecated",
            usage.as_str()
        );
        self.notices.push(DeprecationNotice {
            usage,
            deprecated: deprecated.to_string(),
            replacement: replacement.to_string(),
        });
    }

    /// Notices recorded so far, in first-use order.
    pub fn notices(&self) -> &[DeprecationNotice] {
        &self.notices
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn each_usage_is_recorded_once() {
        let mut log = DeprecationLog::new();
        log.notice(Usage::Filter, "system:date", "system:creation-date");
        log.notice(Usage::Filter, "system:date", "system:creation-date");
        log.notice(Usage::Sort, "system:date", "system:creation-date");

        assert_eq!(log.notices().len(), 2);
    }
}
