//! Dynamic WHERE clause assembly shared by the list queries.

/// Collects SQL conditions and numbers their `$n` placeholders.
///
/// Each `{}` in a pushed condition becomes the same placeholder, so a search
/// term bound once can be matched against several columns.
#[derive(Debug, Default)]
pub(crate) struct FilterBuilder {
    conditions: Vec<String>,
    param_count: usize,
}

impl FilterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a condition that consumes one bind parameter.
    pub fn push(&mut self, condition: &str) -> &mut Self {
        self.param_count += 1;
        let placeholder = format!("${}", self.param_count);
        self.conditions.push(condition.replace("{}", &placeholder));
        self
    }

    /// Adds a condition without parameters.
    pub fn push_static(&mut self, condition: &str) -> &mut Self {
        self.conditions.push(condition.to_string());
        self
    }

    pub fn where_clause(&self) -> String {
        if self.conditions.is_empty() {
            "TRUE".to_string()
        } else {
            self.conditions.join(" AND ")
        }
    }

    pub fn param_count(&self) -> usize {
        self.param_count
    }

    /// `LIMIT $a OFFSET $b` for the two parameters bound after the filters.
    pub fn limit_offset(&self) -> String {
        format!("LIMIT ${} OFFSET ${}", self.param_count + 1, self.param_count + 2)
    }
}

/// `%term%` for ILIKE searches.
pub(crate) fn like_pattern(term: &str) -> String {
    format!("%{}%", term.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_placeholders_numbered_in_push_order() {
        let mut filter = FilterBuilder::new();
        filter
            .push("status = {}")
            .push_static("is_active")
            .push("(name ILIKE {} OR code ILIKE {})");
        assert_eq!(
            filter.where_clause(),
            "status = $1 AND is_active AND (name ILIKE $2 OR code ILIKE $2)"
        );
        assert_eq!(filter.param_count(), 2);
        assert_eq!(filter.limit_offset(), "LIMIT $3 OFFSET $4");
    }

    #[test]
    fn test_empty_filter_is_true() {
        let filter = FilterBuilder::new();
        assert_eq!(filter.where_clause(), "TRUE");
        assert_eq!(filter.limit_offset(), "LIMIT $1 OFFSET $2");
    }

    #[test]
    fn test_like_pattern_trims() {
        assert_eq!(like_pattern("  Telekom "), "%Telekom%");
    }
}
