//! Root alias extraction from a query template.
//!
//! The alias is found textually: the text between `FROM` and the first join
//! keyword is split on whitespace and its last token wins. This covers both
//! `FROM Employee e` and `FROM Employee AS e`. It is a heuristic, not a parse;
//! templates the patterns cannot isolate fall back to the last token of the
//! whole template.

use crate::error::QueryError;
use once_cell::sync::Lazy;
use regex::Regex;

/// `FROM <root> <join keyword>`: the root clause ends at the first keyword that
/// cannot belong to a table reference.
static ROOT_CLAUSE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bfrom\s+(.+?)\s+(?:left|right|inner|join|where|group\s+by|order\s+by|limit)\b")
        .unwrap_or_else(|e| panic!("invalid root clause pattern: {e}"))
});

/// `FROM <rest>` when no join keyword follows.
static FROM_REMAINDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bfrom\s+(.+)").unwrap_or_else(|e| panic!("invalid from pattern: {e}"))
});

/// Collapse carriage returns, line feeds and tabs to single spaces.
pub(crate) fn normalize_whitespace(text: &str) -> String {
    text.replace(['\r', '\n', '\t'], " ")
}

/// The table alias a template binds to, used to qualify bare column names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RootAlias(String);

impl RootAlias {
    /// Extract the alias from a query template
    ///
    /// # Errors
    ///
    /// Returns `QueryError::Configuration` if the template is blank.
    ///
    /// # Examples
    ///
    /// ```
    /// use sluice::RootAlias;
    ///
    /// let alias = RootAlias::from_template("select e.* from Employee AS e left join Dept d on d.id = e.dept_id")?;
    /// assert_eq!(alias.as_str(), "e");
    /// # Ok::<(), sluice::QueryError>(())
    /// ```
    pub fn from_template(template: &str) -> Result<Self, QueryError> {
        let text = normalize_whitespace(template);
        if text.trim().is_empty() {
            return Err(QueryError::configuration("query is not valid: template is empty"));
        }

        let root_clause = if let Some(caps) = ROOT_CLAUSE.captures(&text) {
            caps.get(1).map(|m| m.as_str())
        } else if let Some(caps) = FROM_REMAINDER.captures(&text) {
            caps.get(1).map(|m| m.as_str())
        } else {
            log::warn!("query template has no FROM clause, using its last token as alias");
            None
        };

        let alias = root_clause
            .unwrap_or(&text)
            .split_whitespace()
            .last()
            .ok_or_else(|| QueryError::configuration("query is not valid: no alias found"))?;

        log::trace!("resolved root alias `{alias}`");
        Ok(Self(alias.to_string()))
    }

    /// Use an alias supplied by the caller instead of deriving it
    ///
    /// # Errors
    ///
    /// Returns `QueryError::Configuration` if the alias is blank.
    pub fn explicit(alias: &str) -> Result<Self, QueryError> {
        normalize_whitespace(alias)
            .split_whitespace()
            .last()
            .map(|a| Self(a.to_string()))
            .ok_or_else(|| QueryError::configuration("query alias is empty"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Qualify a column with this alias unless it is already dotted.
    pub fn qualify(&self, column: &str) -> String {
        if column.contains('.') {
            column.to_string()
        } else {
            format!("{}.{}", self.0, column)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_alias() {
        let alias = RootAlias::from_template("from Employee e").unwrap();
        assert_eq!(alias.as_str(), "e");
    }

    #[test]
    fn test_as_alias() {
        let alias = RootAlias::from_template("SELECT * FROM Employee AS emp").unwrap();
        assert_eq!(alias.as_str(), "emp");
    }

    #[test]
    fn test_alias_before_join_keyword() {
        let alias = RootAlias::from_template(
            "select e.name, d.name from Employee e LEFT OUTER JOIN Dept d on d.id = e.dept_id",
        )
        .unwrap();
        assert_eq!(alias.as_str(), "e");

        let alias = RootAlias::from_template("select * from Employee x inner join Dept d on d.id = x.d").unwrap();
        assert_eq!(alias.as_str(), "x");
    }

    #[test]
    fn test_alias_before_where() {
        let alias = RootAlias::from_template("select * from Employee e where e.active = true").unwrap();
        assert_eq!(alias.as_str(), "e");
    }

    #[test]
    fn test_alias_across_newlines_and_tabs() {
        let alias = RootAlias::from_template("select *\r\n\tfrom\tEmployee\n e\n").unwrap();
        assert_eq!(alias.as_str(), "e");
    }

    #[test]
    fn test_from_inside_column_name_is_ignored() {
        let alias = RootAlias::from_template("select e.from_date from Employee e").unwrap();
        assert_eq!(alias.as_str(), "e");
    }

    #[test]
    fn test_no_from_falls_back_to_last_token() {
        let alias = RootAlias::from_template("Employee e").unwrap();
        assert_eq!(alias.as_str(), "e");
    }

    #[test]
    fn test_empty_template_is_rejected() {
        assert!(matches!(RootAlias::from_template(""), Err(QueryError::Configuration(_))));
        assert!(matches!(RootAlias::from_template(" \n\t "), Err(QueryError::Configuration(_))));
    }

    #[test]
    fn test_qualify() {
        let alias = RootAlias::explicit("e").unwrap();
        assert_eq!(alias.qualify("status"), "e.status");
        assert_eq!(alias.qualify("d.name"), "d.name");
    }
}
