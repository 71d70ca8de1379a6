//! ORDER BY and GROUP BY directives.

use crate::alias::RootAlias;
use serde::{Deserialize, Serialize};

/// Sort direction of an order entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
    /// The property is a raw order expression that already carries its direction
    Query,
}

impl Direction {
    pub fn label(self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
            Direction::Query => "",
        }
    }
}

/// One ORDER BY entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub property: String,
    pub direction: Direction,
}

impl Order {
    pub fn new(property: impl Into<String>, direction: Direction) -> Self {
        Self {
            property: property.into(),
            direction,
        }
    }

    fn render(&self, alias: &RootAlias) -> String {
        match self.direction {
            Direction::Query => self.property.clone(),
            direction => format!("{} {}", alias.qualify(&self.property), direction.label()),
        }
    }
}

/// Ordered sequence of ORDER BY entries
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    orders: Vec<Order>,
}

impl Sort {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn by(property: impl Into<String>, direction: Direction) -> Self {
        Self::new().then(property, direction)
    }

    pub fn then(mut self, property: impl Into<String>, direction: Direction) -> Self {
        self.orders.push(Order::new(property, direction));
        self
    }

    pub fn asc(self, property: impl Into<String>) -> Self {
        self.then(property, Direction::Asc)
    }

    pub fn desc(self, property: impl Into<String>) -> Self {
        self.then(property, Direction::Desc)
    }

    /// Raw order expression inserted verbatim, e.g. `coalesce(e.rank, 0) desc`
    pub fn raw(self, expression: impl Into<String>) -> Self {
        self.then(expression, Direction::Query)
    }

    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Comma joined, alias-qualified order list
    pub fn render(&self, alias: &RootAlias) -> String {
        self.orders
            .iter()
            .map(|order| order.render(alias))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Ordered sequence of GROUP BY properties
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupBy {
    properties: Vec<String>,
}

impl GroupBy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn by(property: impl Into<String>) -> Self {
        Self::new().then(property)
    }

    pub fn then(mut self, property: impl Into<String>) -> Self {
        self.properties.push(property.into());
        self
    }

    pub fn properties(&self) -> &[String] {
        &self.properties
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Comma joined, alias-qualified property list
    pub fn render(&self, alias: &RootAlias) -> String {
        self.properties
            .iter()
            .map(|property| alias.qualify(property))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alias() -> RootAlias {
        RootAlias::explicit("e").unwrap()
    }

    #[test]
    fn test_sort_render() {
        let sort = Sort::by("name", Direction::Asc).desc("d.created").raw("coalesce(e.rank, 0) desc");
        assert_eq!(sort.render(&alias()), "e.name ASC, d.created DESC, coalesce(e.rank, 0) desc");
        assert_eq!(sort.orders().len(), 3);
    }

    #[test]
    fn test_group_by_render() {
        let group = GroupBy::by("dept").then("d.city");
        assert_eq!(group.render(&alias()), "e.dept, d.city");
    }

    #[test]
    fn test_sort_deserializes() {
        let sort: Sort = serde_json::from_str(
            r#"{"orders":[{"property":"name","direction":"DESC"},{"property":"id desc","direction":"QUERY"}]}"#,
        )
        .unwrap();
        assert_eq!(sort.render(&alias()), "e.name DESC, id desc");
    }
}
