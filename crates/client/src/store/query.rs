//! Collection names, row filters and select queries.

use core::fmt;

use bazaar_core::types::id::canonicalize;

/// Named collections exposed by the remote store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Products,
    Favorites,
    CartItems,
    Categories,
    Campaigns,
}

impl Collection {
    /// Table name on the remote store.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Products => "products",
            Self::Favorites => "favorites",
            Self::CartItems => "cart_items",
            Self::Categories => "categories",
            Self::Campaigns => "campaigns",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single row predicate. Values are kept in canonical string form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Condition {
    Eq { column: String, value: String },
    In { column: String, values: Vec<String> },
}

impl Condition {
    #[must_use]
    pub fn column(&self) -> &str {
        match self {
            Self::Eq { column, .. } | Self::In { column, .. } => column,
        }
    }

    /// Whether a canonical cell value satisfies the predicate.
    #[must_use]
    pub fn matches(&self, cell: &str) -> bool {
        match self {
            Self::Eq { value, .. } => value == cell,
            Self::In { values, .. } => values.iter().any(|v| v == cell),
        }
    }

    /// PostgREST operator syntax (`eq.5`, `in.(1,2)`).
    #[must_use]
    pub fn operator(&self) -> String {
        match self {
            Self::Eq { value, .. } => format!("eq.{value}"),
            Self::In { values, .. } => format!("in.({})", values.join(",")),
        }
    }
}

/// Conjunction of row predicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `column` to equal `value`.
    #[must_use]
    pub fn eq(mut self, column: &str, value: impl fmt::Display) -> Self {
        self.conditions.push(Condition::Eq {
            column: column.to_owned(),
            value: canonicalize(&value.to_string()),
        });
        self
    }

    /// Require `column` to be one of `values`.
    #[must_use]
    pub fn is_in<I, V>(mut self, column: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: fmt::Display,
    {
        self.conditions.push(Condition::In {
            column: column.to_owned(),
            values: values
                .into_iter()
                .map(|v| canonicalize(&v.to_string()))
                .collect(),
        });
        self
    }

    #[must_use]
    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .conditions
            .iter()
            .map(|c| format!("{}={}", c.column(), c.operator()))
            .collect();
        f.write_str(&parts.join("&"))
    }
}

/// A related row joined into each result row under `alias`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Embed {
    pub alias: &'static str,
    pub collection: Collection,
    /// Column on the selected row referencing the embedded row's `id`.
    pub foreign_key: &'static str,
}

impl Embed {
    /// Product projection joined on `product_id`.
    pub const PRODUCT: Self = Self {
        alias: "product",
        collection: Collection::Products,
        foreign_key: "product_id",
    };
}

/// Result ordering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub descending: bool,
}

/// A filtered read against one collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub collection: Collection,
    pub filter: Filter,
    pub embeds: Vec<Embed>,
    pub order: Option<Order>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

impl Query {
    #[must_use]
    pub fn new(collection: Collection) -> Self {
        Self {
            collection,
            filter: Filter::new(),
            embeds: Vec::new(),
            order: None,
            limit: None,
            offset: None,
        }
    }

    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    #[must_use]
    pub fn embed(mut self, embed: Embed) -> Self {
        self.embeds.push(embed);
        self
    }

    #[must_use]
    pub fn order_by(mut self, column: &str, descending: bool) -> Self {
        self.order = Some(Order {
            column: column.to_owned(),
            descending,
        });
        self
    }

    #[must_use]
    pub const fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    #[must_use]
    pub const fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// PostgREST `select` parameter, e.g. `*,product:products(*)`.
    #[must_use]
    pub fn select_clause(&self) -> String {
        let mut clause = String::from("*");
        for embed in &self.embeds {
            clause.push_str(&format!(",{}:{}(*)", embed.alias, embed.collection));
        }
        clause
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_display_uses_canonical_values() {
        let filter = Filter::new().eq("user_id", " u-1 ").is_in("product_id", [3, 4]);
        assert_eq!(filter.to_string(), "user_id=eq.u-1&product_id=in.(3,4)");
    }

    #[test]
    fn test_condition_matches() {
        let cond = Condition::In {
            column: "id".to_string(),
            values: vec!["1".to_string(), "2".to_string()],
        };
        assert!(cond.matches("2"));
        assert!(!cond.matches("3"));
    }

    #[test]
    fn test_select_clause_with_embed() {
        let query = Query::new(Collection::Favorites).embed(Embed::PRODUCT);
        assert_eq!(query.select_clause(), "*,product:products(*)");
        assert_eq!(Query::new(Collection::Products).select_clause(), "*");
    }
}
