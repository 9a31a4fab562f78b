//! Index model.

use crate::expr::Expr;

/// An index over columns and/or expressions of one table.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Index {
    /// Owning table; set when the index is added to a table.
    pub table: String,
    /// Indexed columns in order.
    pub columns: Vec<String>,
    /// Indexed expressions (functional index).
    pub functions: Vec<Expr>,
    /// Unique index.
    pub unique: bool,
    /// Explicit name.
    pub name: Option<String>,
    /// Vendor type tag such as `HASH` or `GIN`.
    pub index_type: Option<String>,
    /// Partial-index predicate.
    pub filter: Option<Expr>,
}

impl Index {
    /// A plain index over `columns`.
    #[must_use]
    pub fn new(columns: &[&str]) -> Self {
        Self {
            table: String::new(),
            columns: columns.iter().map(|c| String::from(*c)).collect(),
            functions: Vec::new(),
            unique: false,
            name: None,
            index_type: None,
            filter: None,
        }
    }

    /// A unique index over `columns`.
    #[must_use]
    pub fn unique(columns: &[&str]) -> Self {
        Self {
            unique: true,
            ..Self::new(columns)
        }
    }

    /// Sets the name.
    #[must_use]
    pub fn named(mut self, name: &str) -> Self {
        self.name = Some(String::from(name));
        self
    }

    /// Sets the vendor type tag.
    #[must_use]
    pub fn index_type(mut self, tag: &str) -> Self {
        self.index_type = Some(String::from(tag));
        self
    }

    /// Sets the partial-index predicate.
    #[must_use]
    pub fn filter(mut self, predicate: Expr) -> Self {
        self.filter = Some(predicate);
        self
    }

    /// Adds an indexed expression.
    #[must_use]
    pub fn function(mut self, expr: Expr) -> Self {
        self.functions.push(expr);
        self
    }

    /// Explicit name, or `{table}_{columns}` with a `_unique` suffix for
    /// unique indices.
    #[must_use]
    pub fn index_name(&self) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }
        let mut parts = vec![self.table.clone()];
        parts.extend(self.columns.iter().cloned());
        if !self.functions.is_empty() {
            parts.push(format!("fn{}", self.functions.len()));
        }
        let mut name = parts.join("_");
        if self.unique {
            name.push_str("_unique");
        }
        name
    }
}
