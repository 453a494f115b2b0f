//! Structured search predicates.
//!
//! List endpoints accept a free-text query and a few scoping ids. Instead of
//! splicing those into SQL, handlers build a [`SearchFilter`] and compile it
//! to a clause with positional placeholders plus the bound values.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Filter operator for field comparisons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterOperator {
    /// Equal to
    Eq,
    /// Case-insensitive substring match on the column's text form
    Contains,
    /// Not any of a list of integers
    NotIn,
}

/// Value bound to a placeholder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SearchValue {
    Int(i32),
    Text(String),
    IntList(Vec<i32>),
}

impl From<i32> for SearchValue {
    fn from(v: i32) -> Self {
        SearchValue::Int(v)
    }
}

impl From<&str> for SearchValue {
    fn from(v: &str) -> Self {
        SearchValue::Text(v.to_string())
    }
}

impl From<String> for SearchValue {
    fn from(v: String) -> Self {
        SearchValue::Text(v)
    }
}

/// A single `column <op> value` condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Predicate {
    pub column: String,
    pub operator: FilterOperator,
    pub value: SearchValue,
}

/// Conjunction of required predicates plus an optional disjunctive
/// free-text group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilter {
    all_of: Vec<Predicate>,
    any_of: Vec<Predicate>,
}

/// Compiled clause. `clause` is empty when the filter has no predicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompiledPredicate {
    pub clause: String,
    pub params: Vec<SearchValue>,
}

impl CompiledPredicate {
    /// `WHERE <clause>` or an empty string.
    pub fn where_clause(&self) -> String {
        if self.clause.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clause)
        }
    }
}

impl SearchFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Require `column = value`.
    pub fn with_eq(mut self, column: &str, value: impl Into<SearchValue>) -> Self {
        self.all_of.push(Predicate {
            column: column.to_string(),
            operator: FilterOperator::Eq,
            value: value.into(),
        });
        self
    }

    /// Require `column = value` when a value is present.
    pub fn with_optional_eq(self, column: &str, value: Option<i32>) -> Self {
        match value {
            Some(v) => self.with_eq(column, v),
            None => self,
        }
    }

    /// Require `column` to differ from every value in `values`.
    pub fn with_not_in(mut self, column: &str, values: &[i32]) -> Self {
        self.all_of.push(Predicate {
            column: column.to_string(),
            operator: FilterOperator::NotIn,
            value: SearchValue::IntList(values.to_vec()),
        });
        self
    }

    /// Match `text` as a substring of any of `columns`. Blank text adds nothing.
    pub fn with_text(mut self, columns: &[&str], text: Option<&str>) -> Self {
        let Some(text) = text.map(str::trim).filter(|t| !t.is_empty()) else {
            return self;
        };
        for column in columns {
            self.any_of.push(Predicate {
                column: column.to_string(),
                operator: FilterOperator::Contains,
                value: SearchValue::Text(text.to_string()),
            });
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.all_of.is_empty() && self.any_of.is_empty()
    }

    /// Compile to SQL with placeholders starting at `$first_param`.
    ///
    /// Column names are qualified with `alias` when given and must be plain
    /// lowercase identifiers.
    pub fn compile(
        &self,
        alias: Option<&str>,
        first_param: usize,
    ) -> Result<CompiledPredicate, ValidationError> {
        let mut params = Vec::new();
        let mut next = first_param;
        let mut render = |p: &Predicate| -> Result<String, ValidationError> {
            validate_identifier(&p.column)?;
            let column = match alias {
                Some(a) => {
                    validate_identifier(a)?;
                    format!("{}.{}", a, p.column)
                }
                None => p.column.clone(),
            };
            let sql = match p.operator {
                FilterOperator::Eq => {
                    params.push(p.value.clone());
                    format!("{} = ${}", column, next)
                }
                FilterOperator::NotIn => {
                    params.push(p.value.clone());
                    format!("{} <> ALL(${})", column, next)
                }
                FilterOperator::Contains => {
                    let text = match &p.value {
                        SearchValue::Text(t) => t.clone(),
                        SearchValue::Int(i) => i.to_string(),
                        SearchValue::IntList(_) => String::new(),
                    };
                    params.push(SearchValue::Text(format!("%{}%", escape_like(&text))));
                    format!("CAST({} AS TEXT) ILIKE ${} ESCAPE '\\'", column, next)
                }
            };
            next += 1;
            Ok(sql)
        };

        let mut parts = Vec::with_capacity(self.all_of.len() + 1);
        for p in &self.all_of {
            parts.push(render(p)?);
        }
        if !self.any_of.is_empty() {
            let mut alternatives = Vec::with_capacity(self.any_of.len());
            for p in &self.any_of {
                alternatives.push(render(p)?);
            }
            parts.push(format!("({})", alternatives.join(" OR ")));
        }

        Ok(CompiledPredicate {
            clause: parts.join(" AND "),
            params,
        })
    }
}

fn validate_identifier(ident: &str) -> Result<(), ValidationError> {
    let mut chars = ident.chars();
    let valid = matches!(chars.next(), Some(c) if c.is_ascii_lowercase() || c == '_')
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(ValidationError::InvalidIdentifier {
            column: ident.to_string(),
        })
    }
}

/// Escape LIKE metacharacters so user text matches literally.
fn escape_like(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
