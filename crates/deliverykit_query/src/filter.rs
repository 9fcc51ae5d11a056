//! Filter trees: which records match a query.
//!
//! A [`FilterTree`] maps field paths to either a literal (implicit
//! equality) or an operator object, and may carry `$and` / `$or`
//! combinators wrapping whole sub-trees. The [`Filterable`] trait exposes
//! the fluent predicate methods on the tree itself and on every
//! descriptor that owns one.

use crate::error::{QueryError, QueryResult};
use crate::field::validate_field_path;
use crate::value::Scalar;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Comparison, membership and pattern operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Operator {
    /// `$ne`
    NotEquals,
    /// `$lt`
    LessThan,
    /// `$lte`
    LessOrEqual,
    /// `$gt`
    GreaterThan,
    /// `$gte`
    GreaterOrEqual,
    /// `$in`
    ContainedIn,
    /// `$nin`
    NotContainedIn,
    /// `$exists`
    Exists,
    /// `$regex`
    Regex,
    /// `$options`, the flags attached to `$regex`.
    RegexOptions,
    /// `$in_query`, matching references whose target satisfies a sub-filter.
    InQuery,
    /// `$nin_query`
    NotInQuery,
}

impl Operator {
    /// Returns the reserved wire key for this operator.
    pub fn wire_key(&self) -> &'static str {
        match self {
            Operator::NotEquals => "$ne",
            Operator::LessThan => "$lt",
            Operator::LessOrEqual => "$lte",
            Operator::GreaterThan => "$gt",
            Operator::GreaterOrEqual => "$gte",
            Operator::ContainedIn => "$in",
            Operator::NotContainedIn => "$nin",
            Operator::Exists => "$exists",
            Operator::Regex => "$regex",
            Operator::RegexOptions => "$options",
            Operator::InQuery => "$in_query",
            Operator::NotInQuery => "$nin_query",
        }
    }
}

/// Logical combinators over whole filter trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Combinator {
    /// `$and`
    And,
    /// `$or`
    Or,
}

impl Combinator {
    /// Returns the reserved wire key for this combinator.
    pub fn wire_key(&self) -> &'static str {
        match self {
            Combinator::And => "$and",
            Combinator::Or => "$or",
        }
    }
}

const REGEX_FLAGS: &str = "imsx";

#[derive(Debug, Clone, PartialEq)]
enum Condition {
    Equals(Value),
    Operators(BTreeMap<Operator, Value>),
}

impl Condition {
    fn to_json(&self) -> Value {
        match self {
            Condition::Equals(value) => value.clone(),
            Condition::Operators(ops) => Value::Object(
                ops.iter()
                    .map(|(op, value)| (op.wire_key().to_string(), value.clone()))
                    .collect(),
            ),
        }
    }
}

/// A structured "which records match" expression.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterTree {
    conditions: BTreeMap<String, Condition>,
    combinators: BTreeMap<Combinator, Vec<FilterTree>>,
}

impl FilterTree {
    /// Creates an empty filter tree.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the tree holds no predicate and no combinator.
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty() && self.combinators.is_empty()
    }

    /// Returns the number of top-level field paths carrying a predicate.
    pub fn field_count(&self) -> usize {
        self.conditions.len()
    }

    /// Returns true if `path` carries a predicate at the top level.
    pub fn contains_field(&self, path: &str) -> bool {
        self.conditions.contains_key(path)
    }

    /// Flattens the tree into its nested-object wire shape.
    pub fn to_json(&self) -> Value {
        let mut object = Map::new();
        for (path, condition) in &self.conditions {
            object.insert(path.clone(), condition.to_json());
        }
        for (combinator, trees) in &self.combinators {
            object.insert(
                combinator.wire_key().to_string(),
                Value::Array(trees.iter().map(FilterTree::to_json).collect()),
            );
        }
        Value::Object(object)
    }

    fn set_equals(&mut self, path: &str, value: Scalar) -> QueryResult<()> {
        validate_field_path(path)?;
        let value = value.operand(path)?;
        self.conditions
            .insert(path.to_string(), Condition::Equals(value));
        Ok(())
    }

    fn set_operator(&mut self, path: &str, op: Operator, value: Value) -> QueryResult<()> {
        validate_field_path(path)?;
        match self.conditions.get_mut(path) {
            Some(Condition::Operators(ops)) => {
                ops.insert(op, value);
            }
            _ => {
                let mut ops = BTreeMap::new();
                ops.insert(op, value);
                self.conditions
                    .insert(path.to_string(), Condition::Operators(ops));
            }
        }
        Ok(())
    }

    fn clear_operator(&mut self, path: &str, op: Operator) {
        if let Some(Condition::Operators(ops)) = self.conditions.get_mut(path) {
            ops.remove(&op);
        }
    }

    fn combine(&mut self, combinator: Combinator, trees: Vec<FilterTree>) {
        self.combinators.insert(combinator, trees);
    }
}

fn scalar_array<I, V>(path: &str, values: I) -> QueryResult<Value>
where
    I: IntoIterator<Item = V>,
    V: Into<Scalar>,
{
    values
        .into_iter()
        .map(|v| v.into().operand(path))
        .collect::<QueryResult<Vec<_>>>()
        .map(Value::Array)
}

fn validate_regex_options(options: &str) -> QueryResult<()> {
    match options.chars().find(|c| !REGEX_FLAGS.contains(*c)) {
        Some(flag) => Err(QueryError::InvalidRegexOptions {
            options: options.to_string(),
            flag,
        }),
        None => Ok(()),
    }
}

/// Fluent predicate methods for anything that owns a [`FilterTree`].
///
/// Every predicate validates its field path first and returns the same
/// builder on success, so calls chain with `?`:
///
/// ```
/// use deliverykit_query::{Filterable, Query};
///
/// # fn main() -> deliverykit_query::QueryResult<()> {
/// let mut query = Query::entries("product");
/// query.where_eq("title", "Women")?.greater_than("price", 100)?;
/// # Ok(())
/// # }
/// ```
///
/// Direct equality on a path that already carries a predicate overwrites
/// it. Operators on the same path merge into one operator object, so a
/// range reads `{"price": {"$gt": 10, "$lt": 20}}`.
pub trait Filterable: Sized {
    /// Returns the filter tree this builder writes into.
    fn filter_tree_mut(&mut self) -> &mut FilterTree;

    /// Matches records whose `path` equals `value`.
    fn where_eq(&mut self, path: &str, value: impl Into<Scalar>) -> QueryResult<&mut Self> {
        self.filter_tree_mut().set_equals(path, value.into())?;
        Ok(self)
    }

    /// Matches records whose `path` differs from `value`.
    fn not_equal_to(&mut self, path: &str, value: impl Into<Scalar>) -> QueryResult<&mut Self> {
        self.filter_tree_mut()
            .set_operator(path, Operator::NotEquals, value.into().operand(path)?)?;
        Ok(self)
    }

    /// Matches records whose `path` is strictly less than `value`.
    fn less_than(&mut self, path: &str, value: impl Into<Scalar>) -> QueryResult<&mut Self> {
        self.filter_tree_mut()
            .set_operator(path, Operator::LessThan, value.into().operand(path)?)?;
        Ok(self)
    }

    /// Matches records whose `path` is less than or equal to `value`.
    fn less_than_or_equal_to(
        &mut self,
        path: &str,
        value: impl Into<Scalar>,
    ) -> QueryResult<&mut Self> {
        self.filter_tree_mut()
            .set_operator(path, Operator::LessOrEqual, value.into().operand(path)?)?;
        Ok(self)
    }

    /// Matches records whose `path` is strictly greater than `value`.
    fn greater_than(&mut self, path: &str, value: impl Into<Scalar>) -> QueryResult<&mut Self> {
        self.filter_tree_mut()
            .set_operator(path, Operator::GreaterThan, value.into().operand(path)?)?;
        Ok(self)
    }

    /// Matches records whose `path` is greater than or equal to `value`.
    fn greater_than_or_equal_to(
        &mut self,
        path: &str,
        value: impl Into<Scalar>,
    ) -> QueryResult<&mut Self> {
        self.filter_tree_mut()
            .set_operator(path, Operator::GreaterOrEqual, value.into().operand(path)?)?;
        Ok(self)
    }

    /// Matches records whose `path` is one of `values`.
    ///
    /// An empty collection is forwarded as `[]`.
    fn contained_in<I, V>(&mut self, path: &str, values: I) -> QueryResult<&mut Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<Scalar>,
    {
        self.filter_tree_mut()
            .set_operator(path, Operator::ContainedIn, scalar_array(path, values)?)?;
        Ok(self)
    }

    /// Matches records whose `path` is none of `values`.
    fn not_contained_in<I, V>(&mut self, path: &str, values: I) -> QueryResult<&mut Self>
    where
        I: IntoIterator<Item = V>,
        V: Into<Scalar>,
    {
        self.filter_tree_mut()
            .set_operator(path, Operator::NotContainedIn, scalar_array(path, values)?)?;
        Ok(self)
    }

    /// Matches records where `path` is present (`true`) or absent (`false`).
    fn exists(&mut self, path: &str, present: bool) -> QueryResult<&mut Self> {
        self.filter_tree_mut()
            .set_operator(path, Operator::Exists, Value::Bool(present))?;
        Ok(self)
    }

    /// Matches records whose `path` matches the regular expression `pattern`.
    ///
    /// `options` is a subset of `imsx`.
    fn matches_regex(
        &mut self,
        path: &str,
        pattern: &str,
        options: Option<&str>,
    ) -> QueryResult<&mut Self> {
        if let Some(options) = options {
            validate_regex_options(options)?;
        }
        let tree = self.filter_tree_mut();
        tree.set_operator(path, Operator::Regex, Value::String(pattern.to_string()))?;
        match options {
            Some(options) if !options.is_empty() => {
                tree.set_operator(
                    path,
                    Operator::RegexOptions,
                    Value::String(options.to_string()),
                )?;
            }
            _ => tree.clear_operator(path, Operator::RegexOptions),
        }
        Ok(self)
    }

    /// Matches records whose reference at `path` points at a record
    /// satisfying `sub_filter`.
    fn in_reference(&mut self, path: &str, sub_filter: &FilterTree) -> QueryResult<&mut Self> {
        self.filter_tree_mut()
            .set_operator(path, Operator::InQuery, sub_filter.to_json())?;
        Ok(self)
    }

    /// Matches records whose reference at `path` points at no record
    /// satisfying `sub_filter`.
    fn not_in_reference(
        &mut self,
        path: &str,
        sub_filter: &FilterTree,
    ) -> QueryResult<&mut Self> {
        self.filter_tree_mut()
            .set_operator(path, Operator::NotInQuery, sub_filter.to_json())?;
        Ok(self)
    }

    /// Wraps `filters` under `$and`, replacing any previous `$and`.
    ///
    /// An empty list produces an empty `$and: []` wrapper.
    fn and<I>(&mut self, filters: I) -> &mut Self
    where
        I: IntoIterator<Item = FilterTree>,
    {
        self.filter_tree_mut()
            .combine(Combinator::And, filters.into_iter().collect());
        self
    }

    /// Wraps `filters` under `$or`, replacing any previous `$or`.
    fn or<I>(&mut self, filters: I) -> &mut Self
    where
        I: IntoIterator<Item = FilterTree>,
    {
        self.filter_tree_mut()
            .combine(Combinator::Or, filters.into_iter().collect());
        self
    }
}

impl Filterable for FilterTree {
    fn filter_tree_mut(&mut self) -> &mut FilterTree {
        self
    }
}
