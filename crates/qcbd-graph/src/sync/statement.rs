//! Backend-neutral Cypher statements.
//!
//! Sync plans are built as plain data so they can be inspected in tests
//! and executed by anything that implements [`StatementSink`].

use anyhow::Result;
use async_trait::async_trait;
use neo4rs::Query;

/// A Cypher parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Str(String),
    StrList(Vec<String>),
    Bool(bool),
}

impl From<&str> for ParamValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<Vec<String>> for ParamValue {
    fn from(v: Vec<String>) -> Self {
        Self::StrList(v)
    }
}

impl From<bool> for ParamValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

/// One parameterized Cypher statement.
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub cypher: String,
    pub params: Vec<(String, ParamValue)>,
}

impl Statement {
    pub fn new(cypher: impl Into<String>) -> Self {
        Self {
            cypher: cypher.into(),
            params: Vec::new(),
        }
    }

    pub fn param(mut self, key: &str, value: impl Into<ParamValue>) -> Self {
        self.params.push((key.to_string(), value.into()));
        self
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.params.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// First line of the Cypher text, for error messages.
    pub fn summary(&self) -> &str {
        self.cypher.lines().next().unwrap_or("").trim()
    }

    /// Convert into a neo4rs query.
    pub fn to_query(&self) -> Query {
        let mut query = Query::new(self.cypher.clone());
        for (key, value) in &self.params {
            query = match value {
                ParamValue::Str(s) => query.param(key, s.clone()),
                ParamValue::StrList(l) => query.param(key, l.clone()),
                ParamValue::Bool(b) => query.param(key, *b),
            };
        }
        query
    }
}

/// Something that can run Cypher statements.
#[async_trait]
pub trait StatementSink: Send + Sync {
    /// Run a statement, discarding results.
    async fn execute(&self, statement: &Statement) -> Result<()>;

    /// Run a statement and read an integer column from its first row (0 when empty).
    async fn fetch_count(&self, statement: &Statement, field: &str) -> Result<i64>;
}
