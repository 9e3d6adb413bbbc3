//! Term and boolean queries.

use std::fmt;

/// A query tree evaluated by [`IndexSearcher`](crate::IndexSearcher).
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    Term(TermQuery),
    Boolean(BooleanQuery),
}

impl Query {
    /// Shorthand for a [`TermQuery`] on a UTF-8 term.
    pub fn term(field: impl Into<String>, term: impl AsRef<str>) -> Query {
        Query::Term(TermQuery::new(field, term.as_ref().as_bytes()))
    }

    pub fn boost(&self) -> f32 {
        match self {
            Query::Term(query) => query.boost(),
            Query::Boolean(query) => query.boost(),
        }
    }

    pub fn with_boost(self, boost: f32) -> Query {
        match self {
            Query::Term(query) => Query::Term(query.with_boost(boost)),
            Query::Boolean(query) => Query::Boolean(query.with_boost(boost)),
        }
    }
}

impl From<TermQuery> for Query {
    fn from(query: TermQuery) -> Self {
        Query::Term(query)
    }
}

impl From<BooleanQuery> for Query {
    fn from(query: BooleanQuery) -> Self {
        Query::Boolean(query)
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Query::Term(query) => fmt::Display::fmt(query, f),
            Query::Boolean(query) => fmt::Display::fmt(query, f),
        }
    }
}

/// Matches documents containing a term.
#[derive(Debug, Clone, PartialEq)]
pub struct TermQuery {
    field: String,
    term: Vec<u8>,
    boost: f32,
}

impl TermQuery {
    pub fn new(field: impl Into<String>, term: impl Into<Vec<u8>>) -> TermQuery {
        TermQuery {
            field: field.into(),
            term: term.into(),
            boost: 1.0,
        }
    }

    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn term(&self) -> &[u8] {
        &self.term
    }

    pub fn boost(&self) -> f32 {
        self.boost
    }
}

impl fmt::Display for TermQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.field, String::from_utf8_lossy(&self.term))?;
        write_boost(f, self.boost)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Occur {
    /// The clause must match; its score is added.
    Must,
    /// The clause may match; its score is added when it does.
    Should,
    /// The clause must not match.
    MustNot,
}

impl Occur {
    pub fn is_required(&self) -> bool {
        *self == Occur::Must
    }

    pub fn is_prohibited(&self) -> bool {
        *self == Occur::MustNot
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BooleanClause {
    pub query: Query,
    pub occur: Occur,
}

/// Combines clauses. A document matches when every `Must` clause matches, no
/// `MustNot` clause does, and, without `Must` clauses, at least one `Should` clause
/// matches. The score is the sum of the matching clauses' scores times the coord
/// factor of the similarity.
#[derive(Debug, Clone, PartialEq)]
pub struct BooleanQuery {
    clauses: Vec<BooleanClause>,
    boost: f32,
    disable_coord: bool,
}

impl Default for BooleanQuery {
    fn default() -> Self {
        BooleanQuery::new()
    }
}

impl BooleanQuery {
    pub fn new() -> BooleanQuery {
        BooleanQuery {
            clauses: Vec::new(),
            boost: 1.0,
            disable_coord: false,
        }
    }

    pub fn with_clause(mut self, query: impl Into<Query>, occur: Occur) -> Self {
        self.add(query, occur);
        self
    }

    pub fn add(&mut self, query: impl Into<Query>, occur: Occur) {
        self.clauses.push(BooleanClause {
            query: query.into(),
            occur,
        });
    }

    pub fn with_boost(mut self, boost: f32) -> Self {
        self.boost = boost;
        self
    }

    /// Turns off the coord factor, e.g. for clauses that are synonyms.
    pub fn with_disable_coord(mut self, disable_coord: bool) -> Self {
        self.disable_coord = disable_coord;
        self
    }

    pub fn clauses(&self) -> &[BooleanClause] {
        &self.clauses
    }

    pub fn boost(&self) -> f32 {
        self.boost
    }

    pub fn disable_coord(&self) -> bool {
        self.disable_coord
    }
}

impl fmt::Display for BooleanQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parens = self.boost != 1.0;
        if parens {
            f.write_str("(")?;
        }
        for (i, clause) in self.clauses.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            match clause.occur {
                Occur::Must => f.write_str("+")?,
                Occur::MustNot => f.write_str("-")?,
                Occur::Should => {}
            }
            match &clause.query {
                Query::Boolean(nested) => write!(f, "({nested})")?,
                query => write!(f, "{query}")?,
            }
        }
        if parens {
            f.write_str(")")?;
        }
        write_boost(f, self.boost)
    }
}

fn write_boost(f: &mut fmt::Formatter<'_>, boost: f32) -> fmt::Result {
    if boost != 1.0 {
        write!(f, "^{boost}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let query = BooleanQuery::new()
            .with_clause(Query::term("body", "fox"), Occur::Must)
            .with_clause(Query::term("body", "dog").with_boost(2.0), Occur::Should)
            .with_clause(
                BooleanQuery::new()
                    .with_clause(Query::term("title", "cat"), Occur::Should)
                    .with_clause(Query::term("title", "cow"), Occur::Should),
                Occur::MustNot,
            );
        assert_eq!(
            query.to_string(),
            "+body:fox body:dog^2 -(title:cat title:cow)"
        );
        assert_eq!(
            Query::from(query).with_boost(0.5).to_string(),
            "(+body:fox body:dog^2 -(title:cat title:cow))^0.5"
        );
    }

    #[test]
    fn test_occur() {
        assert!(Occur::Must.is_required());
        assert!(!Occur::Should.is_required() && !Occur::Should.is_prohibited());
        assert!(Occur::MustNot.is_prohibited());
    }
}
