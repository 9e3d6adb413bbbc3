//! Query weights: the per-searcher, normalized form of a [`Query`].
//!
//! Weights are built in two steps. [`WeightBuilder`] gathers the collection-level
//! statistics of every leaf; the searcher sums the leaves' squared weights, derives
//! the query norm from the similarity and pushes it down through
//! [`WeightBuilder::normalize`], which yields the immutable [`Weight`].

use quarry_common::Result;
use quarry_similarity::{Explanation, SimWeight, SimWeightBuilder};

use crate::{
    query::{BooleanQuery, Occur, Query, TermQuery},
    searcher::IndexSearcher,
};

/// A weight whose query norm is not known yet.
pub enum WeightBuilder<'q> {
    Term {
        query: &'q TermQuery,
        stats: SimWeightBuilder,
    },
    Boolean {
        query: &'q BooleanQuery,
        clauses: Vec<(Occur, WeightBuilder<'q>)>,
    },
}

impl<'q> WeightBuilder<'q> {
    pub(crate) fn new(searcher: &IndexSearcher<'_>, query: &'q Query) -> Result<Self> {
        match query {
            Query::Term(query) => {
                let collection = searcher.collection_statistics(query.field())?;
                let term = searcher.term_statistics(query.field(), query.term())?;
                let stats = searcher.similarity().compute_weight(
                    query.boost(),
                    &collection,
                    &[term],
                )?;
                Ok(WeightBuilder::Term { query, stats })
            }
            Query::Boolean(query) => {
                let clauses = query
                    .clauses()
                    .iter()
                    .map(|clause| Ok((clause.occur, WeightBuilder::new(searcher, &clause.query)?)))
                    .collect::<Result<Vec<_>>>()?;
                Ok(WeightBuilder::Boolean { query, clauses })
            }
        }
    }

    /// Sum of the squared weights of the leaves that can contribute to the score.
    pub fn value_for_normalization(&self) -> f32 {
        match self {
            WeightBuilder::Term { stats, .. } => stats.value_for_normalization(),
            WeightBuilder::Boolean { query, clauses } => {
                let sum: f32 = clauses
                    .iter()
                    .filter(|(occur, _)| !occur.is_prohibited())
                    .map(|(_, weight)| weight.value_for_normalization())
                    .sum();
                sum * query.boost() * query.boost()
            }
        }
    }

    /// Applies the query norm, multiplying the boosts of enclosing queries into
    /// `top_level_boost` on the way down.
    pub fn normalize(self, query_norm: f32, top_level_boost: f32) -> Weight<'q> {
        let node = match self {
            WeightBuilder::Term { query, stats } => WeightNode::Term {
                query,
                stats: stats.normalize(query_norm, top_level_boost),
            },
            WeightBuilder::Boolean { query, clauses } => {
                let top_level_boost = top_level_boost * query.boost();
                let max_coord = clauses
                    .iter()
                    .filter(|(occur, _)| !occur.is_prohibited())
                    .count() as u32;
                WeightNode::Boolean {
                    query,
                    max_coord,
                    clauses: clauses
                        .into_iter()
                        .map(|(occur, w)| (occur, w.normalize(query_norm, top_level_boost)))
                        .collect(),
                }
            }
        };
        Weight { node }
    }
}

/// A normalized query weight, ready to score the document of one searcher.
pub struct Weight<'q> {
    node: WeightNode<'q>,
}

enum WeightNode<'q> {
    Term {
        query: &'q TermQuery,
        stats: SimWeight,
    },
    Boolean {
        query: &'q BooleanQuery,
        max_coord: u32,
        clauses: Vec<(Occur, Weight<'q>)>,
    },
}

impl Weight<'_> {
    /// Score of `doc`, or `None` when the document does not match.
    pub fn score(&self, searcher: &IndexSearcher<'_>, doc: u32) -> Result<Option<f32>> {
        match &self.node {
            WeightNode::Term { query, stats } => {
                let Some(freq) = searcher.term_freq(query.field(), query.term(), doc) else {
                    return Ok(None);
                };
                let norms = searcher.reader().norm_source(searcher.similarity());
                let scorer = searcher.similarity().sim_scorer(stats, &norms)?;
                Ok(Some(scorer.score(doc, freq as f32)))
            }
            WeightNode::Boolean {
                query,
                max_coord,
                clauses,
            } => {
                let mut sum = 0f32;
                let mut matched = 0u32;
                for (occur, weight) in clauses {
                    match (occur, weight.score(searcher, doc)?) {
                        (Occur::Must, None) => return Ok(None),
                        (Occur::MustNot, Some(_)) => return Ok(None),
                        (Occur::MustNot, None) | (Occur::Should, None) => {}
                        (_, Some(score)) => {
                            sum += score;
                            matched += 1;
                        }
                    }
                }
                if matched == 0 {
                    return Ok(None);
                }
                Ok(Some(sum * coord(searcher, query, matched, *max_coord)))
            }
        }
    }

    /// Breaks the score of `doc` down. The value equals [`score`](Self::score), or zero
    /// for a document that does not match.
    pub fn explain(&self, searcher: &IndexSearcher<'_>, doc: u32) -> Result<Explanation> {
        match &self.node {
            WeightNode::Term { query, stats } => {
                let Some(freq) = searcher.term_freq(query.field(), query.term(), doc) else {
                    return Ok(Explanation::no_match("no matching term"));
                };
                let norms = searcher.reader().norm_source(searcher.similarity());
                let scorer = searcher.similarity().sim_scorer(stats, &norms)?;
                let freq = freq as f32;
                let detail = scorer.explain(doc, Explanation::new(freq, format!("termFreq={freq}")));
                let description = format!(
                    "weight({query} in {doc}) [{}], result of:",
                    searcher.similarity().name()
                );
                Ok(Explanation::with_match(true, detail.value(), description).with_detail(detail))
            }
            WeightNode::Boolean {
                query,
                max_coord,
                clauses,
            } => {
                let mut sum_expl = Explanation::new(0.0, "sum of:");
                let mut sum = 0f32;
                let mut matched = 0u32;
                let mut fail = false;
                for ((occur, weight), clause) in clauses.iter().zip(query.clauses()) {
                    let expl = weight.explain(searcher, doc)?;
                    if expl.is_match() {
                        if occur.is_prohibited() {
                            fail = true;
                            sum_expl.add_detail(
                                Explanation::new(
                                    0.0,
                                    format!("match on prohibited clause ({})", clause.query),
                                )
                                .with_detail(expl),
                            );
                        } else {
                            sum += expl.value();
                            matched += 1;
                            sum_expl.add_detail(expl);
                        }
                    } else if occur.is_required() {
                        fail = true;
                        sum_expl.add_detail(
                            Explanation::new(
                                0.0,
                                format!("no match on required clause ({})", clause.query),
                            )
                            .with_detail(expl),
                        );
                    }
                }
                if fail {
                    sum_expl.set_match(false);
                    sum_expl.set_value(0.0);
                    sum_expl.set_description(
                        "Failure to meet condition(s) of required/prohibited clause(s)",
                    );
                    return Ok(sum_expl);
                }

                sum_expl.set_match(matched > 0);
                sum_expl.set_value(sum);
                if matched == 0 {
                    return Ok(sum_expl);
                }
                let coord_factor = coord(searcher, query, matched, *max_coord);
                if coord_factor == 1.0 {
                    return Ok(sum_expl);
                }
                Ok(
                    Explanation::with_match(sum_expl.is_match(), sum * coord_factor, "product of:")
                        .with_detail(sum_expl)
                        .with_detail(Explanation::new(
                            coord_factor,
                            format!("coord({matched}/{max_coord})"),
                        )),
                )
            }
        }
    }
}

fn coord(searcher: &IndexSearcher<'_>, query: &BooleanQuery, matched: u32, max_coord: u32) -> f32 {
    if query.disable_coord() || max_coord == 1 {
        1.0
    } else {
        searcher.similarity().coord(matched, max_coord)
    }
}
