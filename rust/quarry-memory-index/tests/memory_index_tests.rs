use std::collections::BTreeMap;
use std::sync::Arc;

use quarry_common::Result;
use quarry_memory_index::{
    Analyzer, BooleanQuery, MemoryIndex, MemoryIndexConfig, NO_MORE_DOCS, Occur, Query,
    Token, TokenStream, create_analyzer,
};
use quarry_similarity::{
    Bm25Similarity, FieldInvertState, Similarity, TfIdfSimilarity, create_similarity,
};

const PRESETS: [&str; 10] = [
    "bm25",
    "tfidf",
    "dfr-in2",
    "dfr-inl2",
    "dfr-pl2",
    "dfr-ineb2",
    "ib-ll-df",
    "ib-spl-ttf",
    "lm-dirichlet",
    "lm-jelinek-mercer",
];

/// Replays a fixed list of `(term, position_increment, start, end)` tokens.
struct CannedStream {
    tokens: Vec<(String, u32, i32, i32)>,
    upto: usize,
    final_offset: i32,
}

impl CannedStream {
    fn new(tokens: &[(&str, u32, i32, i32)], final_offset: i32) -> CannedStream {
        CannedStream {
            tokens: tokens
                .iter()
                .map(|&(t, inc, s, e)| (t.to_string(), inc, s, e))
                .collect(),
            upto: 0,
            final_offset,
        }
    }
}

impl TokenStream for CannedStream {
    fn reset(&mut self) -> Result<()> {
        self.upto = 0;
        Ok(())
    }

    fn increment_token(&mut self) -> Result<Option<Token<'_>>> {
        let Some((term, inc, start, end)) = self.tokens.get(self.upto) else {
            return Ok(None);
        };
        self.upto += 1;
        Ok(Some(Token {
            term: term.as_bytes(),
            position_increment: *inc,
            start_offset: *start,
            end_offset: *end,
        }))
    }

    fn end(&mut self) -> Result<i32> {
        Ok(self.final_offset)
    }

    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

fn positions(index: &mut MemoryIndex, field: &str, term: &str) -> Vec<(i32, i32, i32)> {
    let reader = index.create_reader();
    let mut iter = reader.terms(field).unwrap().iter();
    assert!(iter.seek_exact(term.as_bytes()), "{term} not found in {field}");
    let mut postings = iter.docs_and_positions().unwrap();
    assert_eq!(postings.next_doc(), 0);
    let result = (0..postings.freq())
        .map(|_| {
            let pos = postings.next_position();
            (pos, postings.start_offset(), postings.end_offset())
        })
        .collect();
    assert_eq!(postings.next_doc(), NO_MORE_DOCS);
    result
}

fn terms_of(index: &mut MemoryIndex, field: &str) -> Vec<String> {
    let reader = index.create_reader();
    let mut iter = reader.terms(field).unwrap().iter();
    let mut terms = Vec::new();
    while let Some(term) = iter.next_term() {
        terms.push(String::from_utf8_lossy(term).into_owned());
    }
    terms
}

fn approx_eq(a: f32, b: f32) -> bool {
    (a - b).abs() <= 1e-5 * a.abs().max(b.abs()).max(1.0)
}

#[test]
fn test_field_accumulation() {
    let analyzer = create_analyzer("whitespace").unwrap();
    let mut index = MemoryIndex::with_config(MemoryIndexConfig {
        store_offsets: true,
        ..Default::default()
    });

    let mut first = analyzer.token_stream("f", "a b").unwrap();
    index.add_field("f", first.as_mut(), 2.0, 100, 1).unwrap();
    drop(first);
    let mut second = analyzer.token_stream("f", "c d").unwrap();
    index.add_field("f", second.as_mut(), 3.0, 100, 1).unwrap();
    drop(second);

    assert_eq!(positions(&mut index, "f", "a"), vec![(0, 0, 1)]);
    assert_eq!(positions(&mut index, "f", "b"), vec![(1, 2, 3)]);
    // last position 1, plus the gap, plus the increment of "c".
    assert_eq!(positions(&mut index, "f", "c"), vec![(102, 4, 5)]);
    assert_eq!(positions(&mut index, "f", "d"), vec![(103, 6, 7)]);

    let reader = index.create_reader();
    let terms = reader.terms("f").unwrap();
    assert_eq!(terms.size(), 4);
    assert_eq!(terms.sum_total_term_freq(), 4);
    assert!(terms.has_offsets());

    let similarity = Arc::new(Similarity::default());
    let norm = reader.norm_values("f", &similarity).unwrap().unwrap();
    assert_eq!(
        norm.get(0),
        similarity.compute_norm(&FieldInvertState::new("f", 4, 0, 6.0))
    );
}

#[test]
fn test_empty_fields_are_not_published() {
    let analyzer = create_analyzer("unicode-word").unwrap();
    let mut index = MemoryIndex::new();
    index.add_field_text("empty", "", &analyzer).unwrap();
    index.add_field_text("punct", " ,;; ", &analyzer).unwrap();
    index.add_field_text("body", "Hello", &analyzer).unwrap();

    assert_eq!(index.search(&Query::term("empty", "")).unwrap(), 0.0);
    let reader = index.create_reader();
    assert_eq!(reader.fields().collect::<Vec<_>>(), vec!["body"]);
    assert_eq!(reader.num_fields(), 1);
    assert!(reader.terms("empty").is_none());
    assert!(reader.terms("punct").is_none());
}

#[test]
fn test_terms_added_after_reading_are_visible() {
    let analyzer = create_analyzer("whitespace").unwrap();
    let mut index = MemoryIndex::new();
    index.add_field_text("body", "pear apple", &analyzer).unwrap();
    assert_eq!(terms_of(&mut index, "body"), ["apple", "pear"]);
    assert_eq!(terms_of(&mut index, "body"), ["apple", "pear"]);

    index.add_field_text("body", "banana pear", &analyzer).unwrap();
    let reader = index.create_reader();
    let mut iter = reader.terms("body").unwrap().iter();
    assert!(iter.seek_exact(b"banana"));
    assert_eq!(iter.next_term(), Some(&b"pear"[..]));
    assert_eq!(iter.total_term_freq(), Some(2));
    drop(reader);
    assert_eq!(terms_of(&mut index, "body"), ["apple", "banana", "pear"]);
}

#[test]
fn test_overlapping_tokens() {
    let mut index = MemoryIndex::new();
    let mut stream = CannedStream::new(
        &[("fast", 1, 0, 4), ("quick", 0, 0, 4), ("fox", 1, 5, 8)],
        8,
    );
    index.add_field_stream("body", &mut stream).unwrap();

    assert_eq!(positions(&mut index, "body", "fast"), vec![(0, -1, -1)]);
    assert_eq!(positions(&mut index, "body", "quick"), vec![(0, -1, -1)]);
    assert_eq!(positions(&mut index, "body", "fox"), vec![(1, -1, -1)]);

    let reader = index.create_reader();
    for name in PRESETS {
        let similarity = Arc::new(create_similarity(name).unwrap());
        let norm = reader.norm_values("body", &similarity).unwrap().unwrap();
        assert_eq!(
            norm.get(0),
            similarity.compute_norm(&FieldInvertState::new("body", 3, 1, 1.0)),
            "{name}"
        );
    }
}

#[test]
fn test_keyword_stream_offsets() {
    let mut index = MemoryIndex::with_config(MemoryIndexConfig {
        store_offsets: true,
        ..Default::default()
    });
    let mut stream = MemoryIndex::keyword_token_stream(["New York", "Paris"]);
    index.add_field_stream("city", &mut stream).unwrap();
    let mut stream = MemoryIndex::keyword_token_stream(["Oslo"]);
    index.add_field_stream("city", &mut stream).unwrap();

    assert_eq!(positions(&mut index, "city", "New York"), vec![(0, 0, 8)]);
    assert_eq!(positions(&mut index, "city", "Paris"), vec![(1, 9, 14)]);
    // final offset 14 plus the offset gap of one.
    assert_eq!(positions(&mut index, "city", "Oslo"), vec![(2, 15, 19)]);
    assert!(index.search(&Query::term("city", "New York")).unwrap() > 0.0);
    assert_eq!(index.search(&Query::term("city", "new york")).unwrap(), 0.0);
}

#[test]
fn test_bm25_scenario() {
    let analyzer = create_analyzer("whitespace").unwrap();
    let mut index = MemoryIndex::new();
    index
        .add_field_text("body", "apache lucene apache solr", &analyzer)
        .unwrap();

    let searcher = index
        .create_searcher()
        .with_similarity(Similarity::from(Bm25Similarity::default()));
    let query = Query::term("body", "apache");
    let score = searcher.score(&query).unwrap();
    // idf ln(1 + 0.5 / 1.5) times 2 * 2.2 / (2 + 1.2)
    assert!((score - 0.3956).abs() < 1e-4, "{score}");
    assert!(approx_eq(searcher.explain(&query, 0).unwrap().value(), score));
}

#[test]
fn test_search_uses_default_similarity() {
    let analyzer = create_analyzer("whitespace").unwrap();
    let mut index = MemoryIndex::new();
    index.add_field_text("body", "alpha beta", &analyzer).unwrap();

    let expected = index
        .create_searcher()
        .with_similarity(Similarity::from(TfIdfSimilarity::default()))
        .score(&Query::term("body", "alpha"))
        .unwrap();
    assert!(expected > 0.0);
    assert_eq!(index.search(&Query::term("body", "alpha")).unwrap(), expected);
    assert_eq!(index.search(&Query::term("body", "gamma")).unwrap(), 0.0);
    assert_eq!(index.search(&Query::term("title", "alpha")).unwrap(), 0.0);
}

#[test]
fn test_boolean_coord() {
    let analyzer = create_analyzer("whitespace").unwrap();
    let mut index = MemoryIndex::new();
    index.add_field_text("body", "quick brown fox", &analyzer).unwrap();
    let searcher = index.create_searcher();

    let query: Query = BooleanQuery::new()
        .with_clause(Query::term("body", "fox"), Occur::Should)
        .with_clause(Query::term("body", "cat"), Occur::Should)
        .into();
    let score = searcher.score(&query).unwrap();
    assert!(score > 0.0);

    let explanation = searcher.explain(&query, 0).unwrap();
    assert!(explanation.is_match());
    assert!(approx_eq(explanation.value(), score));
    assert_eq!(explanation.description(), "product of:");
    let details = explanation.details();
    assert_eq!(details.len(), 2);
    assert_eq!(details[0].description(), "sum of:");
    assert_eq!(details[1].description(), "coord(1/2)");
    assert_eq!(details[1].value(), 0.5);

    let uncoordinated: Query = BooleanQuery::new()
        .with_clause(Query::term("body", "fox"), Occur::Should)
        .with_clause(Query::term("body", "cat"), Occur::Should)
        .with_disable_coord(true)
        .into();
    let explanation = searcher.explain(&uncoordinated, 0).unwrap();
    assert_eq!(explanation.description(), "sum of:");
    assert!(approx_eq(searcher.score(&uncoordinated).unwrap(), score * 2.0));
}

#[test]
fn test_boolean_failures() {
    let analyzer = create_analyzer("whitespace").unwrap();
    let mut index = MemoryIndex::new();
    index.add_field_text("body", "quick brown fox", &analyzer).unwrap();
    let searcher = index.create_searcher();

    let required: Query = BooleanQuery::new()
        .with_clause(Query::term("body", "fox"), Occur::Should)
        .with_clause(Query::term("body", "cat"), Occur::Must)
        .into();
    assert_eq!(searcher.score(&required).unwrap(), 0.0);
    let explanation = searcher.explain(&required, 0).unwrap();
    assert!(!explanation.is_match());
    assert_eq!(explanation.value(), 0.0);
    assert_eq!(
        explanation.description(),
        "Failure to meet condition(s) of required/prohibited clause(s)"
    );
    assert_eq!(
        explanation.details()[1].description(),
        "no match on required clause (body:cat)"
    );

    let prohibited: Query = BooleanQuery::new()
        .with_clause(Query::term("body", "quick"), Occur::Must)
        .with_clause(Query::term("body", "fox"), Occur::MustNot)
        .into();
    assert_eq!(searcher.score(&prohibited).unwrap(), 0.0);
    let explanation = searcher.explain(&prohibited, 0).unwrap();
    assert!(!explanation.is_match());
    assert_eq!(
        explanation.details()[1].description(),
        "match on prohibited clause (body:fox)"
    );

    let only_prohibited: Query = BooleanQuery::new()
        .with_clause(Query::term("body", "cat"), Occur::MustNot)
        .into();
    assert_eq!(searcher.score(&only_prohibited).unwrap(), 0.0);
    assert!(!searcher.explain(&only_prohibited, 0).unwrap().is_match());
}

#[test]
fn test_boost_scales_bm25_scores() {
    let analyzer = create_analyzer("whitespace").unwrap();
    let mut index = MemoryIndex::new();
    index.add_field_text("body", "quick brown fox", &analyzer).unwrap();
    let searcher = index
        .create_searcher()
        .with_similarity(Similarity::from(Bm25Similarity::default()));

    let plain = BooleanQuery::new()
        .with_clause(Query::term("body", "fox"), Occur::Must)
        .with_clause(Query::term("body", "brown"), Occur::Should);
    let base = searcher.score(&plain.clone().into()).unwrap();
    let boosted = searcher.score(&plain.with_boost(2.0).into()).unwrap();
    assert!(approx_eq(boosted, 2.0 * base), "{boosted} {base}");
}

fn random_query(rng: &mut fastrand::Rng, vocabulary: &[&str], depth: u32) -> Query {
    if depth == 0 || rng.u32(0..3) == 0 {
        let term = vocabulary[rng.usize(0..vocabulary.len())];
        let field = if rng.bool() { "body" } else { "title" };
        return Query::term(field, term).with_boost(rng.u32(1..4) as f32);
    }
    let mut query = BooleanQuery::new().with_disable_coord(rng.u32(0..4) == 0);
    for _ in 0..rng.usize(1..5) {
        let occur = match rng.u32(0..5) {
            0 => Occur::Must,
            1 => Occur::MustNot,
            _ => Occur::Should,
        };
        query.add(random_query(rng, vocabulary, depth - 1), occur);
    }
    query.with_boost(rng.u32(1..3) as f32).into()
}

#[test]
fn test_explain_matches_score_for_random_queries() {
    let vocabulary = ["red", "green", "blue", "cyan", "black", "white", "gray"];
    let analyzer = create_analyzer("whitespace").unwrap();
    let mut rng = fastrand::Rng::with_seed(7);

    for round in 0..20 {
        let mut index = MemoryIndex::new();
        for field in ["body", "title"] {
            let text: Vec<&str> = (0..rng.usize(1..30))
                .map(|_| vocabulary[rng.usize(0..vocabulary.len() - 2)])
                .collect();
            index.add_field_text(field, &text.join(" "), &analyzer).unwrap();
        }
        let mut searcher = index.create_searcher();
        for name in PRESETS {
            searcher.set_similarity(create_similarity(name).unwrap());
            for _ in 0..10 {
                let query = random_query(&mut rng, &vocabulary, 3);
                let score = searcher.score(&query).unwrap();
                let explanation = searcher.explain(&query, 0).unwrap();
                assert!(
                    approx_eq(explanation.value(), score),
                    "round {round}, {name}, {query}: {score} vs\n{explanation}"
                );
                if score > 0.0 {
                    assert!(explanation.is_match(), "{name}, {query}");
                }
            }
        }
    }
}

#[test]
fn test_random_postings_round_trip() {
    let vocabulary: Vec<String> = (0..200).map(|i| format!("term{i}")).collect();
    let mut rng = fastrand::Rng::with_seed(2024);
    let mut index = MemoryIndex::with_config(MemoryIndexConfig {
        store_offsets: true,
        max_reused_bytes: 1 << 20,
    });

    for _ in 0..3 {
        let mut expected: BTreeMap<&str, Vec<(i32, i32, i32)>> = BTreeMap::new();
        let mut keywords = Vec::new();
        let mut offset = 0;
        for position in 0..rng.i32(1..5000) {
            let term = vocabulary[rng.usize(0..vocabulary.len())].as_str();
            let len = term.len() as i32;
            expected
                .entry(term)
                .or_default()
                .push((position, offset, offset + len));
            offset += len + 1;
            keywords.push(term);
        }
        let mut stream = MemoryIndex::keyword_token_stream(keywords.iter().copied());
        index.add_field_stream("body", &mut stream).unwrap();

        let reader = index.create_reader();
        let terms = reader.terms("body").unwrap();
        assert_eq!(terms.size(), expected.len());
        assert_eq!(terms.sum_total_term_freq(), keywords.len() as i64);

        let mut iter = terms.iter();
        for (term, postings) in &expected {
            assert_eq!(iter.next_term(), Some(term.as_bytes()));
            let mut docs = iter.docs_and_positions().unwrap();
            assert_eq!(docs.next_doc(), 0);
            assert_eq!(docs.freq() as usize, postings.len());
            for &(position, start, end) in postings {
                assert_eq!(docs.next_position(), position);
                assert_eq!((docs.start_offset(), docs.end_offset()), (start, end));
            }
        }
        assert!(iter.next_term().is_none());

        index.reset();
        assert!(index.create_reader().terms("body").is_none());
    }
}
