// End-to-end tests: load fixtures, query, inspect results

use shici::{ExecuteStrategy, ParseError, PoetrySearch, SearchError};

const HANZI_JSON: &str = r#"[
    {"index": 1, "char": "木", "strokes": 4, "radicals": "木",
     "frequency": 694, "pinyin": ["mu4"]},
    {"index": 2, "char": "林", "strokes": 8, "radicals": "木",
     "frequency": 324, "pinyin": ["lin2"], "chaizi": ["木木"], "structure": "A0"},
    {"index": 3, "char": "森", "strokes": 12, "radicals": "木",
     "frequency": 1249, "pinyin": ["sen1"], "chaizi": ["木木木"], "structure": "B0"},
    {"index": 4, "char": "村", "strokes": 7, "radicals": "木",
     "frequency": 711, "pinyin": ["cun1"], "chaizi": ["木寸"], "structure": "A0"},
    {"index": 5, "char": "山", "strokes": 3, "radicals": "山",
     "frequency": 259, "pinyin": ["shan1"]},
    {"index": 6, "char": "水", "strokes": 4, "radicals": "水",
     "frequency": 312, "pinyin": ["shui3"]},
    {"index": 7, "char": "日", "strokes": 4, "radicals": "日",
     "frequency": 101, "pinyin": ["ri4"]},
    {"index": 8, "char": "月", "strokes": 4, "radicals": "月",
     "frequency": 406, "pinyin": ["yue4"]},
    {"index": 9, "char": "好", "strokes": 6, "radicals": "女",
     "frequency": 82, "pinyin": ["hao3", "hao4"], "chaizi": ["女子"], "structure": "A0"}
]"#;

const POETRY_CSV: &str = "\
title,dynasty,author,content
咏木,唐,佚名,森山好。林月村。
山水引,宋,佚名,山水日月。水山。
小令,唐,佚名,木。水。好水好。
独字,唐,佚名,森。山。林。
";

fn engine() -> PoetrySearch {
    let mut search = PoetrySearch::new();
    search.load_hanzi_str(HANZI_JSON).expect("hanzi fixture loads");
    search.load_poetry_str(POETRY_CSV).expect("poetry fixture loads");
    search
}

// ============ Loading ============

#[test]
fn test_load_counts() {
    let search = engine();
    let stats = search.stats();
    assert_eq!(stats.hanzi_records, 9);
    assert_eq!(stats.poems, 4);
    assert_eq!(stats.sentences, 2 + 2 + 3 + 3);
    // alphabet covers knowledge chars, chaizi components and corpus chars
    assert!(stats.alphabet_size > 9);
}

// ============ Queries ============

#[test]
fn test_exact_character() {
    let search = engine();
    let results = search.search("木").unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].poetry_id, 2);
    assert_eq!(results[0].match_positions, vec![0]);
}

#[test]
fn test_stroke_query() {
    let search = engine();
    let results = search.search("4").unwrap();
    // single-character sentences with 4 strokes: 木 and 水 in poem 2
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].poetry_id, 2);
    assert_eq!(results[0].match_positions, vec![0, 1]);
}

#[test]
fn test_option_with_chaizi_query() {
    let search = engine();
    let results = search.search("[木木木|山]").unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].poetry_id, 3);
    assert_eq!(results[0].match_positions, vec![0, 1]);
}

#[test]
fn test_unordered_query() {
    let search = engine();
    let results = search.search("<山水>").unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].poetry_id, 1);
    assert_eq!(results[0].match_positions, vec![1]);
}

#[test]
fn test_kleene_query() {
    let search = engine();
    let results = search.search("*(4)*").unwrap();
    // every sentence of length ≥ 2 whose interior is all 4-stroke characters
    let ids: Vec<usize> = results.iter().map(|r| r.poetry_id).collect();
    assert_eq!(ids, vec![0, 1, 2]);
    assert_eq!(results[0].match_positions, vec![1]); // 林月村
    assert_eq!(results[1].match_positions, vec![0, 1]); // 山水日月, 水山
    assert_eq!(results[2].match_positions, vec![2]); // 好水好
}

#[test]
fn test_sentence_or_query() {
    let search = engine();
    let results = search.search("森山好|水山").unwrap();
    let ids: Vec<usize> = results.iter().map(|r| r.poetry_id).collect();
    assert_eq!(ids, vec![0, 1]);
}

// ============ Result plumbing ============

#[test]
fn test_poetry_by_id_details() {
    let search = engine();
    let results = search.search("<山水>").unwrap();
    let poem = search.poetry_by_id(results[0].poetry_id).unwrap();
    assert_eq!(poem.title, "山水引");
    assert_eq!(poem.dynasty, "宋");
    assert_eq!(poem.author, "佚名");
    assert_eq!(
        search.sentence_text(poem, results[0].match_positions[0]),
        Some("水山".to_string())
    );
}

#[test]
fn test_covered_charset() {
    let search = engine();
    let covered = search.covered("山水日月");
    assert_eq!(
        covered,
        vec![
            ("山水日月".to_string(), 1),
            ("水".to_string(), 2),
            ("山".to_string(), 3),
        ]
    );
}

// ============ Strategies agree ============

#[test]
fn test_sequential_and_parallel_runs_agree() {
    let search = engine();
    for query in ["4", "[木木木|山]", "<山水>", "*(4)*", "山水|水山", "木(*)*"] {
        let cond = search.parse(query).unwrap();
        let matcher = search.compile(&cond).unwrap();
        assert_eq!(
            search.run_with(&matcher, ExecuteStrategy::Sequential),
            search.run_with(&matcher, ExecuteStrategy::Parallel),
            "strategies disagree on {query}"
        );
    }
}

// ============ Errors ============

#[test]
fn test_lex_error() {
    let search = engine();
    let err = search.search("山;水").unwrap_err();
    assert!(matches!(err, SearchError::Parse(ParseError::Lex { .. })));
}

#[test]
fn test_bracket_error() {
    let search = engine();
    let err = search.search("<山水").unwrap_err();
    assert!(matches!(
        err,
        SearchError::Parse(ParseError::Bracket { bracket: "'<'", .. })
    ));
}

#[test]
fn test_compile_error_surfaces() {
    let search = engine();
    let err = search.search("<(山)*>").unwrap_err();
    assert!(matches!(err, SearchError::Compile(_)));
}

#[test]
fn test_unknown_character_query_is_empty() {
    let search = engine();
    assert!(search.search("龘").unwrap().is_empty());
}
