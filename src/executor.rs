// Shici Batch Executor
// Fans per-poem evaluation out across worker threads

use rayon::prelude::*;

use crate::corpus::Poem;
use crate::matcher::Matcher;
use crate::types::QueryResult;

/// How to schedule per-poem evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecuteStrategy {
    /// Reference single-threaded loop.
    Sequential,
    /// Data-parallel fan-out over the rayon pool.
    #[default]
    Parallel,
}

/// Evaluate `matcher` against every sentence of every poem.
///
/// Poems without matches are omitted; within a poem the sentence indices
/// ascend. Results are sorted by poem id, so both strategies produce
/// identical output.
pub fn execute(matcher: &Matcher, poems: &[Poem], strategy: ExecuteStrategy) -> Vec<QueryResult> {
    let mut results = match strategy {
        ExecuteStrategy::Sequential => poems.iter().filter_map(|p| poem_result(matcher, p)).collect(),
        ExecuteStrategy::Parallel => poems
            .par_iter()
            .filter_map(|p| poem_result(matcher, p))
            .collect::<Vec<_>>(),
    };
    results.sort_unstable_by_key(|r| r.poetry_id);
    results
}

fn poem_result(matcher: &Matcher, poem: &Poem) -> Option<QueryResult> {
    let match_positions = matcher.batch_match(&poem.sentences);
    if match_positions.is_empty() {
        None
    } else {
        Some(QueryResult {
            poetry_id: poem.id,
            match_positions,
        })
    }
}
