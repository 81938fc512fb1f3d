use crate::text::{term_set, QueryTerms};
use drift_types::TraversalPath;
use std::collections::HashSet;

const SHORT_PATH_AVG_LEN: f64 = 2.5;
const LOW_SCORE_AVG: f64 = 0.5;

pub const NO_PATHS_GAP: &str =
    "No connected paths were found for this query; the graph may not cover the topic.";

/// Describe what the ranked paths fail to cover. Never empty when `paths` is empty.
pub fn identify_knowledge_gaps(paths: &[TraversalPath], query: &str) -> Vec<String> {
    if paths.is_empty() {
        return vec![NO_PATHS_GAP.to_string()];
    }

    let mut gaps = Vec::new();
    let n = paths.len() as f64;

    let avg_len = paths.iter().map(|p| p.len() as f64).sum::<f64>() / n;
    if avg_len < SHORT_PATH_AVG_LEN {
        gaps.push(format!(
            "Retrieved paths are short (average {:.1} nodes); links between concepts may be missing.",
            avg_len
        ));
    }

    let avg_score = paths.iter().map(|p| p.score()).sum::<f64>() / n;
    if avg_score < LOW_SCORE_AVG {
        gaps.push(format!(
            "Retrieved paths have low relevance (average score {:.2}).",
            avg_score
        ));
    }

    let mut covered: HashSet<String> = HashSet::new();
    for node in paths.iter().flat_map(|p| p.nodes()) {
        covered.extend(term_set(&node.content));
    }
    let terms = QueryTerms::new(query);
    let missing: Vec<&str> = terms
        .significant()
        .into_iter()
        .filter(|t| !covered.contains(*t))
        .collect();
    if !missing.is_empty() {
        gaps.push(format!(
            "No retrieved information mentions: {}.",
            missing.join(", ")
        ));
    }

    let starts: HashSet<&str> = paths
        .iter()
        .filter_map(|p| p.nodes().first().map(|n| n.id.as_str()))
        .collect();
    if starts.len() == 1 {
        if let Some(start) = starts.into_iter().next() {
            gaps.push(format!(
                "All paths start from a single entry point ({}); neighbouring topics may be under-represented.",
                start
            ));
        }
    }

    gaps
}
