//! Turn ranked paths into an answer, through an LLM when one is configured.

use drift_embed::{LLMClient, LLMError, Message};
use drift_types::TraversalPath;
use std::sync::Arc;
use tracing::debug;

pub const NO_RESULTS_MESSAGE: &str = "No relevant information found in the knowledge graph.";

const PATH_SEPARATOR: &str = " -> ";
const MAX_PROVENANCE_PATHS: usize = 3;

const SYSTEM_PROMPT: &str = "You answer questions using only the knowledge-graph paths provided. \
Each path is a chain of related facts. Combine them into a concise answer and say so when the \
paths do not contain the answer.";

pub struct ResponseSynthesizer {
    llm: Option<Arc<dyn LLMClient>>,
}

impl ResponseSynthesizer {
    pub fn new(llm: Option<Arc<dyn LLMClient>>) -> Self {
        Self { llm }
    }

    pub fn has_llm(&self) -> bool {
        self.llm.is_some()
    }

    /// One line per path: `Path i (score s): content -> content -> ...`.
    pub fn build_context(paths: &[TraversalPath]) -> String {
        paths
            .iter()
            .enumerate()
            .map(|(i, p)| {
                let chain: Vec<&str> = p.nodes().iter().map(|n| n.content.as_str()).collect();
                format!(
                    "Path {} (score {:.2}): {}",
                    i + 1,
                    p.score(),
                    chain.join(PATH_SEPARATOR)
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Answer `query` from `paths`. Without an LLM the answer is a fixed template over the
    /// path context; an LLM failure is returned, never replaced by the template.
    pub async fn generate_response(
        &self,
        query: &str,
        paths: &[TraversalPath],
        include_provenance: bool,
    ) -> Result<String, LLMError> {
        if paths.is_empty() {
            return Ok(NO_RESULTS_MESSAGE.to_string());
        }
        let context = Self::build_context(paths);

        let mut answer = match &self.llm {
            Some(llm) => {
                let prompt = format!(
                    "Question: {}\n\nKnowledge graph paths:\n{}\n\nAnswer:",
                    query, context
                );
                let messages = [Message::system(SYSTEM_PROMPT), Message::user(prompt)];
                let reply = llm.complete_with_messages(&messages).await?;
                debug!(chars = reply.len(), "LLM answer received");
                reply.trim().to_string()
            }
            None => format!(
                "Based on the knowledge graph, these connections relate to \"{}\":\n{}",
                query.trim(),
                context
            ),
        };

        if include_provenance {
            answer.push_str(&provenance(paths));
        }
        Ok(answer)
    }
}

fn provenance(paths: &[TraversalPath]) -> String {
    let mut out = String::from("\n\nSources:");
    for (i, p) in paths.iter().take(MAX_PROVENANCE_PATHS).enumerate() {
        let ids: Vec<&str> = p.node_ids().collect();
        out.push_str(&format!(
            "\n{}. {} (score {:.2})",
            i + 1,
            ids.join(PATH_SEPARATOR),
            p.score()
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use drift_embed::MockLLMClient;
    use drift_types::{GraphEdge, GraphNode};

    fn path(ids: &[&str], score: f64) -> TraversalPath {
        let nodes = ids
            .iter()
            .map(|id| GraphNode::new(*id, format!("about {}", id), vec![]))
            .collect();
        let edges = ids
            .windows(2)
            .map(|w| GraphEdge::new(format!("{}{}", w[0], w[1]), w[0], w[1], "r"))
            .collect();
        TraversalPath::new(nodes, edges, score).unwrap()
    }

    #[tokio::test]
    async fn empty_paths_give_fixed_message() {
        let s = ResponseSynthesizer::new(None);
        assert_eq!(
            s.generate_response("q", &[], true).await.unwrap(),
            NO_RESULTS_MESSAGE
        );
        let llm = Arc::new(MockLLMClient::replying("unused"));
        let s = ResponseSynthesizer::new(Some(llm.clone()));
        assert_eq!(
            s.generate_response("q", &[], false).await.unwrap(),
            NO_RESULTS_MESSAGE
        );
        assert!(llm.prompts().is_empty());
    }

    #[test]
    fn context_lists_paths_with_scores() {
        let ctx = ResponseSynthesizer::build_context(&[path(&["a", "b"], 0.756), path(&["c", "d"], 0.5)]);
        assert_eq!(
            ctx,
            "Path 1 (score 0.76): about a -> about b\nPath 2 (score 0.50): about c -> about d"
        );
    }

    #[tokio::test]
    async fn template_answer_with_provenance_capped_at_three() {
        let s = ResponseSynthesizer::new(None);
        let paths: Vec<TraversalPath> = ["a", "b", "c", "d"]
            .iter()
            .map(|x| path(&[*x, "z"], 0.6))
            .collect();
        let answer = s.generate_response("what?", &paths, true).await.unwrap();
        assert!(answer.contains("about a -> about z"));
        assert!(answer.contains("Sources:\n1. a -> z (score 0.60)"));
        assert!(answer.contains("3. c -> z"));
        assert!(!answer.contains("4. d -> z"));

        let bare = s.generate_response("what?", &paths, false).await.unwrap();
        assert!(!bare.contains("Sources:"));
    }

    #[tokio::test]
    async fn llm_receives_context_and_errors_propagate() {
        let llm = Arc::new(MockLLMClient::replying("  Deep learning is ML.  "));
        let s = ResponseSynthesizer::new(Some(llm.clone()));
        let answer = s
            .generate_response("What is deep learning?", &[path(&["dl", "ml"], 0.7)], false)
            .await
            .unwrap();
        assert_eq!(answer, "Deep learning is ML.");
        let prompts = llm.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Path 1 (score 0.70): about dl -> about ml"));

        let failing = ResponseSynthesizer::new(Some(Arc::new(MockLLMClient::failing("down"))));
        assert!(failing
            .generate_response("q", &[path(&["a", "b"], 0.5)], true)
            .await
            .is_err());
    }
}
