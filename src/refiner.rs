//! # Query Refiner
//!
//! Turns a free-text research topic into arXiv search syntax.
//!
//! Two shapes come out of the heuristic:
//! - `"<subject> in <field>"` becomes `all:<subject> AND cat:<field>`
//! - anything else becomes a title-or-abstract phrase match

use tracing::info;

use crate::models::RefinedQuery;

/// Separator between the subject and its field, e.g. "transformers in nlp".
const CONTEXT_SEPARATOR: &str = " in ";

/// Refine a topic into an arXiv query.
///
/// This never fails. An empty topic gives `ti:"" OR abs:""`, which is
/// useless but well-formed.
///
/// # Example
/// ```
/// use academic_researcher::refiner::refine_topic;
///
/// let refined = refine_topic("Transformers in NLP");
/// assert_eq!(refined.query, "all:transformers AND cat:nlp");
/// ```
pub fn refine_topic(topic: &str) -> RefinedQuery {
    let topic = topic.trim().to_lowercase();

    // split_once only cuts at the first separator; the rest stays in `context`.
    let query = match topic.split_once(CONTEXT_SEPARATOR) {
        Some((main_topic, context)) => format!(
            "all:{} AND cat:{}",
            main_topic.trim(),
            context.trim().replace(' ', "_")
        ),
        None => format!("ti:\"{topic}\" OR abs:\"{topic}\""),
    };

    info!(query = %query, "Refined query generated");
    RefinedQuery { query }
}
