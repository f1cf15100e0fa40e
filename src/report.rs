//! Terminal rendering of a finished research run.

use colored::Colorize;

use crate::models::WorkflowState;

/// Characters of the abstract shown under each paper.
const ABSTRACT_PREVIEW_CHARS: usize = 200;

/// Render the papers and their summaries for the terminal.
pub fn render_report(state: &WorkflowState) -> String {
    let mut out = String::new();

    if state.results().next().is_none() {
        out.push_str(&"No papers found".yellow().to_string());
        out.push('\n');
        return out;
    }

    if let Some(query) = &state.query {
        out.push_str(&format!("{} {}\n", "Query:".dimmed(), query));
    }
    out.push_str(&format!("\n{}\n", "Retrieved Papers:".blue().bold()));

    for (paper, summary) in state.results() {
        out.push_str(&format!("\n{}\n", paper.title.bold()));
        out.push_str(&format!("Authors: {}\n", paper.authors.join(", ")));
        out.push_str(&format!("Published: {}\n", paper.publication_date));
        out.push_str(&format!("Summary: {}\n", summary.summary));
        out.push_str(&format!("Abstract: {}...\n", preview(&paper.abstract_text)));
    }

    out
}

fn preview(text: &str) -> &str {
    match text.char_indices().nth(ABSTRACT_PREVIEW_CHARS) {
        Some((cut, _)) => &text[..cut],
        None => text,
    }
}
