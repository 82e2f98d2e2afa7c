//! Prompt builders for the router and synthesis stages.
//!
//! The router prompt embeds every candidate description in a 1-based
//! numbered list and tells the model to return only the subset of
//! indices it needs. The summary prompt merges the texts from several
//! candidate responses into a single answer.

use std::fmt::Write;

/// Builds the router prompt from the query and candidate descriptions.
///
/// Choices are numbered from 1; [`AnswerSet`](super::router::AnswerSet)
/// indices refer to this numbering.
#[must_use]
pub fn build_router_prompt(query: &str, choices: &[&str]) -> String {
    let num_choices = choices.len();
    let context_list = build_choice_list(choices);
    format!(
        "Some choices are given below. It is provided in a numbered list (1 to {num_choices}), \
         where each item in the list corresponds to a summary.\n\
         ---------------------\n\
         {context_list}\n\
         ---------------------\n\
         Using only the choices above and not prior knowledge, return the top choices \
         (no more than {num_choices}, but only select what is needed) that are most relevant \
         to the question: '{query}'\n"
    )
}

/// Formats candidate descriptions as a 1-based numbered list.
#[must_use]
pub fn build_choice_list(choices: &[&str]) -> String {
    let mut out = String::new();
    for (idx, choice) in choices.iter().enumerate() {
        if idx > 0 {
            out.push_str("\n\n");
        }
        let _ = write!(out, "{}. {choice}", idx + 1);
    }
    out
}

/// Builds the summarization prompt for merging multiple engine responses.
#[must_use]
pub fn build_summary_prompt(query: &str, responses: &[&str]) -> String {
    let context = responses.join("\n---------------------\n");
    format!(
        "Context information from multiple sources is below.\n\
         ---------------------\n\
         {context}\n\
         ---------------------\n\
         Given the information from multiple sources and not prior knowledge, \
         answer the query.\n\
         Query: {query}\n\
         Answer: "
    )
}
