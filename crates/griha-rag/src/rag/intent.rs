//! Four-way intent classification.
//!
//! Two interchangeable strategies behind one entry point: a zero-cost
//! rule-based classifier (the primary fallback, byte-for-byte reproducible)
//! and an LLM-backed classifier that asks for one label from a closed set.
//! `classify` never fails — every LLM problem, timeouts included, degrades
//! to the rule-based result, and the rule-based default is always `Filter`.

use crate::llm::LlmProvider;
use crate::types::Intent;

const CLASSIFIER_SYSTEM_PROMPT: &str = "\
You are an Intent Classifier for a Real Estate Investment Analyzer.
Classify the user's query into EXACTLY one of the following categories:

1. FILTER: Requests for listings, searching properties, or subsets (e.g., \"Show me 3 BHKs in New Town\", \"Properties under 50L\").
2. EXPLAIN: Requests for reasoning behind a specific decision or property detail (e.g., \"Why is this property a BUY?\", \"Explain the tax benefits for this flat\").
3. COMPARE: Requests to evaluate two or more properties against each other (e.g., \"Compare the property in New Town vs the one in Salt Lake\").
4. EDUCATIONAL: General questions about tax concepts, financial logic, or definitions (e.g., \"How is rental yield calculated?\", \"What is Section 24b?\").

Return ONLY the category name. Do not add punctuation or explanation.";

/// Rule-based classification. First matching rule wins, so a query
/// containing both "compare" and "show" resolves to `Compare`.
pub fn classify_rule_based(query: &str) -> Intent {
    let q = query.to_lowercase();

    if ["compare", "vs", "difference"].iter().any(|w| q.contains(w)) {
        return Intent::Compare;
    }
    if ["why", "explain", "reason"].iter().any(|w| q.contains(w)) {
        return Intent::Explain;
    }
    if ["show", "list", "find", "properties"].iter().any(|w| q.contains(w)) {
        return Intent::Filter;
    }
    if ["what is", "how does", "tax"].iter().any(|w| q.contains(w)) {
        return Intent::Educational;
    }

    // Safe default: worst case is a bounded listing.
    Intent::Filter
}

/// Classify via the LLM, falling back to the rule-based result on any
/// failure. The call runs at temperature 0 and expects a single label.
pub async fn classify(query: &str, provider: &dyn LlmProvider) -> Intent {
    if !provider.is_enabled() {
        return classify_rule_based(query);
    }

    match provider.generate(CLASSIFIER_SYSTEM_PROMPT, query, 0.0).await {
        Ok(raw) => match parse_intent_label(&raw) {
            Some(intent) => {
                tracing::debug!(query, intent = %intent, "LLM intent classification");
                intent
            }
            None => {
                tracing::warn!(query, raw, "Unparseable intent label, using rule-based fallback");
                classify_rule_based(query)
            }
        },
        Err(e) => {
            tracing::warn!(query, error = %e, "LLM classification failed, using rule-based fallback");
            classify_rule_based(query)
        }
    }
}

/// Parse the single returned token: upper-cased, stripped of punctuation.
fn parse_intent_label(raw: &str) -> Option<Intent> {
    let label: String = raw
        .trim()
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .collect::<String>()
        .to_uppercase();
    match label.as_str() {
        "FILTER" => Some(Intent::Filter),
        "EXPLAIN" => Some(Intent::Explain),
        "COMPARE" => Some(Intent::Compare),
        "EDUCATIONAL" => Some(Intent::Educational),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::DisabledProvider;

    #[test]
    fn test_compare_keywords() {
        assert_eq!(classify_rule_based("compare these flats"), Intent::Compare);
        assert_eq!(classify_rule_based("New Town vs Salt Lake"), Intent::Compare);
        assert_eq!(
            classify_rule_based("what is the wealth difference here"),
            Intent::Compare
        );
    }

    #[test]
    fn test_priority_order_compare_beats_show() {
        // Contains both "compare" (rule 1) and "show" (rule 3).
        assert_eq!(
            classify_rule_based("show me a comparison, compare the two"),
            Intent::Compare
        );
    }

    #[test]
    fn test_explain_keywords() {
        assert_eq!(classify_rule_based("why is this a BUY?"), Intent::Explain);
        assert_eq!(classify_rule_based("explain the decision"), Intent::Explain);
        assert_eq!(classify_rule_based("reason for renting"), Intent::Explain);
    }

    #[test]
    fn test_filter_keywords() {
        assert_eq!(classify_rule_based("Show me 3 BHK in New Town"), Intent::Filter);
        assert_eq!(classify_rule_based("list flats in Garia"), Intent::Filter);
        assert_eq!(classify_rule_based("find me something cheap"), Intent::Filter);
        assert_eq!(classify_rule_based("properties under 50L"), Intent::Filter);
    }

    #[test]
    fn test_educational_keywords() {
        assert_eq!(classify_rule_based("what is Section 24b?"), Intent::Educational);
        assert_eq!(classify_rule_based("how does an EMI work"), Intent::Educational);
        assert_eq!(classify_rule_based("tax benefits of home loans"), Intent::Educational);
    }

    #[test]
    fn test_default_fallback_is_filter() {
        assert_eq!(classify_rule_based("hmm"), Intent::Filter);
        assert_eq!(classify_rule_based(""), Intent::Filter);
    }

    #[test]
    fn test_classification_is_case_insensitive() {
        assert_eq!(classify_rule_based("COMPARE THE TWO"), Intent::Compare);
        assert_eq!(classify_rule_based("WHY is this a buy"), Intent::Explain);
    }

    #[test]
    fn test_parse_intent_label_strips_punctuation() {
        assert_eq!(parse_intent_label(" filter.\n"), Some(Intent::Filter));
        assert_eq!(parse_intent_label("COMPARE!"), Some(Intent::Compare));
        assert_eq!(parse_intent_label("\"EDUCATIONAL\""), Some(Intent::Educational));
        assert_eq!(parse_intent_label("banana"), None);
    }

    #[tokio::test]
    async fn test_disabled_provider_falls_back_to_rules() {
        let intent = classify("compare flats in Garia", &DisabledProvider).await;
        assert_eq!(intent, Intent::Compare);
        let intent = classify("unclassifiable mumbling", &DisabledProvider).await;
        assert_eq!(intent, Intent::Filter);
    }
}
