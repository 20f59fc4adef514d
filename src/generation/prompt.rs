use once_cell::sync::Lazy;
use regex::Regex;

/// A retrieved passage handed to the answer composer, in rank order
#[derive(Debug, Clone)]
pub struct ContextPassage {
    pub text: String,
    pub tokens: usize,
}

/// Template for answering with retrieved context
const ANSWER_TEMPLATE: &str = r#"You are an assistant specialized in large language models and AI technology.
Your task is to answer questions based ONLY on the information in the context sources below.

Guidelines:
- Use ONLY the information from the provided context sources.
- If the information is not in the context, clearly state that you do not have it.
- Be precise and cite specific information where relevant.
- If the question is unrelated to the provided content, say so politely.

<context>
{{CONTEXT}}
</context>

<user_query>
{{QUERY}}
</user_query>
"#;

/// Template for answering when the knowledge base returned nothing
const NO_CONTEXT_TEMPLATE: &str = r#"You are an assistant specialized in large language models and AI technology.
No relevant documents were found in the knowledge base for this question.
Tell the user that the knowledge base holds no information relevant to their question,
and suggest they rephrase it or ask something more specific about the indexed documentation.

<user_query>
{{QUERY}}
</user_query>
"#;

const FOLLOW_UP_TEMPLATE: &str = r#"Based on the user's question and the context below, suggest 3 relevant follow-up
questions the user might be interested in asking next.
Provide exactly 3 questions, one per line, numbered 1 to 3.

<original_question>
{{QUERY}}
</original_question>

<context>
{{CONTEXT}}
</context>
"#;

/// Maximum characters of context included in the follow-up prompt
const FOLLOW_UP_CONTEXT_CHARS: usize = 1000;

fn render(template: &str, context: &str, query: &str) -> String {
    template
        .replace("{{CONTEXT}}", context)
        .replace("{{QUERY}}", query)
}

/// Select passages in rank order until the token budget is exhausted.
///
/// The top-ranked passage is always included so an over-budget first hit
/// still grounds the answer.
pub fn select_within_budget(
    passages: &[ContextPassage],
    max_tokens: usize,
) -> Vec<&ContextPassage> {
    let mut selected = Vec::new();
    let mut used = 0usize;

    for (i, passage) in passages.iter().enumerate() {
        if i > 0 && used + passage.tokens > max_tokens {
            break;
        }
        used += passage.tokens;
        selected.push(passage);
    }

    selected
}

/// Format passages as numbered source blocks
fn build_context(passages: &[&ContextPassage]) -> String {
    passages
        .iter()
        .enumerate()
        .map(|(i, passage)| format!("<source id=\"{}\">{}</source>", i + 1, passage.text))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build the grounding prompt for answering `question`.
///
/// Passages must be in rank order; those that fit within `max_context_tokens`
/// are embedded as numbered source blocks. With no passages at all the
/// no-context variant is returned.
pub fn build_answer_prompt(
    question: &str,
    passages: &[ContextPassage],
    max_context_tokens: usize,
) -> String {
    let selected = select_within_budget(passages, max_context_tokens);
    if selected.is_empty() {
        return render(NO_CONTEXT_TEMPLATE, "", question);
    }
    render(ANSWER_TEMPLATE, &build_context(&selected), question)
}

/// Build the follow-up suggestion prompt (context truncated to a preview)
pub fn build_follow_up_prompt(question: &str, passages: &[ContextPassage]) -> String {
    let mut preview = String::new();
    for passage in passages {
        if preview.len() >= FOLLOW_UP_CONTEXT_CHARS {
            break;
        }
        if !preview.is_empty() {
            preview.push(' ');
        }
        preview.push_str(&passage.text);
    }
    if preview.len() > FOLLOW_UP_CONTEXT_CHARS {
        let cut = preview
            .char_indices()
            .map(|(i, _)| i)
            .take_while(|&i| i <= FOLLOW_UP_CONTEXT_CHARS)
            .last()
            .unwrap_or(0);
        preview.truncate(cut);
    }

    render(FOLLOW_UP_TEMPLATE, &preview, question)
}

static FOLLOW_UP_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:\d+[.)]\s*|[-*]\s+)(.+)$").unwrap());

/// Extract up to three follow-up questions from a numbered or dashed list
pub fn parse_follow_up_questions(text: &str) -> Vec<String> {
    text.lines()
        .filter_map(|line| {
            FOLLOW_UP_LINE
                .captures(line)
                .map(|caps| caps[1].trim().to_string())
        })
        .filter(|question| !question.is_empty())
        .take(3)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn passage(text: &str, tokens: usize) -> ContextPassage {
        ContextPassage {
            text: text.to_string(),
            tokens,
        }
    }

    #[test]
    fn test_budget_selects_rank_order_prefix() {
        let passages = vec![passage("a", 50), passage("b", 60), passage("c", 10)];
        let selected = select_within_budget(&passages, 100);
        // "b" does not fit after "a"; selection stops rather than skipping ahead
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].text, "a");
    }

    #[test]
    fn test_budget_always_includes_top_passage() {
        let passages = vec![passage("big", 500), passage("small", 10)];
        let selected = select_within_budget(&passages, 100);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].text, "big");
    }

    #[test]
    fn test_budget_includes_all_when_they_fit() {
        let passages = vec![passage("a", 10), passage("b", 20), passage("c", 30)];
        let selected = select_within_budget(&passages, 100);
        assert_eq!(selected.len(), 3);
    }

    #[test]
    fn test_answer_prompt_embeds_sources_and_question() {
        let passages = vec![passage("LLMs use transformers.", 5)];
        let prompt = build_answer_prompt("What are LLMs?", &passages, 100);
        assert!(prompt.contains("<source id=\"1\">LLMs use transformers.</source>"));
        assert!(prompt.contains("What are LLMs?"));
        assert!(!prompt.contains("{{CONTEXT}}"));
        assert!(!prompt.contains("{{QUERY}}"));
    }

    #[test]
    fn test_answer_prompt_without_context() {
        let prompt = build_answer_prompt("What are LLMs?", &[], 100);
        assert!(prompt.contains("No relevant documents"));
        assert!(prompt.contains("What are LLMs?"));
    }

    #[test]
    fn test_follow_up_prompt_truncates_context() {
        let passages = vec![passage(&"x".repeat(5000), 1250)];
        let prompt = build_follow_up_prompt("question", &passages);
        assert!(prompt.len() < 5000);
    }

    #[test]
    fn test_parse_numbered_follow_ups() {
        let text = "1. What is attention?\n2) How are models trained?\n3. What is RLHF?";
        let questions = parse_follow_up_questions(text);
        assert_eq!(
            questions,
            vec![
                "What is attention?",
                "How are models trained?",
                "What is RLHF?"
            ]
        );
    }

    #[test]
    fn test_parse_dashed_follow_ups_caps_at_three() {
        let text = "- one?\n- two?\n- three?\n- four?";
        let questions = parse_follow_up_questions(text);
        assert_eq!(questions.len(), 3);
    }

    #[test]
    fn test_parse_ignores_prose_lines() {
        let text = "Here are some questions:\n1. Only this one counts.";
        let questions = parse_follow_up_questions(text);
        assert_eq!(questions, vec!["Only this one counts."]);
    }
}
