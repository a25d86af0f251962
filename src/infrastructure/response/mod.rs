use once_cell::sync::Lazy;
use regex::Regex;

static THINK_TAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<think>[\s\S]*?</think>\n?|<think\s*/>\n?").unwrap());

static REASONING_TAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<reasoning>[\s\S]*?</reasoning>\n?").unwrap());

static INTERNAL_TAG_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<internal>[\s\S]*?</internal>\n?").unwrap());

/// Removes reasoning artifacts some models emit around the actual answer.
/// Cell whitespace is left alone; trailing tabs are significant.
pub fn strip_reasoning_tags(response: &str) -> String {
    let cleaned = THINK_TAG_PATTERN.replace_all(response, "");
    let cleaned = REASONING_TAG_PATTERN.replace_all(&cleaned, "");
    INTERNAL_TAG_PATTERN.replace_all(&cleaned, "").into_owned()
}

/// Unwraps a response that is entirely one markdown code block
/// (```` ``` ```` or ```` ```tsv ````). Anything else is returned unchanged.
pub fn strip_code_fence(response: &str) -> &str {
    let trimmed = response.trim_matches(|c| c == '\n' || c == '\r' || c == ' ');
    let Some(rest) = trimmed.strip_prefix("```") else {
        return response;
    };
    let Some(body) = rest.strip_suffix("```") else {
        return response;
    };
    // Opening fence line may carry a language tag.
    match body.find('\n') {
        Some(idx) if !body[..idx].contains('\t') => body[idx + 1..].trim_end_matches(['\n', '\r']),
        _ => response,
    }
}

/// Full cleanup applied to generation output before strict parsing.
pub fn normalize_generation_output(response: &str) -> String {
    let stripped = strip_reasoning_tags(response);
    strip_code_fence(&stripped).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_think_tags() {
        let input = "<think>Some reasoning here</think>A\tB";
        assert_eq!(strip_reasoning_tags(input), "A\tB");
    }

    #[test]
    fn test_clean_self_closing_think() {
        assert_eq!(strip_reasoning_tags("<think />A\tB"), "A\tB");
    }

    #[test]
    fn test_clean_reasoning_and_internal_tags() {
        let input = "<reasoning>plan</reasoning>\n<internal>debug</internal>\nA\tB";
        assert_eq!(strip_reasoning_tags(input), "A\tB");
    }

    #[test]
    fn test_trailing_empty_cells_survive() {
        let input = "A\tB\nx\t";
        assert_eq!(normalize_generation_output(input), "A\tB\nx\t");
    }

    #[test]
    fn test_fence_with_language_tag() {
        let input = "```tsv\nA\tB\n1\t2\n```\n";
        assert_eq!(normalize_generation_output(input), "A\tB\n1\t2");
    }

    #[test]
    fn test_bare_fence() {
        assert_eq!(strip_code_fence("```\nA\tB\n```"), "A\tB");
    }

    #[test]
    fn test_unfenced_text_untouched() {
        let input = "Requirement\tStatus\nMust register\tPending\n";
        assert_eq!(strip_code_fence(input), input);
    }

    #[test]
    fn test_unterminated_fence_untouched() {
        let input = "```\nA\tB";
        assert_eq!(strip_code_fence(input), input);
    }
}
