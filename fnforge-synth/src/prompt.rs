//! Initial prompt construction

use tracing::debug;

use crate::error::{Result, SynthError};
use crate::executor::TestCase;

/// Upper bound on prompt length, in characters
pub const MAX_PROMPT_LENGTH: usize = 2400;

/// Fixed instructions placed before the function description
pub const PROMPT_PREFIX: &str = "Write a javascript function as described below.

It must be called `f`, it must be unary and the variable should be called `x`.

No side effects or dependencies are allowed, so no `console.log` for example.

After the description there are test cases, they might imply more requirements.

Think step by step and make sure your function is wrapped in backticks.

Here is the function description:
";

/// Render one example the way prompts and corrections show it
pub fn format_test_case(case: &TestCase) -> Result<String> {
    Ok(format!(
        "input: {}\noutput: {}",
        serde_json::to_string(&case.input)?,
        serde_json::to_string(&case.expected)?
    ))
}

/// Build the opening prompt. Test cases are appended in order until the
/// next one would push the prompt past `MAX_PROMPT_LENGTH`; that case and
/// every later one are left out.
pub fn build_prompt(description: &str, test_cases: &[TestCase]) -> Result<String> {
    let mut prompt = format!("{}{}", PROMPT_PREFIX, description);
    let mut length = prompt.chars().count();
    if length > MAX_PROMPT_LENGTH {
        return Err(SynthError::PromptTooLong {
            length,
            max: MAX_PROMPT_LENGTH,
        });
    }

    let mut included = 0;
    for case in test_cases {
        let section = format!("\n\n{}", format_test_case(case)?);
        let section_length = section.chars().count();
        if length + section_length > MAX_PROMPT_LENGTH {
            break;
        }
        prompt.push_str(&section);
        length += section_length;
        included += 1;
    }

    debug!(
        included,
        dropped = test_cases.len() - included,
        length,
        "prompt built"
    );
    Ok(prompt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn case(input: serde_json::Value, expected: serde_json::Value) -> TestCase {
        TestCase::new(input, expected)
    }

    #[test]
    fn test_prompt_layout() {
        let prompt = build_prompt(
            "determine if prime",
            &[case(json!(1), json!(false)), case(json!(2), json!(true))],
        )
        .unwrap();
        assert_eq!(
            prompt,
            format!(
                "{}determine if prime\n\ninput: 1\noutput: false\n\ninput: 2\noutput: true",
                PROMPT_PREFIX
            )
        );
    }

    #[test]
    fn test_compact_json() {
        let prompt = build_prompt("d", &[case(json!({"a": [1, 2]}), json!("s"))]).unwrap();
        assert!(prompt.ends_with("input: {\"a\":[1,2]}\noutput: \"s\""));
    }

    #[test]
    fn test_overflowing_case_and_rest_are_dropped() {
        let prefix_len = PROMPT_PREFIX.chars().count();
        let description = "d".repeat(MAX_PROMPT_LENGTH - prefix_len - 40);
        let small = case(json!(1), json!(2));
        let large = case(json!("x".repeat(100)), json!(0));

        let prompt = build_prompt(&description, &[small.clone(), large, small]).unwrap();
        assert!(prompt.chars().count() <= MAX_PROMPT_LENGTH);
        assert_eq!(prompt.matches("input:").count(), 1);
    }

    #[test]
    fn test_prompt_exactly_at_limit() {
        let prefix_len = PROMPT_PREFIX.chars().count();
        let section_len = "\n\ninput: 1\noutput: 2".len();
        let description = "d".repeat(MAX_PROMPT_LENGTH - prefix_len - section_len);

        let prompt = build_prompt(&description, &[case(json!(1), json!(2))]).unwrap();
        assert_eq!(prompt.chars().count(), MAX_PROMPT_LENGTH);
    }

    #[test]
    fn test_length_counts_characters() {
        let prefix_len = PROMPT_PREFIX.chars().count();
        let description = "é".repeat(MAX_PROMPT_LENGTH - prefix_len);
        assert!(build_prompt(&description, &[]).is_ok());
    }

    #[test]
    fn test_description_too_long() {
        let description = "d".repeat(MAX_PROMPT_LENGTH);
        match build_prompt(&description, &[case(json!(1), json!(1))]) {
            Err(SynthError::PromptTooLong { length, max }) => {
                assert_eq!(max, MAX_PROMPT_LENGTH);
                assert_eq!(length, PROMPT_PREFIX.chars().count() + MAX_PROMPT_LENGTH);
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
