//! Prompts for the grading model.
//!
//! The system prompt is static so providers with prompt caching can reuse it.
//! The user prompt carries the per-request task context and payloads.

use arbiter_core::TaskType;

/// System prompt shared by every grading call.
pub const GRADER_SYSTEM_PROMPT: &str = r#"
You are an expert AI evaluator. Your task is to evaluate the quality of AI model
outputs based on the given input and task context.

## Evaluation Criteria
Rate the output quality on a scale of 1-5 where:
- 1 (Poor): Completely incorrect, irrelevant, or harmful
- 2 (Below Average): Mostly incorrect or missing key elements
- 3 (Average): Partially correct but with significant issues
- 4 (Good): Mostly correct with minor issues
- 5 (Excellent): Accurate, complete, and well-executed

Consider these factors:
- Accuracy: Does the output correctly address the input?
- Completeness: Does it cover all necessary aspects?
- Relevance: Is it appropriate for the given task?
- Quality: Is it well-structured and coherent?

## Response Format (JSON only)
{
  "score": 4.2,
  "pass": true,
  "feedback": "Why the output earned this score."
}

## Response Rules
1. The score must be a number between 1.0 and 5.0 (decimals allowed)
2. The pass field must be true if score >= 3.5, false otherwise
3. The feedback must be a string explaining your evaluation
4. Do not include any text before or after the JSON
5. Do not use markdown code blocks or formatting
"#;

/// Build the user prompt for one model run.
pub fn grading_prompt(
    task: TaskType,
    model_name: &str,
    platform: &str,
    input: &serde_json::Value,
    output: &serde_json::Value,
) -> String {
    format!(
        r#"## Task Context
- Task Type: {task}
- Model: {model_name}
- Platform: {platform}

## Input Data
{input}

## Output to Evaluate
{output}
"#,
        task = task,
        model_name = model_name,
        platform = platform,
        input = render_payload(input),
        output = render_payload(output),
    )
}

/// Strings are shown verbatim; everything else as pretty JSON.
fn render_payload(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string()),
    }
}
