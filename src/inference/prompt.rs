//! Prompt text and response schema sent to the model.

use serde_json::{json, Value};

/// Build the review prompt for a staged change.
pub fn compose(diff: &str, context: &str) -> String {
    format!(
        r#"
You are a Git Pre-commit Guard.
Analyze the code changes.

[CODE DIFF]
{diff}

[FULL FILE CONTEXT]
{context}

[RESPONSE SCHEMA]
You MUST return a JSON object with exactly these fields:
{{
    "status": "PASS" or "FAIL",
    "message": "Short summary of findings",
    "details": ["Detail 1", "Detail 2"]
}}

Rules:
1. If code is safe -> status: "PASS", details: [].
2. If bugs/security risks found -> status: "FAIL".
"#
    )
}

/// Gemini `responseSchema` for the verdict object.
pub fn response_schema() -> Value {
    json!({
        "type": "OBJECT",
        "properties": {
            "status": {
                "type": "STRING",
                "enum": ["PASS", "FAIL"]
            },
            "message": {
                "type": "STRING"
            },
            "details": {
                "type": "ARRAY",
                "items": { "type": "STRING" }
            }
        },
        "required": ["status", "message", "details"],
        "propertyOrdering": ["status", "message", "details"]
    })
}
