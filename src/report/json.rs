use crate::consolidate::ConsolidatedAnnotation;
use anyhow::Result;

/// Serialize the annotations as a pretty-printed JSON array, one object
/// per query, in input order.
pub fn generate_json_report(annotations: &[ConsolidatedAnnotation]) -> Result<String> {
    let mut output = serde_json::to_string_pretty(annotations)?;
    output.push('\n');
    Ok(output)
}
