use crate::generator::{FixRecommendation, RecommendationInput};
use anyhow::{Context, Result};

/// Builds the user prompt asking the model for one structured fix
/// recommendation.
pub fn build_recommendation_prompt(input: &RecommendationInput) -> String {
    format!(
        "A website quality audit of {url} found the following {category} issue \
(severity: {severity}):\n\
Title: {title}\n\
Details: {description}\n\n\
Respond with a single JSON object and nothing else, using exactly these keys:\n\
{{\n\
  \"description\": \"one-paragraph summary of the fix\",\n\
  \"priority\": \"low|medium|high|critical\",\n\
  \"implementation_details\": \"concrete steps to implement the fix\",\n\
  \"impact\": <integer 1-10, expected improvement>,\n\
  \"effort\": <integer 1-10, implementation cost>\n\
}}",
        url = input.url,
        category = input.category,
        severity = input.severity,
        title = input.issue_title,
        description = input.issue_description,
    )
}

/// Parses the model's reply into a [`FixRecommendation`].
///
/// Tolerates markdown code fences and surrounding prose by extracting the
/// first balanced JSON object. `impact` and `effort` are clamped to 1-10.
pub fn parse_recommendation(content: &str) -> Result<FixRecommendation> {
    let json = extract_json_object(content)
        .context("model reply did not contain a JSON object")?;
    let mut rec: FixRecommendation =
        serde_json::from_str(json).context("model reply was not valid recommendation JSON")?;
    rec.impact = rec.impact.clamp(1, 10);
    rec.effort = rec.effort.clamp(1, 10);
    Ok(rec)
}

fn extract_json_object(content: &str) -> Option<&str> {
    let start = content.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, ch) in content[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return Some(&content[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use sitescan_common::types::{IssueCategory, Priority, Severity};

    fn input() -> RecommendationInput {
        RecommendationInput {
            url: "https://example.com".into(),
            issue_title: "Missing alt text".into(),
            issue_description: "Images lack alternative text".into(),
            severity: Severity::High,
            category: IssueCategory::Accessibility,
        }
    }

    #[test]
    fn prompt_names_issue_and_url() {
        let prompt = build_recommendation_prompt(&input());
        assert!(prompt.contains("https://example.com"));
        assert!(prompt.contains("Missing alt text"));
        assert!(prompt.contains("accessibility"));
    }

    #[test]
    fn parses_bare_json() {
        let rec = parse_recommendation(
            r#"{"description":"Add alt text","priority":"high","implementation_details":"Use the alt attribute","impact":8,"effort":3}"#,
        )
        .unwrap();
        assert_eq!(rec.priority, Priority::High);
        assert_eq!(rec.impact, 8);
        assert_eq!(rec.effort, 3);
    }

    #[test]
    fn parses_fenced_json_and_clamps_ranges() {
        let reply = "Here you go:\n```json\n{\"description\":\"Fix it\",\"priority\":\"critical\",\"implementation_details\":\"Steps\",\"impact\":15,\"effort\":0}\n```";
        let rec = parse_recommendation(reply).unwrap();
        assert_eq!(rec.impact, 10);
        assert_eq!(rec.effort, 1);
    }

    #[test]
    fn rejects_reply_without_json() {
        assert!(parse_recommendation("I cannot help with that.").is_err());
    }
}
