use expertmatch_protocol::{json_schema_for, CandidateProfile, GapAnalysis, RerankEntry};
use std::fmt::Write as _;

const PROFILE_SEPARATOR: &str = "\n---\n";

fn render_profiles(profiles: &[CandidateProfile]) -> String {
    profiles
        .iter()
        .map(CandidateProfile::summary_text)
        .collect::<Vec<_>>()
        .join(PROFILE_SEPARATOR)
}

fn schema_block<T: schemars::JsonSchema>() -> String {
    match json_schema_for::<T>() {
        Ok(schema) => format!("\nThe answer must validate against this JSON schema:\n{schema}\n"),
        Err(err) => {
            log::debug!("Schema rendering failed: {err}");
            String::new()
        }
    }
}

pub(crate) fn rerank_prompt(query: &str, profiles: &[CandidateProfile]) -> String {
    let mut prompt = format!(
        r#"You are ranking expert candidates for a staffing request.

Request:
{query}

Candidates:
{candidates}

Score every candidate from 0.0 to 1.0 by how well they match the request and
order them from best to worst. Use only the Expert IDs listed above.

Return JSON only, as an array:
[
    {{"expertId": "<id>", "score": 0.95, "reason": "short justification"}}
]
"#,
        candidates = render_profiles(profiles),
    );
    prompt.push_str(&schema_block::<Vec<RerankEntry>>());
    prompt
}

pub(crate) fn gap_analysis_prompt(query: &str, profiles: &[CandidateProfile]) -> String {
    let mut prompt = format!(
        r#"You are reviewing the first retrieval pass of an expert search.

Request:
{query}

Candidates found so far ({count}):
{candidates}

Decide whether these candidates cover the request. List concrete gaps
(required skills or experience nobody shows), ambiguities in the request, and
information that is missing to judge fit. Set needsExpansion to true only when
a differently worded search is likely to find better candidates.

Return JSON only:
{{
    "identifiedGaps": ["..."],
    "ambiguities": ["..."],
    "missingInformation": ["..."],
    "needsExpansion": true,
    "reasoning": "..."
}}
"#,
        count = profiles.len(),
        candidates = render_profiles(profiles),
    );
    prompt.push_str(&schema_block::<GapAnalysis>());
    prompt
}

pub(crate) fn refinement_prompt(query: &str, analysis: &GapAnalysis, limit: usize) -> String {
    let mut findings = String::new();
    for (label, items) in [
        ("Gaps", &analysis.identified_gaps),
        ("Ambiguities", &analysis.ambiguities),
        ("Missing information", &analysis.missing_information),
    ] {
        if items.is_empty() {
            continue;
        }
        let _ = writeln!(findings, "{label}:");
        for item in items {
            let _ = writeln!(findings, "- {item}");
        }
    }
    if let Some(reasoning) = &analysis.reasoning {
        let _ = writeln!(findings, "Reasoning: {reasoning}");
    }

    format!(
        r#"An expert search did not fully cover the request below.

Request:
{query}

Review findings:
{findings}
Write up to {limit} alternative search queries that target the gaps above.
Each query should be a short, self-contained request for experts.

Return JSON only, as an array of strings:
["query one", "query two"]
"#
    )
}
