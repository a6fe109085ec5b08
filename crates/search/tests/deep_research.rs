mod support;

use expertmatch_protocol::{ParsedQuery, QueryOptions, RetrievalRequest, RetrievalResult};
use expertmatch_search::{
    CancelFlag, DeepResearchService, ExecutionTrace, InMemoryProfileStore, RequestContext,
    RetrievalConfig, SearchError, StepStatus,
};
use pretty_assertions::assert_eq;
use std::sync::Arc;
use support::{sample_profiles, RecordingRetriever, ScriptedClient};

const QUERY: &str = "Java experts for real-time payments";

const GAPS: &str = r#"Here is my review:
```json
{
  "identifiedGaps": ["no streaming experience"],
  "ambiguities": [],
  "missingInformation": [],
  "needsExpansion": true,
  "reasoning": "candidates lack Kafka"
}
```"#;

fn request() -> RetrievalRequest {
    RetrievalRequest::new(QUERY).with_options(QueryOptions {
        deep_research: true,
        ..QueryOptions::default()
    })
}

fn service(retriever: Arc<RecordingRetriever>, client: Arc<ScriptedClient>) -> DeepResearchService {
    DeepResearchService::new(
        retriever,
        Arc::new(InMemoryProfileStore::new(sample_profiles())),
        client,
    )
}

#[tokio::test]
async fn empty_initial_result_short_circuits() {
    let retriever = Arc::new(RecordingRetriever::new());
    let client = Arc::new(ScriptedClient::new().reply(GAPS));

    let result = service(retriever.clone(), client.clone())
        .perform_deep_research(&request(), &ParsedQuery::bare(QUERY), &RequestContext::new())
        .await
        .expect("deep research");

    assert!(result.is_empty());
    assert_eq!(client.calls(), 0);
    assert_eq!(retriever.requests().len(), 1);
}

#[tokio::test]
async fn no_gaps_returns_initial_result_after_one_call() {
    let retriever = Arc::new(RecordingRetriever::new().answer(QUERY, &[("e1", 0.9), ("e2", 0.5)]));
    let client = Arc::new(ScriptedClient::new().reply(r#"{"needsExpansion": false}"#));

    let result = service(retriever.clone(), client.clone())
        .perform_deep_research(&request(), &ParsedQuery::bare(QUERY), &RequestContext::new())
        .await
        .expect("deep research");

    let initial = RetrievalResult::from_scored([("e1", 0.9), ("e2", 0.5)]);
    assert_eq!(result, initial);
    assert_eq!(client.calls(), 1);
    assert!(client.prompts()[0].contains("Alice Moreau"));
}

#[tokio::test]
async fn expansion_survives_a_failing_refined_query() {
    let retriever = Arc::new(
        RecordingRetriever::new()
            .answer(QUERY, &[("e1", 0.9)])
            .fail("Kafka streaming engineers", "vector store offline")
            .answer("Event-driven payments architects", &[("e3", 0.95), ("e1", 0.4)]),
    );
    let client = Arc::new(
        ScriptedClient::new()
            .reply(GAPS)
            .reply(r#"["Kafka streaming engineers", "Event-driven payments architects"]"#),
    );
    let trace = ExecutionTrace::new();
    let ctx = RequestContext::new().with_trace(trace.clone());

    let result = service(retriever.clone(), client.clone())
        .perform_deep_research(&request(), &ParsedQuery::bare(QUERY), &ctx)
        .await
        .expect("partial failure must not escape");

    assert_eq!(result.expert_ids, vec!["e3", "e1"]);
    assert_eq!(result.score("e1"), Some(0.9));
    assert_eq!(result.score("e3"), Some(0.95));
    assert_eq!(client.calls(), 2);
    assert!(trace
        .steps()
        .iter()
        .any(|s| s.name == "Expanded Retrieval" && s.status == StepStatus::Degraded));
}

#[tokio::test]
async fn sub_requests_never_expand_again() {
    let retriever = Arc::new(
        RecordingRetriever::new()
            .answer(QUERY, &[("e1", 0.9)])
            .answer("Kafka streaming engineers", &[("e3", 0.7)])
            .answer("Scala data engineers", &[("e3", 0.6)]),
    );
    let client = Arc::new(
        ScriptedClient::new()
            .reply(GAPS)
            .reply(r#"{"queries": ["Kafka streaming engineers", "Scala data engineers"]}"#),
    );

    service(retriever.clone(), client)
        .perform_deep_research(&request(), &ParsedQuery::bare(QUERY), &RequestContext::new())
        .await
        .expect("deep research");

    let requests = retriever.requests();
    assert_eq!(requests.len(), 3);
    assert!(requests.iter().all(|r| !r.options.deep_research));
}

#[tokio::test]
async fn unparseable_gap_analysis_is_fatal() {
    let retriever = Arc::new(RecordingRetriever::new().answer(QUERY, &[("e1", 0.9)]));
    let client = Arc::new(ScriptedClient::new().reply("Sorry, I can't evaluate these candidates."));

    let err = service(retriever, client)
        .perform_deep_research(&request(), &ParsedQuery::bare(QUERY), &RequestContext::new())
        .await
        .expect_err("gap analysis parse failure propagates");
    assert!(matches!(
        err,
        SearchError::ModelResponseUnparseable {
            stage: "gap_analysis",
            ..
        }
    ));
}

#[tokio::test]
async fn gap_analysis_array_is_rejected() {
    let retriever = Arc::new(RecordingRetriever::new().answer(QUERY, &[("e1", 0.9)]));
    let client = Arc::new(ScriptedClient::new().reply("```json\n[]\n```"));

    let err = service(retriever, client.clone())
        .perform_deep_research(&request(), &ParsedQuery::bare(QUERY), &RequestContext::new())
        .await
        .expect_err("an array is not a gap analysis");
    assert!(matches!(
        err,
        SearchError::ModelResponseUnparseable {
            stage: "gap_analysis",
            ..
        }
    ));
    assert_eq!(client.calls(), 1);
}

#[tokio::test]
async fn merged_result_respects_max_results() {
    let retriever = Arc::new(
        RecordingRetriever::new()
            .answer(QUERY, &[("e1", 0.9), ("e2", 0.5)])
            .answer("Kafka streaming engineers", &[("e3", 0.95), ("e4", 0.7)]),
    );
    let client = Arc::new(
        ScriptedClient::new()
            .reply(GAPS)
            .reply(r#"["Kafka streaming engineers"]"#),
    );
    let request = RetrievalRequest::new(QUERY).with_options(QueryOptions {
        deep_research: true,
        max_results: 2,
        ..QueryOptions::default()
    });

    let result = service(retriever, client)
        .perform_deep_research(&request, &ParsedQuery::bare(QUERY), &RequestContext::new())
        .await
        .expect("deep research");
    assert_eq!(result.expert_ids, vec!["e3", "e1"]);
    assert_eq!(result.score("e4"), None);
}

#[tokio::test]
async fn failed_refinement_keeps_initial_result() {
    let retriever = Arc::new(RecordingRetriever::new().answer(QUERY, &[("e1", 0.9)]));
    let client = Arc::new(ScriptedClient::new().reply(GAPS).reply("no idea"));

    let result = service(retriever.clone(), client.clone())
        .perform_deep_research(&request(), &ParsedQuery::bare(QUERY), &RequestContext::new())
        .await
        .expect("refinement failure is recovered");
    assert_eq!(result.expert_ids, vec!["e1"]);
    assert_eq!(client.calls(), 2);
    assert_eq!(retriever.requests().len(), 1);
}

#[tokio::test]
async fn all_expansions_failing_keeps_initial_result() {
    let retriever = Arc::new(
        RecordingRetriever::new()
            .answer(QUERY, &[("e1", 0.9)])
            .fail("Kafka streaming engineers", "timeout"),
    );
    let client = Arc::new(
        ScriptedClient::new()
            .reply(GAPS)
            .reply(r#"["Kafka streaming engineers"]"#),
    );

    let result = service(retriever, client)
        .perform_deep_research(&request(), &ParsedQuery::bare(QUERY), &RequestContext::new())
        .await
        .expect("deep research");
    assert_eq!(result, RetrievalResult::from_scored([("e1", 0.9)]));
}

#[tokio::test]
async fn refined_queries_are_capped_and_deduplicated() {
    let retriever = Arc::new(RecordingRetriever::new().answer(QUERY, &[("e1", 0.9)]));
    let client = Arc::new(ScriptedClient::new().reply(GAPS).reply(
        r#"["q one", "Q ONE", "  ", "Java experts for real-time payments", "q two", "q three"]"#,
    ));
    let config = RetrievalConfig {
        max_refined_queries: 2,
        ..RetrievalConfig::default()
    };

    service(retriever.clone(), client)
        .with_config(config)
        .perform_deep_research(&request(), &ParsedQuery::bare(QUERY), &RequestContext::new())
        .await
        .expect("deep research");

    let mut expanded: Vec<String> = retriever
        .requests()
        .into_iter()
        .skip(1)
        .map(|r| r.query)
        .collect();
    expanded.sort();
    assert_eq!(expanded, vec!["q one", "q two"]);
}

#[tokio::test]
async fn cancelled_request_stops_before_retrieval() {
    let retriever = Arc::new(RecordingRetriever::new().answer(QUERY, &[("e1", 0.9)]));
    let client = Arc::new(ScriptedClient::new());
    let flag = CancelFlag::new();
    flag.cancel();

    let err = service(retriever.clone(), client)
        .perform_deep_research(
            &request(),
            &ParsedQuery::bare(QUERY),
            &RequestContext::new().with_cancel(flag),
        )
        .await
        .expect_err("cancelled");
    assert!(matches!(err, SearchError::Cancelled));
    assert!(retriever.requests().is_empty());
}
