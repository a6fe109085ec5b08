#![allow(dead_code)]

use async_trait::async_trait;
use expertmatch_protocol::{CandidateProfile, ParsedQuery, ProjectExperience, RetrievalRequest, RetrievalResult};
use expertmatch_search::{
    CompletionClient, CompletionResponse, RequestContext, Retriever, SearchError,
};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// Completion client answering from a fixed script, one reply per call.
#[derive(Default)]
pub struct ScriptedClient {
    replies: Mutex<VecDeque<Result<String, String>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reply(self, text: &str) -> Self {
        self.replies
            .lock()
            .expect("replies lock")
            .push_back(Ok(text.to_string()));
        self
    }

    pub fn fail(self, message: &str) -> Self {
        self.replies
            .lock()
            .expect("replies lock")
            .push_back(Err(message.to_string()));
        self
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().expect("prompts lock").len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("prompts lock").clone()
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    async fn complete(&self, prompt: &str) -> expertmatch_search::Result<CompletionResponse> {
        self.prompts
            .lock()
            .expect("prompts lock")
            .push(prompt.to_string());
        let next = self.replies.lock().expect("replies lock").pop_front();
        match next {
            Some(Ok(text)) => Ok(CompletionResponse::text_only(text)),
            Some(Err(message)) => Err(SearchError::Completion(message)),
            None => Err(SearchError::Completion("no scripted reply left".to_string())),
        }
    }
}

/// Retriever answering per query text and recording every request it sees.
#[derive(Default)]
pub struct RecordingRetriever {
    answers: HashMap<String, Result<RetrievalResult, String>>,
    requests: Mutex<Vec<RetrievalRequest>>,
}

impl RecordingRetriever {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn answer(mut self, query: &str, scored: &[(&str, f64)]) -> Self {
        let result = RetrievalResult::from_scored(scored.iter().map(|(id, s)| (*id, *s)));
        self.answers.insert(query.to_string(), Ok(result));
        self
    }

    pub fn fail(mut self, query: &str, message: &str) -> Self {
        self.answers
            .insert(query.to_string(), Err(message.to_string()));
        self
    }

    pub fn requests(&self) -> Vec<RetrievalRequest> {
        self.requests.lock().expect("requests lock").clone()
    }
}

#[async_trait]
impl Retriever for RecordingRetriever {
    async fn retrieve(
        &self,
        request: &RetrievalRequest,
        _parsed: &ParsedQuery,
        _ctx: &RequestContext,
    ) -> expertmatch_search::Result<RetrievalResult> {
        self.requests
            .lock()
            .expect("requests lock")
            .push(request.clone());
        match self.answers.get(&request.query) {
            Some(Ok(result)) => Ok(result.clone()),
            Some(Err(message)) => Err(SearchError::SourceUnavailable {
                backend: expertmatch_protocol::SearchSource::Vector,
                message: message.clone(),
            }),
            None => Ok(RetrievalResult::empty()),
        }
    }
}

pub fn ids(raw: &[&str]) -> Vec<String> {
    raw.iter().map(|s| s.to_string()).collect()
}

pub fn expert(id: &str, name: &str, seniority: &str, projects: Vec<ProjectExperience>) -> CandidateProfile {
    CandidateProfile {
        id: id.to_string(),
        name: name.to_string(),
        seniority: Some(seniority.to_string()),
        summary: None,
        skills: Vec::new(),
        projects,
    }
}

pub fn project(name: &str, customer: &str, domain: &str, technologies: &[&str]) -> ProjectExperience {
    ProjectExperience {
        project_name: name.to_string(),
        role: Some("Developer".to_string()),
        customer: Some(customer.to_string()),
        domain: Some(domain.to_string()),
        project_type: None,
        technologies: technologies.iter().map(|t| t.to_string()).collect(),
    }
}

pub fn sample_profiles() -> Vec<CandidateProfile> {
    vec![
        expert(
            "e1",
            "Alice Moreau",
            "Senior",
            vec![project("Payments Hub", "Acme Bank", "Finance", &["Java", "Spring Boot", "Kafka"])],
        ),
        expert(
            "e2",
            "Bogdan Ilyin",
            "Middle",
            vec![project("Claims Portal", "Globex Insurance", "Insurance", &["Java", "PostgreSQL"])],
        ),
        expert(
            "e3",
            "Chen Wei",
            "Lead",
            vec![project("Telemetry Stream", "Initech", "Telecom", &["Kafka", "Scala"])],
        ),
        expert(
            "e4",
            "Dana Okafor",
            "Junior",
            vec![project("Storefront", "Umbrella Retail", "Retail", &["React", "TypeScript"])],
        ),
    ]
}
