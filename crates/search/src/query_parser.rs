use expertmatch_protocol::{ParsedQuery, QueryConstraints, QueryIntent};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use unicode_segmentation::UnicodeSegmentation;

/// Canonical name followed by the spellings that map to it.
type Vocabulary = &'static [(&'static str, &'static [&'static str])];

const TECHNOLOGIES: Vocabulary = &[
    ("Java", &["java"]),
    ("Spring Boot", &["spring boot", "springboot", "spring"]),
    ("Kotlin", &["kotlin"]),
    ("Scala", &["scala"]),
    ("Python", &["python"]),
    ("Django", &["django"]),
    ("FastAPI", &["fastapi"]),
    ("JavaScript", &["javascript", "js"]),
    ("TypeScript", &["typescript", "ts"]),
    ("React", &["react", "reactjs", "react.js"]),
    ("Angular", &["angular"]),
    ("Vue.js", &["vue", "vuejs", "vue.js"]),
    ("Node.js", &["node.js", "nodejs", "node"]),
    ("Go", &["golang"]),
    ("Rust", &["rust"]),
    ("C#", &["c#", "csharp"]),
    (".NET", &[".net", "dotnet"]),
    ("C++", &["c++", "cpp"]),
    ("Kafka", &["kafka", "apache kafka"]),
    ("RabbitMQ", &["rabbitmq"]),
    ("PostgreSQL", &["postgresql", "postgres"]),
    ("MySQL", &["mysql"]),
    ("MongoDB", &["mongodb", "mongo"]),
    ("Redis", &["redis"]),
    ("Elasticsearch", &["elasticsearch", "elastic search"]),
    ("Kubernetes", &["kubernetes", "k8s"]),
    ("Docker", &["docker"]),
    ("Terraform", &["terraform"]),
    ("AWS", &["aws", "amazon web services"]),
    ("Azure", &["azure"]),
    ("GCP", &["gcp", "google cloud"]),
    ("Spark", &["spark", "apache spark"]),
    ("Hadoop", &["hadoop"]),
    ("Airflow", &["airflow"]),
    ("GraphQL", &["graphql"]),
    ("gRPC", &["grpc"]),
    ("TensorFlow", &["tensorflow"]),
    ("PyTorch", &["pytorch"]),
];

const SKILLS: Vocabulary = &[
    ("Microservices", &["microservices", "microservice"]),
    ("Machine Learning", &["machine learning", "ml"]),
    ("Data Engineering", &["data engineering", "data pipelines", "etl"]),
    ("DevOps", &["devops", "ci/cd"]),
    ("System Architecture", &["system architecture", "system design", "solution architecture"]),
    ("Cloud Architecture", &["cloud architecture", "cloud native", "cloud-native"]),
    ("Frontend Development", &["frontend", "front-end"]),
    ("Backend Development", &["backend", "back-end"]),
    ("Security", &["security", "appsec"]),
    ("Test Automation", &["test automation", "qa automation"]),
    ("Mobile Development", &["mobile", "ios", "android"]),
    ("Event Streaming", &["event streaming", "event-driven", "streaming"]),
];

const SENIORITY: Vocabulary = &[
    ("Junior", &["junior", "jr"]),
    ("Middle", &["middle", "mid-level", "mid"]),
    ("Senior", &["senior", "sr"]),
    ("Lead", &["lead", "team lead", "tech lead"]),
    ("Principal", &["principal", "staff"]),
    ("Architect", &["architect", "architects"]),
];

const DOMAINS: Vocabulary = &[
    ("Banking", &["banking", "bank", "banks"]),
    ("Finance", &["finance", "fintech", "financial"]),
    ("Insurance", &["insurance", "insurtech"]),
    ("Healthcare", &["healthcare", "health care", "medical", "healthtech"]),
    ("Pharma", &["pharma", "pharmaceutical", "life sciences"]),
    ("Retail", &["retail"]),
    ("E-commerce", &["e-commerce", "ecommerce"]),
    ("Telecom", &["telecom", "telecommunications"]),
    ("Logistics", &["logistics", "supply chain"]),
    ("Automotive", &["automotive"]),
    ("Energy", &["energy", "oil and gas", "utilities"]),
    ("Education", &["education", "edtech"]),
    ("Media", &["media", "entertainment"]),
    ("Gaming", &["gaming", "games"]),
    ("Travel", &["travel", "hospitality"]),
    ("Manufacturing", &["manufacturing"]),
    ("Government", &["government", "public sector"]),
];

const LANGUAGES: &[&str] = &[
    "English", "German", "French", "Spanish", "Polish", "Ukrainian", "Russian", "Italian",
];

const STOP_WORDS: &[&str] = &[
    "a", "an", "and", "any", "are", "at", "be", "by", "can", "do", "experience", "expert",
    "experts", "find", "for", "from", "give", "good", "has", "have", "help", "i", "in", "is",
    "it", "know", "knowledge", "least", "list", "looking", "me", "need", "needs", "of", "on",
    "or", "our", "please", "show", "skilled", "skills", "someone", "strong", "the", "to", "us",
    "want", "we", "what", "which", "who", "with", "year", "years",
];

struct Matcher {
    canonical: &'static str,
    pattern: Regex,
}

/// Alias boundaries allow symbols such as `c#`, `.net` and `node.js`.
fn compile(vocabulary: Vocabulary) -> Vec<Matcher> {
    vocabulary
        .iter()
        .filter_map(|(canonical, aliases)| {
            let alternatives: Vec<String> = aliases.iter().map(|a| regex::escape(a)).collect();
            let pattern = format!(
                r"(?i)(?:^|[^\w+#.])(?:{})(?:$|[^\w+#])",
                alternatives.join("|")
            );
            match Regex::new(&pattern) {
                Ok(pattern) => Some(Matcher {
                    canonical,
                    pattern,
                }),
                Err(err) => {
                    log::warn!("Skipping vocabulary entry {canonical}: {err}");
                    None
                }
            }
        })
        .collect()
}

static TECHNOLOGY_MATCHERS: Lazy<Vec<Matcher>> = Lazy::new(|| compile(TECHNOLOGIES));
static SKILL_MATCHERS: Lazy<Vec<Matcher>> = Lazy::new(|| compile(SKILLS));
static SENIORITY_MATCHERS: Lazy<Vec<Matcher>> = Lazy::new(|| compile(SENIORITY));
static DOMAIN_MATCHERS: Lazy<Vec<Matcher>> = Lazy::new(|| compile(DOMAINS));

static TEAM_INTENT: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"(?i)\bteams?\b").ok());
static RFP_INTENT: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:rfps?|proposals?)\b").ok());
static DOMAIN_INTENT: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:domain|industry|sector)\b").ok());
/// "for Acme Bank", "for ACME": capitalised words after `for`.
static CUSTOMER: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"(?:^|\s)(?i:for)\s+((?:[A-Z][\w&.-]*)(?:\s+[A-Z][\w&.-]*)*)").ok()
});

fn matches(regex: &Lazy<Option<Regex>>, text: &str) -> bool {
    regex.as_ref().is_some_and(|r| r.is_match(text))
}

fn extract(matchers: &[Matcher], text: &str) -> Vec<String> {
    matchers
        .iter()
        .filter(|m| m.pattern.is_match(text))
        .map(|m| m.canonical.to_string())
        .collect()
}

/// Rule-based query understanding: intent, keywords, technologies, skills and
/// structured constraints.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryParser;

impl QueryParser {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    #[must_use]
    pub fn parse(&self, query: &str) -> ParsedQuery {
        let text = query.trim();
        let technologies = extract(&TECHNOLOGY_MATCHERS, text);
        let skills = extract(&SKILL_MATCHERS, text);

        let constraints = QueryConstraints {
            seniority_levels: extract(&SENIORITY_MATCHERS, text),
            domains: extract(&DOMAIN_MATCHERS, text),
            customers: Self::customers(text),
            language: Self::language(text),
        };

        let parsed = ParsedQuery {
            original_query: query.to_string(),
            keywords: Self::keywords(text),
            technologies,
            skills,
            intent: Self::classify_intent(text),
            constraints: (!constraints.is_empty()).then_some(constraints),
        };
        log::debug!(
            "Parsed query: intent={}, {} technologies, {} skills, {} keywords",
            parsed.intent,
            parsed.technologies.len(),
            parsed.skills.len(),
            parsed.keywords.len()
        );
        parsed
    }

    #[must_use]
    pub fn classify_intent(text: &str) -> QueryIntent {
        if matches(&TEAM_INTENT, text) {
            QueryIntent::TeamFormation
        } else if matches(&RFP_INTENT, text) {
            QueryIntent::RfpResponse
        } else if matches(&DOMAIN_INTENT, text) {
            QueryIntent::DomainInquiry
        } else {
            QueryIntent::ExpertSearch
        }
    }

    /// Lowercased words minus stop words, in query order, without duplicates.
    #[must_use]
    pub fn keywords(text: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        text.unicode_words()
            .map(str::to_lowercase)
            .filter(|w| w.chars().count() > 1 || w.chars().all(|c| c.is_alphabetic()))
            .filter(|w| !STOP_WORDS.contains(&w.as_str()))
            .filter(|w| seen.insert(w.clone()))
            .collect()
    }

    fn customers(text: &str) -> Vec<String> {
        let Some(regex) = CUSTOMER.as_ref() else {
            return Vec::new();
        };
        let mut out: Vec<String> = Vec::new();
        for capture in regex.captures_iter(text) {
            let Some(name) = capture.get(1).map(|m| m.as_str().trim_end_matches(['.', ','])) else {
                continue;
            };
            // "for Kafka", "for Senior" are not customers.
            let known_term = [&*TECHNOLOGY_MATCHERS, &*SKILL_MATCHERS, &*SENIORITY_MATCHERS]
                .iter()
                .any(|set| !extract(set, name).is_empty());
            if name.is_empty() || known_term {
                continue;
            }
            if !out.iter().any(|c| c.eq_ignore_ascii_case(name)) {
                out.push(name.to_string());
            }
        }
        out
    }

    fn language(text: &str) -> Option<String> {
        let words: Vec<String> = text.unicode_words().map(str::to_lowercase).collect();
        LANGUAGES
            .iter()
            .find(|lang| words.iter().any(|w| w == &lang.to_lowercase()))
            .map(|lang| (*lang).to_string())
    }
}
