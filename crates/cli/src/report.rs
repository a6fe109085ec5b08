use crate::dataset::Dataset;
use expertmatch_graph::GraphStats;
use expertmatch_protocol::ParsedQuery;
use expertmatch_search::QueryResponse;
use std::fmt::Write as _;

fn list(items: &[String]) -> String {
    if items.is_empty() {
        "-".to_string()
    } else {
        items.join(", ")
    }
}

pub fn render_parsed(parsed: &ParsedQuery) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Query:        {}", parsed.original_query);
    let _ = writeln!(out, "Intent:       {}", parsed.intent.as_str());
    let _ = writeln!(out, "Technologies: {}", list(&parsed.technologies));
    let _ = writeln!(out, "Skills:       {}", list(&parsed.skills));
    let _ = writeln!(out, "Keywords:     {}", list(&parsed.keywords));
    if let Some(constraints) = &parsed.constraints {
        let _ = writeln!(out, "Seniority:    {}", list(&constraints.seniority_levels));
        let _ = writeln!(out, "Domains:      {}", list(&constraints.domains));
        let _ = writeln!(out, "Customers:    {}", list(&constraints.customers));
        if let Some(language) = &constraints.language {
            let _ = writeln!(out, "Language:     {language}");
        }
    }
    out.trim_end().to_string()
}

pub fn render_response(response: &QueryResponse, dataset: &Dataset) -> String {
    let mut out = render_parsed(&response.parsed);
    let result = &response.result;
    let _ = write!(
        out,
        "\n\n{} expert(s){}\n",
        result.len(),
        if response.deep_research {
            " after deep research"
        } else {
            ""
        }
    );
    for (rank, (id, score)) in result.iter().enumerate() {
        let (name, seniority) = dataset
            .find(id)
            .map(|p| (p.name.as_str(), p.seniority.as_deref().unwrap_or("")))
            .unwrap_or(("<unknown>", ""));
        let _ = write!(out, "\n{:>3}. {id:<10} {name}", rank + 1);
        if !seniority.is_empty() {
            let _ = write!(out, " ({seniority})");
        }
        let _ = write!(out, "  score {score:.3}");
    }
    if result.is_degraded() {
        let sources: Vec<&str> = result.degraded_sources.iter().map(|s| s.as_str()).collect();
        let _ = write!(out, "\n\nDegraded sources: {}", sources.join(", "));
    }
    if !response.trace.is_empty() {
        let _ = write!(out, "\n\nTrace:");
        for step in &response.trace {
            let _ = write!(
                out,
                "\n  {:<22} {:<10} {:>5}ms",
                step.name,
                format!("{:?}", step.status).to_lowercase(),
                step.duration_ms
            );
        }
    }
    out
}

pub fn render_graph_stats(stats: &GraphStats) -> String {
    format!(
        "Experts:      {}\nProjects:     {}\nCustomers:    {}\nTechnologies: {}\nEdges:        {}",
        stats.experts, stats.projects, stats.customers, stats.technologies, stats.edges
    )
}
