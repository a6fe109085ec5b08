use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use expertmatch_graph::{ExpertGraphBuilder, GraphSearchService};
use expertmatch_protocol::{QueryOptions, RetrievalRequest, SearchSource};
use expertmatch_search::{
    CompletionClient, DeepResearchService, ExpertMatchEngine, HybridRetrievalService,
    InMemoryProfileStore, KeywordIndex, KeywordSearchService, QueryParser, RetrievalConfig,
    SemanticReranker,
};
use expertmatch_vector_store::{HashingEmbedder, InMemoryVectorIndex, VectorSearchService};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

mod dataset;
mod llm_http;
mod report;

pub use dataset::Dataset;
pub use llm_http::{HttpCompletionClient, HttpCompletionClientBuilder};

fn print_stdout(text: &str) -> Result<()> {
    use std::io::Write;

    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

#[derive(Parser)]
#[command(name = "expertmatch")]
#[command(about = "Hybrid expert search with optional deep research", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors (stdout is reserved for JSON)
    #[arg(long, global = true)]
    quiet: bool,

    /// Retrieval configuration file (TOML)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Expert dataset (JSON)
    #[arg(long, global = true, default_value = "data/sample_experts.json")]
    dataset: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Find experts matching a free-text request
    Query(QueryArgs),

    /// Show how a request is understood
    Parse(ParseArgs),

    /// Show the shape of the dataset's relationship graph
    #[command(name = "graph-stats")]
    GraphStats(GraphStatsArgs),
}

#[derive(Args)]
struct QueryArgs {
    /// Free-text request
    query: String,

    /// Maximum number of results
    #[arg(long, short = 'n', default_value_t = 10)]
    max_results: usize,

    /// Drop candidates scoring below this value (0..=1)
    #[arg(long)]
    min_confidence: Option<f64>,

    /// Rerank fused candidates with the language model
    #[arg(long)]
    rerank: bool,

    /// Run gap analysis and query refinement after the first pass
    #[arg(long)]
    deep_research: bool,

    /// Comma-separated sources: vector,graph,keyword
    #[arg(long)]
    sources: Option<String>,

    /// Include the execution trace
    #[arg(long)]
    trace: bool,

    /// Output JSON format
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct ParseArgs {
    /// Free-text request
    query: String,

    /// Output JSON format
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct GraphStatsArgs {
    /// Output JSON format
    #[arg(long)]
    json: bool,
}

fn parse_sources(raw: &str) -> Result<Vec<SearchSource>> {
    let mut sources = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let source: SearchSource = part
            .parse()
            .with_context(|| format!("Invalid source '{part}'"))?;
        if !sources.contains(&source) {
            sources.push(source);
        }
    }
    if sources.is_empty() {
        bail!("--sources must name at least one of vector, graph, keyword");
    }
    Ok(sources)
}

fn load_config(path: Option<&Path>) -> Result<RetrievalConfig> {
    match path {
        Some(path) => RetrievalConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display())),
        None => Ok(RetrievalConfig::default()),
    }
}

/// Wires every backend over an in-memory dataset.
pub async fn build_engine(
    dataset: &Dataset,
    config: RetrievalConfig,
    client: Option<Arc<dyn CompletionClient>>,
) -> Result<ExpertMatchEngine> {
    let embedder = Arc::new(HashingEmbedder::default());
    let index = InMemoryVectorIndex::from_texts(embedder.as_ref(), dataset.vector_documents())
        .await
        .context("Failed to build vector index")?;
    let graph = ExpertGraphBuilder::build(&dataset.profiles).context("Failed to build graph")?;
    let keyword = KeywordIndex::from_profiles(&dataset.profiles);
    let profiles = Arc::new(InMemoryProfileStore::new(dataset.profiles.iter().cloned()));

    let reranker = SemanticReranker::new(client.clone())
        .with_profile_store(profiles.clone())
        .with_config(&config);
    let hybrid = Arc::new(
        HybridRetrievalService::new(config.clone())
            .with_vector(VectorSearchService::new(Arc::new(index)).with_embedder(embedder))
            .with_graph(GraphSearchService::new(Arc::new(graph)))
            .with_keyword(KeywordSearchService::new(Arc::new(keyword)))
            .with_reranker(reranker),
    );

    let mut engine = ExpertMatchEngine::new(hybrid.clone());
    if let Some(client) = client {
        engine = engine
            .with_deep_research(DeepResearchService::new(hybrid, profiles, client).with_config(config));
    }
    Ok(engine)
}

pub async fn main_entry() -> Result<()> {
    let mut cli = Cli::parse();

    let json_output = match &cli.command {
        Commands::Query(args) => args.json,
        Commands::Parse(args) => args.json,
        Commands::GraphStats(args) => args.json,
    };
    if json_output {
        cli.quiet = true;
    }

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    if !cli.verbose {
        builder.filter_module("reqwest", log::LevelFilter::Warn);
    }
    builder.target(env_logger::Target::Stderr).init();

    match cli.command {
        Commands::Query(args) => run_query(args, &cli.dataset, cli.config.as_deref()).await?,
        Commands::Parse(args) => run_parse(args)?,
        Commands::GraphStats(args) => run_graph_stats(args, &cli.dataset)?,
    }

    Ok(())
}

async fn run_query(args: QueryArgs, dataset_path: &Path, config_path: Option<&Path>) -> Result<()> {
    let config = load_config(config_path)?;
    let dataset = Dataset::load(dataset_path)?;
    let client: Option<Arc<dyn CompletionClient>> = match HttpCompletionClient::from_env()? {
        Some(client) => {
            log::info!("Using completion model {}", client.model_name());
            Some(Arc::new(client))
        }
        None => {
            if args.rerank || args.deep_research {
                log::warn!(
                    "{} is not set; reranking falls back to fused order and deep research is off",
                    llm_http::URL_ENV
                );
            }
            None
        }
    };

    let mut request = RetrievalRequest::new(args.query.clone()).with_options(QueryOptions {
        max_results: args.max_results,
        min_confidence: args.min_confidence,
        rerank: args.rerank,
        deep_research: args.deep_research,
        include_execution_trace: args.trace,
    });
    if let Some(raw) = &args.sources {
        request = request.with_sources(parse_sources(raw)?);
    }

    let engine = build_engine(&dataset, config, client).await?;
    let response = engine
        .process_query(&request)
        .await
        .with_context(|| format!("Query failed: {}", args.query))?;

    if args.json {
        print_stdout(&serde_json::to_string_pretty(&response)?)?;
    } else {
        print_stdout(&report::render_response(&response, &dataset))?;
    }
    Ok(())
}

fn run_parse(args: ParseArgs) -> Result<()> {
    let parsed = QueryParser::new().parse(&args.query);
    if args.json {
        print_stdout(&serde_json::to_string_pretty(&parsed)?)?;
    } else {
        print_stdout(&report::render_parsed(&parsed))?;
    }
    Ok(())
}

fn run_graph_stats(args: GraphStatsArgs, dataset_path: &Path) -> Result<()> {
    let dataset = Dataset::load(dataset_path)?;
    let stats = ExpertGraphBuilder::build(&dataset.profiles)
        .context("Failed to build graph")?
        .stats();
    if args.json {
        print_stdout(&serde_json::to_string_pretty(&stats)?)?;
    } else {
        print_stdout(&report::render_graph_stats(&stats))?;
    }
    Ok(())
}
