use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use garden::agent::{ExpansionType, GardenAgent, GardenAgentBuilder};
use garden::graph::{
    self, DEFAULT_NUM_PATHS, DEFAULT_RANDOMNESS, DEFAULT_SUBGRAPH_DISTANCE, Embedder, GardenGraph,
    OllamaEmbedder, SemanticAnalyzer,
};
use garden::import::{self, DEFAULT_CHUNK_SIZE, ImportOptions};
use garden::ollama::{OllamaClient, OllamaClientBuilder, OllamaClientTrait};
use garden::server::{self, AppState};
use garden::utils::{get_garden_path, parse_list};
use garden::{GardenConfig, GardenService, GardenStore};
use serde::Serialize;

/// garden - an LLM-assisted knowledge garden
#[derive(Parser)]
#[command(name = "garden")]
#[command(about = "Grow an interconnected knowledge garden of markdown notes")]
#[command(version)]
struct Cli {
    /// Garden directory (overrides GARDEN_DIR)
    #[arg(long, global = true, value_name = "DIR")]
    garden: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Add a note
    Add(AddCommand),
    /// Search notes by text and tags
    Search(SearchCommand),
    /// Print a note
    Show(ShowCommand),
    /// List tags, or the notes under one tag
    Tags(TagsCommand),
    /// Manage exploration paths
    #[command(subcommand)]
    Path(PathCommand),
    /// Analyze the knowledge graph (JSON output)
    #[command(subcommand)]
    Analyze(AnalyzeCommand),
    /// Ask the gardener a question; it may use tools to change the garden
    Ask(AskCommand),
    /// Generate a new note that expands an existing one
    Expand(ExpandCommand),
    /// Extract insights from text into new notes
    Insights(InsightsCommand),
    /// Grow the garden autonomously from a seed topic
    Explore(ExploreCommand),
    /// Import a markdown document as chunked notes
    Import(ImportCommand),
    /// Serve the JSON analysis API
    Serve(ServeCommand),
}

#[derive(Parser)]
struct AddCommand {
    /// Note title
    title: String,
    /// Note body
    content: String,
    /// Comma-separated tags
    #[arg(short, long, value_name = "TAGS")]
    tags: Option<String>,
    /// Comma-separated titles of related notes
    #[arg(short, long, value_name = "TITLES")]
    related: Option<String>,
}

#[derive(Parser)]
struct SearchCommand {
    /// Text to look for in titles and bodies
    query: String,
    /// Only notes carrying any of these comma-separated tags
    #[arg(short, long, value_name = "TAGS")]
    tags: Option<String>,
    #[arg(short, long, default_value_t = 5)]
    limit: usize,
}

#[derive(Parser)]
struct ShowCommand {
    title: String,
}

#[derive(Parser)]
struct TagsCommand {
    /// Show the notes under this tag
    tag: Option<String>,
}

#[derive(Subcommand)]
enum PathCommand {
    /// Create (or reset) an exploration path
    Create {
        topic: String,
        /// Comma-separated subtopics
        #[arg(short, long, value_name = "SUBTOPICS")]
        subtopics: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
    },
    /// Add a note to a path
    Add { topic: String, note: String },
    /// Print a path as JSON
    Show { topic: String },
}

#[derive(Subcommand)]
enum AnalyzeCommand {
    /// Summary report over every analysis
    Report,
    /// Size, density, connectivity, clustering
    Properties,
    /// Centrality measures for notes
    Centrality {
        /// Only print the top K notes by combined score
        #[arg(long, value_name = "K")]
        top: Option<usize>,
    },
    /// Louvain communities
    Communities,
    /// k-core decomposition
    Cores,
    /// Power-law fit of the degree distribution
    Degrees,
    /// Note pairs with similar embeddings
    Semantic {
        /// Minimum cosine similarity (defaults to GARDEN_SIMILARITY_THRESHOLD)
        #[arg(long)]
        threshold: Option<f32>,
    },
    /// Randomized shortest paths between two nodes
    Paths {
        source: String,
        target: String,
        #[arg(long, default_value_t = DEFAULT_NUM_PATHS)]
        num_paths: usize,
        #[arg(long, default_value_t = DEFAULT_RANDOMNESS)]
        randomness: f64,
    },
    /// Neighbourhood of a node
    Subgraph {
        node: String,
        #[arg(long, default_value_t = DEFAULT_SUBGRAPH_DISTANCE)]
        distance: usize,
    },
    /// Hubs, bridges and recent changes
    Summary {
        #[arg(long, default_value_t = 10)]
        recent: usize,
    },
}

#[derive(Parser)]
struct AskCommand {
    question: String,
    /// Number of relevant notes to send as context
    #[arg(long, default_value_t = 5)]
    context: usize,
    /// Send every note as context instead of the most relevant ones
    #[arg(long)]
    all_notes: bool,
}

#[derive(Parser)]
struct ExpandCommand {
    title: String,
    /// elaborate, contrast, question, application or connection
    #[arg(short = 'k', long = "kind", default_value = "elaborate")]
    kind: ExpansionType,
    #[arg(short, long, default_value_t = 1)]
    depth: usize,
}

#[derive(Parser)]
struct InsightsCommand {
    /// Text to analyze (omit when using --file)
    text: Option<String>,
    /// Read the text from a file
    #[arg(short, long, value_name = "PATH")]
    file: Option<PathBuf>,
    /// Title of the note the insights relate to
    #[arg(short, long)]
    parent: Option<String>,
    /// Comma-separated tags applied to every insight
    #[arg(short, long, value_name = "TAGS")]
    tags: Option<String>,
}

#[derive(Parser)]
struct ExploreCommand {
    topic: String,
    #[arg(short, long, default_value_t = 5)]
    iterations: usize,
}

#[derive(Parser)]
struct ImportCommand {
    file: PathBuf,
    /// Maximum chunk size in characters
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE)]
    chunk_size: usize,
    /// Comma-separated tags applied to every chunk
    #[arg(short, long, value_name = "TAGS")]
    tags: Option<String>,
    /// Extract insights from every chunk
    #[arg(long)]
    extract_insights: bool,
}

#[derive(Parser)]
struct ServeCommand {
    /// Port to listen on (defaults to GARDEN_PORT)
    #[arg(short, long)]
    port: Option<u16>,
}

fn main() {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = GardenConfig::from_env();

    let result = open_service(cli.garden.clone(), &config)
        .and_then(|service| run(cli.command, service, &config));

    if let Err(e) = result {
        let exit_code = if is_user_error(&e) { 1 } else { 2 };
        eprintln!("Error: {e:#}");
        std::process::exit(exit_code);
    }
}

/// Determines if an error is a user error (vs internal error).
///
/// User errors are validation failures such as an empty title or a missing
/// model name.
fn is_user_error(error: &anyhow::Error) -> bool {
    error.chain().any(|e| e.to_string().contains("cannot be empty"))
}

/// Opens the garden named by `--garden`, then `GARDEN_DIR`, then the
/// platform default.
fn open_service(flag: Option<PathBuf>, config: &GardenConfig) -> Result<GardenService> {
    let dir = match flag.or_else(|| config.garden_dir.clone()) {
        Some(dir) => dir,
        None => get_garden_path()?,
    };
    let store = GardenStore::open(&dir)
        .with_context(|| format!("Failed to open garden at {}", dir.display()))?;
    Ok(GardenService::new(store))
}

fn ollama_client() -> Result<OllamaClient> {
    OllamaClientBuilder::new()
        .build()
        .context("Failed to create Ollama client")
}

fn agent(service: GardenService, config: &GardenConfig) -> Result<GardenAgent> {
    let client = ollama_client()?;
    if client.model().trim().is_empty() {
        anyhow::bail!("OLLAMA_MODEL cannot be empty for LLM commands");
    }
    let model = client.model().to_string();
    Ok(GardenAgentBuilder::new()
        .service(service)
        .client(Arc::new(client))
        .model(model)
        .explore_pause(config.explore_pause)
        .build())
}

fn embedder(config: &GardenConfig) -> Result<Arc<dyn Embedder>> {
    let client: Arc<dyn OllamaClientTrait> = Arc::new(ollama_client()?);
    Ok(Arc::new(OllamaEmbedder::new(client, config.embed_model.clone())))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("Failed to encode output")?
    );
    Ok(())
}

fn as_strs(values: &[String]) -> Vec<&str> {
    values.iter().map(String::as_str).collect()
}

fn run(command: Commands, service: GardenService, config: &GardenConfig) -> Result<()> {
    match command {
        Commands::Add(cmd) => {
            let tags = cmd.tags.as_deref().map(parse_list).unwrap_or_default();
            let related = cmd.related.as_deref().map(parse_list).unwrap_or_default();
            println!(
                "{}",
                service.add_note(&cmd.title, &cmd.content, &as_strs(&tags), &as_strs(&related))?
            );
        }
        Commands::Search(cmd) => {
            let tags = cmd.tags.as_deref().map(parse_list).unwrap_or_default();
            let results = service.search_notes(&cmd.query, &as_strs(&tags), cmd.limit)?;
            if results.is_empty() {
                println!("No notes found.");
            }
            for result in results {
                println!("{}", result.title);
                if !result.tags.is_empty() {
                    println!("  tags: {}", result.tags.join(", "));
                }
                println!("  {}", result.preview.replace('\n', " "));
            }
        }
        Commands::Show(cmd) => match service.get_note_content(&cmd.title)? {
            Some(text) => print!("{text}"),
            None => println!("Note '{}' not found in the knowledge garden", cmd.title),
        },
        Commands::Tags(cmd) => match cmd.tag {
            Some(tag) => {
                for title in service.notes_with_tag(&tag)? {
                    println!("{title}");
                }
            }
            None => {
                for (tag, count) in service.list_tags()? {
                    println!("{tag} ({count})");
                }
            }
        },
        Commands::Path(cmd) => run_path(cmd, &service)?,
        Commands::Analyze(cmd) => run_analyze(cmd, &service, config)?,
        Commands::Ask(cmd) => {
            let agent = agent(service, config)?;
            let context = if cmd.all_notes {
                None
            } else {
                Some(agent.relevant_notes(&cmd.question, cmd.context)?)
            };
            let outcome = agent.process_query(&cmd.question, context.as_deref())?;
            for result in &outcome.tool_results {
                eprintln!("[tool] {result}");
            }
            println!("{}", outcome.answer);
        }
        Commands::Expand(cmd) => {
            let agent = agent(service, config)?;
            println!("{}", agent.expand_knowledge(&cmd.title, cmd.kind, cmd.depth)?);
        }
        Commands::Insights(cmd) => {
            let text = match (&cmd.text, &cmd.file) {
                (_, Some(path)) => std::fs::read_to_string(path)
                    .with_context(|| format!("Failed to read {}", path.display()))?,
                (Some(text), None) => text.clone(),
                (None, None) => anyhow::bail!("Insight text cannot be empty"),
            };
            let tags = cmd.tags.as_deref().map(parse_list).unwrap_or_default();
            let agent = agent(service, config)?;
            println!(
                "{}",
                agent.extract_insights(&text, cmd.parent.as_deref(), &as_strs(&tags))?
            );
        }
        Commands::Explore(cmd) => {
            let agent = agent(service, config)?;
            print_json(&agent.autonomous_exploration(&cmd.topic, cmd.iterations)?)?;
        }
        Commands::Import(cmd) => {
            let options = ImportOptions {
                chunk_size: cmd.chunk_size,
                tags: cmd.tags.as_deref().map(parse_list).unwrap_or_default(),
                ..ImportOptions::default()
            };
            let agent = if cmd.extract_insights {
                Some(agent(service.clone(), config)?)
            } else {
                None
            };
            let report = import::import_document(&service, agent.as_ref(), &cmd.file, &options)?;
            print_json(&report)?;
        }
        Commands::Serve(cmd) => {
            let embedder = embedder(config)?;
            let state = Arc::new(AppState::new(
                service,
                embedder.clone(),
                config.similarity_threshold,
            ));
            let addr = SocketAddr::from(([127, 0, 0, 1], cmd.port.unwrap_or(config.port)));

            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .context("Failed to start async runtime")?;
            runtime.block_on(server::serve(state, addr))?;
            // the blocking HTTP client must be dropped outside the runtime
            drop(runtime);
            drop(embedder);
        }
    }
    Ok(())
}

fn run_path(cmd: PathCommand, service: &GardenService) -> Result<()> {
    match cmd {
        PathCommand::Create {
            topic,
            subtopics,
            description,
        } => {
            let subtopics = subtopics.as_deref().map(parse_list).unwrap_or_default();
            println!(
                "{}",
                service.create_exploration_path(&topic, &as_strs(&subtopics), description.as_deref())?
            );
        }
        PathCommand::Add { topic, note } => println!("{}", service.add_note_to_path(&topic, &note)?),
        PathCommand::Show { topic } => match service.get_exploration_path(&topic)? {
            Some(path) => print_json(&path)?,
            None => println!("Path '{topic}' not found"),
        },
    }
    Ok(())
}

fn run_analyze(cmd: AnalyzeCommand, service: &GardenService, config: &GardenConfig) -> Result<()> {
    let graph = GardenGraph::from_index(&service.index()?);
    let mut rng = rand::thread_rng();

    match cmd {
        AnalyzeCommand::Report => print_json(&graph::generate_report(&graph, &mut rng)),
        AnalyzeCommand::Properties => print_json(&graph::graph_properties(&graph)),
        AnalyzeCommand::Centrality { top } => {
            let measures = graph::centrality_measures(&graph);
            match top {
                Some(k) => print_json(&measures.top(k)),
                None => print_json(&measures),
            }
        }
        AnalyzeCommand::Communities => print_json(&graph::detect_communities(&graph, &mut rng)),
        AnalyzeCommand::Cores => print_json(&graph::k_core_decomposition(&graph)),
        AnalyzeCommand::Degrees => {
            print_json(&graph::analyze_degree_distribution(&graph.degrees()))
        }
        AnalyzeCommand::Semantic { threshold } => {
            let mut analyzer = SemanticAnalyzer::new(embedder(config)?);
            let connections = analyzer.find_semantic_connections(
                &service.note_bodies()?,
                threshold.unwrap_or(config.similarity_threshold),
            )?;
            print_json(&connections)
        }
        AnalyzeCommand::Paths {
            source,
            target,
            num_paths,
            randomness,
        } => print_json(&graph::agentic_path_finding(
            &graph, &source, &target, num_paths, randomness, &mut rng,
        )),
        AnalyzeCommand::Subgraph { node, distance } => {
            print_json(&graph::extract_subgraph(&graph, &node, distance).unwrap_or_default())
        }
        AnalyzeCommand::Summary { recent } => print_json(&service.garden_summary(recent)?),
    }
}
