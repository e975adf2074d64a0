mod echo;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Instant;

use anyhow::{Context, bail};
use clap::Parser;
use ladle_core::profile::{EXCERPT, IMAGE, INGREDIENTS, STEPS, TITLE};
use ladle_core::{
    AttributeQuery, DEFAULT_CHUNK_SIZE, Extraction, Extractor, FetchConfig, Profile, ProfileLoader, ProfileParser,
    Recipe, normalize_url, open_file, open_url,
};
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Output format for extracted content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputFormat {
    Json,
    Text,
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "text" | "txt" => Ok(Self::Text),
            _ => Err(format!("Invalid format: {}. Valid options: json, text", s)),
        }
    }
}

/// Pull text blocks and recipe fields out of web pages
#[derive(Parser, Debug)]
#[command(name = "ladle")]
#[command(author = "Ladle Contributors")]
#[command(version)]
#[command(about = "Pull text blocks and recipe fields out of web pages", long_about = None)]
struct Args {
    /// URL to fetch, local HTML file, or "-" for stdin
    #[arg(value_name = "INPUT")]
    input: String,

    /// Comma-separated selectors to extract (e.g. "h1, li.step")
    #[arg(short, long, value_name = "SELECTORS")]
    selector: Option<String>,

    /// Print this attribute of the first element matching --selector
    #[arg(short, long, value_name = "NAME", requires = "selector")]
    attr: Option<String>,

    /// Separate adjacent text nodes with a space
    #[arg(long)]
    spaced: bool,

    /// Recipe profile file to use instead of the host lookup
    #[arg(short, long, value_name = "FILE", conflicts_with = "selector")]
    profile: Option<PathBuf>,

    /// Directory searched for <host>.txt profiles
    #[arg(long, value_name = "DIR")]
    profile_dir: Option<PathBuf>,

    /// Output format (json, text)
    #[arg(short, long, default_value = "json", value_name = "FORMAT")]
    format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long)]
    pretty: bool,

    /// Output file (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// HTTP timeout in seconds
    #[arg(long, default_value = "30", value_name = "SECS")]
    timeout: u64,

    /// Custom User-Agent for HTTP requests
    #[arg(long, value_name = "UA")]
    user_agent: Option<String>,

    /// Read buffer size for files and stdin
    #[arg(long, default_value_t = DEFAULT_CHUNK_SIZE, value_name = "BYTES")]
    chunk_size: usize,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

/// Where the document comes from
#[derive(Debug, Clone, PartialEq, Eq)]
enum Input {
    Url(String),
    File(String),
    Stdin,
}

impl Input {
    fn classify(raw: &str) -> Self {
        if raw == "-" {
            Self::Stdin
        } else if raw.starts_with("http://") || raw.starts_with("https://") {
            Self::Url(raw.to_string())
        } else if !Path::new(raw).exists() && looks_like_host(raw) {
            Self::Url(normalize_url(raw))
        } else {
            Self::File(raw.to_string())
        }
    }

    fn source(&self) -> &str {
        match self {
            Self::Url(value) | Self::File(value) => value,
            Self::Stdin => "-",
        }
    }
}

/// `www.example.com/recipes/soup` style input without a scheme.
fn looks_like_host(raw: &str) -> bool {
    let host = raw.split('/').next().unwrap_or_default();
    host.contains('.')
        && !host.starts_with('.')
        && !host.ends_with(".html")
        && !host.ends_with(".htm")
        && !raw.contains(char::is_whitespace)
}

/// What to pull out of the document
enum Query {
    Blocks(Extractor),
    Attribute(AttributeQuery),
    Recipe { extractor: Extractor, profile: String },
}

fn build_query(args: &Args, input: &Input) -> anyhow::Result<Query> {
    if let Some(selector) = &args.selector {
        if let Some(attr) = &args.attr {
            let query = AttributeQuery::new(selector, attr).context("Invalid selector")?;
            return Ok(Query::Attribute(query.chunk_size(args.chunk_size)));
        }

        let extractor = Extractor::new(selector).context("Invalid selector")?;
        return Ok(Query::Blocks(extractor.spaced(args.spaced).chunk_size(args.chunk_size)));
    }

    let profile = resolve_profile(args, input)?;
    let extractor = Extractor::from_profile(&profile)?.spaced(args.spaced).chunk_size(args.chunk_size);
    Ok(Query::Recipe { extractor, profile: profile.name().to_string() })
}

fn resolve_profile(args: &Args, input: &Input) -> anyhow::Result<Profile> {
    if let Some(path) = &args.profile {
        return ProfileParser::parse_file(path).with_context(|| format!("Failed to load profile: {}", path.display()));
    }

    let Input::Url(url) = input else {
        bail!("No selector given; pass --selector or --profile for local input");
    };

    let mut loader = match &args.profile_dir {
        Some(dir) => ProfileLoader::builder().custom_dir(dir).build(),
        None => ProfileLoader::default(),
    };

    loader
        .load_for_url(url)
        .context("Failed to resolve profile")?
        .with_context(|| format!("No profile for {}; pass --selector or --profile", url))
}

async fn extract(extractor: &Extractor, input: &Input, config: &FetchConfig) -> anyhow::Result<Extraction> {
    match input {
        Input::Url(url) => {
            let response = open_url(url, config).await.context("Failed to fetch URL")?;
            extractor.extract_response(response).await.context("Failed to read response body")
        }
        Input::File(path) => {
            let file = open_file(path).with_context(|| format!("Failed to read file: {}", path))?;
            extractor.extract_reader(file).with_context(|| format!("Failed to read file: {}", path))
        }
        Input::Stdin => extractor.extract_reader(io::stdin().lock()).context("Failed to read from stdin"),
    }
}

async fn lookup(query: &AttributeQuery, input: &Input, config: &FetchConfig) -> anyhow::Result<String> {
    match input {
        Input::Url(url) => {
            let response = open_url(url, config).await.context("Failed to fetch URL")?;
            query.extract_response(response).await.context("Failed to read response body")
        }
        Input::File(path) => {
            let file = open_file(path).with_context(|| format!("Failed to read file: {}", path))?;
            query.extract_reader(file).with_context(|| format!("Failed to read file: {}", path))
        }
        Input::Stdin => query.extract_reader(io::stdin().lock()).context("Failed to read from stdin"),
    }
}

fn to_json<T: Serialize + ?Sized>(value: &T, pretty: bool) -> anyhow::Result<String> {
    let json = if pretty { serde_json::to_string_pretty(value) } else { serde_json::to_string(value) };
    json.context("Failed to serialize output")
}

/// A single selector renders as a bare list of blocks, several as a keyed object.
fn render_blocks(extraction: &Extraction, format: OutputFormat, pretty: bool) -> anyhow::Result<String> {
    let single = if extraction.len() == 1 { extraction.iter().next() } else { None };

    match (format, single) {
        (OutputFormat::Json, Some((_, blocks))) => to_json(blocks, pretty),
        (OutputFormat::Json, None) => to_json(extraction, pretty),
        (OutputFormat::Text, Some((_, blocks))) => Ok(blocks.join("\n")),
        (OutputFormat::Text, None) => {
            let sections: Vec<String> = extraction
                .iter()
                .map(|(key, blocks)| {
                    let mut section = format!("[{}]", key);
                    for block in blocks {
                        section.push('\n');
                        section.push_str(block);
                    }
                    section
                })
                .collect();
            Ok(sections.join("\n\n"))
        }
    }
}

fn render_recipe(recipe: &Recipe, format: OutputFormat, pretty: bool) -> anyhow::Result<String> {
    match format {
        OutputFormat::Json => to_json(recipe, pretty),
        OutputFormat::Text => {
            let fields = [
                (TITLE, &recipe.title),
                (EXCERPT, &recipe.excerpt),
                (INGREDIENTS, &recipe.ingredients_raw),
                (STEPS, &recipe.steps_raw),
                (IMAGE, &recipe.image_url),
            ];
            let lines: Vec<String> = fields
                .iter()
                .filter_map(|(name, value)| value.as_ref().map(|value| format!("{}: {}", name, value)))
                .collect();
            Ok(lines.join("\n"))
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "ladle=debug,ladle_core=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt().with_env_filter(filter).with_writer(io::stderr).with_target(false).init();
}

fn describe_input(input: &Input) {
    match input {
        Input::Url(url) => echo::print_step(1, 3, &format!("Fetching from {}", url.bright_white().underline())),
        Input::File(path) => {
            echo::print_step(1, 3, &format!("Reading from file {}", path.bright_white()));
            if let Ok(metadata) = fs::metadata(path) {
                eprintln!("  {} {}", "Size:".dimmed(), echo::format_size(metadata.len()).bright_white());
            }
        }
        Input::Stdin => echo::print_step(1, 3, "Reading from stdin"),
    }
}

fn report_extraction(extraction: &Extraction) {
    echo::print_extraction_details(extraction);
    if extraction.block_count() == 0 {
        echo::print_warning("No text blocks matched");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    if args.verbose {
        echo::print_banner();
        echo::print_info("Debug logging enabled");
        eprintln!();
    }

    let input = Input::classify(&args.input);
    tracing::debug!(input = ?input, "classified input");
    let query = build_query(&args, &input)?;

    let mut config = FetchConfig { timeout: args.timeout, ..FetchConfig::default() };
    if let Some(user_agent) = &args.user_agent {
        config.user_agent = user_agent.clone();
    }

    if args.verbose {
        describe_input(&input);
        if let Query::Recipe { profile, .. } = &query {
            eprintln!("  {} {}", "Profile:".dimmed(), profile.bright_white());
        }
        eprintln!();
        echo::print_step(2, 3, "Extracting text blocks");
    }

    let started = Instant::now();

    let output = match &query {
        Query::Blocks(extractor) => {
            let extraction = extract(extractor, &input, &config).await?;
            if args.verbose {
                report_extraction(&extraction);
            }
            render_blocks(&extraction, args.format, args.pretty)?
        }
        Query::Recipe { extractor, .. } => {
            let extraction = extract(extractor, &input, &config).await?;
            if args.verbose {
                report_extraction(&extraction);
            }
            render_recipe(&Recipe::from_extraction(&extraction, input.source()), args.format, args.pretty)?
        }
        Query::Attribute(query) => {
            let value = lookup(query, &input, &config).await?;
            if args.verbose && value.is_empty() {
                echo::print_warning(&format!("No value for attribute {}", query.attribute()));
            }
            match args.format {
                OutputFormat::Json => to_json(&value, args.pretty)?,
                OutputFormat::Text => value,
            }
        }
    };

    if args.verbose {
        echo::print_timing("Extraction", started.elapsed());
        eprintln!();
        echo::print_step(3, 3, "Writing output");
        eprintln!("  {} {}", "Format:".dimmed(), format!("{:?}", args.format).bright_white());
        eprintln!();
    }

    match &args.output {
        Some(path) => {
            fs::write(path, format!("{}\n", output))
                .with_context(|| format!("Failed to write to file: {}", path.display()))?;
            echo::print_success(&format!("Output written to {}", path.display().bright_white()));
        }
        None => println!("{}", output),
    }

    Ok(())
}
