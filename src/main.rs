use std::fs;
use std::io::{self, BufReader, Write};
use std::path::PathBuf;

use clap::{Parser as _, ValueEnum};
use marklet::HtmlRenderer;
use marklet::parser::{self, BlockType, IncludeSourceSpans, ParserOptions};
use tracing_subscriber::EnvFilter;

#[derive(Clone, Copy, ValueEnum)]
enum SpanMode {
    None,
    Blocks,
    BlocksAndInlines,
}

impl From<SpanMode> for IncludeSourceSpans {
    fn from(mode: SpanMode) -> Self {
        match mode {
            SpanMode::None => IncludeSourceSpans::None,
            SpanMode::Blocks => IncludeSourceSpans::Blocks,
            SpanMode::BlocksAndInlines => IncludeSourceSpans::BlocksAndInlines,
        }
    }
}

#[derive(clap::Parser)]
#[command(name = "marklet")]
#[command(about = "Render markdown to HTML, or dump its document tree")]
struct Args {
    /// Markdown file to read; standard input if omitted
    file: Option<PathBuf>,

    /// Print the document tree as JSON instead of HTML
    #[arg(long)]
    ast: bool,

    /// Record source positions on the nodes (shown with --ast)
    #[arg(long, value_enum)]
    source_spans: Option<SpanMode>,

    /// Do not recognize fenced code blocks
    #[arg(long)]
    no_fenced_code: bool,

    /// JSON file with parser options; command line flags take precedence
    #[arg(long)]
    options: Option<PathBuf>,

    /// Drop link URLs with protocols other than http, https and mailto
    #[arg(long)]
    sanitize_urls: bool,
}

fn invalid(error: impl std::fmt::Display) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidInput, error.to_string())
}

fn main() -> io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let mut options = match &args.options {
        Some(path) => {
            serde_json::from_str::<ParserOptions>(&fs::read_to_string(path)?).map_err(invalid)?
        }
        None => ParserOptions::default(),
    };
    if let Some(mode) = args.source_spans {
        options.include_source_spans = mode.into();
    }
    if args.no_fenced_code {
        options.enabled_block_types.remove(&BlockType::FencedCodeBlock);
    }
    tracing::debug!(?options, "parser options");

    let parser = parser::Parser::builder().options(options).build().map_err(invalid)?;
    let tree = match &args.file {
        Some(path) => parser.parse_reader(BufReader::new(fs::File::open(path)?)),
        None => parser.parse_reader(io::stdin().lock()),
    }
    .map_err(|e| match e {
        marklet::Error::Io(e) => e,
        other => invalid(other),
    })?;

    let mut stdout = io::stdout().lock();
    if args.ast {
        serde_json::to_writer_pretty(&mut stdout, &tree.snapshot(tree.root())).map_err(invalid)?;
        writeln!(stdout)?;
    } else {
        let renderer = HtmlRenderer::builder().sanitize_urls(args.sanitize_urls).build();
        write!(stdout, "{}", renderer.render(&tree))?;
    }
    Ok(())
}
