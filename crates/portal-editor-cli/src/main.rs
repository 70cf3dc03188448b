use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result, WrapErr};
use portal_common::telemetry::{self, TelemetryConfig};
use portal_common::{EditorConfig, ImageDomainType, ImageServerType, UploadConfig};
use portal_editor_core::html::try_parse;
use portal_editor_core::{Editor, SerializerKind};
use portal_editor_media::{HttpImageStore, IngestOptions, IngestPipeline, SelectedFile};

#[derive(Parser)]
#[command(version, about = "Portal editor - normalize editor HTML and ingest images", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the normalized form of an HTML fragment
    Normalize {
        /// Input file, `-` for stdin
        input: PathBuf,

        /// Serializer strategy
        #[arg(long, default_value = "tree", value_parser = parse_strategy)]
        strategy: SerializerKind,

        /// Reject malformed markup instead of falling back to plain text
        #[arg(long)]
        strict: bool,

        /// Fail if the input is not already normalized
        #[arg(long)]
        check: bool,
    },
    /// Upload images and insert them at the end of a document
    Ingest {
        /// TOML file with an `[upload]` table
        #[arg(long, env = "PORTAL_UPLOAD_CONFIG")]
        config: PathBuf,

        /// Domain tag sent with every image
        #[arg(long, default_value = "COMMON", value_parser = parse_domain)]
        domain: ImageDomainType,

        /// Server partition to upload to
        #[arg(long, default_value = "USER", value_parser = parse_server)]
        server: ImageServerType,

        /// Existing document to insert into
        #[arg(long)]
        html: Option<PathBuf>,

        /// Image files, inserted in the order their uploads finish
        #[arg(required = true)]
        images: Vec<PathBuf>,
    },
}

fn parse_strategy(s: &str) -> std::result::Result<SerializerKind, String> {
    SerializerKind::parse(s).ok_or_else(|| format!("unknown strategy `{s}` (tree, regex)"))
}

fn parse_domain(s: &str) -> std::result::Result<ImageDomainType, String> {
    ImageDomainType::parse(s).ok_or_else(|| {
        let known: Vec<_> = ImageDomainType::ALL.iter().map(|d| d.as_str()).collect();
        format!("unknown domain `{s}` ({})", known.join(", "))
    })
}

fn parse_server(s: &str) -> std::result::Result<ImageServerType, String> {
    ImageServerType::parse(s).ok_or_else(|| format!("unknown server `{s}` (ADMIN, USER)"))
}

#[tokio::main]
async fn main() -> Result<()> {
    init_miette();
    telemetry::init_tracing(TelemetryConfig::from_env("portal-editor"));

    let cli = Cli::parse();

    match cli.command {
        Commands::Normalize {
            input,
            strategy,
            strict,
            check,
        } => normalize(&input, strategy, strict, check)?,
        Commands::Ingest {
            config,
            domain,
            server,
            html,
            images,
        } => ingest(&config, domain, server, html.as_deref(), images).await?,
    }

    Ok(())
}

fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .into_diagnostic()
            .wrap_err("reading stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("reading {}", path.display()))
}

fn normalize(input: &Path, strategy: SerializerKind, strict: bool, check: bool) -> Result<()> {
    let html = read_input(input)?;
    let serializer = strategy.build();
    let normalized = if strict {
        serializer.serialize(&try_parse(&html).into_diagnostic()?)
    } else {
        serializer.normalize(&html)
    };

    if check && normalized != html.trim_end_matches('\n') {
        return Err(miette::miette!(
            help = "run without --check to print the normalized form",
            "{} is not normalized",
            input.display()
        ));
    }
    println!("{normalized}");
    Ok(())
}

async fn ingest(
    config_path: &Path,
    domain: ImageDomainType,
    server: ImageServerType,
    html: Option<&Path>,
    images: Vec<PathBuf>,
) -> Result<()> {
    let upload = UploadConfig::load(config_path)?;
    let initial = match html {
        Some(path) => read_input(path)?,
        None => String::new(),
    };

    let mut files = Vec::with_capacity(images.len());
    for path in &images {
        let data = std::fs::read(path)
            .into_diagnostic()
            .wrap_err_with(|| format!("reading {}", path.display()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        files.push(SelectedFile::new(name, None, data));
    }

    let editor_config = EditorConfig {
        image_domain_type: domain,
        image_server_type: server,
        ..Default::default()
    };
    let options = IngestOptions::new(&editor_config, &upload);
    let store = HttpImageStore::new(&upload).into_diagnostic()?;
    tracing::info!(endpoint = store.endpoint(), %domain, %server, "uploading");

    let mut editor = Editor::new(editor_config, &initial, |_| {})
        .with_settle_window(upload.settle_window());
    let at = editor.document().end();
    let report = IngestPipeline::new(store, options)
        .start(files, at)
        .apply_all(&mut editor)
        .await;

    for message in report.user_messages() {
        eprintln!("{message}");
    }
    println!("{}", editor.html());

    if report.inserted.is_empty() && !report.errors.is_empty() {
        return Err(miette::miette!("no image was uploaded"));
    }
    Ok(())
}

fn init_miette() {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .with_cause_chain()
                .color(true)
                .context_lines(5)
                .tab_width(2)
                .break_words(true)
                .build(),
        )
    }))
    .expect("couldn't set the miette hook");
    miette::set_panic_hook();
}
