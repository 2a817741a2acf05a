//! CLI entry point for `mailsift`.

use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use mailsift::config::{self, Config};
use mailsift::export::{eml, html};
use mailsift::fetch::{self, FetchReport};
use mailsift::model::message::ParsedMessage;
use mailsift::search::{self, KeywordFilter};
use mailsift::store::auth;
use mailsift::store::gmail::GmailStore;
use mailsift::store::MessageStore;

/// Fetch, filter and export Gmail messages.
#[derive(Parser)]
#[command(name = "mailsift", version, about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// List recent emails
    #[command(alias = "list")]
    ListEmails {
        /// Number of emails to fetch
        #[arg(short = 'n', long)]
        max_results: Option<u32>,
        /// Gmail search query
        #[arg(short, long, default_value = "")]
        query: String,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Filter emails by keywords and export them
    #[command(alias = "filter")]
    FilterEmails {
        /// Number of emails to fetch
        #[arg(short = 'n', long)]
        max_results: Option<u32>,
        /// Keyword to filter by (repeat for more; any match counts)
        #[arg(short, long = "keywords", required = true)]
        keywords: Vec<String>,
        /// Search the subject only
        #[arg(long, conflicts_with = "body_only")]
        subject_only: bool,
        /// Search the body only
        #[arg(long)]
        body_only: bool,
        /// Case-sensitive keyword matching
        #[arg(long)]
        case_sensitive: bool,
        /// Keep only senders matching this regular expression
        #[arg(long = "from", value_name = "REGEX")]
        sender: Option<String>,
        /// Keep only dates >= this (compared as text)
        #[arg(long, value_name = "DATE")]
        since: Option<String>,
        /// Keep only dates <= this (compared as text)
        #[arg(long, value_name = "DATE")]
        until: Option<String>,
        /// Output directory for EML files
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
        /// Also export to this HTML file
        #[arg(long, value_name = "FILE")]
        html: Option<PathBuf>,
        /// Also export to EML files
        #[arg(long)]
        eml: bool,
        /// Gmail search query (pre-filter)
        #[arg(short, long, default_value = "")]
        query: String,
    },
    /// Export emails to EML files
    ExportEml {
        /// Number of emails to fetch
        #[arg(short = 'n', long)]
        max_results: Option<u32>,
        /// Output directory
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
        /// Gmail search query
        #[arg(short, long, default_value = "")]
        query: String,
    },
    /// Export emails to a single HTML file
    ExportHtml {
        /// Number of emails to fetch
        #[arg(short = 'n', long)]
        max_results: Option<u32>,
        /// Output HTML file
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Gmail search query
        #[arg(short, long, default_value = "")]
        query: String,
        /// Newest first
        #[arg(long)]
        reverse: bool,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = config::load_config();

    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match cli.command {
        Commands::ListEmails {
            max_results,
            query,
            json,
        } => cmd_list(
            &config,
            max_results.unwrap_or(config.fetch.list_max_results),
            &query,
            json,
        ),
        Commands::FilterEmails {
            max_results,
            keywords,
            subject_only,
            body_only,
            case_sensitive,
            sender,
            since,
            until,
            output_dir,
            html,
            eml,
            query,
        } => {
            let selection = Selection {
                keywords,
                options: KeywordFilter::from_flags(subject_only, body_only, case_sensitive),
                sender,
                since,
                until,
            };
            let output_dir = output_dir.unwrap_or_else(|| config.export.output_dir.clone());
            cmd_filter(
                &config,
                max_results.unwrap_or(config.fetch.export_max_results),
                &query,
                &selection,
                eml.then_some(output_dir.as_path()),
                html.as_deref(),
            )
        }
        Commands::ExportEml {
            max_results,
            output_dir,
            query,
        } => cmd_export_eml(
            &config,
            max_results.unwrap_or(config.fetch.export_max_results),
            &query,
            &output_dir.unwrap_or_else(|| config.export.output_dir.clone()),
        ),
        Commands::ExportHtml {
            max_results,
            output,
            query,
            reverse,
        } => cmd_export_html(
            &config,
            max_results.unwrap_or(config.fetch.export_max_results),
            &query,
            &output.unwrap_or_else(|| config.export.html_file.clone()),
            reverse || config.export.newest_first,
        ),
        Commands::Completions { shell } => cmd_completions(shell),
        Commands::Manpage => cmd_manpage(),
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    let log_dir = config::cache_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "mailsift.log");
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "mailsift", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}

/// Resolve credentials and build the API client.
fn connect(config: &Config) -> anyhow::Result<GmailStore> {
    let token = auth::resolve_access_token(&config::token_file_path(config))?;
    Ok(GmailStore::with_base_url(
        &token,
        &config.api.base_url,
        config.api.timeout(),
    )?)
}

fn progress_bar(len: u64, verb: &str) -> anyhow::Result<ProgressBar> {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::default_bar()
            .template(&format!(
                "{{spinner:.green}} {verb} [{{bar:40.cyan/blue}}] {{pos}}/{{len}}"
            ))?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

/// Fetch messages with a progress bar and report partial failures.
///
/// Status output goes to stderr so stdout stays machine-readable.
fn fetch_with_progress(
    store: &dyn MessageStore,
    query: &str,
    max_results: u32,
) -> anyhow::Result<FetchReport> {
    eprintln!("  Fetching {max_results} emails...");
    let pb = progress_bar(u64::from(max_results), "Fetching")?;

    let report = fetch::fetch_messages(store, query, max_results, &|current, total| {
        pb.set_length(total as u64);
        pb.set_position(current as u64);
    })?;
    pb.finish_and_clear();

    if !report.failures.is_empty() {
        eprintln!(
            "  {} message(s) skipped, {} inline image(s) unresolved",
            report.skipped_messages(),
            report.failures.len() - report.skipped_messages()
        );
        for failure in &report.failures {
            match &failure.attachment_id {
                Some(att) => eprintln!("    {} / {}: {}", failure.message_id, att, failure.error),
                None => eprintln!("    {}: {}", failure.message_id, failure.error),
            }
        }
    }

    Ok(report)
}

/// List recent emails.
fn cmd_list(config: &Config, max_results: u32, query: &str, json: bool) -> anyhow::Result<()> {
    let store = connect(config)?;
    let report = fetch_with_progress(&store, query, max_results)?;

    if json {
        return print_messages_json(&report.messages);
    }

    if report.messages.is_empty() {
        println!("  No messages found.");
        return Ok(());
    }

    println!();
    println!("  Found {} emails:", report.messages.len());
    println!();
    print_messages(&report.messages, true);
    Ok(())
}

/// Message selection criteria of `filter-emails`.
struct Selection {
    keywords: Vec<String>,
    options: KeywordFilter,
    sender: Option<String>,
    since: Option<String>,
    until: Option<String>,
}

/// Filter emails and optionally export the matches.
fn cmd_filter(
    config: &Config,
    max_results: u32,
    query: &str,
    selection: &Selection,
    eml_dir: Option<&Path>,
    html_file: Option<&Path>,
) -> anyhow::Result<()> {
    let store = connect(config)?;
    let report = fetch_with_progress(&store, query, max_results)?;

    if report.messages.is_empty() {
        println!("  No messages found.");
        return Ok(());
    }

    println!("  Filtering by keywords: {}", selection.keywords.join(", "));
    let mut filtered =
        search::filter_by_keywords(&report.messages, &selection.keywords, selection.options);
    if let Some(pattern) = &selection.sender {
        filtered = search::filter_by_sender(&filtered, pattern)?;
    }
    if selection.since.is_some() || selection.until.is_some() {
        filtered = search::filter_by_date_range(
            &filtered,
            selection.since.as_deref(),
            selection.until.as_deref(),
        );
    }

    if filtered.is_empty() {
        println!("  No messages matched the filter criteria.");
        return Ok(());
    }

    println!();
    println!("  Found {} matching emails:", filtered.len());
    println!();
    print_messages(&filtered, false);

    if let Some(dir) = eml_dir {
        println!("  Exporting to EML files in '{}'...", dir.display());
        write_eml(&store, &filtered, dir)?;
    }

    if let Some(path) = html_file {
        println!("  Exporting to HTML file '{}'...", path.display());
        let options = html::HtmlOptions {
            sort_chronological: true,
            newest_first: config.export.newest_first,
        };
        html::export_html(&filtered, path, options)?;
        println!("  HTML export complete.");
    }

    Ok(())
}

/// Export emails to EML files.
fn cmd_export_eml(
    config: &Config,
    max_results: u32,
    query: &str,
    output_dir: &Path,
) -> anyhow::Result<()> {
    let store = connect(config)?;
    let report = fetch_with_progress(&store, query, max_results)?;

    if report.messages.is_empty() {
        println!("  No messages found.");
        return Ok(());
    }

    println!(
        "  Exporting {} emails to '{}'...",
        report.messages.len(),
        output_dir.display()
    );
    write_eml(&store, &report.messages, output_dir)
}

/// Export emails to a single HTML file.
fn cmd_export_html(
    config: &Config,
    max_results: u32,
    query: &str,
    output: &Path,
    newest_first: bool,
) -> anyhow::Result<()> {
    let store = connect(config)?;
    let report = fetch_with_progress(&store, query, max_results)?;

    if report.messages.is_empty() {
        println!("  No messages found.");
        return Ok(());
    }

    println!(
        "  Exporting {} emails to '{}'...",
        report.messages.len(),
        output.display()
    );
    let options = html::HtmlOptions {
        sort_chronological: true,
        newest_first,
    };
    let path = html::export_html(&report.messages, output, options)?;

    let size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
    println!(
        "  Export complete: {} ({})",
        path.display(),
        humansize::format_size(size, humansize::BINARY)
    );
    Ok(())
}

/// Write EML files with a progress bar and print a summary.
fn write_eml(store: &dyn MessageStore, messages: &[ParsedMessage], dir: &Path) -> anyhow::Result<()> {
    let pb = progress_bar(messages.len() as u64, "Exporting")?;
    let report = eml::export_multiple_eml(store, messages, dir, &|current, _total| {
        pb.set_position(current as u64);
    })?;
    pb.finish_and_clear();

    let total_bytes: u64 = report
        .written
        .iter()
        .filter_map(|p| std::fs::metadata(p).ok())
        .map(|m| m.len())
        .sum();
    println!(
        "  Exported {} emails to EML files ({})",
        report.written.len(),
        humansize::format_size(total_bytes, humansize::BINARY)
    );
    for (id, error) in &report.skipped {
        eprintln!("  Skipped {id}: {error}");
    }
    Ok(())
}

/// Print messages in the human-readable list format.
fn print_messages(messages: &[ParsedMessage], with_snippet: bool) {
    for (i, msg) in messages.iter().enumerate() {
        println!("  {}. Subject: {}", i + 1, msg.display_subject());
        println!("     From: {}", msg.from);
        println!("     Date: {}", msg.date);
        if with_snippet {
            let snippet: String = msg.snippet.chars().take(80).collect();
            println!("     Snippet: {snippet}...");
        }
        println!();
    }
}

/// Print messages as JSON (headers and snippet, bodies omitted).
fn print_messages_json(messages: &[ParsedMessage]) -> anyhow::Result<()> {
    let items: Vec<serde_json::Value> = messages
        .iter()
        .map(|m| {
            serde_json::json!({
                "id": m.id,
                "thread_id": m.thread_id,
                "subject": m.subject,
                "from": m.from,
                "to": m.to,
                "date": m.date,
                "message_id": m.message_id,
                "snippet": m.snippet,
                "inline_images": m.inline_images.len(),
            })
        })
        .collect();

    let output = serde_json::json!({
        "result_count": messages.len(),
        "results": items,
    });

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
