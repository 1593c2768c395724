//! paperdown CLI - Markdown to paginated, print-ready HTML

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use clap::{Args, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use paperdown::export::DEFAULT_EXPORT_FILENAME;
use paperdown::render::RenderStats;
use paperdown::session::DEFAULT_DEBOUNCE;
use paperdown::{
    CommandEngine, Container, ContentRenderer, Debouncer, ExportAssembler, ExportOptions,
    ExportReport, ExportStyling, Margins, Orientation, PageEstimate, PagedDocumentBackend,
    PaginationEstimator, PaperSize, PreviewSession, PrintDocumentBackend, RenderSettings,
};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "paperdown")]
#[command(version)]
#[command(about = "Preview and export Markdown as paginated, print-ready HTML", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Render Markdown to an HTML fragment
    Render {
        /// Input Markdown file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Include automatic page-break markers
        #[arg(long)]
        markers: bool,

        #[command(flatten)]
        settings: SettingsArgs,
    },

    /// Estimate the page count
    Estimate {
        /// Input Markdown file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output the estimate as JSON
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        settings: SettingsArgs,
    },

    /// Export a print-ready document
    Export {
        /// Input Markdown file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Export backend
        #[arg(long, value_enum, default_value = "print")]
        backend: BackendKind,

        /// Use a scoped stylesheet instead of inline styles
        #[arg(long)]
        stylesheet: bool,

        /// Show diagram errors in the exported document
        #[arg(long)]
        diagram_errors: bool,

        /// Maximum wait for diagrams, in milliseconds
        #[arg(long, default_value = "5000", value_name = "MS")]
        diagram_timeout: u64,

        /// Maximum wait for layout, in milliseconds
        #[arg(long, default_value = "3000", value_name = "MS")]
        layout_timeout: u64,

        #[command(flatten)]
        settings: SettingsArgs,
    },

    /// Re-estimate whenever the file changes
    Watch {
        /// Input Markdown file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Quiet period before re-rendering, in milliseconds
        #[arg(long, default_value_t = DEFAULT_DEBOUNCE.as_millis() as u64, value_name = "MS")]
        debounce: u64,

        /// File polling interval, in milliseconds
        #[arg(long, default_value = "100", value_name = "MS")]
        poll: u64,

        #[command(flatten)]
        settings: SettingsArgs,
    },

    /// Show document information
    Info {
        /// Input Markdown file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        #[command(flatten)]
        settings: SettingsArgs,
    },

    /// Show version information
    Version,
}

#[derive(Args)]
struct SettingsArgs {
    /// Settings file (JSON)
    #[arg(long, value_name = "FILE", env = "PAPERDOWN_SETTINGS")]
    settings: Option<PathBuf>,

    /// Paper size
    #[arg(long, value_enum)]
    paper: Option<PaperArg>,

    /// Landscape orientation
    #[arg(long)]
    landscape: bool,

    /// Uniform page margin in millimetres
    #[arg(long, value_name = "MM")]
    margin: Option<f32>,

    /// Body font size in pixels
    #[arg(long, value_name = "PX")]
    font_size: Option<u32>,

    /// Render diagram fences as code
    #[arg(long)]
    no_diagrams: bool,

    /// Disable syntax highlighting
    #[arg(long)]
    no_highlight: bool,

    /// Disable smart punctuation
    #[arg(long)]
    no_typography: bool,

    /// Running header template ({title}, {date}, {pageNumber}, {totalPages})
    #[arg(long, value_name = "TEMPLATE")]
    header: Option<String>,

    /// Running footer template ({title}, {date}, {pageNumber}, {totalPages})
    #[arg(long, value_name = "TEMPLATE")]
    footer: Option<String>,

    /// Diagram engine command line
    #[arg(long, value_name = "CMD", env = "PAPERDOWN_DIAGRAM_COMMAND")]
    diagram_command: Option<String>,
}

impl SettingsArgs {
    fn load(&self) -> CliResult<RenderSettings> {
        let mut settings = match self.settings {
            Some(ref path) => RenderSettings::from_file(path)?,
            None => RenderSettings::default(),
        };

        if let Some(paper) = self.paper {
            settings = settings.with_paper(paper.into());
        }
        if self.landscape {
            settings = settings.with_orientation(Orientation::Landscape);
        }
        if let Some(mm) = self.margin {
            settings = settings.with_margins(Margins::uniform(mm));
        }
        if let Some(px) = self.font_size {
            settings = settings.with_font_size(px);
        }
        if self.no_diagrams {
            settings = settings.with_diagrams(false);
        }
        if self.no_highlight {
            settings = settings.with_highlighting(false);
        }
        if self.no_typography {
            settings = settings.with_typography(false);
        }
        if let Some(ref template) = self.header {
            settings = settings.with_header(template.as_str());
        }
        if let Some(ref template) = self.footer {
            settings = settings.with_footer(template.as_str());
        }

        settings.validate()?;
        Ok(settings)
    }

    fn engine(&self) -> CliResult<CommandEngine> {
        match self.diagram_command {
            Some(ref line) => CommandEngine::from_command_line(line)
                .ok_or_else(|| format!("Invalid diagram command: {:?}", line).into()),
            None => Ok(CommandEngine::new()),
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum PaperArg {
    A4,
    Letter,
    Legal,
    A3,
    A5,
}

impl From<PaperArg> for PaperSize {
    fn from(paper: PaperArg) -> Self {
        match paper {
            PaperArg::A4 => PaperSize::A4,
            PaperArg::Letter => PaperSize::Letter,
            PaperArg::Legal => PaperSize::Legal,
            PaperArg::A3 => PaperSize::A3,
            PaperArg::A5 => PaperSize::A5,
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum BackendKind {
    /// Print-styled HTML for a browser print dialog
    Print,
    /// Fixed-size page sections with page numbers
    Paged,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Render {
            input,
            output,
            markers,
            settings,
        }) => cmd_render(&input, output.as_deref(), markers, &settings),
        Some(Commands::Estimate {
            input,
            json,
            settings,
        }) => cmd_estimate(&input, json, &settings),
        Some(Commands::Export {
            input,
            output,
            backend,
            stylesheet,
            diagram_errors,
            diagram_timeout,
            layout_timeout,
            settings,
        }) => {
            let options = ExportOptions::new()
                .with_diagram_timeout(Duration::from_millis(diagram_timeout))
                .with_layout_timeout(Duration::from_millis(layout_timeout))
                .with_diagram_errors(diagram_errors)
                .with_styling(if stylesheet {
                    ExportStyling::Stylesheet
                } else {
                    ExportStyling::Inline
                });
            cmd_export(&input, output, backend, options, &settings)
        }
        Some(Commands::Watch {
            input,
            debounce,
            poll,
            settings,
        }) => cmd_watch(
            &input,
            Duration::from_millis(debounce),
            Duration::from_millis(poll.max(10)),
            &settings,
        ),
        Some(Commands::Info { input, settings }) => cmd_info(&input, &settings),
        Some(Commands::Version) => {
            cmd_version();
            Ok(())
        }
        None => {
            println!("{}", "Usage: paperdown <COMMAND> <FILE>".yellow());
            println!("       paperdown --help for more information");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn runtime() -> CliResult<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}

fn cmd_render(
    input: &Path,
    output: Option<&Path>,
    markers: bool,
    args: &SettingsArgs,
) -> CliResult<()> {
    let settings = args.load()?;
    let source = fs::read_to_string(input)?;

    let html = if markers {
        let engine = args.engine()?;
        let mut session = PreviewSession::new(settings)?;
        let frame = runtime()?.block_on(session.refresh(&source, &engine));
        frame.html
    } else {
        paperdown::render_html(&source, &settings)
    };

    if let Some(path) = output {
        fs::write(path, &html)?;
        println!("{} {}", "Saved to".green(), path.display());
    } else {
        println!("{}", html);
    }

    Ok(())
}

fn cmd_estimate(input: &Path, json: bool, args: &SettingsArgs) -> CliResult<()> {
    let settings = args.load()?;
    let source = fs::read_to_string(input)?;
    let engine = args.engine()?;

    let mut session = PreviewSession::new(settings)?;
    let frame = runtime()?.block_on(session.refresh(&source, &engine));
    let estimate = frame.estimate;

    if json {
        println!("{}", serde_json::to_string_pretty(&estimate)?);
        return Ok(());
    }

    println!(
        "{}: {}",
        "Pages".bold(),
        estimate.total_pages.to_string().cyan().bold()
    );
    println!(
        "{}: {:.0}px of {:.0}px per page",
        "Content".bold(),
        estimate.content_height_px,
        estimate.page_height_px
    );
    for (k, offset) in estimate.break_offsets.iter().enumerate() {
        println!("  {} break {} at {:.0}px", "├─".dimmed(), k + 1, offset);
    }
    if !frame.diagrams_ok {
        println!("{}", "Some diagrams failed to render".yellow());
    }

    Ok(())
}

fn cmd_export(
    input: &Path,
    output: Option<PathBuf>,
    backend: BackendKind,
    options: ExportOptions,
    args: &SettingsArgs,
) -> CliResult<()> {
    let settings = args.load()?;
    let source = fs::read_to_string(input)?;
    let engine = args.engine()?;
    let output = output.unwrap_or_else(|| PathBuf::from(DEFAULT_EXPORT_FILENAME));

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.enable_steady_tick(Duration::from_millis(80));
    pb.set_message("Exporting...");

    let assembler = ExportAssembler::with_options(options);
    let rt = runtime()?;
    let result: paperdown::Result<ExportReport> = rt.block_on(async {
        match backend {
            BackendKind::Print => {
                let backend = PrintDocumentBackend::new(&output);
                assembler.export(&source, &settings, &engine, &backend).await
            }
            BackendKind::Paged => {
                let backend = PagedDocumentBackend::new(&output);
                assembler.export(&source, &settings, &engine, &backend).await
            }
        }
    });

    let report = match result {
        Ok(report) => report,
        Err(e) => {
            pb.finish_and_clear();
            return Err(e.into());
        }
    };
    pb.finish_with_message("Done!");

    for warning in &report.warnings {
        println!("{} {}", "Warning:".yellow().bold(), warning);
    }
    if let Some(pages) = report.page_count {
        println!("{}: {}", "Pages".bold(), pages);
    }
    if let Some(ref path) = report.output {
        println!("{} {}", "Saved to".green(), path.display());
    }

    Ok(())
}

fn modified(path: &Path) -> Option<SystemTime> {
    fs::metadata(path).and_then(|m| m.modified()).ok()
}

fn cmd_watch(input: &Path, debounce: Duration, poll: Duration, args: &SettingsArgs) -> CliResult<()> {
    let settings = args.load()?;
    let engine = args.engine()?;
    let mut session = PreviewSession::new(settings)?;
    let debouncer = Debouncer::new(debounce);

    println!(
        "{} {} {}",
        "Watching".cyan().bold(),
        input.display(),
        "(Ctrl+C to stop)".dimmed()
    );

    runtime()?.block_on(async {
        let mut seen = None;
        let mut pending = Some(debouncer.schedule());

        loop {
            let stamp = modified(input);
            if stamp.is_none() && seen.is_some() {
                println!("{} {}", "Stopped:".yellow(), "file was removed");
                break;
            }
            if stamp != seen {
                seen = stamp;
                pending = Some(debouncer.schedule());
            }

            if let Some(ticket) = pending {
                if tokio::time::Instant::now() >= ticket.due() && debouncer.is_latest(ticket) {
                    pending = None;
                    match fs::read_to_string(input) {
                        Ok(source) => {
                            let frame = session.refresh(&source, &engine).await;
                            println!(
                                "{} {} page(s), {} word(s){}",
                                "Updated:".green(),
                                frame.estimate.total_pages,
                                frame.stats.word_count,
                                if frame.diagrams_ok {
                                    String::new()
                                } else {
                                    format!(", {}", "diagram errors".yellow())
                                }
                            );
                        }
                        Err(e) => eprintln!("{}: {}", "Error".red().bold(), e),
                    }
                }
            }

            tokio::time::sleep(poll).await;
        }
    });

    Ok(())
}

/// Title, statistics and page estimate from a single render.
struct DocumentSummary {
    title: String,
    stats: RenderStats,
    estimate: PageEstimate,
    failed: bool,
}

fn summarize(source: &str, settings: &RenderSettings) -> paperdown::Result<DocumentSummary> {
    settings.validate()?;
    let doc = ContentRenderer::new().render_document(source, settings);
    let title = doc.title_or("(none)").to_string();
    let stats = doc.stats.clone();
    let failed = doc.is_failed();
    let mut container = Container::from_document(doc, settings.font_size_px());
    let estimate = PaginationEstimator::new().estimate(&mut container, &settings.geometry);
    Ok(DocumentSummary {
        title,
        stats,
        estimate,
        failed,
    })
}

fn cmd_info(input: &Path, args: &SettingsArgs) -> CliResult<()> {
    let settings = args.load()?;
    let source = fs::read_to_string(input)?;
    let DocumentSummary {
        title,
        stats,
        estimate,
        failed,
    } = summarize(&source, &settings)?;
    if failed {
        eprintln!(
            "{} rendering failed; statistics are incomplete",
            "Warning:".yellow().bold()
        );
    }
    let geometry = &settings.geometry;

    println!("{}", "Document Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    println!("{}: {}", "File".bold(), input.display());
    println!("{}: {}", "Title".bold(), title);
    println!(
        "{}: {} {} ({:.1} x {:.1}mm content)",
        "Page".bold(),
        geometry.paper,
        geometry.orientation,
        geometry.content_width_mm(),
        geometry.content_height_mm()
    );
    println!("{}: {} (estimated)", "Pages".bold(), estimate.total_pages);

    println!();
    println!("{}", "Content Statistics".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    println!("{}: {}", "Words".bold(), stats.word_count);
    println!("{}: {}", "Characters".bold(), stats.char_count);
    println!("{}: {}", "Headings".bold(), stats.heading_count);
    println!("{}: {}", "Paragraphs".bold(), stats.paragraph_count);
    println!("{}: {}", "Lists".bold(), stats.list_count);
    println!("{}: {}", "Tables".bold(), stats.table_count);
    println!("{}: {}", "Code blocks".bold(), stats.code_block_count);
    println!("{}: {}", "Diagrams".bold(), stats.diagram_count);
    println!("{}: {}", "Page breaks".bold(), stats.page_break_count);

    Ok(())
}

fn cmd_version() {
    println!("{} {}", "paperdown".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("Markdown to paginated, print-ready HTML");
    println!();
    println!("License: MIT");
}
