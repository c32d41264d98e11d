use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pharmaguard_core::constants::ACCEPTED_EXTENSIONS;
use pharmaguard_core::{
    AppContext, ClientConfig, ClientResult, Clipboard, RegenerateOutcome, ResultView, Route,
};

#[derive(Parser)]
#[command(name = "pharmaguard")]
#[command(about = "PharmaGuard pharmacogenomics analysis client")]
struct Cli {
    /// Analysis service base URL (overrides PHARMAGUARD_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the drugs the service supports
    Drugs,
    /// Upload a VCF file and analyse it for the given drugs
    Analyze {
        /// VCF file (.vcf, .vcf.gz or .vcf.bgz)
        file: PathBuf,
        /// Drug to assess; repeat for several drugs
        #[arg(long = "drug", short = 'd', default_value = "CODEINE")]
        drugs: Vec<String>,
        /// Also write the PDF report to this path
        #[arg(long)]
        pdf: Option<PathBuf>,
        /// Print the raw analysis JSON instead of the summary
        #[arg(long)]
        json: bool,
        /// Show variant lists and explanations
        #[arg(long)]
        expand: bool,
    },
    /// Show a stored analysis
    Results {
        analysis_id: String,
        /// Print the raw analysis JSON instead of the summary
        #[arg(long)]
        json: bool,
        /// Show variant lists and explanations
        #[arg(long)]
        expand: bool,
    },
    /// Regenerate the explanation for one drug of an analysis
    Regenerate { analysis_id: String, drug: String },
    /// Export the PDF report of an analysis
    Pdf {
        analysis_id: String,
        /// Output path (defaults to pharmaguard-report-<ID>.pdf)
        out: Option<PathBuf>,
    },
    /// Print the audit export link
    AuditUrl,
}

/// Writes copied text to standard output.
struct StdoutClipboard;

impl Clipboard for StdoutClipboard {
    fn write_text(&mut self, text: &str) -> ClientResult<()> {
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{text}")
            .map_err(|e| pharmaguard_core::ClientError::Clipboard(e.to_string()))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("pharmaguard=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = ClientConfig::from_env_values(
        cli.api_url
            .or_else(|| std::env::var("PHARMAGUARD_API_URL").ok()),
        std::env::var("PHARMAGUARD_ANALYZE_TIMEOUT_SECS").ok(),
    )?;
    tracing::debug!("using analysis service at {}", config.api_url());

    let ctx = AppContext::new(config);

    match cli.command {
        Commands::Drugs => {
            let mut view = ctx.submission_view();
            for drug in view.load_drug_options().await {
                println!("{drug}");
            }
        }
        Commands::Analyze {
            file,
            drugs,
            pdf,
            json,
            expand,
        } => {
            let analysis_id = analyze(&ctx, &file, &drugs).await?;
            let view = ctx.result_view(analysis_id);
            view.load().await;
            show(&view, json, expand)?;
            if let Some(out) = pdf {
                write_pdf(&view, &out)?;
            }
        }
        Commands::Results {
            analysis_id,
            json,
            expand,
        } => {
            let view = load(&ctx, &analysis_id).await?;
            show(&view, json, expand)?;
        }
        Commands::Regenerate { analysis_id, drug } => {
            let view = load(&ctx, &analysis_id).await?;
            let drug = drug.trim().to_uppercase();
            match view.regenerate(&drug).await {
                RegenerateOutcome::Updated => {
                    let explanation = view
                        .analysis()
                        .and_then(|a| a.result(&drug).and_then(|r| r.llm_explanation().cloned()));
                    match explanation {
                        Some(e) => {
                            println!("{}", e.summary);
                            println!();
                            println!("Mechanism: {}", e.mechanism);
                            println!("Source: {}", e.citation);
                        }
                        None => println!("{drug} has no explanation in analysis {analysis_id}"),
                    }
                }
                RegenerateOutcome::Failed(message) => {
                    anyhow::bail!("could not regenerate explanation for {drug}: {message}")
                }
                RegenerateOutcome::NoExplanationSlot => {
                    anyhow::bail!("{drug} has no pharmacogenomic result in analysis {analysis_id}")
                }
                RegenerateOutcome::AlreadyRunning | RegenerateOutcome::NotLoaded => {
                    anyhow::bail!("analysis {analysis_id} is not ready")
                }
            }
        }
        Commands::Pdf { analysis_id, out } => {
            let view = load(&ctx, &analysis_id).await?;
            let out = out.unwrap_or_else(|| PathBuf::from(view.pdf_file_name()));
            write_pdf(&view, &out)?;
        }
        Commands::AuditUrl => {
            println!("{}", ctx.config().audit_export_url()?);
        }
    }

    ctx.end_session();
    Ok(())
}

async fn analyze(ctx: &AppContext, file: &Path, drugs: &[String]) -> anyhow::Result<String> {
    let name = file.to_string_lossy().to_lowercase();
    if !ACCEPTED_EXTENSIONS.iter().any(|ext| name.ends_with(ext)) {
        tracing::warn!(
            "{} does not look like a VCF file (expected {})",
            file.display(),
            ACCEPTED_EXTENSIONS.join(", ")
        );
    }

    let mut view = ctx.submission_view();
    view.set_drugs(drugs)?;
    if let Err(e) = view.select_file_path(file) {
        tracing::debug!("file rejected: {}", e);
        anyhow::bail!(view.error().unwrap_or("could not read file").to_string());
    }

    match view.submit().await {
        Ok(Route::Result { analysis_id }) => Ok(analysis_id),
        Ok(Route::Submission) => anyhow::bail!("analysis did not produce a result"),
        Err(e) => {
            tracing::debug!("submission failed: {}", e);
            anyhow::bail!(view.error().unwrap_or("analysis failed").to_string())
        }
    }
}

async fn load(ctx: &AppContext, analysis_id: &str) -> anyhow::Result<ResultView> {
    let view = ctx.result_view(analysis_id);
    if view.load().await.is_none() {
        anyhow::bail!("Analysis not found: {analysis_id}");
    }
    Ok(view)
}

fn show(view: &ResultView, json: bool, expand: bool) -> anyhow::Result<()> {
    if json {
        view.copy_json(&mut StdoutClipboard)?;
        return Ok(());
    }

    if expand {
        if let Some(page) = view.page() {
            for card in page.cards.iter().filter(|c| c.genomic.is_some()) {
                view.toggle_variants(&card.drug);
                view.toggle_explanation(&card.drug);
            }
        }
    }

    let page = view
        .page()
        .with_context(|| format!("analysis {} is not loaded", view.analysis_id()))?;
    print!("{page}");
    Ok(())
}

fn write_pdf(view: &ResultView, out: &Path) -> anyhow::Result<()> {
    let bytes = view.download_pdf()?;
    std::fs::write(out, bytes).with_context(|| format!("writing {}", out.display()))?;
    println!("Report written to {}", out.display());
    Ok(())
}
