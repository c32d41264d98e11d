//! # PharmaGuard Report
//!
//! PDF export of an analysis.
//!
//! Export happens in two steps:
//! - [`layout`] turns an [`AnalysisResponse`] into positioned lines on A4 pages
//! - [`render_pdf`] draws those lines with the built-in Helvetica fonts
//!
//! The document holds a header block, one block per drug and a fixed disclaimer. Layout is
//! deterministic for a given analysis, so the text content can be checked without a PDF reader.

use pharmaguard_types::{AnalysisResponse, DrugOutcome};
use printpdf::{BuiltinFont, Mm, PdfDocument};

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("pdf backend error: {0}")]
    Pdf(String),
}

pub type ReportResult<T> = std::result::Result<T, ReportError>;

/// Footer printed after the last drug block.
pub const DISCLAIMER: &str = "This report is generated for clinical decision support only. \
Pharmacogenomic results must be interpreted by a qualified healthcare professional \
together with the patient's full clinical picture.";

pub const REPORT_TITLE: &str = "PharmaGuard Pharmacogenomic Report";

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 20.0;
const WRAP_COLUMNS: usize = 90;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextStyle {
    Title,
    Heading,
    Body,
    Small,
}

impl TextStyle {
    fn font_size(self) -> f32 {
        match self {
            TextStyle::Title => 18.0,
            TextStyle::Heading => 13.0,
            TextStyle::Body => 10.0,
            TextStyle::Small => 8.0,
        }
    }

    /// Vertical advance after a line in this style.
    fn line_height_mm(self) -> f32 {
        match self {
            TextStyle::Title => 10.0,
            TextStyle::Heading => 8.0,
            TextStyle::Body => 5.5,
            TextStyle::Small => 4.5,
        }
    }

    fn is_bold(self) -> bool {
        matches!(self, TextStyle::Title | TextStyle::Heading)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ReportLine {
    pub text: String,
    pub style: TextStyle,
    /// Baseline, measured from the bottom of the page.
    pub y_mm: f32,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReportPage {
    pub lines: Vec<ReportLine>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ReportDocument {
    pub title: String,
    pub pages: Vec<ReportPage>,
}

impl ReportDocument {
    /// Text content in reading order, one line per row.
    pub fn text(&self) -> String {
        self.pages
            .iter()
            .flat_map(|page| page.lines.iter())
            .map(|line| line.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Appends lines top to bottom and starts a new page when the bottom margin is reached.
struct PageWriter {
    pages: Vec<ReportPage>,
    cursor_mm: f32,
}

impl PageWriter {
    fn new() -> Self {
        Self {
            pages: vec![ReportPage::default()],
            cursor_mm: PAGE_HEIGHT_MM - MARGIN_MM,
        }
    }

    fn line(&mut self, style: TextStyle, text: &str) {
        for row in wrap(text, columns_for(style)) {
            if self.cursor_mm < MARGIN_MM {
                self.pages.push(ReportPage::default());
                self.cursor_mm = PAGE_HEIGHT_MM - MARGIN_MM;
            }
            if let Some(page) = self.pages.last_mut() {
                page.lines.push(ReportLine {
                    text: row,
                    style,
                    y_mm: self.cursor_mm,
                });
            }
            self.cursor_mm -= style.line_height_mm();
        }
    }

    fn gap(&mut self, mm: f32) {
        self.cursor_mm -= mm;
    }

    fn finish(self) -> Vec<ReportPage> {
        self.pages
    }
}

fn columns_for(style: TextStyle) -> usize {
    match style {
        TextStyle::Title => WRAP_COLUMNS / 2,
        TextStyle::Heading => WRAP_COLUMNS * 2 / 3,
        TextStyle::Body => WRAP_COLUMNS,
        TextStyle::Small => WRAP_COLUMNS * 5 / 4,
    }
}

/// Greedy word wrap. Words longer than `columns` get a row of their own.
fn wrap(text: &str, columns: usize) -> Vec<String> {
    let mut rows = Vec::new();
    let mut current = String::new();

    for word in text.split_whitespace() {
        let needed = if current.is_empty() {
            word.chars().count()
        } else {
            current.chars().count() + 1 + word.chars().count()
        };
        if needed > columns && !current.is_empty() {
            rows.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }

    if !current.is_empty() || rows.is_empty() {
        rows.push(current);
    }
    rows
}

/// Lay out the report for an analysis.
pub fn layout(analysis: &AnalysisResponse) -> ReportDocument {
    let mut writer = PageWriter::new();

    writer.line(TextStyle::Title, REPORT_TITLE);
    writer.gap(2.0);
    writer.line(TextStyle::Body, &format!("Patient ID: {}", analysis.patient_id));
    writer.line(TextStyle::Body, &format!("Analysis ID: {}", analysis.analysis_id));
    writer.line(TextStyle::Body, &format!("Generated: {}", analysis.timestamp));
    writer.line(
        TextStyle::Body,
        &format!("VCF hash: {}", analysis.vcf_hash.as_deref().unwrap_or("N/A")),
    );

    for outcome in &analysis.results {
        writer.gap(4.0);
        drug_block(&mut writer, outcome);
    }

    writer.gap(6.0);
    writer.line(TextStyle::Small, DISCLAIMER);

    ReportDocument {
        title: format!("{} {}", REPORT_TITLE, analysis.analysis_id),
        pages: writer.finish(),
    }
}

fn drug_block(writer: &mut PageWriter, outcome: &DrugOutcome) {
    let risk = outcome.risk_assessment();
    let recommendation = outcome.clinical_recommendation();

    writer.line(
        TextStyle::Heading,
        &format!("{}: {}", outcome.drug(), risk.risk_label),
    );
    writer.line(
        TextStyle::Body,
        &format!(
            "Severity: {} | Confidence: {}%",
            risk.severity,
            risk.confidence_percent()
        ),
    );
    writer.line(
        TextStyle::Body,
        &format!("Recommendation: {}", recommendation.action),
    );
    if let Some(dose) = &recommendation.dose_adjustment {
        writer.line(TextStyle::Body, &format!("Dose adjustment: {dose}"));
    }
    if !recommendation.alternative_drugs.is_empty() {
        writer.line(
            TextStyle::Body,
            &format!(
                "Alternatives: {}",
                recommendation.alternative_drugs.join(", ")
            ),
        );
    }

    match outcome.profile() {
        Some(profile) => {
            writer.line(
                TextStyle::Body,
                &format!(
                    "Gene: {} | Diplotype: {} | Phenotype: {}",
                    profile.gene, profile.diplotype, profile.phenotype
                ),
            );
            if !profile.detected_variants.is_empty() {
                writer.line(
                    TextStyle::Body,
                    &format!("Detected variants: {}", profile.detected_variants.join(", ")),
                );
            }
        }
        None => writer.line(
            TextStyle::Body,
            "No pharmacogenomic profile available for this drug.",
        ),
    }
}

/// Draw a laid-out document as PDF bytes.
pub fn render_pdf(document: &ReportDocument) -> ReportResult<Vec<u8>> {
    let (pdf, first_page, first_layer) = PdfDocument::new(
        document.title.as_str(),
        Mm(PAGE_WIDTH_MM),
        Mm(PAGE_HEIGHT_MM),
        "Layer 1",
    );
    let regular = pdf
        .add_builtin_font(BuiltinFont::Helvetica)
        .map_err(pdf_error)?;
    let bold = pdf
        .add_builtin_font(BuiltinFont::HelveticaBold)
        .map_err(pdf_error)?;

    for (index, page) in document.pages.iter().enumerate() {
        let layer = if index == 0 {
            pdf.get_page(first_page).get_layer(first_layer)
        } else {
            let (page_index, layer_index) = pdf.add_page(
                Mm(PAGE_WIDTH_MM),
                Mm(PAGE_HEIGHT_MM),
                format!("Layer {}", index + 1),
            );
            pdf.get_page(page_index).get_layer(layer_index)
        };

        for line in &page.lines {
            let font = if line.style.is_bold() { &bold } else { &regular };
            layer.use_text(
                line.text.as_str(),
                line.style.font_size(),
                Mm(MARGIN_MM),
                Mm(line.y_mm),
                font,
            );
        }
    }

    pdf.save_to_bytes().map_err(pdf_error)
}

/// Lay out and render the report for an analysis.
pub fn export_pdf(analysis: &AnalysisResponse) -> ReportResult<Vec<u8>> {
    let document = layout(analysis);
    tracing::info!(
        "exporting report for analysis {} ({} pages)",
        analysis.analysis_id,
        document.pages.len()
    );
    render_pdf(&document)
}

/// Download file name for an analysis report.
pub fn file_name(analysis_id: &str) -> String {
    format!("pharmaguard-report-{analysis_id}.pdf")
}

fn pdf_error(err: impl std::fmt::Display) -> ReportError {
    ReportError::Pdf(err.to_string())
}
