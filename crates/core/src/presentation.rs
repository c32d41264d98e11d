//! Result view presentation model.
//!
//! [`ResultPage`] is what the result view shows for an analysis: a summary banner coloured by
//! the first result, then one card per drug. Supported drugs get gene profile, recommendation
//! and explanation sections; unsupported drugs show only their risk badge.

use pharmaguard_types::{AnalysisResponse, DrugOutcome, RiskLabel, Severity};
use std::collections::HashSet;
use std::fmt;

/// Colour used for labels the client does not recognise.
pub const FALLBACK_COLOR: &str = "#6b7280";

pub fn risk_color(label: &RiskLabel) -> &'static str {
    match label {
        RiskLabel::Safe => "#16a34a",
        RiskLabel::AdjustDosage => "#d97706",
        RiskLabel::Toxic => "#dc2626",
        RiskLabel::Ineffective => "#7c3aed",
        RiskLabel::Unknown | RiskLabel::Other(_) => FALLBACK_COLOR,
    }
}

pub fn severity_icon(severity: &Severity) -> &'static str {
    match severity {
        Severity::None => "check-circle",
        Severity::Low => "info",
        Severity::Moderate => "alert-triangle",
        Severity::High => "alert-octagon",
        Severity::Critical => "x-octagon",
        Severity::Other(_) => "help-circle",
    }
}

/// Per-drug UI toggles kept by the result view.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ViewToggles {
    pub expanded_variants: HashSet<String>,
    pub expanded_explanations: HashSet<String>,
    pub regenerating: HashSet<String>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ResultPage {
    pub patient_id: String,
    pub analysis_id: String,
    pub timestamp: String,
    /// VCF hash, or `"N/A"` when the service sent none.
    pub vcf_hash: String,
    pub banner: Option<Banner>,
    pub cards: Vec<DrugCard>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Banner {
    pub label: String,
    pub confidence_percent: u8,
    pub color: &'static str,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RiskBadge {
    pub label: String,
    pub severity: String,
    pub color: &'static str,
    pub icon: &'static str,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DrugCard {
    pub drug: String,
    pub badge: RiskBadge,
    pub confidence_percent: u8,
    /// Present only for drugs with pharmacogenomic coverage.
    pub genomic: Option<GenomicSection>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct GenomicSection {
    pub gene: String,
    pub diplotype: String,
    pub phenotype: String,
    pub activity_score: Option<f64>,
    pub variant_count: usize,
    pub variants_expanded: bool,
    /// Variant ids; empty while the list is collapsed.
    pub visible_variants: Vec<String>,
    pub action: String,
    pub dose_adjustment: Option<String>,
    pub monitoring: Option<String>,
    pub alternative_drugs: Vec<String>,
    pub explanation: Option<ExplanationPanel>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExplanationPanel {
    pub summary: String,
    pub mechanism: String,
    pub citation: String,
    pub expanded: bool,
    /// `false` while a regeneration for this drug is in flight.
    pub regenerate_enabled: bool,
}

impl ResultPage {
    pub fn build(analysis: &AnalysisResponse, toggles: &ViewToggles) -> Self {
        let banner = analysis.first_result().map(|first| {
            let risk = first.risk_assessment();
            Banner {
                label: risk.risk_label.to_string(),
                confidence_percent: risk.confidence_percent(),
                color: risk_color(&risk.risk_label),
            }
        });

        Self {
            patient_id: analysis.patient_id.clone(),
            analysis_id: analysis.analysis_id.clone(),
            timestamp: analysis.timestamp.clone(),
            vcf_hash: analysis
                .vcf_hash
                .clone()
                .unwrap_or_else(|| "N/A".to_string()),
            banner,
            cards: analysis
                .results
                .iter()
                .map(|outcome| DrugCard::build(outcome, toggles))
                .collect(),
        }
    }

    pub fn card(&self, drug: &str) -> Option<&DrugCard> {
        self.cards.iter().find(|card| card.drug == drug)
    }
}

impl DrugCard {
    fn build(outcome: &DrugOutcome, toggles: &ViewToggles) -> Self {
        let risk = outcome.risk_assessment();
        let drug = outcome.drug();

        let genomic = match outcome {
            DrugOutcome::Genomic(result) => {
                let profile = &result.pharmacogenomic_profile;
                let recommendation = &result.clinical_recommendation;
                let variants_expanded = toggles.expanded_variants.contains(drug);

                Some(GenomicSection {
                    gene: profile.gene.clone(),
                    diplotype: profile.diplotype.clone(),
                    phenotype: profile.phenotype.clone(),
                    activity_score: profile.activity_score,
                    variant_count: profile.detected_variants.len(),
                    variants_expanded,
                    visible_variants: if variants_expanded {
                        profile.detected_variants.clone()
                    } else {
                        Vec::new()
                    },
                    action: recommendation.action.clone(),
                    dose_adjustment: recommendation.dose_adjustment.clone(),
                    monitoring: recommendation.monitoring.clone(),
                    alternative_drugs: recommendation.alternative_drugs.clone(),
                    explanation: result.llm_explanation.as_ref().map(|explanation| {
                        ExplanationPanel {
                            summary: explanation.summary.clone(),
                            mechanism: explanation.mechanism.clone(),
                            citation: explanation.citation.clone(),
                            expanded: toggles.expanded_explanations.contains(drug),
                            regenerate_enabled: !toggles.regenerating.contains(drug),
                        }
                    }),
                })
            }
            DrugOutcome::Unsupported(_) => None,
        };

        Self {
            drug: drug.to_string(),
            badge: RiskBadge {
                label: risk.risk_label.to_string(),
                severity: risk.severity.to_string(),
                color: risk_color(&risk.risk_label),
                icon: severity_icon(&risk.severity),
            },
            confidence_percent: risk.confidence_percent(),
            genomic,
        }
    }
}

impl fmt::Display for ResultPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Analysis {} (patient {})", self.analysis_id, self.patient_id)?;
        writeln!(f, "Generated: {}", self.timestamp)?;
        writeln!(f, "VCF hash:  {}", self.vcf_hash)?;
        if let Some(banner) = &self.banner {
            writeln!(
                f,
                "Overall:   {} ({}% confidence)",
                banner.label, banner.confidence_percent
            )?;
        }

        for card in &self.cards {
            writeln!(f)?;
            writeln!(
                f,
                "{} | {} [{}] | {}% confidence",
                card.drug, card.badge.label, card.badge.severity, card.confidence_percent
            )?;

            let Some(genomic) = &card.genomic else {
                writeln!(f, "  No pharmacogenomic profile for this drug.")?;
                continue;
            };

            writeln!(
                f,
                "  {} {} ({})",
                genomic.gene, genomic.diplotype, genomic.phenotype
            )?;
            if genomic.variants_expanded {
                writeln!(f, "  Variants: {}", genomic.visible_variants.join(", "))?;
            } else {
                writeln!(f, "  Variants: {} detected", genomic.variant_count)?;
            }
            writeln!(f, "  Action: {}", genomic.action)?;
            if let Some(dose) = &genomic.dose_adjustment {
                writeln!(f, "  Dose: {dose}")?;
            }
            if let Some(monitoring) = &genomic.monitoring {
                writeln!(f, "  Monitoring: {monitoring}")?;
            }
            if !genomic.alternative_drugs.is_empty() {
                writeln!(f, "  Alternatives: {}", genomic.alternative_drugs.join(", "))?;
            }
            if let Some(explanation) = genomic.explanation.as_ref().filter(|e| e.expanded) {
                writeln!(f, "  Summary: {}", explanation.summary)?;
                writeln!(f, "  Mechanism: {}", explanation.mechanism)?;
                writeln!(f, "  Source: {}", explanation.citation)?;
            }
        }

        Ok(())
    }
}
