//! Read-only views over an assessment snapshot.
//!
//! All optional-field defaulting for display happens once, in
//! [`ResultsPage::from_assessment`], when a snapshot enters the store. Every surface
//! afterwards reads the already-defaulted page and never touches the store.

use crate::models::{
    AssessmentSnapshot, Dietary, Dosha, DoshaResult, DownloadState, Lifestyle,
    PanchakarmaRecommendation, Therapy,
};
use serde::Serialize;
use std::fmt;

pub const NO_FAVOR_MESSAGE: &str = "No specific dietary recommendations";
pub const NO_AVOID_MESSAGE: &str = "No specific restrictions";
pub const DEFAULT_ROUTINE: &str = "Follow a balanced daily routine";
pub const DEFAULT_YOGA: &str = "Gentle yoga appropriate for your dosha";
pub const DEFAULT_PRANAYAMA: &str = "Deep breathing exercises";
pub const DEFAULT_THERAPY_NAME: &str = "Panchakarma Therapy";

pub const RESULTS_TITLE: &str = "Your Ayurvedic Assessment Results";
pub const RESULTS_SUBTITLE: &str = "Based on your responses, here are your personalized Dosha analysis and Panchakarma recommendations";

/// What the downloadable report covers, shown next to the download control.
pub const REPORT_CONTENTS: [&str; 6] = [
    "Complete Dosha analysis with percentages",
    "Detailed Panchakarma therapy recommendations",
    "Personalized dietary guidelines (Ahara)",
    "Lifestyle modifications (Vihara)",
    "Yoga and Pranayama suggestions",
    "Important precautions and disclaimers",
];

pub const DOWNLOAD_LABEL: &str = "Download PDF Report";
pub const DOWNLOAD_BUSY_LABEL: &str = "Generating PDF...";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DoshaShare {
    pub dosha: Dosha,
    pub share: f64,
    /// Share of the total, 0–100, rounded to two decimals.
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DoshaSummary {
    pub shares: Vec<DoshaShare>,
    pub dominant: Dosha,
    pub secondary: Option<Dosha>,
}

impl DoshaSummary {
    /// Returns `None` for an empty result; the store never admits one.
    pub fn from_result(result: &DoshaResult) -> Option<Self> {
        let total = result.total();
        let ranked = result.ranked();
        let dominant = ranked.first()?.0;
        let secondary = ranked.get(1).map(|(d, _)| *d);

        let shares = result
            .shares
            .iter()
            .map(|(dosha, share)| DoshaShare {
                dosha: *dosha,
                share: *share,
                percent: if total > 0.0 {
                    (share / total * 10_000.0).round() / 100.0
                } else {
                    0.0
                },
            })
            .collect();

        Some(Self {
            shares,
            dominant,
            secondary,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TherapyCard {
    pub name: String,
    pub description: Option<String>,
    pub indication: Option<String>,
    pub duration: Option<String>,
    pub benefits: Option<String>,
    pub precautions: Option<String>,
}

impl From<&Therapy> for TherapyCard {
    fn from(therapy: &Therapy) -> Self {
        Self {
            name: match therapy.name.trim() {
                "" => DEFAULT_THERAPY_NAME.to_string(),
                name => name.to_string(),
            },
            description: therapy.description.clone(),
            indication: therapy.indication.clone(),
            duration: therapy.duration.clone(),
            benefits: therapy.benefits.clone(),
            precautions: therapy.precautions.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DietaryPanel {
    pub favor: Vec<String>,
    pub avoid: Vec<String>,
}

fn list_or_default(items: Option<&Vec<String>>, default: &str) -> Vec<String> {
    let items: Vec<String> = items
        .into_iter()
        .flatten()
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect();
    if items.is_empty() {
        vec![default.to_string()]
    } else {
        items
    }
}

impl DietaryPanel {
    fn from_dietary(dietary: Option<&Dietary>) -> Self {
        Self {
            favor: list_or_default(dietary.and_then(|d| d.favor.as_ref()), NO_FAVOR_MESSAGE),
            avoid: list_or_default(dietary.and_then(|d| d.avoid.as_ref()), NO_AVOID_MESSAGE),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LifestylePanel {
    pub routine: String,
    pub yoga: String,
    pub pranayama: String,
}

fn text_or_default(value: Option<&String>, default: &str) -> String {
    value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .unwrap_or(default)
        .to_string()
}

impl LifestylePanel {
    fn from_lifestyle(lifestyle: Option<&Lifestyle>) -> Self {
        Self {
            routine: text_or_default(lifestyle.and_then(|l| l.routine.as_ref()), DEFAULT_ROUTINE),
            yoga: text_or_default(lifestyle.and_then(|l| l.yoga.as_ref()), DEFAULT_YOGA),
            pranayama: text_or_default(
                lifestyle.and_then(|l| l.pranayama.as_ref()),
                DEFAULT_PRANAYAMA,
            ),
        }
    }
}

/// Everything derived from the recommendation payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecommendationPanels {
    pub therapies: Vec<TherapyCard>,
    pub dietary: DietaryPanel,
    pub lifestyle: LifestylePanel,
}

impl From<&PanchakarmaRecommendation> for RecommendationPanels {
    fn from(recs: &PanchakarmaRecommendation) -> Self {
        Self {
            therapies: recs.therapy_details.iter().map(TherapyCard::from).collect(),
            dietary: DietaryPanel::from_dietary(recs.dietary.as_ref()),
            lifestyle: LifestylePanel::from_lifestyle(recs.lifestyle.as_ref()),
        }
    }
}

/// The fully-defaulted Results surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultsPage {
    pub greeting_name: String,
    pub dosha: DoshaSummary,
    /// Absent when the producer sent no recommendation at all; the therapy, dietary
    /// and lifestyle sections are then not shown.
    pub recommendations: Option<RecommendationPanels>,
}

impl ResultsPage {
    /// Normalizes a snapshot into its display shape. `None` when there is no
    /// DoshaResult to show.
    pub fn from_assessment(assessment: &AssessmentSnapshot, greeting_name: &str) -> Option<Self> {
        let dosha = DoshaSummary::from_result(assessment.dosha_results.as_ref()?)?;
        Some(Self {
            greeting_name: greeting_name.to_string(),
            dosha,
            recommendations: assessment
                .panchakarma_recs
                .as_ref()
                .map(RecommendationPanels::from),
        })
    }

    pub fn therapy_cards(&self) -> &[TherapyCard] {
        self.recommendations
            .as_ref()
            .map(|r| r.therapies.as_slice())
            .unwrap_or(&[])
    }
}

impl fmt::Display for ResultsPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", RESULTS_TITLE)?;
        writeln!(f, "{}", RESULTS_SUBTITLE)?;
        writeln!(f)?;
        writeln!(f, "Your Dosha Analysis ({})", self.greeting_name)?;
        for share in &self.dosha.shares {
            writeln!(f, "  {:<6} {:>6.2}%", share.dosha.to_string(), share.percent)?;
        }
        writeln!(f, "  Dominant Dosha: {}", self.dosha.dominant)?;
        if let Some(secondary) = self.dosha.secondary {
            writeln!(f, "  Secondary Dosha: {}", secondary)?;
        }

        let Some(recs) = &self.recommendations else {
            return Ok(());
        };

        writeln!(f)?;
        writeln!(f, "Recommended Panchakarma Therapies")?;
        for card in &recs.therapies {
            writeln!(f, "  * {}", card.name)?;
            for (label, value) in [
                ("", &card.description),
                ("Indication: ", &card.indication),
                ("Duration: ", &card.duration),
                ("Benefits: ", &card.benefits),
                ("Precautions: ", &card.precautions),
            ] {
                if let Some(value) = value {
                    writeln!(f, "    {}{}", label, value)?;
                }
            }
        }

        writeln!(f)?;
        writeln!(f, "Dietary Recommendations (Ahara)")?;
        writeln!(f, "  Foods to Favor:")?;
        for item in &recs.dietary.favor {
            writeln!(f, "    - {}", item)?;
        }
        writeln!(f, "  Foods to Avoid:")?;
        for item in &recs.dietary.avoid {
            writeln!(f, "    - {}", item)?;
        }

        writeln!(f)?;
        writeln!(f, "Lifestyle Modifications (Vihara)")?;
        writeln!(f, "  Daily Routine: {}", recs.lifestyle.routine)?;
        writeln!(f, "  Yoga Practices: {}", recs.lifestyle.yoga)?;
        writeln!(f, "  Pranayama: {}", recs.lifestyle.pranayama)
    }
}

/// State of the download button and error banner for a given download state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DownloadControl {
    pub label: &'static str,
    pub busy: bool,
    pub enabled: bool,
    /// Dismissible banner text.
    pub error: Option<String>,
}

impl From<&DownloadState> for DownloadControl {
    fn from(state: &DownloadState) -> Self {
        let busy = state.is_in_flight();
        Self {
            label: if busy { DOWNLOAD_BUSY_LABEL } else { DOWNLOAD_LABEL },
            busy,
            enabled: !busy,
            error: state.failure_reason().map(str::to_string),
        }
    }
}
