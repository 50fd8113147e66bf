use serde::{Deserialize, Serialize};
use std::fmt;

/// Fallback text for labels the classifier may return but we do not describe.
pub const GENERIC_DESCRIPTION: &str =
    "Analysis complete. Please consult with a healthcare professional for interpretation.";

/// Diabetic retinopathy grade as reported by the prediction service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DrLabel {
    NoDr,
    MildDr,
    ModerateDr,
    SevereDr,
    ProliferativeDr,
    /// Any label outside the known grading scale, kept verbatim.
    Unknown(String),
}

/// Presentation bucket derived from a label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl DrLabel {
    /// Known grades in the order the server's classifier emits class indices.
    pub const KNOWN: [DrLabel; 5] = [
        DrLabel::NoDr,
        DrLabel::MildDr,
        DrLabel::ModerateDr,
        DrLabel::SevereDr,
        DrLabel::ProliferativeDr,
    ];

    /// Exact, case-sensitive match on the wire name.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "No DR" => DrLabel::NoDr,
            "Mild DR" => DrLabel::MildDr,
            "Moderate DR" => DrLabel::ModerateDr,
            "Severe DR" => DrLabel::SevereDr,
            "Proliferative DR" => DrLabel::ProliferativeDr,
            other => DrLabel::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            DrLabel::NoDr => "No DR",
            DrLabel::MildDr => "Mild DR",
            DrLabel::ModerateDr => "Moderate DR",
            DrLabel::SevereDr => "Severe DR",
            DrLabel::ProliferativeDr => "Proliferative DR",
            DrLabel::Unknown(raw) => raw,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            DrLabel::NoDr => {
                "No signs of diabetic retinopathy detected. Regular eye check-ups are still recommended for diabetic patients."
            }
            DrLabel::MildDr => {
                "Mild non-proliferative diabetic retinopathy. Small areas of balloon-like swelling in the retina's tiny blood vessels."
            }
            DrLabel::ModerateDr => {
                "Moderate non-proliferative diabetic retinopathy. More extensive damage to retinal blood vessels."
            }
            DrLabel::SevereDr => {
                "Severe non-proliferative diabetic retinopathy. Many blood vessels are blocked, depriving several areas of the retina of blood supply."
            }
            DrLabel::ProliferativeDr => {
                "Proliferative diabetic retinopathy. The most advanced stage where new, abnormal blood vessels grow in the retina. Urgent medical attention required."
            }
            DrLabel::Unknown(_) => GENERIC_DESCRIPTION,
        }
    }

    /// Unrecognised labels fall into the high tier.
    pub fn severity(&self) -> Severity {
        match self {
            DrLabel::NoDr => Severity::Low,
            DrLabel::MildDr | DrLabel::ModerateDr => Severity::Medium,
            DrLabel::SevereDr | DrLabel::ProliferativeDr | DrLabel::Unknown(_) => Severity::High,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, DrLabel::Unknown(_))
    }
}

impl From<String> for DrLabel {
    fn from(raw: String) -> Self {
        match DrLabel::parse(&raw) {
            DrLabel::Unknown(_) => DrLabel::Unknown(raw),
            known => known,
        }
    }
}

impl From<&str> for DrLabel {
    fn from(raw: &str) -> Self {
        DrLabel::parse(raw)
    }
}

impl From<DrLabel> for String {
    fn from(label: DrLabel) -> Self {
        match label {
            DrLabel::Unknown(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for DrLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Severity {
    pub fn css_class(self) -> &'static str {
        match self {
            Severity::Low => "low-risk",
            Severity::Medium => "medium-risk",
            Severity::High => "high-risk",
        }
    }
}
