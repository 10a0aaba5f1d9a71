//! Per-channel mapping from detections to "alert-worthy frame"

use crate::detection::Detection;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Decides whether one frame's detections qualify as an alert for a channel.
pub trait AlertPolicy: Send + Sync + Debug {
    fn qualifies(&self, detections: &[Detection]) -> bool;
}

/// Any detection at all qualifies.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnyDetection;

impl AlertPolicy for AnyDetection {
    fn qualifies(&self, detections: &[Detection]) -> bool {
        !detections.is_empty()
    }
}

/// A detection carrying one of the listed labels qualifies.
#[derive(Debug, Clone)]
pub struct LabelsPresent {
    labels: Vec<String>,
}

impl LabelsPresent {
    pub fn new(labels: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }
}

impl AlertPolicy for LabelsPresent {
    fn qualifies(&self, detections: &[Detection]) -> bool {
        detections
            .iter()
            .any(|d| self.labels.iter().any(|label| d.has_label(label)))
    }
}

/// A person whose box contains no gear box qualifies.
///
/// A gear box belongs to a person when its centre lies inside the person's
/// box.
#[derive(Debug, Clone)]
pub struct MissingGear {
    person_label: String,
    gear_labels: Vec<String>,
}

impl MissingGear {
    pub fn new(person_label: impl Into<String>, gear_labels: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            person_label: person_label.into(),
            gear_labels: gear_labels.into_iter().map(Into::into).collect(),
        }
    }

    fn is_gear(&self, detection: &Detection) -> bool {
        self.gear_labels.iter().any(|label| detection.has_label(label))
    }
}

impl AlertPolicy for MissingGear {
    fn qualifies(&self, detections: &[Detection]) -> bool {
        let gear: Vec<_> = detections
            .iter()
            .filter(|d| self.is_gear(d))
            .map(|d| d.bbox.center())
            .collect();

        detections
            .iter()
            .filter(|d| d.has_label(&self.person_label))
            .any(|person| !gear.iter().any(|center| person.bbox.contains(*center)))
    }
}

/// Serializable policy selection for a channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PolicyConfig {
    AnyDetection,
    Labels {
        labels: Vec<String>,
    },
    MissingGear {
        person_label: String,
        gear_labels: Vec<String>,
    },
}

impl Default for PolicyConfig {
    fn default() -> Self {
        PolicyConfig::AnyDetection
    }
}

impl PolicyConfig {
    pub fn build(&self) -> Box<dyn AlertPolicy> {
        match self {
            PolicyConfig::AnyDetection => Box::new(AnyDetection),
            PolicyConfig::Labels { labels } => Box::new(LabelsPresent::new(labels.clone())),
            PolicyConfig::MissingGear {
                person_label,
                gear_labels,
            } => Box::new(MissingGear::new(person_label.clone(), gear_labels.clone())),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        match self {
            PolicyConfig::AnyDetection => Ok(()),
            PolicyConfig::Labels { labels } if labels.is_empty() => {
                Err("labels policy needs at least one label".to_string())
            }
            PolicyConfig::Labels { .. } => Ok(()),
            PolicyConfig::MissingGear { person_label, .. } if person_label.trim().is_empty() => {
                Err("missing_gear policy needs a person label".to_string())
            }
            PolicyConfig::MissingGear { gear_labels, .. } if gear_labels.is_empty() => {
                Err("missing_gear policy needs at least one gear label".to_string())
            }
            PolicyConfig::MissingGear { .. } => Ok(()),
        }
    }
}
