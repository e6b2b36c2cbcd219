use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentKind {
    #[default]
    Resume,
    CoverLetter,
}

/// Name line, headline and contact details rendered at the top of page 1.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HeaderContent {
    pub name: String,
    #[serde(default)]
    pub headline: Option<String>,
    #[serde(default)]
    pub contact: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileContent {
    pub text: String,
    #[serde(default = "default_visible")]
    pub visible: bool,
}

/// One entry inside a section (a job, a degree, a skill group, a letter paragraph).
///
/// `fields` are arbitrary display fields keyed by name; the editor decides which
/// ones exist. Ordering of a `BTreeMap` keeps measurement deterministic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionItem {
    pub id: String,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default)]
    pub fields: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    pub id: String,
    pub name: String,
    #[serde(default = "default_visible")]
    pub visible: bool,
    #[serde(default)]
    pub items: Vec<SectionItem>,
}

/// The content model handed over by the editing subsystem.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentContent {
    #[serde(default)]
    pub kind: DocumentKind,
    #[serde(default)]
    pub header: HeaderContent,
    #[serde(default)]
    pub profile: Option<ProfileContent>,
    #[serde(default)]
    pub sections: Vec<Section>,
    /// Section ids in display order.
    #[serde(default)]
    pub section_order: Vec<String>,
}

fn default_visible() -> bool {
    true
}

impl DocumentContent {
    /// Visible sections in display order.
    ///
    /// Ids listed in `section_order` come first; sections the order does not
    /// mention are appended in their natural position. Unknown ids are ignored.
    pub fn ordered_sections(&self) -> Vec<&Section> {
        let mut ordered: Vec<&Section> = Vec::with_capacity(self.sections.len());
        for id in &self.section_order {
            if let Some(section) = self.sections.iter().find(|s| &s.id == id) {
                if !ordered.iter().any(|s| s.id == section.id) {
                    ordered.push(section);
                }
            }
        }
        for section in &self.sections {
            if !ordered.iter().any(|s| s.id == section.id) {
                ordered.push(section);
            }
        }
        ordered.retain(|s| s.visible);
        ordered
    }

    /// The profile, if present and switched on.
    pub fn visible_profile(&self) -> Option<&ProfileContent> {
        self.profile
            .as_ref()
            .filter(|p| p.visible && !p.text.trim().is_empty())
    }
}

impl SectionItem {
    /// Display fields joined in key order, skipping blanks.
    pub fn display_lines(&self) -> Vec<&str> {
        self.fields
            .values()
            .map(|v| v.as_str())
            .filter(|v| !v.trim().is_empty())
            .collect()
    }
}
