//! Flowable blocks derived from the content model.
//!
//! Blocks are rebuilt from scratch on every content change. Hidden sections
//! and hidden items never become blocks, so they contribute no height.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::document::{DocumentContent, DocumentKind, Section, SectionItem};

/// Stable identifier of a block, unique within one document.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockId(pub String);

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockKind {
    SectionHeading,
    Item,
    Paragraph,
    /// A whole section (heading plus its items) kept as one unit.
    Section,
}

/// Typographic role of a run of text; the renderer scales font size by role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextRole {
    Name,
    Title,
    Body,
    Meta,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRun {
    pub role: TextRole,
    pub text: String,
}

impl TextRun {
    fn new(role: TextRole, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
        }
    }
}

/// Atomic flowable unit. Never split across pages or columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub id: BlockId,
    pub kind: BlockKind,
    /// Index in document flow order.
    pub ordinal: usize,
    pub runs: Vec<TextRun>,
}

/// Builds the ordered block list for a document.
pub fn derive_blocks(doc: &DocumentContent) -> Vec<Block> {
    let mut blocks = Vec::new();
    for section in doc.ordered_sections() {
        let items: Vec<&SectionItem> = section.items.iter().filter(|i| i.visible).collect();
        if items.is_empty() {
            continue;
        }
        match doc.kind {
            DocumentKind::Resume => push_resume_section(&mut blocks, section, &items),
            DocumentKind::CoverLetter => {
                for item in items {
                    let runs = item
                        .display_lines()
                        .into_iter()
                        .map(|line| TextRun::new(TextRole::Body, line))
                        .collect();
                    push(
                        &mut blocks,
                        format!("paragraph:{}:{}", section.id, item.id),
                        BlockKind::Paragraph,
                        runs,
                    );
                }
            }
        }
    }
    blocks
}

fn push_resume_section(blocks: &mut Vec<Block>, section: &Section, items: &[&SectionItem]) {
    push(
        blocks,
        format!("section:{}", section.id),
        BlockKind::SectionHeading,
        vec![TextRun::new(TextRole::Title, section.name.clone())],
    );
    for item in items {
        let runs = item
            .fields
            .iter()
            .filter(|(_, v)| !v.trim().is_empty())
            .map(|(key, value)| TextRun::new(role_for_field(key), value.clone()))
            .collect();
        push(
            blocks,
            format!("item:{}:{}", section.id, item.id),
            BlockKind::Item,
            runs,
        );
    }
}

fn push(blocks: &mut Vec<Block>, id: String, kind: BlockKind, runs: Vec<TextRun>) {
    let ordinal = blocks.len();
    blocks.push(Block {
        id: BlockId(id),
        kind,
        ordinal,
        runs,
    });
}

/// Folds the leading section's heading and items into one `Section` block.
///
/// Used for the mixed layout, where the first block spans the full width: the
/// whole first section leads, not just its title. Ordinals are renumbered.
pub fn merge_leading_section(blocks: Vec<Block>) -> Vec<Block> {
    let item_prefix = match blocks.first() {
        Some(first) if first.kind == BlockKind::SectionHeading => first
            .id
            .0
            .strip_prefix("section:")
            .map(|section_id| format!("item:{section_id}:")),
        _ => None,
    };
    let Some(item_prefix) = item_prefix else {
        return blocks;
    };

    let mut rest = blocks.into_iter();
    let mut lead = match rest.next() {
        Some(heading) => heading,
        None => return Vec::new(),
    };
    lead.kind = BlockKind::Section;

    let mut merged = Vec::new();
    let mut absorbing = true;
    for block in rest {
        if absorbing && block.kind == BlockKind::Item && block.id.0.starts_with(&item_prefix) {
            lead.runs.extend(block.runs);
        } else {
            absorbing = false;
            merged.push(block);
        }
    }

    std::iter::once(lead)
        .chain(merged)
        .enumerate()
        .map(|(ordinal, block)| Block { ordinal, ..block })
        .collect()
}

/// Dates and places render in the smaller meta style.
fn role_for_field(key: &str) -> TextRole {
    match key {
        "date" | "dates" | "date_start" | "date_end" | "location" | "period" => TextRole::Meta,
        _ => TextRole::Body,
    }
}

/// Text runs of the page-1 header.
pub fn header_runs(doc: &DocumentContent) -> Vec<TextRun> {
    let mut runs = Vec::new();
    if !doc.header.name.trim().is_empty() {
        runs.push(TextRun::new(TextRole::Name, doc.header.name.clone()));
    }
    if let Some(headline) = doc.header.headline.as_ref().filter(|h| !h.trim().is_empty()) {
        runs.push(TextRun::new(TextRole::Body, headline.clone()));
    }
    let contact: Vec<&str> = doc
        .header
        .contact
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .collect();
    if !contact.is_empty() {
        runs.push(TextRun::new(TextRole::Meta, contact.join(" · ")));
    }
    runs
}

/// Text runs of the profile paragraph, if it is shown.
pub fn profile_runs(doc: &DocumentContent) -> Option<Vec<TextRun>> {
    doc.visible_profile()
        .map(|p| vec![TextRun::new(TextRole::Body, p.text.clone())])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::document::ProfileContent;
    use std::collections::BTreeMap;

    fn make_item(id: &str, visible: bool) -> SectionItem {
        let mut fields = BTreeMap::new();
        fields.insert("title".to_string(), format!("Role {id}"));
        fields.insert("date".to_string(), "2021 – 2024".to_string());
        SectionItem {
            id: id.to_string(),
            visible,
            fields,
        }
    }

    fn make_doc(kind: DocumentKind) -> DocumentContent {
        DocumentContent {
            kind,
            sections: vec![
                Section {
                    id: "exp".into(),
                    name: "Experience".into(),
                    visible: true,
                    items: vec![make_item("a", true), make_item("b", false), make_item("c", true)],
                },
                Section {
                    id: "empty".into(),
                    name: "Awards".into(),
                    visible: true,
                    items: vec![make_item("x", false)],
                },
                Section {
                    id: "hidden".into(),
                    name: "Hobbies".into(),
                    visible: false,
                    items: vec![make_item("h", true)],
                },
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_resume_blocks_skip_hidden_items_and_sections() {
        let blocks = derive_blocks(&make_doc(DocumentKind::Resume));
        let ids: Vec<&str> = blocks.iter().map(|b| b.id.0.as_str()).collect();
        assert_eq!(ids, vec!["section:exp", "item:exp:a", "item:exp:c"]);
        assert_eq!(blocks[0].kind, BlockKind::SectionHeading);
        assert!(blocks.iter().enumerate().all(|(i, b)| b.ordinal == i));
    }

    #[test]
    fn test_item_date_fields_use_meta_role() {
        let blocks = derive_blocks(&make_doc(DocumentKind::Resume));
        let item = &blocks[1];
        assert!(item
            .runs
            .iter()
            .any(|r| r.role == TextRole::Meta && r.text.contains("2021")));
    }

    #[test]
    fn test_cover_letter_has_paragraphs_only() {
        let blocks = derive_blocks(&make_doc(DocumentKind::CoverLetter));
        assert_eq!(blocks.len(), 2);
        assert!(blocks.iter().all(|b| b.kind == BlockKind::Paragraph));
    }

    #[test]
    fn test_header_runs_join_contact_details() {
        let mut doc = DocumentContent::default();
        doc.header.name = "Ada Lovelace".into();
        doc.header.contact = vec!["ada@example.com".into(), " ".into(), "London".into()];
        let runs = header_runs(&doc);
        assert_eq!(runs.len(), 2);
        assert_eq!(runs[1].text, "ada@example.com · London");
    }

    #[test]
    fn test_leading_section_absorbs_its_items() {
        let mut doc = make_doc(DocumentKind::Resume);
        doc.sections[1].items[0].visible = true;
        let blocks = merge_leading_section(derive_blocks(&doc));
        let ids: Vec<&str> = blocks.iter().map(|b| b.id.0.as_str()).collect();
        assert_eq!(ids, vec!["section:exp", "section:empty", "item:empty:x"]);
        assert_eq!(blocks[0].kind, BlockKind::Section);
        // heading + two items with two fields each
        assert_eq!(blocks[0].runs.len(), 5);
        assert_eq!(blocks[0].runs[0].text, "Experience");
        assert_eq!(blocks[1].kind, BlockKind::SectionHeading);
        assert!(blocks.iter().enumerate().all(|(i, b)| b.ordinal == i));
    }

    #[test]
    fn test_leading_paragraph_is_left_alone() {
        let blocks = derive_blocks(&make_doc(DocumentKind::CoverLetter));
        assert_eq!(merge_leading_section(blocks.clone()), blocks);
    }

    #[test]
    fn test_hidden_profile_has_no_runs() {
        let mut doc = DocumentContent::default();
        doc.profile = Some(ProfileContent {
            text: "Engineer".into(),
            visible: false,
        });
        assert!(profile_runs(&doc).is_none());
    }
}
