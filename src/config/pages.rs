//! Declarative page configuration
//!
//! A [`PagesConfig`] lists the pages of a report in output order. Each page
//! names its template, the operations to run against it and their inputs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::builders::{BuilderName, Side};
use crate::host::{PictureBox, ReplaceMode};
use crate::images::ImageArgs;

/// The closed set of page operations
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum OperationName {
    ReplaceHeader,
    ReplaceText,
    FillTable,
    FillFixtures,
    HighlightRows,
    PruneParagraphs,
    InsertImages,
    InsertBadge,
    /// Skipped with a warning
    Unknown(String),
}

impl OperationName {
    pub const KNOWN: [OperationName; 8] = [
        OperationName::ReplaceHeader,
        OperationName::ReplaceText,
        OperationName::FillTable,
        OperationName::FillFixtures,
        OperationName::HighlightRows,
        OperationName::PruneParagraphs,
        OperationName::InsertImages,
        OperationName::InsertBadge,
    ];

    pub fn as_str(&self) -> &str {
        match self {
            OperationName::ReplaceHeader => "replace_header",
            OperationName::ReplaceText => "replace_text",
            OperationName::FillTable => "fill_table",
            OperationName::FillFixtures => "fill_fixtures",
            OperationName::HighlightRows => "highlight_rows",
            OperationName::PruneParagraphs => "prune_paragraphs",
            OperationName::InsertImages => "insert_images",
            OperationName::InsertBadge => "insert_badge",
            OperationName::Unknown(name) => name,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, OperationName::Unknown(_))
    }
}

impl FromStr for OperationName {
    type Err = std::convert::Infallible;

    /// Config names, plus the names older page configurations used
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let op = match s.trim() {
            "replace_header" | "page_common_replace_header_md_code_ha" => {
                OperationName::ReplaceHeader
            }
            "replace_text" => OperationName::ReplaceText,
            "fill_table" | "page_fill_table_from_config" => OperationName::FillTable,
            "fill_fixtures" | "page2_fill_table" => OperationName::FillFixtures,
            "highlight_rows" | "page_highlight_both_teams" => OperationName::HighlightRows,
            "prune_paragraphs" => OperationName::PruneParagraphs,
            "insert_images" | "page_insert_images_from_config" => OperationName::InsertImages,
            "insert_badge" => OperationName::InsertBadge,
            other => OperationName::Unknown(other.to_string()),
        };
        Ok(op)
    }
}

impl From<String> for OperationName {
    fn from(value: String) -> Self {
        match value.parse() {
            Ok(op) => op,
            Err(never) => match never {},
        }
    }
}

impl From<OperationName> for String {
    fn from(op: OperationName) -> Self {
        op.as_str().to_string()
    }
}

impl fmt::Display for OperationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which table of the page receives a fill, 0-based
///
/// Configured as `first`/`second` or `1`/`2`; anything other than the first
/// table means the second.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "TargetRepr", into = "String")]
pub struct TableTarget(pub usize);

#[derive(Deserialize)]
#[serde(untagged)]
enum TargetRepr {
    Index(u64),
    Name(String),
}

impl From<TargetRepr> for TableTarget {
    fn from(repr: TargetRepr) -> Self {
        let first = match repr {
            TargetRepr::Index(i) => i <= 1,
            TargetRepr::Name(name) => {
                matches!(name.trim().to_lowercase().as_str(), "first" | "1" | "")
            }
        };
        TableTarget(if first { 0 } else { 1 })
    }
}

impl From<TableTarget> for String {
    fn from(target: TableTarget) -> Self {
        match target.0 {
            0 => "first".to_string(),
            _ => "second".to_string(),
        }
    }
}

/// One derived table poured into the page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSpec {
    pub builder: BuilderName,
    #[serde(default)]
    pub defensive: bool,
    #[serde(default, alias = "subtype")]
    pub side: Side,
    #[serde(default)]
    pub target: TableTarget,
}

/// A find-and-replace entry; `with` may use `${...}` placeholders
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Replacement {
    pub find: String,
    #[serde(alias = "replace")]
    pub with: String,
    #[serde(default)]
    pub mode: ReplaceMode,
    /// Upper-case the inserted text and make it bold
    #[serde(default)]
    pub bold_upper: bool,
    #[serde(default)]
    pub match_case: bool,
}

/// When `prune_paragraphs` deletes its marker paragraphs
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PruneCondition {
    /// The sample size reaches or exceeds the fixture's chronological index
    #[default]
    SampleReachesFixture,
    /// The sample size is below the fixture's chronological index
    SampleBelowFixture,
    Always,
}

impl PruneCondition {
    /// Whether the condition holds; without a fixture index only `Always` does
    pub fn holds(&self, sample_size: u32, fixture_index: Option<u32>) -> bool {
        match (self, fixture_index) {
            (PruneCondition::Always, _) => true,
            (PruneCondition::SampleReachesFixture, Some(idx)) => sample_size >= idx,
            (PruneCondition::SampleBelowFixture, Some(idx)) => sample_size < idx,
            (_, None) => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PruneSpec {
    #[serde(default = "default_marker")]
    pub marker: String,
    #[serde(default)]
    pub keep_first: bool,
    #[serde(default)]
    pub when: PruneCondition,
    /// Applied before deleting, under the same condition
    #[serde(default)]
    pub replacements: Vec<Replacement>,
}

impl Default for PruneSpec {
    fn default() -> Self {
        Self {
            marker: default_marker(),
            keep_first: false,
            when: PruneCondition::default(),
            replacements: Vec::new(),
        }
    }
}

fn default_marker() -> String {
    "(*)".to_string()
}

/// Whose badge `insert_badge` places
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BadgeOwner {
    #[default]
    Rival,
    Base,
}

/// Absolute badge geometry; every coordinate is required
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BadgeSpec {
    pub width_cm: Option<f64>,
    pub height_cm: Option<f64>,
    pub pos_h_cm: Option<f64>,
    pub pos_v_cm: Option<f64>,
    #[serde(default)]
    pub owner: BadgeOwner,
}

impl BadgeSpec {
    /// Names of the required keys that are absent
    pub fn missing_keys(&self) -> Vec<&'static str> {
        [
            ("width_cm", self.width_cm),
            ("height_cm", self.height_cm),
            ("pos_h_cm", self.pos_h_cm),
            ("pos_v_cm", self.pos_v_cm),
        ]
        .into_iter()
        .filter(|(_, v)| v.is_none())
        .map(|(k, _)| k)
        .collect()
    }

    /// Placement in points, or the missing keys
    pub fn placement(&self) -> Result<PictureBox, Vec<&'static str>> {
        match (self.width_cm, self.height_cm, self.pos_h_cm, self.pos_v_cm) {
            (Some(w), Some(h), Some(x), Some(y)) => Ok(PictureBox::from_cm(x, y, w, h)),
            _ => Err(self.missing_keys()),
        }
    }
}

/// One image produced by a named builder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageItem {
    pub builder: String,
    #[serde(default)]
    pub args: ImageArgs,
    #[serde(default)]
    pub pos_h_cm: f64,
    #[serde(default)]
    pub pos_v_cm: f64,
    /// Non-positive keeps the image's own width
    #[serde(default)]
    pub width_cm: f64,
    #[serde(default)]
    pub height_cm: f64,
}

impl ImageItem {
    /// Images sit behind the page text
    pub fn placement(&self) -> PictureBox {
        PictureBox::from_cm(self.pos_h_cm, self.pos_v_cm, self.width_cm, self.height_cm).behind()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ImagesRepr {
    List(Vec<ImageItem>),
    Section {
        #[serde(default)]
        items: Vec<ImageItem>,
    },
}

fn deserialize_images<'de, D>(deserializer: D) -> Result<Vec<ImageItem>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Option::<ImagesRepr>::deserialize(deserializer)? {
        Some(ImagesRepr::List(items)) | Some(ImagesRepr::Section { items }) => items,
        None => Vec::new(),
    })
}

/// One page of the report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageConfig {
    #[serde(default)]
    pub name: Option<String>,

    /// Template file name, looked up in the template archive
    pub template: String,

    #[serde(default)]
    pub pipeline: Vec<OperationName>,

    /// Overrides the settings' header placeholder for this page
    #[serde(default)]
    pub header_placeholder: Option<String>,

    #[serde(default)]
    pub replacements: Vec<Replacement>,

    #[serde(default)]
    pub tables: Vec<TableSpec>,

    /// Single-table shorthand, used when `tables` is empty
    #[serde(default)]
    pub table: Option<TableSpec>,

    #[serde(default)]
    pub prune: Option<PruneSpec>,

    #[serde(default, deserialize_with = "deserialize_images")]
    pub images: Vec<ImageItem>,

    #[serde(default)]
    pub badge: Option<BadgeSpec>,

    #[serde(default)]
    pub fixtures_table: TableTarget,
}

impl PageConfig {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.template)
    }

    /// The tables to fill, in order
    pub fn table_specs(&self) -> Vec<&TableSpec> {
        if self.tables.is_empty() {
            self.table.iter().collect()
        } else {
            self.tables.iter().collect()
        }
    }

    pub fn runs(&self, op: &OperationName) -> bool {
        self.pipeline.contains(op)
    }

    /// Problems worth reporting before a run; none of them stop the run
    pub fn warnings(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        let name = self.display_name();

        for op in self.pipeline.iter().filter(|op| !op.is_known()) {
            warnings.push(format!("{}: unknown operation '{}' will be skipped", name, op));
        }
        for spec in self.table_specs() {
            if !spec.builder.is_known() {
                warnings.push(format!(
                    "{}: unknown builder '{}' fills the raw team aggregate",
                    name, spec.builder
                ));
            }
        }
        if self.runs(&OperationName::FillTable) && self.table_specs().is_empty() {
            warnings.push(format!("{}: fill_table without any table entry", name));
        }
        if self.runs(&OperationName::InsertBadge) {
            let missing = self
                .badge
                .as_ref()
                .map(BadgeSpec::missing_keys)
                .unwrap_or_else(|| BadgeSpec::default().missing_keys());
            if !missing.is_empty() {
                warnings.push(format!(
                    "{}: insert_badge is missing {}",
                    name,
                    missing.join(", ")
                ));
            }
        }
        warnings
    }
}

/// Every page of a report, in output order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PagesConfig {
    #[serde(alias = "docs")]
    pub pages: Vec<PageConfig>,
}

impl PagesConfig {
    pub fn warnings(&self) -> Vec<String> {
        self.pages.iter().flat_map(PageConfig::warnings).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGES: &str = r#"
pages:
  - name: cover
    template: page1.yaml
    pipeline: [replace_text, insert_badge]
    replacements:
      - { find: "CHARLTON\tATHLETIC\t(A)", with: "${rival} (${venue})" }
    badge: { width_cm: 4, height_cm: 4, pos_h_cm: 8.5, pos_v_cm: 6 }
  - template: page9.yaml
    pipeline: [page_common_replace_header_md_code_ha, fill_table, page_highlight_both_teams, rotate_page]
    tables:
      - { builder: corner_summary, defensive: true, subtype: left }
      - { builder: _pk_corners, side: right, target: second }
  - template: page12.yaml
    pipeline: [fill_table, insert_images, insert_badge]
    table: { builder: mk_set_pieces, target: 1 }
    images:
      items:
        - builder: team_square_image
          args: { team: coach_team }
          pos_h_cm: 1
          pos_v_cm: 1
          width_cm: 2
    badge: { width_cm: 4 }
"#;

    fn pages() -> PagesConfig {
        serde_yaml::from_str(PAGES).unwrap()
    }

    #[test]
    fn test_operation_names_round_trip() {
        for op in OperationName::KNOWN {
            let parsed: OperationName = op.as_str().parse().unwrap();
            assert_eq!(parsed, op);
        }
        assert_eq!(
            OperationName::from("page_insert_images_from_config".to_string()),
            OperationName::InsertImages
        );
    }

    #[test]
    fn test_pages_parse_with_legacy_names() {
        let config = pages();
        assert_eq!(config.pages.len(), 3);

        let cover = &config.pages[0];
        assert_eq!(cover.display_name(), "cover");
        assert_eq!(cover.replacements[0].with, "${rival} (${venue})");
        assert_eq!(cover.replacements[0].mode, ReplaceMode::All);

        let summary = &config.pages[1];
        assert_eq!(summary.display_name(), "page9.yaml");
        assert_eq!(summary.pipeline[0], OperationName::ReplaceHeader);
        assert_eq!(
            summary.pipeline[3],
            OperationName::Unknown("rotate_page".into())
        );
        let specs = summary.table_specs();
        assert_eq!(specs[0].side, Side::Left);
        assert_eq!(specs[0].target, TableTarget(0));
        assert_eq!(specs[1].builder, BuilderName::CornerTakers);
        assert_eq!(specs[1].target, TableTarget(1));
    }

    #[test]
    fn test_single_table_and_images_section() {
        let page = &pages().pages[2];
        let specs = page.table_specs();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].builder, BuilderName::SetPieces);
        assert_eq!(specs[0].target, TableTarget(0));
        assert_eq!(page.images.len(), 1);
        assert_eq!(page.images[0].builder, "team_square_image");
        assert_eq!(page.images[0].placement().height_pt, None);
    }

    #[test]
    fn test_badge_placement_requires_every_key() {
        let config = pages();
        let cover_badge = config.pages[0].badge.as_ref().unwrap();
        let placement = cover_badge.placement().unwrap();
        assert!((placement.left_pt - 8.5 * crate::host::POINTS_PER_CM).abs() < 1e-9);

        let partial = config.pages[2].badge.as_ref().unwrap();
        assert_eq!(
            partial.placement().unwrap_err(),
            vec!["height_cm", "pos_h_cm", "pos_v_cm"]
        );
    }

    #[test]
    fn test_warnings_name_unknown_operations_and_incomplete_badges() {
        let warnings = pages().warnings();
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("rotate_page"));
        assert!(warnings[1].contains("page12.yaml"));
        assert!(warnings[1].contains("height_cm"));
    }

    #[test]
    fn test_prune_condition() {
        let default = PruneCondition::default();
        assert!(default.holds(10, Some(7)));
        assert!(default.holds(7, Some(7)));
        assert!(!default.holds(5, Some(7)));
        assert!(!default.holds(5, None));
        assert!(PruneCondition::SampleBelowFixture.holds(5, Some(7)));
        assert!(PruneCondition::Always.holds(1, None));
    }

    #[test]
    fn test_docs_alias_and_json() {
        let config: PagesConfig = serde_json::from_str(
            r#"{"docs": [{"template": "page3.docx", "pipeline": ["page_common_replace_header_md_code_ha", "insert_badge"], "badge": {"width_cm": 2.1, "height_cm": 2.1, "pos_h_cm": 17.4, "pos_v_cm": 0.6}}]}"#,
        )
        .unwrap();
        assert_eq!(config.pages.len(), 1);
        assert!(config.warnings().is_empty());
    }
}
