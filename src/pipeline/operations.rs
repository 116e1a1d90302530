//! The page operations

use tracing::{debug, warn};

use super::{ReportGenerator, RunContext};
use crate::builders::fixtures::fixtures_table;
use crate::builders::{self, BuildOptions};
use crate::config::{BadgeOwner, OperationName, PageConfig, Replacement, TableTarget};
use crate::error::{ReportError, Result};
use crate::host::{HostDocument, TextReplace};
use crate::reconcile::{self, FillMode};
use crate::table::DataTable;

impl ReportGenerator {
    pub(super) async fn apply(
        &self,
        op: &OperationName,
        page: &PageConfig,
        doc: &dyn HostDocument,
        ctx: &RunContext<'_>,
    ) -> Result<()> {
        match op {
            OperationName::ReplaceHeader => self.replace_header(page, doc, ctx).await,
            OperationName::ReplaceText => {
                self.apply_replacements(&page.replacements, doc, ctx).await
            }
            OperationName::FillTable => self.fill_tables(page, doc, ctx).await,
            OperationName::FillFixtures => self.fill_fixtures(page, doc, ctx).await,
            OperationName::HighlightRows => self.highlight_rows(doc, ctx).await,
            OperationName::PruneParagraphs => self.prune_paragraphs(page, doc, ctx).await,
            OperationName::InsertImages => self.insert_images(page, doc, ctx).await,
            OperationName::InsertBadge => self.insert_badge(page, doc, ctx).await,
            OperationName::Unknown(name) => {
                warn!("{}: unknown operation '{}' skipped", page.display_name(), name);
                Ok(())
            }
        }
    }

    async fn replace_header(
        &self,
        page: &PageConfig,
        doc: &dyn HostDocument,
        ctx: &RunContext<'_>,
    ) -> Result<()> {
        let header = &ctx.request.header;
        if header.is_empty() {
            debug!("{}: no header supplied, placeholder kept", page.display_name());
            return Ok(());
        }
        let replace = TextReplace::all(self.header_placeholder(page), header.as_str());
        let count = self.client.replace_text(doc, &replace).await?;
        debug!("{}: header replaced {} times", page.display_name(), count);
        Ok(())
    }

    async fn apply_replacements(
        &self,
        replacements: &[Replacement],
        doc: &dyn HostDocument,
        ctx: &RunContext<'_>,
    ) -> Result<()> {
        for replacement in replacements {
            let mut text = ctx.variables.expand(&replacement.with);
            if replacement.bold_upper {
                text = text.to_uppercase();
            }
            let mut replace =
                TextReplace::all(replacement.find.as_str(), text).with_mode(replacement.mode);
            replace.match_case = replacement.match_case;
            if replacement.bold_upper {
                replace = replace.bold();
            }
            let count = self.client.replace_text(doc, &replace).await?;
            if count == 0 {
                debug!("'{}' not found in {}", replacement.find, doc.name());
            }
        }
        Ok(())
    }

    /// Read, fill and write back one template table
    async fn fill_target(
        &self,
        doc: &dyn HostDocument,
        target: TableTarget,
        derived: &DataTable,
        mode: FillMode,
        bold_columns: &[usize],
    ) -> Result<()> {
        let tables = self.client.table_count(doc).await?;
        if target.0 >= tables {
            warn!(
                "{} has {} tables, cannot fill table {}",
                doc.name(),
                tables,
                target.0 + 1
            );
            return Ok(());
        }

        let mut table = self.client.read_table(doc, target.0).await?;
        let report = reconcile::fill(&mut table, derived, mode, &self.format);
        if !report.unmatched_labels.is_empty() {
            debug!(
                "{}: rows without data: {}",
                doc.name(),
                report.unmatched_labels.join(", ")
            );
        }
        for row in table.rows.iter_mut().skip(1).take(report.rows_written) {
            for &col in bold_columns {
                if let Some(cell) = row.cells.get_mut(col) {
                    cell.style.bold = true;
                }
            }
        }
        self.client.write_table(doc, target.0, &table).await
    }

    async fn fill_tables(
        &self,
        page: &PageConfig,
        doc: &dyn HostDocument,
        ctx: &RunContext<'_>,
    ) -> Result<()> {
        for spec in page.table_specs() {
            let options = BuildOptions {
                defensive: spec.defensive,
                side: spec.side,
                rival: ctx.request.params.rival().to_string(),
            };
            let derived = builders::build(&spec.builder, ctx.artifacts, &options);
            debug!(
                "{}: {} built {} rows",
                page.display_name(),
                spec.builder,
                derived.len()
            );

            let result = self
                .fill_target(doc, spec.target, &derived, spec.builder.fill_mode(), &[])
                .await;
            if let Err(e) = result {
                if e.aborts_run() {
                    return Err(e);
                }
                warn!("{}: table {} not filled: {}", page.display_name(), spec.builder, e);
            }
        }
        Ok(())
    }

    async fn fill_fixtures(
        &self,
        page: &PageConfig,
        doc: &dyn HostDocument,
        ctx: &RunContext<'_>,
    ) -> Result<()> {
        let params = &ctx.request.params;
        let derived = fixtures_table(
            &ctx.request.fixtures,
            params.rival(),
            params.sample_size() as usize,
        );
        let opposition = derived.width().saturating_sub(1);
        self.fill_target(doc, page.fixtures_table, &derived, FillMode::Direct, &[opposition])
            .await
    }

    async fn highlight_rows(&self, doc: &dyn HostDocument, ctx: &RunContext<'_>) -> Result<()> {
        if self.client.table_count(doc).await? == 0 {
            return Ok(());
        }
        let params = &ctx.request.params;
        let mut table = self.client.read_table(doc, 0).await?;
        let shaded = reconcile::highlight_rows(
            &mut table,
            params.team(),
            params.rival(),
            &self.team_color,
            &self.rival_color,
        );
        if shaded > 0 {
            self.client.write_table(doc, 0, &table).await?;
        }
        Ok(())
    }

    async fn prune_paragraphs(
        &self,
        page: &PageConfig,
        doc: &dyn HostDocument,
        ctx: &RunContext<'_>,
    ) -> Result<()> {
        let spec = page.prune.clone().unwrap_or_default();
        let sample_size = ctx.request.params.sample_size();
        if !spec.when.holds(sample_size, ctx.request.fixture_index) {
            debug!(
                "{}: keeping '{}' paragraphs (sample {}, fixture {:?})",
                page.display_name(),
                spec.marker,
                sample_size,
                ctx.request.fixture_index
            );
            return Ok(());
        }

        self.apply_replacements(&spec.replacements, doc, ctx).await?;
        let removed = self
            .client
            .delete_paragraphs(doc, &spec.marker, spec.keep_first)
            .await?;
        debug!("{}: removed {} paragraphs", page.display_name(), removed);
        Ok(())
    }

    async fn insert_images(
        &self,
        page: &PageConfig,
        doc: &dyn HostDocument,
        ctx: &RunContext<'_>,
    ) -> Result<()> {
        for item in &page.images {
            let Some(builder) = self.images.get(&item.builder) else {
                warn!("{}: unknown image builder '{}'", page.display_name(), item.builder);
                continue;
            };
            let files = match builder.build(&ctx.images, &item.args).await {
                Ok(files) => files,
                Err(e) => {
                    warn!("{}: image '{}' skipped: {:#}", page.display_name(), item.builder, e);
                    continue;
                }
            };

            let placement = item.placement();
            for file in files {
                if let Err(e) = self.client.add_picture(doc, &file, &placement).await {
                    if e.aborts_run() {
                        return Err(e);
                    }
                    warn!("{}: {} not inserted: {}", page.display_name(), file.display(), e);
                }
            }
        }
        Ok(())
    }

    async fn insert_badge(
        &self,
        page: &PageConfig,
        doc: &dyn HostDocument,
        ctx: &RunContext<'_>,
    ) -> Result<()> {
        let spec = page.badge.clone().unwrap_or_default();
        let placement = spec.placement().map_err(|missing| {
            ReportError::page_config(
                page.display_name(),
                format!("insert_badge requires {}", missing.join(", ")),
            )
        })?;

        let badge = match spec.owner {
            BadgeOwner::Rival => ctx.images.badge_rival.as_ref(),
            BadgeOwner::Base => ctx.images.badge_base.as_ref(),
        };
        match badge {
            Some(path) => self.client.add_picture(doc, path, &placement).await,
            None => {
                warn!("{}: no {:?} badge supplied", page.display_name(), spec.owner);
                Ok(())
            }
        }
    }
}
