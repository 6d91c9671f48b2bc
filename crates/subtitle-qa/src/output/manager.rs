use std::path::PathBuf;

use tracing::info;

use crate::pipeline::AnalysisOutput;
use crate::settings::OutputSettings;

use super::error::OutputError;
use super::json::write_json;

/// Writes the report and, when configured, the audit table.
pub struct OutputManager {
    report: PathBuf,
    audit: Option<PathBuf>,
    pretty: bool,
}

impl OutputManager {
    pub fn new(settings: &OutputSettings) -> Self {
        Self {
            report: settings.report.clone(),
            audit: settings.audit.clone(),
            pretty: settings.pretty,
        }
    }

    pub async fn write(&self, output: &AnalysisOutput) -> Result<(), OutputError> {
        write_json(&self.report, output, self.pretty).await?;
        info!(path = %self.report.display(), "wrote report");
        if let Some(audit) = self.audit.as_ref() {
            write_json(audit, &output.audit, self.pretty).await?;
            info!(path = %audit.display(), rows = output.audit.len(), "wrote audit table");
        }
        Ok(())
    }
}
