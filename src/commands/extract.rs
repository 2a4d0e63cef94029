use anyhow::{Context, Result};
use chrono::Utc;
use tracing::info;

use crate::cli::ExtractArgs;
use crate::config::ExtractionSettings;
use crate::error::EngineError;
use crate::parsers::{ClientContext, ParserRegistry};
use crate::util::{read_text_if_present, write_json_pretty};

/// Run one parser over text that was already OCR'd, skipping discovery.
pub fn run(args: ExtractArgs) -> Result<()> {
    let registry = ParserRegistry::new(&ExtractionSettings::default())?;
    let parser = registry.get(&args.module)?;

    let text = read_text_if_present(&args.text)?.ok_or_else(|| EngineError::StructuralFailure {
        path: args.text.clone(),
    })?;

    let context = ClientContext {
        client_name: args.client.trim().to_string(),
        report_period: args
            .report_period
            .clone()
            .unwrap_or_else(|| Utc::now().format("%B %Y").to_string()),
        generated_date: Utc::now().format("%Y-%m-%d").to_string(),
        text,
    };
    let extraction = parser.extract(&context)?;

    match &args.output {
        Some(path) => {
            write_json_pretty(path, &extraction.report)?;
            info!(
                module = parser.module_id(),
                path = %path.display(),
                provenance = extraction.provenance.len(),
                "wrote report data"
            );
        }
        None => {
            let rendered = serde_json::to_string_pretty(&extraction.report)
                .context("failed to serialize report data")?;
            println!("{rendered}");
        }
    }

    Ok(())
}
