use std::collections::BTreeMap;

use anyhow::Result;

use crate::config::ExtractionSettings;
use crate::engine::rules::MetricRecord;
use crate::error::EngineError;
use crate::model::{ChartInputs, ParsedReport};
use crate::util::sanitize_client_name;

pub mod datto_rmm;
pub mod prtg_monitoring;
#[cfg(test)]
mod tests;

/// Everything a parser sees for one client run: who the report is for and
/// the merged OCR text of every matched source document.
#[derive(Debug, Clone)]
pub struct ClientContext {
    pub client_name: String,
    pub report_period: String,
    pub generated_date: String,
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct Extraction {
    pub report: ParsedReport,
    pub chart_inputs: ChartInputs,
    pub sections_found: Vec<String>,
    pub provenance: Vec<MetricRecord>,
}

pub trait ReportParser {
    fn module_id(&self) -> &'static str;

    /// Directory under the client's data directory holding source PDFs.
    fn source_subdir(&self) -> &'static str;

    fn accepts_source(&self, filename: &str) -> bool;

    fn extract(&self, context: &ClientContext) -> Result<Extraction>;
}

/// Parser modules keyed by the identifiers used in `modules_to_run`.
pub struct ParserRegistry {
    parsers: BTreeMap<&'static str, Box<dyn ReportParser>>,
}

impl ParserRegistry {
    pub fn new(settings: &ExtractionSettings) -> Result<Self> {
        let mut registry = Self {
            parsers: BTreeMap::new(),
        };
        registry.register(Box::new(datto_rmm::DattoRmmParser::new(settings)?));
        registry.register(Box::new(prtg_monitoring::PrtgMonitoringParser::new()?));
        Ok(registry)
    }

    fn register(&mut self, parser: Box<dyn ReportParser>) {
        self.parsers.insert(parser.module_id(), parser);
    }

    pub fn get(&self, module: &str) -> Result<&dyn ReportParser, EngineError> {
        self.parsers
            .get(module.trim())
            .map(|parser| parser.as_ref())
            .ok_or_else(|| EngineError::UnknownModule(module.to_string()))
    }

    pub fn module_ids(&self) -> Vec<&'static str> {
        self.parsers.keys().copied().collect()
    }
}

pub fn chart_path(chart: &str, client_name: &str) -> String {
    format!("assets/{chart}_{}.png", sanitize_client_name(client_name))
}

pub fn output_filename(module: &str, client_name: &str) -> String {
    format!("temp_{module}_output_{}.json", sanitize_client_name(client_name))
}

fn is_pdf(filename: &str) -> bool {
    filename.to_ascii_lowercase().ends_with(".pdf")
}
