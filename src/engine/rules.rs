use anyhow::{Context, Result};
use regex::{Captures, Regex};
use serde::Serialize;
use tracing::debug;

use super::normalize::find_ci;
use super::segment::Sections;

/// Characters inspected after an anchor when a rule is window-scoped.
pub const ANCHOR_WINDOW_CHARS: usize = 800;

#[derive(Debug, Clone, Copy)]
pub enum Scope {
    Global,
    Section(&'static str),
    Window {
        section: Option<&'static str>,
        anchor: &'static str,
    },
}

/// One step of a fallback chain: where to look and what shape to accept.
#[derive(Debug, Clone, Copy)]
pub struct Rule {
    pub source: &'static str,
    pub scope: Scope,
    pub pattern: &'static str,
}

#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub field: &'static str,
    pub rules: &'static [Rule],
}

/// Which rule produced a value. Kept for the debug artifact.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricRecord {
    pub field: String,
    pub source: String,
    pub value: String,
}

#[derive(Debug)]
struct CompiledRule {
    source: &'static str,
    scope: Scope,
    regex: Regex,
}

#[derive(Debug)]
struct CompiledField {
    field: &'static str,
    rules: Vec<CompiledRule>,
}

#[derive(Debug)]
pub struct RuleTable {
    fields: Vec<CompiledField>,
}

impl RuleTable {
    pub fn compile(specs: &[FieldSpec]) -> Result<Self> {
        let mut fields = Vec::with_capacity(specs.len());
        for spec in specs {
            let mut rules = Vec::with_capacity(spec.rules.len());
            for rule in spec.rules {
                let regex = Regex::new(rule.pattern).with_context(|| {
                    format!(
                        "failed to compile pattern for {} ({})",
                        spec.field, rule.source
                    )
                })?;
                rules.push(CompiledRule {
                    source: rule.source,
                    scope: rule.scope,
                    regex,
                });
            }
            fields.push(CompiledField {
                field: spec.field,
                rules,
            });
        }
        Ok(Self { fields })
    }

    /// Walk the field's chain and return the first value `parse` accepts.
    fn resolve<T, F>(&self, field: &str, sections: &Sections, parse: F) -> Option<(&'static str, T)>
    where
        F: Fn(&Captures) -> Option<T>,
    {
        let compiled = self.fields.iter().find(|entry| entry.field == field)?;
        for rule in &compiled.rules {
            let scoped = scope_text(sections, rule.scope);
            if scoped.is_empty() {
                continue;
            }
            let Some(captures) = rule.regex.captures(scoped) else {
                continue;
            };
            if let Some(value) = parse(&captures) {
                return Some((rule.source, value));
            }
            debug!(field, source = rule.source, "pattern matched but value did not parse");
        }
        None
    }
}

pub fn scope_text(sections: &Sections, scope: Scope) -> &str {
    match scope {
        Scope::Global => sections.full_text(),
        Scope::Section(label) => sections.get(label),
        Scope::Window { section, anchor } => {
            let base = match section {
                Some(label) => sections.get(label),
                None => sections.full_text(),
            };
            anchor_window(base, anchor, ANCHOR_WINDOW_CHARS)
        }
    }
}

/// Text following the first occurrence of `anchor`, bounded to `limit` chars.
pub fn anchor_window<'a>(text: &'a str, anchor: &str, limit: usize) -> &'a str {
    let Some(position) = find_ci(text, anchor) else {
        return "";
    };
    let start = position + anchor.len();
    let end = text[start..]
        .char_indices()
        .nth(limit)
        .map(|(offset, _)| start + offset)
        .unwrap_or(text.len());
    &text[start..end]
}

pub fn parse_count(raw: &str) -> Option<u64> {
    let cleaned = raw
        .chars()
        .filter(|character| *character != ',' && !character.is_whitespace())
        .collect::<String>();
    cleaned.parse::<u64>().ok()
}

pub fn parse_percent(raw: &str) -> Option<f64> {
    let value = raw.trim().replace(',', ".").parse::<f64>().ok()?;
    if value.is_finite() { Some(value) } else { None }
}

/// Field lookups over one set of sections, recording provenance as it goes.
pub struct MetricExtractor<'a> {
    table: &'a RuleTable,
    sections: &'a Sections,
    records: Vec<MetricRecord>,
}

impl<'a> MetricExtractor<'a> {
    pub fn new(table: &'a RuleTable, sections: &'a Sections) -> Self {
        Self {
            table,
            sections,
            records: Vec::new(),
        }
    }

    pub fn count(&mut self, field: &str) -> Option<u64> {
        let found = self.table.resolve(field, self.sections, |captures| {
            captures.get(1).and_then(|value| parse_count(value.as_str()))
        });
        self.note(field, found.map(|(source, value)| (source, value.to_string())));
        found.map(|(_, value)| value)
    }

    pub fn percent(&mut self, field: &str) -> Option<f64> {
        let found = self.table.resolve(field, self.sections, |captures| {
            captures.get(1).and_then(|value| parse_percent(value.as_str()))
        });
        self.note(field, found.map(|(source, value)| (source, value.to_string())));
        found.map(|(_, value)| value)
    }

    pub fn text(&mut self, field: &str) -> Option<String> {
        let found = self.table.resolve(field, self.sections, |captures| {
            captures
                .get(1)
                .map(|value| value.as_str().trim().to_string())
                .filter(|value| !value.is_empty())
        });
        self.note(field, found.clone());
        found.map(|(_, value)| value)
    }

    /// Passed count, failed count and percentage from one policy row.
    pub fn triple(&mut self, field: &str) -> Option<(u64, u64, f64)> {
        let found = self.table.resolve(field, self.sections, |captures| {
            let passed = parse_count(captures.get(1)?.as_str())?;
            let failed = parse_count(captures.get(2)?.as_str())?;
            let percent = parse_percent(captures.get(3)?.as_str())?;
            Some((passed, failed, percent))
        });
        self.note(
            field,
            found.map(|(source, (passed, failed, percent))| {
                (source, format!("{passed} passed / {failed} failed / {percent}%"))
            }),
        );
        found.map(|(_, value)| value)
    }

    /// Record a value that came from a derived rule or a stated default.
    pub fn record(&mut self, field: &str, source: &str, value: impl ToString) {
        self.records.push(MetricRecord {
            field: field.to_string(),
            source: source.to_string(),
            value: value.to_string(),
        });
    }

    pub fn into_records(self) -> Vec<MetricRecord> {
        self.records
    }

    fn note(&mut self, field: &str, found: Option<(&'static str, String)>) {
        match found {
            Some((source, value)) => self.record(field, source, value),
            None => debug!(field, "no rule matched"),
        }
    }
}
