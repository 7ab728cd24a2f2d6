//! Report catalog for rental-lens.
//!
//! An ordered registry of named SQL report templates. Templates may declare
//! integer parameters, referenced in the SQL as `{{name}}`; rendering only
//! ever substitutes validated integer literals.

mod builtin;

use std::fmt;
use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::{Captures, Regex};
use serde::Serialize;
use tracing::debug;

use crate::config::CustomReportConfig;
use crate::error::{ReportError, Result};

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{\s*([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").expect("placeholder pattern is valid")
});

/// An integer parameter declared by a report template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportParam {
    pub name: String,
    pub default: i64,
    pub min: i64,
}

impl ReportParam {
    /// Declares a parameter with a default and no lower bound below zero.
    pub fn new(name: impl Into<String>, default: i64) -> Self {
        Self {
            name: name.into(),
            default,
            min: 0,
        }
    }

    /// Sets the smallest accepted value.
    pub fn min(self, min: i64) -> Self {
        Self { min, ..self }
    }
}

/// Parameter values supplied for one report run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportParams {
    values: IndexMap<String, i64>,
}

impl ReportParams {
    /// Creates an empty parameter set; every parameter takes its default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the set with `name` bound to `value`.
    pub fn with(mut self, name: impl Into<String>, value: i64) -> Self {
        self.set(name, value);
        self
    }

    /// Binds `name` to `value`, replacing any earlier binding.
    pub fn set(&mut self, name: impl Into<String>, value: i64) {
        self.values.insert(name.into(), value);
    }

    /// Returns the value bound to `name`.
    pub fn get(&self, name: &str) -> Option<i64> {
        self.values.get(name).copied()
    }

    /// Parses `name=value` assignments, as given on the command line.
    pub fn from_assignments<I, S>(assignments: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut params = Self::new();
        for assignment in assignments {
            let assignment = assignment.as_ref();
            let (name, value) = assignment.split_once('=').ok_or_else(|| {
                ReportError::invalid_parameter(format!(
                    "expected name=value, got '{assignment}'"
                ))
            })?;
            let value = value.trim().parse::<i64>().map_err(|_| {
                ReportError::invalid_parameter(format!(
                    "value for '{}' must be an integer, got '{}'",
                    name.trim(),
                    value.trim()
                ))
            })?;
            params.set(name.trim(), value);
        }
        Ok(params)
    }
}

/// A named report definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    id: String,
    label: String,
    sql: String,
    description: Option<String>,
    required_tables: Vec<String>,
    params: Vec<ReportParam>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    descending: Vec<Vec<String>>,
}

impl CatalogEntry {
    /// Creates an entry with no parameters and no declared table dependencies.
    pub fn new(id: impl Into<String>, label: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            sql: sql.into(),
            description: None,
            required_tables: Vec::new(),
            params: Vec::new(),
            descending: Vec::new(),
        }
    }

    /// Sets the long description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Declares the tables the report reads.
    pub fn requires(mut self, tables: &[&str]) -> Self {
        self.required_tables = tables.iter().map(|t| t.to_string()).collect();
        self
    }

    /// Declares a template parameter.
    pub fn with_param(mut self, param: ReportParam) -> Self {
        self.params.push(param);
        self
    }

    /// Requires the named parameters to be strictly decreasing, in the order
    /// given, whenever the report is rendered.
    pub fn descending(mut self, names: &[&str]) -> Self {
        self.descending
            .push(names.iter().map(|n| n.to_string()).collect());
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// The template exactly as registered.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn required_tables(&self) -> &[String] {
        &self.required_tables
    }

    pub fn params(&self) -> &[ReportParam] {
        &self.params
    }

    /// Renders the template, substituting each `{{name}}` with the supplied
    /// value or the parameter's default.
    pub fn render(&self, params: &ReportParams) -> Result<String> {
        for (name, value) in &params.values {
            let Some(declared) = self.params.iter().find(|p| &p.name == name) else {
                return Err(ReportError::invalid_parameter(format!(
                    "report '{}' has no parameter '{}'",
                    self.id, name
                )));
            };
            if *value < declared.min {
                return Err(ReportError::invalid_parameter(format!(
                    "'{}' must be at least {}, got {}",
                    name, declared.min, value
                )));
            }
        }
        self.check_descending(|name| self.resolve(params, name))?;

        let rendered = PLACEHOLDER.replace_all(&self.sql, |caps: &Captures| {
            match self.resolve(params, &caps[1]) {
                Some(value) => value.to_string(),
                // Unreachable for validated entries; leave the text for the engine to reject.
                None => caps[0].to_string(),
            }
        });

        Ok(rendered.into_owned())
    }

    /// The supplied value for `name`, or its declared default.
    fn resolve(&self, params: &ReportParams, name: &str) -> Option<i64> {
        params
            .get(name)
            .or_else(|| self.params.iter().find(|p| p.name == name).map(|p| p.default))
    }

    fn check_descending(&self, value_of: impl Fn(&str) -> Option<i64>) -> Result<()> {
        for group in &self.descending {
            for pair in group.windows(2) {
                let (higher, lower) = (&pair[0], &pair[1]);
                let (Some(high), Some(low)) = (value_of(higher), value_of(lower)) else {
                    continue;
                };
                if high <= low {
                    return Err(ReportError::invalid_parameter(format!(
                        "'{higher}' ({high}) must be greater than '{lower}' ({low})"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Checks that every placeholder in the template is a declared parameter
    /// and that the declared defaults are themselves acceptable values.
    fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(ReportError::invalid_parameter("report id must not be empty"));
        }

        for param in &self.params {
            if param.default < param.min {
                return Err(ReportError::invalid_parameter(format!(
                    "report '{}' defaults '{}' to {}, below its minimum of {}",
                    self.id, param.name, param.default, param.min
                )));
            }
        }

        for name in self.descending.iter().flatten() {
            if !self.params.iter().any(|p| &p.name == name) {
                return Err(ReportError::invalid_parameter(format!(
                    "report '{}' orders undeclared parameter '{}'",
                    self.id, name
                )));
            }
        }
        self.check_descending(|name| {
            self.params.iter().find(|p| p.name == name).map(|p| p.default)
        })?;

        for caps in PLACEHOLDER.captures_iter(&self.sql) {
            let name = &caps[1];
            if !self.params.iter().any(|p| p.name == name) {
                return Err(ReportError::invalid_parameter(format!(
                    "report '{}' uses undeclared parameter '{}'",
                    self.id, name
                )));
            }
        }

        Ok(())
    }
}

impl From<&CustomReportConfig> for CatalogEntry {
    fn from(config: &CustomReportConfig) -> Self {
        let label = config.label.clone().unwrap_or_else(|| config.id.clone());
        let mut entry = CatalogEntry::new(&config.id, label, &config.sql);
        entry.description = config.description.clone();
        entry.required_tables = config.requires.clone();
        entry.params = config
            .params
            .iter()
            .map(|p| ReportParam::new(&p.name, p.default).min(p.min))
            .collect();
        entry
    }
}

impl fmt::Display for CatalogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} - {}", self.id, self.label)?;
        if let Some(description) = &self.description {
            writeln!(f, "{description}")?;
        }
        if !self.params.is_empty() {
            let params = self
                .params
                .iter()
                .map(|p| format!("{}={} (min {})", p.name, p.default, p.min))
                .collect::<Vec<_>>()
                .join(", ");
            writeln!(f, "Parameters: {params}")?;
        }
        if !self.required_tables.is_empty() {
            writeln!(f, "Requires: {}", self.required_tables.join(", "))?;
        }
        write!(f, "\n{}", self.sql.trim())
    }
}

/// Ordered registry of report definitions.
///
/// Construct one per session and hand it to the runner; there is no global
/// instance.
#[derive(Debug, Clone, Default)]
pub struct QueryCatalog {
    entries: IndexMap<String, CatalogEntry>,
}

impl QueryCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a catalog holding the built-in DVD rental reports.
    pub fn dvd_rental() -> Result<Self> {
        let mut catalog = Self::new();
        builtin::register_all(&mut catalog)?;
        Ok(catalog)
    }

    /// Adds an entry. Fails if the id is taken, leaving the existing entry as is.
    pub fn register(&mut self, entry: CatalogEntry) -> Result<()> {
        if self.entries.contains_key(entry.id()) {
            return Err(ReportError::duplicate_id(entry.id()));
        }
        entry.validate()?;

        debug!("Registered report '{}'", entry.id());
        self.entries.insert(entry.id().to_string(), entry);
        Ok(())
    }

    /// Adds a parameterless entry from its parts.
    pub fn register_sql(
        &mut self,
        id: impl Into<String>,
        label: impl Into<String>,
        sql: impl Into<String>,
    ) -> Result<()> {
        self.register(CatalogEntry::new(id, label, sql))
    }

    /// Registers the custom reports from configuration, in order.
    pub fn register_custom(&mut self, reports: &[CustomReportConfig]) -> Result<()> {
        for report in reports {
            self.register(CatalogEntry::from(report))?;
        }
        Ok(())
    }

    /// Returns the entry registered under `id`.
    pub fn get(&self, id: &str) -> Result<&CatalogEntry> {
        self.entries
            .get(id)
            .ok_or_else(|| ReportError::not_found(id))
    }

    /// Returns `(id, label)` pairs in registration order.
    pub fn list(&self) -> Vec<(&str, &str)> {
        self.entries
            .values()
            .map(|e| (e.id(), e.label()))
            .collect()
    }

    /// Iterates entries in registration order.
    pub fn entries(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.values()
    }

    /// Renders the template registered under `id`.
    pub fn render(&self, id: &str, params: &ReportParams) -> Result<String> {
        self.get(id)?.render(params)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
