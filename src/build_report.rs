use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Correction {
    pub name: String,
    pub stat_name: String,
    pub old_value: f64,
    pub new_value: f64,
    pub round_num: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BuildReportEntry {
    Warning { message: String },
    Error { message: String },
    Correction(Correction),
}

impl BuildReportEntry {
    pub fn is_correction(&self) -> bool {
        matches!(self, BuildReportEntry::Correction(_))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BuildReport {
    entries: Vec<BuildReportEntry>,
}

impl BuildReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<BuildReportEntry>) -> Self {
        Self { entries }
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.entries.push(BuildReportEntry::Warning {
            message: message.into(),
        });
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.entries.push(BuildReportEntry::Error {
            message: message.into(),
        });
    }

    pub fn push_correction(&mut self, correction: Correction) {
        self.entries.push(BuildReportEntry::Correction(correction));
    }

    pub fn entries(&self) -> &[BuildReportEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn warning_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e, BuildReportEntry::Warning { .. }))
            .count()
    }

    pub fn error_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(e, BuildReportEntry::Error { .. }))
            .count()
    }

    pub fn log_lines(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter_map(|entry| match entry {
                BuildReportEntry::Warning { message } => Some(format!("[WARNING] {message}")),
                BuildReportEntry::Error { message } => Some(format!("[ERROR] {message}")),
                BuildReportEntry::Correction(_) => None,
            })
            .collect()
    }

    pub fn corrections(&self) -> impl Iterator<Item = &Correction> {
        self.entries.iter().filter_map(|entry| match entry {
            BuildReportEntry::Correction(c) => Some(c),
            _ => None,
        })
    }

    pub fn replace_corrections(&mut self, fresh: Vec<Correction>) {
        self.entries.retain(|entry| !entry.is_correction());
        self.entries
            .extend(fresh.into_iter().map(BuildReportEntry::Correction));
    }
}
