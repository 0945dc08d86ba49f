//! The QA configuration form snapshot and its wire field names.

use serde::{Deserialize, Serialize};

/// Issue gravity, ordered from most to least severe.
///
/// `fail_at` chooses the gravity that fails the job (fatal/error/warning);
/// `verbosity` chooses the gravity messages are shown from onwards and may
/// additionally be `Information`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Fatal,
    Error,
    Warning,
    Information,
}

impl Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fatal => "fatal",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Information => "information",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "fatal" => Some(Self::Fatal),
            "error" => Some(Self::Error),
            "warning" => Some(Self::Warning),
            "information" => Some(Self::Information),
            _ => None,
        }
    }
}

/// Fail-at level → the least verbose setting that still shows the issues
/// the job fails on. Evaluated on every level change, replacing the pairwise
/// click handlers of the original page.
const IMPLIED_MIN_VERBOSITY: &[(Level, Level)] = &[
    (Level::Fatal, Level::Fatal),
    (Level::Error, Level::Error),
    (Level::Warning, Level::Warning),
];

fn implied_min_verbosity(fail_at: Level) -> Level {
    IMPLIED_MIN_VERBOSITY
        .iter()
        .find(|(level, _)| *level == fail_at)
        .map_or(Level::Information, |(_, implied)| *implied)
}

/// Which files the job considers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionMode {
    #[default]
    All,
    /// Only files changed relative to the main branch.
    Changed,
    /// Only files whose name matches one of the filters.
    Filtered,
}

impl SelectionMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Changed => "changed",
            Self::Filtered => "filtered",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "all" => Some(Self::All),
            "changed" => Some(Self::Changed),
            "filtered" => Some(Self::Filtered),
            _ => None,
        }
    }
}

/// Terminology-server usage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TerminologyMode {
    #[default]
    DefaultTx,
    Disabled,
}

impl TerminologyMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DefaultTx => "default_tx",
            Self::Disabled => "disabled",
        }
    }
}

/// Snapshot of the QA form, posted as a multipart body on submission.
#[derive(Debug, Clone)]
pub struct QaForm {
    pub mode: SelectionMode,
    /// File-name filters, joined with commas on the wire (filtered mode).
    pub filters: Vec<String>,
    /// Selected step names, posted as `step_<name>` checkboxes.
    pub steps: Vec<String>,
    verbosity: Level,
    fail_at: Level,
    pub terminology: TerminologyMode,
    pub suppress_display_issues: bool,
    pub extensible_binding_warnings: bool,
    pub best_practice_warnings: bool,
    pub debug: bool,
}

impl Default for QaForm {
    fn default() -> Self {
        Self {
            mode: SelectionMode::default(),
            filters: Vec::new(),
            steps: Vec::new(),
            verbosity: Level::Information,
            fail_at: Level::Error,
            terminology: TerminologyMode::default(),
            suppress_display_issues: false,
            extensible_binding_warnings: false,
            best_practice_warnings: true,
            debug: false,
        }
    }
}

impl QaForm {
    pub fn verbosity(&self) -> Level {
        self.verbosity
    }

    pub fn fail_at(&self) -> Level {
        self.fail_at
    }

    /// Set the fail-at level; verbosity is raised to the implied minimum so
    /// failing issues always show.
    pub fn set_fail_at(&mut self, fail_at: Level) {
        self.fail_at = fail_at;
        self.verbosity = self.verbosity.max(implied_min_verbosity(fail_at));
    }

    /// Set the verbosity; a stricter fail-at than the new verbosity is
    /// lowered to match.
    pub fn set_verbosity(&mut self, verbosity: Level) {
        self.verbosity = verbosity;
        if implied_min_verbosity(self.fail_at) > verbosity {
            self.fail_at = verbosity;
        }
    }

    /// The multipart key/value snapshot, using the server's field names.
    /// Checkbox-style fields appear only when set, as a posted form would.
    pub fn fields(&self) -> Vec<(String, String)> {
        let mut fields = vec![("check_what".to_string(), self.mode.as_str().to_string())];
        if self.mode == SelectionMode::Filtered {
            fields.push(("file_name_filters".to_string(), self.filters.join(",")));
        }
        for step in &self.steps {
            fields.push((format!("step_{step}"), "on".to_string()));
        }
        fields.push(("terminology".to_string(), self.terminology.as_str().to_string()));
        if self.suppress_display_issues {
            fields.push(("suppress_display_issues".to_string(), "on".to_string()));
        }
        fields.push(("verbosity_level".to_string(), self.verbosity.as_str().to_string()));
        fields.push(("fail_at".to_string(), self.fail_at.as_str().to_string()));
        if self.extensible_binding_warnings {
            fields.push(("extensible_binding_warnings".to_string(), "on".to_string()));
        }
        if self.best_practice_warnings {
            fields.push(("best_practice_warnings".to_string(), "on".to_string()));
        }
        if self.debug {
            fields.push(("debug".to_string(), "on".to_string()));
        }
        fields
    }
}
