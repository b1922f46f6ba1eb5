//! Structured diagnostics — the non-fatal record of everything skipped,
//! dropped or overridden during a run.
//!
//! The rule is: nothing disappears silently. Every rejected record, dropped
//! edge and field override lands here so the surrounding tool can report a
//! validation summary without re-deriving it.

use serde::{Deserialize, Serialize};

use crate::types::SourceName;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A record missing mandatory normalized fields; skipped.
    MalformedRecord,
    /// A foreign key that could not be matched to a canonical entity.
    UnresolvedReference,
    /// Two equally-scored candidates above threshold; resolved by tie-break.
    AmbiguousMatch,
    /// A field value replaced by a higher-priority source.
    FieldOverride,
    /// A travel edge dropped because an endpoint stayed unresolved.
    DroppedEdge,
}

impl DiagnosticKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticKind::MalformedRecord => "malformed_record",
            DiagnosticKind::UnresolvedReference => "unresolved_reference",
            DiagnosticKind::AmbiguousMatch => "ambiguous_match",
            DiagnosticKind::FieldOverride => "field_override",
            DiagnosticKind::DroppedEdge => "dropped_edge",
        }
    }
}

/// One diagnostic entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub source: Option<SourceName>,
    /// The offending reference: a source record id, an edge id, a place name.
    pub reference: String,
    pub detail: String,
}

impl Diagnostic {
    pub fn new(
        kind: DiagnosticKind,
        source: Option<SourceName>,
        reference: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            source,
            reference: reference.into(),
            detail: detail.into(),
        }
    }
}

/// Aggregated outcome of a run: row counts plus everything non-fatal that
/// happened along the way.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunReport {
    pub records_accepted: usize,
    pub records_merged: usize,
    pub records_rejected: usize,
    pub edges_promoted: usize,
    pub edges_dropped: usize,
    pub fields_overridden: usize,
    pub ambiguous_matches: usize,
    pub table_counts: Vec<(String, usize)>,
    pub diagnostics: Vec<Diagnostic>,
}

impl RunReport {
    pub fn push(&mut self, diag: Diagnostic) {
        match diag.kind {
            DiagnosticKind::MalformedRecord => self.records_rejected += 1,
            DiagnosticKind::AmbiguousMatch => self.ambiguous_matches += 1,
            DiagnosticKind::FieldOverride => self.fields_overridden += 1,
            DiagnosticKind::DroppedEdge => self.edges_dropped += 1,
            DiagnosticKind::UnresolvedReference => {}
        }
        self.diagnostics.push(diag);
    }

    pub fn count_of(&self, kind: DiagnosticKind) -> usize {
        self.diagnostics.iter().filter(|d| d.kind == kind).count()
    }
}
