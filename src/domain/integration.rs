//! Integration identity and the compiled-in catalog
//!
//! An integration is one configured (source, destination) event flow. The
//! catalog is immutable and read-only at runtime; all integrations share the
//! same processing logic and differ only in these parameters.

/// Placeholder destination for one-sided integrations.
const ABSENT_DESTINATION: &str = "N/A";

/// One configured event flow between a source and a destination system.
///
/// The id is derived once at construction from the integration code plus
/// both endpoints. An absent destination (`"N/A"`) is normalized to `"NA"`
/// inside the id so checkpoint keys and archive prefixes stay
/// filesystem-friendly; the stored destination keeps its raw value because
/// query filters must match the source system's spelling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Integration {
    code: String,
    source: String,
    destination: String,
    id: String,
}

impl Integration {
    /// Create an integration and derive its id.
    pub fn new(
        code: impl Into<String>,
        source: impl Into<String>,
        destination: impl Into<String>,
    ) -> Self {
        let code = code.into();
        let source = source.into();
        let destination = destination.into();

        let normalized = if destination == ABSENT_DESTINATION {
            "NA"
        } else {
            destination.as_str()
        };
        let id = format!("{code}-{source}-{normalized}");

        Self {
            code,
            source,
            destination,
            id,
        }
    }

    /// Integration code (e.g. `IC-01`).
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Source system identifier.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Destination system identifier; `"N/A"` for one-sided integrations.
    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// Derived identity, used for checkpoint keys and archive prefixes.
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl std::fmt::Display for Integration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id)
    }
}

/// The full compiled-in integration catalog.
///
/// Fixed at build time; the orchestrator runs one pipeline per entry.
pub fn catalog() -> Vec<Integration> {
    vec![
        // one-sided integrations
        Integration::new("IC-07", "INT08-1", "N/A"),
        Integration::new("IC-08", "INT09-1", "N/A"),
        Integration::new("IC-09", "INT10-1", "N/A"),
        // integration pairs
        Integration::new("IC-01", "INT03-1", "INT04"),
        Integration::new("IC-02", "INT03-2", "INT04"),
        Integration::new("IC-03", "INT04", "INT31"),
        Integration::new("IC-04", "INT11-2", "INT11"),
        Integration::new("IC-05", "INT12-2", "INT12-1"),
        Integration::new("IC-06", "INT04", "INT15-1-1"),
        Integration::new("IC-10", "INT15-2-2", "INT15-2-1"),
        Integration::new("IC-11", "INT15-3-2", "INT15-3-1"),
        Integration::new("IC-12", "INT27", "INT28"),
        Integration::new("IC-13", "INT17", "INT18"),
        Integration::new("IC-14", "INT28", "INT29"),
        Integration::new("IC-15", "INT25", "INT26"),
        Integration::new("IC-16", "INT26", "INT30"),
        Integration::new("IC-17", "INT32-2", "INT32-1"),
        Integration::new("IC-18", "INT33-2", "INT33-1"),
        Integration::new("IC-19", "INT15-2-2", "INT24-1"),
        Integration::new("IC-20", "INT21", "INT22"),
        Integration::new("IC-24", "INT16", "INT17"),
        Integration::new("IC-25", "INT20", "INT16"),
        Integration::new("IC-26", "INT15-1-1", "INT19-1"),
        Integration::new("IC-27", "INT15-2-1", "INT19-2"),
        Integration::new("IC-28", "INT15-3-1", "INT19-3"),
        Integration::new("IC-29", "INT19-1", "INT20"),
        Integration::new("IC-30", "INT19-2", "INT20"),
    ]
}

/// Look up a catalog entry by integration code, case-insensitively.
pub fn find_by_code(code: &str) -> Option<Integration> {
    catalog()
        .into_iter()
        .find(|i| i.code.eq_ignore_ascii_case(code))
}
