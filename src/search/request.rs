use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};

use super::SearchError;

/// Naive date-time layouts accepted after RFC 3339 fails. `%.f` also matches
/// an absent fractional part.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// A validated index search. Built once per tool call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub query: String,
    /// Extension without the leading dot.
    pub extension: Option<String>,
    pub modified_after: Option<DateTime<Utc>>,
    pub min_size_kb: Option<u64>,
    pub max_size_kb: Option<u64>,
}

impl SearchRequest {
    pub fn new(query: &str) -> Result<Self, SearchError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(SearchError::EmptyQuery);
        }
        Ok(Self {
            query: query.to_string(),
            extension: None,
            modified_after: None,
            min_size_kb: None,
            max_size_kb: None,
        })
    }

    /// Accepts `"pdf"` or `".pdf"`; blank input leaves the filter unset.
    pub fn with_extension(mut self, extension: Option<&str>) -> Self {
        self.extension = extension
            .map(|e| e.trim().trim_start_matches('.'))
            .filter(|e| !e.is_empty())
            .map(str::to_string);
        self
    }

    pub fn with_modified_after(mut self, raw: Option<&str>) -> Result<Self, SearchError> {
        self.modified_after = raw.map(parse_modified_after).transpose()?;
        Ok(self)
    }

    /// Zero is a real bound, not "unset".
    pub fn with_size_range(
        mut self,
        min_size_kb: Option<u64>,
        max_size_kb: Option<u64>,
    ) -> Result<Self, SearchError> {
        if let (Some(min), Some(max)) = (min_size_kb, max_size_kb)
            && max < min
        {
            return Err(SearchError::InvalidSizeRange { min, max });
        }
        self.min_size_kb = min_size_kb;
        self.max_size_kb = max_size_kb;
        Ok(self)
    }

    pub fn min_size_bytes(&self) -> Option<u64> {
        self.min_size_kb.map(|kb| kb.saturating_mul(1024))
    }

    pub fn max_size_bytes(&self) -> Option<u64> {
        self.max_size_kb.map(|kb| kb.saturating_mul(1024))
    }

    pub fn has_size_bounds(&self) -> bool {
        self.min_size_kb.is_some() || self.max_size_kb.is_some()
    }

    /// Whether a file of `len` bytes satisfies both size bounds.
    pub fn size_matches(&self, len: u64) -> bool {
        self.min_size_bytes().is_none_or(|min| len >= min)
            && self.max_size_bytes().is_none_or(|max| len <= max)
    }
}

/// Parse an ISO 8601 timestamp. Values without an offset are local time.
pub fn parse_modified_after(raw: &str) -> Result<DateTime<Utc>, SearchError> {
    let raw = raw.trim();
    let invalid = || SearchError::InvalidDateFormat(raw.to_string());

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Ok(dt.with_timezone(&Utc));
    }

    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(raw, f).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .ok_or_else(invalid)?;

    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(invalid)
}
