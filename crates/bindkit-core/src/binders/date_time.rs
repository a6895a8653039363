//! Date/time parsing.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use serde_json::Value;
use tracing::trace;

use crate::context::BindingContext;
use crate::descriptor::TargetDescriptor;
use crate::errors::BindResult;
use crate::value::{BindingResult, BoundValue, DateTimeValue, DateTimeVariant};

use super::{presence, Binder, Presence};

/// Format name for RFC 3339 / ISO-8601 input with an explicit offset.
pub const RFC3339_FORMAT: &str = "rfc3339";

/// Accepted input formats, tried in order.
pub const DEFAULT_DATE_TIME_FORMATS: &[&str] = &[
    RFC3339_FORMAT,
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d",
    "%Y-%m-%d %H:%M:%S",
];

/// Binds `DateTime`, `DateTimeImmutable` and `DateTimeInterface` targets
/// from strings.
#[derive(Debug, Clone)]
pub struct DateTimeBinder {
    formats: Vec<String>,
}

impl DateTimeBinder {
    /// Create a binder trying `formats` in order.
    ///
    /// Entries are chrono `strftime` patterns, or `rfc3339`.
    pub fn new(formats: Vec<String>) -> Self {
        Self { formats }
    }

    /// The formats tried, in order.
    pub fn formats(&self) -> &[String] {
        &self.formats
    }

    fn parse(&self, input: &str) -> Option<(DateTime<FixedOffset>, &str)> {
        self.formats
            .iter()
            .find_map(|format| parse_with(input, format).map(|dt| (dt, format.as_str())))
    }
}

impl Default for DateTimeBinder {
    fn default() -> Self {
        Self::new(DEFAULT_DATE_TIME_FORMATS.iter().map(|f| f.to_string()).collect())
    }
}

impl Binder for DateTimeBinder {
    fn bind_model(
        &self,
        target: &TargetDescriptor<'_>,
        _context: &BindingContext<'_>,
    ) -> BindResult<Option<BindingResult>> {
        let Some(variant) = target.declared_type().and_then(DateTimeVariant::from_type_name) else {
            return Ok(None);
        };

        let raw = match presence(target) {
            Presence::Settled(outcome) => return Ok(outcome),
            Presence::Value(raw) => raw,
        };
        let Value::String(input) = raw else {
            return Ok(None);
        };

        match self.parse(input.trim()) {
            Some((value, format)) => Ok(Some(BindingResult::new(BoundValue::DateTime(
                DateTimeValue::new(variant, value, format),
            )))),
            None => {
                trace!(target_name = target.name(), input = %input, "no date/time format matched");
                Ok(None)
            }
        }
    }
}

/// Parse `input` with one format. Naive formats are read as UTC and accept
/// a trailing `Z`.
fn parse_with(input: &str, format: &str) -> Option<DateTime<FixedOffset>> {
    if format == RFC3339_FORMAT {
        return DateTime::parse_from_rfc3339(input).ok();
    }

    let naive_input = input.strip_suffix('Z').unwrap_or(input);
    let naive = NaiveDateTime::parse_from_str(naive_input, format)
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(naive_input, format)
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })?;
    Some(naive.and_utc().fixed_offset())
}
