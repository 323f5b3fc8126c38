//! Historical Data Request
//!
//! Host call arguments and the request built from them.
//!
//! Nothing here is validated: dates, periodicity names and identifiers go
//! to the remote service verbatim, and the service's own validation is
//! authoritative. The only local policy is defaulting an empty security or
//! field list to `IBM US Equity` / `PX_LAST`.

use std::fmt;

use serde::Serialize;

use crate::domain::element::Element;

/// Operation name of the request on the reference data service.
pub const HISTORICAL_DATA_REQUEST: &str = "HistoricalDataRequest";

/// Security used when the caller supplied none.
pub const DEFAULT_SECURITY: &str = "IBM US Equity";

/// Field used when the caller supplied none.
pub const DEFAULT_FIELD: &str = "PX_LAST";

/// Default periodicity selection.
pub const DEFAULT_PERIODICITY_SELECTION: &str = "DAILY";

/// Default periodicity adjustment.
pub const DEFAULT_PERIODICITY_ADJUSTMENT: &str = "Actual";

// =============================================================================
// Host Arguments
// =============================================================================

/// Positional arguments of one host call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryArgs {
    /// Security identifier.
    pub ticker: String,
    /// Field mnemonic.
    pub field: String,
    /// First date of the range.
    pub start_date: String,
    /// Last date of the range.
    pub end_date: String,
    /// Sampling frequency (e.g. `DAILY`).
    pub periodicity_selection: String,
    /// Calendar adjustment (e.g. `Actual`, `Calendar`, `Fiscal`).
    pub periodicity_adjustment: String,
    /// Follow DPDF adjustment settings (0 = no, anything else = yes).
    pub use_dpdf: i32,
    /// Diagnostic verbosity.
    pub debug: i32,
}

impl HistoryArgs {
    /// Create arguments with the default periodicity, DPDF and debug values.
    #[must_use]
    pub fn new(
        ticker: impl Into<String>,
        field: impl Into<String>,
        start_date: impl Into<String>,
        end_date: impl Into<String>,
    ) -> Self {
        Self {
            ticker: ticker.into(),
            field: field.into(),
            start_date: start_date.into(),
            end_date: end_date.into(),
            periodicity_selection: DEFAULT_PERIODICITY_SELECTION.to_string(),
            periodicity_adjustment: DEFAULT_PERIODICITY_ADJUSTMENT.to_string(),
            use_dpdf: 0,
            debug: 0,
        }
    }

    /// Set the periodicity selection.
    #[must_use]
    pub fn with_periodicity_selection(mut self, selection: impl Into<String>) -> Self {
        self.periodicity_selection = selection.into();
        self
    }

    /// Set the periodicity adjustment.
    #[must_use]
    pub fn with_periodicity_adjustment(mut self, adjustment: impl Into<String>) -> Self {
        self.periodicity_adjustment = adjustment.into();
        self
    }

    /// Set the DPDF flag.
    #[must_use]
    pub const fn with_use_dpdf(mut self, use_dpdf: i32) -> Self {
        self.use_dpdf = use_dpdf;
        self
    }

    /// Set the debug verbosity.
    #[must_use]
    pub const fn with_debug(mut self, debug: i32) -> Self {
        self.debug = debug;
        self
    }
}

// =============================================================================
// Request
// =============================================================================

/// A historical data request, ready to send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryRequest {
    /// Securities, in order.
    pub securities: Vec<String>,
    /// Fields, in order.
    pub fields: Vec<String>,
    /// Calendar adjustment.
    pub periodicity_adjustment: String,
    /// Sampling frequency.
    pub periodicity_selection: String,
    /// First date of the range.
    pub start_date: String,
    /// Last date of the range.
    pub end_date: String,
    /// Follow DPDF adjustment settings.
    #[serde(rename = "adjustmentFollowDPDF")]
    pub adjustment_follow_dpdf: bool,
}

impl HistoryRequest {
    /// Start building a request.
    #[must_use]
    pub fn builder() -> HistoryRequestBuilder {
        HistoryRequestBuilder::default()
    }

    /// Build the request for one host call.
    ///
    /// An empty ticker or field is treated as "not supplied" and falls back
    /// to the defaults.
    #[must_use]
    pub fn from_args(args: &HistoryArgs) -> Self {
        let mut builder = Self::builder()
            .periodicity_adjustment(&args.periodicity_adjustment)
            .periodicity_selection(&args.periodicity_selection)
            .start_date(&args.start_date)
            .end_date(&args.end_date)
            .adjustment_follow_dpdf(args.use_dpdf != 0);

        if !args.ticker.is_empty() {
            builder = builder.security(&args.ticker);
        }
        if !args.field.is_empty() {
            builder = builder.field(&args.field);
        }

        builder.build()
    }

    /// Operation name on the service.
    #[must_use]
    pub const fn operation(&self) -> &'static str {
        HISTORICAL_DATA_REQUEST
    }

    /// Element view of the request, in wire order.
    #[must_use]
    pub fn to_element(&self) -> Element {
        Element::composite(
            HISTORICAL_DATA_REQUEST,
            vec![
                Element::scalar_array("securities", self.securities.iter().map(String::as_str)),
                Element::scalar_array("fields", self.fields.iter().map(String::as_str)),
                Element::scalar("periodicityAdjustment", self.periodicity_adjustment.as_str()),
                Element::scalar("periodicitySelection", self.periodicity_selection.as_str()),
                Element::scalar("startDate", self.start_date.as_str()),
                Element::scalar("endDate", self.end_date.as_str()),
                Element::scalar("adjustmentFollowDPDF", self.adjustment_follow_dpdf),
            ],
        )
    }
}

impl fmt::Display for HistoryRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.to_element(), f)
    }
}

/// Builder for [`HistoryRequest`].
#[derive(Debug, Clone, Default)]
pub struct HistoryRequestBuilder {
    securities: Vec<String>,
    fields: Vec<String>,
    periodicity_adjustment: String,
    periodicity_selection: String,
    start_date: String,
    end_date: String,
    adjustment_follow_dpdf: bool,
}

impl HistoryRequestBuilder {
    /// Append a security.
    #[must_use]
    pub fn security(mut self, security: impl Into<String>) -> Self {
        self.securities.push(security.into());
        self
    }

    /// Append a field.
    #[must_use]
    pub fn field(mut self, field: impl Into<String>) -> Self {
        self.fields.push(field.into());
        self
    }

    /// Set the periodicity adjustment.
    #[must_use]
    pub fn periodicity_adjustment(mut self, adjustment: impl Into<String>) -> Self {
        self.periodicity_adjustment = adjustment.into();
        self
    }

    /// Set the periodicity selection.
    #[must_use]
    pub fn periodicity_selection(mut self, selection: impl Into<String>) -> Self {
        self.periodicity_selection = selection.into();
        self
    }

    /// Set the first date.
    #[must_use]
    pub fn start_date(mut self, date: impl Into<String>) -> Self {
        self.start_date = date.into();
        self
    }

    /// Set the last date.
    #[must_use]
    pub fn end_date(mut self, date: impl Into<String>) -> Self {
        self.end_date = date.into();
        self
    }

    /// Set the DPDF flag.
    #[must_use]
    pub const fn adjustment_follow_dpdf(mut self, follow: bool) -> Self {
        self.adjustment_follow_dpdf = follow;
        self
    }

    /// Finish the request, substituting defaults for empty lists.
    #[must_use]
    pub fn build(self) -> HistoryRequest {
        let securities = if self.securities.is_empty() {
            vec![DEFAULT_SECURITY.to_string()]
        } else {
            self.securities
        };
        let fields = if self.fields.is_empty() {
            vec![DEFAULT_FIELD.to_string()]
        } else {
            self.fields
        };

        HistoryRequest {
            securities,
            fields,
            periodicity_adjustment: self.periodicity_adjustment,
            periodicity_selection: self.periodicity_selection,
            start_date: self.start_date,
            end_date: self.end_date,
            adjustment_follow_dpdf: self.adjustment_follow_dpdf,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_defaults() {
        let args = HistoryArgs::new("AAPL US Equity", "PX_LAST", "20160101", "20160131");

        assert_eq!(args.periodicity_selection, "DAILY");
        assert_eq!(args.periodicity_adjustment, "Actual");
        assert_eq!(args.use_dpdf, 0);
        assert_eq!(args.debug, 0);
    }

    #[test]
    fn request_from_args_single_values() {
        let args = HistoryArgs::new("AAPL US Equity", "PX_OPEN", "20160101", "20160131")
            .with_periodicity_selection("WEEKLY")
            .with_periodicity_adjustment("Calendar")
            .with_use_dpdf(1);

        let request = HistoryRequest::from_args(&args);

        assert_eq!(request.securities, vec!["AAPL US Equity"]);
        assert_eq!(request.fields, vec!["PX_OPEN"]);
        assert_eq!(request.periodicity_selection, "WEEKLY");
        assert_eq!(request.periodicity_adjustment, "Calendar");
        assert_eq!(request.start_date, "20160101");
        assert_eq!(request.end_date, "20160131");
        assert!(request.adjustment_follow_dpdf);
    }

    #[test]
    fn empty_ticker_and_field_fall_back_to_defaults() {
        let request = HistoryRequest::from_args(&HistoryArgs::new("", "", "a", "b"));

        assert_eq!(request.securities, vec![DEFAULT_SECURITY]);
        assert_eq!(request.fields, vec![DEFAULT_FIELD]);
    }

    #[test]
    fn any_nonzero_dpdf_is_true() {
        let args = HistoryArgs::new("X", "Y", "", "").with_use_dpdf(-7);
        assert!(HistoryRequest::from_args(&args).adjustment_follow_dpdf);

        let args = HistoryArgs::new("X", "Y", "", "");
        assert!(!HistoryRequest::from_args(&args).adjustment_follow_dpdf);
    }

    #[test]
    fn malformed_dates_pass_through() {
        let args = HistoryArgs::new("X", "Y", "not-a-date", "");
        let request = HistoryRequest::from_args(&args);

        assert_eq!(request.start_date, "not-a-date");
        assert_eq!(request.end_date, "");
    }

    #[test]
    fn builder_keeps_order() {
        let request = HistoryRequest::builder()
            .security("A")
            .security("B")
            .field("F1")
            .field("F2")
            .build();

        assert_eq!(request.securities, vec!["A", "B"]);
        assert_eq!(request.fields, vec!["F1", "F2"]);
    }

    #[test]
    fn serializes_wire_names() {
        let request = HistoryRequest::from_args(&HistoryArgs::new("X", "Y", "s", "e"));
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["securities"][0], "X");
        assert_eq!(json["fields"][0], "Y");
        assert_eq!(json["periodicitySelection"], "DAILY");
        assert_eq!(json["periodicityAdjustment"], "Actual");
        assert_eq!(json["startDate"], "s");
        assert_eq!(json["endDate"], "e");
        assert_eq!(json["adjustmentFollowDPDF"], false);
    }

    #[test]
    fn display_as_element_block() {
        let request = HistoryRequest::from_args(&HistoryArgs::new("X", "Y", "s", "e"));
        let text = request.to_string();

        assert!(text.starts_with("HistoricalDataRequest = {\n"));
        assert!(text.contains("    securities[] = {\n        \"X\"\n    }\n"));
        assert!(text.contains("    adjustmentFollowDPDF = false\n"));
        assert!(text.ends_with("}\n"));
    }
}
