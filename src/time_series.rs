//! Validated hourly time series used as solver input.
use crate::error::InvalidInput;
use crate::id::{SeriesID, names_match};
use chrono::{NaiveDate, NaiveDateTime};
use indexmap::IndexMap;
use itertools::Itertools;
use std::fmt;

/// Formats accepted for timestamp labels, tried in order
const DATETIME_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%d-%m-%Y %H:%M",
    "%d/%m/%Y %H:%M",
];

/// Formats accepted for date-only labels, which are taken to mean midnight
const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%d-%m-%Y"];

/// The label of a single period
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PeriodLabel {
    /// The start of the period
    DateTime(NaiveDateTime),
    /// An integer index
    Index(i64),
}

impl PeriodLabel {
    /// Parse a period label, trying an integer index first and then timestamp formats.
    ///
    /// Returns `None` if the string is not a recognised label.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        if let Ok(index) = s.parse() {
            return Some(Self::Index(index));
        }

        DATETIME_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
            .or_else(|| {
                DATE_FORMATS
                    .iter()
                    .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
                    .and_then(|date| date.and_hms_opt(0, 0, 0))
            })
            .map(Self::DateTime)
    }

    /// Whether two labels are of the same kind
    fn same_kind(&self, other: &Self) -> bool {
        matches!(
            (self, other),
            (Self::DateTime(_), Self::DateTime(_)) | (Self::Index(_), Self::Index(_))
        )
    }
}

impl fmt::Display for PeriodLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
            Self::Index(index) => write!(f, "{index}"),
        }
    }
}

/// A sequence of periods, each with one value for every named series.
///
/// Periods are sorted by label and labels are unique. Every value is finite. There is always at
/// least one period.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesInput {
    labels: Vec<PeriodLabel>,
    series: IndexMap<SeriesID, Vec<f64>>,
}

impl TimeSeriesInput {
    /// Create a new [`TimeSeriesInput`], sorting the periods by label.
    ///
    /// # Arguments
    ///
    /// * `labels` - The label of each period
    /// * `series` - The values for each series, one per period and in the same order as `labels`
    pub fn new(
        labels: Vec<PeriodLabel>,
        series: IndexMap<SeriesID, Vec<f64>>,
    ) -> Result<Self, InvalidInput> {
        if labels.is_empty() {
            return Err(InvalidInput::EmptySeries);
        }
        if !labels.iter().all(|label| label.same_kind(&labels[0])) {
            return Err(InvalidInput::MixedPeriodKinds);
        }

        for (id, values) in &series {
            if values.len() != labels.len() {
                return Err(InvalidInput::LengthMismatch {
                    series: id.to_string(),
                    expected: labels.len(),
                    actual: values.len(),
                });
            }
            if let Some(idx) = values.iter().position(|value| !value.is_finite()) {
                return Err(InvalidInput::InvalidSeriesValue {
                    series: id.to_string(),
                    period: labels[idx].to_string(),
                    value: values[idx],
                });
            }
        }

        // Sort periods, keeping the values of every series aligned with their labels
        let order = (0..labels.len())
            .sorted_by_key(|&idx| labels[idx])
            .collect_vec();
        let labels = order.iter().map(|&idx| labels[idx]).collect_vec();
        if let Some((label, _)) = labels.iter().tuple_windows().find(|(a, b)| a == b) {
            return Err(InvalidInput::DuplicatePeriod(label.to_string()));
        }
        let series = series
            .into_iter()
            .map(|(id, values)| (id, order.iter().map(|&idx| values[idx]).collect()))
            .collect();

        Ok(Self { labels, series })
    }

    /// Create a time series with a single series, labelling the periods with consecutive indices
    pub fn from_values(name: &str, values: Vec<f64>) -> Result<Self, InvalidInput> {
        let labels = (0..values.len() as i64).map(PeriodLabel::Index).collect();
        Self::new(labels, IndexMap::from([(SeriesID::new(name), values)]))
    }

    /// The number of periods
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Whether there are no periods. Always false for a successfully constructed series.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// The period labels, in ascending order
    pub fn labels(&self) -> &[PeriodLabel] {
        &self.labels
    }

    /// The names of the series, in the order they were supplied
    pub fn series_names(&self) -> impl Iterator<Item = &SeriesID> {
        self.series.keys()
    }

    /// Get the values of the named series, matching the name case-insensitively
    pub fn series(&self, name: &str) -> Option<&[f64]> {
        self.series
            .iter()
            .find(|(id, _)| names_match(id.as_str(), name))
            .map(|(_, values)| values.as_slice())
    }

    /// Get the values of the named series, returning an error if it is not present
    pub fn require_series(&self, name: &str) -> Result<&[f64], InvalidInput> {
        self.series(name)
            .ok_or_else(|| InvalidInput::MissingSeries(name.to_string()))
    }

    /// A copy of this time series containing only the first `periods` periods.
    ///
    /// If there are fewer periods than requested, the whole series is returned.
    pub fn truncated(&self, periods: usize) -> Result<Self, InvalidInput> {
        if periods == 0 {
            return Err(InvalidInput::EmptySeries);
        }
        let periods = periods.min(self.len());

        Ok(Self {
            labels: self.labels[..periods].to_vec(),
            series: self
                .series
                .iter()
                .map(|(id, values)| (id.clone(), values[..periods].to_vec()))
                .collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error_matches;
    use rstest::rstest;

    fn datetime(s: &str) -> PeriodLabel {
        PeriodLabel::DateTime(NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap())
    }

    #[rstest]
    #[case("3", Some(PeriodLabel::Index(3)))]
    #[case(" -1 ", Some(PeriodLabel::Index(-1)))]
    #[case("2024-01-01 05:00:00", Some(datetime("2024-01-01 05:00:00")))]
    #[case("2024-01-01T05:00:00", Some(datetime("2024-01-01 05:00:00")))]
    #[case("2024-01-01 05:00", Some(datetime("2024-01-01 05:00:00")))]
    #[case("01-01-2024 05:00", Some(datetime("2024-01-01 05:00:00")))]
    #[case("2024-01-01", Some(datetime("2024-01-01 00:00:00")))]
    #[case("1.5", None)]
    #[case("yesterday", None)]
    #[case("", None)]
    fn test_period_label_parse(#[case] s: &str, #[case] expected: Option<PeriodLabel>) {
        assert_eq!(PeriodLabel::parse(s), expected);
    }

    #[test]
    fn test_period_label_display() {
        assert_eq!(
            datetime("2024-03-02 01:00:00").to_string(),
            "2024-03-02 01:00:00"
        );
        assert_eq!(PeriodLabel::Index(7).to_string(), "7");
    }

    #[test]
    fn test_new_sorts_periods() {
        let labels = vec![
            PeriodLabel::Index(2),
            PeriodLabel::Index(0),
            PeriodLabel::Index(1),
        ];
        let series = IndexMap::from([
            (SeriesID::new("wind"), vec![20.0, 0.0, 10.0]),
            (SeriesID::new("solar"), vec![2.0, 0.0, 1.0]),
        ]);
        let ts = TimeSeriesInput::new(labels, series).unwrap();

        assert_eq!(
            ts.labels(),
            [
                PeriodLabel::Index(0),
                PeriodLabel::Index(1),
                PeriodLabel::Index(2)
            ]
        );
        assert_eq!(ts.series("wind").unwrap(), [0.0, 10.0, 20.0]);
        assert_eq!(ts.series("SOLAR").unwrap(), [0.0, 1.0, 2.0]);
        assert_eq!(ts.len(), 3);
        assert!(ts.series("total").is_none());
    }

    #[test]
    fn test_new_empty() {
        assert_error_matches!(
            TimeSeriesInput::from_values("demand", vec![]),
            InvalidInput::EmptySeries
        );
    }

    #[test]
    fn test_new_duplicate_period() {
        let labels = vec![PeriodLabel::Index(1), PeriodLabel::Index(1)];
        let series = IndexMap::from([(SeriesID::new("demand"), vec![1.0, 2.0])]);
        assert_error_matches!(
            TimeSeriesInput::new(labels, series),
            InvalidInput::DuplicatePeriod(_)
        );
    }

    #[test]
    fn test_new_mixed_kinds() {
        let labels = vec![PeriodLabel::Index(1), datetime("2024-01-01 00:00:00")];
        let series = IndexMap::from([(SeriesID::new("demand"), vec![1.0, 2.0])]);
        assert_error_matches!(
            TimeSeriesInput::new(labels, series),
            InvalidInput::MixedPeriodKinds
        );
    }

    #[test]
    fn test_new_length_mismatch() {
        let labels = vec![PeriodLabel::Index(0), PeriodLabel::Index(1)];
        let series = IndexMap::from([(SeriesID::new("demand"), vec![1.0])]);
        assert_error_matches!(
            TimeSeriesInput::new(labels, series),
            InvalidInput::LengthMismatch {
                expected: 2,
                actual: 1,
                ..
            }
        );
    }

    #[rstest]
    #[case(f64::NAN)]
    #[case(f64::INFINITY)]
    fn test_new_non_finite(#[case] value: f64) {
        assert_error_matches!(
            TimeSeriesInput::from_values("demand", vec![1.0, value]),
            InvalidInput::InvalidSeriesValue { .. }
        );
    }

    #[test]
    fn test_require_series() {
        let ts = TimeSeriesInput::from_values("demand", vec![1.0]).unwrap();
        assert_eq!(ts.require_series("Demand").unwrap(), [1.0]);
        assert_error_matches!(
            ts.require_series("total"),
            InvalidInput::MissingSeries(_)
        );
    }

    #[test]
    fn test_truncated() {
        let ts = TimeSeriesInput::from_values("total", vec![1.0, 2.0, 3.0]).unwrap();
        assert_eq!(
            ts.truncated(2).unwrap().series("total").unwrap(),
            [1.0, 2.0]
        );
        assert_eq!(ts.truncated(10).unwrap(), ts);
        assert_error_matches!(ts.truncated(0), InvalidInput::EmptySeries);
    }
}
