use crate::models::VisitRecord;
use serde::{Serialize, Serializer};
use std::{collections::BTreeMap, fmt, str::FromStr};
use tracing::debug;

pub const ADULT_PRICE: u64 = 3;
pub const CHILD_PRICE: u64 = 2;
pub const TOTAL_LABEL: &str = "TOTAL";
pub const ALL_DATES: &str = "all";

/// Either every record or only the records of one date.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DateFilter {
    #[default]
    All,
    Date(String),
}

impl DateFilter {
    /// Blank input selects everything.
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            None | Some("") => Self::All,
            Some(value) if value == ALL_DATES => Self::All,
            Some(value) => Self::Date(value.to_string()),
        }
    }

    pub fn matches(&self, record: &VisitRecord) -> bool {
        match self {
            Self::All => true,
            Self::Date(date) => record.date.as_deref() == Some(date.as_str()),
        }
    }
}

impl FromStr for DateFilter {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::parse(Some(s)))
    }
}

impl fmt::Display for DateFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::All => f.write_str(ALL_DATES),
            Self::Date(date) => f.write_str(date),
        }
    }
}

impl Serialize for DateFilter {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A half-hour slot of the day, ordered chronologically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TimeBucket {
    hour: u8,
    half: bool,
}

impl TimeBucket {
    pub const MIDNIGHT: Self = Self { hour: 0, half: false };

    pub fn new(hour: u8, minute: u8) -> Option<Self> {
        if hour > 23 || minute > 59 {
            return None;
        }
        Some(Self {
            hour,
            half: minute >= 30,
        })
    }

    /// Parses an `H:M` time of day. Malformed input is an error, see [`TimeBucket::for_time`].
    pub fn parse(time: &str) -> Result<Self, MalformedTime> {
        let malformed = || MalformedTime(time.to_string());
        let (hour, minute) = time.split_once(':').ok_or_else(malformed)?;
        if minute.contains(':') {
            return Err(malformed());
        }
        let hour: u8 = hour.trim().parse().map_err(|_| malformed())?;
        let minute: u8 = minute.trim().parse().map_err(|_| malformed())?;
        Self::new(hour, minute).ok_or_else(malformed)
    }

    /// Missing or malformed times fall into the midnight slot.
    pub fn for_time(time: Option<&str>) -> Self {
        match time.map(Self::parse) {
            Some(Ok(bucket)) => bucket,
            _ => Self::MIDNIGHT,
        }
    }

    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for TimeBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.hour, if self.half { 30 } else { 0 })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("malformed time of day: {0:?}")]
pub struct MalformedTime(pub String);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no records for date filter {0}")]
pub struct NoDataForFilter(pub DateFilter);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Adult,
    Child,
}

/// Substring classifier over free-text descriptions.
#[derive(Debug, Clone)]
pub struct Classifier {
    child_keywords: Vec<String>,
}

impl Classifier {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let child_keywords = keywords
            .into_iter()
            .map(|keyword| keyword.as_ref().trim().to_lowercase())
            .filter(|keyword| !keyword.is_empty())
            .collect();
        Self { child_keywords }
    }

    pub fn keywords(&self) -> &[String] {
        &self.child_keywords
    }

    pub fn classify(&self, description: Option<&str>) -> Category {
        let description = description.unwrap_or_default().to_lowercase();
        if self
            .child_keywords
            .iter()
            .any(|keyword| description.contains(keyword.as_str()))
        {
            Category::Child
        } else {
            Category::Adult
        }
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(["child", "bamb"])
    }
}

/// Counts and revenue for one slot, or for the whole selection when it is the total row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BucketAggregate {
    pub bucket: String,
    pub adults: u64,
    pub children: u64,
    pub total: u64,
    pub adult_revenue: u64,
    pub child_revenue: u64,
    pub total_revenue: u64,
}

impl BucketAggregate {
    pub fn from_counts(bucket: impl Into<String>, adults: u64, children: u64) -> Self {
        let adult_revenue = adults.saturating_mul(ADULT_PRICE);
        let child_revenue = children.saturating_mul(CHILD_PRICE);
        Self {
            bucket: bucket.into(),
            adults,
            children,
            total: adults.saturating_add(children),
            adult_revenue,
            child_revenue,
            total_revenue: adult_revenue.saturating_add(child_revenue),
        }
    }

    fn add_assign(&mut self, other: &Self) {
        self.adults = self.adults.saturating_add(other.adults);
        self.children = self.children.saturating_add(other.children);
        self.total = self.total.saturating_add(other.total);
        self.adult_revenue = self.adult_revenue.saturating_add(other.adult_revenue);
        self.child_revenue = self.child_revenue.saturating_add(other.child_revenue);
        self.total_revenue = self.total_revenue.saturating_add(other.total_revenue);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Aggregation {
    pub buckets: Vec<BucketAggregate>,
    pub total: BucketAggregate,
}

impl Aggregation {
    /// Bucket rows followed by the total row.
    pub fn rows(&self) -> impl Iterator<Item = &BucketAggregate> {
        self.buckets.iter().chain(std::iter::once(&self.total))
    }
}

pub fn aggregate(
    records: &[VisitRecord],
    filter: &DateFilter,
    classifier: &Classifier,
) -> Result<Aggregation, NoDataForFilter> {
    let mut counts: BTreeMap<TimeBucket, (u64, u64)> = BTreeMap::new();
    for record in records.iter().filter(|record| filter.matches(record)) {
        let bucket = TimeBucket::for_time(record.time.as_deref());
        let entry = counts.entry(bucket).or_default();
        match classifier.classify(record.description.as_deref()) {
            Category::Adult => entry.0 += 1,
            Category::Child => entry.1 += 1,
        }
    }

    if counts.is_empty() {
        return Err(NoDataForFilter(filter.clone()));
    }

    let buckets: Vec<BucketAggregate> = counts
        .into_iter()
        .map(|(bucket, (adults, children))| BucketAggregate::from_counts(bucket.label(), adults, children))
        .collect();

    let mut total = BucketAggregate::from_counts(TOTAL_LABEL, 0, 0);
    for bucket in &buckets {
        total.add_assign(bucket);
    }

    debug!(%filter, buckets = buckets.len(), customers = total.total, "aggregated visits");

    Ok(Aggregation { buckets, total })
}
