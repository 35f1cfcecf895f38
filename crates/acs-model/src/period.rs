//! Aggregation periods
//!
//! KPIs are computed over 15-minute, hourly or daily windows. Any other value
//! is rejected at construction, deserialization and setter time.

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// Aggregation window of a KPI, in minutes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum AggregationPeriod {
    /// 15 minutes
    Quarter,
    /// 60 minutes
    Hour,
    /// 1440 minutes
    Day,
}

impl AggregationPeriod {
    /// Permitted period values in minutes
    pub const PERMITTED: [u32; 3] = [15, 60, 1440];

    /// Period length in minutes
    #[inline]
    #[must_use]
    pub const fn minutes(self) -> u32 {
        match self {
            Self::Quarter => 15,
            Self::Hour => 60,
            Self::Day => 1440,
        }
    }

    /// Resolve the effective period: reference override, else KPI default,
    /// else the process default
    #[inline]
    #[must_use]
    pub fn effective(
        override_period: Option<Self>,
        kpi_default: Option<Self>,
        process_default: Self,
    ) -> Self {
        override_period.or(kpi_default).unwrap_or(process_default)
    }
}

impl Default for AggregationPeriod {
    fn default() -> Self {
        Self::Quarter
    }
}

impl TryFrom<u32> for AggregationPeriod {
    type Error = ValidationError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            15 => Ok(Self::Quarter),
            60 => Ok(Self::Hour),
            1440 => Ok(Self::Day),
            other => Err(ValidationError::InvalidAggregationPeriod { value: other }),
        }
    }
}

impl From<AggregationPeriod> for u32 {
    fn from(period: AggregationPeriod) -> Self {
        period.minutes()
    }
}

impl Display for AggregationPeriod {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.minutes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn permitted_values_round_trip() {
        for value in AggregationPeriod::PERMITTED {
            let period = AggregationPeriod::try_from(value).unwrap();
            assert_eq!(period.minutes(), value);
        }
    }

    #[test]
    fn five_minutes_is_rejected() {
        let err = AggregationPeriod::try_from(5).unwrap_err();
        assert!(err.to_string().contains("[15, 60, 1440]"));
    }

    #[test]
    fn effective_prefers_override_then_default() {
        let hour = Some(AggregationPeriod::Hour);
        let day = Some(AggregationPeriod::Day);
        assert_eq!(
            AggregationPeriod::effective(hour, day, AggregationPeriod::Quarter),
            AggregationPeriod::Hour
        );
        assert_eq!(
            AggregationPeriod::effective(None, day, AggregationPeriod::Quarter),
            AggregationPeriod::Day
        );
        assert_eq!(
            AggregationPeriod::effective(None, None, AggregationPeriod::Quarter),
            AggregationPeriod::Quarter
        );
    }

    #[test]
    fn deserialize_rejects_out_of_domain() {
        assert!(serde_json::from_str::<AggregationPeriod>("60").is_ok());
        assert!(serde_json::from_str::<AggregationPeriod>("30").is_err());
    }

    proptest! {
        #[test]
        fn prop_period_accepted_iff_permitted(value in 0u32..3000) {
            let accepted = AggregationPeriod::try_from(value).is_ok();
            prop_assert_eq!(accepted, AggregationPeriod::PERMITTED.contains(&value));
        }
    }
}
