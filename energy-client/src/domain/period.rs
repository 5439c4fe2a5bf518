use std::fmt;

use serde::{Deserialize, Serialize};

/// Concrete reporting years covered by the dataset.
pub const CONCRETE_YEARS: [i32; 5] = [2016, 2017, 2018, 2019, 2020];

/// Numeric tag carried by Total rows in the `Year Ending` column.
pub const TOTAL_TAG: i32 = 2015;

/// Numeric tag carried by Mean rows in the `Year Ending` column.
pub const MEAN_TAG: i32 = 2014;

/// Reporting period of a metric row: a concrete year or one of the
/// synthetic rollups materialized per building.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "PeriodRepr", into = "i32")]
pub enum Period {
    Year(i32),
    Total,
    Mean,
}

impl Period {
    /// Every period a query may select, concrete years first.
    pub fn all() -> Vec<Period> {
        CONCRETE_YEARS
            .iter()
            .map(|y| Period::Year(*y))
            .chain([Period::Total, Period::Mean])
            .collect()
    }

    pub fn tag(&self) -> i32 {
        match self {
            Period::Year(y) => *y,
            Period::Total => TOTAL_TAG,
            Period::Mean => MEAN_TAG,
        }
    }

    pub fn from_tag(tag: i32) -> Option<Period> {
        match tag {
            TOTAL_TAG => Some(Period::Total),
            MEAN_TAG => Some(Period::Mean),
            y if CONCRETE_YEARS.contains(&y) => Some(Period::Year(y)),
            _ => None,
        }
    }

    pub fn is_concrete(&self) -> bool {
        matches!(self, Period::Year(_))
    }

    /// Human-readable label used in page titles.
    pub fn label(&self) -> String {
        let first = CONCRETE_YEARS[0];
        let last = CONCRETE_YEARS[CONCRETE_YEARS.len() - 1];
        match self {
            Period::Year(y) => y.to_string(),
            Period::Total => format!("{first} - {last} (total)"),
            Period::Mean => format!("{first} - {last} (mean)"),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

impl From<Period> for i32 {
    fn from(p: Period) -> Self {
        p.tag()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum PeriodRepr {
    Tag(i32),
    Name(String),
}

impl TryFrom<PeriodRepr> for Period {
    type Error = String;

    fn try_from(repr: PeriodRepr) -> Result<Self, Self::Error> {
        match repr {
            PeriodRepr::Tag(tag) => {
                Period::from_tag(tag).ok_or_else(|| format!("unknown period tag {tag}"))
            }
            PeriodRepr::Name(name) => match name.as_str() {
                "Total" => Ok(Period::Total),
                "Mean" => Ok(Period::Mean),
                other => other
                    .parse::<i32>()
                    .ok()
                    .and_then(Period::from_tag)
                    .ok_or_else(|| format!("unknown period '{other}'")),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_tags_sort_below_concrete_years() {
        let mut periods = Period::all();
        periods.sort_by_key(|p| p.tag());
        assert_eq!(periods[0], Period::Mean);
        assert_eq!(periods[1], Period::Total);
        assert_eq!(periods.last(), Some(&Period::Year(2020)));
    }

    #[test]
    fn deserializes_tags_and_names() {
        let periods: Vec<Period> = serde_json::from_str(r#"[2018, 2015, "Mean", "2019"]"#).unwrap();
        assert_eq!(
            periods,
            vec![Period::Year(2018), Period::Total, Period::Mean, Period::Year(2019)]
        );
    }

    #[test]
    fn rejects_years_outside_the_dataset() {
        assert!(serde_json::from_str::<Period>("2013").is_err());
        assert!(serde_json::from_str::<Period>(r#""Median""#).is_err());
    }

    #[test]
    fn labels() {
        assert_eq!(Period::Year(2017).label(), "2017");
        assert_eq!(Period::Total.label(), "2016 - 2020 (total)");
        assert_eq!(Period::Mean.label(), "2016 - 2020 (mean)");
    }
}
