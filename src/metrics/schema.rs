//! The fixed metric schema
//!
//! Every snapshot carries the same 85 measurements per brand. The table at the
//! bottom of this file is the single source of truth: it generates the
//! [`MetricRecord`] fields, their source column names and their kinds.

use serde::{Deserialize, Serialize};

/// How a metric is measured and rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    /// `_pct` columns: share of respondents, expected in [0, 100]
    Percent,
    /// `_C` columns: composite score, unranged and unitless
    Composite,
}

impl MetricKind {
    pub fn unit(&self) -> &'static str {
        match self {
            MetricKind::Percent => "%",
            MetricKind::Composite => "",
        }
    }

    /// Inclusive range values are expected to fall in, if any
    pub fn expected_range(&self) -> Option<(f64, f64)> {
        match self {
            MetricKind::Percent => Some((0.0, 100.0)),
            MetricKind::Composite => None,
        }
    }

    pub fn in_range(&self, value: f64) -> bool {
        match self.expected_range() {
            Some((lo, hi)) => (lo..=hi).contains(&value),
            None => true,
        }
    }

    /// Render a value with this kind's unit; absent values render as `-`
    pub fn format(&self, value: Option<f64>) -> String {
        match value {
            Some(v) => format!("{}{}", trim_float(v), self.unit()),
            None => "-".to_string(),
        }
    }
}

/// Shortest decimal form, at most two fractional digits
fn trim_float(v: f64) -> String {
    let s = format!("{:.2}", v);
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" {
        "0".to_string()
    } else {
        s.to_string()
    }
}

/// A named metric column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MetricColumn {
    pub name: &'static str,
    pub kind: MetricKind,
}

impl MetricColumn {
    /// Look up a column by name, ignoring case
    pub fn find(name: &str) -> Option<&'static MetricColumn> {
        let name = name.trim();
        METRIC_COLUMNS
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }
}

macro_rules! metric_schema {
    ($( $field:ident => $column:literal, $kind:ident; )*) => {
        /// One brand's measurements for one period
        ///
        /// `None` means "not measured" and is distinct from a measured zero.
        #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
        pub struct MetricRecord {
            $(
                #[serde(rename = $column, default)]
                pub $field: Option<f64>,
            )*
        }

        /// Every metric column, in schema order
        pub static METRIC_COLUMNS: &[MetricColumn] = &[
            $( MetricColumn { name: $column, kind: MetricKind::$kind }, )*
        ];

        impl MetricRecord {
            /// Build a record by asking `lookup` for each column in schema order
            pub fn from_lookup(mut lookup: impl FnMut(&'static MetricColumn) -> Option<f64>) -> Self {
                let mut columns = METRIC_COLUMNS.iter();
                Self {
                    $( $field: columns.next().and_then(&mut lookup), )*
                }
            }

            /// Value of a column by its exact source name
            pub fn get(&self, column: &str) -> Option<f64> {
                match column {
                    $( $column => self.$field, )*
                    _ => None,
                }
            }

            /// Every column paired with its value, in schema order
            pub fn values(&self) -> impl Iterator<Item = (&'static MetricColumn, Option<f64>)> {
                METRIC_COLUMNS.iter().zip([ $( self.$field ),* ])
            }
        }
    };
}

metric_schema! {
    total_aware_pct => "Total_Aware_pct", Percent;
    total_familiar_pct => "Total_Familiar_pct", Percent;
    total_users_pct => "Total_Users_pct", Percent;
    total_prefer_pct => "Total_Prefer_pct", Percent;
    total_consider_pct => "Total_Consider_pct", Percent;
    total_recommend_pct => "Total_Recommend_pct", Percent;
    total_trust_pct => "Total_Trust_pct", Percent;
    total_satisfied_pct => "Total_Satisfied_pct", Percent;
    total_loyal_pct => "Total_Loyal_pct", Percent;
    total_purchase_intent_pct => "Total_Purchase_Intent_pct", Percent;
    total_ad_recall_pct => "Total_Ad_Recall_pct", Percent;
    total_buzz_pct => "Total_Buzz_pct", Percent;
    total_index_c => "Total_Index_C", Composite;
    total_equity_c => "Total_Equity_C", Composite;
    total_momentum_c => "Total_Momentum_C", Composite;
    total_health_c => "Total_Health_C", Composite;
    total_engagement_c => "Total_Engagement_C", Composite;
    male_aware_pct => "Male_Aware_pct", Percent;
    male_familiar_pct => "Male_Familiar_pct", Percent;
    male_users_pct => "Male_Users_pct", Percent;
    male_prefer_pct => "Male_Prefer_pct", Percent;
    male_consider_pct => "Male_Consider_pct", Percent;
    male_recommend_pct => "Male_Recommend_pct", Percent;
    male_trust_pct => "Male_Trust_pct", Percent;
    male_satisfied_pct => "Male_Satisfied_pct", Percent;
    male_loyal_pct => "Male_Loyal_pct", Percent;
    male_purchase_intent_pct => "Male_Purchase_Intent_pct", Percent;
    male_ad_recall_pct => "Male_Ad_Recall_pct", Percent;
    male_buzz_pct => "Male_Buzz_pct", Percent;
    male_index_c => "Male_Index_C", Composite;
    male_equity_c => "Male_Equity_C", Composite;
    male_momentum_c => "Male_Momentum_C", Composite;
    male_health_c => "Male_Health_C", Composite;
    male_engagement_c => "Male_Engagement_C", Composite;
    female_aware_pct => "Female_Aware_pct", Percent;
    female_familiar_pct => "Female_Familiar_pct", Percent;
    female_users_pct => "Female_Users_pct", Percent;
    female_prefer_pct => "Female_Prefer_pct", Percent;
    female_consider_pct => "Female_Consider_pct", Percent;
    female_recommend_pct => "Female_Recommend_pct", Percent;
    female_trust_pct => "Female_Trust_pct", Percent;
    female_satisfied_pct => "Female_Satisfied_pct", Percent;
    female_loyal_pct => "Female_Loyal_pct", Percent;
    female_purchase_intent_pct => "Female_Purchase_Intent_pct", Percent;
    female_ad_recall_pct => "Female_Ad_Recall_pct", Percent;
    female_buzz_pct => "Female_Buzz_pct", Percent;
    female_index_c => "Female_Index_C", Composite;
    female_equity_c => "Female_Equity_C", Composite;
    female_momentum_c => "Female_Momentum_C", Composite;
    female_health_c => "Female_Health_C", Composite;
    female_engagement_c => "Female_Engagement_C", Composite;
    age18_34_aware_pct => "Age18_34_Aware_pct", Percent;
    age18_34_familiar_pct => "Age18_34_Familiar_pct", Percent;
    age18_34_users_pct => "Age18_34_Users_pct", Percent;
    age18_34_prefer_pct => "Age18_34_Prefer_pct", Percent;
    age18_34_consider_pct => "Age18_34_Consider_pct", Percent;
    age18_34_recommend_pct => "Age18_34_Recommend_pct", Percent;
    age18_34_trust_pct => "Age18_34_Trust_pct", Percent;
    age18_34_satisfied_pct => "Age18_34_Satisfied_pct", Percent;
    age18_34_loyal_pct => "Age18_34_Loyal_pct", Percent;
    age18_34_purchase_intent_pct => "Age18_34_Purchase_Intent_pct", Percent;
    age18_34_ad_recall_pct => "Age18_34_Ad_Recall_pct", Percent;
    age18_34_buzz_pct => "Age18_34_Buzz_pct", Percent;
    age18_34_index_c => "Age18_34_Index_C", Composite;
    age18_34_equity_c => "Age18_34_Equity_C", Composite;
    age18_34_momentum_c => "Age18_34_Momentum_C", Composite;
    age18_34_health_c => "Age18_34_Health_C", Composite;
    age18_34_engagement_c => "Age18_34_Engagement_C", Composite;
    age35_plus_aware_pct => "Age35_Plus_Aware_pct", Percent;
    age35_plus_familiar_pct => "Age35_Plus_Familiar_pct", Percent;
    age35_plus_users_pct => "Age35_Plus_Users_pct", Percent;
    age35_plus_prefer_pct => "Age35_Plus_Prefer_pct", Percent;
    age35_plus_consider_pct => "Age35_Plus_Consider_pct", Percent;
    age35_plus_recommend_pct => "Age35_Plus_Recommend_pct", Percent;
    age35_plus_trust_pct => "Age35_Plus_Trust_pct", Percent;
    age35_plus_satisfied_pct => "Age35_Plus_Satisfied_pct", Percent;
    age35_plus_loyal_pct => "Age35_Plus_Loyal_pct", Percent;
    age35_plus_purchase_intent_pct => "Age35_Plus_Purchase_Intent_pct", Percent;
    age35_plus_ad_recall_pct => "Age35_Plus_Ad_Recall_pct", Percent;
    age35_plus_buzz_pct => "Age35_Plus_Buzz_pct", Percent;
    age35_plus_index_c => "Age35_Plus_Index_C", Composite;
    age35_plus_equity_c => "Age35_Plus_Equity_C", Composite;
    age35_plus_momentum_c => "Age35_Plus_Momentum_C", Composite;
    age35_plus_health_c => "Age35_Plus_Health_C", Composite;
    age35_plus_engagement_c => "Age35_Plus_Engagement_C", Composite;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_has_85_unique_columns() {
        assert_eq!(METRIC_COLUMNS.len(), 85);
        let mut names: Vec<&str> = METRIC_COLUMNS.iter().map(|c| c.name).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 85);
    }

    #[test]
    fn test_kind_matches_suffix() {
        for column in METRIC_COLUMNS {
            let expected = if column.name.ends_with("_pct") {
                MetricKind::Percent
            } else {
                assert!(column.name.ends_with("_C"), "{}", column.name);
                MetricKind::Composite
            };
            assert_eq!(column.kind, expected, "{}", column.name);
        }
        let percent = METRIC_COLUMNS.iter().filter(|c| c.kind == MetricKind::Percent).count();
        assert_eq!(percent, 60);
    }

    #[test]
    fn test_from_lookup_fills_matching_fields() {
        let record = MetricRecord::from_lookup(|c| match c.name {
            "Total_Users_pct" => Some(61.18),
            "Female_Equity_C" => Some(-3.5),
            _ => None,
        });
        assert_eq!(record.total_users_pct, Some(61.18));
        assert_eq!(record.female_equity_c, Some(-3.5));
        assert_eq!(record.total_prefer_pct, None);
        assert_eq!(record.get("Total_Users_pct"), Some(61.18));
        assert_eq!(record.get("Not_A_Column"), None);
    }

    #[test]
    fn test_values_follow_schema_order() {
        let record = MetricRecord {
            total_aware_pct: Some(12.0),
            ..Default::default()
        };
        let (column, value) = record.values().next().unwrap();
        assert_eq!(column.name, "Total_Aware_pct");
        assert_eq!(value, Some(12.0));
        assert_eq!(record.values().filter(|(_, v)| v.is_some()).count(), 1);
    }

    #[test]
    fn test_serializes_with_source_column_names() {
        let record = MetricRecord {
            total_users_pct: Some(61.18),
            ..Default::default()
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["Total_Users_pct"], 61.18);
        assert!(json["Total_Prefer_pct"].is_null());

        let back: MetricRecord =
            serde_json::from_str(r#"{"Total_Users_pct": 61.18, "Total_Prefer_pct": 0}"#).unwrap();
        assert_eq!(back.total_users_pct, Some(61.18));
        assert_eq!(back.total_prefer_pct, Some(0.0));
        assert_eq!(back.male_buzz_pct, None);
    }

    #[test]
    fn test_format_uses_unit() {
        assert_eq!(MetricKind::Percent.format(Some(61.18)), "61.18%");
        assert_eq!(MetricKind::Percent.format(Some(0.0)), "0%");
        assert_eq!(MetricKind::Composite.format(Some(12.5)), "12.5");
        assert_eq!(MetricKind::Composite.format(None), "-");
    }

    #[test]
    fn test_column_find_ignores_case() {
        let column = MetricColumn::find("total_users_PCT").unwrap();
        assert_eq!(column.name, "Total_Users_pct");
        assert!(MetricColumn::find("Brand name").is_none());
    }
}
