use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Merged output document, keyed by chart name.
pub type ChartSet = BTreeMap<String, ChartConfig>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartSettings {
    pub title: String,
    #[serde(rename = "xCategories")]
    pub x_categories: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartConfig {
    pub settings: ChartSettings,
    pub data: BTreeMap<String, Vec<u64>>,
}

impl ChartConfig {
    /// Every series is aligned with the category axis and categories are strictly increasing.
    pub fn is_well_formed(&self) -> bool {
        let categories = &self.settings.x_categories;
        let sorted = categories.windows(2).all(|pair| pair[0] < pair[1]);
        sorted
            && self
                .data
                .values()
                .all(|series| series.len() == categories.len())
    }

    pub fn series(&self, name: &str) -> Option<&[u64]> {
        self.data.get(name).map(Vec::as_slice)
    }

    /// Count for `category` in the named series.
    pub fn value(&self, series: &str, category: &str) -> Option<u64> {
        let index = self
            .settings
            .x_categories
            .iter()
            .position(|item| item == category)?;
        self.data.get(series)?.get(index).copied()
    }
}

pub fn generate_chart_config(
    counts: &BTreeMap<String, u64>,
    series: &str,
    title: &str,
) -> ChartConfig {
    let mut categories = counts.keys().cloned().collect::<Vec<_>>();
    categories.sort();

    // values must follow category order
    let values = categories
        .iter()
        .map(|category| counts[category])
        .collect::<Vec<_>>();

    let mut data = BTreeMap::new();
    data.insert(series.to_string(), values);

    ChartConfig {
        settings: ChartSettings {
            title: title.to_string(),
            x_categories: categories,
        },
        data,
    }
}

/// Adds `other` into `target`; a chart name present in both keeps the one from `other`.
pub fn merge_charts(target: &mut ChartSet, other: ChartSet) {
    target.extend(other);
}
