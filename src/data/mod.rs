use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::core::{AggregateTotals, Archetype, ReferencePerson};
use crate::error::{SimError, SimResult};

pub const PERSONS_FILE: &str = "persons_10k_preprocessed.json";
pub const TOTALS_FILE: &str = "actual_total_dict.json";

/// Reference population and its pre-aggregated totals, loaded once at
/// startup and immutable afterwards.
#[derive(Clone, Debug)]
pub struct ReferenceData {
    pub persons: Vec<ReferencePerson>,
    pub totals: AggregateTotals,
}

/// On-disk person record. Every field may be absent in the preprocessed
/// dump, so each one defaults rather than failing the whole load.
#[derive(Deserialize)]
struct RawPerson {
    #[serde(default)]
    household_id: Option<String>,
    #[serde(rename = "世帯タイプ", default)]
    household_type: Option<String>,
    #[serde(rename = "収入_親", default)]
    income: Option<f64>,
}

impl From<RawPerson> for ReferencePerson {
    fn from(raw: RawPerson) -> Self {
        ReferencePerson {
            household_key: raw.household_id.unwrap_or_default(),
            archetype: raw.household_type.as_deref().and_then(Archetype::from_tag),
            income: raw.income.unwrap_or_default(),
        }
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> SimResult<T> {
    let text = fs::read_to_string(path).map_err(|source| SimError::DataRead {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|source| SimError::DataParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Loads both dataset files from `dir`. The persons file is keyed by person
/// id; only the values matter here.
pub fn load_reference_data(dir: &Path) -> SimResult<ReferenceData> {
    let raw: BTreeMap<String, RawPerson> = read_json(&dir.join(PERSONS_FILE))?;
    let persons = raw.into_values().map(ReferencePerson::from).collect();
    let totals = read_json(&dir.join(TOTALS_FILE))?;
    Ok(ReferenceData { persons, totals })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_fixture(dir: &Path, persons: &str, totals: &str) {
        fs::write(dir.join(PERSONS_FILE), persons).unwrap();
        fs::write(dir.join(TOTALS_FILE), totals).unwrap();
    }

    const TOTALS_JSON: &str = r#"{
        "actual_total": 9000000000.0,
        "BI_total": 4000000000.0,
        "income_actual_total": 7000000000.0,
        "allowance_actual_total": 2000000000.0
    }"#;

    #[test]
    fn loads_persons_and_totals() {
        let dir = tempfile::tempdir().unwrap();
        let persons = r#"{
            "p1": {"person_id": "p1", "household_id": "h1", "世帯タイプ": "single_young", "収入_親": 3000000.0, "年齢": 34},
            "p2": {"person_id": "p2", "household_id": "h1", "世帯タイプ": "child", "収入_親": 0.0, "年齢": 6},
            "p3": {"person_id": "p3", "household_id": "h2", "世帯タイプ": "couple_elder", "収入_親": 1500000.0, "年齢": 71}
        }"#;
        write_fixture(dir.path(), persons, TOTALS_JSON);

        let data = load_reference_data(dir.path()).unwrap();
        assert_eq!(data.persons.len(), 3);
        assert_eq!(data.persons[0].household_key, "h1");
        assert_eq!(data.persons[0].archetype, Some(Archetype::SingleYoung));
        assert_eq!(data.persons[2].archetype, Some(Archetype::MultiElder));
        assert_eq!(data.totals.actual_total, 9_000_000_000.0);
        assert_eq!(data.totals.minimum_income_total, 4_000_000_000.0);
    }

    #[test]
    fn tolerates_missing_and_unknown_fields() {
        let dir = tempfile::tempdir().unwrap();
        let persons = r#"{
            "p1": {"世帯タイプ": "widow_elder", "収入_親": 100.0},
            "p2": {"household_id": "h9"}
        }"#;
        write_fixture(dir.path(), persons, TOTALS_JSON);

        let data = load_reference_data(dir.path()).unwrap();
        assert_eq!(data.persons[0].household_key, "");
        assert_eq!(data.persons[0].archetype, None);
        assert_eq!(data.persons[1].household_key, "h9");
        assert_eq!(data.persons[1].income, 0.0);
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_reference_data(dir.path()).unwrap_err();
        assert!(matches!(err, SimError::DataRead { .. }));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path(), "{not json", TOTALS_JSON);
        let err = load_reference_data(dir.path()).unwrap_err();
        assert!(matches!(err, SimError::DataParse { .. }));
    }

    #[test]
    fn truncated_totals_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        write_fixture(dir.path(), "{}", r#"{"actual_total": 1.0}"#);
        let err = load_reference_data(dir.path()).unwrap_err();
        assert!(matches!(err, SimError::DataParse { .. }));
    }
}
