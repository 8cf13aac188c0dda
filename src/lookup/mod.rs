use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::{Gender, Role, RoleAssignment, ValidMember};
use crate::error::{SimError, SimResult};

/// Period key the calculator expects on every dated fact.
pub const LOOKUP_PERIOD: &str = "2025-11-01";
/// Year birth dates are derived from.
pub const REFERENCE_YEAR: i32 = 2025;
pub const DEFAULT_ENDPOINT: &str = "https://openfisca-japan-ijgkugdoka-uc.a.run.app/calculate";

const BIRTH_KEY: &str = "ETERNITY";
const RESIDENCY_PREFECTURE: &str = "神奈川県";
const RESIDENCY_CITY: &str = "横浜市";

fn at_period<T>(value: T) -> BTreeMap<&'static str, T> {
    BTreeMap::from([(LOOKUP_PERIOD, value)])
}

/// Request body for the external benefit calculator. Field names follow its
/// Japanese schema.
#[derive(Debug, Serialize)]
pub struct LookupRequest {
    #[serde(rename = "世帯一覧")]
    households: HouseholdSection,
    #[serde(rename = "世帯員")]
    members: BTreeMap<String, MemberFacts>,
}

#[derive(Debug, Serialize)]
struct HouseholdSection {
    #[serde(rename = "世帯1")]
    primary: HouseholdFacts,
}

#[derive(Debug, Serialize)]
struct HouseholdFacts {
    #[serde(rename = "親一覧")]
    parents: Vec<String>,
    #[serde(rename = "子一覧")]
    children: Vec<String>,
    #[serde(rename = "祖父母一覧")]
    grandparents: Vec<String>,
    #[serde(rename = "居住都道府県")]
    prefecture: BTreeMap<&'static str, &'static str>,
    #[serde(rename = "居住市区町村")]
    city: BTreeMap<&'static str, &'static str>,
    #[serde(rename = "生活保護")]
    welfare: BTreeMap<&'static str, Option<f64>>,
    #[serde(rename = "児童手当")]
    child_allowance: BTreeMap<&'static str, Option<f64>>,
    #[serde(rename = "児童扶養手当_最小")]
    single_parent_allowance: BTreeMap<&'static str, Option<f64>>,
}

#[derive(Debug, Serialize)]
struct MemberFacts {
    #[serde(rename = "誕生年月日")]
    birth_date: BTreeMap<&'static str, String>,
    #[serde(rename = "性別")]
    gender: BTreeMap<&'static str, &'static str>,
    #[serde(rename = "収入")]
    income: BTreeMap<&'static str, u32>,
    #[serde(rename = "控除後所得")]
    income_after_deduction: BTreeMap<&'static str, Option<f64>>,
}

fn gender_label(gender: Gender) -> &'static str {
    match gender {
        Gender::Female => "女性",
        Gender::Male => "男性",
        Gender::Other => "その他",
    }
}

/// Builds the calculator request from validated members and their role
/// labels. Income facts are fixed placeholders; entered incomes only drive
/// the local surplus model.
pub fn build_lookup_request(members: &[ValidMember], roles: &[RoleAssignment]) -> LookupRequest {
    let mut parents = Vec::new();
    let mut children = Vec::new();
    let mut grandparents = Vec::new();
    let mut facts = BTreeMap::new();

    for (member, assignment) in members.iter().zip(roles) {
        match assignment.role {
            Role::Parent => parents.push(assignment.label.clone()),
            Role::Child => children.push(assignment.label.clone()),
            Role::Grandparent => grandparents.push(assignment.label.clone()),
        }
        // The validation gate admits any u32 age.
        let birth_year = i64::from(REFERENCE_YEAR) - i64::from(member.age);
        facts.insert(
            assignment.label.clone(),
            MemberFacts {
                birth_date: BTreeMap::from([(BIRTH_KEY, format!("{birth_year}-01-01"))]),
                gender: at_period(gender_label(member.gender)),
                income: at_period(0),
                income_after_deduction: at_period(None),
            },
        );
    }

    LookupRequest {
        households: HouseholdSection {
            primary: HouseholdFacts {
                parents,
                children,
                grandparents,
                prefecture: at_period(RESIDENCY_PREFECTURE),
                city: at_period(RESIDENCY_CITY),
                welfare: at_period(None),
                child_allowance: at_period(None),
                single_parent_allowance: at_period(None),
            },
        },
        members: facts,
    }
}

/// Monthly benefit amounts extracted from a lookup response, in yen.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct MonthlyBenefits {
    pub welfare: f64,
    pub child_allowance: f64,
    pub single_parent_allowance: f64,
}

impl MonthlyBenefits {
    pub fn monthly_total(&self) -> f64 {
        self.welfare + self.child_allowance + self.single_parent_allowance
    }

    pub fn annual_total(&self) -> f64 {
        self.monthly_total() * 12.0
    }
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(rename = "世帯一覧")]
    households: ResponseHouseholds,
}

#[derive(Debug, Deserialize)]
struct ResponseHouseholds {
    #[serde(rename = "世帯1")]
    primary: ResponseBenefits,
}

#[derive(Debug, Deserialize)]
struct ResponseBenefits {
    #[serde(rename = "生活保護", default)]
    welfare: BTreeMap<String, Option<f64>>,
    #[serde(rename = "児童手当", default)]
    child_allowance: BTreeMap<String, Option<f64>>,
    #[serde(rename = "児童扶養手当_最小", default)]
    single_parent_allowance: BTreeMap<String, Option<f64>>,
}

fn period_amount(map: &BTreeMap<String, Option<f64>>) -> f64 {
    map.get(LOOKUP_PERIOD).copied().flatten().unwrap_or(0.0)
}

impl LookupResponse {
    fn monthly_benefits(&self) -> MonthlyBenefits {
        let benefits = &self.households.primary;
        MonthlyBenefits {
            welfare: period_amount(&benefits.welfare),
            child_allowance: period_amount(&benefits.child_allowance),
            single_parent_allowance: period_amount(&benefits.single_parent_allowance),
        }
    }
}

/// Baseline benefit source. The computation pass issues one lookup per
/// complete household and never caches across passes.
#[async_trait::async_trait]
pub trait BaselineLookup: Send + Sync {
    async fn monthly_benefits(&self, request: &LookupRequest) -> SimResult<MonthlyBenefits>;
}

pub struct HttpBaselineLookup {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpBaselineLookup {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait::async_trait]
impl BaselineLookup for HttpBaselineLookup {
    async fn monthly_benefits(&self, request: &LookupRequest) -> SimResult<MonthlyBenefits> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SimError::LookupStatus { status, body });
        }
        let parsed = response.json::<LookupResponse>().await?;
        Ok(parsed.monthly_benefits())
    }
}
