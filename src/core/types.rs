use serde::{Deserialize, Serialize};

/// Members younger than this are dependent children.
pub const CHILD_AGE_LIMIT: u32 = 18;
/// Members at or above this age fall into the elder archetypes.
pub const ELDER_AGE_MIN: u32 = 65;
/// Entered and displayed amounts are in units of ten thousand yen.
pub const DISPLAY_UNIT_YEN: f64 = 10_000.0;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Archetype {
    SingleYoung,
    SingleElder,
    MultiYoung,
    MultiElder,
    Child,
}

impl Archetype {
    /// Classification used for the surplus computation. Depends only on age
    /// and total household size, never on the lookup role labels.
    pub fn classify(age: u32, household_size: usize) -> Self {
        if age < CHILD_AGE_LIMIT {
            Archetype::Child
        } else if age < ELDER_AGE_MIN {
            if household_size == 1 {
                Archetype::SingleYoung
            } else {
                Archetype::MultiYoung
            }
        } else if household_size == 1 {
            Archetype::SingleElder
        } else {
            Archetype::MultiElder
        }
    }

    /// Reference dataset tags use `couple_*` for the multi-person archetypes.
    /// Unrecognized tags map to `None` and drop out of calibration.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "single_young" => Some(Archetype::SingleYoung),
            "single_elder" => Some(Archetype::SingleElder),
            "couple_young" => Some(Archetype::MultiYoung),
            "couple_elder" => Some(Archetype::MultiElder),
            "child" => Some(Archetype::Child),
            _ => None,
        }
    }
}

#[derive(Copy, Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BetaWeights {
    pub child: f64,
    pub elder: f64,
    pub multi_person: f64,
}

impl BetaWeights {
    /// Per-archetype multiplier. Single young adults are the unit reference;
    /// multi-person elders compose both discounts.
    pub fn weight(&self, archetype: Archetype) -> f64 {
        match archetype {
            Archetype::SingleYoung => 1.0,
            Archetype::SingleElder => self.elder,
            Archetype::MultiYoung => self.multi_person,
            Archetype::MultiElder => self.elder * self.multi_person,
            Archetype::Child => self.child,
        }
    }
}

impl Default for BetaWeights {
    fn default() -> Self {
        Self {
            child: 0.5,
            elder: 0.7,
            multi_person: 0.9,
        }
    }
}

#[derive(Copy, Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationParameters {
    pub alpha: f64,
    pub beta: BetaWeights,
}

impl Default for SimulationParameters {
    fn default() -> Self {
        Self {
            alpha: 0.85,
            beta: BetaWeights::default(),
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Female,
    Male,
    Other,
}

/// A household member as entered. Age and income stay free text until the
/// validation gate parses them for a computation pass.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: u64,
    pub name: String,
    pub age: String,
    pub income: String,
    pub gender: Gender,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Household {
    pub id: u64,
    pub name: String,
    pub members: Vec<Member>,
    #[serde(skip)]
    next_member_id: u64,
}

impl Household {
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            members: Vec::new(),
            next_member_id: 0,
        }
    }

    /// Appends a blank member and returns it. Member ids count up per
    /// household and are never reused after a deletion.
    pub fn add_member(&mut self) -> Member {
        self.next_member_id += 1;
        let member = Member {
            id: self.next_member_id,
            name: format!("Member {}", self.next_member_id),
            age: String::new(),
            income: String::new(),
            gender: Gender::Female,
        };
        self.members.push(member.clone());
        member
    }

    pub fn member_mut(&mut self, member_id: u64) -> Option<&mut Member> {
        self.members.iter_mut().find(|m| m.id == member_id)
    }

    pub fn remove_member(&mut self, member_id: u64) -> bool {
        let before = self.members.len();
        self.members.retain(|m| m.id != member_id);
        self.members.len() != before
    }
}

/// A member that passed the validation gate, with income converted to yen.
#[derive(Copy, Clone, Debug)]
pub struct ValidMember {
    pub age: u32,
    pub income: f64,
    pub gender: Gender,
}

/// Per-household outcome in display units (ten thousand yen).
#[derive(Copy, Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HouseholdResult {
    pub baseline_benefit: f64,
    pub surplus: f64,
    pub total: f64,
}

#[derive(Clone, Debug)]
pub struct ReferencePerson {
    pub household_key: String,
    pub archetype: Option<Archetype>,
    pub income: f64,
}

#[derive(Copy, Clone, Debug, Deserialize)]
pub struct AggregateTotals {
    pub actual_total: f64,
    #[serde(rename = "BI_total")]
    pub minimum_income_total: f64,
    pub income_actual_total: f64,
    pub allowance_actual_total: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn classify_child_boundary_at_eighteen() {
        assert_eq!(Archetype::classify(17, 1), Archetype::Child);
        assert_eq!(Archetype::classify(17, 3), Archetype::Child);
        assert_eq!(Archetype::classify(18, 1), Archetype::SingleYoung);
        assert_eq!(Archetype::classify(18, 3), Archetype::MultiYoung);
    }

    #[test]
    fn classify_elder_boundary_at_sixty_five() {
        assert_eq!(Archetype::classify(64, 1), Archetype::SingleYoung);
        assert_eq!(Archetype::classify(64, 2), Archetype::MultiYoung);
        assert_eq!(Archetype::classify(65, 1), Archetype::SingleElder);
        assert_eq!(Archetype::classify(65, 2), Archetype::MultiElder);
    }

    #[test]
    fn from_tag_maps_dataset_vocabulary() {
        assert_eq!(Archetype::from_tag("single_young"), Some(Archetype::SingleYoung));
        assert_eq!(Archetype::from_tag("single_elder"), Some(Archetype::SingleElder));
        assert_eq!(Archetype::from_tag("couple_young"), Some(Archetype::MultiYoung));
        assert_eq!(Archetype::from_tag("couple_elder"), Some(Archetype::MultiElder));
        assert_eq!(Archetype::from_tag("child"), Some(Archetype::Child));
        assert_eq!(Archetype::from_tag("widow_elder"), None);
        assert_eq!(Archetype::from_tag(""), None);
    }

    #[test]
    fn beta_weight_composes_elder_and_multi_person() {
        let beta = BetaWeights {
            child: 0.5,
            elder: 0.7,
            multi_person: 0.9,
        };
        assert_approx(beta.weight(Archetype::SingleYoung), 1.0);
        assert_approx(beta.weight(Archetype::SingleElder), 0.7);
        assert_approx(beta.weight(Archetype::MultiYoung), 0.9);
        assert_approx(beta.weight(Archetype::MultiElder), 0.63);
        assert_approx(beta.weight(Archetype::Child), 0.5);
    }

    #[test]
    fn member_ids_are_monotonic_and_never_reused() {
        let mut household = Household::new(1, "Household 1");
        let first = household.add_member();
        let second = household.add_member();
        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);

        assert!(household.remove_member(second.id));
        let third = household.add_member();
        assert_eq!(third.id, 3);
        assert!(!household.remove_member(second.id));
    }

    #[test]
    fn new_members_start_blank() {
        let mut household = Household::new(1, "Household 1");
        let member = household.add_member();
        assert_eq!(member.name, "Member 1");
        assert_eq!(member.age, "");
        assert_eq!(member.income, "");
        assert_eq!(member.gender, Gender::Female);
    }
}
