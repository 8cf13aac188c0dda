use crate::core::calibration::decayed_income;
use crate::core::types::{
    Archetype, CHILD_AGE_LIMIT, DISPLAY_UNIT_YEN, Household, HouseholdResult, Member,
    SimulationParameters, ValidMember,
};

/// At most this many adults are labelled as parents; later adults become
/// grandparents regardless of age.
const MAX_PARENTS: usize = 2;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Role {
    Parent,
    Child,
    Grandparent,
}

/// Role and label for one member, positionally aligned with the validated
/// member slice it was derived from.
#[derive(Clone, Debug)]
pub struct RoleAssignment {
    pub role: Role,
    pub label: String,
}

/// Assigns lookup roles in entry order: minors are children, the first two
/// adults are parents, any further adult is a grandparent. Labels number each
/// role independently.
pub fn assign_roles(members: &[ValidMember]) -> Vec<RoleAssignment> {
    let mut parents = 0;
    let mut children = 0;
    let mut grandparents = 0;
    members
        .iter()
        .map(|member| {
            if member.age < CHILD_AGE_LIMIT {
                children += 1;
                RoleAssignment {
                    role: Role::Child,
                    label: format!("child-{children}"),
                }
            } else if parents < MAX_PARENTS {
                parents += 1;
                RoleAssignment {
                    role: Role::Parent,
                    label: format!("parent-{parents}"),
                }
            } else {
                grandparents += 1;
                RoleAssignment {
                    role: Role::Grandparent,
                    label: format!("grandparent-{grandparents}"),
                }
            }
        })
        .collect()
}

fn validate_member(member: &Member) -> Option<ValidMember> {
    let age_text = member.age.trim();
    let income_text = member.income.trim();
    if age_text.is_empty() || income_text.is_empty() {
        return None;
    }
    let age = age_text.parse::<u32>().ok()?;
    // Unparseable income falls back to zero rather than blocking the pass.
    let income = match income_text.parse::<f64>() {
        Ok(value) if value.is_finite() => value * DISPLAY_UNIT_YEN,
        _ => 0.0,
    };
    Some(ValidMember {
        age,
        income,
        gender: member.gender,
    })
}

/// Validation gate: every member needs a parseable age and a non-blank
/// income before the household takes part in a computation pass.
pub fn validate_household(household: &Household) -> Option<Vec<ValidMember>> {
    household.members.iter().map(validate_member).collect()
}

/// Mean income over the members labelled as parents, in yen. Zero when the
/// household has no parents.
pub fn parent_average_income(members: &[ValidMember], roles: &[RoleAssignment]) -> f64 {
    let mut total = 0.0;
    let mut count = 0usize;
    for (member, assignment) in members.iter().zip(roles) {
        if assignment.role == Role::Parent {
            total += member.income;
            count += 1;
        }
    }
    if count == 0 {
        0.0
    } else {
        total / count as f64
    }
}

pub fn member_surplus(
    income: f64,
    archetype: Archetype,
    params: &SimulationParameters,
    gamma: f64,
) -> f64 {
    gamma * params.beta.weight(archetype) * decayed_income(income, params.alpha)
}

/// Total surplus for a household in yen. Children are attributed the parental
/// average income instead of their own entry.
pub fn household_surplus(
    members: &[ValidMember],
    roles: &[RoleAssignment],
    params: &SimulationParameters,
    gamma: f64,
) -> f64 {
    let size = members.len();
    let parent_average = parent_average_income(members, roles);
    members
        .iter()
        .map(|member| {
            let archetype = Archetype::classify(member.age, size);
            let income = if archetype == Archetype::Child {
                parent_average
            } else {
                member.income
            };
            member_surplus(income, archetype, params, gamma)
        })
        .sum()
}

pub fn assemble_result(baseline_yen: f64, surplus_yen: f64) -> HouseholdResult {
    HouseholdResult {
        baseline_benefit: baseline_yen / DISPLAY_UNIT_YEN,
        surplus: surplus_yen / DISPLAY_UNIT_YEN,
        total: (baseline_yen + surplus_yen) / DISPLAY_UNIT_YEN,
    }
}
