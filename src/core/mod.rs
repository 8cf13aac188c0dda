mod calibration;
mod curve;
mod payout;
mod types;

pub use calibration::{INCOME_SCALE, calibrate, decayed_income, weighted_income_total};
pub use curve::{CurvePoint, baseline_after_tax, income_curve, proposed_after_tax};
pub use payout::{
    Role, RoleAssignment, assemble_result, assign_roles, household_surplus, member_surplus,
    parent_average_income, validate_household,
};
pub use types::{
    AggregateTotals, Archetype, BetaWeights, CHILD_AGE_LIMIT, DISPLAY_UNIT_YEN, ELDER_AGE_MIN,
    Gender, Household, HouseholdResult, Member, ReferencePerson, SimulationParameters, ValidMember,
};
