use crate::core::types::{AggregateTotals, ReferencePerson, SimulationParameters};

/// Incomes are normalized to this base before the power law is applied, so
/// the curve is anchored at one million yen.
pub const INCOME_SCALE: f64 = 1_000_000.0;

/// Concave income transform shared by calibration and the payout engine.
/// Non-positive incomes contribute nothing.
pub fn decayed_income(income: f64, alpha: f64) -> f64 {
    if income > 0.0 {
        INCOME_SCALE * (income / INCOME_SCALE).powf(alpha)
    } else {
        0.0
    }
}

/// Sum of beta-weighted decayed incomes over the reference population.
/// Persons without a household key or with an unrecognized archetype are
/// excluded, matching how the dataset was aggregated.
pub fn weighted_income_total(params: &SimulationParameters, persons: &[ReferencePerson]) -> f64 {
    let mut total = 0.0;
    for person in persons {
        if person.household_key.is_empty() {
            continue;
        }
        let Some(archetype) = person.archetype else {
            continue;
        };
        total += params.beta.weight(archetype) * decayed_income(person.income, params.alpha);
    }
    total
}

/// Budget-neutrality scalar: the gamma for which the minimum income plus the
/// gamma-scaled weighted surplus equals the actual benefit spend. A weighted
/// total of zero is degenerate and pins gamma to zero rather than dividing.
pub fn calibrate(
    params: &SimulationParameters,
    persons: &[ReferencePerson],
    totals: &AggregateTotals,
) -> f64 {
    let weighted = weighted_income_total(params, persons);
    if weighted == 0.0 {
        0.0
    } else {
        (totals.actual_total - totals.minimum_income_total) / weighted
    }
}
