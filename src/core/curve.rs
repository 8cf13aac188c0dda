use serde::Serialize;

use crate::core::calibration::decayed_income;
use crate::core::types::DISPLAY_UNIT_YEN;

struct TaxBracket {
    min: f64,
    max: f64,
    rate: f64,
    deduction: f64,
}

/// National income tax brackets with their flat deductions.
const INCOME_TAX_BRACKETS: [TaxBracket; 7] = [
    TaxBracket {
        min: 1_000.0,
        max: 1_949_000.0,
        rate: 0.05,
        deduction: 0.0,
    },
    TaxBracket {
        min: 1_950_000.0,
        max: 3_299_000.0,
        rate: 0.1,
        deduction: 97_500.0,
    },
    TaxBracket {
        min: 3_300_000.0,
        max: 6_949_000.0,
        rate: 0.2,
        deduction: 427_500.0,
    },
    TaxBracket {
        min: 6_950_000.0,
        max: 8_999_000.0,
        rate: 0.23,
        deduction: 636_000.0,
    },
    TaxBracket {
        min: 9_000_000.0,
        max: 17_999_000.0,
        rate: 0.33,
        deduction: 1_536_000.0,
    },
    TaxBracket {
        min: 18_000_000.0,
        max: 39_999_000.0,
        rate: 0.4,
        deduction: 2_796_000.0,
    },
    TaxBracket {
        min: 40_000_000.0,
        max: f64::INFINITY,
        rate: 0.45,
        deduction: 4_796_000.0,
    },
];

/// After-tax income under the current bracket table. Incomes below the first
/// bracket pass through untaxed.
pub fn baseline_after_tax(income: f64) -> f64 {
    for bracket in &INCOME_TAX_BRACKETS {
        if income >= bracket.min && income <= bracket.max {
            let tax = income * bracket.rate - bracket.deduction;
            return income - tax.max(0.0);
        }
    }
    income
}

pub fn proposed_after_tax(income: f64, alpha: f64) -> f64 {
    decayed_income(income, alpha)
}

/// One sample of the comparison curve, in display units.
#[derive(Copy, Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurvePoint {
    pub income: f64,
    pub baseline: f64,
    pub proposed: f64,
}

/// Samples both schedules on an even grid from zero to `max_income`
/// inclusive, yielding `points + 1` entries.
pub fn income_curve(alpha: f64, max_income: f64, points: u32) -> Vec<CurvePoint> {
    let points = points.max(1);
    let step = max_income / f64::from(points);
    (0..=points)
        .map(|i| {
            let income = step * f64::from(i);
            CurvePoint {
                income: income / DISPLAY_UNIT_YEN,
                baseline: baseline_after_tax(income) / DISPLAY_UNIT_YEN,
                proposed: proposed_after_tax(income, alpha) / DISPLAY_UNIT_YEN,
            }
        })
        .collect()
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
    fn incomes_below_the_first_bracket_are_untaxed() {
        assert_approx(baseline_after_tax(0.0), 0.0);
        assert_approx(baseline_after_tax(500.0), 500.0);
        assert_approx(baseline_after_tax(999.0), 999.0);
    }

    #[test]
    fn after_tax_income_matches_the_bracket_table() {
        assert_approx(baseline_after_tax(1_000_000.0), 950_000.0);
        assert_approx(baseline_after_tax(2_000_000.0), 1_897_500.0);
        assert_approx(baseline_after_tax(5_000_000.0), 4_427_500.0);
        assert_approx(baseline_after_tax(10_000_000.0), 8_236_000.0);
        assert_approx(baseline_after_tax(50_000_000.0), 32_296_000.0);
    }

    #[test]
    fn after_tax_income_never_exceeds_gross_income() {
        for income in [1_000.0, 1_950_000.0, 3_300_000.0, 9_000_000.0, 40_000_000.0] {
            assert!(baseline_after_tax(income) <= income);
        }
    }

    #[test]
    fn curve_spans_zero_to_max_inclusive() {
        let curve = income_curve(0.85, 50_000_000.0, 100);
        assert_eq!(curve.len(), 101);
        assert_approx(curve[0].income, 0.0);
        assert_approx(curve[0].baseline, 0.0);
        assert_approx(curve[0].proposed, 0.0);
        assert_approx(curve[100].income, 5_000.0);
        assert_approx(curve[100].baseline, 3_229.6);
    }

    #[test]
    fn curve_point_count_is_clamped_to_at_least_one_step() {
        let curve = income_curve(0.85, 1_000_000.0, 0);
        assert_eq!(curve.len(), 2);
    }

    #[test]
    fn proposed_schedule_with_unit_alpha_is_identity() {
        let curve = income_curve(1.0, 2_000_000.0, 4);
        for point in &curve {
            assert_approx(point.proposed, point.income);
        }
    }
}
