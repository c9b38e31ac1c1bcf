//! Risk Assessment Engine
//!
//! Deterministic underwriting rules for loan applications. This is a pure
//! function of its inputs: no I/O, no clock, no randomness, so the same
//! application always yields the same decision. It runs in-process; the
//! decision capability only sees its rendered text through the
//! `assess_loan_risk` tool.

use crate::error::{OrchestrationError, Result};
use crate::models::{RiskDecision, RiskVerdict};

/// Fraction of the principal treated as the estimated monthly payment.
const PAYMENT_RATE: f64 = 0.05;

/// Scores below this are rejected outright.
const MIN_CREDIT_SCORE: i64 = 600;

/// Scores at or above this qualify for automated approval.
const PRIME_CREDIT_SCORE: i64 = 700;

/// Debt-to-income ratio above which the loan is too large for the income.
const MAX_DTI_RATIO: f64 = 0.40;

/// Assess a loan application. Rules apply in order; the first match wins.
///
/// Non-positive income or loan amount is outside the input domain and
/// fails with `InvalidInput` instead of producing a division artifact.
pub fn assess(income: f64, credit_score: i64, loan_amount: f64) -> Result<RiskDecision> {
    if income <= 0.0 {
        return Err(OrchestrationError::InvalidInput(format!(
            "income must be positive, got {}",
            income
        )));
    }
    if loan_amount <= 0.0 {
        return Err(OrchestrationError::InvalidInput(format!(
            "loan_amount must be positive, got {}",
            loan_amount
        )));
    }

    let estimated_payment = loan_amount * PAYMENT_RATE;
    let dti_ratio = estimated_payment / income;

    let decision = if credit_score < MIN_CREDIT_SCORE {
        RiskDecision {
            verdict: RiskVerdict::Rejected,
            reason: "Credit score is below the minimum threshold of 600.".to_string(),
        }
    } else if dti_ratio > MAX_DTI_RATIO {
        RiskDecision {
            verdict: RiskVerdict::Rejected,
            reason: format!(
                "Debt-to-Income ratio is too high ({:.2}). Loan is too large for income.",
                dti_ratio
            ),
        }
    } else if credit_score < PRIME_CREDIT_SCORE {
        RiskDecision {
            verdict: RiskVerdict::ManualReview,
            reason: "Score 600-700 requires Manager Approval.".to_string(),
        }
    } else if credit_score >= PRIME_CREDIT_SCORE {
        RiskDecision {
            verdict: RiskVerdict::Approved,
            reason: "Excellent credit score and healthy income ratio.".to_string(),
        }
    } else {
        // Not reachable: the score arms cover every integer.
        RiskDecision {
            verdict: RiskVerdict::ManualReview,
            reason: "Moderate risk. Requires human underwriter approval.".to_string(),
        }
    };

    Ok(decision)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strong_applicant_approved() {
        let decision = assess(5000.0, 750, 10000.0).unwrap();
        assert_eq!(decision.verdict, RiskVerdict::Approved);
        assert_eq!(decision.reason, "Excellent credit score and healthy income ratio.");
    }

    #[test]
    fn test_low_score_rejected() {
        let decision = assess(5000.0, 550, 10000.0).unwrap();
        assert_eq!(decision.verdict, RiskVerdict::Rejected);
        assert_eq!(
            decision.reason,
            "Credit score is below the minimum threshold of 600."
        );
    }

    #[test]
    fn test_mid_score_goes_to_manual_review() {
        let decision = assess(5000.0, 650, 10000.0).unwrap();
        assert_eq!(decision.verdict, RiskVerdict::ManualReview);
        assert_eq!(decision.reason, "Score 600-700 requires Manager Approval.");
    }

    #[test]
    fn test_oversized_loan_rejected_on_dti() {
        // payment = 50000 * 0.05 = 2500, dti = 2500 / 1000 = 2.50
        let decision = assess(1000.0, 750, 50000.0).unwrap();
        assert_eq!(decision.verdict, RiskVerdict::Rejected);
        assert_eq!(
            decision.reason,
            "Debt-to-Income ratio is too high (2.50). Loan is too large for income."
        );
    }

    #[test]
    fn test_score_floor_checked_before_dti() {
        // Both rules match; the score rule fires first.
        let decision = assess(1000.0, 550, 50000.0).unwrap();
        assert_eq!(
            decision.reason,
            "Credit score is below the minimum threshold of 600."
        );
    }

    #[test]
    fn test_boundary_scores() {
        // Exactly 600 clears the floor but not approval.
        let at_floor = assess(10000.0, 600, 10000.0).unwrap();
        assert_eq!(at_floor.verdict, RiskVerdict::ManualReview);

        // Exactly 700 qualifies for approval.
        let at_prime = assess(10000.0, 700, 10000.0).unwrap();
        assert_eq!(at_prime.verdict, RiskVerdict::Approved);
    }

    #[test]
    fn test_dti_threshold_is_strict() {
        // payment = 40000 * 0.05 = 2000, dti = 2000 / 5000 = 0.40 exactly.
        let decision = assess(5000.0, 750, 40000.0).unwrap();
        assert_eq!(decision.verdict, RiskVerdict::Approved);
    }

    #[test]
    fn test_non_positive_income_is_invalid() {
        assert!(matches!(
            assess(0.0, 750, 10000.0),
            Err(OrchestrationError::InvalidInput(_))
        ));
        assert!(matches!(
            assess(-100.0, 750, 10000.0),
            Err(OrchestrationError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_non_positive_loan_amount_is_invalid() {
        assert!(matches!(
            assess(5000.0, 750, 0.0),
            Err(OrchestrationError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_assessment_is_deterministic() {
        let first = assess(4500.0, 650, 20000.0).unwrap();
        let second = assess(4500.0, 650, 20000.0).unwrap();
        assert_eq!(first, second);
    }
}
