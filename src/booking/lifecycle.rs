//! Rental status transitions, payment rules and pricing

use rust_decimal::Decimal;

use super::availability::DateRange;
use crate::{
    error::{AppError, AppResult},
    models::rental::{max_total_cost, PaymentStatus, Rental, RentalStatus},
};

/// Statuses reachable from `from` in a single step
pub fn allowed_transitions(from: RentalStatus) -> &'static [RentalStatus] {
    use RentalStatus::*;
    match from {
        Pending => &[Confirmed, Cancelled],
        Confirmed => &[Active, Cancelled],
        Active => &[Completed, Cancelled],
        Completed | Cancelled => &[],
    }
}

pub fn ensure_transition(from: RentalStatus, to: RentalStatus) -> AppResult<()> {
    let allowed = allowed_transitions(from);
    if allowed.contains(&to) {
        Ok(())
    } else {
        Err(AppError::InvalidTransition {
            from,
            to,
            allowed: allowed.to_vec(),
        })
    }
}

/// Payment references can be (re)submitted until the rental is closed
pub fn ensure_payment_open(rental: &Rental) -> AppResult<()> {
    if rental.status.is_terminal() {
        return Err(AppError::InvalidTransition {
            from: rental.status,
            to: rental.status,
            allowed: Vec::new(),
        });
    }
    Ok(())
}

/// Only a submitted reference can be reviewed, and only to paid or failed
pub fn ensure_payment_review(rental: &Rental, outcome: PaymentStatus) -> AppResult<()> {
    if !matches!(outcome, PaymentStatus::Paid | PaymentStatus::Failed) {
        return Err(AppError::Validation(
            "Payment review outcome must be paid or failed".to_string(),
        ));
    }
    if rental.payment_status != PaymentStatus::Pending || !rental.has_payment_reference() {
        return Err(AppError::Conflict(format!(
            "Rental {} has no payment awaiting review",
            rental.id
        )));
    }
    Ok(())
}

/// Linear day-rate pricing over the inclusive range, bounded by what a rental row can hold
pub fn total_cost(range: &DateRange, price_per_day: Decimal) -> AppResult<Decimal> {
    Decimal::from(range.days())
        .checked_mul(price_per_day)
        .filter(|cost| *cost <= max_total_cost())
        .ok_or_else(|| {
            AppError::Validation(format!(
                "Total cost of {} days exceeds the maximum of {}",
                range.days(),
                max_total_cost()
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};
    use RentalStatus::*;

    const ALL: [RentalStatus; 5] = [Pending, Confirmed, Active, Completed, Cancelled];

    fn range(days: i64) -> DateRange {
        let start = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        DateRange::new(start, start + chrono::Duration::days(days - 1)).unwrap()
    }

    fn rental(status: RentalStatus, payment: PaymentStatus, reference: Option<&str>) -> Rental {
        Rental {
            id: 1,
            vehicle_id: 1,
            user_id: 1,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 1, 12).unwrap(),
            total_cost: Decimal::new(3000, 0),
            status,
            payment_reference_number: reference.map(str::to_string),
            payment_status: payment,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_transition_table() {
        let valid = [
            (Pending, Confirmed),
            (Pending, Cancelled),
            (Confirmed, Active),
            (Confirmed, Cancelled),
            (Active, Completed),
            (Active, Cancelled),
        ];
        for from in ALL {
            for to in ALL {
                let result = ensure_transition(from, to);
                if valid.contains(&(from, to)) {
                    assert!(result.is_ok(), "{} -> {} should be allowed", from, to);
                } else {
                    assert!(
                        matches!(result, Err(AppError::InvalidTransition { .. })),
                        "{} -> {} should be rejected",
                        from,
                        to
                    );
                }
            }
        }
    }

    #[test]
    fn test_invalid_transition_lists_allowed_states() {
        match ensure_transition(Pending, Completed) {
            Err(AppError::InvalidTransition { allowed, .. }) => {
                assert_eq!(allowed, vec![Confirmed, Cancelled]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        assert!(allowed_transitions(Completed).is_empty());
        assert!(allowed_transitions(Cancelled).is_empty());
    }

    #[test]
    fn test_one_day_costs_day_rate() {
        let rate = Decimal::new(1000, 0);
        assert_eq!(total_cost(&range(1), rate).unwrap(), rate);
        assert_eq!(total_cost(&range(3), rate).unwrap(), Decimal::new(3000, 0));
    }

    #[test]
    fn test_cost_monotonic_in_length() {
        let rate = Decimal::new(4999, 2);
        let mut previous = Decimal::ZERO;
        for days in 1..=60 {
            let cost = total_cost(&range(days), rate).unwrap();
            assert!(cost >= previous);
            previous = cost;
        }
    }

    #[test]
    fn test_cost_beyond_column_bound_is_rejected() {
        let long = DateRange::new(
            NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            NaiveDate::from_ymd_opt(9999, 12, 31).unwrap(),
        )
        .unwrap();
        assert!(matches!(
            total_cost(&long, Decimal::new(5000, 0)),
            Err(AppError::Validation(_))
        ));
        assert!(total_cost(&range(30), max_total_cost()).is_err());
        assert_eq!(total_cost(&range(1), max_total_cost()).unwrap(), max_total_cost());
    }

    #[test]
    fn test_payment_closed_for_terminal_rentals() {
        assert!(ensure_payment_open(&rental(Pending, PaymentStatus::Unpaid, None)).is_ok());
        assert!(ensure_payment_open(&rental(Active, PaymentStatus::Pending, Some("x"))).is_ok());
        assert!(matches!(
            ensure_payment_open(&rental(Completed, PaymentStatus::Unpaid, None)),
            Err(AppError::InvalidTransition { .. })
        ));
        assert!(matches!(
            ensure_payment_open(&rental(Cancelled, PaymentStatus::Unpaid, None)),
            Err(AppError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_payment_review_requires_submission() {
        let submitted = rental(Pending, PaymentStatus::Pending, Some("TXN-42"));
        assert!(ensure_payment_review(&submitted, PaymentStatus::Paid).is_ok());
        assert!(matches!(
            ensure_payment_review(&submitted, PaymentStatus::Unpaid),
            Err(AppError::Validation(_))
        ));

        let unpaid = rental(Pending, PaymentStatus::Unpaid, None);
        assert!(matches!(
            ensure_payment_review(&unpaid, PaymentStatus::Paid),
            Err(AppError::Conflict(_))
        ));
    }
}
