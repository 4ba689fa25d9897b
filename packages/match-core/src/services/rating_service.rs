use crate::{models::outcome::RatingChange, services::errors::rating_errors::RatingError};

pub const K_FACTOR: f64 = 32.0;

/// Logistic expected score of `rating` against `opponent_rating`.
pub fn expected_score(rating: i32, opponent_rating: i32) -> f64 {
    let exponent = (opponent_rating as f64 - rating as f64) / 400.0;
    1.0 / (1.0 + 10f64.powf(exponent))
}

/// New ratings after `winner_rating` beats `loser_rating`.
///
/// Only decisive results are rated; draws never reach this function.
pub fn rate(winner_rating: i32, loser_rating: i32) -> Result<RatingChange, RatingError> {
    let expected_winner = expected_score(winner_rating, loser_rating);
    if !expected_winner.is_finite() {
        return Err(RatingError::NonFinite);
    }

    let delta = K_FACTOR * (1.0 - expected_winner);
    let winner_after = to_rating(winner_rating as f64 + delta)?;
    let loser_after = to_rating(loser_rating as f64 - delta)?;

    Ok(RatingChange {
        winner_before: winner_rating,
        winner_after,
        loser_before: loser_rating,
        loser_after,
    })
}

fn to_rating(value: f64) -> Result<i32, RatingError> {
    if !value.is_finite() {
        return Err(RatingError::NonFinite);
    }
    let rounded = value.round();
    if rounded < i32::MIN as f64 || rounded > i32::MAX as f64 {
        return Err(RatingError::OutOfRange(rounded));
    }
    Ok(rounded as i32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use test_case::test_case;

    #[test_case(1200, 1200 => (1216, 1184); "equal ratings")]
    #[test_case(1400, 1200 => (1408, 1192); "favourite wins")]
    #[test_case(1200, 1400 => (1224, 1376); "underdog wins")]
    #[test_case(2800, 800 => (2800, 800); "certain result")]
    fn test_rate(winner: i32, loser: i32) -> (i32, i32) {
        let change = rate(winner, loser).unwrap();
        (change.winner_after, change.loser_after)
    }

    #[test]
    fn test_rate_reports_before_values() {
        let change = rate(1300, 1250).unwrap();

        assert_eq!(change.winner_before, 1300);
        assert_eq!(change.loser_before, 1250);
    }

    #[test]
    fn test_expected_score_is_symmetric() {
        let a = expected_score(1500, 1300);
        let b = expected_score(1300, 1500);

        assert!((a + b - 1.0).abs() < 1e-12);
        assert_eq!(expected_score(1200, 1200), 0.5);
    }

    #[test]
    fn test_extreme_ratings_do_not_overflow() {
        assert!(rate(i32::MAX, i32::MIN).is_ok());
        assert_eq!(
            rate(i32::MAX, i32::MAX),
            Err(RatingError::OutOfRange(i32::MAX as f64 + 16.0))
        );
    }

    proptest! {
        #[test]
        fn prop_winner_never_loses_points(winner in 0i32..4000, loser in 0i32..4000) {
            let change = rate(winner, loser).unwrap();

            prop_assert!(change.winner_after >= winner);
            prop_assert!(change.loser_after <= loser);
            prop_assert!(change.winner_after - winner <= 32);
            prop_assert!(loser - change.loser_after <= 32);
        }

        #[test]
        fn prop_points_are_conserved_up_to_rounding(winner in 0i32..4000, loser in 0i32..4000) {
            let change = rate(winner, loser).unwrap();
            let before = winner + loser;
            let after = change.winner_after + change.loser_after;

            prop_assert!((after - before).abs() <= 1);
        }
    }
}
