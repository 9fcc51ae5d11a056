//! Property-based test generators using proptest.

use deliverykit_client::{
    BackoffStrategy, MAX_RETRY_LIMIT, MAX_STATUS_CODE, MIN_STATUS_CODE,
};
use deliverykit_query::Scalar;
use proptest::prelude::*;
use std::time::Duration;

/// Strategy for generating valid dotted field paths.
pub fn field_path_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9_-]{0,15}(\\.[a-z][a-z0-9_-]{0,15}){0,2}")
        .expect("Invalid regex")
}

/// Strategy for generating field paths containing a character the wire
/// protocol does not allow.
pub fn invalid_field_path_strategy() -> impl Strategy<Value = String> {
    (
        "[a-z]{0,8}",
        prop::sample::select(vec!['@', '\n', '\u{0}', ' ', '$']),
        "[a-z]{0,8}",
    )
        .prop_map(|(prefix, bad, suffix)| format!("{prefix}{bad}{suffix}"))
}

/// Strategy for generating accepted retry limits.
pub fn retry_limit_strategy() -> impl Strategy<Value = u32> {
    0..=MAX_RETRY_LIMIT
}

/// Strategy for generating rejected retry limits.
pub fn out_of_range_retry_limit_strategy() -> impl Strategy<Value = u32> {
    (MAX_RETRY_LIMIT + 1)..=u32::MAX
}

/// Strategy for generating status codes in the accepted range.
pub fn status_code_strategy() -> impl Strategy<Value = u16> {
    MIN_STATUS_CODE..=MAX_STATUS_CODE
}

/// Strategy for generating status codes outside the accepted range.
pub fn out_of_range_status_code_strategy() -> impl Strategy<Value = u16> {
    prop_oneof![0..MIN_STATUS_CODE, (MAX_STATUS_CODE + 1)..=u16::MAX]
}

/// Strategy for generating built-in backoff strategies.
pub fn builtin_backoff_strategy() -> impl Strategy<Value = BackoffStrategy> {
    prop_oneof![
        Just(BackoffStrategy::Fixed),
        Just(BackoffStrategy::Linear),
        Just(BackoffStrategy::Exponential),
    ]
}

/// Strategy for generating delays up to ten seconds.
pub fn delay_strategy() -> impl Strategy<Value = Duration> {
    (0u64..10_000).prop_map(Duration::from_millis)
}

/// Strategy for generating scalar filter values.
pub fn scalar_strategy() -> impl Strategy<Value = Scalar> {
    prop_oneof![
        "[a-zA-Z0-9 ]{0,16}".prop_map(Scalar::Text),
        any::<i64>().prop_map(Scalar::Integer),
        ((i64::MAX as u64 + 1)..=u64::MAX).prop_map(Scalar::Unsigned),
        (-1.0e6f64..1.0e6).prop_map(Scalar::Float),
        any::<bool>().prop_map(Scalar::Bool),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use deliverykit_query::prelude::*;
    use deliverykit_query::validate_field_path;
    use serde_json::{json, Value};

    proptest! {
        #[test]
        fn generated_paths_are_valid(path in field_path_strategy()) {
            prop_assert!(validate_field_path(&path).is_ok());
        }

        #[test]
        fn generated_invalid_paths_are_invalid(path in invalid_field_path_strategy()) {
            prop_assert!(validate_field_path(&path).is_err());
        }

        #[test]
        fn scalars_compile_to_the_exact_literal(
            path in field_path_strategy(),
            value in scalar_strategy(),
            values in prop::collection::vec(scalar_strategy(), 0..5),
        ) {
            let mut tree = FilterTree::new();
            tree.where_eq(&path, value.clone()).unwrap();
            prop_assert_eq!(tree.to_json(), json!({ path.clone(): value.to_json().unwrap() }));

            let mut tree = FilterTree::new();
            tree.contained_in(&path, values.clone()).unwrap();
            let expected: Vec<Value> = values.iter().filter_map(Scalar::to_json).collect();
            prop_assert_eq!(tree.to_json(), json!({ path: { "$in": expected } }));
        }

        #[test]
        fn invalid_paths_are_rejected_by_every_predicate(
            path in invalid_field_path_strategy(),
            value in scalar_strategy(),
        ) {
            let mut tree = FilterTree::new();
            tree.where_eq("title", "Women").unwrap();
            let before = tree.clone();

            prop_assert!(tree.where_eq(&path, value.clone()).is_err());
            prop_assert!(tree.not_equal_to(&path, value.clone()).is_err());
            prop_assert!(tree.less_than(&path, value.clone()).is_err());
            prop_assert!(tree.less_than_or_equal_to(&path, value.clone()).is_err());
            prop_assert!(tree.greater_than(&path, value.clone()).is_err());
            prop_assert!(tree.greater_than_or_equal_to(&path, value.clone()).is_err());
            prop_assert!(tree.contained_in(&path, [value.clone()]).is_err());
            prop_assert!(tree.not_contained_in(&path, [value]).is_err());
            prop_assert!(tree.exists(&path, true).is_err());
            prop_assert!(tree.matches_regex(&path, "^W", None).is_err());
            prop_assert!(tree.in_reference(&path, &FilterTree::new()).is_err());
            prop_assert!(tree.not_in_reference(&path, &FilterTree::new()).is_err());
            prop_assert_eq!(tree, before);
        }

        #[test]
        fn generated_status_codes_partition(
            good in status_code_strategy(),
            bad in out_of_range_status_code_strategy(),
        ) {
            prop_assert!((100..=599).contains(&good));
            prop_assert!(!(100..=599).contains(&bad));
        }
    }
}
