//! Property tests for query compilation.

use deliverykit_query::prelude::*;
use deliverykit_query::validate_field_path;
use proptest::prelude::*;
use serde_json::json;

fn field_path() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9_-]{0,15}(\\.[a-z][a-z0-9_-]{0,15}){0,2}")
        .expect("Invalid regex")
}

proptest! {
    #[test]
    fn valid_paths_are_accepted(path in field_path()) {
        prop_assert!(validate_field_path(&path).is_ok());
    }

    #[test]
    fn paths_with_at_sign_are_rejected(prefix in "[a-z]{0,8}", suffix in "[a-z]{0,8}") {
        let path = format!("{prefix}@{suffix}");
        prop_assert!(
            matches!(validate_field_path(&path), Err(QueryError::InvalidFieldPath { .. })),
            "expected InvalidFieldPath error"
        );
    }

    #[test]
    fn where_eq_always_compiles_to_the_literal(path in field_path(), value in ".*") {
        let mut query = Query::entries("product");
        query.where_eq(&path, value.as_str()).unwrap();
        let params = query.compile();
        prop_assert_eq!(params.get("query"), Some(&json!({ path: value })));
    }

    #[test]
    fn excluded_fields_never_survive_in_only(
        only in prop::collection::btree_set(field_path(), 1..6),
        except in prop::collection::btree_set(field_path(), 1..6),
    ) {
        let mut query = Query::entries("product");
        query.only(only.iter()).unwrap().except(except.iter()).unwrap();
        let params = query.compile();

        if let Some(compiled) = params.get("only[]").and_then(|v| v.as_array()) {
            for field in compiled {
                let field = field.as_str().unwrap();
                prop_assert!(!except.contains(field));
            }
        }
    }

    #[test]
    fn limit_is_always_emitted_once_set(limit in any::<u32>()) {
        let mut query = Query::entries("product");
        query.limit(limit);
        let params = query.compile();
        prop_assert_eq!(params.get("limit"), Some(&json!(limit)));
    }
}
