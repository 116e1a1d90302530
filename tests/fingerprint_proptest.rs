//! Property tests for parameter fingerprints
//!
//! - Determinism: equal parameter sets always share a fingerprint
//! - Sensitivity: any differing field changes it
//! - Namespaces are directory-safe

use matchdoc::params::slugify;
use matchdoc::{Field, ParameterSet};
use proptest::prelude::*;

fn name() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z ]{0,11}"
}

fn field() -> impl Strategy<Value = Field> {
    prop_oneof![Just(Field::Home), Just(Field::Away)]
}

prop_compose! {
    fn parameter_set()(
        team in name(),
        rival in name(),
        competition in name(),
        field in field(),
        season in "20[0-9]{2}-20[0-9]{2}",
        sample_size in 1u32..60,
    ) -> ParameterSet {
        ParameterSet::new(team, rival, competition, field, season, sample_size).unwrap()
    }
}

proptest! {
    #[test]
    fn prop_fingerprint_is_deterministic(params in parameter_set()) {
        let copy = params.clone();
        prop_assert_eq!(params.fingerprint(), copy.fingerprint());
        prop_assert_eq!(params.namespace(), copy.namespace());
        prop_assert_eq!(params.fingerprint().as_str().len(), 64);
    }

    #[test]
    fn prop_distinct_sets_have_distinct_fingerprints(a in parameter_set(), b in parameter_set()) {
        prop_assume!(a != b);
        prop_assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn prop_sample_size_changes_fingerprint(params in parameter_set(), delta in 1u32..10) {
        let other = ParameterSet::new(
            params.team(),
            params.rival(),
            params.competition(),
            params.field(),
            params.season(),
            params.sample_size() + delta,
        )
        .unwrap();
        prop_assert_ne!(params.fingerprint(), other.fingerprint());
    }

    #[test]
    fn prop_namespace_is_directory_safe(params in parameter_set()) {
        let namespace = params.namespace();
        prop_assert!(namespace
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_'));
        prop_assert!(namespace.starts_with(&slugify(params.team())));
    }
}

#[test]
fn test_whitespace_does_not_change_fingerprint() {
    let padded =
        ParameterSet::new(" Alpha FC ", "Charlton Athletic", "League One", Field::Away, "2025-2026", 10)
            .unwrap();
    let plain =
        ParameterSet::new("Alpha FC", "Charlton Athletic", "League One", Field::Away, "2025-2026", 10)
            .unwrap();
    assert_eq!(padded.fingerprint(), plain.fingerprint());
}
