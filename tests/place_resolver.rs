//! Property tests for place resolution

use ecospatial::places::{self, known_places};
use proptest::prelude::*;
use proptest::sample::select;

fn keys() -> Vec<&'static str> {
    known_places().collect()
}

proptest! {
    #[test]
    fn qualifiers_do_not_change_identity(
        key in select(keys()),
        prefix in select(vec!["", "경기도 ", "경기 "]),
        suffix in select(vec!["", "시", "군"]),
        pad in "[ ]{0,2}",
    ) {
        let raw = format!("{pad}{prefix}{key}{suffix}{pad}");
        let plain = places::resolve(key).unwrap();
        let qualified = places::resolve(&raw).unwrap();

        prop_assert_eq!(&plain, &qualified);
        prop_assert_eq!(qualified.raw_name, raw);
    }

    #[test]
    fn unknown_latin_names_never_resolve(name in "[a-z]{3,12}") {
        let err = places::resolve(&name).unwrap_err();
        prop_assert_eq!(err.0, name);
    }
}

#[test]
fn test_sub_district_queries_parent_city() {
    let pangyo = places::resolve("판교").unwrap();
    assert_eq!(pangyo.provider_keys.sgg_names, vec!["성남시분당구"]);
    assert!(places::same_place("경기도 수원시", "수원"));
}
