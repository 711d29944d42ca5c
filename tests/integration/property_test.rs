//! Property tests for the variable store, the capture grammar and the
//! resolver.

use proptest::prelude::*;
use restcli::environment::{VariableStore, DEFAULT_ENV};
use restcli::variables::{parse_var_scraper_spec, resolve, PathStep, ScrapeKind, Scraper, VariableSet};

const NAME: &str = "[A-Za-z_][A-Za-z0-9_]{0,15}";

fn path_step() -> impl Strategy<Value = PathStep> {
    prop_oneof![
        "[a-z_][a-z0-9_]{0,6}".prop_map(PathStep::Key),
        (0usize..1000).prop_map(PathStep::Index),
    ]
}

proptest! {
    #[test]
    fn set_then_get_ignores_case(name in NAME, value in ".*", upper in any::<bool>()) {
        let mut store = VariableStore::new();
        store.set(&name, value.clone()).unwrap();

        let lookup = if upper { name.to_uppercase() } else { name.to_lowercase() };
        prop_assert_eq!(store.get(&lookup), Some(value.as_str()));
    }

    #[test]
    fn get_from_never_falls_back(name in NAME, value in ".*", env in "[a-z]{1,8}") {
        let mut store = VariableStore::new();
        store.set_in(&name, value.clone(), DEFAULT_ENV).unwrap();
        store.set_current(env.clone()).unwrap();

        prop_assert_eq!(store.get_from(&name, &env), None);
        prop_assert_eq!(store.get(&name), Some(value.as_str()));
    }

    #[test]
    fn path_spec_round_trips(steps in prop::collection::vec(path_step(), 1..6)) {
        let original = Scraper {
            var_name: "V".to_string(),
            kind: ScrapeKind::Path(steps),
        };

        let reparsed = parse_var_scraper_spec("v", &original.spec()).unwrap();
        prop_assert_eq!(reparsed, original);
    }

    #[test]
    fn offset_spec_round_trips(start in 0usize..10_000, len in prop::option::of(1usize..10_000)) {
        let spec = match len {
            Some(len) => format!(":{},{}", start, start + len),
            None => format!(":{}", start),
        };
        let scraper = parse_var_scraper_spec("v", &spec).unwrap();
        let reparsed = parse_var_scraper_spec("v", &scraper.spec()).unwrap();
        prop_assert_eq!(reparsed, scraper);
    }

    #[test]
    fn text_without_prefix_is_unchanged(text in "[^$]*") {
        prop_assert_eq!(resolve(&text, &VariableSet::new(), "$").unwrap(), text);
    }
}
