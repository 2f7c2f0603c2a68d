//! Property tests for form merging, history and navigation gating

use listing_wizard::wizard::{WizardKind, WizardOptions, WizardStateManager};
use listing_wizard::FormData;
use proptest::prelude::*;
use serde_json::{json, Map, Value};

// ─── Generators ──────────────────────────────────────────────────────────────

const KEYS: &[&str] = &[
    "title",
    "description",
    "price",
    "surface",
    "propertyType",
    "characteristics",
    "address",
    "coordinates",
    "images",
];

fn arb_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        (0i64..500_000).prop_map(Value::from),
        "[a-zA-Z ]{0,80}".prop_map(Value::from),
        prop::sample::select(vec!["house", "apartment", "villa", "castle"]).prop_map(Value::from),
        Just(json!([{"id": "pool", "name": "Pool", "selected": true}])),
        Just(json!({"street": "Calle 1", "city": "Santiago", "province": "Santiago"})),
        Just(json!({"lat": 19.4, "lng": -70.7})),
        Just(json!(["https://cdn.example.com/a.jpg"])),
        Just(Value::Null),
    ]
}

fn arb_patch() -> impl Strategy<Value = FormData> {
    prop::collection::btree_map(prop::sample::select(KEYS), arb_value(), 0..4).prop_map(|entries| {
        let map: Map<String, Value> = entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
        FormData::from(map)
    })
}

fn arb_patches() -> impl Strategy<Value = Vec<FormData>> {
    prop::collection::vec(arb_patch(), 0..20)
}

fn wizard_with_history(size: usize) -> WizardStateManager {
    WizardStateManager::new(
        WizardKind::Property,
        None,
        WizardOptions::default().with_max_history_size(size),
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    #[test]
    fn form_data_is_the_merge_fold_of_patches(patches in arb_patches()) {
        let mut wizard = wizard_with_history(50);
        let mut expected = WizardKind::Property.defaults();
        for patch in patches {
            expected.merge(&patch);
            wizard.update_form_data(patch);
        }
        prop_assert_eq!(wizard.form_data(), &expected);
    }

    #[test]
    fn undo_then_redo_restores_form_data(patches in arb_patches(), undos in 0usize..10) {
        let mut wizard = wizard_with_history(50);
        for patch in patches {
            wizard.update_form_data(patch);
        }
        for _ in 0..undos {
            wizard.undo();
        }

        if wizard.can_undo() {
            let before = wizard.form_data().clone();
            prop_assert!(wizard.undo());
            prop_assert!(wizard.redo());
            prop_assert_eq!(wizard.form_data(), &before);
        }
    }

    #[test]
    fn history_keeps_at_most_max_size_edits(size in 1usize..10, extra in 1usize..10) {
        let mut wizard = wizard_with_history(size);
        for i in 0..size + extra {
            prop_assert!(wizard.update_form_data(FormData::new().with("price", i as u64 + 1)));
        }

        let mut undos = 0;
        while wizard.undo() {
            undos += 1;
        }
        prop_assert_eq!(undos, size);
        prop_assert!(!wizard.can_undo());
        prop_assert_eq!(wizard.form_data().get_f64("price"), Some(extra as f64));
    }

    #[test]
    fn repeating_current_values_does_not_grow_history(patches in arb_patches(), keys in prop::collection::vec(prop::sample::select(KEYS), 1..4)) {
        let mut wizard = wizard_with_history(50);
        for patch in patches {
            wizard.update_form_data(patch);
        }

        let mut same = FormData::new();
        for key in keys {
            if let Some(value) = wizard.form_data().get(key) {
                same.insert(key, value.clone());
            }
        }
        let history_len = wizard.history_len();
        let could_redo = wizard.can_redo();

        prop_assert!(!wizard.update_form_data(same));
        prop_assert_eq!(wizard.history_len(), history_len);
        prop_assert_eq!(wizard.can_redo(), could_redo);
    }

    #[test]
    fn next_step_is_refused_while_current_step_is_invalid(patches in arb_patches(), moves in prop::collection::vec(1u8..=4, 0..6)) {
        let mut wizard = wizard_with_history(50);
        for (patch, target) in patches.into_iter().zip(moves.into_iter().cycle()) {
            wizard.update_form_data(patch);
            wizard.go_to_step(target);
        }

        let step = wizard.current_step();
        if !wizard.is_step_valid(step) {
            prop_assert!(!wizard.go_to_next_step());
            prop_assert_eq!(wizard.current_step(), step);
        }
    }

    #[test]
    fn forward_jumps_require_every_step_in_between(patches in arb_patches(), target in 1u8..=4) {
        let mut wizard = wizard_with_history(50);
        for patch in patches {
            wizard.update_form_data(patch);
        }

        let from = wizard.current_step();
        let reachable = (from..target).all(|s| wizard.is_step_valid(s));
        let moved = wizard.go_to_step(target);

        if target > from {
            prop_assert_eq!(moved, reachable);
            let expected = if reachable { target } else { from };
            prop_assert_eq!(wizard.current_step(), expected);
        } else {
            prop_assert!(moved);
            prop_assert_eq!(wizard.current_step(), target);
        }
    }
}
