//! Property-based tests for the linear policy
//!
//! The policy must be total over arbitrary stage names and never leave the
//! known stage set.

use super::*;
use proptest::prelude::*;

fn arb_known_stage() -> impl Strategy<Value = String> {
    prop::sample::select(STAGES.to_vec()).prop_map(str::to_string)
}

fn arb_any_stage() -> impl Strategy<Value = String> {
    prop_oneof![arb_known_stage(), "[A-Za-z_ ]{0,24}", ".{0,32}"]
}

proptest! {
    #[test]
    fn prop_next_stage_is_always_known(stage in arb_any_stage(), msg in ".{0,64}") {
        let result = LinearPolicy.transition(&stage, &msg);
        prop_assert!(STAGES.contains(&result.next_stage.as_str()));
    }

    #[test]
    fn prop_message_names_both_stages(stage in arb_any_stage(), msg in ".{0,64}") {
        let result = LinearPolicy.transition(&stage, &msg);
        prop_assert!(result.assistant_message.contains(&stage));
        prop_assert!(result.assistant_message.contains(&result.next_stage));
    }

    #[test]
    fn prop_known_stages_never_move_backwards(stage in arb_known_stage(), msg in ".{0,64}") {
        let result = LinearPolicy.transition(&stage, &msg);
        let from = STAGES.iter().position(|s| *s == stage).unwrap();
        let to = STAGES.iter().position(|s| *s == result.next_stage).unwrap();
        prop_assert!(to >= from);
        prop_assert!(to - from <= 1);
    }

    #[test]
    fn prop_unknown_stages_reset(stage in "[a-z]{1,16}", msg in ".{0,16}") {
        // Lowercase names never collide with the upper-case stage set
        let result = LinearPolicy.transition(&stage, &msg);
        prop_assert_eq!(result.next_stage.as_str(), INITIAL_STAGE);
    }

    #[test]
    fn prop_transition_is_deterministic(stage in arb_any_stage(), msg in ".{0,64}") {
        prop_assert_eq!(
            LinearPolicy.transition(&stage, &msg),
            LinearPolicy.transition(&stage, &msg)
        );
    }
}
