//! Property tests for policy evaluation.

use proptest::prelude::*;

use orderer_core::Ed25519Verifier;
use orderer_policy::validate_policy;
use orderer_testkit::generators::{policy_case, PolicyCase};

const MESSAGE: &[u8] = b"configuration item";

fn evaluate(case: &PolicyCase, signers: &[bool]) -> bool {
    let signatures = case.signatures(MESSAGE, signers);
    case.compile().evaluate(MESSAGE, &signatures, &Ed25519Verifier)
}

proptest! {
    #[test]
    fn generated_policies_validate(case in policy_case()) {
        let depth = validate_policy(&case.envelope(), 64).unwrap();
        prop_assert!(depth >= 1);
    }

    #[test]
    fn evaluation_matches_reference(case in policy_case()) {
        prop_assert_eq!(evaluate(&case, &case.signers), case.expected(&case.signers));
    }

    #[test]
    fn adding_signers_never_revokes(case in policy_case(), extra in prop::collection::vec(any::<bool>(), 5)) {
        let superset: Vec<bool> = case
            .signers
            .iter()
            .zip(extra.iter().chain(std::iter::repeat(&false)))
            .map(|(a, b)| *a || *b)
            .collect();

        if evaluate(&case, &case.signers) {
            prop_assert!(evaluate(&case, &superset));
        }
    }

    #[test]
    fn signatures_over_other_message_count_for_nothing(case in policy_case()) {
        let signatures = case.signatures(b"a different message", &case.signers);
        let nobody = vec![false; case.keys.len()];
        prop_assert_eq!(
            case.compile().evaluate(MESSAGE, &signatures, &Ed25519Verifier),
            case.expected(&nobody)
        );
    }
}
