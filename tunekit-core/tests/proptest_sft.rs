//! Property-based tests for trainer API resolution and SFT configuration.

use proptest::prelude::*;

use semver::Version;
use tunekit_core::Hyperparameters;
use tunekit_core::precision::{ComputeCapability, MixedPrecision};
use tunekit_core::sft::{LibraryVersions, MIN_TRL, SftConfig, TrainerApi};

const SEQUENCE_KEYS: [&str; 2] = ["max_seq_length", "max_length"];
const EVAL_KEYS: [&str; 2] = ["eval_strategy", "evaluation_strategy"];

fn supported_versions() -> impl Strategy<Value = LibraryVersions> {
    (
        (4u64..5, 0u64..60, 0u64..10),
        (0u64..2, 0u64..40, 0u64..10),
    )
        .prop_filter_map("trl below minimum", |(t, r)| {
            let trl = Version::new(r.0, r.1, r.2);
            (trl >= MIN_TRL).then(|| LibraryVersions::new(Version::new(t.0, t.1, t.2), trl))
        })
}

fn capability() -> impl Strategy<Value = Option<ComputeCapability>> {
    proptest::option::of((3u32..11, 0u32..10).prop_map(|(a, b)| ComputeCapability::new(a, b)))
}

// --- Variant exclusivity ---

proptest! {
    #[test]
    fn exactly_one_sequence_key(versions in supported_versions(), max_seq in 1usize..16384) {
        let api = TrainerApi::resolve(&versions).unwrap();
        let hp = Hyperparameters { max_seq_length: max_seq, ..Default::default() };
        let args = serde_json::to_value(SftConfig::build("/tmp/out".into(), &hp, api, MixedPrecision::default())).unwrap();

        let present: Vec<_> = SEQUENCE_KEYS.iter().filter(|k| args.get(**k).is_some()).collect();
        prop_assert_eq!(present.len(), 1);
        prop_assert_eq!(&args[*present[0]], &serde_json::json!(max_seq));
    }

    #[test]
    fn exactly_one_eval_strategy_key(versions in supported_versions()) {
        let api = TrainerApi::resolve(&versions).unwrap();
        let args = serde_json::to_value(SftConfig::build("/tmp/out".into(), &Hyperparameters::default(), api, MixedPrecision::default())).unwrap();

        let present: Vec<_> = EVAL_KEYS.iter().filter(|k| args.get(**k).is_some()).collect();
        prop_assert_eq!(present.len(), 1);
        prop_assert_eq!(&args[*present[0]], "steps");
    }

    #[test]
    fn old_trl_is_rejected(minor in 0u64..9, patch in 0u64..20) {
        let versions = LibraryVersions::new(Version::new(4, 46, 0), Version::new(0, minor, patch));
        prop_assert!(TrainerApi::resolve(&versions).is_err());
    }
}

// --- Precision ---

proptest! {
    #[test]
    fn at_most_one_precision_flag(cap in capability()) {
        let precision = MixedPrecision::select(cap);
        prop_assert!(!(precision.bf16 && precision.fp16));
        prop_assert_eq!(precision.bf16 || precision.fp16, cap.is_some());
    }

    #[test]
    fn bf16_iff_ampere_or_newer(major in 0u32..12, minor in 0u32..10) {
        let precision = MixedPrecision::select(Some(ComputeCapability::new(major, minor)));
        prop_assert_eq!(precision.bf16, major >= 8);
        prop_assert_eq!(precision.fp16, major < 8);
    }
}
