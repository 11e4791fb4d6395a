//! PoS→PoA transition height: validation, compatibility checks, and the era
//! predicate that every other component in this crate defers to.

use thiserror::Error;

/// Errors raised while validating the `posToPoaTransitionBlock` field of a
/// chain config, or while checking that config against a previously stored
/// value on re-open of an existing database.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionConfigError {
    /// The transition height was present but negative. Chain configs model
    /// block numbers as unsigned, so this only fires when deserializing from
    /// a JSON source that allowed a negative integer through.
    #[error("PoS to PoA transition block cannot be negative")]
    NegativeTransitionBlock,

    /// The transition height was present but the PoA (`clique`) sub-config
    /// was not. A transition cannot be configured without specifying what it
    /// is transitioning to.
    #[error("PoS to PoA transition requires Clique configuration")]
    MissingCliqueConfig,

    /// The stored transition height and the newly supplied one disagree, and
    /// the chain has already advanced far enough that the disagreement would
    /// silently reinterpret already-committed blocks. Carries the block
    /// number the caller should rewind to before retrying.
    #[error(
        "mismatched PoS to PoA transition block: stored {stored}, new {new}; rewind to block {rewind_to}"
    )]
    Mismatch {
        stored: u64,
        new: u64,
        rewind_to: u64,
    },
}

/// Validates a candidate transition height against its accompanying PoA
/// sub-config presence. Called as part of the chain config's fork-order
/// check, once, at node start.
pub fn validate_transition(
    transition_block: Option<i64>,
    has_clique_config: bool,
) -> Result<Option<u64>, TransitionConfigError> {
    let Some(raw) = transition_block else {
        return Ok(None);
    };

    if raw < 0 {
        return Err(TransitionConfigError::NegativeTransitionBlock);
    }

    if !has_clique_config {
        return Err(TransitionConfigError::MissingCliqueConfig);
    }

    Ok(Some(raw as u64))
}

/// Compatibility check performed when a node re-opens an existing database
/// against a potentially updated config. If the stored and new transition
/// heights differ and the chain head has already reached or passed the
/// smaller of the two, changing the config would reinterpret committed
/// history — reject it with a rewind recommendation. Otherwise the change is
/// accepted.
pub fn check_transition_compatible(
    stored: Option<u64>,
    new: Option<u64>,
    head_block_number: u64,
) -> Result<(), TransitionConfigError> {
    let (stored, new) = match (stored, new) {
        (Some(s), Some(n)) if s != n => (s, n),
        // Equal, or one/both absent with no conflicting value: always compatible.
        // (A transition being added or removed entirely is not itself a
        // rewrite of history recorded by this predicate; only a disagreeing
        // pair of heights is.)
        _ => return Ok(()),
    };

    let smaller = stored.min(new);
    if head_block_number >= smaller {
        return Err(TransitionConfigError::Mismatch {
            stored,
            new,
            rewind_to: smaller.saturating_sub(1),
        });
    }

    Ok(())
}

/// The sole authority on which era a block belongs to. A total, pure function
/// of `(block_number, transition_height)`: the same pair of inputs always
/// yields the same answer, independent of call order or concurrent callers.
pub fn is_pos_to_poa_transition(transition_block: Option<u64>, block_number: u64) -> bool {
    match transition_block {
        Some(h) => block_number >= h,
        None => false,
    }
}

/// Reads `config.posToPoaTransitionBlock` out of a raw genesis JSON document
/// without assuming the strongly-typed `alloy_genesis::ChainConfig` carries an
/// extra-fields capture for it. Returns `None` both when the field is absent
/// and when the document shape is unexpected — callers that need validation
/// errors should prefer [`validate_transition`] after parsing.
pub fn read_transition_block_field(genesis_json: &serde_json::Value) -> Option<i64> {
    genesis_json
        .pointer("/config/posToPoaTransitionBlock")
        .and_then(|v| v.as_i64())
}

/// Writes `config.posToPoaTransitionBlock` into a raw genesis JSON document.
/// When `transition_block` is `None` the key is omitted entirely rather than
/// written as `null`, preserving prior behaviour byte-for-byte for chains that
/// never configure a transition.
pub fn write_transition_block_field(genesis_json: &mut serde_json::Value, transition_block: Option<u64>) {
    let Some(config) = genesis_json.get_mut("config").and_then(|c| c.as_object_mut()) else {
        return;
    };
    match transition_block {
        Some(h) => {
            config.insert("posToPoaTransitionBlock".to_string(), serde_json::json!(h));
        }
        None => {
            config.remove("posToPoaTransitionBlock");
        }
    }
}

/// Parses and validates the transition-related fields of a raw genesis
/// config document: reads `posToPoaTransitionBlock` and checks it against the
/// presence of the sibling `clique` field, exactly as described for the
/// config file format. This is the entry point chain-config validation runs
/// through in practice, ahead of ever constructing a typed `PoaChainSpec`.
pub fn parse_transition_config(
    genesis_json: &serde_json::Value,
) -> Result<Option<u64>, TransitionConfigError> {
    let raw = read_transition_block_field(genesis_json);
    let has_clique_config = genesis_json
        .pointer("/config/clique")
        .map(|v| !v.is_null())
        .unwrap_or(false);

    validate_transition(raw, has_clique_config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_absent_transition_is_ok() {
        assert_eq!(validate_transition(None, false), Ok(None));
        assert_eq!(validate_transition(None, true), Ok(None));
    }

    #[test]
    fn validate_rejects_negative_height() {
        assert_eq!(
            validate_transition(Some(-1), true),
            Err(TransitionConfigError::NegativeTransitionBlock)
        );
    }

    #[test]
    fn validate_rejects_missing_clique_config() {
        assert_eq!(
            validate_transition(Some(1000), false),
            Err(TransitionConfigError::MissingCliqueConfig)
        );
    }

    #[test]
    fn validate_accepts_well_formed_transition() {
        assert_eq!(validate_transition(Some(1000), true), Ok(Some(1000)));
    }

    #[test]
    fn validate_accepts_zero_height() {
        assert_eq!(validate_transition(Some(0), true), Ok(Some(0)));
    }

    #[test]
    fn compatibility_accepts_identical_heights() {
        assert!(check_transition_compatible(Some(100), Some(100), 500).is_ok());
    }

    #[test]
    fn compatibility_accepts_change_when_head_below_both() {
        assert!(check_transition_compatible(Some(100), Some(200), 50).is_ok());
    }

    #[test]
    fn compatibility_rejects_change_when_head_past_smaller_height() {
        let err = check_transition_compatible(Some(100), Some(200), 150).unwrap_err();
        assert_eq!(
            err,
            TransitionConfigError::Mismatch {
                stored: 100,
                new: 200,
                rewind_to: 99,
            }
        );
    }

    #[test]
    fn compatibility_rejects_change_when_head_equals_smaller_height() {
        let err = check_transition_compatible(Some(200), Some(100), 100).unwrap_err();
        assert_eq!(
            err,
            TransitionConfigError::Mismatch {
                stored: 200,
                new: 100,
                rewind_to: 99,
            }
        );
    }

    #[test]
    fn is_transition_predicate_boundary() {
        assert!(!is_pos_to_poa_transition(Some(100), 99));
        assert!(is_pos_to_poa_transition(Some(100), 100));
        assert!(is_pos_to_poa_transition(Some(100), 101));
    }

    #[test]
    fn is_transition_predicate_genesis_height() {
        assert!(is_pos_to_poa_transition(Some(0), 0));
        assert!(is_pos_to_poa_transition(Some(0), 1));
    }

    #[test]
    fn is_transition_predicate_absent_is_always_false() {
        assert!(!is_pos_to_poa_transition(None, 0));
        assert!(!is_pos_to_poa_transition(None, u64::MAX));
    }

    #[test]
    fn read_write_roundtrip() {
        let mut genesis = serde_json::json!({ "config": { "chainId": 1 } });
        write_transition_block_field(&mut genesis, Some(1000));
        assert_eq!(read_transition_block_field(&genesis), Some(1000));

        write_transition_block_field(&mut genesis, None);
        assert_eq!(read_transition_block_field(&genesis), None);
        assert!(!genesis["config"]
            .as_object()
            .unwrap()
            .contains_key("posToPoaTransitionBlock"));
    }

    #[test]
    fn read_absent_field_returns_none() {
        let genesis = serde_json::json!({ "config": { "chainId": 1 } });
        assert_eq!(read_transition_block_field(&genesis), None);
    }

    // A well-formed genesis config with both fields present yields a
    // hybrid-ready transition height; stripping `clique` must reject it with
    // the exact documented error text.
    #[test]
    fn parse_genesis_config_with_clique_accepts() {
        let genesis = serde_json::json!({
            "config": {
                "terminalTotalDifficulty": 0,
                "posToPoaTransitionBlock": 1000,
                "clique": { "period": 15, "epoch": 30000 }
            }
        });
        assert_eq!(parse_transition_config(&genesis), Ok(Some(1000)));
    }

    #[test]
    fn parse_genesis_config_without_clique_rejects() {
        let genesis = serde_json::json!({
            "config": {
                "terminalTotalDifficulty": 0,
                "posToPoaTransitionBlock": 1000
            }
        });
        let err = parse_transition_config(&genesis).unwrap_err();
        assert_eq!(err, TransitionConfigError::MissingCliqueConfig);
        assert!(err.to_string().contains("PoS to PoA transition requires Clique configuration"));
    }

    #[test]
    fn parse_genesis_config_without_transition_is_fine_either_way() {
        let genesis = serde_json::json!({ "config": { "terminalTotalDifficulty": 0 } });
        assert_eq!(parse_transition_config(&genesis), Ok(None));
    }
}
