// SPDX-FileCopyrightText: 2026 Threadline Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Participant and correlation identity helpers.

use sha2::{Digest, Sha256};

use crate::error::ThreadlineError;

/// Canonical, case-insensitive form of a participant id.
pub fn normalize_participant(participant_id: &str) -> Result<String, ThreadlineError> {
    let trimmed = participant_id.trim();
    if trimmed.is_empty() {
        return Err(ThreadlineError::validation(
            "participant_id",
            "must not be empty",
        ));
    }
    Ok(trimmed.to_lowercase())
}

/// Correlation id derived from the conversation coordinates.
///
/// Stable for a given (workflow, participant) pair, so a caller that omits a
/// request id always lands on the same correlation value.
pub fn derive_request_id(workflow_id: &str, participant_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(workflow_id.as_bytes());
    hasher.update([0u8]);
    hasher.update(participant_id.as_bytes());
    let digest = hex::encode(hasher.finalize());
    digest[..32].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn participant_is_trimmed_and_lowercased() {
        assert_eq!(normalize_participant("  User-42 ").unwrap(), "user-42");
        assert!(normalize_participant("   ").is_err());
    }

    #[test]
    fn request_id_is_deterministic() {
        let a = derive_request_id("acme:support-agent:triage", "user-42");
        let b = derive_request_id("acme:support-agent:triage", "user-42");
        let c = derive_request_id("acme:support-agent:triage", "user-43");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 32);
    }

    #[test]
    fn request_id_separates_fields() {
        assert_ne!(derive_request_id("ab", "c"), derive_request_id("a", "bc"));
    }

    proptest! {
        #[test]
        fn normalization_is_idempotent(raw in "[ ]{0,2}[A-Za-z0-9@._-]{1,24}[ ]{0,2}") {
            let once = normalize_participant(&raw).unwrap();
            let twice = normalize_participant(&once).unwrap();
            prop_assert_eq!(&once, &twice);
            prop_assert_eq!(once.clone(), once.to_lowercase());
        }
    }
}
