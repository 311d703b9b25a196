//! Ed25519 signing and verification of events.

use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use weft_types::{EventData, EventHash, PrivateKey, PublicKey, Signature};

use crate::hash::hash_event;

/// Sign a message with a private key, returning the signature.
pub fn sign_message(message: &[u8], private_key: &PrivateKey) -> Signature {
    let signing_key = SigningKey::from_bytes(&private_key.0);
    Signature(signing_key.sign(message).to_bytes())
}

/// Verify a signature against a message and public key.
pub fn verify_signature(message: &[u8], signature: &Signature, public_key: &PublicKey) -> bool {
    let Ok(verifying_key) = VerifyingKey::from_bytes(&public_key.0) else {
        return false;
    };
    let dalek_sig = ed25519_dalek::Signature::from_bytes(&signature.0);
    verifying_key.verify(message, &dalek_sig).is_ok()
}

/// Sign an event hash. Creators sign the hash, not the full event body.
pub fn sign_event(hash: &EventHash, private_key: &PrivateKey) -> Signature {
    sign_message(hash.as_bytes(), private_key)
}

/// Check that `event.hash` matches its contents and that the signature was
/// produced by `creator_key`.
pub fn verify_event(event: &EventData, creator_key: &PublicKey) -> bool {
    hash_event(&event.hashed) == event.hash
        && verify_signature(event.hash.as_bytes(), &event.signature, creator_key)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::keypair_from_seed;
    use weft_types::{ConsensusTime, HashedEventData, NodeId};

    fn make_event(seed: u8) -> (EventData, PublicKey) {
        let kp = keypair_from_seed(&[seed; 32]);
        let hashed = HashedEventData {
            creator: NodeId(seed as u64),
            generation: 0,
            birth_round: 1,
            self_parent: None,
            other_parent: None,
            time_created: ConsensusTime::from_nanos(5),
            transactions: Vec::new(),
        };
        let hash = hash_event(&hashed);
        let signature = sign_event(&hash, &kp.private);
        (
            EventData {
                hashed,
                hash,
                signature,
            },
            kp.public,
        )
    }

    #[test]
    fn sign_and_verify() {
        let kp = keypair_from_seed(&[7u8; 32]);
        let sig = sign_message(b"weft", &kp.private);
        assert!(verify_signature(b"weft", &sig, &kp.public));
        assert!(!verify_signature(b"warp", &sig, &kp.public));
    }

    #[test]
    fn signed_event_verifies() {
        let (event, public) = make_event(1);
        assert!(verify_event(&event, &public));
    }

    #[test]
    fn tampered_event_fails() {
        let (mut event, public) = make_event(1);
        event.hashed.generation = 9;
        assert!(!verify_event(&event, &public));
    }

    #[test]
    fn wrong_creator_key_fails() {
        let (event, _) = make_event(1);
        let (_, other) = make_event(2);
        assert!(!verify_event(&event, &other));
    }

    #[test]
    fn signature_deterministic() {
        let kp = keypair_from_seed(&[99u8; 32]);
        let hash = EventHash::new([3u8; 32]);
        assert_eq!(sign_event(&hash, &kp.private), sign_event(&hash, &kp.private));
    }
}
