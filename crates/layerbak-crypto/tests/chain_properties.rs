//! Chain-level properties over arbitrary payloads and layer subsets.
//!
//! Every layer costs a 100k-round PBKDF2, so case counts stay small.

use layerbak_core::{LayerChain, LayerId, PassphraseMap, SaltMode};
use layerbak_crypto::{chain_output_len, multi_decrypt, multi_encrypt, open, seal, CryptoError};
use proptest::prelude::*;
use secrecy::SecretString;

fn passphrases_for(mask: u8, count: usize) -> PassphraseMap {
    (0..count)
        .filter(|i| mask & (1 << i) != 0)
        .map(|i| {
            let id = LayerId::from_index(i).unwrap();
            (id, SecretString::from(format!("passphrase-{id}-{mask}")))
        })
        .collect()
}

fn arb_salt_mode() -> impl Strategy<Value = SaltMode> {
    prop_oneof![Just(SaltMode::Random), Just(SaltMode::Static)]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(8))]

    #[test]
    fn roundtrip_any_payload_any_subset(
        data in proptest::collection::vec(any::<u8>(), 0..=4096),
        mask in 1u8..8,
        mode in arb_salt_mode(),
    ) {
        let chain = LayerChain::standard(3, mode).unwrap();
        let pw = passphrases_for(mask, 3);

        let blob = multi_encrypt(&data, &pw, &chain).unwrap();
        prop_assert_eq!(blob.len(), chain_output_len(data.len(), pw.len(), &chain));

        let out = multi_decrypt(&blob, &pw, &chain).unwrap();
        prop_assert_eq!(out, data);
    }

    #[test]
    fn encryption_is_never_deterministic(
        data in proptest::collection::vec(any::<u8>(), 1..=256),
        mode in arb_salt_mode(),
    ) {
        let chain = LayerChain::standard(2, mode).unwrap();
        let pw = passphrases_for(0b11, 2);

        let first = multi_encrypt(&data, &pw, &chain).unwrap();
        let second = multi_encrypt(&data, &pw, &chain).unwrap();
        prop_assert_ne!(first, second, "fresh IVs must change every blob");
    }

    #[test]
    fn envelope_roundtrip(
        data in proptest::collection::vec(any::<u8>(), 0..=1024),
        mask in 1u8..8,
    ) {
        let chain = LayerChain::standard(3, SaltMode::Random).unwrap();
        let pw = passphrases_for(mask, 3);

        let sealed = seal(&data, &pw, &chain).unwrap();
        prop_assert_eq!(open(&sealed, &pw, &chain).unwrap(), data);
    }
}

#[test]
fn large_payload_roundtrip() {
    let chain = LayerChain::standard(3, SaltMode::Random).unwrap();
    let pw = passphrases_for(0b111, 3);
    let data: Vec<u8> = (0u8..=255).cycle().take(4 * 1024 * 1024 + 7).collect();

    let blob = multi_encrypt(&data, &pw, &chain).unwrap();
    assert_eq!(blob.len(), chain_output_len(data.len(), 3, &chain));
    assert_eq!(multi_decrypt(&blob, &pw, &chain).unwrap(), data);
}

#[test]
fn static_mode_blobs_decrypt_across_runs() {
    // Two chains built independently from the same config derive the same keys
    let writer = LayerChain::standard(3, SaltMode::Static).unwrap();
    let reader = LayerChain::standard(3, SaltMode::Static).unwrap();
    let pw = passphrases_for(0b111, 3);

    let blob = multi_encrypt(b"metadata", &pw, &writer).unwrap();
    assert_eq!(multi_decrypt(&blob, &pw, &reader).unwrap(), b"metadata");
}

#[test]
fn wrong_outer_passphrase_is_named() {
    let chain = LayerChain::standard(3, SaltMode::Random).unwrap();
    let pw = passphrases_for(0b111, 3);
    let blob = multi_encrypt(&[0x42u8; 100], &pw, &chain).unwrap();

    let c = LayerId::from_letter('C').unwrap();
    let mut wrong = passphrases_for(0b111, 3);
    wrong.insert(c, SecretString::from("not-the-passphrase"));

    match multi_decrypt(&blob, &wrong, &chain) {
        Err(CryptoError::Decryption { layer, .. }) => {
            // Garbage that survives C's unpadding is rejected further in
            assert!(layer <= c);
        }
        other => panic!("expected a layer failure, got {other:?}"),
    }
}

#[test]
fn wrong_middle_passphrase_fails() {
    let chain = LayerChain::standard(3, SaltMode::Random).unwrap();
    let pw = passphrases_for(0b111, 3);
    let blob = multi_encrypt(&[0x17u8; 100], &pw, &chain).unwrap();

    let b = LayerId::from_letter('B').unwrap();
    let mut wrong = passphrases_for(0b111, 3);
    wrong.insert(b, SecretString::from("not-the-passphrase"));

    // C peels with its correct passphrase, so the failure is at B or below
    match multi_decrypt(&blob, &wrong, &chain) {
        Err(CryptoError::Decryption { layer, .. }) => assert!(layer <= b, "failed at {layer}"),
        other => panic!("expected a layer failure, got {other:?}"),
    }
}

#[test]
fn wrong_inner_passphrase_never_yields_plaintext() {
    let chain = LayerChain::standard(3, SaltMode::Random).unwrap();
    let pw = passphrases_for(0b111, 3);
    let plaintext = [0x2Au8; 100];
    let blob = multi_encrypt(&plaintext, &pw, &chain).unwrap();

    let a = LayerId::from_letter('A').unwrap();
    let mut wrong = passphrases_for(0b111, 3);
    wrong.insert(a, SecretString::from("not-the-passphrase"));

    // Nothing sits inside A to catch a lucky unpad, so garbage is possible
    match multi_decrypt(&blob, &wrong, &chain) {
        Err(CryptoError::Decryption { layer, .. }) => assert_eq!(layer, a),
        Err(other) => panic!("unexpected error {other:?}"),
        Ok(garbage) => assert_ne!(garbage, plaintext),
    }
}
