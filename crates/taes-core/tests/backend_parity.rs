use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use taes_core::{
    decrypt_message, encrypt_message, ni, Backend, Cipher, CipherConfig, CombinePolicy, Key,
    KeySize, Tweak,
};

fn key(rng: &mut ChaCha20Rng, size: KeySize) -> Key {
    let mut bytes = vec![0u8; size.key_len()];
    rng.fill_bytes(&mut bytes);
    Key::new(size, &bytes).expect("key")
}

#[test]
fn messages_match_across_backends() {
    if !ni::is_supported() {
        eprintln!("Skipping: AES-NI not detected");
        return;
    }
    let mut rng = ChaCha20Rng::from_seed([80u8; 32]);
    for size in KeySize::ALL {
        for combine in [CombinePolicy::Xor, CombinePolicy::Add] {
            let key = key(&mut rng, size);
            let config = CipherConfig::new(size).with_combine(combine);
            let sw = Cipher::new(config.with_backend(Backend::Software), &key).expect("sw");
            let hw = Cipher::new(config.with_backend(Backend::Hardware), &key).expect("hw");

            for len in [16usize, 23, 48, 100] {
                let mut msg = vec![0u8; len];
                rng.fill_bytes(&mut msg);
                let tweak = Tweak::new(rng.gen());
                let a = encrypt_message(&sw, Some(&tweak), &msg).expect("sw encrypt");
                let b = encrypt_message(&hw, Some(&tweak), &msg).expect("hw encrypt");
                assert_eq!(a, b, "{size} {combine} len {len}");
                assert_eq!(decrypt_message(&hw, Some(&tweak), &a).expect("hw decrypt"), msg);
            }
        }
    }
}

#[test]
fn every_tail_length_matches_across_backends() {
    if !ni::is_supported() {
        eprintln!("Skipping: AES-NI not detected");
        return;
    }
    let mut rng = ChaCha20Rng::from_seed([82u8; 32]);
    // All-ones base tweak: the per-block counter wraps to zero after block 0.
    let tweak = Tweak::new([0xff; 16]);
    for size in KeySize::ALL {
        for combine in [CombinePolicy::Xor, CombinePolicy::Add] {
            let key = key(&mut rng, size);
            let config = CipherConfig::new(size).with_combine(combine);
            let sw = Cipher::new(config.with_backend(Backend::Software), &key).expect("sw");
            let hw = Cipher::new(config.with_backend(Backend::Hardware), &key).expect("hw");
            for len in 16..=80 {
                let mut msg = vec![0u8; len];
                rng.fill_bytes(&mut msg);
                let a = encrypt_message(&sw, Some(&tweak), &msg).expect("sw encrypt");
                let b = encrypt_message(&hw, Some(&tweak), &msg).expect("hw encrypt");
                assert_eq!(a, b, "{size} {combine} len {len}");
                assert_eq!(decrypt_message(&sw, Some(&tweak), &b).expect("sw decrypt"), msg);
            }
        }
    }
}

#[test]
fn schedules_match_across_backends() {
    if !ni::is_supported() {
        eprintln!("Skipping: AES-NI not detected");
        return;
    }
    let mut rng = ChaCha20Rng::from_seed([81u8; 32]);
    for size in KeySize::ALL {
        for _ in 0..50 {
            let key = key(&mut rng, size);
            let hw = ni::expand_key(&key).expect("hw schedule");
            assert_eq!(hw.as_slice(), taes_core::expand_key(&key).as_slice());
        }
    }
}

#[test]
fn build_policy_is_the_default() {
    assert_eq!(CipherConfig::default().combine, CombinePolicy::ACTIVE);
    #[cfg(not(feature = "tweak-add"))]
    assert_eq!(CombinePolicy::ACTIVE, CombinePolicy::Xor);
}
