//! Command-line interface for tweakable AES.

#![forbid(unsafe_code)]

mod kdf;

use std::io::{self, Write};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use taes_core::{
    ni, Backend, BlockCipher, Cipher, CipherConfig, Key, KeySize, Tweak, BLOCK_LEN,
};
use taes_stream::{decrypt_stream, encrypt_stream, StreamSummary};
use tracing_subscriber::EnvFilter;

/// Tweakable AES CLI.
#[derive(Parser)]
#[command(
    name = "taes",
    version,
    about = "Tweakable AES-128/192/256 with ciphertext stealing"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encrypt standard input to standard output.
    Encrypt {
        #[command(flatten)]
        args: CipherArgs,
    },
    /// Decrypt standard input to standard output.
    Decrypt {
        #[command(flatten)]
        args: CipherArgs,
    },
    /// Print the software and hardware key schedules and fail if they differ.
    CheckSchedule {
        /// Key size in bits.
        #[arg(value_name = "128|192|256")]
        key_size: KeySize,
        /// Key as hex, 16/24/32 bytes to match the size.
        #[arg(value_name = "HEX")]
        key_hex: String,
    },
    /// Run the FIPS-197 vectors on every backend this CPU supports.
    Verify,
    /// Histogram of Hamming distances between ciphertexts of consecutive tweaks.
    Stat {
        /// Number of random key/plaintext pairs.
        #[arg(long, default_value_t = 100)]
        experiments: u32,
        /// Largest integer tweak; tweaks 0..=max are used.
        #[arg(long, default_value_t = 256)]
        max_tweak: u64,
        /// Optional RNG seed for reproducibility.
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[derive(clap::Args)]
struct CipherArgs {
    /// Key size in bits.
    #[arg(value_name = "128|192|256")]
    key_size: KeySize,
    /// Passphrase the key is derived from.
    password: String,
    /// Passphrase the tweak is derived from. Omit for plain AES.
    tweak_password: Option<String>,
    /// Implementation to run the rounds on.
    #[arg(long, default_value = "auto", value_name = "auto|software|hardware")]
    backend: Backend,
}

fn main() -> Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = if err.use_stderr() { 1 } else { 0 };
            // Nothing sensible is left to do if stderr itself is gone.
            let _ = err.print();
            std::process::exit(code);
        }
    };
    init_tracing()?;

    match cli.command {
        Commands::Encrypt { args } => cmd_encrypt(&args).map(|_| ()),
        Commands::Decrypt { args } => cmd_decrypt(&args).map(|_| ()),
        Commands::CheckSchedule { key_size, key_hex } => cmd_check_schedule(key_size, &key_hex),
        Commands::Verify => cmd_verify(),
        Commands::Stat {
            experiments,
            max_tweak,
            seed,
        } => cmd_stat(experiments, max_tweak, seed),
    }
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init()
        .map_err(|err| anyhow::anyhow!("install log subscriber: {err}"))
}

fn build_cipher(args: &CipherArgs) -> Result<(Cipher, Option<Tweak>)> {
    let key = kdf::derive_key(args.key_size, args.password.as_bytes())
        .context("derive key from password")?;
    let tweak = args
        .tweak_password
        .as_deref()
        .map(|pw| kdf::derive_tweak(pw.as_bytes()));
    let config = CipherConfig::new(args.key_size).with_backend(args.backend);
    let cipher = Cipher::new(config, &key)
        .with_context(|| format!("initialise {} on the {} backend", args.key_size, args.backend))?;
    Ok((cipher, tweak))
}

fn cmd_encrypt(args: &CipherArgs) -> Result<StreamSummary> {
    let (cipher, tweak) = build_cipher(args)?;
    let summary = encrypt_stream(&cipher, tweak.as_ref(), io::stdin().lock(), io::stdout().lock())
        .context("encrypt standard input")?;
    tracing::info!(blocks = summary.blocks, bytes = summary.bytes, "encrypted");
    Ok(summary)
}

fn cmd_decrypt(args: &CipherArgs) -> Result<StreamSummary> {
    let (cipher, tweak) = build_cipher(args)?;
    let summary = decrypt_stream(&cipher, tweak.as_ref(), io::stdin().lock(), io::stdout().lock())
        .context("decrypt standard input")?;
    tracing::info!(blocks = summary.blocks, bytes = summary.bytes, "decrypted");
    Ok(summary)
}

fn parse_key_hex(size: KeySize, hex_str: &str) -> Result<Key> {
    let bytes = hex::decode(hex_str.trim()).context("decode key hex")?;
    if bytes.len() != size.key_len() {
        bail!(
            "{size} key must be {} bytes ({} hex characters), got {}",
            size.key_len(),
            2 * size.key_len(),
            bytes.len()
        );
    }
    Ok(Key::new(size, &bytes)?)
}

fn cmd_check_schedule(size: KeySize, key_hex: &str) -> Result<()> {
    let key = parse_key_hex(size, key_hex)?;
    let software = taes_core::expand_key(&key);
    let hardware = ni::expand_key(&key).context("run hardware key schedule")?;

    let mut out = io::stdout().lock();
    let mut mismatches = 0usize;
    for (round, (sw, hw)) in software
        .as_slice()
        .iter()
        .zip(hardware.as_slice())
        .enumerate()
    {
        let verdict = if sw == hw { "ok" } else { "MISMATCH" };
        if sw != hw {
            mismatches += 1;
        }
        writeln!(
            out,
            "round {round:2}: sw {} hw {} {verdict}",
            hex::encode(sw),
            hex::encode(hw)
        )?;
    }
    if mismatches > 0 {
        bail!("{mismatches} of {} round keys differ", software.as_slice().len());
    }
    Ok(())
}

/// FIPS-197 appendix C and SP 800-38A ECB vectors: key, plaintext, ciphertext.
const VECTORS: [(&str, &str, &str); 6] = [
    (
        "000102030405060708090a0b0c0d0e0f",
        "00112233445566778899aabbccddeeff",
        "69c4e0d86a7b0430d8cdb78070b4c55a",
    ),
    (
        "000102030405060708090a0b0c0d0e0f1011121314151617",
        "00112233445566778899aabbccddeeff",
        "dda97ca4864cdfe06eaf70a0ec0d7191",
    ),
    (
        "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f",
        "00112233445566778899aabbccddeeff",
        "8ea2b7ca516745bfeafc49904b496089",
    ),
    (
        "2b7e151628aed2a6abf7158809cf4f3c",
        "6bc1bee22e409f96e93d7e117393172a",
        "3ad77bb40d7a3660a89ecaf32466ef97",
    ),
    (
        "8e73b0f7da0e6452c810f32b809079e562f8ead2522c6b7b",
        "6bc1bee22e409f96e93d7e117393172a",
        "bd334f1d6e45f25ff712a214571fa5cc",
    ),
    (
        "603deb1015ca71be2b73aef0857d77811f352c073b6108d72d9810a30914dff4",
        "6bc1bee22e409f96e93d7e117393172a",
        "f3eed1bdb5d2a03c064b5a7e3db181f8",
    ),
];

fn decode_block(hex_str: &str) -> Result<[u8; BLOCK_LEN]> {
    let bytes = hex::decode(hex_str).context("decode vector hex")?;
    Ok(taes_core::block_from_slice(&bytes)?)
}

fn cmd_verify() -> Result<()> {
    let mut backends = vec![Backend::Software];
    if ni::is_supported() {
        backends.push(Backend::Hardware);
    } else {
        println!("hardware: skipped (AES-NI not detected)");
    }

    let mut failures = 0usize;
    for backend in backends {
        for (key_hex, pt_hex, ct_hex) in VECTORS {
            let key = Key::from_bytes(&hex::decode(key_hex).context("decode vector hex")?)?;
            let size = key.size();
            let cipher = Cipher::new(CipherConfig::new(size).with_backend(backend), &key)?;
            let pt = decode_block(pt_hex)?;
            let ct = decode_block(ct_hex)?;

            let ok = cipher.encrypt_block(&pt, None) == ct && cipher.decrypt_block(&ct, None) == pt;
            if !ok {
                failures += 1;
            }
            println!(
                "{backend:>8} {size} {key_hex}: {}",
                if ok { "PASS" } else { "FAIL" }
            );
        }
    }
    if failures > 0 {
        bail!("{failures} vector(s) failed");
    }
    Ok(())
}

fn hamming(a: &[u8; BLOCK_LEN], b: &[u8; BLOCK_LEN]) -> usize {
    a.iter().zip(b).map(|(x, y)| (x ^ y).count_ones() as usize).sum()
}

/// Histogram indexed by Hamming distance (0..=128).
fn tweak_histogram(
    rng: &mut impl RngCore,
    experiments: u32,
    max_tweak: u64,
) -> Result<Vec<u64>> {
    let mut histogram = vec![0u64; 8 * BLOCK_LEN + 1];
    for _ in 0..experiments {
        let mut key_bytes = [0u8; 16];
        rng.fill_bytes(&mut key_bytes);
        let cipher = Cipher::new(CipherConfig::new(KeySize::Aes128), &Key::from_bytes(&key_bytes)?)?;
        let pt: [u8; BLOCK_LEN] = rng.gen();

        let mut prev = cipher.encrypt_block(&pt, Some(&Tweak::new(0u128.to_le_bytes())));
        for t in 1..=max_tweak {
            let tweak = Tweak::new(u128::from(t).to_le_bytes());
            let ct = cipher.encrypt_block(&pt, Some(&tweak));
            histogram[hamming(&prev, &ct)] += 1;
            prev = ct;
        }
    }
    Ok(histogram)
}

fn mean_distance(histogram: &[u64]) -> Option<f64> {
    let count: u64 = histogram.iter().sum();
    if count == 0 {
        return None;
    }
    let total: u64 = histogram
        .iter()
        .enumerate()
        .map(|(distance, n)| distance as u64 * n)
        .sum();
    Some(total as f64 / count as f64)
}

fn cmd_stat(experiments: u32, max_tweak: u64, seed: Option<u64>) -> Result<()> {
    if max_tweak == 0 {
        bail!("--max-tweak must be at least 1");
    }
    let mut rng = seeded_rng(seed);
    let histogram = tweak_histogram(&mut rng, experiments, max_tweak)?;

    let mut out = io::stdout().lock();
    writeln!(out, "hamming_distance,count")?;
    for (distance, count) in histogram.iter().enumerate().filter(|(_, n)| **n > 0) {
        writeln!(out, "{distance},{count}")?;
    }
    out.flush()?;
    if let Some(mean) = mean_distance(&histogram) {
        eprintln!("mean hamming distance: {mean:.3} of {} bits", 8 * BLOCK_LEN);
    }
    Ok(())
}

fn seeded_rng(seed: Option<u64>) -> ChaCha20Rng {
    match seed {
        Some(value) => {
            let mut seed_bytes = [0u8; 32];
            seed_bytes[..8].copy_from_slice(&value.to_le_bytes());
            ChaCha20Rng::from_seed(seed_bytes)
        }
        None => ChaCha20Rng::from_entropy(),
    }
}
