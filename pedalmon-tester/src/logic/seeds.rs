use anyhow::{Result, bail};
use std::collections::HashSet;

const DEFAULT_SEED: u64 = 1337;

/// Resolve CLI seed tokens into concrete seeds, in order, without duplicates.
///
/// Accepts decimal integers (negative values use their magnitude), `0x` hex,
/// and `START..END` (optionally prefixed `range:`) for a half-open span of
/// consecutive seeds.
pub fn resolve_seed_inputs(tokens: &[String]) -> Result<Vec<u64>> {
    let mut seeds = Vec::new();
    let mut seen = HashSet::new();
    let mut push = |seed: u64, seeds: &mut Vec<u64>| {
        if seen.insert(seed) {
            seeds.push(seed);
        }
    };

    for token in tokens {
        if token.is_empty() {
            continue;
        }

        if let Ok(value) = token.parse::<i64>() {
            push(value.unsigned_abs(), &mut seeds);
            continue;
        }

        if let Ok(value) = token.parse::<u64>() {
            push(value, &mut seeds);
            continue;
        }

        if let Some(hex) = token
            .strip_prefix("0x")
            .or_else(|| token.strip_prefix("0X"))
            && let Ok(value) = u64::from_str_radix(&hex.replace('_', ""), 16)
        {
            push(value, &mut seeds);
            continue;
        }

        let span = token.strip_prefix("range:").unwrap_or(token);
        if let Some((start, end)) = span.split_once("..")
            && let (Ok(start), Ok(end)) = (start.parse::<u64>(), end.parse::<u64>())
        {
            for seed in start..end {
                push(seed, &mut seeds);
            }
            continue;
        }

        bail!("Unrecognized seed token: {token}");
    }

    if seeds.is_empty() {
        seeds.push(DEFAULT_SEED);
    }

    Ok(seeds)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn resolves_numeric_hex_and_ranges() {
        let seeds = resolve_seed_inputs(&tokens(&["42", "-7", "0xFF", "3..6", "42", "range:5..8"])).unwrap();
        assert_eq!(seeds, vec![42, 7, 255, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn empty_input_falls_back_to_default() {
        assert_eq!(resolve_seed_inputs(&[]).unwrap(), vec![DEFAULT_SEED]);
    }

    #[test]
    fn rejects_garbage() {
        assert!(resolve_seed_inputs(&tokens(&["banana"])).is_err());
        assert!(resolve_seed_inputs(&tokens(&["3..x"])).is_err());
    }
}
