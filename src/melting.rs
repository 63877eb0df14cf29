//! Nearest-neighbor melting temperature.
//!
//! Enthalpy/entropy increments follow the unified SantaLucia '98 parameter
//! set, with duplex initiation and terminal A·T penalties, a salt correction
//! applied to the entropy term, and the two-state equation
//! `Tm = 1000 * dH / (dS + R * ln(Ct / 4)) - 273.15`.
//!
//! Every constant lives in this module so the reported temperatures are
//! reproducible to the digit across runs and platforms.

/// Universal gas constant, cal/(K*mol).
const GAS_CONSTANT: f64 = 1.987;

/// Monovalent cation concentration, mol/L (50 mM Na+).
const SODIUM_MOLAR: f64 = 0.05;

/// Total primer strand concentration, mol/L (250 nM).
const PRIMER_MOLAR: f64 = 250e-9;

/// Duplex initiation increments (dH kcal/mol, dS cal/(K*mol)).
const INIT_DH: f64 = 0.2;
const INIT_DS: f64 = -5.7;

/// Penalty per terminal A·T pair.
const TERMINAL_AT_DH: f64 = 2.2;
const TERMINAL_AT_DS: f64 = 6.9;

/// dH/dS for a stacked pair of neighboring bases, read 5'->3'. Each duplex
/// stack appears under both of its strand readings, so a lookup never misses
/// on A/C/G/T input.
fn nn_params(pair: (u8, u8)) -> (f64, f64) {
    match pair {
        (b'A', b'A') | (b'T', b'T') => (-7.6, -21.3),
        (b'A', b'T') => (-7.2, -20.4),
        (b'T', b'A') => (-7.2, -21.3),
        (b'C', b'A') | (b'T', b'G') => (-8.5, -22.7),
        (b'G', b'T') | (b'A', b'C') => (-8.4, -22.4),
        (b'C', b'T') | (b'A', b'G') => (-7.8, -21.0),
        (b'G', b'A') | (b'T', b'C') => (-8.2, -22.2),
        (b'C', b'G') => (-10.6, -27.2),
        (b'G', b'C') => (-9.8, -24.4),
        (b'G', b'G') | (b'C', b'C') => (-8.0, -19.9),
        // tolerated for non-ACGT input; contributes nothing
        _ => (0.0, 0.0),
    }
}

/// Melting temperature of `seq` in degrees Celsius. Deterministic for a given
/// sequence; strand-symmetric (a window and its reverse complement melt at
/// the same temperature).
pub fn melting_temp(seq: &[u8]) -> f64 {
    if seq.len() < 2 {
        return 0.0;
    }

    let mut dh = INIT_DH;
    let mut ds = INIT_DS;

    for &terminal in [seq[0], seq[seq.len() - 1]].iter() {
        if terminal == b'A' || terminal == b'T' {
            dh += TERMINAL_AT_DH;
            ds += TERMINAL_AT_DS;
        }
    }

    for pair in seq.windows(2) {
        let (pair_dh, pair_ds) = nn_params((pair[0], pair[1]));
        dh += pair_dh;
        ds += pair_ds;
    }

    // salt correction on the entropy term (0.368 * (N-1) * ln[Na+])
    ds += 0.368 * (seq.len() as f64 - 1.0) * SODIUM_MOLAR.ln();

    1000.0 * dh / (ds + GAS_CONSTANT * (PRIMER_MOLAR / 4.0).ln()) - 273.15
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seq::reverse_complement;

    #[test]
    fn test_melting_temp_exact() {
        // Hand-summed against the parameter table above:
        // 4x AC, 4x CG, 4x GT, 3x TA stacks, two terminal A·T ends.
        let tm = melting_temp(b"ACGTACGTACGTACGT");
        assert!((tm - 48.74).abs() < 0.05, "tm = {tm}");
    }

    #[test]
    fn test_melting_temp_strand_symmetric() {
        for seq in [&b"ACCAACACCAACCACC"[..], b"TTCAACCACAACCAAC", b"GATTACAGATTACAGA"] {
            let fwd = melting_temp(seq);
            let rev = melting_temp(&reverse_complement(seq));
            assert!((fwd - rev).abs() < 1e-9);
        }
    }

    #[test]
    fn test_melting_temp_tracks_gc() {
        let at_rich = melting_temp(b"AATTAATTAATTAATT");
        let mixed = melting_temp(b"ACGTACGTACGTACGT");
        let gc_rich = melting_temp(b"GCGCGCGCGCGCGCGC");
        assert!(at_rich < mixed);
        assert!(mixed < gc_rich);
    }

    #[test]
    fn test_melting_temp_deterministic() {
        let a = melting_temp(b"CAACCACAACCAACAA");
        let b = melting_temp(b"CAACCACAACCAACAA");
        assert_eq!(a, b);
    }
}
