//! # Harmonic Scoring
//!
//! Decides which spectral peak is the fundamental rather than an overtone.
//! A true fundamental has strong energy sitting at its 2nd, 3rd and 4th
//! harmonics; a stray overtone usually does not. Each candidate's power is
//! correlated with the power found around its harmonic locations and the
//! highest score wins.

/// Lowest bin a harmonic target may be centred on.
const MIN_HARMONIC_BIN: usize = 2;

/// Scores every peak against the power near its harmonics.
///
/// For a peak at bin `p` and each multiplier `m`, the target bin
/// `t = round(p·m)` is clamped into `[2, len - 3]` and
/// `(power[t-1] + power[t] + power[t+1]) · power[p]` is added to the score.
/// Peaks at bin 0 score zero, as does every peak when the spectrum is too
/// short to hold a target neighborhood.
pub fn score_peaks(powers: &[f64], peaks: &[usize], multipliers: &[f64]) -> Vec<f64> {
    let len = powers.len();
    if len < MIN_HARMONIC_BIN + 3 {
        return vec![0.0; peaks.len()];
    }
    let max_target = len - 3;

    peaks
        .iter()
        .map(|&peak| {
            if peak == 0 {
                return 0.0;
            }
            let own = powers[peak];
            multipliers
                .iter()
                .map(|&multiplier| {
                    let target = (peak as f64 * multiplier).round() as usize;
                    let t = target.clamp(MIN_HARMONIC_BIN, max_target);
                    (powers[t - 1] + powers[t] + powers[t + 1]) * own
                })
                .sum()
        })
        .collect()
}

/// Index of the highest score; the earliest wins ties. `None` for no scores.
pub fn best_candidate(scores: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &score) in scores.iter().enumerate() {
        if best.is_none_or(|(_, max)| score > max) {
            best = Some((i, score));
        }
    }
    best.map(|(i, _)| i)
}

/// Picks the peak most likely to be the fundamental.
pub fn select_fundamental(powers: &[f64], peaks: &[usize], multipliers: &[f64]) -> Option<usize> {
    let scores = score_peaks(powers, peaks, multipliers);
    tracing::trace!(?peaks, ?scores, "harmonic scores");
    best_candidate(&scores).map(|i| peaks[i])
}

#[cfg(test)]
mod tests {
    use super::*;

    const HARMONICS: [f64; 3] = [2.0, 3.0, 4.0];

    #[test]
    fn fundamental_beats_louder_overtone() {
        let mut powers = vec![1.0; 64];
        powers[10] = 50.0; // fundamental
        powers[20] = 100.0; // 2nd harmonic, louder
        powers[30] = 30.0;
        powers[40] = 20.0;

        let winner = select_fundamental(&powers, &[20, 10, 30, 40, 21], &HARMONICS);
        assert_eq!(winner, Some(10));
    }

    #[test]
    fn score_adds_three_neighbours_per_harmonic() {
        let mut powers = vec![0.0; 32];
        powers[4] = 2.0;
        powers[7] = 1.0;
        powers[8] = 3.0;
        powers[9] = 1.0;

        // Only the x2 target at bin 8 sees energy: (1 + 3 + 1) * 2.
        let scores = score_peaks(&powers, &[4], &HARMONICS);
        assert_eq!(scores, vec![10.0]);
    }

    #[test]
    fn harmonic_target_is_clamped_to_spectrum_end() {
        let mut powers = vec![0.0; 16];
        powers[12] = 1.0;
        powers[13] = 1.0;
        powers[14] = 1.0;
        powers[15] = 9.0; // outside the t+1 reach of the clamped target at 13

        let scores = score_peaks(&powers, &[12], &[2.0]);
        assert_eq!(scores, vec![3.0]);
    }

    #[test]
    fn harmonic_target_rounds_to_nearest_bin() {
        let mut powers = vec![0.0; 32];
        powers[3] = 1.0;
        // 3 * 2.5 = 7.5 rounds to 8, so bins 7..=9 are read.
        powers[9] = 4.0;
        assert_eq!(score_peaks(&powers, &[3], &[2.5]), vec![4.0]);
    }

    #[test]
    fn zero_bin_scores_nothing() {
        let powers = vec![5.0; 16];
        assert_eq!(score_peaks(&powers, &[0, 2], &HARMONICS)[0], 0.0);
    }

    #[test]
    fn short_spectrum_scores_zero() {
        assert_eq!(score_peaks(&[1.0; 4], &[2, 3], &HARMONICS), vec![0.0, 0.0]);
    }

    #[test]
    fn ties_go_to_first_candidate() {
        assert_eq!(best_candidate(&[1.0, 3.0, 3.0, 2.0]), Some(1));
        assert_eq!(best_candidate(&[0.0, 0.0]), Some(0));
        assert_eq!(best_candidate(&[]), None);
    }
}
