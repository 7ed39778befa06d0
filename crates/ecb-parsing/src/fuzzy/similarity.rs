/// Character-bigram count profile of a string.
///
/// Whitespace runs are folded to a single space before shingling, so line
/// breaks inside a window compare like spaces.
#[derive(Debug, Clone, Default)]
pub struct BigramProfile {
    counts: Vec<((char, char), u32)>,
    norm: f64,
}

impl BigramProfile {
    pub fn new(text: &str) -> Self {
        let folded = fold_whitespace(text);
        let mut counts: Vec<((char, char), u32)> = Vec::new();
        for pair in folded.windows(2) {
            let key = (pair[0], pair[1]);
            match counts.iter_mut().find(|(k, _)| *k == key) {
                Some((_, n)) => *n += 1,
                None => counts.push((key, 1)),
            }
        }
        let norm = counts
            .iter()
            .map(|(_, n)| f64::from(*n).powi(2))
            .sum::<f64>()
            .sqrt();
        Self { counts, norm }
    }

    /// No bigrams at all (fewer than two characters after folding).
    pub fn is_degenerate(&self) -> bool {
        self.counts.is_empty()
    }

    fn count(&self, key: (char, char)) -> u32 {
        self.counts
            .iter()
            .find(|(k, _)| *k == key)
            .map_or(0, |(_, n)| *n)
    }

    /// Cosine similarity of the two count vectors, `None` if either is degenerate.
    pub fn cosine(&self, other: &BigramProfile) -> Option<f64> {
        if self.is_degenerate() || other.is_degenerate() {
            return None;
        }
        let dot: f64 = self
            .counts
            .iter()
            .map(|(k, n)| f64::from(*n) * f64::from(other.count(*k)))
            .sum();
        Some(dot / (self.norm * other.norm))
    }
}

/// Similarity in `[0, 1]`, rounded to three decimals.
///
/// Degenerate profiles score 0. Rounding makes neighbouring windows with
/// the same shingle overlap compare exactly equal, which plateau detection
/// relies on.
pub fn similarity(a: &BigramProfile, b: &BigramProfile) -> f64 {
    a.cosine(b).map_or(0.0, round3)
}

fn round3(x: f64) -> f64 {
    (x * 1000.0).round() / 1000.0
}

fn fold_whitespace(text: &str) -> Vec<char> {
    let mut out = Vec::with_capacity(text.len());
    let mut in_space = false;
    for c in text.chars() {
        if c.is_whitespace() {
            if !in_space {
                out.push(' ');
            }
            in_space = true;
        } else {
            out.push(c);
            in_space = false;
        }
    }
    out
}
