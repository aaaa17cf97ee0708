use dogecloud_core::{Keyword, StyledKeyword};

pub const DEFAULT_INTENSIFIERS: [&str; 5] = ["so", "such", "very", "wow", "much"];

/// Prefixes every keyword with a randomly chosen intensifier.
pub struct Dogeifier {
    vocabulary: Vec<String>,
    rng: fastrand::Rng,
}

impl Dogeifier {
    /// An empty vocabulary falls back to [`DEFAULT_INTENSIFIERS`].
    pub fn new(vocabulary: &[String], rng: fastrand::Rng) -> Self {
        let mut vocabulary: Vec<String> = vocabulary
            .iter()
            .map(|w| w.trim().to_string())
            .filter(|w| !w.is_empty())
            .collect();
        if vocabulary.is_empty() {
            vocabulary = DEFAULT_INTENSIFIERS.iter().map(|w| w.to_string()).collect();
        }
        Self { vocabulary, rng }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self::new(&[], fastrand::Rng::with_seed(seed))
    }

    pub fn vocabulary(&self) -> &[String] {
        &self.vocabulary
    }

    pub fn style(&mut self, keyword: &Keyword) -> StyledKeyword {
        let prefix = &self.vocabulary[self.rng.usize(..self.vocabulary.len())];
        StyledKeyword {
            display_text: format!("{} {}", prefix, keyword.term),
            weight: keyword.weight,
        }
    }

    /// Style every keyword, keeping order and weights.
    pub fn style_all(&mut self, keywords: &[Keyword]) -> Vec<StyledKeyword> {
        keywords.iter().map(|k| self.style(k)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preserves_order_and_weights() {
        let keywords = vec![Keyword::new("cat", 5), Keyword::new("dog", 2)];
        let styled = Dogeifier::with_seed(7).style_all(&keywords);

        assert_eq!(styled.len(), 2);
        for (kw, st) in keywords.iter().zip(&styled) {
            assert_eq!(st.weight, kw.weight);
            let (prefix, term) = st.display_text.split_once(' ').unwrap();
            assert!(DEFAULT_INTENSIFIERS.contains(&prefix));
            assert_eq!(term, kw.term);
        }
    }

    #[test]
    fn test_same_seed_same_output() {
        let keywords: Vec<Keyword> = (0..20).map(|i| Keyword::new(format!("w{i}"), 1)).collect();
        assert_eq!(
            Dogeifier::with_seed(42).style_all(&keywords),
            Dogeifier::with_seed(42).style_all(&keywords)
        );
    }

    #[test]
    fn test_custom_vocabulary() {
        let vocab = vec!["many".to_string(), "  ".to_string()];
        let mut dogeifier = Dogeifier::new(&vocab, fastrand::Rng::with_seed(1));
        assert_eq!(dogeifier.vocabulary(), &["many".to_string()]);
        assert_eq!(
            dogeifier.style(&Keyword::new("bytes", 3)).display_text,
            "many bytes"
        );
    }
}
