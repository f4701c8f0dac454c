use crate::error::{NovelQuestError, Result};
use crate::types::{Page, PaginationStats};
use tracing::debug;

/// Text of the single page produced for a document with no words.
pub const EMPTY_DOCUMENT_MESSAGE: &str = "This document is empty.";

/// Splits text into fixed-size pages by word count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paginator {
    page_size: usize,
}

impl Paginator {
    pub fn new(page_size: usize) -> Result<Self> {
        if page_size == 0 {
            return Err(NovelQuestError::Config {
                reason: "Page size must be greater than 0".to_string(),
            });
        }
        Ok(Self { page_size })
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Never returns an empty sequence.
    pub fn paginate(&self, text: &str) -> Vec<Page> {
        let words: Vec<&str> = text.split_whitespace().collect();

        if words.is_empty() {
            return vec![Page {
                index: 0,
                content: EMPTY_DOCUMENT_MESSAGE.to_string(),
                word_count: 0,
            }];
        }

        let pages: Vec<Page> = words
            .chunks(self.page_size)
            .enumerate()
            .map(|(index, chunk)| Page {
                index,
                content: chunk.join(" "),
                word_count: chunk.len(),
            })
            .collect();

        debug!(
            "Paginated {} words into {} pages of up to {} words",
            words.len(),
            pages.len(),
            self.page_size
        );

        pages
    }

    pub fn stats(&self, pages: &[Page]) -> PaginationStats {
        let total_words: usize = pages.iter().map(|p| p.word_count).sum();
        let total_pages = pages.len();

        let avg_words_per_page = if total_pages > 0 {
            total_words as f64 / total_pages as f64
        } else {
            0.0
        };

        PaginationStats {
            total_words,
            total_pages,
            page_size: self.page_size,
            avg_words_per_page,
            last_page_words: pages.last().map(|p| p.word_count).unwrap_or(0),
        }
    }
}

impl Default for Paginator {
    fn default() -> Self {
        Self {
            page_size: crate::config::DEFAULT_PAGE_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn words(n: usize) -> String {
        (0..n).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn test_700_words_make_three_pages() {
        let paginator = Paginator::new(275).unwrap();
        let pages = paginator.paginate(&words(700));

        let sizes: Vec<usize> = pages.iter().map(|p| p.word_count).collect();
        assert_eq!(sizes, vec![275, 275, 150]);
        assert_eq!(pages[2].index, 2);
        assert!(pages[1].content.starts_with("w275 "));
    }

    #[test]
    fn test_pages_reconstruct_word_sequence() {
        let text = "  The quick\tbrown\n\nfox   jumps over\r\nthe lazy dog.  ";
        let paginator = Paginator::new(3).unwrap();
        let pages = paginator.paginate(text);

        let rebuilt: Vec<&str> = pages
            .iter()
            .flat_map(|p| p.content.split(' '))
            .collect();
        let original: Vec<&str> = text.split_whitespace().collect();
        assert_eq!(rebuilt, original);
        assert_eq!(pages.len(), 3);
    }

    #[test]
    fn test_pagination_is_deterministic() {
        let paginator = Paginator::new(7).unwrap();
        let text = words(50);
        assert_eq!(paginator.paginate(&text), paginator.paginate(&text));
    }

    #[test]
    fn test_empty_text_yields_placeholder_page() {
        let paginator = Paginator::default();
        for text in ["", "   ", "\n\t \r\n"] {
            let pages = paginator.paginate(text);
            assert_eq!(pages.len(), 1);
            assert_eq!(pages[0].content, EMPTY_DOCUMENT_MESSAGE);
            assert_eq!(pages[0].word_count, 0);
        }
    }

    #[test]
    fn test_exact_multiple_has_no_trailing_page() {
        let paginator = Paginator::new(10).unwrap();
        let pages = paginator.paginate(&words(30));
        assert_eq!(pages.len(), 3);
        assert!(pages.iter().all(|p| p.word_count == 10));
    }

    #[test]
    fn test_zero_page_size_rejected() {
        assert!(matches!(
            Paginator::new(0),
            Err(NovelQuestError::Config { .. })
        ));
    }

    #[test]
    fn test_stats() {
        let paginator = Paginator::new(275).unwrap();
        let pages = paginator.paginate(&words(700));
        let stats = paginator.stats(&pages);

        assert_eq!(stats.total_words, 700);
        assert_eq!(stats.total_pages, 3);
        assert_eq!(stats.last_page_words, 150);
        assert!((stats.avg_words_per_page - 700.0 / 3.0).abs() < f64::EPSILON);
    }

    /// Words separated by a mix of ASCII and Unicode whitespace, possibly empty.
    fn mixed_text() -> impl Strategy<Value = String> {
        "[a-zA-Zé漢0-9.,!? \t\n\r\u{00A0}\u{2003}\u{3000}]{0,400}"
    }

    proptest! {
        #[test]
        fn pages_reconstruct_word_sequence(text in mixed_text(), page_size in 1usize..=50) {
            let paginator = Paginator::new(page_size).unwrap();
            let pages = paginator.paginate(&text);
            let original: Vec<&str> = text.split_whitespace().collect();

            if original.is_empty() {
                prop_assert_eq!(pages.len(), 1);
                prop_assert_eq!(pages[0].content.as_str(), EMPTY_DOCUMENT_MESSAGE);
            } else {
                let rebuilt: Vec<&str> = pages
                    .iter()
                    .flat_map(|p| p.content.split_whitespace())
                    .collect();
                prop_assert_eq!(rebuilt, original);
            }
        }

        #[test]
        fn full_pages_until_the_last(text in mixed_text(), page_size in 1usize..=50) {
            let pages = Paginator::new(page_size).unwrap().paginate(&text);
            let (last, full) = pages.split_last().unwrap();

            for (i, page) in pages.iter().enumerate() {
                prop_assert_eq!(page.index, i);
            }
            prop_assert!(full.iter().all(|p| p.word_count == page_size));
            prop_assert!(last.word_count <= page_size);
        }

        #[test]
        fn pagination_is_deterministic_for_any_input(text in any::<String>(), page_size in 1usize..=50) {
            let paginator = Paginator::new(page_size).unwrap();
            prop_assert_eq!(paginator.paginate(&text), paginator.paginate(&text));
        }
    }
}
