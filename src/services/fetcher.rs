use crate::config::ReaderConfig;
use crate::error::{NovelQuestError, Result};
use crate::types::{FetchedContent, SourceType};
use regex::Regex;
use std::path::Path;
use tokio::fs;
use tracing::{debug, info};
use url::Url;

const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko)";

/// Elements whose whole subtree is dropped before text extraction.
const NOISE_ELEMENTS: [&str; 7] = [
    "script", "style", "nav", "footer", "header", "aside", "noscript",
];

const FALLBACK_LINK_NAME: &str = "Web Article";

pub struct ContentFetcher {
    client: reqwest::Client,
    extractor: HtmlExtractor,
    content_limit: usize,
    title_limit: usize,
    pdf_page_limit: usize,
}

impl ContentFetcher {
    pub fn new(config: &ReaderConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.fetch_timeout())
            .build()?;

        Ok(Self {
            client,
            extractor: HtmlExtractor::new()?,
            content_limit: config.link_content_limit,
            title_limit: config.link_title_limit,
            pdf_page_limit: config.pdf_page_limit,
        })
    }

    pub async fn fetch_content(&self, source: &str) -> Result<FetchedContent> {
        if Self::is_url(source) {
            self.fetch_from_url(source).await
        } else if Self::is_pdf(source) {
            self.fetch_from_pdf(source).await
        } else {
            Self::fetch_from_file(source).await
        }
    }

    async fn fetch_from_url(&self, url: &str) -> Result<FetchedContent> {
        info!("Fetching content from URL: {}", url);

        let parsed_url = Url::parse(url)?;
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(NovelQuestError::HttpStatus {
                status: response.status().as_u16(),
            });
        }

        let html = response.text().await?;
        let content = truncate_chars(&self.extractor.extract_text(&html), self.content_limit);
        let name = self
            .extractor
            .extract_title(&html)
            .or_else(|| Self::extract_name_from_url(&parsed_url))
            .map(|title| truncate_chars(&title, self.title_limit))
            .unwrap_or_else(|| FALLBACK_LINK_NAME.to_string());

        debug!("Extracted {} characters from {}", content.len(), url);

        Ok(FetchedContent {
            name,
            content,
            source_type: SourceType::Url,
        })
    }

    async fn fetch_from_pdf(&self, file_path: &str) -> Result<FetchedContent> {
        info!("Extracting text from PDF: {}", file_path);

        let path = Self::existing_file(file_path)?;
        let bytes = fs::read(path).await?;

        let document = lopdf::Document::load_mem(&bytes).map_err(|e| NovelQuestError::Pdf {
            reason: format!("Cannot parse {}: {}", file_path, e),
        })?;

        let page_numbers: Vec<u32> = document
            .get_pages()
            .keys()
            .copied()
            .take(self.pdf_page_limit)
            .collect();

        let mut content = String::new();
        for number in page_numbers {
            match document.extract_text(&[number]) {
                Ok(text) if !text.trim().is_empty() => {
                    content.push_str(&text);
                    content.push('\n');
                }
                Ok(_) => {}
                Err(e) => debug!("No text on page {} of {}: {}", number, file_path, e),
            }
        }

        Ok(FetchedContent {
            name: Self::file_name(path),
            content,
            source_type: SourceType::Pdf,
        })
    }

    async fn fetch_from_file(file_path: &str) -> Result<FetchedContent> {
        info!("Reading file: {}", file_path);

        let path = Self::existing_file(file_path)?;
        let content = fs::read_to_string(path).await?;

        Ok(FetchedContent {
            name: Self::file_name(path),
            content,
            source_type: SourceType::LocalFile,
        })
    }

    fn existing_file(file_path: &str) -> Result<&Path> {
        let path = Path::new(file_path);
        if !path.is_file() {
            return Err(NovelQuestError::FileNotFound {
                path: file_path.to_string(),
            });
        }
        Ok(path)
    }

    fn file_name(path: &Path) -> String {
        path.file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
            .to_string()
    }

    fn is_url(source: &str) -> bool {
        source.starts_with("http://") || source.starts_with("https://")
    }

    fn is_pdf(source: &str) -> bool {
        Path::new(source)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("pdf"))
    }

    fn extract_name_from_url(url: &Url) -> Option<String> {
        url.path_segments()
            .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
            .map(|name| name.to_string())
    }

    pub fn validate_source(source: &str) -> Result<()> {
        if Self::is_url(source) {
            Url::parse(source)?;
        } else {
            Self::existing_file(source)?;
        }
        Ok(())
    }
}

/// Regex-based readable-text extraction from HTML.
pub struct HtmlExtractor {
    noise: Vec<Regex>,
    comment: Regex,
    line_break: Regex,
    tag: Regex,
    title: Regex,
}

impl HtmlExtractor {
    pub fn new() -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern).map_err(|e| NovelQuestError::Config {
                reason: format!("Invalid extraction pattern {}: {}", pattern, e),
            })
        };

        let noise = NOISE_ELEMENTS
            .iter()
            .map(|tag| compile(format!(r"(?is)<{tag}\b[^>]*>.*?</{tag}\s*>").as_str()))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            noise,
            comment: compile(r"(?s)<!--.*?-->")?,
            line_break: compile(r"(?i)<\s*(br|/p|/div|/h[1-6]|/li|/tr)\b[^>]*>")?,
            tag: compile(r"(?s)<[^>]*>")?,
            title: compile(r"(?is)<title[^>]*>(.*?)</title\s*>")?,
        })
    }

    pub fn extract_text(&self, html: &str) -> String {
        let mut text = self.comment.replace_all(html, " ").into_owned();
        for pattern in &self.noise {
            text = pattern.replace_all(&text, " ").into_owned();
        }
        text = self.line_break.replace_all(&text, "\n").into_owned();
        text = self.tag.replace_all(&text, " ").into_owned();
        let text = decode_entities(&text);

        text.lines()
            .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn extract_title(&self, html: &str) -> Option<String> {
        self.title
            .captures(html)
            .and_then(|captures| captures.get(1))
            .map(|title| {
                decode_entities(title.as_str())
                    .split_whitespace()
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .filter(|title| !title.is_empty())
    }
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

fn truncate_chars(text: &str, limit: usize) -> String {
    text.chars().take(limit).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html>
<head><title>  The   Long Road &amp; Beyond </title>
<style>body { color: red; }</style>
<script>var words = "should not appear";</script></head>
<body>
<header>Site Header</header>
<nav><a href="/">Home</a></nav>
<h1>Chapter One</h1>
<p>It was a <b>bright</b> cold day.</p>
<!-- tracking pixel -->
<p>The clocks were striking&nbsp;thirteen.</p>
<aside>Related links</aside>
<footer>Copyright</footer>
</body></html>"#;

    #[test]
    fn test_noise_elements_removed() {
        let extractor = HtmlExtractor::new().unwrap();
        let text = extractor.extract_text(PAGE);

        assert!(text.contains("Chapter One"));
        assert!(text.contains("It was a bright cold day."));
        assert!(text.contains("The clocks were striking thirteen."));
        for noise in [
            "should not appear",
            "Site Header",
            "Home",
            "Related links",
            "Copyright",
            "color: red",
            "tracking pixel",
        ] {
            assert!(!text.contains(noise), "found {:?} in {:?}", noise, text);
        }
        assert!(text.lines().all(|line| !line.trim().is_empty()));
    }

    #[test]
    fn test_title_extraction() {
        let extractor = HtmlExtractor::new().unwrap();
        assert_eq!(
            extractor.extract_title(PAGE).as_deref(),
            Some("The Long Road & Beyond")
        );
        assert_eq!(extractor.extract_title("<p>no title</p>"), None);
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo wörld", 4), "héll");
        assert_eq!(truncate_chars("short", 60), "short");
    }

    #[test]
    fn test_name_from_url_path() {
        let url = Url::parse("https://example.com/books/moby-dick/").unwrap();
        assert_eq!(
            ContentFetcher::extract_name_from_url(&url).as_deref(),
            Some("moby-dick")
        );
        let bare = Url::parse("https://example.com/").unwrap();
        assert_eq!(ContentFetcher::extract_name_from_url(&bare), None);
    }

    #[test]
    fn test_source_classification() {
        assert!(ContentFetcher::is_url("https://example.com/a"));
        assert!(!ContentFetcher::is_url("notes.txt"));
        assert!(ContentFetcher::is_pdf("book.PDF"));
        assert!(!ContentFetcher::is_pdf("book.txt"));
    }

    #[tokio::test]
    async fn test_fetch_plain_text_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("story.txt");
        tokio::fs::write(&path, "Once upon a time").await.unwrap();

        let fetcher = ContentFetcher::new(&ReaderConfig::default()).unwrap();
        let fetched = fetcher
            .fetch_content(path.to_str().unwrap())
            .await
            .unwrap();

        assert_eq!(fetched.name, "story.txt");
        assert_eq!(fetched.content, "Once upon a time");
        assert_eq!(fetched.source_type, SourceType::LocalFile);
    }

    #[tokio::test]
    async fn test_missing_file_is_reported() {
        let fetcher = ContentFetcher::new(&ReaderConfig::default()).unwrap();
        let result = fetcher.fetch_content("/definitely/not/here.txt").await;
        assert!(matches!(result, Err(NovelQuestError::FileNotFound { .. })));
        assert!(ContentFetcher::validate_source("/definitely/not/here.txt").is_err());
        assert!(ContentFetcher::validate_source("https://example.com").is_ok());
    }
}
