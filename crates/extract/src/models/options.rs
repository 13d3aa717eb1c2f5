use serde::{Deserialize, Serialize};

/// Knobs for locating and tidying the post body of a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractOptions {
    /// CSS selectors tried in order; the first whose text is long enough wins.
    pub content_selectors: Vec<String>,
    /// Minimum number of characters of text a content candidate must carry.
    pub min_content_chars: usize,
    /// Site or brand names stripped from the end of titles (`"Post - Brand"`).
    pub title_suffixes: Vec<String>,
}
impl Default for ExtractOptions {
    fn default() -> Self {
        let selectors = [
            ".et_pb_module.et_pb_post_content",
            ".et_pb_post_content_0_tb_body",
            ".et_pb_post_content",
            ".et_pb_text_inner",
            ".fl-darklinks",
            ".entry-content",
            ".post-content",
            ".article-content",
            "article .content",
            "article",
            "main article",
            "main",
            "div[itemprop='articleBody']",
            ".single-content",
            ".blog-post-content",
            ".content-area",
            "#content",
        ];
        Self {
            content_selectors: selectors.into_iter().map(String::from).collect(),
            min_content_chars: 100,
            title_suffixes: Vec::new(),
        }
    }
}
