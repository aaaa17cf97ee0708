/// A ranked term pulled out of a thread's comments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keyword {
    pub term: String,
    /// Raw occurrence count, always at least 1.
    pub weight: u32,
}

impl Keyword {
    pub fn new(term: impl Into<String>, weight: u32) -> Self {
        Self {
            term: term.into(),
            weight,
        }
    }
}

/// A keyword after stylistic rewriting; the weight is never touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyledKeyword {
    pub display_text: String,
    pub weight: u32,
}

/// What the bot needs to know about a listed submission to decide whether to take it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionSummary {
    pub id: String,
    pub title: String,
    pub num_comments: u32,
}

/// An image published on the image host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostedImage {
    pub id: String,
    pub link: String,
}
