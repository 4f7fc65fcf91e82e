use rust_stemmers::Algorithm;
use crate::analysis::filters::{LowercaseFilter, StemmerFilter, StopWordFilter, TokenFilter};
use crate::analysis::tokenizer::{StandardTokenizer, Token, Tokenizer};

/// Text analysis pipeline. The same instance analyzes documents at
/// indexing time and keyword queries at search time.
pub struct Analyzer {
    pub tokenizer: Box<dyn Tokenizer>,
    pub filters: Vec<Box<dyn TokenFilter>>,
    pub name: String,
}

impl Analyzer {
    pub fn new(name: String, tokenizer: Box<dyn Tokenizer>) -> Self {
        Analyzer {
            tokenizer,
            filters: Vec::new(),
            name,
        }
    }

    pub fn add_filter(mut self, filter: Box<dyn TokenFilter>) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn analyze(&self, text: &str) -> Vec<Token> {
        let mut tokens = self.tokenizer.tokenize(text);

        for filter in &self.filters {
            tokens = filter.filter(tokens);
        }

        tokens
    }

    /// Analyzed term texts only, positions dropped.
    pub fn terms(&self, text: &str) -> Vec<String> {
        self.analyze(text).into_iter().map(|t| t.text).collect()
    }

    /// Word tokenizer, lowercase, English stop words.
    pub fn standard_english() -> Self {
        Analyzer::new("standard_english".to_string(),
                      Box::new(StandardTokenizer::default()))
            .add_filter(Box::new(LowercaseFilter))
            .add_filter(Box::new(StopWordFilter::english()))
    }

    pub fn stemmed_english() -> Self {
        Analyzer::standard_english()
            .add_filter(Box::new(StemmerFilter::new(Algorithm::English)))
    }

    pub fn for_config(stemming: bool) -> Self {
        if stemming {
            Analyzer::stemmed_english()
        } else {
            Analyzer::standard_english()
        }
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Analyzer::standard_english()
    }
}
