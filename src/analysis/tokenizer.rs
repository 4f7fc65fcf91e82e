use unicode_segmentation::UnicodeSegmentation;

/// A single analyzed term and its position in the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    pub position: u32,
}

impl Token {
    pub fn new(text: String, position: u32) -> Self {
        Token { text, position }
    }
}

pub trait Tokenizer: Send + Sync {
    fn tokenize(&self, text: &str) -> Vec<Token>;

    fn name(&self) -> &str;
}

/// Splits on Unicode word boundaries (UAX #29).
#[derive(Debug, Clone)]
pub struct StandardTokenizer {
    pub max_token_length: usize,
}

impl Default for StandardTokenizer {
    fn default() -> Self {
        StandardTokenizer {
            max_token_length: 255,
        }
    }
}

impl Tokenizer for StandardTokenizer {
    fn tokenize(&self, text: &str) -> Vec<Token> {
        let mut tokens = Vec::new();
        let mut position = 0u32;

        for word in text.unicode_words() {
            // Over-long words still consume a position so phrase gaps stay honest
            if word.len() <= self.max_token_length {
                tokens.push(Token::new(word.to_string(), position));
            }
            position += 1;
        }

        tokens
    }

    fn name(&self) -> &str {
        "standard"
    }
}
