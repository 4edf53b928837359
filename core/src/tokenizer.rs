use crate::postings::Offset;
use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::HashSet;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    static ref WORD: Regex = Regex::new(r"(?u)\p{L}[\p{L}\p{N}_']*|\p{N}+").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
    static ref STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "a","about","above","after","again","against","all","am","an","and","any","are","as","at",
            "be","because","been","before","being","below","between","both","but","by",
            "can","cannot","could","did","do","does","doing","down","during",
            "each","few","for","from","further",
            "had","has","have","having","he","her","here","hers","herself","him","himself","his","how",
            "i","if","in","into","is","it","it's","its","itself",
            "me","more","most","my","myself",
            "no","nor","not","of","off","on","once","only","or","other","our","ours","ourselves","out","over","own",
            "same","she","should","so","some","such",
            "than","that","the","their","theirs","them","themselves","then","there","these","they","this","those","through","to","too",
            "under","until","up","very",
            "was","we","were","what","when","where","which","while","who","whom","why","with","would",
            "you","your","yours","yourself","yourselves"
        ];
        words.iter().copied().collect()
    };
}

/// A normalized term and its word position in the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub term: String,
    pub offset: Offset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenizerOptions {
    pub stem: bool,
    pub remove_stopwords: bool,
}

impl Default for TokenizerOptions {
    fn default() -> Self {
        Self { stem: true, remove_stopwords: false }
    }
}

/// Tokenize with the default options: NFKC, lowercase, English stemming.
pub fn tokenize(text: &str) -> Vec<Token> {
    tokenize_with(text, TokenizerOptions::default())
}

/// Offsets count every word, including dropped stop words, so they stay strictly
/// increasing and phrase adjacency reflects the original text.
pub fn tokenize_with(text: &str, opts: TokenizerOptions) -> Vec<Token> {
    let normalized = text.nfkc().collect::<String>().to_lowercase();
    let mut tokens = Vec::new();
    for (pos, mat) in WORD.find_iter(&normalized).enumerate() {
        let word = mat.as_str();
        if opts.remove_stopwords && STOPWORDS.contains(word) {
            continue;
        }
        let term = if opts.stem { STEMMER.stem(word).into_owned() } else { word.to_string() };
        tokens.push(Token { term, offset: pos as Offset });
    }
    tokens
}

/// Number of words in `text`; the length used to normalise lexical scores.
pub fn document_length(text: &str) -> u32 {
    let normalized = text.nfkc().collect::<String>();
    WORD.find_iter(&normalized).count() as u32
}
