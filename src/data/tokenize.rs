// ============================================================
// Layer 4 — Tokenisation Stage
// ============================================================
// Lazily maps each Example to a TokenizedExample using any
// TextTokenizer. Nothing is buffered here: one example in,
// one tokenized example out, pulled on demand by the packer.
//
// Empty results are passed through unchanged — the packer
// decides what to do with them (it skips them).

use crate::domain::example::{Example, TokenizedExample};
use crate::domain::traits::TextTokenizer;
use crate::error::PipelineError;

/// Iterator adapter: Result<Example> → Result<TokenizedExample>
pub struct Tokenize<I, T> {
    examples:  I,
    tokenizer: T,
}

/// Wrap an example stream with a tokenizer.
pub fn tokenize<I, T>(examples: I, tokenizer: T) -> Tokenize<I::IntoIter, T>
where
    I: IntoIterator<Item = Result<Example, PipelineError>>,
    T: TextTokenizer,
{
    Tokenize {
        examples: examples.into_iter(),
        tokenizer,
    }
}

impl<I, T> Iterator for Tokenize<I, T>
where
    I: Iterator<Item = Result<Example, PipelineError>>,
    T: TextTokenizer,
{
    type Item = Result<TokenizedExample, PipelineError>;

    fn next(&mut self) -> Option<Self::Item> {
        let example = match self.examples.next()? {
            Ok(example) => example,
            Err(e)      => return Some(Err(e)),
        };
        Some(
            self.tokenizer
                .encode(&example.text)
                .map(TokenizedExample::new),
        )
    }
}
