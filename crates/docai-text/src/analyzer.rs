use std::sync::OnceLock;
use tantivy::tokenizer::{LowerCaser, SimpleTokenizer, StopWordFilter, TextAnalyzer, TokenStream};

const STOP_WORDS: &[&str] = &[
	"a","an","and","are","as","at","be","by","for","from","has","he","in","is","it","its","of","on","that","the","to","was","will","with","or","but","not","this","these","they","them","their","there","then","than","so","if","when","where","why","how","what","which","who","whom","whose","can","could","should","would","may","might","must","shall","do","does","did","have","had","having",
];

fn prototype() -> &'static TextAnalyzer {
	static ANALYZER: OnceLock<TextAnalyzer> = OnceLock::new();
	ANALYZER.get_or_init(|| {
		TextAnalyzer::builder(SimpleTokenizer::default())
			.filter(LowerCaser)
			.filter(StopWordFilter::remove(STOP_WORDS.iter().map(|s| s.to_string())))
			.build()
	})
}

/// Split `text` into lower-cased terms with stop words removed. Indexing and
/// querying must go through this same function.
pub fn analyze(text: &str) -> Vec<String> {
	let mut analyzer = prototype().clone();
	let mut stream = analyzer.token_stream(text);
	let mut terms = Vec::new();
	while stream.advance() { terms.push(stream.token().text.clone()); }
	terms
}
