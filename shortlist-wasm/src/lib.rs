use shortlist_core::types::Count;
use shortlist_core::{
    align_corpus, build_shortlist, write_lexicon, write_moses_pairs, AlignOptions,
    ParallelCorpus, ShortlistError, ShortlistOptions, Vocabulary,
};
use wasm_bindgen::prelude::*;

#[wasm_bindgen]
pub struct ShortlistOutput {
    shortlist: String,
    lex_s2t: String,
    lex_t2s: String,
    skipped: usize,
}

#[wasm_bindgen]
impl ShortlistOutput {
    #[wasm_bindgen(getter)]
    pub fn shortlist(&self) -> String {
        self.shortlist.clone()
    }
    #[wasm_bindgen(getter)]
    pub fn lex_s2t(&self) -> String {
        self.lex_s2t.clone()
    }
    #[wasm_bindgen(getter)]
    pub fn lex_t2s(&self) -> String {
        self.lex_t2s.clone()
    }
    #[wasm_bindgen(getter)]
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

fn js_err(e: ShortlistError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn options(iterations: usize, null_prob: f64, max_candidates: usize) -> ShortlistOptions {
    let align = AlignOptions::default()
        .with_iterations(iterations)
        .with_null_prob(null_prob as Count);
    ShortlistOptions::default()
        .with_align(align)
        .with_max_candidates(max_candidates)
}

fn render<F>(fill: F) -> Result<String, JsValue>
where
    F: FnOnce(&mut Vec<u8>) -> std::io::Result<()>,
{
    let mut buf = Vec::new();
    fill(&mut buf).map_err(|e| JsValue::from_str(&e.to_string()))?;
    String::from_utf8(buf).map_err(|e| JsValue::from_str(&e.to_string()))
}

/// Build a shortlist from whitespace-tokenized text. `vocab_text` holds one
/// target token per line.
#[wasm_bindgen]
pub fn build_plaintext(
    source_text: &str,
    target_text: &str,
    vocab_text: &str,
    iterations: usize,
    null_prob: f64,
    max_candidates: usize,
) -> Result<ShortlistOutput, JsValue> {
    let corpus = ParallelCorpus::from_plaintext(source_text, target_text).map_err(js_err)?;
    let vocab = Vocabulary::read(vocab_text.as_bytes())
        .map_err(|e| JsValue::from_str(&e.to_string()))?;
    let run = build_shortlist(&corpus, &vocab, &options(iterations, null_prob, max_candidates))
        .map_err(js_err)?;

    let (src_words, tgt_words) = (&corpus.source.words, &corpus.target.words);
    Ok(ShortlistOutput {
        shortlist: render(|w| run.shortlist.write(w))?,
        lex_s2t: render(|w| write_lexicon(w, &run.lexicon.source_to_target, src_words, tgt_words))?,
        lex_t2s: render(|w| write_lexicon(w, &run.lexicon.target_to_source, tgt_words, src_words))?,
        skipped: run.skipped,
    })
}

/// Symmetric grow-diag-final-and alignments in Moses format.
#[wasm_bindgen]
pub fn align_plaintext(
    source_text: &str,
    target_text: &str,
    iterations: usize,
    null_prob: f64,
) -> Result<String, JsValue> {
    let corpus = ParallelCorpus::from_plaintext(source_text, target_text).map_err(js_err)?;
    let run = align_corpus(&corpus, &options(iterations, null_prob, 1)).map_err(js_err)?;
    Ok(write_moses_pairs(&run.symmetric))
}
