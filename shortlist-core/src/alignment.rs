//! # Directional Alignment Training
//!
//! An IBM-Model-2 style model: lexical translation `t(f|e)`, a fixed NULL
//! probability and a distortion distribution over jumps from the diagonal.
//! Parameters are fitted by EM and the final alignment is the Viterbi
//! decoding under the last parameter set.
//!
//! `e` is the conditioning side and `f` the generated side; one link is
//! emitted per generated position.

use core::ops::Range;

use hashbrown::HashMap;

use crate::errors::{ShortlistError, ShortlistResult};
use crate::parallel::{map_collect, map_reduce, DEFAULT_CHUNK_SIZE};
use crate::text::{ParallelCorpus, Sentence, Text};
use crate::types::*;

/// Which corpus side is generated from which.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// Target words aligned to source positions.
    Forward,
    /// Source words aligned to target positions.
    Reverse,
}

impl Direction {
    /// `(conditioning, generated)` sides of the corpus.
    pub fn sides<'a>(&self, corpus: &'a ParallelCorpus) -> (&'a Text, &'a Text) {
        match self {
            Direction::Forward => (&corpus.source, &corpus.target),
            Direction::Reverse => (&corpus.target, &corpus.source),
        }
    }
}

#[derive(Clone, Debug)]
pub struct AlignOptions {
    /// EM iterations; at least 1.
    pub iterations: usize,
    /// Prior probability of aligning a word to NULL.
    pub null_prob: Count,
    /// Stop once the relative log-likelihood gain drops below this.
    pub convergence: Option<f64>,
    /// Sentences per parallel work unit.
    pub chunk_size: usize,
}

impl Default for AlignOptions {
    fn default() -> Self {
        AlignOptions {
            iterations: 5,
            null_prob: 0.08,
            convergence: None,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl AlignOptions {
    pub fn with_iterations(self, iterations: usize) -> Self {
        Self { iterations, ..self }
    }

    pub fn with_null_prob(self, null_prob: Count) -> Self {
        Self { null_prob, ..self }
    }

    pub fn with_convergence(self, convergence: Option<f64>) -> Self {
        Self { convergence, ..self }
    }

    pub fn with_chunk_size(self, chunk_size: usize) -> Self {
        Self { chunk_size, ..self }
    }

    pub fn validate(&self) -> ShortlistResult<()> {
        if self.iterations == 0 {
            return Err(ShortlistError::InvalidConfig("iterations must be >= 1".into()));
        }
        if !(0.0..1.0).contains(&self.null_prob) {
            return Err(ShortlistError::InvalidConfig(format!(
                "null_prob must be in [0, 1), got {}",
                self.null_prob
            )));
        }
        if self.chunk_size == 0 {
            return Err(ShortlistError::InvalidConfig("chunk_size must be >= 1".into()));
        }
        Ok(())
    }
}

/// Model parameters for one EM iteration. Never mutated once built; each
/// M-step produces a fresh value.
#[derive(Clone, Debug)]
struct Params {
    lexical: Vec<HashMap<Token, Count>>,
    floor: Count,
    jump: Vec<Count>,
    null_prob: Count,
}

impl Params {
    fn uniform(cond_vocab: usize, emit_vocab: usize, null_prob: Count) -> Self {
        Params {
            lexical: vec![HashMap::new(); cond_vocab],
            floor: 1.0 / (emit_vocab.max(2) - 1) as Count,
            jump: vec![1.0; JUMP_ARRAY_LEN],
            null_prob,
        }
    }

    #[inline]
    fn t(&self, e: Token, f: Token) -> Count {
        self.lexical[e as usize].get(&f).copied().unwrap_or(self.floor)
    }

    /// Unnormalized alignment scores for generated position `j`; slot
    /// `cond.len()` holds NULL.
    fn scores(&self, cond: &[Token], emit: &[Token], j: usize, out: &mut Vec<Count>) {
        let l = cond.len();
        let diag = diagonal(j, l, emit.len());
        let f = emit[j];
        out.clear();
        let mut dsum: Count = 0.0;
        for i in 0..l {
            dsum += self.jump[get_jump_index(i, diag)];
        }
        let scale = (1.0 - self.null_prob) / dsum;
        for (i, &e) in cond.iter().enumerate() {
            out.push(scale * self.jump[get_jump_index(i, diag)] * self.t(e, f));
        }
        out.push(self.null_prob * self.t(NULL_TOKEN, f));
    }
}

/// Expected counts from one E-step over a chunk of sentences, in fixed
/// point so that merging is exact.
#[derive(Debug, Default)]
struct Tally {
    lexical: HashMap<(Token, Token), u64>,
    jump: Vec<u64>,
    log_likelihood: i64,
}

impl Tally {
    fn merge(mut self, mut other: Tally) -> ShortlistResult<Tally> {
        if self.lexical.len() < other.lexical.len() {
            core::mem::swap(&mut self, &mut other);
        }
        for (k, v) in other.lexical {
            *self.lexical.entry(k).or_insert(0) += v;
        }
        if self.jump.is_empty() {
            self.jump = other.jump;
        } else {
            for (a, b) in self.jump.iter_mut().zip(other.jump) {
                *a += b;
            }
        }
        self.log_likelihood += other.log_likelihood;
        Ok(self)
    }

    /// M-step.
    fn into_params(self, cond_vocab: usize, null_prob: Count) -> Params {
        let mut totals = vec![0u64; cond_vocab];
        for (&(e, _), &c) in &self.lexical {
            totals[e as usize] += c;
        }
        let mut lexical: Vec<HashMap<Token, Count>> = vec![HashMap::new(); cond_vocab];
        for ((e, f), c) in self.lexical {
            if c == 0 {
                continue;
            }
            let p = (c as f64 / totals[e as usize] as f64) as Count;
            lexical[e as usize].insert(f, p);
        }

        let mut jump = vec![JUMP_ALPHA; JUMP_ARRAY_LEN];
        for (w, &c) in jump.iter_mut().zip(&self.jump) {
            *w += (c as f64 / COUNT_SCALE) as Count;
        }
        let jsum: Count = jump.iter().sum();
        for w in jump.iter_mut() {
            *w /= jsum;
        }

        Params { lexical, floor: LEX_FLOOR as Count, jump, null_prob }
    }
}

/// Directional alignment of a whole corpus.
#[derive(Debug, Clone)]
pub struct AlignResult {
    pub direction: Direction,
    /// Per sentence, one link per generated position (`NULL_LINK` when
    /// unaligned); `None` for skipped pairs.
    pub links: Vec<Option<Vec<Link>>>,
    /// Degenerate pairs left out of training.
    pub skipped: usize,
    /// Corpus log-likelihood per completed iteration.
    pub log_likelihoods: Vec<f64>,
}

fn oriented<'a>(
    direction: Direction,
    corpus: &'a ParallelCorpus,
    s: usize,
) -> Option<(&'a Sentence, &'a Sentence)> {
    let (src, tgt) = corpus.pair(s)?;
    Some(match direction {
        Direction::Forward => (src, tgt),
        Direction::Reverse => (tgt, src),
    })
}

fn e_step(
    params: &Params,
    direction: Direction,
    corpus: &ParallelCorpus,
    range: Range<usize>,
) -> ShortlistResult<Tally> {
    let mut tally = Tally {
        jump: vec![0; JUMP_ARRAY_LEN],
        ..Default::default()
    };
    let mut ps: Vec<Count> = Vec::with_capacity(MAX_SENT_LEN + 1);
    for s in range {
        let Some((cond, emit)) = oriented(direction, corpus, s) else {
            continue;
        };
        let l = cond.len();
        let mut ll = 0.0f64;
        for j in 0..emit.len() {
            params.scores(&cond.tokens, &emit.tokens, j, &mut ps);
            let z: Count = ps.iter().sum();
            if z <= 0.0 {
                continue;
            }
            ll += (z as f64).ln();
            let f = emit.tokens[j];
            let diag = diagonal(j, l, emit.len());
            for (i, &p) in ps[..l].iter().enumerate() {
                let c = to_fixed(p / z);
                *tally.lexical.entry((cond.tokens[i], f)).or_insert(0) += c;
                tally.jump[get_jump_index(i, diag)] += c;
            }
            *tally.lexical.entry((NULL_TOKEN, f)).or_insert(0) += to_fixed(ps[l] / z);
        }
        tally.log_likelihood += (ll * COUNT_SCALE).round() as i64;
    }
    Ok(tally)
}

/// Most probable link per generated position; ties go to the lowest
/// position and NULL only wins outright.
fn viterbi(params: &Params, cond: &Sentence, emit: &Sentence) -> Vec<Link> {
    let l = cond.len();
    let mut ps: Vec<Count> = Vec::with_capacity(l + 1);
    (0..emit.len())
        .map(|j| {
            params.scores(&cond.tokens, &emit.tokens, j, &mut ps);
            let mut best_k = 0usize;
            let mut best_v = ps[0];
            for (k, &v) in ps.iter().enumerate().skip(1) {
                if v > best_v {
                    best_v = v;
                    best_k = k;
                }
            }
            if best_k == l { NULL_LINK } else { best_k as Link }
        })
        .collect()
}

/// Train a directional model on `corpus` and decode every sentence pair.
///
/// The two directions are independent calls; nothing is shared between
/// them.
pub fn align(
    direction: Direction,
    corpus: &ParallelCorpus,
    opts: &AlignOptions,
) -> ShortlistResult<AlignResult> {
    opts.validate()?;
    if corpus.n_usable() == 0 {
        return Err(ShortlistError::EmptyCorpus);
    }
    let (cond, emit) = direction.sides(corpus);
    let cond_vocab = cond.vocabulary_size();
    let n = corpus.n_pairs();

    let mut params = Params::uniform(cond_vocab, emit.vocabulary_size(), opts.null_prob);
    let mut log_likelihoods: Vec<f64> = Vec::with_capacity(opts.iterations);

    for it in 0..opts.iterations {
        let tally = map_reduce(
            n,
            opts.chunk_size,
            |r| e_step(&params, direction, corpus, r),
            Tally::merge,
        )?;
        let ll = tally.log_likelihood as f64 / COUNT_SCALE;
        log::info!(
            "{:?} iteration {}/{}: log-likelihood {:.4}, {} lexical pairs",
            direction,
            it + 1,
            opts.iterations,
            ll,
            tally.lexical.len()
        );
        params = tally.into_params(cond_vocab, opts.null_prob);

        let prev = log_likelihoods.last().copied();
        log_likelihoods.push(ll);
        if let (Some(eps), Some(prev)) = (opts.convergence, prev) {
            if prev != 0.0 && ((ll - prev) / prev.abs()).abs() < eps {
                log::info!("{:?} converged after {} iterations", direction, it + 1);
                break;
            }
        }
    }

    let links = map_collect(n, opts.chunk_size, |s| {
        oriented(direction, corpus, s).map(|(c, g)| viterbi(&params, c, g))
    });

    if corpus.degenerate > 0 {
        log::warn!(
            "{:?}: skipped {} degenerate sentence pairs",
            direction,
            corpus.degenerate
        );
    }

    Ok(AlignResult {
        direction,
        links,
        skipped: corpus.degenerate,
        log_likelihoods,
    })
}
