//! Feature-hashing encoder
//!
//! Deterministic, dependency-free embeddings: every lowercase word and word
//! bigram is hashed (FNV-1a) into a signed bucket. Works offline and needs no
//! model download, so it is also what the test suite runs against.

use crate::error::{Result, RetrievalError};

use super::encoder::TextEncoder;

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Default dimension, matching the MiniLM sentence-transformer family
pub const DEFAULT_HASH_DIMENSION: usize = 384;

const BIGRAM_WEIGHT: f32 = 0.5;

#[derive(Debug, Clone)]
pub struct HashEncoder {
    name: String,
    dimension: usize,
}

impl HashEncoder {
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(RetrievalError::model_load(
                "hash encoder dimension must be greater than zero",
            ));
        }
        Ok(Self {
            name: format!("hash:{dimension}"),
            dimension,
        })
    }

    /// Parse a `hash` or `hash:<dim>` model identifier
    ///
    /// Returns `None` when the identifier names some other model.
    pub fn from_model_name(model: &str) -> Option<Result<Self>> {
        let rest = model.trim().strip_prefix("hash")?;
        if rest.is_empty() {
            return Some(Self::new(DEFAULT_HASH_DIMENSION));
        }
        let dim = rest.strip_prefix(':')?;
        Some(
            dim.parse::<usize>()
                .map_err(|_| RetrievalError::model_load(format!("invalid hash dimension: {dim}")))
                .and_then(Self::new),
        )
    }

    fn encode_one(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0_f32; self.dimension];
        let tokens = tokenize(text);

        for token in &tokens {
            self.accumulate(&mut vector, token.as_bytes(), 1.0);
        }
        for pair in tokens.windows(2) {
            let bigram = format!("{} {}", pair[0], pair[1]);
            self.accumulate(&mut vector, bigram.as_bytes(), BIGRAM_WEIGHT);
        }

        vector
    }

    fn accumulate(&self, vector: &mut [f32], feature: &[u8], weight: f32) {
        let hash = fnv1a(feature);
        let bucket = (hash % self.dimension as u64) as usize;
        let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
        vector[bucket] += sign * weight;
    }
}

impl TextEncoder for HashEncoder {
    fn name(&self) -> &str {
        &self.name
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn encode(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|text| self.encode_one(text)).collect())
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// 64-bit FNV-1a hash
pub(crate) fn fnv1a(bytes: &[u8]) -> u64 {
    bytes.iter().fold(FNV_OFFSET, |hash, byte| {
        (hash ^ u64::from(*byte)).wrapping_mul(FNV_PRIME)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_name_parsing() {
        let enc = HashEncoder::from_model_name("hash").unwrap().unwrap();
        assert_eq!(enc.dimension(), DEFAULT_HASH_DIMENSION);

        let enc = HashEncoder::from_model_name("hash:64").unwrap().unwrap();
        assert_eq!(enc.dimension(), 64);
        assert_eq!(enc.name(), "hash:64");

        assert!(HashEncoder::from_model_name("hash:zero").unwrap().is_err());
        assert!(HashEncoder::from_model_name("hash:0").unwrap().is_err());
        assert!(HashEncoder::from_model_name("all-MiniLM-L6-v2").is_none());
        assert!(HashEncoder::from_model_name("hashbrown").is_none());
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let enc = HashEncoder::new(128).unwrap();
        let a = enc.encode(&["steel rebar spacing"]).unwrap();
        let b = enc.encode(&["steel rebar spacing"]).unwrap();
        assert_eq!(a, b);
        assert_eq!(a[0].len(), 128);
    }

    #[test]
    fn test_case_and_punctuation_insensitive() {
        let enc = HashEncoder::new(128).unwrap();
        let rows = enc
            .encode(&["Concrete, mix ratios!", "concrete mix ratios"])
            .unwrap();
        assert_eq!(rows[0], rows[1]);
    }

    #[test]
    fn test_empty_text_is_zero_vector() {
        let enc = HashEncoder::new(32).unwrap();
        let rows = enc.encode(&["", "   "]).unwrap();
        assert!(rows.iter().all(|row| row.iter().all(|x| *x == 0.0)));
    }

    #[test]
    fn test_fnv1a_known_value() {
        assert_eq!(fnv1a(b""), FNV_OFFSET);
        assert_eq!(fnv1a(b"a"), 0xaf63_dc4c_8601_ec8c);
    }
}
