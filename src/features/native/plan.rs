// Plan module - instruction grammar of the native engine
//
// Grammar:  <KIND> key=value ... [> Derivate DOrder=<1|2>]*
// Kinds:    ZCR, MFCC
//
// MFCC keys (defaults in parentheses):
//   blockSize, stepSize            (required)
//   CepsIgnoreFirstCoeff           (1)
//   CepsNbCoeffs                   (13)
//   MelNbFilters                   (40)
//   MelMinFreq                     (130.0)
//   MelMaxFreq                     (6854.0)

use crate::error::FeatureError;

pub const DEFAULT_CEPS_IGNORE_FIRST: usize = 1;
pub const DEFAULT_CEPS_NB_COEFFS: usize = 13;
pub const DEFAULT_MEL_NB_FILTERS: usize = 40;
pub const DEFAULT_MEL_MIN_FREQ: f64 = 130.0;
pub const DEFAULT_MEL_MAX_FREQ: f64 = 6854.0;

/// Parsed feature instruction
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureSpec {
    pub kind: FeatureKind,
    pub block_size: usize,
    pub step_size: usize,
    /// Number of derivative passes applied to the output (0 = none)
    pub derivative_order: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FeatureKind {
    Zcr,
    Mfcc(MfccSpec),
}

#[derive(Debug, Clone, PartialEq)]
pub struct MfccSpec {
    pub ignore_first: usize,
    pub num_coeffs: usize,
    pub num_filters: usize,
    pub min_freq: f64,
    pub max_freq: f64,
}

impl FeatureSpec {
    /// Number of output columns
    pub fn dimension(&self) -> usize {
        match &self.kind {
            FeatureKind::Zcr => 1,
            FeatureKind::Mfcc(mfcc) => mfcc.num_coeffs,
        }
    }
}

/// Parse an instruction parameter string
pub fn parse(parameters: &str) -> Result<FeatureSpec, FeatureError> {
    let invalid = |reason: String| FeatureError::InvalidParameters {
        parameters: parameters.to_string(),
        reason,
    };

    let mut stages = parameters.split('>').map(str::trim);
    let head = stages.next().unwrap_or_default();
    let mut tokens = head.split_whitespace();
    let kind_name = tokens
        .next()
        .ok_or_else(|| invalid("missing feature kind".to_string()))?;

    let mut block_size = None;
    let mut step_size = None;
    let mut mfcc = MfccSpec {
        ignore_first: DEFAULT_CEPS_IGNORE_FIRST,
        num_coeffs: DEFAULT_CEPS_NB_COEFFS,
        num_filters: DEFAULT_MEL_NB_FILTERS,
        min_freq: DEFAULT_MEL_MIN_FREQ,
        max_freq: DEFAULT_MEL_MAX_FREQ,
    };

    for token in tokens {
        let (key, value) = token
            .split_once('=')
            .ok_or_else(|| invalid(format!("expected key=value, got '{}'", token)))?;

        let as_usize = || {
            value
                .parse::<usize>()
                .map_err(|err| invalid(format!("{}: {}", key, err)))
        };
        let as_f64 = || {
            value
                .parse::<f64>()
                .map_err(|err| invalid(format!("{}: {}", key, err)))
        };

        match (kind_name, key) {
            (_, "blockSize") => block_size = Some(as_usize()?),
            (_, "stepSize") => step_size = Some(as_usize()?),
            ("MFCC", "CepsIgnoreFirstCoeff") => mfcc.ignore_first = as_usize()?,
            ("MFCC", "CepsNbCoeffs") => mfcc.num_coeffs = as_usize()?,
            ("MFCC", "MelNbFilters") => mfcc.num_filters = as_usize()?,
            ("MFCC", "MelMinFreq") => mfcc.min_freq = as_f64()?,
            ("MFCC", "MelMaxFreq") => mfcc.max_freq = as_f64()?,
            _ => return Err(invalid(format!("unknown {} parameter '{}'", kind_name, key))),
        }
    }

    let block_size = block_size
        .filter(|&size| size > 0)
        .ok_or_else(|| invalid("blockSize must be given and > 0".to_string()))?;
    let step_size = step_size
        .filter(|&size| size > 0)
        .ok_or_else(|| invalid("stepSize must be given and > 0".to_string()))?;

    let kind = match kind_name {
        "ZCR" => FeatureKind::Zcr,
        "MFCC" => {
            if mfcc.ignore_first + mfcc.num_coeffs > mfcc.num_filters {
                return Err(invalid(format!(
                    "{} coefficients from index {} exceed {} mel filters",
                    mfcc.num_coeffs, mfcc.ignore_first, mfcc.num_filters
                )));
            }
            if !(mfcc.min_freq >= 0.0 && mfcc.min_freq < mfcc.max_freq) {
                return Err(invalid("MelMinFreq must be >= 0 and < MelMaxFreq".to_string()));
            }
            FeatureKind::Mfcc(mfcc)
        }
        other => return Err(invalid(format!("unsupported feature kind '{}'", other))),
    };

    let mut derivative_order = 0;
    for stage in stages {
        let mut tokens = stage.split_whitespace();
        match (tokens.next(), tokens.next(), tokens.next()) {
            (Some("Derivate"), Some(order), None) => {
                derivative_order += match order {
                    "DOrder=1" => 1,
                    "DOrder=2" => 2,
                    other => return Err(invalid(format!("unsupported derivative '{}'", other))),
                };
            }
            _ => return Err(invalid(format!("unsupported stage '{}'", stage))),
        }
    }

    Ok(FeatureSpec {
        kind,
        block_size,
        step_size,
        derivative_order,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_zcr() {
        let spec = parse("ZCR blockSize=400 stepSize=160").unwrap();
        assert_eq!(spec.kind, FeatureKind::Zcr);
        assert_eq!(spec.block_size, 400);
        assert_eq!(spec.step_size, 160);
        assert_eq!(spec.derivative_order, 0);
        assert_eq!(spec.dimension(), 1);
    }

    #[test]
    fn test_parse_mfcc_with_derivative() {
        let spec = parse(
            "MFCC CepsIgnoreFirstCoeff=1 CepsNbCoeffs=11 blockSize=400 stepSize=160 > Derivate DOrder=2",
        )
        .unwrap();

        match &spec.kind {
            FeatureKind::Mfcc(mfcc) => {
                assert_eq!(mfcc.ignore_first, 1);
                assert_eq!(mfcc.num_coeffs, 11);
                assert_eq!(mfcc.num_filters, DEFAULT_MEL_NB_FILTERS);
            }
            other => panic!("Expected MFCC, got {:?}", other),
        }
        assert_eq!(spec.derivative_order, 2);
        assert_eq!(spec.dimension(), 11);
    }

    #[test]
    fn test_rejects_unknown_kind() {
        let err = parse("LPC blockSize=400 stepSize=160").unwrap_err();
        assert!(err.to_string().contains("unsupported feature kind"));
    }

    #[test]
    fn test_rejects_missing_step() {
        assert!(parse("ZCR blockSize=400").is_err());
        assert!(parse("ZCR blockSize=400 stepSize=0").is_err());
    }

    #[test]
    fn test_rejects_unknown_parameter() {
        assert!(parse("ZCR blockSize=400 stepSize=160 CepsNbCoeffs=3").is_err());
        assert!(parse("MFCC blockSize=400 stepSize=160 fftWindow").is_err());
    }

    #[test]
    fn test_rejects_too_many_coefficients() {
        assert!(parse("MFCC CepsIgnoreFirstCoeff=1 CepsNbCoeffs=40 blockSize=400 stepSize=160").is_err());
    }

    #[test]
    fn test_rejects_unknown_stage() {
        assert!(parse("ZCR blockSize=400 stepSize=160 > Normalize").is_err());
        assert!(parse("ZCR blockSize=400 stepSize=160 > Derivate DOrder=3").is_err());
    }
}
