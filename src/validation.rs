//! Validation rules for UDLF config parameters
//!
//! Each known key maps to a [`Rule`]. Values are validated on their string
//! form and come back normalized (enums and booleans upper-cased, lists
//! re-joined without spaces). Keys without a rule accept any value.

use std::fmt;
use std::path::Path;

use crate::error::{Result, UdlfError};

const METHODS: &[&str] = &[
    "NONE",
    "CPRR",
    "RLRECOM",
    "RLSIM",
    "CONTEXTRR",
    "RECKNNGRAPH",
    "RKGRAPH",
    "CORGRAPH",
    "LHRR",
    "BFSTREE",
    "RDPAC",
    "RFE",
];

const RLSIM_METRICS: &[&str] = &[
    "INTERSECTION",
    "RBO",
    "KENDALL_TAU",
    "SPEARMAN",
    "GOODMAN",
    "JACCARD",
    "JACCARD_K",
    "KENDALL_TAU_W",
];

/// Characters the UDLF config grammar cannot carry inside a path value
const FORBIDDEN_PATH_CHARS: &[char] = &[' ', '(', ')', '[', ']', '{', '}', ';', '"', '\''];

/// Validation rule for one parameter
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Rule {
    Enum(&'static [&'static str]),
    Bool,
    UInt,
    Float { min: Option<f64>, max: Option<f64> },
    ListUInt,
}

const UNIT: Rule = Rule::Float {
    min: Some(0.0),
    max: Some(1.0),
};
const NON_NEGATIVE: Rule = Rule::Float {
    min: Some(0.0),
    max: None,
};

/// Look up the rule for a config key
pub fn rule_for(key: &str) -> Option<Rule> {
    let rule = match key {
        // General
        "UDL_TASK" => Rule::Enum(&["UDL", "FUSION"]),
        "UDL_METHOD" => Rule::Enum(METHODS),

        // Input dataset files
        "SIZE_DATASET" | "NUM_INPUT_FUSION_FILES" => Rule::UInt,
        "INPUT_FILE_FORMAT" => Rule::Enum(&["AUTO", "MATRIX", "RK"]),
        "INPUT_MATRIX_TYPE" | "OUTPUT_MATRIX_TYPE" => Rule::Enum(&["DIST", "SIM"]),
        "INPUT_RK_FORMAT" => Rule::Enum(&["NUM", "STR"]),
        "MATRIX_TO_RK_SORTING" => Rule::Enum(&["HEAP", "INSERTION"]),

        // Output files
        "OUTPUT_FILE" | "OUTPUT_HTML_RK_COLORS" | "OUTPUT_HTML_RK_BEFORE_AFTER" => Rule::Bool,
        "OUTPUT_FILE_FORMAT" => Rule::Enum(&["RK", "MATRIX"]),
        "OUTPUT_RK_FORMAT" => Rule::Enum(&["NUM", "STR", "HTML", "ALL"]),
        "OUTPUT_HTML_RK_PER_FILE" | "OUTPUT_HTML_RK_SIZE" => Rule::UInt,

        // Evaluation
        "EFFICIENCY_EVAL"
        | "EFFECTIVENESS_EVAL"
        | "EFFECTIVENESS_COMPUTE_PRECISIONS"
        | "EFFECTIVENESS_COMPUTE_MAP"
        | "EFFECTIVENESS_COMPUTE_RECALL" => Rule::Bool,
        "EFFECTIVENESS_RECALLS_TO_COMPUTE" | "EFFECTIVENESS_PRECISIONS_TO_COMPUTE" => {
            Rule::ListUInt
        }

        // Method parameters
        "PARAM_NONE_L" => Rule::UInt,

        "PARAM_CONTEXTRR_L" | "PARAM_CONTEXTRR_K" | "PARAM_CONTEXTRR_T"
        | "PARAM_CONTEXTRR_NBYK" => Rule::UInt,
        "PARAM_CONTEXTRR_OPTIMIZATIONS" => Rule::Bool,

        "PARAM_CORGRAPH_L" | "PARAM_CORGRAPH_K" => Rule::UInt,
        "PARAM_CORGRAPH_THRESHOLD_START" | "PARAM_CORGRAPH_THRESHOLD_END" => UNIT,
        "PARAM_CORGRAPH_THRESHOLD_INC" => NON_NEGATIVE,
        "PARAM_CORGRAPH_CORRELATION" => Rule::Enum(&["PEARSON", "RBO"]),

        "PARAM_CPRR_L" | "PARAM_CPRR_K" | "PARAM_CPRR_T" => Rule::UInt,

        "PARAM_RKGRAPH_K" | "PARAM_RKGRAPH_T" | "PARAM_RKGRAPH_L" => Rule::UInt,
        "PARAM_RKGRAPH_P" => UNIT,

        "PARAM_RECKNNGRAPH_L" | "PARAM_RECKNNGRAPH_K" => Rule::UInt,
        "PARAM_RECKNNGRAPH_EPSILON" => NON_NEGATIVE,

        "PARAM_RLRECOM_L" | "PARAM_RLRECOM_K" => Rule::UInt,
        "PARAM_RLRECOM_LAMBDA" | "PARAM_RLRECOM_EPSILON" => NON_NEGATIVE,

        "PARAM_RLSIM_TOPK" | "PARAM_RLSIM_CK" | "PARAM_RLSIM_T" => Rule::UInt,
        "PARAM_RLSIM_METRIC" => Rule::Enum(RLSIM_METRICS),

        "PARAM_LHRR_K" | "PARAM_LHRR_L" | "PARAM_LHRR_T" => Rule::UInt,

        "PARAM_BFSTREE_L" | "PARAM_BFSTREE_K" => Rule::UInt,
        "PARAM_BFSTREE_CORRELATION_METRIC" => Rule::Enum(&["RBO"]),

        "PARAM_RDPAC_K_END" | "PARAM_RDPAC_K_INC" | "PARAM_RDPAC_K_START" | "PARAM_RDPAC_L"
        | "PARAM_RDPAC_L_MULT" => Rule::UInt,
        "PARAM_RDPAC_P" | "PARAM_RDPAC_PL" => UNIT,

        "PARAM_RFE_K" | "PARAM_RFE_T" | "PARAM_RFE_L" | "PARAM_RFE_TH_CC" => Rule::UInt,
        "PARAM_RFE_PA" => UNIT,
        "PARAM_RFE_RERANK_BY_EMB" | "PARAM_RFE_EXPORT_EMBEDDINGS" | "PARAM_RFE_PERFORM_CCS" => {
            Rule::Bool
        }

        _ => return None,
    };
    Some(rule)
}

/// A value about to be written into a config entry.
///
/// Conversions exist for the types the typed setters take, so callers can
/// pass `20`, `0.5`, `true`, `"CPRR"` or `vec![4, 8]` directly.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    List(Vec<u64>),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => write!(f, "{}", s),
            Self::Int(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{}", v),
            Self::Bool(true) => write!(f, "TRUE"),
            Self::Bool(false) => write!(f, "FALSE"),
            Self::List(items) => {
                let joined: Vec<String> = items.iter().map(|v| v.to_string()).collect();
                write!(f, "{}", joined.join(","))
            }
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&String> for ParamValue {
    fn from(value: &String) -> Self {
        Self::Text(value.clone())
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<usize> for ParamValue {
    fn from(value: usize) -> Self {
        Self::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<u64> for ParamValue {
    fn from(value: u64) -> Self {
        Self::Int(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Vec<u64>> for ParamValue {
    fn from(value: Vec<u64>) -> Self {
        Self::List(value)
    }
}

/// Validate `value` for `key` and return the normalized string to store
pub fn validate_param(key: &str, value: &ParamValue) -> Result<String> {
    let raw = value.to_string();
    let Some(rule) = rule_for(key) else {
        return Ok(raw);
    };
    apply_rule(key, rule, raw.trim())
}

fn apply_rule(key: &str, rule: Rule, raw: &str) -> Result<String> {
    match rule {
        Rule::Enum(allowed) => {
            let upper = raw.to_ascii_uppercase();
            if allowed.contains(&upper.as_str()) {
                Ok(upper)
            } else {
                Err(UdlfError::validation(format!(
                    "Invalid value '{}' for {}. Allowed: {}",
                    raw,
                    key,
                    allowed.join("|")
                )))
            }
        }
        Rule::Bool => {
            let upper = raw.to_ascii_uppercase();
            match upper.as_str() {
                "TRUE" | "FALSE" => Ok(upper),
                _ => Err(UdlfError::validation(format!(
                    "Invalid value '{}' for {}. Must be TRUE/FALSE",
                    raw, key
                ))),
            }
        }
        Rule::UInt => raw.parse::<u64>().map(|v| v.to_string()).map_err(|_| {
            UdlfError::validation(format!(
                "Invalid value '{}' for {}. Must be unsigned integer",
                raw, key
            ))
        }),
        Rule::Float { min, max } => {
            let parsed: f64 = raw.parse().map_err(|_| {
                UdlfError::validation(format!("Invalid value '{}' for {}. Must be float", raw, key))
            })?;
            if !parsed.is_finite() {
                return Err(UdlfError::validation(format!("{} must be finite", key)));
            }
            if let Some(min) = min {
                if parsed < min {
                    return Err(UdlfError::validation(format!("{} must be >= {}", key, min)));
                }
            }
            if let Some(max) = max {
                if parsed > max {
                    return Err(UdlfError::validation(format!("{} must be <= {}", key, max)));
                }
            }
            Ok(raw.to_string())
        }
        Rule::ListUInt => {
            let items = raw
                .split(',')
                .map(|item| item.trim().parse::<u64>())
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|_| {
                    UdlfError::validation(format!(
                        "Invalid value '{}' for {}. Must be list of unsigned integers",
                        raw, key
                    ))
                })?;
            Ok(ParamValue::List(items).to_string())
        }
    }
}

/// Validate a file or directory path destined for a config value.
///
/// Rejects empty values and characters that break the config grammar.
/// With `must_exist`, the path must also exist on disk.
pub fn validate_path(value: &str, must_exist: bool) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(UdlfError::validation("Path must be a non-empty string"));
    }
    if trimmed.contains(FORBIDDEN_PATH_CHARS) {
        return Err(UdlfError::validation(format!(
            "Invalid path '{}'. It contains spaces or forbidden characters",
            trimmed
        )));
    }
    if must_exist && !Path::new(trimmed).exists() {
        return Err(UdlfError::validation(format!(
            "Path does not exist: {}",
            trimmed
        )));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_is_normalized_to_uppercase() {
        let v = validate_param("UDL_METHOD", &"cprr".into()).unwrap();
        assert_eq!(v, "CPRR");
        assert!(validate_param("UDL_METHOD", &"FOO".into()).is_err());
    }

    #[test]
    fn test_bool_accepts_native_and_text() {
        assert_eq!(validate_param("OUTPUT_FILE", &true.into()).unwrap(), "TRUE");
        assert_eq!(validate_param("OUTPUT_FILE", &"false".into()).unwrap(), "FALSE");
        assert!(validate_param("OUTPUT_FILE", &"yes".into()).is_err());
    }

    #[test]
    fn test_uint_rejects_negative_and_text() {
        assert_eq!(validate_param("PARAM_CPRR_K", &20i64.into()).unwrap(), "20");
        assert_eq!(validate_param("PARAM_CPRR_K", &"20".into()).unwrap(), "20");
        assert!(validate_param("PARAM_CPRR_K", &(-1i64).into()).is_err());
        assert!(validate_param("PARAM_CPRR_K", &"abc".into()).is_err());
    }

    #[test]
    fn test_float_bounds() {
        assert!(validate_param("PARAM_RKGRAPH_P", &0.95f64.into()).is_ok());
        assert!(validate_param("PARAM_RKGRAPH_P", &1.5f64.into()).is_err());
        assert!(validate_param("PARAM_RLRECOM_LAMBDA", &(-0.1f64).into()).is_err());
        assert!(validate_param("PARAM_RLRECOM_LAMBDA", &7.5f64.into()).is_ok());
    }

    #[test]
    fn test_list_uint_normalization() {
        let v = validate_param("EFFECTIVENESS_PRECISIONS_TO_COMPUTE", &"4, 8,10".into()).unwrap();
        assert_eq!(v, "4,8,10");
        let v = validate_param("EFFECTIVENESS_RECALLS_TO_COMPUTE", &vec![4u64, 20].into()).unwrap();
        assert_eq!(v, "4,20");
        assert!(validate_param("EFFECTIVENESS_RECALLS_TO_COMPUTE", &"4,-2".into()).is_err());
    }

    #[test]
    fn test_unknown_key_passes_through() {
        assert_eq!(validate_param("INPUT_FILE", &"/tmp/x.txt".into()).unwrap(), "/tmp/x.txt");
        assert!(rule_for("INPUT_FILE").is_none());
    }

    #[test]
    fn test_validate_path() {
        assert_eq!(validate_path("  /data/lists.txt ", false).unwrap(), "/data/lists.txt");
        assert!(validate_path("", false).is_err());
        assert!(validate_path("/data/my lists.txt", false).is_err());
        assert!(validate_path("/data/(x).txt", false).is_err());
        assert!(validate_path("/definitely/not/here.txt", true).is_err());
    }
}
