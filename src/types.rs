//! Type-safe parameter values for UDLF configs
//!
//! These enums replace the stringly-typed values of `config.ini` with
//! compile-time checked variants. Their `Display` output is exactly the token
//! the UDLF binary expects.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

/// Task executed by the binary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum UdlTask {
    /// Re-rank a single input
    #[default]
    Udl,
    /// Combine several inputs
    Fusion,
}

/// Unsupervised distance learning method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum UdlMethod {
    #[default]
    None,
    Cprr,
    Rlrecom,
    Rlsim,
    Contextrr,
    Recknngraph,
    Rkgraph,
    Corgraph,
    Lhrr,
    Bfstree,
    Rdpac,
    Rfe,
}

impl UdlMethod {
    /// Config key holding this method's neighborhood size.
    ///
    /// RLSIM and RDPAC name it differently from the `PARAM_{M}_K` pattern.
    pub fn neighborhood_key(&self) -> String {
        match self {
            Self::Rlsim => "PARAM_RLSIM_TOPK".to_string(),
            Self::Rdpac => "PARAM_RDPAC_K_END".to_string(),
            other => format!("PARAM_{}_K", other),
        }
    }

    /// Config key holding this method's ranked list size
    pub fn ranked_list_size_key(&self) -> String {
        format!("PARAM_{}_L", self)
    }

    /// Prefix shared by every parameter of this method
    pub fn param_prefix(&self) -> String {
        format!("PARAM_{}_", self)
    }

    /// Every method that actually re-ranks (everything except `NONE`)
    pub fn reranking_methods() -> Vec<UdlMethod> {
        Self::iter().filter(|m| *m != Self::None).collect()
    }
}

/// Format of the input file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum InputFileFormat {
    #[default]
    Auto,
    Matrix,
    Rk,
}

/// Format of the output file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum OutputFileFormat {
    #[default]
    Rk,
    Matrix,
}

/// Whether a matrix holds distances or similarities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum MatrixType {
    #[default]
    Dist,
    Sim,
}

/// Ranked list input encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum InputRkFormat {
    #[default]
    Num,
    Str,
}

/// Ranked list output encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum OutputRkFormat {
    #[default]
    Num,
    Str,
    Html,
    All,
}

/// Sorting used when converting a matrix into ranked lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum MatrixSorting {
    #[default]
    Heap,
    Insertion,
}

/// Retrieval effectiveness measure computed locally
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[strum(ascii_case_insensitive)]
pub enum Measure {
    #[default]
    #[strum(serialize = "MAP")]
    Map,
    #[strum(serialize = "Precision")]
    Precision,
    #[strum(serialize = "Recall")]
    Recall,
}
