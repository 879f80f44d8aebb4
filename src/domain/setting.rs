// ============================================================
// Layer 3 — Per-Supervertex Parameter Settings
// ============================================================
// Channel sizes for one supervertex of the GripNet encoder:
//
//   inter_feat_channels      width of the vertex input features
//   inter_agg_channels_list  widths of the internal aggregation layers
//   exter_agg_channels_dict  width of the message from each parent
//   mode                     how parent messages are combined
//
// With `cat` the parent widths must add up to inter_feat_channels,
// with `add` each of them must equal it.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::error::SupergraphError;

pub const DEFAULT_NUM_BASES: usize = 32;

/// How the external aggregation outputs of several parents are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregationMode {
    Cat,
    Add,
}

impl fmt::Display for AggregationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cat => write!(f, "cat"),
            Self::Add => write!(f, "add"),
        }
    }
}

impl FromStr for AggregationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "cat" => Ok(Self::Cat),
            "add" => Ok(Self::Add),
            other => Err(format!("unknown aggregation mode '{other}'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuperVertexParaSetting {
    pub supervertex_name:        String,
    pub inter_feat_channels:     usize,
    pub inter_agg_channels_list: Vec<usize>,
    pub exter_agg_channels_dict: BTreeMap<String, usize>,
    pub mode:                    Option<AggregationMode>,
    pub num_bases:               usize,
    pub concat_output:           bool,
}

impl SuperVertexParaSetting {
    pub fn new(
        supervertex_name:        impl Into<String>,
        inter_feat_channels:     usize,
        inter_agg_channels_list: Vec<usize>,
    ) -> Self {
        Self {
            supervertex_name: supervertex_name.into(),
            inter_feat_channels,
            inter_agg_channels_list,
            exter_agg_channels_dict: BTreeMap::new(),
            mode: None,
            num_bases: DEFAULT_NUM_BASES,
            concat_output: true,
        }
    }

    pub fn with_exter_agg_channels<I, S>(mut self, channels: I) -> Self
    where
        I: IntoIterator<Item = (S, usize)>,
        S: Into<String>,
    {
        self.exter_agg_channels_dict = channels
            .into_iter()
            .map(|(name, c)| (name.into(), c))
            .collect();
        self
    }

    pub fn with_mode(mut self, mode: AggregationMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn with_num_bases(mut self, num_bases: usize) -> Self {
        self.num_bases = num_bases;
        self
    }

    pub fn with_concat_output(mut self, concat_output: bool) -> Self {
        self.concat_output = concat_output;
        self
    }

    /// Effective mode: an explicit one wins, a single parent implies `cat`.
    pub fn resolved_mode(&self) -> Option<AggregationMode> {
        match (self.mode, self.exter_agg_channels_dict.len()) {
            (Some(mode), _) => Some(mode),
            (None, 1) => Some(AggregationMode::Cat),
            (None, _) => None,
        }
    }

    /// Width of the embeddings this supervertex hands to its children.
    pub fn out_channels(&self) -> usize {
        if self.concat_output {
            self.inter_feat_channels + self.inter_agg_channels_list.iter().sum::<usize>()
        } else {
            self.inter_agg_channels_list.last().copied().unwrap_or(self.inter_feat_channels)
        }
    }

    pub fn validate(&self) -> Result<(), SupergraphError> {
        let invalid = |reason: String| SupergraphError::InvalidSetting {
            name: self.supervertex_name.clone(),
            reason,
        };

        if self.inter_feat_channels == 0 {
            return Err(invalid("inter_feat_channels must be positive".into()));
        }
        if self.inter_agg_channels_list.is_empty() {
            return Err(invalid("inter_agg_channels_list is empty".into()));
        }
        if self.inter_agg_channels_list.contains(&0) {
            return Err(invalid("aggregation channels must be positive".into()));
        }
        if self.num_bases == 0 {
            return Err(invalid("num_bases must be positive".into()));
        }
        if self.exter_agg_channels_dict.values().any(|&c| c == 0) {
            return Err(invalid("external aggregation channels must be positive".into()));
        }
        if self.exter_agg_channels_dict.is_empty() {
            return Ok(());
        }

        match self.resolved_mode() {
            None => Err(invalid(format!(
                "{} external sources need an explicit mode",
                self.exter_agg_channels_dict.len()
            ))),
            Some(AggregationMode::Cat) => {
                let total: usize = self.exter_agg_channels_dict.values().sum();
                if total != self.inter_feat_channels {
                    return Err(invalid(format!(
                        "cat mode: external channels sum to {total}, expected {}",
                        self.inter_feat_channels
                    )));
                }
                Ok(())
            }
            Some(AggregationMode::Add) => {
                match self
                    .exter_agg_channels_dict
                    .iter()
                    .find(|(_, c)| **c != self.inter_feat_channels)
                {
                    Some((source, c)) => Err(invalid(format!(
                        "add mode: '{source}' has {c} channels, expected {}",
                        self.inter_feat_channels
                    ))),
                    None => Ok(()),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_source_defaults_to_cat() {
        let s = SuperVertexParaSetting::new("drug", 7, vec![6, 6])
            .with_exter_agg_channels([("gene", 7)]);
        assert_eq!(s.resolved_mode(), Some(AggregationMode::Cat));
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_multiple_sources_need_mode() {
        let s = SuperVertexParaSetting::new("drug", 8, vec![6])
            .with_exter_agg_channels([("gene", 4), ("protein", 4)]);
        assert!(s.validate().is_err());
        assert!(s.with_mode(AggregationMode::Cat).validate().is_ok());
    }

    #[test]
    fn test_cat_channels_must_sum() {
        let s = SuperVertexParaSetting::new("drug", 7, vec![6])
            .with_exter_agg_channels([("gene", 5)])
            .with_mode(AggregationMode::Cat);
        assert!(s.validate().is_err());
    }

    #[test]
    fn test_add_channels_must_match() {
        let ok = SuperVertexParaSetting::new("drug", 4, vec![6])
            .with_exter_agg_channels([("gene", 4), ("protein", 4)])
            .with_mode(AggregationMode::Add);
        assert!(ok.validate().is_ok());

        let bad = ok.clone().with_exter_agg_channels([("gene", 4), ("protein", 3)]);
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_out_channels() {
        let s = SuperVertexParaSetting::new("gene", 5, vec![4, 4]);
        assert_eq!(s.out_channels(), 13);
        assert_eq!(s.with_concat_output(false).out_channels(), 4);
    }

    #[test]
    fn test_empty_layers_rejected() {
        let s = SuperVertexParaSetting::new("gene", 5, vec![]);
        assert!(s.validate().is_err());
        let s = SuperVertexParaSetting::new("gene", 5, vec![4]).with_num_bases(0);
        assert!(s.validate().is_err());
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!("CAT".parse::<AggregationMode>().unwrap(), AggregationMode::Cat);
        assert!("mean".parse::<AggregationMode>().is_err());
    }
}
