use crate::error::TractomeError;
use crate::table::CollisionPolicy;
use log::debug;
use serde_derive::{Deserialize, Serialize};
use std::{fs, path};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpressionColumns {
    pub gene_identifier: String,
    pub gene_name: String,
    pub fold_change: String,
}

impl Default for ExpressionColumns {
    fn default() -> Self {
        Self {
            gene_identifier: "Gene".into(),
            gene_name: "Gene Name".into(),
            fold_change: "log_2 fold change".into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TractabilityColumns {
    pub gene_identifier: String,
    pub gene_name: String,
    pub tags: String,
    pub biotype: String,
}

impl Default for TractabilityColumns {
    fn default() -> Self {
        Self {
            gene_identifier: "Ensembl ID".into(),
            gene_name: "Gene Symbol".into(),
            tags: "Tractability".into(),
            biotype: "Biotype".into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathwayColumns {
    pub pathway_name: String,
    pub adjusted_p_value: String,
    pub overlap: String,
    pub input_percent: String,
    pub fold_change_sum: String,
    pub member_genes: String,
}

impl Default for PathwayColumns {
    fn default() -> Self {
        Self {
            pathway_name: "Term".into(),
            adjusted_p_value: "Adjusted P-value".into(),
            overlap: "Overlap".into(),
            input_percent: "Input %".into(),
            fold_change_sum: "Sum log2fc".into(),
            member_genes: "Genes".into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DrugInteractionColumns {
    pub gene_name: String,
    pub drug_name: String,
    pub interaction_type: String,
    pub score: String,
    pub citation_id: String,
    pub source: String,
}

impl Default for DrugInteractionColumns {
    fn default() -> Self {
        Self {
            gene_name: "Gene".into(),
            drug_name: "Drug".into(),
            interaction_type: "Interaction Type".into(),
            score: "Interaction Score".into(),
            citation_id: "PMID".into(),
            source: "Source".into(),
        }
    }
}

/// Header labels of the exported report.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportLabels {
    pub gene_identifier: String,
    pub gene: String,
    pub fold_change: String,
    pub tractability: String,
    pub biotype: String,
    pub drugs: String,
    pub interaction_types: String,
    pub citations: String,
    pub mean_interaction_score: String,
    pub pathways: String,
}

impl Default for ReportLabels {
    fn default() -> Self {
        Self {
            gene_identifier: "Ensembl ID".into(),
            gene: "Gene".into(),
            fold_change: "log_2 fold change".into(),
            tractability: "Tractability".into(),
            biotype: "Biotype".into(),
            drugs: "Drug".into(),
            interaction_types: "Interaction Type".into(),
            citations: "PMID".into(),
            mean_interaction_score: "Interaction Score".into(),
            pathways: "Pathways".into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub expression: ExpressionColumns,
    pub tractability: TractabilityColumns,
    pub pathways: PathwayColumns,
    pub drug_interactions: DrugInteractionColumns,
    /// Separator of the member gene list inside one pathway cell.
    pub member_delimiter: String,
    /// Separator of the tag list inside one tractability cell.
    pub tag_delimiter: String,
    /// Separator used when a value list is rendered into one report cell.
    pub display_separator: String,
    /// Citation placeholder meaning "no citation", never reported.
    pub citation_sentinel: String,
    pub collision_policy: CollisionPolicy,
    pub labels: ReportLabels,
    /// Written for absent values so they stay distinct from empty strings.
    pub null_value: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            expression: ExpressionColumns::default(),
            tractability: TractabilityColumns::default(),
            pathways: PathwayColumns::default(),
            drug_interactions: DrugInteractionColumns::default(),
            member_delimiter: ";".into(),
            tag_delimiter: ";".into(),
            display_separator: "; ".into(),
            citation_sentinel: "N/A".into(),
            collision_policy: CollisionPolicy::default(),
            labels: ReportLabels::default(),
            null_value: "NA".into(),
        }
    }
}

impl PipelineConfig {
    pub fn from_yaml(content: &str) -> Result<Self, TractomeError> {
        Ok(serde_yml::from_str(content)?)
    }

    pub fn from_path(path: &path::PathBuf) -> Result<Self, TractomeError> {
        debug!("reading pipeline config from {:?}", path);
        let content = fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// The configured file if one was given, the defaults otherwise.
    pub fn load(path: Option<&path::PathBuf>) -> Result<Self, TractomeError> {
        match path {
            Some(path) => Self::from_path(path),
            None => Ok(Self::default()),
        }
    }
}
