use crate::error::{config_error, RankFlowError};
use derive_new::new;

pub const DEFAULT_ITERATIONS: usize = 5;
pub const DEFAULT_DAMPING_FACTOR: f64 = 0.85;
pub const DEFAULT_TOP_K: usize = 100;
pub const DEFAULT_PARTITIONS: usize = 1;

/// Options of a ranking run.
///
/// `num_partitions` is the hash space of the partition router while `threads` is the fan-out the
/// shuffle runtime actually uses. Both must agree, otherwise messages would be routed to buckets no
/// aggregation worker ever looks at.
#[derive(Debug, Clone, PartialEq, new)]
pub struct RankConfig {
    /// Denominator of the initial uniform rank. Corrected automatically after the first iteration.
    pub estimated_node_count: f64,
    pub num_partitions: usize,
    pub threads: usize,
    pub iterations: usize,
    pub damping_factor: f64,
    /// Blends old and new ranks when they differ by less than 30%.
    pub smart_updating: bool,
    pub top_k: usize,
    /// Emit every `(node, rank)` pair instead of the `top_k` highest ones.
    pub report_all: bool,
    /// Only ranks strictly above this threshold are reported.
    pub min_rank: Option<f64>,
    pub checkpoint_dir: Option<String>,
}

impl Default for RankConfig {
    fn default() -> Self {
        RankConfig {
            estimated_node_count: 0.0,
            num_partitions: DEFAULT_PARTITIONS,
            threads: DEFAULT_PARTITIONS,
            iterations: DEFAULT_ITERATIONS,
            damping_factor: DEFAULT_DAMPING_FACTOR,
            smart_updating: false,
            top_k: DEFAULT_TOP_K,
            report_all: false,
            min_rank: None,
            checkpoint_dir: None,
        }
    }
}

impl RankConfig {
    /// A config with defaults for everything but the node estimate and the partition count.
    pub fn with_partitions(estimated_node_count: f64, num_partitions: usize) -> Self {
        RankConfig {
            estimated_node_count,
            num_partitions,
            threads: num_partitions,
            ..RankConfig::default()
        }
    }

    pub fn validate(&self) -> Result<(), RankFlowError> {
        if !self.estimated_node_count.is_finite() || self.estimated_node_count <= 0.0 {
            return Err(config_error(format!(
                "Estimated node count should be a positive number but found '{}'",
                self.estimated_node_count
            )));
        }
        if self.num_partitions == 0 {
            return Err(config_error("Number of partitions should be non-zero".to_owned()));
        }
        if self.threads != self.num_partitions {
            return Err(RankFlowError::PartitionMismatch {
                router: self.num_partitions,
                runtime: self.threads,
            });
        }
        if !(self.damping_factor > 0.0 && self.damping_factor < 1.0) {
            return Err(config_error(format!(
                "Damping factor should be between 0 and 1 but found '{}'",
                self.damping_factor
            )));
        }
        if !self.report_all && self.top_k == 0 {
            return Err(config_error("Top k count should be non-zero".to_owned()));
        }
        Ok(())
    }
}

/// Parses the smart updating switch. Only `true` and `false` are accepted, in any case.
pub fn parse_smart_updating(value: &str) -> Result<bool, RankFlowError> {
    match value.to_ascii_lowercase().as_str() {
        "true" => Ok(true),
        "false" => Ok(false),
        _ => Err(config_error(format!(
            "Smart updating should be 'true' or 'false' but found '{}'",
            value
        ))),
    }
}
