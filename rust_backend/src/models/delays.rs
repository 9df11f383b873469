//! Delay distribution packaging.
//!
//! Delays between infection and report are lognormal with uncertain
//! parameters. Each parameter may be a scalar (shared by every delay) or a
//! sequence with one entry per delay; [`allocate`] performs that
//! normalization once so nothing downstream re-interprets the shape. Delay
//! order is significant and preserved.

use serde::{Deserialize, Serialize};

use crate::core::errors::{EstimationError, EstimationResult};

/// A value given either once or once per delay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScalarOrSeq<T> {
    Scalar(T),
    Seq(Vec<T>),
}

impl<T> ScalarOrSeq<T> {
    pub fn len(&self) -> usize {
        match self {
            ScalarOrSeq::Scalar(_) => 1,
            ScalarOrSeq::Seq(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> From<T> for ScalarOrSeq<T> {
    fn from(value: T) -> Self {
        ScalarOrSeq::Scalar(value)
    }
}

/// Broadcast a length-1 value to `count` entries or pass a length-`count`
/// sequence through.
///
/// # Errors
/// Returns a configuration error for any other length.
///
/// # Examples
///
/// ```
/// use epi_rt::models::delays::{allocate, ScalarOrSeq};
///
/// assert_eq!(allocate(&ScalarOrSeq::Scalar(5), 3).unwrap(), vec![5, 5, 5]);
/// assert!(allocate(&ScalarOrSeq::Seq(vec![1, 2]), 3).is_err());
/// ```
pub fn allocate<T: Clone>(value: &ScalarOrSeq<T>, count: usize) -> EstimationResult<Vec<T>> {
    match value {
        ScalarOrSeq::Scalar(v) => Ok(vec![v.clone(); count]),
        ScalarOrSeq::Seq(values) if values.len() == 1 => Ok(vec![values[0].clone(); count]),
        ScalarOrSeq::Seq(values) if values.len() == count => Ok(values.clone()),
        ScalarOrSeq::Seq(values) => Err(EstimationError::config(format!(
            "cannot allocate {} values to {} delays",
            values.len(),
            count
        ))),
    }
}

/// One delay distribution as read from settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DelayRecord {
    pub mean: f64,
    pub mean_sd: f64,
    pub sd: f64,
    pub sd_sd: f64,
    pub max: usize,
}

impl DelayRecord {
    pub fn new(mean: f64, mean_sd: f64, sd: f64, sd_sd: f64, max: usize) -> Self {
        Self {
            mean,
            mean_sd,
            sd,
            sd_sd,
            max,
        }
    }

    /// Mean of the lognormal delay at the central parameter values.
    pub fn expected_delay(&self) -> f64 {
        (self.mean + self.sd * self.sd / 2.0).exp()
    }
}

/// Delay parameters for a set of delays, each scalar or per delay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DelaySpec {
    pub mean: ScalarOrSeq<f64>,
    pub mean_sd: ScalarOrSeq<f64>,
    pub sd: ScalarOrSeq<f64>,
    pub sd_sd: ScalarOrSeq<f64>,
    pub max: ScalarOrSeq<usize>,
}

impl DelaySpec {
    /// Pack an ordered list of delay records into sequence form.
    pub fn from_records(records: &[DelayRecord]) -> Self {
        Self {
            mean: ScalarOrSeq::Seq(records.iter().map(|r| r.mean).collect()),
            mean_sd: ScalarOrSeq::Seq(records.iter().map(|r| r.mean_sd).collect()),
            sd: ScalarOrSeq::Seq(records.iter().map(|r| r.sd).collect()),
            sd_sd: ScalarOrSeq::Seq(records.iter().map(|r| r.sd_sd).collect()),
            max: ScalarOrSeq::Seq(records.iter().map(|r| r.max).collect()),
        }
    }
}

/// Per-delay numeric arrays, all of length `count`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DelayArrays {
    #[serde(rename = "delays")]
    pub count: usize,
    #[serde(rename = "delay_mean_mean")]
    pub mean_mean: Vec<f64>,
    #[serde(rename = "delay_mean_sd")]
    pub mean_sd: Vec<f64>,
    #[serde(rename = "delay_sd_mean")]
    pub sd_mean: Vec<f64>,
    #[serde(rename = "delay_sd_sd")]
    pub sd_sd: Vec<f64>,
    #[serde(rename = "max_delay")]
    pub max: Vec<usize>,
}

impl DelayArrays {
    /// Build per-delay arrays for `count` delays.
    ///
    /// # Errors
    /// Returns a configuration error when a component cannot be allocated to
    /// `count` entries or holds an invalid value.
    pub fn build(spec: &DelaySpec, count: usize) -> EstimationResult<Self> {
        let arrays = Self {
            count,
            mean_mean: allocate(&spec.mean, count)?,
            mean_sd: allocate(&spec.mean_sd, count)?,
            sd_mean: allocate(&spec.sd, count)?,
            sd_sd: allocate(&spec.sd_sd, count)?,
            max: allocate(&spec.max, count)?,
        };
        arrays.validate()?;
        Ok(arrays)
    }

    /// Build arrays from an ordered list of delay records.
    pub fn from_records(records: &[DelayRecord]) -> EstimationResult<Self> {
        if records.is_empty() {
            return Ok(Self::default());
        }
        Self::build(&DelaySpec::from_records(records), records.len())
    }

    fn validate(&self) -> EstimationResult<()> {
        for i in 0..self.count {
            let finite = [self.mean_mean[i], self.mean_sd[i], self.sd_mean[i], self.sd_sd[i]]
                .iter()
                .all(|v| v.is_finite());
            if !finite {
                return Err(EstimationError::config(format!(
                    "delay {} has non-finite parameters",
                    i + 1
                )));
            }
            if self.mean_sd[i] < 0.0 || self.sd_mean[i] < 0.0 || self.sd_sd[i] < 0.0 {
                return Err(EstimationError::config(format!(
                    "delay {} has a negative standard deviation",
                    i + 1
                )));
            }
            if self.max[i] == 0 {
                return Err(EstimationError::config(format!(
                    "delay {} must have a maximum of at least 1 day",
                    i + 1
                )));
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Sum of lognormal means over all delays.
    pub fn mean_delay(&self) -> f64 {
        self.mean_mean
            .iter()
            .zip(&self.sd_mean)
            .map(|(mu, sigma)| (mu + sigma * sigma / 2.0).exp())
            .sum()
    }

    /// Days of zero-case seeding prepended to the series.
    pub fn seeding_time(&self) -> usize {
        (self.mean_delay().floor() as usize).max(1)
    }
}

/// Generation-time prior: a single delay record in payload form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationTimeData {
    pub gt_mean_mean: f64,
    pub gt_mean_sd: f64,
    pub gt_sd_mean: f64,
    pub gt_sd_sd: f64,
    pub max_gt: usize,
}

impl GenerationTimeData {
    pub fn from_record(record: &DelayRecord) -> EstimationResult<Self> {
        let arrays = DelayArrays::from_records(std::slice::from_ref(record)).map_err(|e| match e {
            EstimationError::Configuration(msg) => {
                EstimationError::config(msg.replace("delay 1", "generation time"))
            }
            other => other,
        })?;
        Ok(Self {
            gt_mean_mean: arrays.mean_mean[0],
            gt_mean_sd: arrays.mean_sd[0],
            gt_sd_mean: arrays.sd_mean[0],
            gt_sd_sd: arrays.sd_sd[0],
            max_gt: arrays.max[0],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_allocate_broadcasts_scalar() {
        assert_eq!(allocate(&ScalarOrSeq::Scalar(5), 3).unwrap(), vec![5, 5, 5]);
    }

    #[test]
    fn test_allocate_passes_matching_sequence() {
        let seq = ScalarOrSeq::Seq(vec![1, 2, 3]);
        assert_eq!(allocate(&seq, 3).unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_allocate_broadcasts_length_one_sequence() {
        let seq = ScalarOrSeq::Seq(vec![7.5]);
        assert_eq!(allocate(&seq, 2).unwrap(), vec![7.5, 7.5]);
    }

    #[test]
    fn test_allocate_rejects_mismatch() {
        let err = allocate(&ScalarOrSeq::Seq(vec![1, 2]), 3).unwrap_err();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_build_preserves_order() {
        let records = vec![
            DelayRecord::new(1.6, 0.1, 0.4, 0.05, 14),
            DelayRecord::new(0.9, 0.2, 0.3, 0.05, 10),
        ];
        let arrays = DelayArrays::from_records(&records).unwrap();
        assert_eq!(arrays.count, 2);
        assert_eq!(arrays.mean_mean, vec![1.6, 0.9]);
        assert_eq!(arrays.max, vec![14, 10]);
    }

    #[test]
    fn test_build_mixes_scalar_and_sequence() {
        let spec = DelaySpec {
            mean: ScalarOrSeq::Seq(vec![1.0, 2.0]),
            mean_sd: 0.1.into(),
            sd: 0.5.into(),
            sd_sd: 0.1.into(),
            max: 15.into(),
        };
        let arrays = DelayArrays::build(&spec, 2).unwrap();
        assert_eq!(arrays.mean_sd, vec![0.1, 0.1]);
        assert_eq!(arrays.max, vec![15, 15]);
    }

    #[test]
    fn test_build_rejects_negative_sd() {
        let records = vec![DelayRecord::new(1.0, -0.1, 0.4, 0.05, 14)];
        assert!(DelayArrays::from_records(&records).is_err());
    }

    #[test]
    fn test_seeding_time_from_mean_delay() {
        // exp(1.6 + 0.08) ~ 5.37
        let records = vec![DelayRecord::new(1.6, 0.1, 0.4, 0.05, 14)];
        let arrays = DelayArrays::from_records(&records).unwrap();
        assert!((arrays.mean_delay() - (1.68f64).exp()).abs() < 1e-12);
        assert_eq!(arrays.seeding_time(), 5);

        assert_eq!(DelayArrays::default().seeding_time(), 1);
    }

    #[test]
    fn test_generation_time_from_record() {
        let gt = GenerationTimeData::from_record(&DelayRecord::new(3.6, 0.7, 3.0, 0.8, 30)).unwrap();
        assert_eq!(gt.gt_mean_mean, 3.6);
        assert_eq!(gt.max_gt, 30);

        let err = GenerationTimeData::from_record(&DelayRecord::new(3.6, 0.7, 3.0, 0.8, 0)).unwrap_err();
        assert!(err.to_string().contains("generation time"));
    }

    proptest! {
        #[test]
        fn prop_allocate_output_has_requested_length(v in any::<i32>(), count in 0usize..50) {
            let out = allocate(&ScalarOrSeq::Scalar(v), count).unwrap();
            prop_assert_eq!(out.len(), count);
            prop_assert!(out.iter().all(|x| *x == v));
        }
    }
}
