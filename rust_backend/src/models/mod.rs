pub mod delays;
pub mod gp;
pub mod model_data;
pub mod observation;
pub mod rt;
pub mod sampler;

pub use delays::{allocate, DelayArrays, DelayRecord, DelaySpec, GenerationTimeData, ScalarOrSeq};
pub use gp::{build_gp_data, GpConfig, GpData, Kernel};
pub use model_data::ModelInputData;
pub use observation::{build_observation_data, Family, ObservationConfig, ObservationData, ScaleSpec};
pub use rt::{build_rt_data, FuturePolicy, FutureRt, GpOn, Prior, RtConfig, RtData};
pub use sampler::SamplerArgs;

/// Booleans travel as 0/1 integers in the model payload.
pub(crate) mod flag {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &bool, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(u8::from(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        Ok(u8::deserialize(deserializer)? != 0)
    }
}
