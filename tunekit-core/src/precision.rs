//! Mixed-precision selection from the training device.

use serde::{Deserialize, Serialize};

/// CUDA compute capability of device 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ComputeCapability {
    pub major: u32,
    pub minor: u32,
}

impl ComputeCapability {
    pub fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Ampere (8.x) and newer have native bfloat16.
    pub fn supports_bf16(&self) -> bool {
        self.major >= 8
    }
}

impl std::fmt::Display for ComputeCapability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Device report returned by the worker.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceReport {
    pub cuda_available: bool,
    /// `[major, minor]` when a CUDA device is present.
    pub capability: Option<(u32, u32)>,
    pub name: Option<String>,
}

impl DeviceReport {
    pub fn capability(&self) -> Option<ComputeCapability> {
        if !self.cuda_available {
            return None;
        }
        self.capability
            .map(|(major, minor)| ComputeCapability::new(major, minor))
    }
}

/// The `bf16` / `fp16` trainer flags. At most one is set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MixedPrecision {
    pub bf16: bool,
    pub fp16: bool,
}

impl MixedPrecision {
    /// bfloat16 on capability >= 8, float16 on older GPUs, neither on CPU.
    pub fn select(capability: Option<ComputeCapability>) -> Self {
        match capability {
            Some(cap) if cap.supports_bf16() => Self {
                bf16: true,
                fp16: false,
            },
            Some(_) => Self {
                bf16: false,
                fp16: true,
            },
            None => Self::default(),
        }
    }

    pub fn label(&self) -> &'static str {
        match (self.bf16, self.fp16) {
            (true, _) => "bf16",
            (false, true) => "fp16",
            (false, false) => "fp32",
        }
    }
}
