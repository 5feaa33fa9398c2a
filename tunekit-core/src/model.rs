//! Base-model loading options and checkpoint save format.

use serde::{Deserialize, Serialize};

/// Where the model's layers are placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceMap {
    /// Let accelerate spread layers over available devices.
    Auto,
    Cpu,
}

/// torch dtypes tunekit asks for, by their `torch.<name>` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TorchDtype {
    Bfloat16,
    Float16,
}

/// 4-bit weight format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuantType {
    Nf4,
}

/// Keyword arguments for transformers' `BitsAndBytesConfig`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BitsAndBytesConfig {
    pub load_in_4bit: bool,
    pub bnb_4bit_quant_type: QuantType,
    pub bnb_4bit_use_double_quant: bool,
    pub bnb_4bit_compute_dtype: TorchDtype,
}

impl BitsAndBytesConfig {
    /// QLoRA defaults: double-quantized nf4 with bfloat16 compute.
    pub fn qlora() -> Self {
        Self {
            load_in_4bit: true,
            bnb_4bit_quant_type: QuantType::Nf4,
            bnb_4bit_use_double_quant: true,
            bnb_4bit_compute_dtype: TorchDtype::Bfloat16,
        }
    }
}

/// Arguments for `AutoModelForCausalLM.from_pretrained`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelLoadOptions {
    pub device_map: DeviceMap,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub torch_dtype: Option<TorchDtype>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantization_config: Option<BitsAndBytesConfig>,
}

impl ModelLoadOptions {
    /// Training placement: 4-bit quantized, or plain bfloat16.
    pub fn for_training(use_4bit: bool) -> Self {
        if use_4bit {
            Self {
                device_map: DeviceMap::Auto,
                torch_dtype: None,
                quantization_config: Some(BitsAndBytesConfig::qlora()),
            }
        } else {
            Self {
                device_map: DeviceMap::Auto,
                torch_dtype: Some(TorchDtype::Bfloat16),
                quantization_config: None,
            }
        }
    }

    /// Merge placement: float16 on CPU, never quantized.
    pub fn for_merge() -> Self {
        Self {
            device_map: DeviceMap::Cpu,
            torch_dtype: Some(TorchDtype::Float16),
            quantization_config: None,
        }
    }

    pub fn is_quantized(&self) -> bool {
        self.quantization_config.is_some()
    }
}

/// On-disk format for saved model weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SaveFormat {
    /// `safetensors`: no pickle, memory-mappable.
    SafeTensors,
}

impl SaveFormat {
    pub fn safe_serialization(self) -> bool {
        match self {
            SaveFormat::SafeTensors => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_training_options_bf16() {
        let opts = ModelLoadOptions::for_training(false);
        assert_eq!(
            serde_json::to_value(&opts).unwrap(),
            json!({"device_map": "auto", "torch_dtype": "bfloat16"})
        );
        assert!(!opts.is_quantized());
    }

    #[test]
    fn test_training_options_4bit() {
        let opts = ModelLoadOptions::for_training(true);
        assert_eq!(
            serde_json::to_value(&opts).unwrap(),
            json!({
                "device_map": "auto",
                "quantization_config": {
                    "load_in_4bit": true,
                    "bnb_4bit_quant_type": "nf4",
                    "bnb_4bit_use_double_quant": true,
                    "bnb_4bit_compute_dtype": "bfloat16"
                }
            })
        );
        assert!(opts.is_quantized());
    }

    #[test]
    fn test_merge_options() {
        assert_eq!(
            serde_json::to_value(ModelLoadOptions::for_merge()).unwrap(),
            json!({"device_map": "cpu", "torch_dtype": "float16"})
        );
    }

    #[test]
    fn test_save_format() {
        assert!(SaveFormat::SafeTensors.safe_serialization());
        assert_eq!(
            serde_json::to_value(SaveFormat::SafeTensors).unwrap(),
            json!("safe_tensors")
        );
    }
}
