// ============================================================
// Layer 3 — Component Descriptors
// ============================================================
// A descriptor is the configuration fragment that says which
// implementation to instantiate and with which arguments:
//
//   {
//     "from_module": "utils.aug",
//     "class_name":  "Jitter",
//     "kwargs":      { "sigma": 0.1 },
//     "in_test":     false
//   }
//
// Descriptors are parsed straight out of the settings document,
// consumed once per assembly call and never retained.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Keyword arguments forwarded to a component constructor.
pub type Kwargs = Map<String, Value>;

/// Names one transform (or any other registered component) to build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentDescriptor {
    /// Dotted module path the class is registered under
    pub from_module: String,

    /// Class name inside that module
    pub class_name: String,

    /// Constructor arguments; absent means "construct with no arguments"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kwargs: Option<Kwargs>,

    /// Whether the constructed transform also joins the test pipeline
    #[serde(default)]
    pub in_test: bool,
}

impl ComponentDescriptor {
    pub fn new(from_module: impl Into<String>, class_name: impl Into<String>) -> Self {
        Self {
            from_module: from_module.into(),
            class_name:  class_name.into(),
            kwargs:      None,
            in_test:     false,
        }
    }

    pub fn with_kwargs(mut self, kwargs: Kwargs) -> Self {
        self.kwargs = Some(kwargs);
        self
    }

    pub fn with_in_test(mut self, in_test: bool) -> Self {
        self.in_test = in_test;
        self
    }

    /// The constructor arguments, with an absent mapping read as empty.
    pub fn kwargs_or_empty(&self) -> Kwargs {
        self.kwargs.clone().unwrap_or_default()
    }
}

/// An augmentation descriptor: a component plus the probability
/// with which the augmentation is applied to each sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AugmentationDescriptor {
    #[serde(flatten)]
    pub component: ComponentDescriptor,

    #[serde(default = "default_probability")]
    pub probability: f64,
}

fn default_probability() -> f64 {
    1.0
}

/// Encoder configuration: which encoder class to build and how.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncoderDescriptor {
    pub from_module: String,
    pub class_name:  String,
    #[serde(default)]
    pub kwargs:      Kwargs,
}

/// SSL framework configuration. `batch_size` is forwarded to the
/// framework as `ssl_batch_size`; `kwargs` carries everything else.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SslFrameworkDescriptor {
    pub from_module:   String,
    pub ssl_framework: String,
    pub batch_size:    usize,
    #[serde(default)]
    pub kwargs:        Kwargs,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn transform_descriptor_defaults() {
        let d: ComponentDescriptor = serde_json::from_value(json!({
            "from_module": "utils.aug",
            "class_name":  "Scale"
        }))
        .unwrap();
        assert!(d.kwargs.is_none());
        assert!(!d.in_test);
        assert!(d.kwargs_or_empty().is_empty());
    }

    #[test]
    fn augmentation_descriptor_flattens_component() {
        let d: AugmentationDescriptor = serde_json::from_value(json!({
            "from_module": "aug",
            "class_name":  "Jitter",
            "kwargs":      { "sigma": 0.2 },
            "probability": 0.5
        }))
        .unwrap();
        assert_eq!(d.component.class_name, "Jitter");
        assert_eq!(d.probability, 0.5);

        let d: AugmentationDescriptor = serde_json::from_value(json!({
            "from_module": "aug",
            "class_name":  "Gain"
        }))
        .unwrap();
        assert_eq!(d.probability, 1.0);
    }

    #[test]
    fn ssl_descriptor_requires_batch_size() {
        let err = serde_json::from_value::<SslFrameworkDescriptor>(json!({
            "from_module":   "models.simclr",
            "ssl_framework": "SimCLR"
        }));
        assert!(err.is_err());
    }
}
