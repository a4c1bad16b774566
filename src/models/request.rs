use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Model {
    #[serde(rename = "flux-dev")]
    FluxDev,
    #[serde(rename = "flux-schnell")]
    FluxSchnell,
}

impl Model {
    pub fn as_str(&self) -> &'static str {
        match self {
            Model::FluxDev => "flux-dev",
            Model::FluxSchnell => "flux-schnell",
        }
    }
}

impl std::fmt::Display for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct GenerationParams {
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub negative_prompt: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SelectionStrategy {
    Best,
    Random,
}

/// Hints for which upstream providers may serve a job. Sent verbatim.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RoutingConfig {
    /// Providers in order of preference.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub order: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strategy: Option<SelectionStrategy>,
    /// Whitelist; empty means any provider.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allow: Vec<String>,
}

impl RoutingConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn prefer(mut self, provider: impl Into<String>) -> Self {
        self.order.push(provider.into());
        self
    }

    pub fn with_strategy(mut self, strategy: SelectionStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    pub fn allow(mut self, provider: impl Into<String>) -> Self {
        self.allow.push(provider.into());
        self
    }
}

/// Keys owned by typed fields of [`SubmissionRequest`]. They never go through
/// the pass-through map, so the body carries each of them at most once.
pub const RESERVED_KEYS: &[&str] = &[
    "model",
    "prompt",
    "negative_prompt",
    "width",
    "height",
    "seed",
    "count",
    "routing",
];

/// Body of `POST /submit`.
///
/// Fields the SDK does not know about go into `extra` and are flattened into
/// the JSON body unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubmissionRequest {
    pub model: Model,
    #[serde(flatten)]
    pub params: GenerationParams,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routing: Option<RoutingConfig>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl SubmissionRequest {
    pub fn new(model: Model, prompt: impl Into<String>) -> Self {
        Self {
            model,
            params: GenerationParams {
                prompt: prompt.into(),
                ..Default::default()
            },
            routing: None,
            extra: Map::new(),
        }
    }

    pub fn with_negative_prompt(mut self, negative_prompt: impl Into<String>) -> Self {
        self.params.negative_prompt = Some(negative_prompt.into());
        self
    }

    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.params.width = Some(width);
        self.params.height = Some(height);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.params.seed = Some(seed);
        self
    }

    pub fn with_count(mut self, count: u32) -> Self {
        self.params.count = Some(count);
        self
    }

    pub fn with_routing(mut self, routing: RoutingConfig) -> Self {
        self.routing = Some(routing);
        self
    }

    /// Adds a field the SDK has no typed setter for. Reserved keys are
    /// ignored; use the matching builder instead.
    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        let key = key.into();
        if RESERVED_KEYS.contains(&key.as_str()) {
            log::warn!("⚠️  Ignoring extra field '{}': it has a typed setter", key);
            return self;
        }
        self.extra.insert(key, value);
        self
    }

    pub fn extra(&self) -> &Map<String, Value> {
        &self.extra
    }
}
