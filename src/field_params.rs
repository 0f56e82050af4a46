use serde::{Deserialize, Serialize};

// Which per-particle channels the state store carries. Channels are always a
// prefix of position, velocity, jitter, weight.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum ChannelLayout {
    PositionVelocity,
    WithJitter,
    WithJitterAndWeight,
}

impl ChannelLayout {
    pub fn channel_count(&self) -> usize {
        match self {
            ChannelLayout::PositionVelocity => 2,
            ChannelLayout::WithJitter => 3,
            ChannelLayout::WithJitterAndWeight => 4,
        }
    }

    pub fn has_jitter(&self) -> bool {
        self.channel_count() > crate::shader_util::JITTER_CHANNEL
    }

    pub fn has_weight(&self) -> bool {
        self.channel_count() > crate::shader_util::WEIGHT_CHANNEL
    }
}

impl Default for ChannelLayout {
    fn default() -> Self {
        ChannelLayout::PositionVelocity
    }
}

// Persistent, user-configured parameters of the particle field.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(default)]
pub struct FieldParams {
    pub particle_count: usize,
    pub channels: ChannelLayout,
    pub particle_color: [f32; 4],
    pub resize_debounce_ms: u64,

    pub velocity_damping: f32,
    pub force_multiplier: f32,
    pub max_velocity: f32,
    pub particle_size: f32,
    pub jitter_strength: f32,
    pub jitter_smoothing: f32,
    pub speed_threshold: f32,
    pub min_weight: f32,
    pub max_weight: f32,
    pub field1_multiplier: f32,
    pub field2_multiplier: f32,
    // Added to the sampled field. Use -0.5 for fields stored in [0, 1].
    pub field1_value_offset: f32,
    pub field2_value_offset: f32,
}

impl Default for FieldParams {
    fn default() -> Self {
        FieldParams {
            particle_count: 250_000,
            channels: ChannelLayout::default(),
            particle_color: [0.5, 0.3, 1.0, 0.7],
            resize_debounce_ms: 300,
            velocity_damping: 0.997,
            force_multiplier: 0.02,
            max_velocity: 0.01,
            particle_size: 2.0,
            jitter_strength: 0.0,
            jitter_smoothing: 0.1,
            speed_threshold: 0.0,
            min_weight: 0.5,
            max_weight: 2.0,
            field1_multiplier: 1.0,
            field2_multiplier: 1.0,
            field1_value_offset: 0.0,
            field2_value_offset: 0.0,
        }
    }
}

// Optional per-frame replacements for the tunable parameters. A set value
// wins over the configured one for as long as it stays set.
#[derive(Debug, Default, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(default)]
pub struct ParamOverrides {
    pub velocity_damping: Option<f32>,
    pub force_multiplier: Option<f32>,
    pub max_velocity: Option<f32>,
    pub particle_size: Option<f32>,
    pub jitter_strength: Option<f32>,
    pub jitter_smoothing: Option<f32>,
    pub speed_threshold: Option<f32>,
    pub min_weight: Option<f32>,
    pub max_weight: Option<f32>,
    pub field1_multiplier: Option<f32>,
    pub field2_multiplier: Option<f32>,
    pub field1_value_offset: Option<f32>,
    pub field2_value_offset: Option<f32>,
}

impl ParamOverrides {
    pub fn is_empty(&self) -> bool {
        *self == ParamOverrides::default()
    }
}

impl FieldParams {
    // The values in effect for a frame. `self` is left untouched.
    pub fn with_overrides(&self, overrides: &ParamOverrides) -> FieldParams {
        FieldParams {
            velocity_damping: overrides.velocity_damping.unwrap_or(self.velocity_damping),
            force_multiplier: overrides.force_multiplier.unwrap_or(self.force_multiplier),
            max_velocity: overrides.max_velocity.unwrap_or(self.max_velocity),
            particle_size: overrides.particle_size.unwrap_or(self.particle_size),
            jitter_strength: overrides.jitter_strength.unwrap_or(self.jitter_strength),
            jitter_smoothing: overrides.jitter_smoothing.unwrap_or(self.jitter_smoothing),
            speed_threshold: overrides.speed_threshold.unwrap_or(self.speed_threshold),
            min_weight: overrides.min_weight.unwrap_or(self.min_weight),
            max_weight: overrides.max_weight.unwrap_or(self.max_weight),
            field1_multiplier: overrides.field1_multiplier.unwrap_or(self.field1_multiplier),
            field2_multiplier: overrides.field2_multiplier.unwrap_or(self.field2_multiplier),
            field1_value_offset: overrides
                .field1_value_offset
                .unwrap_or(self.field1_value_offset),
            field2_value_offset: overrides
                .field2_value_offset
                .unwrap_or(self.field2_value_offset),
            ..self.clone()
        }
    }

    pub fn resize_debounce(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.resize_debounce_ms)
    }

    // Point size used for the overlay rendering style.
    pub fn small_particle_size(&self) -> f32 {
        (self.particle_size / 12.0).min(1.0)
    }
}

impl std::str::FromStr for FieldParams {
    type Err = toml::de::Error;
    fn from_str(serialized: &str) -> Result<Self, Self::Err> {
        let params = toml::from_str(serialized)?;
        Ok(params)
    }
}

pub fn get_field_config_from_default_file() -> FieldParams {
    let config_data = include_str!("../field_config.toml");
    match config_data.parse() {
        Ok(params) => params,
        Err(e) => {
            log::error!(
                "Failed to parse config file({}): {:?}",
                "../field_config.toml",
                e
            );
            FieldParams::default()
        }
    }
}
