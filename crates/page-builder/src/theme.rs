use serde::{Deserialize, Deserializer, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Theme {
    pub name: String,
    pub font_family: String,
    pub font_color: String,
    pub button_color: String,
    pub background: String,
    #[serde(default)]
    pub particles_effect_id: Option<i32>,
}

impl Default for Theme {
    fn default() -> Self {
        Theme {
            name: "default".to_string(),
            font_family: "Inter".to_string(),
            font_color: "#000000".to_string(),
            button_color: "#ffffff".to_string(),
            background: "#f4f4f5".to_string(),
            particles_effect_id: None,
        }
    }
}

/// Partial theme update. Absent fields keep their previous value;
/// `particlesEffectId: null` turns particles off.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemePatch {
    pub name: Option<String>,
    pub font_family: Option<String>,
    pub font_color: Option<String>,
    pub button_color: Option<String>,
    pub background: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub particles_effect_id: Option<Option<i32>>,
}

fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

impl ThemePatch {
    pub fn is_empty(&self) -> bool {
        self == &ThemePatch::default()
    }
}

impl Theme {
    /// Right-hand-wins shallow merge.
    pub fn merge(&self, patch: &ThemePatch) -> Theme {
        Theme {
            name: patch.name.clone().unwrap_or_else(|| self.name.clone()),
            font_family: patch
                .font_family
                .clone()
                .unwrap_or_else(|| self.font_family.clone()),
            font_color: patch
                .font_color
                .clone()
                .unwrap_or_else(|| self.font_color.clone()),
            button_color: patch
                .button_color
                .clone()
                .unwrap_or_else(|| self.button_color.clone()),
            background: patch
                .background
                .clone()
                .unwrap_or_else(|| self.background.clone()),
            particles_effect_id: patch
                .particles_effect_id
                .unwrap_or(self.particles_effect_id),
        }
    }
}
