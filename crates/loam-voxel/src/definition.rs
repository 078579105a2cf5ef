//! Declarative block definition documents.
//!
//! ```json
//! {
//!   "name": "lamp",
//!   "isOpaque": true,
//!   "hardness": 0.3,
//!   "emitColor": "#FFD080",
//!   "components": [{ "type": "light", "radius": 12 }],
//!   "faces": { "all": "blocks@40", "top": "blocks@41" }
//! }
//! ```
//!
//! The `all` face key supplies a default that individual faces override.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::builder::BlockBuilder;
use crate::component::Component;
use crate::registry::{Color, Face, RegistryError, TextureRef};

/// Face key that applies to every face not listed explicitly.
const ALL_FACES_KEY: &str = "all";

fn yes() -> bool {
    true
}

fn default_hardness() -> f32 {
    1.0
}

/// Serialized form of a block type, as found in block definition documents.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockDefinition {
    pub name: String,
    #[serde(default)]
    pub id: Option<u16>,
    #[serde(default = "yes")]
    pub is_solid: bool,
    #[serde(default)]
    pub is_liquid: bool,
    #[serde(default = "yes")]
    pub is_opaque: bool,
    #[serde(default)]
    pub is_transparent: bool,
    #[serde(default = "default_hardness")]
    pub hardness: f32,
    #[serde(default = "yes")]
    pub is_breakable: bool,
    #[serde(default)]
    pub is_billboard: bool,
    #[serde(default)]
    pub is_item: bool,
    #[serde(default)]
    pub is_actionable: bool,
    #[serde(default)]
    pub emit_color: Option<String>,
    #[serde(default)]
    pub components: Vec<Component>,
    #[serde(default)]
    pub faces: BTreeMap<String, String>,
}

impl BlockDefinition {
    /// Converts the document into a detached builder, parsing colors and textures.
    ///
    /// # Errors
    ///
    /// [`RegistryError::InvalidColor`], [`RegistryError::InvalidTexture`] or
    /// [`RegistryError::UnknownFace`] for malformed fields. Name and face
    /// completeness are checked later by the registry.
    pub fn into_builder(self) -> Result<BlockBuilder<'static>, RegistryError> {
        let mut builder = BlockBuilder::new(&self.name)
            .solid(self.is_solid)
            .liquid(self.is_liquid)
            .opaque(self.is_opaque)
            .transparent(self.is_transparent)
            .hardness(self.hardness)
            .breakable(self.is_breakable)
            .billboard(self.is_billboard)
            .item(self.is_item)
            .actionable(self.is_actionable);

        if let Some(id) = self.id {
            builder = builder.with_id(id);
        }
        if let Some(hex) = &self.emit_color {
            builder = builder.emit_color(Color::from_hex(hex)?);
        }
        for component in self.components {
            builder = builder.with_component(component);
        }
        for (key, raw) in &self.faces {
            let face = if key == ALL_FACES_KEY {
                None
            } else {
                Some(key.parse::<Face>()?)
            };
            builder = builder.with_texture(face, TextureRef::parse(raw)?);
        }
        Ok(builder)
    }
}
