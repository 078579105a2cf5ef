//! Block type registry: maps compact [`BlockTypeId`] values to immutable [`BlockType`] definitions.
//!
//! The registry is built once during startup and treated as read-only afterwards;
//! share it behind an `Arc`. Air is always ID 0 so that zero-initialized chunk
//! memory represents empty space.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::builder::BlockBuilder;
use crate::component::ComponentBag;
use crate::definition::BlockDefinition;

/// Name under which Air is registered.
pub const AIR_NAME: &str = "Air";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Compact identifier stored inside every chunk cell (2 bytes).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BlockTypeId(pub u16);

impl BlockTypeId {
    pub const AIR: BlockTypeId = BlockTypeId(0);
}

impl fmt::Display for BlockTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One of the six faces of a block.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Face {
    Top,
    Bottom,
    Left,
    Right,
    Front,
    Back,
}

impl Face {
    pub const ALL: [Face; 6] = [
        Face::Top,
        Face::Bottom,
        Face::Left,
        Face::Right,
        Face::Front,
        Face::Back,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Face::Top => "top",
            Face::Bottom => "bottom",
            Face::Left => "left",
            Face::Right => "right",
            Face::Front => "front",
            Face::Back => "back",
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Face {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Face {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Face::ALL
            .into_iter()
            .find(|face| face.name() == s)
            .ok_or_else(|| RegistryError::UnknownFace(s.to_string()))
    }
}

/// A texture reference: atlas name plus tile index within that atlas.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextureRef {
    pub atlas: String,
    pub index: u32,
}

impl TextureRef {
    pub fn new(atlas: impl Into<String>, index: u32) -> Self {
        Self {
            atlas: atlas.into(),
            index,
        }
    }

    /// Parses the `atlasName@index` form used by block definition documents.
    pub fn parse(raw: &str) -> Result<Self, RegistryError> {
        let invalid = || RegistryError::InvalidTexture(raw.to_string());
        let (atlas, index) = raw.rsplit_once('@').ok_or_else(invalid)?;
        let atlas = atlas.trim();
        if atlas.is_empty() {
            return Err(invalid());
        }
        let index = index.trim();
        if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let index = index.parse::<u32>().map_err(|_| invalid())?;
        Ok(Self::new(atlas, index))
    }
}

/// Texture for each of the six faces. Either all six are present or the block has none.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FaceTextures {
    /// Indexed by `Face::index`; always six entries.
    faces: Vec<TextureRef>,
}

impl FaceTextures {
    pub fn uniform(texture: TextureRef) -> Self {
        Self {
            faces: vec![texture; 6],
        }
    }

    pub fn get(&self, face: Face) -> &TextureRef {
        &self.faces[face.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (Face, &TextureRef)> {
        Face::ALL.into_iter().zip(self.faces.iter())
    }

    pub(crate) fn from_faces(faces: Vec<TextureRef>) -> Self {
        debug_assert_eq!(faces.len(), Face::ALL.len());
        Self { faces }
    }
}

/// RGBA color parsed from `#RRGGBB` or `#RRGGBBAA`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 0xFF }
    }

    pub fn from_hex(raw: &str) -> Result<Self, RegistryError> {
        let invalid = || RegistryError::InvalidColor(raw.to_string());
        let hex = raw.strip_prefix('#').ok_or_else(invalid)?;
        if !(hex.len() == 6 || hex.len() == 8) || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
        let a = if hex.len() == 8 { channel(6)? } else { 0xFF };
        Ok(Self {
            r: channel(0)?,
            g: channel(2)?,
            b: channel(4)?,
            a,
        })
    }

    pub fn to_hex(self) -> String {
        if self.a == 0xFF {
            format!("#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
        } else {
            format!("#{:02X}{:02X}{:02X}{:02X}", self.r, self.g, self.b, self.a)
        }
    }
}

/// Immutable definition of one kind of block.
#[derive(Clone, Debug, PartialEq)]
pub struct BlockType {
    pub id: BlockTypeId,
    /// Unique, case-sensitive lookup key.
    pub name: String,
    pub is_solid: bool,
    pub is_liquid: bool,
    /// Blocks light propagation.
    pub is_opaque: bool,
    pub is_transparent: bool,
    pub is_breakable: bool,
    pub is_billboard: bool,
    /// Placing this block creates a tracked block instance.
    pub is_actionable: bool,
    pub is_item: bool,
    pub hardness: f32,
    pub emit_color: Option<Color>,
    pub textures: Option<FaceTextures>,
    /// Components copied into every instance of this block.
    pub components: ComponentBag,
}

impl BlockType {
    fn air() -> Self {
        Self {
            id: BlockTypeId::AIR,
            name: AIR_NAME.to_string(),
            is_solid: false,
            is_liquid: false,
            is_opaque: false,
            is_transparent: true,
            is_breakable: false,
            is_billboard: false,
            is_actionable: false,
            is_item: false,
            hardness: 0.0,
            emit_color: None,
            textures: None,
            components: ComponentBag::new(),
        }
    }

    pub fn is_air(&self) -> bool {
        self.id == BlockTypeId::AIR
    }
}

/// Errors raised while registering or looking up block types.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("block name must not be empty")]
    EmptyName,
    #[error("duplicate block name: {0}")]
    DuplicateName(String),
    #[error("block id {0} is already registered")]
    DuplicateId(BlockTypeId),
    #[error("block '{block}' is missing a texture for the {face} face")]
    MissingFace { block: String, face: Face },
    #[error("unknown block face: {0}")]
    UnknownFace(String),
    #[error("invalid texture reference '{0}' (expected atlasName@index)")]
    InvalidTexture(String),
    #[error("invalid color '{0}' (expected #RRGGBB or #RRGGBBAA)")]
    InvalidColor(String),
    #[error("block '{block}' has invalid hardness {hardness}")]
    InvalidHardness { block: String, hardness: f32 },
    #[error("builder for '{0}' is not bound to a registry")]
    DetachedBuilder(String),
    #[error("no block with id {0}")]
    UnknownId(BlockTypeId),
    #[error("no block named '{0}'")]
    UnknownName(String),
    #[error("block registry is full (max 65536 types)")]
    RegistryFull,
    #[error("malformed block definition: {0}")]
    Definition(#[from] serde_json::Error),
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Owns every [`BlockType`], with O(1) lookup by id and by name.
#[derive(Debug)]
pub struct BlockRegistry {
    /// Dense table where `index == BlockTypeId.0`; explicit ids may leave gaps.
    types: Vec<Option<BlockType>>,
    name_to_id: HashMap<String, BlockTypeId>,
    /// Next id handed out when a builder does not supply one.
    next_id: u32,
}

impl BlockRegistry {
    /// Creates a registry with Air pre-registered as ID 0.
    pub fn new() -> Self {
        let mut name_to_id = HashMap::new();
        name_to_id.insert(AIR_NAME.to_string(), BlockTypeId::AIR);
        Self {
            types: vec![Some(BlockType::air())],
            name_to_id,
            next_id: 1,
        }
    }

    /// Builds a block with `configure` and registers it.
    ///
    /// # Errors
    ///
    /// Fails on an empty name, a duplicate name or id, a partial face set, or
    /// an invalid hardness.
    pub fn register_block<F>(&mut self, name: &str, configure: F) -> Result<BlockTypeId, RegistryError>
    where
        F: FnOnce(BlockBuilder<'static>) -> BlockBuilder<'static>,
    {
        self.register(configure(BlockBuilder::new(name)))
    }

    /// Starts a fluent builder that registers into `self` on [`BlockBuilder::build`].
    pub fn new_block(&mut self, name: &str) -> BlockBuilder<'_> {
        BlockBuilder::bound(name, self)
    }

    /// Registers a detached builder.
    pub fn register(&mut self, builder: BlockBuilder<'_>) -> Result<BlockTypeId, RegistryError> {
        let (draft, _) = builder.into_draft();
        self.insert_draft(draft)
    }

    /// Registers a block from a single JSON definition document.
    pub fn register_block_from_json(&mut self, json: &str) -> Result<BlockTypeId, RegistryError> {
        let def: BlockDefinition = serde_json::from_str(json)?;
        self.register_definition(def)
    }

    /// Registers every definition in a JSON array.
    ///
    /// All or nothing: if any definition is rejected, the ones before it are
    /// unregistered again and the registry is left as it was.
    pub fn register_blocks_from_json_array(
        &mut self,
        json: &str,
    ) -> Result<Vec<BlockTypeId>, RegistryError> {
        let defs: Vec<BlockDefinition> = serde_json::from_str(json)?;
        let (table_len, next_id) = (self.types.len(), self.next_id);
        let mut ids = Vec::with_capacity(defs.len());
        for def in defs {
            match self.register_definition(def) {
                Ok(id) => ids.push(id),
                Err(err) => {
                    self.rollback(&ids, table_len, next_id);
                    return Err(err);
                }
            }
        }
        Ok(ids)
    }

    fn rollback(&mut self, ids: &[BlockTypeId], table_len: usize, next_id: u32) {
        for id in ids {
            if let Some(block) = self.types.get_mut(id.0 as usize).and_then(Option::take) {
                self.name_to_id.remove(&block.name);
            }
        }
        self.types.truncate(table_len);
        self.next_id = next_id;
        tracing::debug!(count = ids.len(), "rolled back block definitions");
    }

    /// Registers an already-parsed definition.
    pub fn register_definition(&mut self, def: BlockDefinition) -> Result<BlockTypeId, RegistryError> {
        let builder = def.into_builder()?;
        self.register(builder)
    }

    pub(crate) fn insert_draft(
        &mut self,
        draft: crate::builder::BlockDraft,
    ) -> Result<BlockTypeId, RegistryError> {
        let name = draft.name.trim();
        if name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if self.name_to_id.contains_key(&draft.name) {
            return Err(RegistryError::DuplicateName(draft.name));
        }
        if !draft.hardness.is_finite() || draft.hardness < 0.0 {
            return Err(RegistryError::InvalidHardness {
                block: draft.name,
                hardness: draft.hardness,
            });
        }

        let id = match draft.id {
            Some(id) => {
                if self.contains_id(id) {
                    return Err(RegistryError::DuplicateId(id));
                }
                id
            }
            // `next_id` always sits above every registered id.
            None => match u16::try_from(self.next_id) {
                Ok(raw) => BlockTypeId(raw),
                Err(_) => return Err(RegistryError::RegistryFull),
            },
        };

        let textures = draft.resolve_textures()?;
        let block = BlockType {
            id,
            is_actionable: draft.is_actionable || !draft.components.is_empty(),
            name: draft.name,
            is_solid: draft.is_solid,
            is_liquid: draft.is_liquid,
            is_opaque: draft.is_opaque,
            is_transparent: draft.is_transparent,
            is_breakable: draft.is_breakable,
            is_billboard: draft.is_billboard,
            is_item: draft.is_item,
            hardness: draft.hardness,
            emit_color: draft.emit_color,
            textures,
            components: draft.components,
        };

        let slot = id.0 as usize;
        if self.types.len() <= slot {
            self.types.resize(slot + 1, None);
        }
        self.next_id = self.next_id.max(id.0 as u32 + 1);
        self.name_to_id.insert(block.name.clone(), id);
        tracing::debug!(id = id.0, name = %block.name, "registered block type");
        self.types[slot] = Some(block);
        Ok(id)
    }

    /// The Air block (ID 0).
    pub fn air(&self) -> &BlockType {
        match self.types.first() {
            Some(Some(air)) => air,
            // Air is inserted by `new` and can never be removed.
            _ => unreachable!("air is always registered"),
        }
    }

    /// Looks up a block by id.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownId`] if nothing is registered under `id`.
    pub fn get_by_id(&self, id: BlockTypeId) -> Result<&BlockType, RegistryError> {
        self.get(id).ok_or(RegistryError::UnknownId(id))
    }

    /// Looks up a block by its case-sensitive name.
    pub fn get_by_name(&self, name: &str) -> Result<&BlockType, RegistryError> {
        self.name_to_id
            .get(name)
            .and_then(|id| self.get(*id))
            .ok_or_else(|| RegistryError::UnknownName(name.to_string()))
    }

    /// Tolerant lookup for callers that can live without the block.
    pub fn get_block_id_by_name(&self, name: &str) -> Option<BlockTypeId> {
        self.name_to_id.get(name).copied()
    }

    pub fn get(&self, id: BlockTypeId) -> Option<&BlockType> {
        self.types.get(id.0 as usize).and_then(Option::as_ref)
    }

    pub fn contains_id(&self, id: BlockTypeId) -> bool {
        self.get(id).is_some()
    }

    /// Returns `true` if `id` blocks light. Unknown ids are treated as air.
    pub fn is_opaque(&self, id: BlockTypeId) -> bool {
        self.get(id).is_some_and(|block| block.is_opaque)
    }

    /// Number of registered types, including Air.
    pub fn len(&self) -> usize {
        self.name_to_id.len()
    }

    /// Returns `true` if only Air is registered.
    pub fn is_empty(&self) -> bool {
        self.len() <= 1
    }

    /// Iterates registered types in id order.
    pub fn iter(&self) -> impl Iterator<Item = &BlockType> {
        self.types.iter().filter_map(Option::as_ref)
    }
}

impl Default for BlockRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{Component, ComponentKind, LightComponent};

    #[test]
    fn test_air_is_id_zero() {
        let registry = BlockRegistry::new();
        let air = registry.get_by_id(BlockTypeId(0)).unwrap();
        assert_eq!(air.name, "Air");
        assert!(!air.is_solid);
        assert!(!air.is_opaque);
        assert!(registry.air().is_air());
    }

    #[test]
    fn test_register_returns_sequential_ids() {
        let mut registry = BlockRegistry::new();
        let bedrock = registry.register_block("bedrock", |b| b).unwrap();
        let stone = registry.register_block("stone", |b| b).unwrap();
        assert_eq!(bedrock, BlockTypeId(1));
        assert_eq!(stone, BlockTypeId(2));
    }

    #[test]
    fn test_empty_name_rejected() {
        let mut registry = BlockRegistry::new();
        assert!(matches!(
            registry.register_block("", |b| b),
            Err(RegistryError::EmptyName)
        ));
        assert!(matches!(
            registry.register_block("   ", |b| b),
            Err(RegistryError::EmptyName)
        ));
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut registry = BlockRegistry::new();
        registry.register_block("stone", |b| b).unwrap();
        assert!(matches!(
            registry.register_block("stone", |b| b),
            Err(RegistryError::DuplicateName(_))
        ));
        assert!(matches!(
            registry.register_block("Air", |b| b),
            Err(RegistryError::DuplicateName(_))
        ));
    }

    #[test]
    fn test_partial_face_set_rejected() {
        let mut registry = BlockRegistry::new();
        let result = registry.register_block("grass", |b| b.with_top("atlas", 0));
        assert!(matches!(
            result,
            Err(RegistryError::MissingFace {
                face: Face::Bottom,
                ..
            })
        ));
        assert!(registry.get_block_id_by_name("grass").is_none());
    }

    #[test]
    fn test_all_faces_fill_every_face() {
        let mut registry = BlockRegistry::new();
        let id = registry
            .register_block("grass", |b| b.with_all_faces("atlas", 0))
            .unwrap();
        let textures = registry.get_by_id(id).unwrap().textures.clone().unwrap();
        for face in Face::ALL {
            assert_eq!(textures.get(face), &TextureRef::new("atlas", 0));
        }
    }

    #[test]
    fn test_per_face_override_on_top_of_all() {
        let mut registry = BlockRegistry::new();
        let id = registry
            .register_block("grass", |b| b.with_all_faces("terrain", 3).with_top("terrain", 0))
            .unwrap();
        let textures = registry.get_by_id(id).unwrap().textures.clone().unwrap();
        assert_eq!(textures.get(Face::Top).index, 0);
        assert_eq!(textures.get(Face::Back).index, 3);
    }

    #[test]
    fn test_lookup_not_found() {
        let registry = BlockRegistry::new();
        assert!(matches!(
            registry.get_by_id(BlockTypeId(42)),
            Err(RegistryError::UnknownId(BlockTypeId(42)))
        ));
        assert!(matches!(
            registry.get_by_name("obsidian"),
            Err(RegistryError::UnknownName(_))
        ));
        assert_eq!(registry.get_block_id_by_name("obsidian"), None);
    }

    #[test]
    fn test_lookup_is_case_sensitive() {
        let mut registry = BlockRegistry::new();
        registry.register_block("Stone", |b| b).unwrap();
        assert!(registry.get_by_name("Stone").is_ok());
        assert!(registry.get_by_name("stone").is_err());
    }

    #[test]
    fn test_explicit_id_and_monotonic_assignment() {
        let mut registry = BlockRegistry::new();
        let lamp = registry.register_block("lamp", |b| b.with_id(10)).unwrap();
        let next = registry.register_block("sand", |b| b).unwrap();
        assert_eq!(lamp, BlockTypeId(10));
        assert_eq!(next, BlockTypeId(11));
        assert!(matches!(
            registry.register_block("glass", |b| b.with_id(10)),
            Err(RegistryError::DuplicateId(_))
        ));
        assert!(matches!(
            registry.register_block("void", |b| b.with_id(0)),
            Err(RegistryError::DuplicateId(_))
        ));
    }

    #[test]
    fn test_negative_hardness_rejected() {
        let mut registry = BlockRegistry::new();
        assert!(matches!(
            registry.register_block("mush", |b| b.hardness(-1.0)),
            Err(RegistryError::InvalidHardness { .. })
        ));
    }

    #[test]
    fn test_components_mark_block_actionable() {
        let mut registry = BlockRegistry::new();
        let id = registry
            .register_block("torch", |b| {
                b.opaque(false).with_component(Component::Light(LightComponent {
                    radius: 12,
                    color: None,
                }))
            })
            .unwrap();
        let torch = registry.get_by_id(id).unwrap();
        assert!(torch.is_actionable);
        assert!(torch.components.contains(ComponentKind::Light));
    }

    #[test]
    fn test_new_block_registers_on_build() {
        let mut registry = BlockRegistry::new();
        let id = registry
            .new_block("glass")
            .opaque(false)
            .transparent(true)
            .with_all_faces("atlas", 7)
            .build()
            .unwrap();
        let glass = registry.get_by_name("glass").unwrap();
        assert_eq!(glass.id, id);
        assert!(glass.is_transparent);
        assert!(!registry.is_opaque(id));
    }

    #[test]
    fn test_texture_ref_parse() {
        assert_eq!(
            TextureRef::parse("terrain@12").unwrap(),
            TextureRef::new("terrain", 12)
        );
        assert!(TextureRef::parse("terrain").is_err());
        assert!(TextureRef::parse("@3").is_err());
        assert!(TextureRef::parse("terrain@x").is_err());
        assert!(TextureRef::parse("terrain@+3").is_err());
        assert!(TextureRef::parse("terrain@").is_err());
        assert_eq!(TextureRef::parse("terrain@ 7").unwrap().index, 7);
    }

    #[test]
    fn test_color_from_hex() {
        assert_eq!(Color::from_hex("#FF8000").unwrap(), Color::rgb(255, 128, 0));
        let c = Color::from_hex("#10203040").unwrap();
        assert_eq!((c.r, c.g, c.b, c.a), (0x10, 0x20, 0x30, 0x40));
        assert!(Color::from_hex("FF8000").is_err());
        assert!(Color::from_hex("#FF80").is_err());
        assert!(Color::from_hex("#+F+F+F").is_err());
        assert!(Color::from_hex("#12345-").is_err());
        assert_eq!(Color::rgb(1, 2, 3).to_hex(), "#010203");
    }

    #[test]
    fn test_len_and_iter() {
        let mut registry = BlockRegistry::new();
        assert_eq!(registry.len(), 1);
        assert!(registry.is_empty());
        registry.register_block("stone", |b| b).unwrap();
        assert_eq!(registry.len(), 2);
        let names: Vec<_> = registry.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, ["Air", "stone"]);
    }
}
