//! Fluent builder producing immutable [`BlockType`](crate::BlockType) values.

use crate::component::{Component, ComponentBag};
use crate::registry::{BlockRegistry, BlockTypeId, Color, Face, FaceTextures, RegistryError, TextureRef};

/// Everything a builder collects before the registry validates it and assigns an id.
#[derive(Clone, Debug)]
pub(crate) struct BlockDraft {
    pub name: String,
    pub id: Option<BlockTypeId>,
    pub is_solid: bool,
    pub is_liquid: bool,
    pub is_opaque: bool,
    pub is_transparent: bool,
    pub is_breakable: bool,
    pub is_billboard: bool,
    pub is_actionable: bool,
    pub is_item: bool,
    pub hardness: f32,
    pub emit_color: Option<Color>,
    pub all_faces: Option<TextureRef>,
    pub faces: [Option<TextureRef>; 6],
    pub components: ComponentBag,
}

impl BlockDraft {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            id: None,
            is_solid: true,
            is_liquid: false,
            is_opaque: true,
            is_transparent: false,
            is_breakable: true,
            is_billboard: false,
            is_actionable: false,
            is_item: false,
            hardness: 1.0,
            emit_color: None,
            all_faces: None,
            faces: Default::default(),
            components: ComponentBag::new(),
        }
    }

    /// All six faces must resolve once any face (or the `all` default) is given.
    pub fn resolve_textures(&self) -> Result<Option<FaceTextures>, RegistryError> {
        if self.all_faces.is_none() && self.faces.iter().all(Option::is_none) {
            return Ok(None);
        }
        let mut resolved = Vec::with_capacity(6);
        for face in Face::ALL {
            let texture = self.faces[face.index()]
                .clone()
                .or_else(|| self.all_faces.clone())
                .ok_or_else(|| RegistryError::MissingFace {
                    block: self.name.clone(),
                    face,
                })?;
            resolved.push(texture);
        }
        Ok(Some(FaceTextures::from_faces(resolved)))
    }
}

/// Builder for a block type.
///
/// Detached builders (from [`BlockBuilder::new`]) are handed to
/// [`BlockRegistry::register`]; builders from [`BlockRegistry::new_block`]
/// register themselves on [`build`](Self::build).
///
/// Defaults: solid, opaque, breakable, hardness 1.0, no textures.
#[derive(Debug)]
pub struct BlockBuilder<'r> {
    registry: Option<&'r mut BlockRegistry>,
    draft: BlockDraft,
}

impl BlockBuilder<'static> {
    pub fn new(name: &str) -> Self {
        Self {
            registry: None,
            draft: BlockDraft::new(name),
        }
    }
}

impl<'r> BlockBuilder<'r> {
    pub(crate) fn bound(name: &str, registry: &'r mut BlockRegistry) -> Self {
        Self {
            registry: Some(registry),
            draft: BlockDraft::new(name),
        }
    }

    pub(crate) fn into_draft(self) -> (BlockDraft, Option<&'r mut BlockRegistry>) {
        (self.draft, self.registry)
    }

    /// Registers the block in the registry this builder was created from.
    ///
    /// # Errors
    ///
    /// Any validation error from the registry, or [`RegistryError::DetachedBuilder`]
    /// when the builder was created with [`BlockBuilder::new`].
    pub fn build(self) -> Result<BlockTypeId, RegistryError> {
        match self.registry {
            Some(registry) => registry.insert_draft(self.draft),
            None => Err(RegistryError::DetachedBuilder(self.draft.name)),
        }
    }

    pub fn name(&self) -> &str {
        &self.draft.name
    }

    /// Requests a specific id instead of the next free one.
    pub fn with_id(mut self, id: u16) -> Self {
        self.draft.id = Some(BlockTypeId(id));
        self
    }

    pub fn solid(mut self, value: bool) -> Self {
        self.draft.is_solid = value;
        self
    }

    pub fn liquid(mut self, value: bool) -> Self {
        self.draft.is_liquid = value;
        self
    }

    pub fn opaque(mut self, value: bool) -> Self {
        self.draft.is_opaque = value;
        self
    }

    pub fn transparent(mut self, value: bool) -> Self {
        self.draft.is_transparent = value;
        self
    }

    pub fn breakable(mut self, value: bool) -> Self {
        self.draft.is_breakable = value;
        self
    }

    pub fn billboard(mut self, value: bool) -> Self {
        self.draft.is_billboard = value;
        self
    }

    pub fn actionable(mut self, value: bool) -> Self {
        self.draft.is_actionable = value;
        self
    }

    pub fn item(mut self, value: bool) -> Self {
        self.draft.is_item = value;
        self
    }

    pub fn hardness(mut self, value: f32) -> Self {
        self.draft.hardness = value;
        self
    }

    pub fn emit_color(mut self, color: Color) -> Self {
        self.draft.emit_color = Some(color);
        self
    }

    /// Adds a default component. Blocks with components are actionable.
    pub fn with_component(mut self, component: Component) -> Self {
        self.draft.components.insert(component);
        self
    }

    /// Default texture for every face not set individually.
    pub fn with_all_faces(mut self, atlas: &str, index: u32) -> Self {
        self.draft.all_faces = Some(TextureRef::new(atlas, index));
        self
    }

    pub fn with_face(mut self, face: Face, atlas: &str, index: u32) -> Self {
        self.draft.faces[face.index()] = Some(TextureRef::new(atlas, index));
        self
    }

    pub fn with_top(self, atlas: &str, index: u32) -> Self {
        self.with_face(Face::Top, atlas, index)
    }

    pub fn with_bottom(self, atlas: &str, index: u32) -> Self {
        self.with_face(Face::Bottom, atlas, index)
    }

    pub fn with_left(self, atlas: &str, index: u32) -> Self {
        self.with_face(Face::Left, atlas, index)
    }

    pub fn with_right(self, atlas: &str, index: u32) -> Self {
        self.with_face(Face::Right, atlas, index)
    }

    pub fn with_front(self, atlas: &str, index: u32) -> Self {
        self.with_face(Face::Front, atlas, index)
    }

    pub fn with_back(self, atlas: &str, index: u32) -> Self {
        self.with_face(Face::Back, atlas, index)
    }

    /// Sets the same texture on the four side faces.
    pub fn with_sides(self, atlas: &str, index: u32) -> Self {
        self.with_left(atlas, index)
            .with_right(atlas, index)
            .with_front(atlas, index)
            .with_back(atlas, index)
    }

    pub(crate) fn with_texture(mut self, face: Option<Face>, texture: TextureRef) -> Self {
        match face {
            Some(face) => self.draft.faces[face.index()] = Some(texture),
            None => self.draft.all_faces = Some(texture),
        }
        self
    }
}
