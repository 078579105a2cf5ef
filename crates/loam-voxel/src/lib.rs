//! Block types, actionable components, and dense chunk storage.

pub mod builder;
pub mod chunk;
pub mod component;
pub mod definition;
pub mod registry;

pub use builder::BlockBuilder;
pub use chunk::{ChunkCoord, ChunkDims, ChunkEntity, MAX_LIGHT_LEVEL};
pub use component::{
    Component, ComponentBag, ComponentKind, ComponentQuery, LightComponent, MergePolicy,
    NotificationComponent, SoundComponent,
};
pub use definition::BlockDefinition;
pub use registry::{
    AIR_NAME, BlockRegistry, BlockType, BlockTypeId, Color, Face, FaceTextures, RegistryError,
    TextureRef,
};
