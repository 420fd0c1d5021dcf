//! Arena collections and key types
//!
//! Everything in a scene is owned by a `SlotMap` arena and referred to by a
//! generational key. A key whose slot was freed resolves to `None` instead of
//! aliasing a newer entry, which is what lets portals point at each other
//! without owning anything.

pub use slotmap::SlotMap;

slotmap::new_key_type! {
    /// Handle to a drawable stored in a scene's mesh arena
    pub struct MeshKey;

    /// Handle to a scene node (plain or portal)
    pub struct NodeKey;

    /// Handle to an ordered scene list
    pub struct ListKey;
}
