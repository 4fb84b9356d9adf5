//! Scene data: what the importer hands over and what the renderer draws.
//!
//! - `imported` is the plain node/mesh/material hierarchy produced by a loader
//! - `entity` holds render entities and the GPU objects each one owns
//! - `scene_graph` flattens an imported hierarchy into the entity collection

pub mod entity;
pub mod imported;
pub mod scene_graph;
