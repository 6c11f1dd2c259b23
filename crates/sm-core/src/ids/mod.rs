//! ID type wrappers for type safety.

pub mod asset_id;
pub mod entity_id;
mod id_macro;
pub mod local_asset_id;

pub use asset_id::AssetId;
pub use entity_id::EntityId;
pub use local_asset_id::LocalAssetId;
