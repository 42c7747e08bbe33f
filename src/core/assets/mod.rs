mod asset_index;

pub use asset_index::{AssetIndex, AssetIndexSynchronizer, AssetObject, AssetSyncReport};
