mod combo;
mod context;
mod fabric;
mod installer;
mod optifine;

pub use combo::{ComboOutcome, MultiLoaderInstallOrchestrator};
pub use context::{AddonInstallContext, BaseInstallContext};
pub use fabric::ProfileLoaderInstaller;
pub use installer::{AddonInstaller, BaseLoaderInstaller, LoaderRegistry, LoaderType, ModLoaderSelection};
pub use optifine::OptiFineAddonInstaller;
