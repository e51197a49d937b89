//! Menu model and addon menu integration.

pub mod integration;
pub mod model;

pub use integration::{
    ActionRoute, AddonMenuAction, AddonMenuIntegration, AddonMenuStats, CombinedAction,
    addon_action_id, addon_category_id,
};
pub use model::{MenuAction, MenuActionKind, MenuCategory, MenuConfig, MenuItem};
