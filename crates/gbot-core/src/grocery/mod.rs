//! The grocery list itself: storage, identity schemes and rendering.

pub mod render;
pub mod store;

pub use render::{format_list, EMPTY_LIST_HTML, LIST_HEADER_HTML};
pub use store::{BoughtStatus, GroceryItem, GroceryList, ItemKey, KeyScheme, ListError};
