//! Map layer bookkeeping and lifecycle.
//!
//! - `config`: declarative layer configs and their ids
//! - `registry`: which layers exist, which are visible, what is still loading
//! - `style`: paint/layout lookup tables merged per config
//! - `popup`: aggregation of clicked features into a popup
//! - `manager`: the lifecycle manager driving a rendering engine

mod config;
mod manager;
mod popup;
mod registry;
mod style;

pub use config::{LayerConfig, LayerId, LayerKind, PopupProperty, StyleProps};
pub use manager::{LayerManager, ManagerOptions, SymbolImage};
pub use popup::{aggregate, Popup, PopupEntry, DEFAULT_POPUP_LAYERS};
pub use registry::{LayerRegistry, PendingLoads, PendingToken};
pub use style::{merge_style, ResolvedStyle, StyleCatalog};
