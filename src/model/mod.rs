//! model — the polymorphic model abstraction.
//!
//! Purpose
//! -------
//! Represent distributions, estimators, and combinator outputs uniformly as
//! [`Model`] values, and operate on any of them through one dispatch layer.
//!
//! Key behaviors
//! -------------
//! - [`descriptor`]: the [`Model`] record (parameters, info, declared shape,
//!   settings, shared method table) and its copy semantics.
//! - [`methods`]: the [`ModelMethods`] slot trait and the closure-backed
//!   [`MethodTable`].
//! - [`dispatch`]: `prep`, `estimate`, `log_likelihood`, `p`, `draw`, `cdf`,
//!   `constraint`, `score`, with their fallback chains.
//! - [`settings`]: the per-instance settings registry.
//! - [`info`]: [`EstimationInfo`] and the [`MleState`] machine.
//! - [`errors`]: [`ModelError`] / [`ModelResult`].
//!
//! Conventions
//! -----------
//! - Callers use `dispatch`; method slots are an implementation surface for
//!   new model types.

pub mod descriptor;
pub mod dispatch;
pub mod errors;
pub mod info;
pub mod methods;
pub mod settings;

pub use self::descriptor::Model;
pub use self::errors::{ModelError, ModelResult};
pub use self::info::{EstimationInfo, MleState};
pub use self::methods::{MethodTable, MethodTableBuilder, ModelMethods};
pub use self::settings::{Settings, SettingsBlock, SettingsGroup, copy_group};

pub mod prelude {
    pub use super::descriptor::Model;
    pub use super::dispatch::{cdf, constraint, draw, estimate, log_likelihood, p, prep, score};
    pub use super::errors::{ModelError, ModelResult};
    pub use super::info::{EstimationInfo, MleState};
    pub use super::methods::{MethodTable, ModelMethods};
    pub use super::settings::{SettingsGroup, copy_group};
}
