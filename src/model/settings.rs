//! model::settings — per-instance settings registry.
//!
//! Purpose
//! -------
//! Attach named, typed configuration blocks ("settings groups") to a model
//! instance. Optimizer tolerances, sampler step sizes, and every
//! combinator's wrapped base models live here.
//!
//! Key behaviors
//! -------------
//! - [`Settings::add_group`] installs or replaces a block under its tag.
//! - [`Settings::group`] / [`Settings::get_group`] return the block or
//!   `ModelError::SettingsNotFound`; lookups never fabricate defaults.
//! - [`Settings::get_or_default`] and [`Settings::settings_or_default`]
//!   are the explicit install-or-default paths.
//! - [`copy_group`] clones one block from one model onto another.
//!
//! Invariants & assumptions
//! ------------------------
//! - At most one block per tag. Lookup is by tag and independent of the
//!   insertion order; iteration preserves insertion order.
//! - Cloning a [`Settings`] clones every block. Blocks holding shared base
//!   models (`Arc<Model>`) keep sharing them unless [`Settings::deep_clone`]
//!   is used.
//!
//! Conventions
//! -----------
//! - Tags are compile-time constants on [`SettingsGroup::TAG`]; there is no
//!   process-wide registry of group types.
//!
//! Testing notes
//! -------------
//! - Unit tests cover replace-on-add, absent lookups, typed access,
//!   removal, and copying a group between models.
use crate::model::{
    descriptor::Model,
    errors::{ModelError, ModelResult},
};
use std::any::Any;
use std::fmt;

/// A typed settings group with a compile-time tag.
///
/// Implement this for a plain struct to make it installable on a model.
/// Override [`deep_copy`](SettingsGroup::deep_copy) when the group holds
/// shared base models that a deep model copy must duplicate.
pub trait SettingsGroup: Any + Clone + Send + Sync + fmt::Debug {
    const TAG: &'static str;

    fn deep_copy(&self) -> Self {
        self.clone()
    }
}

/// Object-safe view of any settings group.
pub trait SettingsBlock: Send + Sync + fmt::Debug {
    fn tag(&self) -> &'static str;
    fn clone_block(&self) -> Box<dyn SettingsBlock>;
    fn deep_clone_block(&self) -> Box<dyn SettingsBlock>;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: SettingsGroup> SettingsBlock for T {
    fn tag(&self) -> &'static str {
        T::TAG
    }

    fn clone_block(&self) -> Box<dyn SettingsBlock> {
        Box::new(self.clone())
    }

    fn deep_clone_block(&self) -> Box<dyn SettingsBlock> {
        Box::new(self.deep_copy())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Ordered collection of settings blocks, one per tag.
#[derive(Debug, Default)]
pub struct Settings {
    blocks: Vec<Box<dyn SettingsBlock>>,
}

impl Clone for Settings {
    fn clone(&self) -> Self {
        Self { blocks: self.blocks.iter().map(|b| b.clone_block()).collect() }
    }
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.position(tag).is_some()
    }

    /// Installed tags in insertion order.
    pub fn tags(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.blocks.iter().map(|b| b.tag())
    }

    /// Install `group`, replacing any block with the same tag in place.
    pub fn add_group<T: SettingsGroup>(&mut self, group: T) {
        self.add_block(Box::new(group));
    }

    /// Install an already boxed block, replacing any block with its tag.
    pub fn add_block(&mut self, block: Box<dyn SettingsBlock>) {
        match self.position(block.tag()) {
            Some(index) => self.blocks[index] = block,
            None => self.blocks.push(block),
        }
    }

    /// Untyped lookup by tag.
    ///
    /// # Errors
    /// - `ModelError::SettingsNotFound` if no block carries `tag`.
    pub fn get_group(&self, tag: &'static str) -> ModelResult<&dyn SettingsBlock> {
        self.position(tag)
            .map(|index| self.blocks[index].as_ref())
            .ok_or(ModelError::SettingsNotFound { tag })
    }

    /// Typed lookup.
    ///
    /// # Errors
    /// - `ModelError::SettingsNotFound` if the group is not installed.
    pub fn group<T: SettingsGroup>(&self) -> ModelResult<&T> {
        self.get_group(T::TAG)?
            .as_any()
            .downcast_ref::<T>()
            .ok_or(ModelError::SettingsNotFound { tag: T::TAG })
    }

    /// Typed mutable lookup.
    ///
    /// # Errors
    /// - `ModelError::SettingsNotFound` if the group is not installed.
    pub fn group_mut<T: SettingsGroup>(&mut self) -> ModelResult<&mut T> {
        let index = self.position(T::TAG).ok_or(ModelError::SettingsNotFound { tag: T::TAG })?;
        self.blocks[index]
            .as_any_mut()
            .downcast_mut::<T>()
            .ok_or(ModelError::SettingsNotFound { tag: T::TAG })
    }

    /// Copy of the installed group, or `T::default()` without installing it.
    pub fn get_or_default<T: SettingsGroup + Default>(&self) -> T {
        self.group::<T>().cloned().unwrap_or_default()
    }

    /// Mutable access, installing `T::default()` first when absent.
    ///
    /// # Errors
    /// - `ModelError::SettingsNotFound` only if a different type was
    ///   installed under `T::TAG`.
    pub fn settings_or_default<T: SettingsGroup + Default>(&mut self) -> ModelResult<&mut T> {
        if !self.contains(T::TAG) {
            self.add_group(T::default());
        }
        self.group_mut::<T>()
    }

    /// Remove and return the block under `tag`, if any.
    pub fn remove_group(&mut self, tag: &str) -> Option<Box<dyn SettingsBlock>> {
        self.position(tag).map(|index| self.blocks.remove(index))
    }

    /// Clone every block through its deep-copy path.
    pub fn deep_clone(&self) -> Self {
        Self { blocks: self.blocks.iter().map(|b| b.deep_clone_block()).collect() }
    }

    fn position(&self, tag: &str) -> Option<usize> {
        self.blocks.iter().position(|b| b.tag() == tag)
    }
}

/// Copy the block tagged `tag` from `source` onto `dest`, replacing any
/// block `dest` already has under that tag.
///
/// # Errors
/// - `ModelError::SettingsNotFound` if `source` lacks the group.
pub fn copy_group(source: &Model, dest: &mut Model, tag: &'static str) -> ModelResult<()> {
    let block = source.settings().get_group(tag)?.clone_block();
    dest.settings_mut().add_block(block);
    Ok(())
}
