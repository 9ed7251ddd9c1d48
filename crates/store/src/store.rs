//! Combined store trait.

use crate::repos::pickcodes::PickcodeRepo;
use crate::repos::tasks::TaskRepo;

/// The full relational store: every repository in one object-safe trait,
/// so consumers hold a single `Arc<dyn Store>`.
pub trait Store: PickcodeRepo + TaskRepo + Send + Sync {}

impl<T: PickcodeRepo + TaskRepo + Send + Sync> Store for T {}
