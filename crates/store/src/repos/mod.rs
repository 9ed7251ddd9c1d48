//! Repository traits over the relational store.

pub mod pickcodes;
pub mod tasks;
