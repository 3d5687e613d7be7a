//! Graph Context: per-pass bookkeeping of object ids, library ids and class layouts
//!
//! A fresh context is built for every decode or encode call and dropped at the
//! end of it. Nothing is shared between calls.

use std::rc::Rc;

use hashbrown::HashMap;

use crate::config::{CodecConfig, ReferencePolicy};
use crate::error::{Location, NrbfError};
use crate::types::MemberType;
use crate::Result;

/// What an object id names
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    /// Class instance; `metadata_id` is the record holding its layout
    Class { metadata_id: i32 },
    String,
    Array,
}

/// Cached class shape, reused by `ClassWithId` records
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassLayout {
    pub name: String,
    pub member_names: Vec<String>,
    /// `None` for layouts sent without member types
    pub member_types: Option<Vec<MemberType>>,
    /// `None` for runtime (system) classes
    pub library_id: Option<i32>,
}

impl ClassLayout {
    pub fn member_count(&self) -> usize {
        self.member_names.len()
    }
}

/// Mutable state of one decode or encode pass
#[derive(Debug)]
pub struct GraphContext {
    policy: ReferencePolicy,
    max_depth: usize,
    depth: usize,
    max_null_slots: usize,
    null_slots: usize,
    objects: HashMap<i32, ObjectKind>,
    classes: HashMap<i32, Rc<ClassLayout>>,
    libraries: HashMap<i32, String>,
    /// Forward references awaiting a definition (deferred policy only)
    pending: Vec<(i32, Location)>,
}

impl Default for GraphContext {
    fn default() -> Self {
        Self::new(&CodecConfig::default())
    }
}

impl GraphContext {
    pub fn new(config: &CodecConfig) -> Self {
        Self {
            policy: config.reference_policy,
            max_depth: config.max_depth,
            depth: 0,
            max_null_slots: config.max_null_slots,
            null_slots: 0,
            objects: HashMap::new(),
            classes: HashMap::new(),
            libraries: HashMap::new(),
            pending: Vec::new(),
        }
    }

    /// Register a newly defined object id
    pub fn assign_object_id(&mut self, id: i32, kind: ObjectKind, at: Location) -> Result<()> {
        if self.objects.contains_key(&id) {
            return Err(NrbfError::DuplicateObjectId { id, at });
        }
        self.objects.insert(id, kind);
        Ok(())
    }

    /// Look up an already defined object id
    pub fn resolve_reference(&self, id: i32, at: Location) -> Result<&ObjectKind> {
        self.objects
            .get(&id)
            .ok_or(NrbfError::DanglingReference { id, at })
    }

    /// Check a `MemberReference` according to the reference policy
    pub fn check_reference(&mut self, id: i32, at: Location) -> Result<()> {
        match self.policy {
            ReferencePolicy::Strict => self.resolve_reference(id, at).map(|_| ()),
            ReferencePolicy::Deferred => {
                if !self.objects.contains_key(&id) {
                    self.pending.push((id, at));
                }
                Ok(())
            }
        }
    }

    /// Store the layout of a class-defining record under its object id
    pub fn cache_class_layout(&mut self, object_id: i32, layout: ClassLayout) {
        self.classes.insert(object_id, Rc::new(layout));
    }

    /// Layout of an earlier class-defining record
    pub fn class_layout(&self, metadata_id: i32, at: Location) -> Result<Rc<ClassLayout>> {
        self.classes
            .get(&metadata_id)
            .cloned()
            .ok_or(NrbfError::DanglingReference {
                id: metadata_id,
                at,
            })
    }

    pub fn register_library(&mut self, library_id: i32, name: &str, at: Location) -> Result<()> {
        if self.libraries.contains_key(&library_id) {
            return Err(NrbfError::DuplicateLibraryId { id: library_id, at });
        }
        self.libraries.insert(library_id, name.to_string());
        Ok(())
    }

    pub fn lookup_library(&self, library_id: i32, at: Location) -> Result<&str> {
        self.libraries
            .get(&library_id)
            .map(String::as_str)
            .ok_or(NrbfError::UnknownLibrary { id: library_id, at })
    }

    /// Enter a record nested inside a member value
    pub(crate) fn enter(&mut self, at: Location) -> Result<()> {
        if self.depth >= self.max_depth {
            return Err(NrbfError::NestingTooDeep {
                limit: self.max_depth,
                at,
            });
        }
        self.depth += 1;
        Ok(())
    }

    pub(crate) fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    /// Account for `count` null slots about to be expanded from a null run
    pub(crate) fn expand_nulls(&mut self, count: usize, at: Location) -> Result<()> {
        let total = self.null_slots.saturating_add(count);
        if total > self.max_null_slots {
            return Err(NrbfError::NullSlotLimit {
                limit: self.max_null_slots,
                at,
            });
        }
        self.null_slots = total;
        Ok(())
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn library_count(&self) -> usize {
        self.libraries.len()
    }

    /// Resolve forward references left open at the end of the pass
    pub fn finish(&self) -> Result<()> {
        match self
            .pending
            .iter()
            .find(|(id, _)| !self.objects.contains_key(id))
        {
            Some(&(id, at)) => Err(NrbfError::DanglingReference { id, at }),
            None => Ok(()),
        }
    }
}
