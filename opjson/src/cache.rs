//! Cache of compiled programs, keyed by type.
//!
//! Programs are compiled on first use and published at most once per type;
//! every later lookup of the type returns the same `Arc<Program>`.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use opjson_shape::Shape;
use parking_lot::RwLock;

use crate::compiler::{CompileOptions, compile};
use crate::error::CompileError;
use crate::program::Program;

/// Interned identity of a [`Shape`].
///
/// Ids are dense and assigned in order of first sight, so they can index
/// flat tables.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeId(u32);

impl TypeId {
    /// Identity of `shape`, interning it on first sight.
    pub fn of(shape: &'static Shape) -> Self {
        interner().intern(shape)
    }

    /// Position of this id in a flat table.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Process-wide map from shape address to [`TypeId`].
#[derive(Default)]
pub struct TypeInterner {
    ids: RwLock<HashMap<usize, TypeId>>,
}

impl TypeInterner {
    /// Identity of `shape`, assigning the next free id on first sight.
    pub fn intern(&self, shape: &'static Shape) -> TypeId {
        let addr = shape.addr();
        if let Some(id) = self.ids.read().get(&addr) {
            return *id;
        }
        let mut ids = self.ids.write();
        let next = TypeId(ids.len() as u32);
        *ids.entry(addr).or_insert(next)
    }

    /// Number of interned shapes.
    pub fn len(&self) -> usize {
        self.ids.read().len()
    }

    /// Returns true if nothing has been interned yet.
    pub fn is_empty(&self) -> bool {
        self.ids.read().is_empty()
    }
}

static INTERNER: OnceLock<TypeInterner> = OnceLock::new();

fn interner() -> &'static TypeInterner {
    INTERNER.get_or_init(TypeInterner::default)
}

/// Where the execution engine gets programs for dynamically typed values.
pub trait ProgramSource {
    /// Program for values of type `shape`.
    fn program_for(&self, shape: &'static Shape) -> Result<Arc<Program>, CompileError>;
}

/// Type-keyed program cache.
pub struct ProgramCache {
    options: CompileOptions,
    /// `None` when caching is disabled
    slots: Option<RwLock<Vec<Option<Arc<Program>>>>>,
}

impl ProgramCache {
    /// A cache that compiles each type once.
    pub fn new(options: CompileOptions) -> Self {
        Self {
            options,
            slots: Some(RwLock::new(Vec::new())),
        }
    }

    /// A cache that stores nothing: every lookup compiles afresh.
    ///
    /// Programs are identical to the ones a caching instance returns.
    pub fn disabled(options: CompileOptions) -> Self {
        Self {
            options,
            slots: None,
        }
    }

    /// Options programs are compiled with.
    pub const fn options(&self) -> CompileOptions {
        self.options
    }

    /// Returns true unless built with [`ProgramCache::disabled`].
    pub const fn is_enabled(&self) -> bool {
        self.slots.is_some()
    }

    /// The program for `shape`, compiling it on first use.
    ///
    /// Under concurrent first use several callers may compile, but only the
    /// first result is published and every caller receives it. Failures are
    /// not stored.
    pub fn get_or_compile(&self, shape: &'static Shape) -> Result<Arc<Program>, CompileError> {
        let Some(slots) = &self.slots else {
            trace!("cache disabled, compiling {}", shape.type_name);
            return compile(shape, self.options).map(Arc::new);
        };
        let id = TypeId::of(shape);

        // Fast path: check read lock first
        if let Some(Some(program)) = slots.read().get(id.index()) {
            return Ok(Arc::clone(program));
        }

        // Slow path: compile outside the lock
        let compiled = Arc::new(compile(shape, self.options)?);

        let mut slots = slots.write();
        if slots.len() <= id.index() {
            slots.resize(id.index() + 1, None);
        }
        // another thread may have published while we were compiling
        let published = slots[id.index()].get_or_insert_with(|| {
            debug!("publishing program for {} as {:?}", shape.type_name, id);
            compiled
        });
        Ok(Arc::clone(published))
    }

    /// Number of published programs.
    pub fn len(&self) -> usize {
        self.slots
            .as_ref()
            .map_or(0, |slots| slots.read().iter().flatten().count())
    }

    /// Returns true if no program has been published.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a program for `shape` has been published.
    pub fn contains(&self, shape: &'static Shape) -> bool {
        self.slots.as_ref().is_some_and(|slots| {
            matches!(slots.read().get(TypeId::of(shape).index()), Some(Some(_)))
        })
    }
}

impl Default for ProgramCache {
    fn default() -> Self {
        Self::new(CompileOptions::default())
    }
}

impl ProgramSource for ProgramCache {
    fn program_for(&self, shape: &'static Shape) -> Result<Arc<Program>, CompileError> {
        self.get_or_compile(shape)
    }
}

#[cfg(test)]
mod tests {
    use opjson_shape::{Kind, shapes};

    use super::*;

    static ALIAS_A: Shape = Shape::new("Alias", Kind::Int);
    static ALIAS_B: Shape = Shape::new("Alias", Kind::Int);
    static FUNC_FIELDS: [opjson_shape::Field; 1] = [opjson_shape::Field::new("F", || &shapes::FUNC)];
    static HAS_FUNC: Shape = Shape::new("HasFunc", Kind::Struct(&FUNC_FIELDS));

    #[test]
    fn type_ids_are_stable_and_distinct() {
        let a = TypeId::of(&ALIAS_A);
        let b = TypeId::of(&ALIAS_B);
        assert_ne!(a, b);
        assert_eq!(TypeId::of(&ALIAS_A), a);
    }

    #[test]
    fn programs_are_published_once() {
        let cache = ProgramCache::default();
        assert!(!cache.contains(&shapes::STRING));
        let first = cache.get_or_compile(&shapes::STRING).unwrap();
        let second = cache.get_or_compile(&shapes::STRING).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(cache.contains(&shapes::STRING));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn disabled_cache_compiles_equal_programs() {
        let cached = ProgramCache::default();
        let disabled = ProgramCache::disabled(CompileOptions::default());
        let a = disabled.get_or_compile(&shapes::BYTES).unwrap();
        let b = disabled.get_or_compile(&shapes::BYTES).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(*a, *cached.get_or_compile(&shapes::BYTES).unwrap());
        assert!(disabled.is_empty());
        assert!(!disabled.contains(&shapes::BYTES));
    }

    #[test]
    fn failures_are_not_cached() {
        let cache = ProgramCache::default();
        let first = cache.get_or_compile(&HAS_FUNC).unwrap_err();
        let second = cache.get_or_compile(&HAS_FUNC).unwrap_err();
        assert_eq!(first, second);
        assert!(!cache.contains(&HAS_FUNC));
    }
}
