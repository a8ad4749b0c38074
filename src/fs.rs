//! The `FeatureStructure` external interface (§3, §6).
//!
//! The core never looks inside a feature structure: it only ever calls the
//! operations below. Implementations own whatever representation they like
//! (a DAG arena, a term-rewriting engine, …) behind the `Fs` handle type.
//! Because unification can touch the whole structure, every mutating
//! operation takes `&mut self`: `Self` stands for the arena/engine that
//! handles are valid within, not for a single feature structure.
//!
//! `unify`, `unify_np`, and `unify_restrict` all share the shape "unify the
//! value at argument position `arg` of `root` with `sub`, producing a new
//! root". They differ in how much of `sub`'s structure survives into the
//! result (§4.D step 4): `unify_np` is the plain case used for every
//! argument but the last; `unify_restrict` is used for the last argument of
//! a passive result and additionally deletes the grammar's configured
//! "deleted daughters" attributes from the surviving structure.

/// Stable non-negative integer code for a feature-structure type, supplied
/// by the grammar.
pub type TypeId = u32;

/// Stable non-negative integer code for a feature attribute (path segment),
/// supplied by the grammar.
pub type AttrId = u32;

/// A fixed-length vector of type codes read off an item's feature structure
/// along the grammar's configured quickcheck paths. Two vectors of
/// different lengths are never compared; callers are expected to size them
/// from `Options::nqc_unif`/`nqc_subs`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Hash)]
pub struct QcVector(pub Vec<Option<TypeId>>);

impl QcVector {
  pub fn empty() -> Self {
    Self(Vec::new())
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }
}

/// Opaque feature-structure engine. `Self` owns whatever arena its `Fs`
/// handles point into; handles from different instances must never be
/// mixed.
pub trait FeatureStructure {
  /// Handle to a node in this engine's feature-structure graph. Cheap to
  /// copy (an index, a pointer, …); never independently meaningful outside
  /// calls back into the engine that produced it.
  type Fs: Clone + Eq + std::fmt::Debug;

  /// Build a fresh feature structure of the given type (e.g. a rule's own
  /// template, freshly instantiated for this application).
  fn instantiate(&mut self, ty: TypeId) -> Self::Fs;

  /// Read the value currently unified into `root`'s `i`-th argument, if the
  /// structure has one.
  fn nth_arg(&self, root: &Self::Fs, i: usize) -> Option<Self::Fs>;

  /// Unify `sub` into `root`'s `arg`-th argument, returning the (possibly
  /// mutated) root on success. `None` on unification failure; the engine is
  /// expected to leave no observable trace of the attempt (new nodes
  /// allocated during a failed attempt are simply unreachable garbage, not a
  /// correctness concern since `Self` is fully owned by one session).
  fn unify(&mut self, root: &Self::Fs, arg: usize, sub: &Self::Fs) -> Option<Self::Fs>;

  /// As `unify`, for every argument but the last one filled in a rule
  /// application (§4.D step 4).
  fn unify_np(&mut self, root: &Self::Fs, arg: usize, sub: &Self::Fs) -> Option<Self::Fs>;

  /// As `unify`, for the last argument filled when the result is passive;
  /// additionally deletes `del_attrs` from the surviving structure before
  /// returning it.
  fn unify_restrict(
    &mut self,
    root: &Self::Fs,
    arg: usize,
    sub: &Self::Fs,
    del_attrs: &[AttrId],
  ) -> Option<Self::Fs>;

  /// Deep-copy a feature structure into a form that owns its own storage,
  /// independent of whatever transient generation produced it. Passive
  /// items call this once to obtain their permanent fs (§9); active items
  /// never need to, since they recompute on demand instead.
  fn copy(&mut self, fs: &Self::Fs) -> Self::Fs;

  /// Cheap compatibility pre-check: could `a` and `b` possibly unify? A
  /// `false` result is authoritative; `true` is not a guarantee.
  fn compatible(&self, a: &Self::Fs, b: &Self::Fs) -> bool;

  /// Full subsumption test. Returns `(a_subsumes_b, b_subsumes_a)`; both
  /// `true` means `a` and `b` are subsumption-equivalent.
  fn subsumes(&self, a: &Self::Fs, b: &Self::Fs) -> (bool, bool);

  /// Extract the quickcheck vector for `fs`, one type code per configured
  /// path, up to `len` positions.
  fn qc_vector(&self, fs: &Self::Fs, len: usize) -> QcVector;

  /// Fast approximate unifiability test over two quickcheck vectors: true
  /// iff for every position the glb of the two types exists (or either side
  /// is unset).
  fn qc_compatible_unif(&self, a: &QcVector, b: &QcVector) -> bool;

  /// Fast approximate subsumption test over two quickcheck vectors, mirror
  /// of `subsumes`'s `(forward, backward)` shape.
  fn qc_compatible_subs(&self, a: &QcVector, b: &QcVector) -> (bool, bool);

  /// The type at the root of `fs`.
  fn type_of(&self, fs: &Self::Fs) -> TypeId;
}
