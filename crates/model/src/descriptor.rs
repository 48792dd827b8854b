//! Descriptor tree for project hierarchies.
//!
//! Descriptors mirror the project tree as lightweight metadata (name,
//! directory, parent and child links) so the shape of a hierarchy can be
//! inspected or validated without touching the decorated model objects.
//!
//! The tree is an arena: nodes live in one vector, parents are referenced by
//! index and children are an ordered list of indices owned by their parent.
//! All mutation goes through the arena mutex, which also serializes sibling
//! registration under one parent.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;
use tracing::debug;

/// Errors that can occur while building the descriptor tree
#[derive(Debug, Error)]
pub enum DescriptorError {
  /// A sibling with the same name already exists under the parent.
  #[error("project '{name}' already exists under '{parent}'")]
  DuplicateName { parent: String, name: String },

  /// The project directory could not be resolved to an absolute path.
  #[error("failed to resolve project directory '{path}': {source}")]
  Canonicalize {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

static NEXT_ARENA_ID: AtomicU64 = AtomicU64::new(0);

/// Handle to a descriptor. Tagged with the arena that issued it, so a
/// handle from one arena cannot silently read another arena's node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DescriptorId {
  arena: u64,
  index: usize,
}

/// One node of the descriptor tree. Immutable once created, apart from the
/// child list its own descendants append to.
#[derive(Debug, Clone)]
pub struct Descriptor {
  name: String,
  dir: PathBuf,
  parent: Option<DescriptorId>,
  children: Vec<DescriptorId>,
}

impl Descriptor {
  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn dir(&self) -> &Path {
    &self.dir
  }

  pub fn parent(&self) -> Option<DescriptorId> {
    self.parent
  }

  pub fn children(&self) -> &[DescriptorId] {
    &self.children
  }
}

/// Ownership arena for one invocation's descriptor tree.
#[derive(Debug)]
pub struct DescriptorArena {
  id: u64,
  nodes: Mutex<Vec<Descriptor>>,
}

impl Default for DescriptorArena {
  fn default() -> Self {
    Self {
      id: NEXT_ARENA_ID.fetch_add(1, Ordering::Relaxed),
      nodes: Mutex::new(Vec::new()),
    }
  }
}

impl DescriptorArena {
  pub fn new() -> Self {
    Self::default()
  }

  fn index_of(&self, id: DescriptorId) -> usize {
    assert_eq!(
      id.arena, self.id,
      "descriptor id belongs to a different arena"
    );
    id.index
  }

  /// Create the root descriptor. The directory must exist: it is
  /// canonicalized through the filesystem (symlinks and relative segments
  /// resolved) before storage.
  pub fn create_root(&self, name: &str, dir: &Path) -> Result<DescriptorId, DescriptorError> {
    let dir = dunce::canonicalize(dir).map_err(|source| DescriptorError::Canonicalize {
      path: dir.to_path_buf(),
      source,
    })?;
    debug!(name = %name, dir = ?dir, "creating root descriptor");

    let mut nodes = self.nodes.lock().unwrap();
    let id = DescriptorId {
      arena: self.id,
      index: nodes.len(),
    };
    nodes.push(Descriptor {
      name: name.to_string(),
      dir,
      parent: None,
      children: Vec::new(),
    });
    Ok(id)
  }

  /// Create a child descriptor under `parent`. An omitted directory
  /// defaults to `<parent dir>/<name>`. Child directories need not exist
  /// yet, so they are resolved lexically rather than through the
  /// filesystem.
  pub fn create_child(
    &self,
    parent: DescriptorId,
    name: &str,
    dir: Option<&Path>,
  ) -> Result<DescriptorId, DescriptorError> {
    let dir = match dir {
      Some(dir) => std::path::absolute(dir).map_err(|source| DescriptorError::Canonicalize {
        path: dir.to_path_buf(),
        source,
      })?,
      None => self.get(parent).dir.join(name),
    };

    let parent_index = self.index_of(parent);
    let mut nodes = self.nodes.lock().unwrap();
    let sibling_clash = nodes[parent_index]
      .children
      .iter()
      .any(|child| nodes[child.index].name == name);
    if sibling_clash {
      return Err(DescriptorError::DuplicateName {
        parent: nodes[parent_index].name.clone(),
        name: name.to_string(),
      });
    }

    debug!(name = %name, dir = ?dir, parent = %nodes[parent_index].name, "creating child descriptor");
    let id = DescriptorId {
      arena: self.id,
      index: nodes.len(),
    };
    nodes.push(Descriptor {
      name: name.to_string(),
      dir,
      parent: Some(parent),
      children: Vec::new(),
    });
    nodes[parent_index].children.push(id);
    Ok(id)
  }

  /// Snapshot of the descriptor behind `id`.
  ///
  /// Panics if `id` was issued by a different arena.
  pub fn get(&self, id: DescriptorId) -> Descriptor {
    let index = self.index_of(id);
    self.nodes.lock().unwrap()[index].clone()
  }

  /// Fallible variant of [`get`](Self::get): returns `None` instead of
  /// panicking when `id` was issued by a different arena.
  pub fn try_get(&self, id: DescriptorId) -> Option<Descriptor> {
    if id.arena != self.id {
      return None;
    }
    self.nodes.lock().unwrap().get(id.index).cloned()
  }

  pub fn name(&self, id: DescriptorId) -> String {
    let index = self.index_of(id);
    self.nodes.lock().unwrap()[index].name.clone()
  }

  pub fn dir(&self, id: DescriptorId) -> PathBuf {
    let index = self.index_of(id);
    self.nodes.lock().unwrap()[index].dir.clone()
  }

  pub fn len(&self) -> usize {
    self.nodes.lock().unwrap().len()
  }

  pub fn is_empty(&self) -> bool {
    self.nodes.lock().unwrap().is_empty()
  }
}

#[cfg(test)]
mod tests {
  use tempfile::TempDir;

  use super::*;

  fn arena_with_root() -> (TempDir, DescriptorArena, DescriptorId) {
    let tmp = TempDir::new().unwrap();
    let arena = DescriptorArena::new();
    let root = arena.create_root("root", tmp.path()).unwrap();
    (tmp, arena, root)
  }

  #[test]
  fn root_dir_is_canonicalized() {
    let (tmp, arena, root) = arena_with_root();
    assert_eq!(arena.dir(root), dunce::canonicalize(tmp.path()).unwrap());
    assert_eq!(arena.name(root), "root");
    assert!(arena.get(root).parent().is_none());
  }

  #[test]
  fn missing_root_dir_fails_with_canonicalize_error() {
    let tmp = TempDir::new().unwrap();
    let missing = tmp.path().join("does-not-exist");
    let arena = DescriptorArena::new();
    let err = arena.create_root("root", &missing).unwrap_err();
    assert!(matches!(err, DescriptorError::Canonicalize { .. }));
  }

  #[test]
  fn child_dir_defaults_to_parent_dir_plus_name() {
    let (_tmp, arena, root) = arena_with_root();
    let child = arena.create_child(root, "child", None).unwrap();
    assert_eq!(arena.dir(child), arena.dir(root).join("child"));
    assert_eq!(arena.get(child).parent(), Some(root));
  }

  #[test]
  fn explicit_child_dir_is_kept() {
    let (tmp, arena, root) = arena_with_root();
    let elsewhere = tmp.path().join("elsewhere");
    let child = arena.create_child(root, "child", Some(&elsewhere)).unwrap();
    assert_eq!(arena.dir(child), std::path::absolute(&elsewhere).unwrap());
  }

  #[test]
  fn duplicate_sibling_name_rejected() {
    let (_tmp, arena, root) = arena_with_root();
    arena.create_child(root, "child", None).unwrap();
    let err = arena.create_child(root, "child", None).unwrap_err();
    assert!(matches!(
      err,
      DescriptorError::DuplicateName { name, .. } if name == "child"
    ));
    // The first child is intact.
    assert_eq!(arena.get(root).children().len(), 1);
  }

  #[test]
  fn same_name_allowed_under_different_parents() {
    let (_tmp, arena, root) = arena_with_root();
    let a = arena.create_child(root, "a", None).unwrap();
    let b = arena.create_child(root, "b", None).unwrap();
    arena.create_child(a, "lib", None).unwrap();
    arena.create_child(b, "lib", None).unwrap();
    assert_eq!(arena.len(), 5);
  }

  #[test]
  fn ids_from_another_arena_are_rejected() {
    let (_tmp_a, arena_a, root_a) = arena_with_root();
    let (_tmp_b, arena_b, root_b) = arena_with_root();
    assert!(arena_b.try_get(root_a).is_none());
    assert!(arena_a.try_get(root_b).is_none());
    assert_eq!(arena_a.try_get(root_a).unwrap().name(), "root");
  }

  #[test]
  fn children_keep_registration_order() {
    let (_tmp, arena, root) = arena_with_root();
    let first = arena.create_child(root, "first", None).unwrap();
    let second = arena.create_child(root, "second", None).unwrap();
    assert_eq!(arena.get(root).children(), &[first, second]);
  }
}
