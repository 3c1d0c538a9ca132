//! Migration scripts
//!
//! A script is an immutable `(apply, revert)` pair identified by its revision
//! id and linked to the revision it builds on.

use anyhow::Result;
use std::fmt;

use super::context::MigrationContext;

/// A single revision in the migration chain
pub trait MigrationScript: Send + Sync {
    /// Unique, opaque revision id
    fn revision(&self) -> &str;

    /// Revision this one builds on; `None` for the base revision
    fn parent(&self) -> Option<&str>;

    fn description(&self) -> &str {
        ""
    }

    /// Move the schema forward to this revision
    fn apply(&self, ctx: &MigrationContext<'_>) -> Result<()>;

    /// Undo exactly what `apply` did
    fn revert(&self, ctx: &MigrationContext<'_>) -> Result<()>;
}

type StepFn = Box<dyn Fn(&MigrationContext<'_>) -> Result<()> + Send + Sync>;

/// A script defined with Rust closures
///
/// ```rust,ignore
/// let script = FnScript::new("3f1c9a0d2b7e", None)
///     .with_description("create rooms")
///     .on_apply(|ctx| ctx.execute_batch("CREATE TABLE {schema}.rooms (id TEXT)"))
///     .on_revert(|ctx| ctx.execute_batch("DROP TABLE {schema}.rooms"));
/// ```
pub struct FnScript {
    revision: String,
    parent: Option<String>,
    description: String,
    apply: StepFn,
    revert: StepFn,
}

impl FnScript {
    pub fn new(revision: &str, parent: Option<&str>) -> Self {
        Self {
            revision: revision.to_string(),
            parent: parent.map(str::to_string),
            description: String::new(),
            apply: Box::new(|_| Ok(())),
            revert: Box::new(|_| Ok(())),
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn on_apply<F>(mut self, f: F) -> Self
    where
        F: Fn(&MigrationContext<'_>) -> Result<()> + Send + Sync + 'static,
    {
        self.apply = Box::new(f);
        self
    }

    pub fn on_revert<F>(mut self, f: F) -> Self
    where
        F: Fn(&MigrationContext<'_>) -> Result<()> + Send + Sync + 'static,
    {
        self.revert = Box::new(f);
        self
    }
}

impl MigrationScript for FnScript {
    fn revision(&self) -> &str {
        &self.revision
    }

    fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn apply(&self, ctx: &MigrationContext<'_>) -> Result<()> {
        (self.apply)(ctx)
    }

    fn revert(&self, ctx: &MigrationContext<'_>) -> Result<()> {
        (self.revert)(ctx)
    }
}

impl fmt::Debug for FnScript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnScript")
            .field("revision", &self.revision)
            .field("parent", &self.parent)
            .finish()
    }
}

/// A script made of two SQL batches, usually read from a revision file
///
/// `{schema}` in either batch is replaced with the quoted schema name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlScript {
    pub revision: String,
    pub parent: Option<String>,
    pub description: String,
    pub up: String,
    pub down: String,
}

impl MigrationScript for SqlScript {
    fn revision(&self) -> &str {
        &self.revision
    }

    fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn apply(&self, ctx: &MigrationContext<'_>) -> Result<()> {
        ctx.execute_batch(&self.up)
    }

    fn revert(&self, ctx: &MigrationContext<'_>) -> Result<()> {
        ctx.execute_batch(&self.down)
    }
}
