//! Migration repository and revision graph resolution
//!
//! The repository owns every discovered script, checks once at construction
//! that they form a single linear chain, and turns `(current, target)` pairs
//! into execution plans by walking that chain.

use std::collections::{HashMap, HashSet};
use tracing::debug;

use super::loader::ScriptLoader;
use super::plan::{Direction, ExecutionPlan, PlanStep, Target};
use super::script::MigrationScript;
use crate::error::{MigrationError, MigrationResult};

/// Validated catalog of migration scripts, ordered base to head
pub struct MigrationRepository {
    chain: Vec<Box<dyn MigrationScript>>,
    index: HashMap<String, usize>,
}

impl MigrationRepository {
    /// Build a repository, failing with `InconsistentGraph` unless the
    /// scripts form exactly one chain with one base and one head
    pub fn new(scripts: Vec<Box<dyn MigrationScript>>) -> MigrationResult<Self> {
        let chain = order_chain(scripts)?;
        let index = chain
            .iter()
            .enumerate()
            .map(|(i, s)| (s.revision().to_string(), i))
            .collect();
        debug!("migration repository holds {} revisions", chain.len());
        Ok(Self { chain, index })
    }

    pub fn from_loader(loader: &dyn ScriptLoader) -> MigrationResult<Self> {
        Self::new(loader.load()?)
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    /// Latest revision; `None` when there are no scripts
    pub fn head(&self) -> Option<&str> {
        self.chain.last().map(|s| s.revision())
    }

    /// Earliest revision; `None` when there are no scripts
    pub fn base(&self) -> Option<&str> {
        self.chain.first().map(|s| s.revision())
    }

    pub fn get(&self, revision: &str) -> Option<&dyn MigrationScript> {
        self.index.get(revision).map(|&i| self.chain[i].as_ref())
    }

    /// All scripts in base to head order
    pub fn history(&self) -> impl DoubleEndedIterator<Item = &dyn MigrationScript> + '_ {
        self.chain.iter().map(|s| s.as_ref())
    }

    /// Look up a revision by exact id or by a unique prefix of one
    pub fn lookup(&self, id_or_prefix: &str) -> MigrationResult<&dyn MigrationScript> {
        let pos = self.lookup_position(id_or_prefix)?;
        Ok(self.chain[pos].as_ref())
    }

    /// Whether `ancestor` (`None` = base) is at or below `revision`
    pub fn is_ancestor(&self, ancestor: Option<&str>, revision: &str) -> MigrationResult<bool> {
        let a = self.exact_position(ancestor)?;
        let r = self.exact_position(Some(revision))?;
        Ok(rank(a) <= rank(r))
    }

    /// Compute the plan that moves a schema from `current` to `target`
    ///
    /// `current` must be an exact revision id (or `None` for base); it
    /// normally comes from the version store.
    pub fn resolve(
        &self,
        current: Option<&str>,
        target: &Target,
    ) -> MigrationResult<ExecutionPlan<'_>> {
        let from = self.exact_position(current)?;
        let to = self.target_position(from, target)?;

        let steps = if rank(to) > rank(from) {
            let start = from.map_or(0, |i| i + 1);
            let end = to.map_or(0, |i| i + 1);
            (start..end)
                .map(|i| PlanStep {
                    script: self.chain[i].as_ref(),
                    direction: Direction::Apply,
                })
                .collect()
        } else {
            let start = to.map_or(0, |i| i + 1);
            let end = from.map_or(0, |i| i + 1);
            (start..end)
                .rev()
                .map(|i| PlanStep {
                    script: self.chain[i].as_ref(),
                    direction: Direction::Revert,
                })
                .collect()
        };

        Ok(ExecutionPlan {
            from: self.revision_at(from),
            to: self.revision_at(to),
            steps,
        })
    }

    /// Resolve a target to the revision it names, relative to `current`
    pub fn resolve_target(
        &self,
        current: Option<&str>,
        target: &Target,
    ) -> MigrationResult<Option<String>> {
        let from = self.exact_position(current)?;
        Ok(self.revision_at(self.target_position(from, target)?))
    }

    fn revision_at(&self, pos: Option<usize>) -> Option<String> {
        pos.map(|i| self.chain[i].revision().to_string())
    }

    fn exact_position(&self, revision: Option<&str>) -> MigrationResult<Option<usize>> {
        match revision {
            None => Ok(None),
            Some(rev) => self
                .index
                .get(rev)
                .copied()
                .map(Some)
                .ok_or_else(|| MigrationError::UnknownRevision(rev.to_string())),
        }
    }

    fn lookup_position(&self, id_or_prefix: &str) -> MigrationResult<usize> {
        if let Some(&pos) = self.index.get(id_or_prefix) {
            return Ok(pos);
        }
        let mut candidates: Vec<(usize, &str)> = self
            .chain
            .iter()
            .enumerate()
            .filter(|(_, s)| s.revision().starts_with(id_or_prefix))
            .map(|(i, s)| (i, s.revision()))
            .collect();
        match candidates.len() {
            0 => Err(MigrationError::UnknownRevision(id_or_prefix.to_string())),
            1 => Ok(candidates.remove(0).0),
            _ => Err(MigrationError::AmbiguousRevision {
                prefix: id_or_prefix.to_string(),
                candidates: candidates.iter().map(|(_, r)| r.to_string()).collect(),
            }),
        }
    }

    fn target_position(
        &self,
        from: Option<usize>,
        target: &Target,
    ) -> MigrationResult<Option<usize>> {
        match target {
            Target::Base => Ok(None),
            Target::Head => Ok(self.chain.len().checked_sub(1)),
            Target::Revision(rev) => self.lookup_position(rev).map(Some),
            Target::Relative(n) => {
                let out_of_range = || {
                    MigrationError::UnknownRevision(format!(
                        "{:+} from {}",
                        n,
                        self.revision_at(from).as_deref().unwrap_or("base")
                    ))
                };
                let pos = rank(from).checked_add(*n).ok_or_else(out_of_range)?;
                if pos < -1 || pos >= self.chain.len() as i64 {
                    return Err(out_of_range());
                }
                Ok(usize::try_from(pos).ok())
            }
        }
    }
}

/// Chain rank where base sits at -1
fn rank(pos: Option<usize>) -> i64 {
    pos.map_or(-1, |i| i as i64)
}

/// Validate the scripts and return them ordered from base to head
fn order_chain(
    scripts: Vec<Box<dyn MigrationScript>>,
) -> MigrationResult<Vec<Box<dyn MigrationScript>>> {
    if scripts.is_empty() {
        return Ok(scripts);
    }

    let mut ids = HashSet::new();
    for script in &scripts {
        let rev = script.revision();
        if rev.is_empty() {
            return Err(MigrationError::InconsistentGraph(
                "revision with an empty id".to_string(),
            ));
        }
        if !ids.insert(rev.to_string()) {
            return Err(MigrationError::InconsistentGraph(format!(
                "duplicate revision {}",
                rev
            )));
        }
    }

    let mut bases = Vec::new();
    let mut children: HashMap<&str, Vec<&str>> = HashMap::new();
    for script in &scripts {
        match script.parent() {
            None => bases.push(script.revision()),
            Some(parent) => {
                if !ids.contains(parent) {
                    return Err(MigrationError::InconsistentGraph(format!(
                        "revision {} revises unknown revision {}",
                        script.revision(),
                        parent
                    )));
                }
                children.entry(parent).or_default().push(script.revision());
            }
        }
    }

    if bases.len() != 1 {
        return Err(MigrationError::InconsistentGraph(format!(
            "expected exactly one base revision, found {}: [{}]",
            bases.len(),
            bases.join(", ")
        )));
    }

    if let Some((parent, kids)) = children.iter().find(|(_, kids)| kids.len() > 1) {
        let mut kids = kids.clone();
        kids.sort_unstable();
        return Err(MigrationError::InconsistentGraph(format!(
            "revision {} is revised by more than one revision: [{}]; multiple heads are not supported",
            parent,
            kids.join(", ")
        )));
    }

    let mut order: Vec<String> = Vec::with_capacity(scripts.len());
    let mut cursor = Some(bases[0]);
    while let Some(rev) = cursor {
        order.push(rev.to_string());
        cursor = children.get(rev).and_then(|kids| kids.first().copied());
    }

    if order.len() != scripts.len() {
        let reached: HashSet<&str> = order.iter().map(String::as_str).collect();
        let mut unreachable: Vec<&str> = scripts
            .iter()
            .map(|s| s.revision())
            .filter(|r| !reached.contains(r))
            .collect();
        unreachable.sort_unstable();
        return Err(MigrationError::InconsistentGraph(format!(
            "revisions not reachable from base {} (cycle?): [{}]",
            bases[0],
            unreachable.join(", ")
        )));
    }

    let positions: HashMap<String, usize> = order
        .into_iter()
        .enumerate()
        .map(|(i, r)| (r, i))
        .collect();
    let mut slots: Vec<Option<Box<dyn MigrationScript>>> = std::iter::repeat_with(|| None)
        .take(scripts.len())
        .collect();
    for script in scripts {
        let pos = positions[script.revision()];
        slots[pos] = Some(script);
    }
    Ok(slots.into_iter().flatten().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migration::FnScript;

    fn script(rev: &str, parent: Option<&str>) -> Box<dyn MigrationScript> {
        Box::new(FnScript::new(rev, parent))
    }

    /// a <- b <- c <- d, handed over out of order
    fn linear() -> MigrationRepository {
        MigrationRepository::new(vec![
            script("ccc333", Some("bbb222")),
            script("aaa111", None),
            script("ddd444", Some("ccc333")),
            script("bbb222", Some("aaa111")),
        ])
        .unwrap()
    }

    fn graph_error(scripts: Vec<Box<dyn MigrationScript>>) -> String {
        match MigrationRepository::new(scripts) {
            Err(MigrationError::InconsistentGraph(msg)) => msg,
            Err(e) => panic!("unexpected error: {}", e),
            Ok(_) => panic!("expected InconsistentGraph"),
        }
    }

    #[test]
    fn test_orders_chain() {
        let repo = linear();
        assert_eq!(repo.len(), 4);
        assert_eq!(repo.base(), Some("aaa111"));
        assert_eq!(repo.head(), Some("ddd444"));
        let order: Vec<&str> = repo.history().map(|s| s.revision()).collect();
        assert_eq!(order, vec!["aaa111", "bbb222", "ccc333", "ddd444"]);
    }

    #[test]
    fn test_empty_repository() {
        let repo = MigrationRepository::new(vec![]).unwrap();
        assert!(repo.is_empty());
        assert_eq!(repo.head(), None);
        assert!(repo.resolve(None, &Target::Head).unwrap().is_empty());
    }

    #[test]
    fn test_two_bases_rejected() {
        let msg = graph_error(vec![script("aaa", None), script("bbb", None)]);
        assert!(msg.contains("exactly one base"));
    }

    #[test]
    fn test_unknown_parent_rejected() {
        let msg = graph_error(vec![script("aaa", None), script("bbb", Some("zzz"))]);
        assert!(msg.contains("unknown revision zzz"));
    }

    #[test]
    fn test_duplicate_rejected() {
        let msg = graph_error(vec![script("aaa", None), script("aaa", None)]);
        assert!(msg.contains("duplicate"));
    }

    #[test]
    fn test_branch_rejected() {
        let msg = graph_error(vec![
            script("aaa", None),
            script("bbb", Some("aaa")),
            script("ccc", Some("aaa")),
        ]);
        assert!(msg.contains("more than one revision"));
    }

    #[test]
    fn test_cycle_rejected() {
        let msg = graph_error(vec![
            script("aaa", None),
            script("bbb", Some("ccc")),
            script("ccc", Some("bbb")),
        ]);
        assert!(msg.contains("not reachable"));
    }

    #[test]
    fn test_resolve_base_to_head() {
        let repo = linear();
        let plan = repo.resolve(None, &Target::Head).unwrap();
        assert_eq!(plan.revisions(), vec!["aaa111", "bbb222", "ccc333", "ddd444"]);
        assert_eq!(plan.direction(), Some(Direction::Apply));
        assert_eq!(plan.from, None);
        assert_eq!(plan.to.as_deref(), Some("ddd444"));
        assert_eq!(plan.steps.last().unwrap().resulting_revision(), Some("ddd444"));
    }

    #[test]
    fn test_resolve_partial_upgrade() {
        let repo = linear();
        let plan = repo
            .resolve(Some("aaa111"), &Target::Revision("ccc333".to_string()))
            .unwrap();
        assert_eq!(plan.revisions(), vec!["bbb222", "ccc333"]);
    }

    #[test]
    fn test_resolve_downgrade() {
        let repo = linear();
        let plan = repo
            .resolve(Some("ddd444"), &Target::Revision("bbb222".to_string()))
            .unwrap();
        assert_eq!(plan.revisions(), vec!["ddd444", "ccc333"]);
        assert_eq!(plan.direction(), Some(Direction::Revert));
        assert_eq!(plan.steps[1].resulting_revision(), Some("bbb222"));

        let plan = repo.resolve(Some("ddd444"), &Target::Base).unwrap();
        assert_eq!(plan.revisions(), vec!["ddd444", "ccc333", "bbb222", "aaa111"]);
        assert_eq!(plan.steps[3].resulting_revision(), None);
        assert_eq!(plan.to, None);
    }

    #[test]
    fn test_resolve_same_revision_is_empty() {
        let repo = linear();
        assert!(repo
            .resolve(Some("ddd444"), &Target::Head)
            .unwrap()
            .is_empty());
        assert!(repo.resolve(None, &Target::Base).unwrap().is_empty());
    }

    #[test]
    fn test_resolve_unknown_revisions() {
        let repo = linear();
        assert!(matches!(
            repo.resolve(Some("nope"), &Target::Head),
            Err(MigrationError::UnknownRevision(r)) if r == "nope"
        ));
        assert!(matches!(
            repo.resolve(None, &Target::Revision("zzz".to_string())),
            Err(MigrationError::UnknownRevision(_))
        ));
    }

    #[test]
    fn test_resolve_prefix() {
        let repo = linear();
        let plan = repo
            .resolve(None, &Target::Revision("bb".to_string()))
            .unwrap();
        assert_eq!(plan.to.as_deref(), Some("bbb222"));

        let repo = MigrationRepository::new(vec![
            script("ab01", None),
            script("ab02", Some("ab01")),
        ])
        .unwrap();
        match repo.resolve(None, &Target::Revision("ab".to_string())) {
            Err(MigrationError::AmbiguousRevision { candidates, .. }) => {
                assert_eq!(candidates, vec!["ab01".to_string(), "ab02".to_string()])
            }
            _ => panic!("expected AmbiguousRevision"),
        }
    }

    #[test]
    fn test_resolve_relative() {
        let repo = linear();
        let plan = repo.resolve(Some("bbb222"), &Target::Relative(-1)).unwrap();
        assert_eq!(plan.revisions(), vec!["bbb222"]);
        assert_eq!(plan.to.as_deref(), Some("aaa111"));

        let plan = repo.resolve(None, &Target::Relative(2)).unwrap();
        assert_eq!(plan.revisions(), vec!["aaa111", "bbb222"]);

        let plan = repo.resolve(Some("aaa111"), &Target::Relative(-1)).unwrap();
        assert_eq!(plan.to, None);

        assert!(repo.resolve(Some("aaa111"), &Target::Relative(-2)).is_err());
        assert!(repo.resolve(Some("ddd444"), &Target::Relative(1)).is_err());
    }

    #[test]
    fn test_resolve_relative_extremes() {
        let repo = linear();
        assert!(matches!(
            repo.resolve(Some("bbb222"), &Target::Relative(i64::MAX)),
            Err(MigrationError::UnknownRevision(_))
        ));
        assert!(matches!(
            repo.resolve(None, &Target::Relative(i64::MIN)),
            Err(MigrationError::UnknownRevision(_))
        ));

        let target: Target = "+9223372036854775807".parse().unwrap();
        assert!(matches!(
            repo.resolve(Some("ddd444"), &target),
            Err(MigrationError::UnknownRevision(_))
        ));
    }

    #[test]
    fn test_is_ancestor() {
        let repo = linear();
        assert!(repo.is_ancestor(None, "aaa111").unwrap());
        assert!(repo.is_ancestor(Some("bbb222"), "ddd444").unwrap());
        assert!(!repo.is_ancestor(Some("ddd444"), "bbb222").unwrap());
        assert!(repo.is_ancestor(Some("zzz"), "aaa111").is_err());
    }

    #[test]
    fn test_lookup() {
        let repo = linear();
        assert_eq!(repo.lookup("ccc").unwrap().parent(), Some("bbb222"));
        assert!(repo.get("ccc").is_none());
        assert!(repo.get("ccc333").is_some());
    }
}
