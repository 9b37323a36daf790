//! The manifest of record (`modules.json`)
//!
//! The manifest is the single source of truth for which components are
//! installed, at which revision, and why (`installed_by` edges). Every map
//! is a `BTreeMap` and every edge set a `BTreeSet`, so serialisation is
//! sorted without any extra work.

pub mod invariants;
pub mod reconcile;
pub mod store;

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::component::{ComponentId, ComponentKind, Owner};

/// Record of one installed component
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub branch: String,
    pub git_sha: String,
    #[serde(default)]
    pub installed_by: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch: Option<String>,
}

impl Entry {
    pub fn new(revision: impl Into<String>, branch: impl Into<String>) -> Self {
        Self {
            branch: branch.into(),
            git_sha: revision.into(),
            installed_by: BTreeSet::new(),
            patch: None,
        }
    }
}

/// `org -> name -> Entry`
pub type OrgMap = BTreeMap<String, BTreeMap<String, Entry>>;

/// Components of one remote
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepoEntry {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub modules: OrgMap,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub subworkflows: OrgMap,
}

impl RepoEntry {
    fn kind(&self, kind: ComponentKind) -> &OrgMap {
        match kind {
            ComponentKind::Module => &self.modules,
            ComponentKind::Subworkflow => &self.subworkflows,
        }
    }

    fn kind_mut(&mut self, kind: ComponentKind) -> &mut OrgMap {
        match kind {
            ComponentKind::Module => &mut self.modules,
            ComponentKind::Subworkflow => &mut self.subworkflows,
        }
    }

    fn is_empty(&self) -> bool {
        self.modules.is_empty() && self.subworkflows.is_empty()
    }
}

/// The whole `modules.json` document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(rename = "homePage", default)]
    pub home_page: String,
    pub name: String,
    #[serde(default)]
    pub repos: BTreeMap<String, RepoEntry>,
}

impl Manifest {
    pub fn new(name: impl Into<String>, home_page: impl Into<String>) -> Self {
        Self {
            home_page: home_page.into(),
            name: name.into(),
            repos: BTreeMap::new(),
        }
    }

    pub fn get(&self, id: &ComponentId) -> Option<&Entry> {
        self.repos
            .get(&id.remote)?
            .kind(id.kind)
            .get(&id.org)?
            .get(&id.name)
    }

    pub fn get_mut(&mut self, id: &ComponentId) -> Option<&mut Entry> {
        self.repos
            .get_mut(&id.remote)?
            .kind_mut(id.kind)
            .get_mut(&id.org)?
            .get_mut(&id.name)
    }

    pub fn contains(&self, id: &ComponentId) -> bool {
        self.get(id).is_some()
    }

    pub fn get_revision(&self, id: &ComponentId) -> Option<&str> {
        self.get(id).map(|e| e.git_sha.as_str())
    }

    pub fn get_patch(&self, id: &ComponentId) -> Option<&str> {
        self.get(id).and_then(|e| e.patch.as_deref())
    }

    /// Upsert an entry and add `owner` to its `installed_by`
    pub fn update(&mut self, id: &ComponentId, revision: &str, branch: &str, owner: &Owner) {
        let entry = self
            .repos
            .entry(id.remote.clone())
            .or_default()
            .kind_mut(id.kind)
            .entry(id.org.clone())
            .or_default()
            .entry(id.name.clone())
            .or_insert_with(|| Entry::new(revision, branch));
        entry.git_sha = revision.to_string();
        entry.branch = branch.to_string();
        entry.installed_by.insert(owner.as_edge().to_string());
    }

    /// Move an existing entry to another revision, leaving its edges alone
    pub fn set_revision(&mut self, id: &ComponentId, revision: &str, branch: &str) -> bool {
        match self.get_mut(id) {
            Some(entry) => {
                entry.git_sha = revision.to_string();
                entry.branch = branch.to_string();
                true
            }
            None => false,
        }
    }

    /// Replace an entry wholesale, keeping the union of the old and new `installed_by`
    pub fn replace(&mut self, id: &ComponentId, mut entry: Entry) {
        if let Some(old) = self.get(id) {
            entry.installed_by.extend(old.installed_by.iter().cloned());
        }
        self.repos
            .entry(id.remote.clone())
            .or_default()
            .kind_mut(id.kind)
            .entry(id.org.clone())
            .or_default()
            .insert(id.name.clone(), entry);
    }

    /// Add an ownership edge to an existing entry; false if there is no entry
    pub fn add_owner(&mut self, id: &ComponentId, owner: &Owner) -> bool {
        match self.get_mut(id) {
            Some(entry) => {
                entry.installed_by.insert(owner.as_edge().to_string());
                true
            }
            None => false,
        }
    }

    /// Drop one `installed_by` edge
    ///
    /// Returns true when no edges remain and the entry itself should go.
    pub fn remove_edge(&mut self, id: &ComponentId, owner: &Owner) -> bool {
        match self.get_mut(id) {
            Some(entry) => {
                entry.installed_by.remove(owner.as_edge());
                entry.installed_by.is_empty()
            }
            None => true,
        }
    }

    /// Remove an entry, pruning maps left empty
    pub fn remove_entry(&mut self, id: &ComponentId) -> Option<Entry> {
        let repo = self.repos.get_mut(&id.remote)?;
        let orgs = repo.kind_mut(id.kind);
        let names = orgs.get_mut(&id.org)?;
        let removed = names.remove(&id.name);
        if names.is_empty() {
            orgs.remove(&id.org);
        }
        if repo.is_empty() {
            self.repos.remove(&id.remote);
        }
        removed
    }

    pub fn set_patch(&mut self, id: &ComponentId, patch_path: impl Into<String>) -> bool {
        match self.get_mut(id) {
            Some(entry) => {
                entry.patch = Some(patch_path.into());
                true
            }
            None => false,
        }
    }

    pub fn clear_patch(&mut self, id: &ComponentId) -> Option<String> {
        self.get_mut(id).and_then(|e| e.patch.take())
    }

    /// Every component whose `installed_by` names `id`
    pub fn dependents(&self, id: &ComponentId) -> Vec<ComponentId> {
        self.iter()
            .filter(|(_, entry)| entry.installed_by.contains(&id.name))
            .map(|(dep, _)| dep)
            .collect()
    }

    /// All entries in (remote, kind, org, name) order
    pub fn iter(&self) -> impl Iterator<Item = (ComponentId, &Entry)> {
        self.repos.iter().flat_map(|(url, repo)| {
            ComponentKind::ALL.into_iter().flat_map(move |kind| {
                repo.kind(kind).iter().flat_map(move |(org, names)| {
                    names.iter().map(move |(name, entry)| {
                        (
                            ComponentId {
                                remote: url.clone(),
                                kind,
                                org: org.clone(),
                                name: name.clone(),
                            },
                            entry,
                        )
                    })
                })
            })
        })
    }

    /// Entries of one kind
    pub fn of_kind(&self, kind: ComponentKind) -> impl Iterator<Item = (ComponentId, &Entry)> {
        self.iter().filter(move |(id, _)| id.kind == kind)
    }

    /// Identity of an installed component found by kind, org and name alone
    pub fn find(&self, kind: ComponentKind, org: &str, name: &str) -> Vec<ComponentId> {
        self.iter()
            .filter(|(id, _)| id.kind == kind && id.org == org && id.name == name)
            .map(|(id, _)| id)
            .collect()
    }

    /// Remotes other than `url` with components under `org`
    pub fn remotes_using_org(&self, org: &str, except_url: &str) -> Vec<String> {
        self.repos
            .iter()
            .filter(|(url, _)| url.as_str() != except_url)
            .filter(|(_, repo)| {
                ComponentKind::ALL
                    .into_iter()
                    .any(|kind| repo.kind(kind).contains_key(org))
            })
            .map(|(url, _)| url.clone())
            .collect()
    }

    /// The remote whose components live under `org`, if any
    pub fn remote_for_org(&self, org: &str) -> Option<String> {
        self.remotes_using_org(org, "").into_iter().next()
    }

    /// First remote in manifest order
    pub fn first_remote(&self) -> Option<&str> {
        self.repos.keys().next().map(String::as_str)
    }

    /// Every org path used by any remote
    pub fn orgs(&self, kind: ComponentKind) -> BTreeSet<String> {
        self.repos
            .values()
            .flat_map(|repo| repo.kind(kind).keys().cloned())
            .collect()
    }
}
