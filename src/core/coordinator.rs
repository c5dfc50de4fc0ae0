//! Store lifecycle coordinator.
//!
//! The coordinator is the only component that attaches or detaches the live
//! store. Every transition that replaces the attached store runs in two
//! phases: an announcement published synchronously to subscribers, then a
//! commit queued on the [`WorkQueue`] behind whatever the subscribers
//! deferred. The switch token is bumped as the last step of every committed
//! transition.
//!
//! At most one store is attached at any instant; the backend refuses a
//! second attach, and every path here detaches before attaching.

use crate::core::db::{DataContext, MergePolicy, SqliteBackend, StorageBackend};
use crate::core::error::ProfileError;
use crate::core::events::{EventBus, Handler, LifecycleEvent, SubscriptionId, SwitchToken};
use crate::core::journal::Journal;
use crate::core::profile::{ProfileInfo, ProfileMetadata};
use crate::core::queue::{Task, WorkQueue};
use crate::core::store::{Layout, StoreLocation};
use crate::core::time;
use crate::plugins::prefs::{self, LAST_PROFILE_ID_KEY, Preferences};
use crate::plugins::secrets::{SecretStore, SecretVault, SqliteVault};
use crate::plugins::{archive, purge, registry};
use serde_json::Value;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Removal {
    Archive,
    Delete,
}

impl Removal {
    fn op(self) -> &'static str {
        match self {
            Removal::Archive => "profile.archive",
            Removal::Delete => "profile.delete",
        }
    }
}

#[derive(Debug)]
enum Transition {
    CommitSwitch(ProfileInfo),
    DetachToMemory,
    Relocate(ProfileInfo),
    Purge(ProfileInfo),
    Finalize {
        removed: ProfileInfo,
        was_current: bool,
        removal: Removal,
    },
}

pub struct Coordinator<B: StorageBackend, V: SecretVault> {
    layout: Layout,
    data: DataContext<B>,
    secrets: SecretStore<V>,
    prefs: Preferences,
    journal: Journal,
    roster: Vec<ProfileInfo>,
    current: ProfileInfo,
    default_profile: ProfileInfo,
    token: SwitchToken,
    bus: EventBus,
    queue: WorkQueue<Transition>,
    last_archive: Option<PathBuf>,
}

impl Coordinator<SqliteBackend, SqliteVault> {
    /// Opens the data root with the SQLite store backend and vault.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, ProfileError> {
        let layout = Layout::open(root)?;
        let vault = SqliteVault::open(&layout.vault_path())?;
        Self::new(layout, SqliteBackend::new(), vault)
    }
}

impl<B: StorageBackend, V: SecretVault> Coordinator<B, V> {
    /// Enumerates the roster and resolves the initial profile. Nothing is
    /// attached until [`Coordinator::bootstrap`].
    pub fn new(layout: Layout, backend: B, vault: V) -> Result<Self, ProfileError> {
        let prefs = Preferences::load(&layout.preferences_path())?;
        let roster = registry::enumerate(&layout.profiles_dir())?;
        let default_profile = ProfileInfo::new(
            layout.config.default_profile.id.clone(),
            layout.config.default_profile.display_name.clone(),
        );
        let current = registry::resolve_initial(
            &roster,
            prefs.get_str(LAST_PROFILE_ID_KEY),
            &default_profile,
        );
        log::info!(
            "found {} profile(s) under {}; starting with {} ({})",
            roster.len(),
            layout.profiles_dir().display(),
            current.display_name,
            current.id
        );
        let secrets = SecretStore::new(vault, &layout.config.service);
        let journal = Journal::new(&layout.journal_path());
        Ok(Self {
            layout,
            data: DataContext::new(backend),
            secrets,
            prefs,
            journal,
            roster,
            current,
            default_profile,
            token: SwitchToken::default(),
            bus: EventBus::new(),
            queue: WorkQueue::new(),
            last_archive: None,
        })
    }

    // --- Read side ---

    pub fn list_profiles(&self) -> &[ProfileInfo] {
        &self.roster
    }

    pub fn has_profiles(&self) -> bool {
        !self.roster.is_empty()
    }

    pub fn current_profile(&self) -> &ProfileInfo {
        &self.current
    }

    pub fn default_profile(&self) -> &ProfileInfo {
        &self.default_profile
    }

    pub fn switch_token(&self) -> SwitchToken {
        self.token
    }

    pub fn attached(&self) -> Option<&StoreLocation> {
        self.data.attached()
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    pub fn preferences(&self) -> &Preferences {
        &self.prefs
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    /// Where the most recent archive moved a profile folder, if anywhere.
    pub fn last_archive(&self) -> Option<&PathBuf> {
        self.last_archive.as_ref()
    }

    pub fn find_profile(&self, id: &str) -> Result<ProfileInfo, ProfileError> {
        self.roster
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or_else(|| ProfileError::NotFound(format!("profile {}", id)))
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    // --- Subscriptions ---

    pub fn subscribe(&mut self, handler: Handler) -> SubscriptionId {
        self.bus.subscribe(handler)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.bus.unsubscribe(id)
    }

    fn publish(&mut self, event: LifecycleEvent) {
        let scheduler = self.queue.scheduler();
        self.bus.publish(&event, &scheduler);
    }

    fn bump_token(&mut self) {
        self.token = self.token.next();
        let event = LifecycleEvent::Invalidated {
            current: self.current.clone(),
            token: self.token,
        };
        self.publish(event);
    }

    // --- Transitions ---

    /// Attaches the initial profile's store. Call once at startup, before
    /// anything reads through [`Coordinator::data`].
    pub fn bootstrap(&mut self) -> Result<(), ProfileError> {
        let initial = self.current.clone();
        self.bootstrap_with(initial)
    }

    pub fn bootstrap_with(&mut self, initial: ProfileInfo) -> Result<(), ProfileError> {
        let known = self.roster.iter().any(|p| p.id == initial.id);
        let result = self.data.detach().and_then(|_| {
            if known {
                self.layout.ensure_profile_folders(&initial.id)?;
                self.data.attach(&self.layout.store_location(&initial.id))
            } else {
                // Nothing on disk yet; stay valid without creating persistence.
                self.data.attach(&StoreLocation::InMemory)
            }
        });
        if let Err(e) = result {
            log::error!("bootstrap of {} failed: {}", initial.id, e);
            self.journal
                .note("profile.bootstrap", &initial.id, "error", Some(&e.to_string()));
            return Err(e);
        }
        self.data.configure(MergePolicy::default());
        log::info!(
            "bootstrapped {} ({}) at {}",
            initial.display_name,
            initial.id,
            self.data
                .attached()
                .map(|l| l.to_string())
                .unwrap_or_default()
        );
        self.current = initial;
        self.journal
            .note("profile.bootstrap", &self.current.id, "success", None);
        Ok(())
    }

    /// Announces a switch to `target` and queues the commit without running it.
    pub fn submit_switch(&mut self, target: &ProfileInfo) -> Result<(), ProfileError> {
        let target = self.find_profile(&target.id)?;
        let event = LifecycleEvent::WillSwitch {
            from: self.current.clone(),
            to: target.clone(),
        };
        self.publish(event);
        self.queue.submit(Transition::CommitSwitch(target));
        Ok(())
    }

    pub fn switch_to(&mut self, target: &ProfileInfo) -> Result<(), ProfileError> {
        self.submit_switch(target)?;
        self.run_pending()
    }

    /// Runs queued work in order. A failed transition discards the
    /// transitions queued after it; the first error is returned.
    pub fn run_pending(&mut self) -> Result<(), ProfileError> {
        let mut first_err = None;
        while let Some(task) = self.queue.pop() {
            match task {
                Task::External(job) => job(),
                Task::Transition(transition) => {
                    if let Err(e) = self.apply(transition) {
                        let dropped = self.queue.discard_transitions();
                        if dropped > 0 {
                            log::warn!("discarded {} queued transition step(s)", dropped);
                        }
                        if first_err.is_none() {
                            first_err = Some(e);
                        }
                    }
                }
            }
        }
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn apply(&mut self, transition: Transition) -> Result<(), ProfileError> {
        log::debug!("applying {:?}", transition);
        match transition {
            Transition::CommitSwitch(target) => self.commit_switch(target),
            Transition::DetachToMemory => {
                self.data.detach()?;
                self.data.attach(&StoreLocation::InMemory)?;
                self.data.reset();
                Ok(())
            }
            Transition::Relocate(profile) => {
                self.last_archive = archive::archive(&self.layout, &profile)?;
                Ok(())
            }
            Transition::Purge(profile) => {
                let report = purge::purge(&mut self.data, &self.layout, &profile)?;
                if !report.residual.is_empty() {
                    self.journal.note(
                        "profile.purge",
                        &profile.id,
                        "partial",
                        Some(&format!("{} residual file(s)", report.residual.len())),
                    );
                }
                self.secrets.delete(&profile.id)
            }
            Transition::Finalize {
                removed,
                was_current,
                removal,
            } => self.finalize_removal(removed, was_current, removal),
        }
    }

    fn commit_switch(&mut self, target: ProfileInfo) -> Result<(), ProfileError> {
        // `current` moves before the attach; a failed attach leaves it
        // naming a profile whose store is not attached.
        self.current = target.clone();
        let attached = self
            .layout
            .ensure_profile_folders(&target.id)
            .and_then(|_| self.data.detach())
            .and_then(|_| self.data.attach(&self.layout.store_location(&target.id)));
        if let Err(e) = attached {
            log::error!("profile switch to {} failed: {}", target.id, e);
            self.journal
                .note("profile.switch", &target.id, "error", Some(&e.to_string()));
            return Err(e);
        }
        self.data.configure(MergePolicy::default());
        log::info!(
            "switched to profile {} -> {}",
            target.display_name,
            self.layout.store_path(&target.id).display()
        );

        self.prefs
            .set(LAST_PROFILE_ID_KEY, Value::String(target.id.clone()))?;
        self.data.reset();
        self.journal
            .note("profile.switch", &target.id, "success", None);
        self.bump_token();
        Ok(())
    }

    fn submit_removal(&mut self, target: &ProfileInfo, removal: Removal) -> Result<(), ProfileError> {
        let target = self.find_profile(&target.id)?;
        let was_current = self.current.id == target.id;
        if was_current {
            self.publish(LifecycleEvent::WillDelete {
                profile: target.clone(),
            });
            let next = self.roster.iter().find(|p| p.id != target.id).cloned();
            match next {
                Some(next) => self.submit_switch(&next)?,
                None => self.queue.submit(Transition::DetachToMemory),
            }
        }
        self.queue.submit(match removal {
            Removal::Archive => Transition::Relocate(target.clone()),
            Removal::Delete => Transition::Purge(target.clone()),
        });
        self.queue.submit(Transition::Finalize {
            removed: target,
            was_current,
            removal,
        });
        Ok(())
    }

    fn finalize_removal(
        &mut self,
        removed: ProfileInfo,
        was_current: bool,
        removal: Removal,
    ) -> Result<(), ProfileError> {
        self.roster.retain(|p| p.id != removed.id);
        if was_current {
            match self.roster.first().cloned() {
                Some(first) => {
                    self.prefs
                        .set(LAST_PROFILE_ID_KEY, Value::String(first.id.clone()))?;
                    self.current = first;
                }
                None => {
                    self.prefs.remove(LAST_PROFILE_ID_KEY)?;
                    self.current = self.default_profile.clone();
                }
            }
        }
        log::info!(
            "{} {} ({}); current is now {}",
            match removal {
                Removal::Archive => "archived",
                Removal::Delete => "deleted",
            },
            removed.display_name,
            removed.id,
            self.current.id
        );
        self.journal.note(removal.op(), &removed.id, "success", None);
        self.bump_token();
        Ok(())
    }

    /// Soft-deletes `target`: its folder moves to the archive area and it
    /// leaves the roster. Its secret is kept.
    pub fn archive_profile(&mut self, target: &ProfileInfo) -> Result<(), ProfileError> {
        self.last_archive = None;
        self.submit_removal(target, Removal::Archive)?;
        self.run_pending()
    }

    /// Hard-deletes `target`: its store is destroyed and its secret removed.
    pub fn delete_profile(&mut self, target: &ProfileInfo) -> Result<(), ProfileError> {
        self.submit_removal(target, Removal::Delete)?;
        self.run_pending()
    }

    /// Creates a profile named `name` and makes it live.
    pub fn create_profile(&mut self, name: &str) -> Result<ProfileInfo, ProfileError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ProfileError::InvalidName(name.to_string()));
        }
        let profile = ProfileInfo::new(time::new_profile_id(), name);
        let folder = self.layout.ensure_profile_folders(&profile.id)?;
        registry::write_metadata(&folder, &ProfileMetadata::for_profile(&profile, time::now()))?;
        self.roster.push(profile.clone());
        self.prefs
            .set(LAST_PROFILE_ID_KEY, Value::String(profile.id.clone()))?;
        self.journal
            .note("profile.create", &profile.id, "success", None);
        log::info!("created profile {} ({})", profile.display_name, profile.id);

        self.switch_to(&profile)?;
        Ok(profile)
    }

    /// Renames the current profile. Storage and secrets are untouched.
    pub fn rename_current(&mut self, new_name: &str) -> Result<(), ProfileError> {
        let name = new_name.trim();
        if name.is_empty() {
            return Err(ProfileError::InvalidName(new_name.to_string()));
        }
        let index = self
            .roster
            .iter()
            .position(|p| p.id == self.current.id)
            .ok_or_else(|| {
                ProfileError::NotFound(format!("current profile {} is not on disk", self.current.id))
            })?;

        let folder = self.layout.profile_dir(&self.current.id);
        let created_at = registry::read_metadata(&folder)
            .map(|m| m.created_at)
            .unwrap_or_else(time::now);
        let renamed = ProfileInfo::new(self.current.id.clone(), name);
        registry::write_metadata(&folder, &ProfileMetadata::for_profile(&renamed, created_at))?;

        self.roster[index] = renamed.clone();
        self.current = renamed;
        self.journal
            .note("profile.rename", &self.current.id, "success", Some(name));
        self.bump_token();
        Ok(())
    }

    // --- Secrets ---

    pub fn set_password(&self, profile: &ProfileInfo, password: &str) -> Result<(), ProfileError> {
        self.secrets.set(password.as_bytes(), &profile.id)
    }

    pub fn verify_password(&self, profile: &ProfileInfo, candidate: &str) -> Result<bool, ProfileError> {
        self.secrets.verify(candidate.as_bytes(), &profile.id)
    }

    pub fn clear_password(&self, profile: &ProfileInfo) -> Result<(), ProfileError> {
        self.secrets.delete(&profile.id)
    }

    pub fn password_exists(&self, profile: &ProfileInfo) -> Result<bool, ProfileError> {
        self.secrets.exists(&profile.id)
    }

    pub fn secrets(&self) -> &SecretStore<V> {
        &self.secrets
    }

    // --- Preferences ---

    /// Key for `raw` scoped to `profile`, or to the current profile.
    pub fn namespaced_key(&self, raw: &str, profile: Option<&ProfileInfo>) -> String {
        let profile = profile.unwrap_or(&self.current);
        prefs::namespaced_key(raw, &profile.id)
    }

    pub fn profile_pref(&self, raw: &str) -> Option<&Value> {
        self.prefs.get_for(raw, &self.current.id)
    }

    pub fn set_profile_pref(&mut self, raw: &str, value: Value) -> Result<(), ProfileError> {
        let id = self.current.id.clone();
        self.prefs.set_for(raw, &id, value)
    }

    pub fn remove_profile_pref(&mut self, raw: &str) -> Result<bool, ProfileError> {
        let id = self.current.id.clone();
        self.prefs.remove_for(raw, &id)
    }

    pub fn set_global_pref(&mut self, key: &str, value: Value) -> Result<(), ProfileError> {
        self.prefs.set(key, value)
    }

    pub fn remove_global_pref(&mut self, key: &str) -> Result<bool, ProfileError> {
        self.prefs.remove(key)
    }

    // --- Data access ---

    /// The live data-access layer. Reads and writes go through it; attaching
    /// and detaching stay with the coordinator.
    pub fn data(&mut self) -> &mut DataContext<B> {
        &mut self.data
    }

    pub fn data_ref(&self) -> &DataContext<B> {
        &self.data
    }
}
