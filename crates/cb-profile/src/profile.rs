//! Content blocking profile: one filter list and its lifecycle.
//!
//! A profile owns the compiled index of its list and publishes it behind an
//! `Arc`. Loading and updating build a complete new index and swap it in, so
//! queries never see a half-built rule set and a failed update leaves the
//! previous one in place.
//!
//! # Lifecycle
//!
//! ```text
//! Unloaded --load_rules--> Loaded | ReadError
//! Loaded --download_rules--> Updating --> Loaded | DownloadError | ChecksumError
//! any --clear--> Unloaded
//! any --remove--> Removed (downloads cancelled, stored list deleted)
//! ```

use std::sync::{Arc, Weak};
use std::time::{Instant, SystemTime};

use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast;
use tokio::task::AbortHandle;

use cb_compiler::{compile_filter_list, looks_like_filter_list, verify_checksum, CompiledList, ListHeader};
use cb_core::{CosmeticFilters, FilterIndex, HidingMode, MatchResult, ResourceType};

use crate::error::{FetchError, LoadError, ProfileError, StorageError};
use crate::fetch::RuleFetcher;
use crate::settings::{ProfileCategory, ProfileFlags, ProfileSettings};
use crate::storage::RuleStorage;

const EVENT_CAPACITY: usize = 16;

/// Notification about a profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileEvent {
    /// Rules or settings changed.
    Modified { profile: String },
    /// An update finished without replacing the rules.
    UpdateFailed { profile: String, error: ProfileError },
}

/// Owned copy of the selectors for a page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CosmeticSelectors {
    pub generic: Vec<String>,
    pub domain: Vec<String>,
}

impl From<CosmeticFilters<'_>> for CosmeticSelectors {
    fn from(filters: CosmeticFilters<'_>) -> Self {
        Self {
            generic: filters.generic.into_iter().map(str::to_string).collect(),
            domain: filters.domain.into_iter().map(str::to_string).collect(),
        }
    }
}

#[derive(Debug, Default)]
struct State {
    error: ProfileError,
    is_updating: bool,
    was_loaded: bool,
    removed: bool,
    download: Option<AbortHandle>,
}

struct Inner {
    settings: RwLock<ProfileSettings>,
    index: RwLock<Option<Arc<FilterIndex>>>,
    state: Mutex<State>,
    storage: Arc<dyn RuleStorage>,
    events: broadcast::Sender<ProfileEvent>,
}

/// One filter list, its settings and its published rule index.
///
/// Queries ([`check_url`](Self::check_url),
/// [`get_cosmetic_filters`](Self::get_cosmetic_filters)) never perform I/O;
/// before [`load_rules`](Self::load_rules) succeeds they match nothing.
pub struct ContentBlockingProfile {
    inner: Arc<Inner>,
}

impl ContentBlockingProfile {
    pub fn new(settings: ProfileSettings, storage: Arc<dyn RuleStorage>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                settings: RwLock::new(settings),
                index: RwLock::new(None),
                state: Mutex::new(State::default()),
                storage,
                events,
            }),
        }
    }

    // =========================================================================
    // Settings
    // =========================================================================

    pub fn name(&self) -> String {
        self.inner.settings.read().name.clone()
    }

    pub fn title(&self) -> String {
        self.inner.settings.read().display_title().to_string()
    }

    pub fn update_url(&self) -> Option<String> {
        self.inner.settings.read().update_url.clone()
    }

    pub fn update_interval(&self) -> u32 {
        self.inner.settings.read().update_interval
    }

    pub fn category(&self) -> ProfileCategory {
        self.inner.settings.read().category
    }

    pub fn languages(&self) -> Vec<String> {
        self.inner.settings.read().languages.clone()
    }

    pub fn last_update(&self) -> Option<SystemTime> {
        self.inner.settings.read().last_update
    }

    pub fn flags(&self) -> ProfileFlags {
        self.inner.settings.read().flags
    }

    /// Snapshot of the settings, for persisting the profile listing.
    pub fn settings(&self) -> ProfileSettings {
        self.inner.settings.read().clone()
    }

    pub fn set_title(&self, title: impl Into<String>) {
        self.update_settings(|settings| {
            settings.title = title.into();
            settings.flags |= ProfileFlags::HAS_CUSTOM_TITLE;
        });
    }

    pub fn set_update_url(&self, url: Option<String>) {
        self.update_settings(|settings| {
            settings.update_url = url;
            settings.flags |= ProfileFlags::HAS_CUSTOM_UPDATE_URL;
        });
    }

    pub fn set_update_interval(&self, days: u32) {
        self.update_settings(|settings| settings.update_interval = days);
    }

    pub fn set_category(&self, category: ProfileCategory) {
        self.update_settings(|settings| settings.category = category);
    }

    fn update_settings(&self, change: impl FnOnce(&mut ProfileSettings)) {
        let changed = {
            let mut settings = self.inner.settings.write();
            let before = settings.clone();
            change(&mut settings);
            *settings != before
        };
        if changed {
            self.inner.emit_modified();
        }
    }

    /// Whether a scheduled update should run at `now`.
    pub fn is_update_due(&self, now: SystemTime) -> bool {
        self.inner.settings.read().is_update_due(now)
    }

    // =========================================================================
    // State
    // =========================================================================

    pub fn error(&self) -> ProfileError {
        self.inner.state.lock().error
    }

    pub fn is_updating(&self) -> bool {
        self.inner.state.lock().is_updating
    }

    pub fn was_loaded(&self) -> bool {
        self.inner.state.lock().was_loaded
    }

    /// No rules are published, or the published list holds none.
    pub fn is_empty(&self) -> bool {
        self.index().map_or(true, |index| index.is_empty())
    }

    /// The currently published index.
    pub fn index(&self) -> Option<Arc<FilterIndex>> {
        self.inner.index.read().clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProfileEvent> {
        self.inner.events.subscribe()
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn check_url(&self, base_url: &str, request_url: &str, resource_type: ResourceType) -> MatchResult {
        match self.index() {
            Some(index) => index.check_url(base_url, request_url, resource_type),
            None => MatchResult::default(),
        }
    }

    pub fn check_page_hiding(&self, page_url: &str) -> HidingMode {
        match self.index() {
            Some(index) => index.check_page_hiding(page_url),
            None => HidingMode::All,
        }
    }

    pub fn get_cosmetic_filters<S: AsRef<str>>(&self, domains: &[S], is_domain_only: bool) -> CosmeticSelectors {
        match self.index() {
            Some(index) => index.get_cosmetic_filters(domains, is_domain_only).into(),
            None => CosmeticSelectors::default(),
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Read the stored list and publish its rules.
    ///
    /// On failure the error state becomes [`ProfileError::ReadError`] and
    /// whatever was published before stays in place.
    pub fn load_rules(&self) -> Result<(), LoadError> {
        let name = self.name();
        let started = Instant::now();
        self.inner.state.lock().was_loaded = true;

        let result = self
            .inner
            .storage
            .read(&name)
            .map_err(LoadError::from)
            .and_then(|bytes| {
                let text = String::from_utf8(bytes).map_err(|_| LoadError::NotUtf8)?;
                if !looks_like_filter_list(&text) {
                    return Err(LoadError::NotFilterList);
                }
                Ok(compile_filter_list(&text))
            });

        match result {
            Ok(compiled) => {
                log::debug!("loaded profile {name:?} in {:?}", started.elapsed());
                self.inner.apply_header(&compiled.header);
                self.inner.state.lock().error = ProfileError::NoError;
                self.inner.install(compiled);
                self.inner.emit_modified();
                Ok(())
            }
            Err(err) => {
                log::warn!("failed to load profile {name:?}: {err}");
                self.inner.state.lock().error = ProfileError::ReadError;
                Err(err)
            }
        }
    }

    /// Start downloading the list from its update URL.
    ///
    /// Returns `false` without doing anything if a download is already in
    /// flight, the profile has no update URL, it was removed, or there is no
    /// tokio runtime to run the download on. The outcome is reported through
    /// [`error`](Self::error) and [`subscribe`](Self::subscribe).
    pub fn download_rules(&self, fetcher: Arc<dyn RuleFetcher>) -> bool {
        let Some(url) = self.update_url() else {
            log::debug!("profile {:?} has no update URL", self.name());
            return false;
        };

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            log::warn!("cannot update profile {:?} outside a tokio runtime", self.name());
            return false;
        };

        let mut state = self.inner.state.lock();
        if state.is_updating || state.removed {
            return false;
        }
        state.is_updating = true;

        log::info!("updating profile {:?} from {url}", self.name());

        let weak = Arc::downgrade(&self.inner);
        let task = runtime.spawn(async move {
            let fetched = fetcher.fetch(&url).await;
            complete_download(weak, fetched).await;
        });
        state.download = Some(task.abort_handle());

        true
    }

    /// Drop the published rules and return to the unloaded state.
    pub fn clear(&self) {
        self.inner.reset(&mut self.inner.state.lock());
        self.inner.emit_modified();
    }

    /// Cancel any download, delete the stored list and clear the rules.
    ///
    /// A download finishing after this point is ignored. One that is already
    /// storing its result completes first and is then removed with the rest.
    pub fn remove(&self) -> Result<(), StorageError> {
        let result = {
            let mut state = self.inner.state.lock();
            state.removed = true;
            state.is_updating = false;
            if let Some(download) = state.download.take() {
                download.abort();
            }

            let name = self.name();
            let result = self.inner.storage.remove(&name);
            if let Err(err) = &result {
                log::warn!("failed to remove stored list of profile {name:?}: {err}");
            }

            self.inner.reset(&mut state);
            result
        };

        self.inner.emit_modified();
        result
    }
}

impl Drop for ContentBlockingProfile {
    fn drop(&mut self) {
        if let Some(download) = self.inner.state.lock().download.take() {
            download.abort();
        }
    }
}

impl std::fmt::Debug for ContentBlockingProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("ContentBlockingProfile")
            .field("name", &self.inner.settings.read().name)
            .field("error", &state.error)
            .field("is_updating", &state.is_updating)
            .field("was_loaded", &state.was_loaded)
            .finish()
    }
}

impl Inner {
    fn name(&self) -> String {
        self.settings.read().name.clone()
    }

    fn emit(&self, event: ProfileEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    fn emit_modified(&self) {
        self.emit(ProfileEvent::Modified { profile: self.name() });
    }

    /// Take title and update interval from the list header.
    fn apply_header(&self, header: &ListHeader) {
        let mut settings = self.settings.write();
        if let Some(title) = &header.title {
            if !settings.flags.contains(ProfileFlags::HAS_CUSTOM_TITLE) {
                settings.title = title.clone();
            }
        }
        if let Some(days) = header.expires_days() {
            settings.update_interval = days;
        }
    }

    /// Swap in a newly compiled index.
    fn install(&self, compiled: CompiledList) {
        let stats = compiled.stats;
        *self.index.write() = Some(Arc::new(compiled.index));
        log::info!(
            "published profile {:?}: {} network rules, {} cosmetic rules, {} lines dropped",
            self.name(),
            stats.optimize.after,
            stats.parse.cosmetic_rules - stats.cosmetic_deduped,
            stats.parse.dropped
        );
    }

    /// Back to the unloaded state. Caller holds the state lock.
    fn reset(&self, state: &mut State) {
        if self.index.write().take().is_some() {
            log::debug!("cleared profile {:?}", self.name());
        }
        state.was_loaded = false;
        state.error = ProfileError::NoError;
    }

    fn finish_download(&self, outcome: Result<(String, CompiledList), LoadError>) {
        let mut state = self.state.lock();
        state.is_updating = false;
        state.download = None;

        if state.removed {
            log::debug!("ignoring download for removed profile {:?}", self.name());
            return;
        }

        match outcome {
            Ok((text, compiled)) => {
                // Stored and published under the state lock so remove() cannot interleave
                let name = self.name();
                if let Err(err) = self.storage.write(&name, &text) {
                    log::warn!("failed to store update of profile {name:?}: {err}");
                }

                self.apply_header(&compiled.header);
                self.settings.write().last_update = Some(SystemTime::now());
                self.install(compiled);
                state.error = ProfileError::NoError;
                state.was_loaded = true;
                drop(state);

                self.emit_modified();
            }
            Err(err) => {
                let error = err.profile_error();
                state.error = error;
                drop(state);

                let profile = self.name();
                log::warn!("failed to update profile {profile:?}: {err}");
                self.emit(ProfileEvent::UpdateFailed { profile, error });
            }
        }
    }
}

async fn complete_download(inner: Weak<Inner>, fetched: Result<Vec<u8>, FetchError>) {
    let outcome = match fetched {
        Ok(bytes) => match tokio::task::spawn_blocking(move || compile_download(bytes)).await {
            Ok(result) => result,
            Err(err) => Err(LoadError::Join(err)),
        },
        Err(err) => Err(LoadError::Fetch(err)),
    };

    match inner.upgrade() {
        Some(inner) => inner.finish_download(outcome),
        None => log::debug!("profile dropped before its download finished"),
    }
}

fn compile_download(bytes: Vec<u8>) -> Result<(String, CompiledList), LoadError> {
    let text = String::from_utf8(bytes).map_err(|_| LoadError::NotUtf8)?;
    if !looks_like_filter_list(&text) {
        return Err(LoadError::NotFilterList);
    }
    if let Some(err) = LoadError::from_checksum(verify_checksum(&text)) {
        return Err(err);
    }

    let compiled = compile_filter_list(&text);
    Ok((text, compiled))
}
