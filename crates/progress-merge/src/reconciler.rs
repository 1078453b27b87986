//! Local-to-remote merge on entry into the authenticated state.

use crate::client::{ProfileStore, RemoteOnboarding, RemoteWeeklyUsage};
use crate::MergeResult;
use auth_lifecycle::{AuthController, AuthState};
use progress_store::ProgressManager;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

/// What one merge run accomplished. Step failures are counted, never
/// propagated; failed steps keep their local records so the next process
/// run retries them.
#[derive(Debug, Default, Clone, Copy)]
pub struct MergeReport {
    pub onboarding: bool,
    pub weekly: bool,
    pub first_story: bool,
    pub failures: u32,
}

struct Inner {
    profile: Arc<dyn ProfileStore>,
    progress: Arc<ProgressManager>,
    // Identities merged during this process run. Claimed before the merge
    // task spawns, so a burst of authenticated transitions merges once.
    merged: Mutex<HashSet<String>>,
}

/// Pushes anonymous local progress into the remote profile when the user
/// becomes authenticated, at most once per identity per process run.
#[derive(Clone)]
pub struct MergeReconciler {
    inner: Arc<Inner>,
}

impl MergeReconciler {
    pub fn new(profile: Arc<dyn ProfileStore>, progress: Arc<ProgressManager>) -> Self {
        Self {
            inner: Arc::new(Inner {
                profile,
                progress,
                merged: Mutex::new(HashSet::new()),
            }),
        }
    }

    /// Listen for entries into `Authenticated` and kick off merges.
    ///
    /// The merge itself runs on a spawned task; the transition feed is
    /// never blocked on profile API calls.
    pub fn attach(&self, controller: &AuthController) {
        let this = self.clone();
        let weak = controller.downgrade();
        controller.on_transition(Box::new(move |t| {
            if t.to != AuthState::Authenticated || t.from == AuthState::Authenticated {
                return;
            }
            let Some(identity) = &t.identity else {
                return;
            };
            let Some(controller) = weak.upgrade() else {
                return;
            };
            let Some(session) = controller.snapshot().session else {
                return;
            };
            if !this.inner.progress.has_any_progress() {
                return;
            }
            if !this.claim(&identity.id) {
                tracing::debug!(user_id = %identity.id, "Progress already merged for identity");
                return;
            }

            let this = this.clone();
            let user_id = identity.id.clone();
            tokio::spawn(async move {
                let report = this.merge_for(&user_id, &session.access_token).await;
                tracing::info!(
                    user_id = %user_id,
                    onboarding = report.onboarding,
                    weekly = report.weekly,
                    first_story = report.first_story,
                    failures = report.failures,
                    "Progress merge finished"
                );
            });
        }));
    }

    fn claim(&self, user_id: &str) -> bool {
        self.inner.merged.lock().unwrap().insert(user_id.to_string())
    }

    /// Merge every local record into the remote profile. Each record type
    /// is attempted independently.
    pub async fn merge_for(&self, user_id: &str, access_token: &str) -> MergeReport {
        let mut report = MergeReport::default();

        match self.merge_onboarding(user_id, access_token).await {
            Ok(merged) => report.onboarding = merged,
            Err(e) => {
                report.failures += 1;
                tracing::warn!(user_id = %user_id, error = %e, "Onboarding merge failed");
            }
        }

        match self.merge_weekly(user_id, access_token).await {
            Ok(merged) => report.weekly = merged,
            Err(e) => {
                report.failures += 1;
                tracing::warn!(user_id = %user_id, error = %e, "Weekly usage merge failed");
            }
        }

        match self.merge_first_story(user_id, access_token).await {
            Ok(merged) => report.first_story = merged,
            Err(e) => {
                report.failures += 1;
                tracing::warn!(user_id = %user_id, error = %e, "Milestone merge failed");
            }
        }

        report
    }

    // Onboarding merges monotonically: the remote step never decreases and
    // completion never reverts.
    async fn merge_onboarding(&self, user_id: &str, access_token: &str) -> MergeResult<bool> {
        let Some(local) = self.inner.progress.get_onboarding()? else {
            return Ok(false);
        };

        let remote = self.inner.profile.fetch_onboarding(access_token, user_id).await?;
        let target = match &remote {
            Some(r) => RemoteOnboarding {
                step: r.step.max(local.step),
                completed: r.completed || local.completed,
            },
            None => RemoteOnboarding {
                step: local.step,
                completed: local.completed,
            },
        };

        if remote.as_ref() != Some(&target) {
            self.inner
                .profile
                .upsert_onboarding(access_token, user_id, &target)
                .await?;
        }

        self.inner.progress.delete_onboarding()?;
        Ok(true)
    }

    // Build counts for the same week add together; different weeks leave
    // the remote rows alone and write the local week as its own row.
    async fn merge_weekly(&self, user_id: &str, access_token: &str) -> MergeResult<bool> {
        let Some(local) = self.inner.progress.get_weekly_usage()? else {
            return Ok(false);
        };

        let remote = self
            .inner
            .profile
            .fetch_weekly_usage(access_token, user_id, &local.week_start)
            .await?;
        let target = match remote {
            Some(r) => RemoteWeeklyUsage {
                week_start: local.week_start.clone(),
                builds_this_week: r.builds_this_week + local.builds_this_week,
                last_build_at: r.last_build_at.max(local.last_build_at),
            },
            None => RemoteWeeklyUsage {
                week_start: local.week_start.clone(),
                builds_this_week: local.builds_this_week,
                last_build_at: local.last_build_at,
            },
        };

        self.inner
            .profile
            .upsert_weekly_usage(access_token, user_id, &target)
            .await?;
        self.inner.progress.delete_weekly_usage()?;
        Ok(true)
    }

    async fn merge_first_story(&self, user_id: &str, access_token: &str) -> MergeResult<bool> {
        if !self.inner.progress.has_first_story()? {
            return Ok(false);
        }

        self.inner.profile.set_first_story(access_token, user_id).await?;
        self.inner.progress.delete_first_story()?;
        Ok(true)
    }
}
