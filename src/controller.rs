//! The navigation controller: one state machine deciding, for every load
//! attempt, failure and cross-origin transition, what the surfaces do next.
//!
//! The controller is pure: events go in, actions come out, and the Tauri
//! layer (`surfaces.rs`) executes the actions. Callbacks are delivered
//! serially by the host event loop, so a single mutex around the controller
//! is the only synchronization the shell needs.

use url::Url;

use crate::policy::{self, HostClass};

/// Which surface an event originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SurfaceKind {
    Primary,
    Secondary,
}

/// Host-runtime events, normalized away from the webview's callback shapes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// Initial load, manual retry from the fallback page, or menu reload.
    LoadRequested,
    /// A load finished; `soft_failure` carries the interstitial/gateway
    /// marker if the page text matched one.
    LoadFinished { soft_failure: Option<&'static str> },
    /// The load watchdog elapsed while the given load epoch was in flight.
    WatchdogFired { epoch: u64 },
    /// The soft-failure retry delay elapsed.
    RetryElapsed { epoch: u64 },
    /// A surface is about to navigate in-page.
    WillNavigate { surface: SurfaceKind, url: Url },
    /// A page asked to open a new window (popup).
    NewSurfaceRequested { url: Url },
    /// The primary surface was destroyed.
    SurfaceDestroyed,
}

/// What the host layer must do in response to an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Load the URL in the primary surface, creating it if none exists.
    LoadPrimary(Url),
    FocusPrimary,
    /// Let the navigation that triggered the event proceed in-surface.
    AllowNavigation,
    /// Open the URL in the system's default browser.
    OpenExternal(Url),
    /// Create the bounded secondary (auth) surface at the URL.
    SpawnSecondary(Url),
    CloseSecondary,
    /// Fire `Event::RetryElapsed { epoch }` after the fixed delay, unless
    /// the primary surface is gone by then.
    ScheduleRetry { epoch: u64 },
    /// Fire `Event::WatchdogFired { epoch }` after the load timeout.
    StartWatchdog { epoch: u64 },
    /// Replace the primary surface's content with the local fallback page.
    ShowFallback { reason: String },
}

/// {Idle -> Loading -> (LoadedOk | LoadedErrorPage | LoadFailed)}.
/// LoadedErrorPage re-enters Loading after the fixed delay; LoadFailed
/// persists until an explicit reload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Loading,
    LoadedOk,
    LoadedErrorPage,
    LoadFailed,
}

pub struct NavigationController {
    target: Url,
    state: LoadState,
    /// Bumped on every fresh load and on surface destruction; deferred
    /// retries and watchdogs carry the epoch they were scheduled under and
    /// are ignored once it is stale. This is the liveness guard.
    epoch: u64,
}

impl NavigationController {
    pub fn new(target: Url) -> Self {
        Self {
            target,
            state: LoadState::Idle,
            epoch: 0,
        }
    }

    pub fn state(&self) -> LoadState {
        self.state
    }

    pub fn target(&self) -> &Url {
        &self.target
    }

    /// Single transition function. Invoked serially; never re-entered.
    pub fn handle(&mut self, event: Event) -> Vec<Action> {
        match event {
            Event::LoadRequested => self.begin_load(self.target.clone()),

            Event::LoadFinished { soft_failure } => match soft_failure {
                // Single-shot retry per detection: each failed completion
                // schedules independently, there is no cumulative backoff.
                Some(_) if self.state != LoadState::Idle => {
                    self.state = LoadState::LoadedErrorPage;
                    vec![Action::ScheduleRetry { epoch: self.epoch }]
                }
                Some(_) => Vec::new(),
                None => {
                    // The fallback page finishing does not count as a
                    // successful target load.
                    if !matches!(self.state, LoadState::Idle | LoadState::LoadFailed) {
                        self.state = LoadState::LoadedOk;
                    }
                    Vec::new()
                }
            },

            Event::WatchdogFired { epoch } => {
                if self.state == LoadState::Loading && epoch == self.epoch {
                    self.state = LoadState::LoadFailed;
                    vec![Action::ShowFallback {
                        reason: format!(
                            "{} did not respond within {} seconds",
                            self.target,
                            policy::LOAD_TIMEOUT.as_secs()
                        ),
                    }]
                } else {
                    Vec::new()
                }
            }

            Event::RetryElapsed { epoch } => {
                if self.state == LoadState::LoadedErrorPage && epoch == self.epoch {
                    self.begin_load(self.target.clone())
                } else {
                    Vec::new()
                }
            }

            Event::WillNavigate { surface, url } => self.decide_navigation(surface, url),

            Event::NewSurfaceRequested { url } => {
                // Popups to non-web schemes are refused outright; the OS
                // opener only ever sees http(s) URLs.
                if !matches!(url.scheme(), "http" | "https") {
                    return Vec::new();
                }
                match self.class_of(&url) {
                    HostClass::External => vec![Action::OpenExternal(url)],
                    _ => vec![Action::SpawnSecondary(url)],
                }
            }

            Event::SurfaceDestroyed => {
                self.state = LoadState::Idle;
                self.epoch += 1;
                Vec::new()
            }
        }
    }

    fn begin_load(&mut self, url: Url) -> Vec<Action> {
        self.state = LoadState::Loading;
        self.epoch += 1;
        vec![
            Action::LoadPrimary(url),
            Action::StartWatchdog { epoch: self.epoch },
        ]
    }

    fn decide_navigation(&mut self, surface: SurfaceKind, url: Url) -> Vec<Action> {
        // Only the locally served fallback document and about:blank (page
        // teardown) stay in-surface among non-http(s) URLs. Anything else
        // with a non-web scheme is refused and never forwarded to the OS.
        if is_fallback_origin(&url) || url.scheme() == "about" {
            return vec![Action::AllowNavigation];
        }
        if !matches!(url.scheme(), "http" | "https") {
            return Vec::new();
        }

        match (surface, self.class_of(&url)) {
            // An auth popup redirecting back to the chat service hands
            // control to the primary surface.
            (SurfaceKind::Secondary, HostClass::Primary) => {
                let mut actions = self.begin_load(url);
                actions.push(Action::FocusPrimary);
                actions.push(Action::CloseSecondary);
                actions
            }
            (_, HostClass::External) => vec![Action::OpenExternal(url)],
            _ => vec![Action::AllowNavigation],
        }
    }

    /// The configured target's own host is always `Primary`, so an
    /// overridden target (staging, local mock) navigates in-surface even
    /// though it is not on the static allow-list.
    fn class_of(&self, url: &Url) -> HostClass {
        let Some(host) = url.host_str() else {
            return HostClass::External;
        };
        let is_target = self
            .target
            .host_str()
            .is_some_and(|target| target.eq_ignore_ascii_case(host.trim_end_matches('.')));
        if is_target {
            HostClass::Primary
        } else {
            policy::classify(host)
        }
    }
}

fn is_fallback_origin(url: &Url) -> bool {
    // On Windows custom schemes surface as http://<scheme>.localhost.
    url.scheme() == crate::fallback::SCHEME || url.host_str() == Some("fallback.localhost")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> Url {
        Url::parse("https://chatgpt.com/").unwrap()
    }

    fn controller() -> NavigationController {
        NavigationController::new(target())
    }

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn external_opens(actions: &[Action]) -> usize {
        actions
            .iter()
            .filter(|a| matches!(a, Action::OpenExternal(_)))
            .count()
    }

    #[test]
    fn load_request_loads_target_and_arms_watchdog() {
        let mut ctl = controller();
        let actions = ctl.handle(Event::LoadRequested);
        assert_eq!(actions[0], Action::LoadPrimary(target()));
        assert!(matches!(actions[1], Action::StartWatchdog { epoch: 1 }));
        assert_eq!(ctl.state(), LoadState::Loading);
    }

    #[test]
    fn clean_finish_settles_loaded_ok() {
        let mut ctl = controller();
        ctl.handle(Event::LoadRequested);
        let actions = ctl.handle(Event::LoadFinished { soft_failure: None });
        assert!(actions.is_empty());
        assert_eq!(ctl.state(), LoadState::LoadedOk);
    }

    #[test]
    fn soft_failure_schedules_exactly_one_retry() {
        let mut ctl = controller();
        ctl.handle(Event::LoadRequested);
        let actions = ctl.handle(Event::LoadFinished {
            soft_failure: Some("502 Bad Gateway"),
        });
        assert_eq!(actions, vec![Action::ScheduleRetry { epoch: 1 }]);
        assert_eq!(ctl.state(), LoadState::LoadedErrorPage);

        // The retry reissues the original load.
        let actions = ctl.handle(Event::RetryElapsed { epoch: 1 });
        assert_eq!(actions[0], Action::LoadPrimary(target()));
        assert_eq!(ctl.state(), LoadState::Loading);
    }

    #[test]
    fn repeated_soft_failures_retry_independently() {
        let mut ctl = controller();
        ctl.handle(Event::LoadRequested);
        for round in 1..=3u64 {
            let epoch = ctl.epoch;
            let actions = ctl.handle(Event::LoadFinished {
                soft_failure: Some("Challenge in progress"),
            });
            assert_eq!(actions, vec![Action::ScheduleRetry { epoch }], "round {round}");
            assert!(!ctl.handle(Event::RetryElapsed { epoch }).is_empty());
        }
    }

    #[test]
    fn retry_is_dropped_after_surface_destroyed() {
        let mut ctl = controller();
        ctl.handle(Event::LoadRequested);
        ctl.handle(Event::LoadFinished {
            soft_failure: Some("503 Service"),
        });
        ctl.handle(Event::SurfaceDestroyed);
        assert!(ctl.handle(Event::RetryElapsed { epoch: 1 }).is_empty());
        assert_eq!(ctl.state(), LoadState::Idle);
    }

    #[test]
    fn stale_retry_epoch_is_ignored() {
        let mut ctl = controller();
        ctl.handle(Event::LoadRequested);
        ctl.handle(Event::LoadFinished {
            soft_failure: Some("502 Bad Gateway"),
        });
        // A fresh explicit reload supersedes the pending retry.
        ctl.handle(Event::LoadRequested);
        assert!(ctl.handle(Event::RetryElapsed { epoch: 1 }).is_empty());
    }

    #[test]
    fn watchdog_turns_hung_load_into_fallback() {
        let mut ctl = controller();
        ctl.handle(Event::LoadRequested);
        let actions = ctl.handle(Event::WatchdogFired { epoch: 1 });
        assert!(matches!(&actions[0], Action::ShowFallback { reason } if reason.contains("chatgpt.com")));
        assert_eq!(ctl.state(), LoadState::LoadFailed);
    }

    #[test]
    fn watchdog_is_inert_after_load_settles() {
        let mut ctl = controller();
        ctl.handle(Event::LoadRequested);
        ctl.handle(Event::LoadFinished { soft_failure: None });
        assert!(ctl.handle(Event::WatchdogFired { epoch: 1 }).is_empty());
    }

    #[test]
    fn transport_failure_never_auto_retries() {
        let mut ctl = controller();
        ctl.handle(Event::LoadRequested);
        ctl.handle(Event::WatchdogFired { epoch: 1 });
        assert_eq!(ctl.state(), LoadState::LoadFailed);

        // No deferred event revives it; the fallback page completing a load
        // does not flip the state either.
        assert!(ctl.handle(Event::RetryElapsed { epoch: 1 }).is_empty());
        assert!(ctl.handle(Event::LoadFinished { soft_failure: None }).is_empty());
        assert_eq!(ctl.state(), LoadState::LoadFailed);

        // Only an explicit reload recovers.
        let actions = ctl.handle(Event::LoadRequested);
        assert_eq!(actions[0], Action::LoadPrimary(target()));
        assert_eq!(ctl.state(), LoadState::Loading);
    }

    #[test]
    fn internal_navigation_is_allowed_in_place() {
        let mut ctl = controller();
        for u in [
            "https://chatgpt.com/c/abc123",
            "https://auth.openai.com/authorize",
            "https://accounts.google.com/o/oauth2/auth",
        ] {
            let actions = ctl.handle(Event::WillNavigate {
                surface: SurfaceKind::Primary,
                url: url(u),
            });
            assert_eq!(actions, vec![Action::AllowNavigation], "{u}");
        }
    }

    #[test]
    fn external_navigation_is_cancelled_and_opened_externally() {
        let mut ctl = controller();
        let dest = url("https://example.com/shared-link");
        let actions = ctl.handle(Event::WillNavigate {
            surface: SurfaceKind::Primary,
            url: dest.clone(),
        });
        assert_eq!(actions, vec![Action::OpenExternal(dest)]);
        assert_eq!(external_opens(&actions), 1);
    }

    #[test]
    fn overridden_target_host_is_treated_as_primary() {
        let mut ctl = NavigationController::new(url("http://localhost:8080/"));
        ctl.handle(Event::LoadRequested);

        // The initial load (and in-app navigation) on the configured
        // target must stay in-surface, allow-list or not.
        let actions = ctl.handle(Event::WillNavigate {
            surface: SurfaceKind::Primary,
            url: url("http://localhost:8080/chat"),
        });
        assert_eq!(actions, vec![Action::AllowNavigation]);

        // Unrelated hosts stay external even with an overridden target.
        let dest = url("https://example.com/");
        let actions = ctl.handle(Event::WillNavigate {
            surface: SurfaceKind::Primary,
            url: dest.clone(),
        });
        assert_eq!(actions, vec![Action::OpenExternal(dest)]);
    }

    #[test]
    fn secondary_redirect_to_overridden_target_hands_back() {
        let mut ctl = NavigationController::new(url("http://localhost:8080/"));
        let dest = url("http://localhost:8080/auth/callback");
        let actions = ctl.handle(Event::WillNavigate {
            surface: SurfaceKind::Secondary,
            url: dest.clone(),
        });
        assert_eq!(actions[0], Action::LoadPrimary(dest));
        assert!(actions.contains(&Action::CloseSecondary));
    }

    #[test]
    fn about_blank_stays_in_surface() {
        let mut ctl = controller();
        let actions = ctl.handle(Event::WillNavigate {
            surface: SurfaceKind::Primary,
            url: url("about:blank"),
        });
        assert_eq!(actions, vec![Action::AllowNavigation]);
    }

    #[test]
    fn non_http_navigation_is_refused_without_external_open() {
        let mut ctl = controller();
        for u in [
            "file:///etc/passwd",
            "data:text/html,hello",
            "javascript:alert(1)",
        ] {
            for surface in [SurfaceKind::Primary, SurfaceKind::Secondary] {
                let actions = ctl.handle(Event::WillNavigate {
                    surface,
                    url: url(u),
                });
                assert!(actions.is_empty(), "{u} must be refused outright");
            }
        }
    }

    #[test]
    fn non_http_popups_are_refused() {
        let mut ctl = controller();
        for u in ["file:///etc/passwd", "data:text/html,hello"] {
            let actions = ctl.handle(Event::NewSurfaceRequested { url: url(u) });
            assert!(actions.is_empty(), "{u} must not reach the OS opener");
        }
    }

    #[test]
    fn fallback_document_navigation_is_allowed() {
        let mut ctl = controller();
        for u in ["fallback://localhost/?reason=x", "http://fallback.localhost/?reason=x"] {
            let actions = ctl.handle(Event::WillNavigate {
                surface: SurfaceKind::Primary,
                url: url(u),
            });
            assert_eq!(actions, vec![Action::AllowNavigation], "{u}");
        }
    }

    #[test]
    fn auth_popup_gets_a_secondary_surface() {
        let mut ctl = controller();
        let dest = url("https://auth.openai.com/authorize?client_id=x");
        let actions = ctl.handle(Event::NewSurfaceRequested { url: dest.clone() });
        assert_eq!(actions, vec![Action::SpawnSecondary(dest)]);
    }

    #[test]
    fn other_popups_open_externally_with_no_surface() {
        let mut ctl = controller();
        let dest = url("https://example.com/help");
        let actions = ctl.handle(Event::NewSurfaceRequested { url: dest.clone() });
        assert_eq!(actions, vec![Action::OpenExternal(dest)]);
        assert!(!actions.iter().any(|a| matches!(a, Action::SpawnSecondary(_))));
    }

    #[test]
    fn secondary_redirect_to_primary_hands_back_without_external_open() {
        let mut ctl = controller();
        let dest = url("https://chatgpt.com/auth/callback?code=xyz");
        let actions = ctl.handle(Event::WillNavigate {
            surface: SurfaceKind::Secondary,
            url: dest.clone(),
        });
        assert_eq!(actions[0], Action::LoadPrimary(dest));
        assert!(actions.contains(&Action::FocusPrimary));
        assert!(actions.contains(&Action::CloseSecondary));
        assert_eq!(external_opens(&actions), 0);
        assert_eq!(ctl.state(), LoadState::Loading);
    }

    #[test]
    fn secondary_navigation_within_auth_hosts_is_allowed() {
        let mut ctl = controller();
        let actions = ctl.handle(Event::WillNavigate {
            surface: SurfaceKind::Secondary,
            url: url("https://auth0.openai.com/u/login"),
        });
        assert_eq!(actions, vec![Action::AllowNavigation]);
    }

    #[test]
    fn secondary_navigation_to_external_opens_externally() {
        let mut ctl = controller();
        let dest = url("https://notopenai.com/phish");
        let actions = ctl.handle(Event::WillNavigate {
            surface: SurfaceKind::Secondary,
            url: dest.clone(),
        });
        assert_eq!(actions, vec![Action::OpenExternal(dest)]);
    }
}
