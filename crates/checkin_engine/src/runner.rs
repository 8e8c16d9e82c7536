use std::collections::VecDeque;

use checkin_core::{update, Effect, Msg, RunReport, RunState};
use checkin_logging::{checkin_debug, checkin_info, checkin_warn};

use crate::actions::{ForumActions, SiteActions};
use crate::credentials::{CookieSet, CredentialError};
use crate::notify::Notifier;
use crate::profile::SiteProfile;
use crate::session::{Session, SessionSettings};
use crate::SessionError;

/// Runs the full policy for one site with a random seed.
pub async fn run_site(
    profile: &SiteProfile,
    cookies: Result<CookieSet, CredentialError>,
    settings: &SessionSettings,
    notifier: &dyn Notifier,
) -> RunReport {
    run_site_seeded(profile, cookies, settings, notifier, rand::random()).await
}

/// Same as [`run_site`] with a fixed seed for target, text and backoff choices.
pub async fn run_site_seeded(
    profile: &SiteProfile,
    cookies: Result<CookieSet, CredentialError>,
    settings: &SessionSettings,
    notifier: &dyn Notifier,
    seed: u64,
) -> RunReport {
    checkin_info!("{}: run started against {}", profile.name, profile.base_url);
    let state = RunState::new(profile.run_policy(), seed);
    let opened = cookies
        .map_err(SessionError::from)
        .and_then(|cookies| Session::open(&profile.base_url, &cookies, settings));

    let report = match opened {
        Ok(session) => {
            let actions = ForumActions::new(&session, profile);
            drive(state, Msg::SessionOpened, &actions, notifier).await
        }
        Err(err) => {
            checkin_warn!("{}: no session: {err}", profile.name);
            finish_without_session(state, err.to_string(), notifier).await
        }
    };
    checkin_info!("{}: run finished with {:?}", profile.name, report.result);
    report
}

/// Executes effects in order until the machine finishes.
pub async fn drive(
    state: RunState,
    first: Msg,
    actions: &dyn SiteActions,
    notifier: &dyn Notifier,
) -> RunReport {
    let (mut state, effects) = update(state, first);
    let mut queue: VecDeque<Effect> = effects.into();
    let mut finished = None;

    while let Some(effect) = queue.pop_front() {
        checkin_debug!("effect {effect:?}");
        let reply = match effect {
            Effect::Notify { title, body } => {
                notifier.notify(&title, &body).await;
                None
            }
            Effect::Finish(report) => {
                finished = Some(report);
                None
            }
            Effect::Sleep(duration) => {
                tokio::time::sleep(duration).await;
                Some(Msg::Slept)
            }
            effect => Some(execute(effect, actions).await),
        };
        if let Some(msg) = reply {
            let (next, more) = update(state, msg);
            state = next;
            queue.extend(more);
        }
    }

    finished.unwrap_or_else(|| state.report())
}

async fn execute(effect: Effect, actions: &dyn SiteActions) -> Msg {
    match effect {
        Effect::CheckLogin => Msg::LoginChecked(actions.check_login_state().await),
        Effect::ReadStatus => Msg::StatusRead(actions.status_counters().await),
        Effect::ListTargets { page } => Msg::TargetsListed {
            page,
            targets: actions.list_reply_targets(page).await,
        },
        Effect::SubmitReply { target, text } => Msg::ReplySubmitted {
            target,
            outcome: actions.submit_reply(target, &text).await,
        },
        Effect::SubmitCheckIn { token } => {
            Msg::CheckInSubmitted(actions.submit_check_in(token.as_ref()).await)
        }
        Effect::Sleep(_) | Effect::Notify { .. } | Effect::Finish(_) => Msg::Slept,
    }
}

/// Ends a run that never got a session: only notifications go out.
async fn finish_without_session(state: RunState, reason: String, notifier: &dyn Notifier) -> RunReport {
    let (state, effects) = update(state, Msg::SessionFailed { reason });
    let mut finished = None;
    for effect in effects {
        match effect {
            Effect::Notify { title, body } => notifier.notify(&title, &body).await,
            Effect::Finish(report) => finished = Some(report),
            other => checkin_warn!("dropping {other:?}: no session"),
        }
    }
    finished.unwrap_or_else(|| state.report())
}
