//! Ordered fallback chains for locating controls on the publish form.

use crate::config::{ContentType, NamedSelectors, SelectorSet, SiteProfile};
use crate::destination::{select_by, MatchKind};
use crate::driver::{BrowserSession, Control};
use crate::error::DriverResult;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatcherStrategy<'a> {
    pub name: &'a str,
    pub selectors: &'a SelectorSet,
}

/// Ways to open the file selection surface, in the order they are tried.
/// The generic page click is kept apart as the last resort.
pub fn file_selection_strategies(
    profile: &SiteProfile,
    content_type: ContentType,
) -> Vec<MatcherStrategy<'_>> {
    vec![
        MatcherStrategy {
            name: "file-input",
            selectors: &profile.file_input,
        },
        MatcherStrategy {
            name: "drop-target",
            selectors: profile.drop_target(content_type),
        },
    ]
}

pub fn generic_click_strategy(profile: &SiteProfile) -> MatcherStrategy<'_> {
    MatcherStrategy {
        name: "page-click",
        selectors: &profile.generic_click,
    }
}

pub fn suggestion_strategies(profile: &SiteProfile) -> Vec<MatcherStrategy<'_>> {
    profile
        .destination_suggestions
        .iter()
        .map(|NamedSelectors { name, selectors }| MatcherStrategy {
            name: name.as_str(),
            selectors,
        })
        .collect()
}

/// The first strategy that finds a control within `timeout` per strategy.
/// Timeouts move on to the next strategy; other driver errors abort.
pub async fn first_present<'a>(
    session: &dyn BrowserSession,
    strategies: &[MatcherStrategy<'a>],
    timeout: Duration,
) -> DriverResult<Option<(&'a str, Control)>> {
    for strategy in strategies {
        match session.wait_for_control(strategy.selectors, timeout).await {
            Ok(control) => return Ok(Some((strategy.name, control))),
            Err(e) if e.is_timeout() => {
                tracing::debug!(strategy = strategy.name, "Strategy found no control");
            }
            Err(e) => return Err(e),
        }
    }
    Ok(None)
}

/// Controls currently rendered by each strategy, one group per strategy.
/// A strategy that errors contributes an empty group.
pub async fn rendered_groups(
    session: &dyn BrowserSession,
    strategies: &[MatcherStrategy<'_>],
) -> Vec<Vec<Control>> {
    let mut groups = Vec::with_capacity(strategies.len());
    for strategy in strategies {
        match session.locate_all(strategy.selectors).await {
            Ok(controls) => groups.push(controls),
            Err(e) => {
                tracing::warn!(strategy = strategy.name, error = %e, "Could not read rendered suggestions");
                groups.push(Vec::new());
            }
        }
    }
    groups
}

/// Match a resolved destination label against rendered suggestion controls,
/// with the same policy used to pick the destination itself.
pub fn reconcile<'a>(groups: &'a [Vec<Control>], label: &str) -> Option<(&'a Control, MatchKind)> {
    select_by(groups, label, |c| c.text.as_str())
}
