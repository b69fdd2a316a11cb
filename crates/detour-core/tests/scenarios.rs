//! End-to-end decision scenarios and classifier properties.

use detour_core::{
    is_forced, NavigationErrorEvent, NavigationEvent, PolicyList, ProxyPrefix, RedirectAction,
    RedirectEngine, RedirectReason, DEFAULT_PROXY_PREFIX, ERR_ABORTED,
};
use proptest::prelude::*;

fn engine(patterns: &[&str]) -> RedirectEngine {
    RedirectEngine::in_memory(ProxyPrefix::default())
        .with_policy(PolicyList::from_patterns(patterns.iter().copied()))
}

/// Runs one navigation and, if it redirected, the redirect's own navigation.
/// Returns every action issued.
fn navigate(engine: &RedirectEngine, session_id: i64, url: &str) -> Vec<RedirectAction> {
    let mut actions = Vec::new();
    if let Some(action) = engine.on_navigation_start(&NavigationEvent::top_level(session_id, url)) {
        let follow_up = engine
            .on_navigation_start(&NavigationEvent::top_level(session_id, &action.target_url));
        actions.push(action);
        actions.extend(follow_up);
    }
    actions
}

// ============================================================================
// Scenarios
// ============================================================================

#[test]
fn scenario_forced_host_enters_proxy() {
    let engine = engine(&["example.com"]);

    let actions = navigate(&engine, 1, "https://example.com/page");

    assert_eq!(actions.len(), 1);
    assert_eq!(
        actions[0].target_url,
        format!("{DEFAULT_PROXY_PREFIX}https://example.com/page")
    );
    assert_eq!(actions[0].reason, RedirectReason::EnterProxy);
}

#[test]
fn scenario_path_boundary_is_respected() {
    let engine = engine(&["example.com/feed"]);
    assert!(navigate(&engine, 1, "https://example.com/feedback").is_empty());
}

#[test]
fn scenario_unforced_proxied_url_bypasses() {
    let engine = engine(&[]);

    let actions = navigate(&engine, 1, &format!("{DEFAULT_PROXY_PREFIX}https://other.com/"));

    assert_eq!(actions.len(), 1);
    assert_eq!(actions[0].target_url, "https://other.com/");
}

#[test]
fn scenario_aborted_error_does_not_fail_over() {
    let engine = engine(&[]);

    let aborted = NavigationErrorEvent::top_level(1, "https://site.com", ERR_ABORTED);
    assert!(engine.on_navigation_error(&aborted).is_none());

    let failed = NavigationErrorEvent::top_level(1, "https://site.com", "net::ERR_TIMED_OUT");
    let action = engine.on_navigation_error(&failed).unwrap();
    assert_eq!(
        action.target_url,
        format!("{DEFAULT_PROXY_PREFIX}https://site.com")
    );
}

#[test]
fn scenario_error_and_start_race_redirects_once() {
    let engine = engine(&["site.com"]);

    // The error handler and a navigation-start both fire for the same session
    // before the host applies either redirect.
    let from_error = engine.on_navigation_error(&NavigationErrorEvent::top_level(
        1,
        "https://site.com/",
        "net::ERR_CONNECTION_RESET",
    ));
    let from_start =
        engine.on_navigation_start(&NavigationEvent::top_level(1, "https://site.com/"));

    assert!(from_error.is_some());
    assert!(from_start.is_none());
}

#[test]
fn scenario_session_close_bounds_marker_growth() {
    let guard = std::sync::Arc::new(detour_core::LoopGuard::new());
    let engine = RedirectEngine::new(ProxyPrefix::default(), guard.clone())
        .with_policy(PolicyList::from_patterns(["example.com"]));

    for session_id in 0..100 {
        engine.on_navigation_start(&NavigationEvent::top_level(session_id, "https://example.com/"));
    }
    assert_eq!(guard.len(), 100);

    for session_id in 0..100 {
        engine.on_session_closed(session_id);
    }
    assert!(guard.is_empty());
}

// ============================================================================
// Properties
// ============================================================================

fn label() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9]{0,7}"
}

fn hostname() -> impl Strategy<Value = String> {
    prop::collection::vec(label(), 1..4).prop_map(|labels| labels.join("."))
}

fn segment() -> impl Strategy<Value = String> {
    "[a-z0-9]{1,8}"
}

fn url() -> impl Strategy<Value = String> {
    (prop::bool::ANY, prop::bool::ANY, hostname(), segment()).prop_map(
        |(https, www, host, path)| {
            let scheme = if https { "https" } else { "http" };
            let www = if www { "www." } else { "" };
            format!("{scheme}://{www}{host}/{path}")
        },
    )
}

fn policy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(
        prop_oneof![hostname(), (hostname(), segment()).prop_map(|(h, s)| format!("{h}/{s}"))],
        0..4,
    )
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        .. ProptestConfig::default()
    })]

    #[test]
    fn non_http_strings_are_never_forced(
        input in "[a-z:/.]{0,24}",
        patterns in policy()
    ) {
        prop_assume!(!input.starts_with("http://") && !input.starts_with("https://"));
        let policy = PolicyList::from_patterns(&patterns);
        prop_assert!(!is_forced(&input, &policy));
    }

    #[test]
    fn host_pattern_matches_iff_equal_or_dot_suffix(
        pattern in hostname(),
        host in prop_oneof![
            hostname(),
            (label(), hostname()).prop_map(|(sub, base)| format!("{sub}.{base}")),
        ],
        as_subdomain in prop::bool::ANY,
    ) {
        let host = if as_subdomain { format!("{host}.{pattern}") } else { host };
        let policy = PolicyList::from_patterns([pattern.as_str()]);

        let expected = host == pattern || host.ends_with(&format!(".{pattern}"));
        prop_assert_eq!(is_forced(&format!("https://{host}"), &policy), expected);
    }

    #[test]
    fn path_pattern_matches_at_boundaries_only(
        host in hostname(),
        path in segment(),
        suffix in prop::sample::select(vec!["", "/x", "?x", "#x"]),
    ) {
        let pattern = format!("{host}/{path}");
        let policy = PolicyList::from_patterns([pattern.as_str()]);

        let boundary = format!("https://{pattern}{suffix}");
        prop_assert!(is_forced(&boundary, &policy));

        let glued = format!("https://{pattern}x");
        prop_assert!(!is_forced(&glued, &policy));
    }

    #[test]
    fn navigation_redirects_at_most_once(
        patterns in policy(),
        target in url(),
        proxied in prop::bool::ANY,
    ) {
        let engine = RedirectEngine::in_memory(ProxyPrefix::default())
            .with_policy(PolicyList::from_patterns(&patterns));
        let start = if proxied { engine.prefix().wrap(&target) } else { target };

        let actions = navigate(&engine, 7, &start);
        prop_assert!(actions.len() <= 1);
    }

    #[test]
    fn final_destination_is_stable(
        patterns in policy(),
        target in url(),
        proxied in prop::bool::ANY,
    ) {
        let engine = RedirectEngine::in_memory(ProxyPrefix::default())
            .with_policy(PolicyList::from_patterns(&patterns));
        let start = if proxied { engine.prefix().wrap(&target) } else { target };

        let destination = navigate(&engine, 7, &start)
            .pop()
            .map(|action| action.target_url)
            .unwrap_or(start);

        // A fresh navigation to the destination, with no marker pending,
        // issues no further redirect.
        let again = engine.on_navigation_start(&NavigationEvent::top_level(7, &destination));
        prop_assert!(again.is_none());
    }

    #[test]
    fn disabling_turns_every_redirect_into_a_no_op(
        patterns in policy(),
        target in url(),
        proxied in prop::bool::ANY,
    ) {
        let engine = RedirectEngine::in_memory(ProxyPrefix::default())
            .with_policy(PolicyList::from_patterns(&patterns))
            .with_enabled(false);
        let start = if proxied { engine.prefix().wrap(&target) } else { target.clone() };

        prop_assert!(navigate(&engine, 7, &start).is_empty());
        let error = NavigationErrorEvent::top_level(7, &target, "net::ERR_FAILED");
        prop_assert!(engine.on_navigation_error(&error).is_none());
    }
}
