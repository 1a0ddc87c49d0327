use chordhub::router::{GuardDecision, HOME, LOGIN, REDIRECT_QUERY_KEY, Router, guard};

#[test]
fn test_protected_route_redirects_to_login_with_destination() {
    let mut router = Router::new();
    let nav = router.navigate("/edit/42?draft=1", false);

    assert_eq!(nav.route.name, LOGIN);
    assert_eq!(
        nav.route.query_value(REDIRECT_QUERY_KEY),
        Some("/edit/42?draft=1")
    );
    assert_eq!(nav.redirected_from.as_deref(), Some("/edit/42?draft=1"));
}

#[test]
fn test_protected_route_allowed_when_authenticated() {
    let mut router = Router::new();
    let nav = router.navigate("/profile", true);

    assert!(!nav.was_redirected());
    assert_eq!(nav.route.name, "profile-overview");
}

#[test]
fn test_guest_only_route_sends_signed_in_user_home() {
    let mut router = Router::new();
    let nav = router.navigate("/auth/register", true);

    assert_eq!(nav.route.name, HOME);
    assert_eq!(nav.route.path, "/");
    assert!(nav.route.query.is_empty());
}

#[test]
fn test_guest_only_route_allowed_when_anonymous() {
    let mut router = Router::new();
    let nav = router.navigate("/auth/forgot-password", false);
    assert_eq!(nav.route.name, "forgot-password");
    assert!(!nav.was_redirected());
}

#[test]
fn test_title_is_set_before_the_guard_runs() {
    let mut router = Router::new();
    let target = router.resolve("/profile/settings");
    let target_title = target.title.unwrap();

    // Redirected navigation ends on the login page title.
    router.navigate("/profile/settings", false);
    assert_eq!(router.document_title(), "Log In");

    // Allowed navigation keeps the target's title.
    router.navigate("/profile/settings", true);
    assert_eq!(router.document_title(), target_title);
}

#[test]
fn test_guard_is_pure() {
    let router = Router::new();
    let song = router.resolve("/song/abc");
    assert_eq!(song.param("id"), Some("abc"));
    assert_eq!(guard(&song, false), GuardDecision::Allow);
    assert_eq!(guard(&song, true), GuardDecision::Allow);

    let login = router.resolve("/auth/login");
    assert_eq!(
        guard(&login, true),
        GuardDecision::Redirect {
            name: HOME,
            query: Vec::new()
        }
    );
}

#[test]
fn test_unknown_path_is_not_found() {
    let mut router = Router::new();
    let nav = router.navigate("/no/such/page", false);
    assert_eq!(nav.route.name, "not-found");
    assert!(!nav.was_redirected());
}
