//! Registration, login, logout and profile editing through the full router.
//!
//! Flash text is matched without `/`, which the HTML escaper rewrites.

mod support;

use salvo::http::StatusCode;
use support::{Browser, PASSWORD};
use userdesk_data::{Role, UserStore};

#[tokio::test]
async fn home_greets_anonymous_visitor() {
    let mut browser = Browser::new();
    let page = browser.get("/").await;
    assert_eq!(page.status, Some(StatusCode::OK));
    assert!(page.body.contains("Welcome to Userdesk"));
}

#[tokio::test]
async fn unknown_route_renders_not_found_page() {
    let mut browser = Browser::new();
    let page = browser.get("/nowhere").await;
    assert_eq!(page.status, Some(StatusCode::NOT_FOUND));
    assert!(page.body.contains("404"));
}

#[tokio::test]
async fn register_then_login() {
    let mut browser = Browser::new();
    let page = browser
        .post(
            "/auth/register",
            &[
                ("name", "Jane"),
                ("email", "Jane@Example.com"),
                ("password", PASSWORD),
                ("password2", PASSWORD),
            ],
        )
        .await;
    page.assert_redirect("/auth/login");

    let page = browser.get("/auth/login").await;
    assert!(
        page.body
            .contains("jane@example.com registered successfully, you can now login")
    );

    let stored = browser.users.find_by_email("jane@example.com").unwrap().unwrap();
    assert_eq!(stored.role, Role::Client);
    assert_ne!(stored.password_hash, PASSWORD);

    browser.login("jane@example.com").await.assert_redirect("/");
    let page = browser.get("/").await;
    assert!(page.body.contains("Welcome, Jane"));
}

#[tokio::test]
async fn register_reports_every_validation_error() {
    let mut browser = Browser::new();
    let page = browser
        .post(
            "/auth/register",
            &[
                ("name", ""),
                ("email", "not-an-email"),
                ("password", "abc"),
                ("password2", "abd"),
            ],
        )
        .await;
    assert_eq!(page.status, Some(StatusCode::OK));
    assert!(page.body.contains("Invalid email"));
    assert!(page.body.contains("Password must be at least 6 characters long"));
    assert!(page.body.contains("Passwords must match"));
    assert!(page.body.contains("Name is required"));
    assert!(page.body.contains("value=\"not-an-email\""));
    assert!(browser.users.list().unwrap().is_empty());
}

#[tokio::test]
async fn register_rejects_duplicate_email() {
    let mut browser = Browser::new();
    browser.seed("jane@example.com", "Jane", None);
    let page = browser
        .post(
            "/auth/register",
            &[
                ("name", "Other"),
                ("email", "JANE@example.com"),
                ("password", PASSWORD),
                ("password2", PASSWORD),
            ],
        )
        .await;
    page.assert_redirect("/auth/register");
    let page = browser.get("/auth/register").await;
    assert!(page.body.contains("email already exists"));
    assert_eq!(browser.users.list().unwrap().len(), 1);
}

#[tokio::test]
async fn configured_admin_email_registers_as_admin() {
    let mut browser = Browser::new();
    browser
        .post(
            "/auth/register",
            &[
                ("name", "Boss"),
                ("email", support::ADMIN_EMAIL),
                ("password", PASSWORD),
                ("password2", PASSWORD),
            ],
        )
        .await
        .assert_redirect("/auth/login");
    let admin = browser
        .users
        .find_by_email(support::ADMIN_EMAIL)
        .unwrap()
        .unwrap();
    assert_eq!(admin.role, Role::Admin);
}

#[tokio::test]
async fn login_failures_flash_and_redirect() {
    let mut browser = Browser::new();
    let jane = browser.seed("jane@example.com", "Jane", None);

    browser
        .login("nobody@example.com")
        .await
        .assert_redirect("/auth/login");
    let page = browser.get("/auth/login").await;
    assert!(page.body.contains("email not registered"));

    browser
        .post(
            "/auth/login",
            &[("email", "jane@example.com"), ("password", "wrong-password")],
        )
        .await
        .assert_redirect("/auth/login");
    let page = browser.get("/auth/login").await;
    assert!(page.body.contains("Incorrect password"));

    let mut inactive = jane.clone();
    inactive.toggle_activation();
    browser.users.save(&inactive).unwrap();
    browser
        .login("jane@example.com")
        .await
        .assert_redirect("/auth/login");
    let page = browser.get("/auth/login").await;
    assert!(page.body.contains("Your account has been deactivated"));
}

#[tokio::test]
async fn flash_is_shown_only_once() {
    let mut browser = Browser::new();
    browser.login("nobody@example.com").await;
    assert!(browser.get("/auth/login").await.body.contains("email not registered"));
    assert!(!browser.get("/auth/login").await.body.contains("email not registered"));
}

#[tokio::test]
async fn logged_in_visitor_is_kept_off_login_and_register() {
    let mut browser = Browser::new();
    browser.seed("jane@example.com", "Jane", None);
    browser.login("jane@example.com").await;
    browser.get("/auth/login").await.assert_redirect("/");
    browser.get("/auth/register").await.assert_redirect("/");
}

#[tokio::test]
async fn logout_requires_login_and_ends_session() {
    let mut browser = Browser::new();
    browser.get("/auth/logout").await.assert_redirect("/");

    browser.seed("jane@example.com", "Jane", None);
    browser.login("jane@example.com").await;
    browser.get("/auth/logout").await.assert_redirect("/");
    browser.get("/user/profile").await.assert_redirect("/auth/login");
}

#[tokio::test]
async fn login_returns_to_requested_page() {
    let mut browser = Browser::new();
    browser.seed("jane@example.com", "Jane", None);
    browser.get("/user/profile").await.assert_redirect("/auth/login");
    browser
        .login("jane@example.com")
        .await
        .assert_redirect("/user/profile");

    let page = browser.get("/user/profile").await;
    assert_eq!(page.status, Some(StatusCode::OK));
    assert!(page.body.contains("jane@example.com"));
}

#[tokio::test]
async fn stale_logout_is_not_a_login_destination() {
    let mut browser = Browser::new();
    browser.seed("jane@example.com", "Jane", None);
    browser.get("/auth/logout").await.assert_redirect("/");
    browser.login("jane@example.com").await.assert_redirect("/");
    assert_eq!(
        browser.get("/user/profile").await.status,
        Some(StatusCode::OK)
    );
}

#[tokio::test]
async fn edit_profile_updates_name_and_email() {
    let mut browser = Browser::new();
    let jane = browser.seed("jane@example.com", "Jane", None);
    browser.login("jane@example.com").await;

    let page = browser.get("/auth/edit-profile").await;
    assert!(page.body.contains("value=\"Jane\""));

    browser
        .post(
            "/auth/edit-profile",
            &[("name", "Jane Doe"), ("email", "Jane.Doe@Example.com")],
        )
        .await
        .assert_redirect("/");
    assert!(browser.get("/").await.body.contains("Profile updated successfully"));

    let stored = browser.users.find_by_id(&jane.id).unwrap().unwrap();
    assert_eq!(stored.name, "Jane Doe");
    assert_eq!(stored.email, "jane.doe@example.com");
    assert!(stored.verify_password(PASSWORD).unwrap());
}

#[tokio::test]
async fn edit_profile_rejects_taken_email() {
    let mut browser = Browser::new();
    browser.seed("jane@example.com", "Jane", None);
    browser.seed("john@example.com", "John", None);
    browser.login("jane@example.com").await;

    browser
        .post(
            "/auth/edit-profile",
            &[("name", "Jane"), ("email", "john@example.com")],
        )
        .await
        .assert_redirect("/auth/edit-profile");
    let page = browser.get("/auth/edit-profile").await;
    assert!(page.body.contains("Email is already in use"));
}

#[tokio::test]
async fn edit_profile_rerenders_on_invalid_input() {
    let mut browser = Browser::new();
    browser.seed("jane@example.com", "Jane", None);
    browser.login("jane@example.com").await;

    let page = browser
        .post("/auth/edit-profile", &[("name", " "), ("email", "nope")])
        .await;
    assert_eq!(page.status, Some(StatusCode::OK));
    assert!(page.body.contains("Invalid email"));
    assert!(page.body.contains("Name is required"));
}

#[tokio::test]
async fn deactivated_user_is_signed_out() {
    let mut browser = Browser::new();
    let jane = browser.seed("jane@example.com", "Jane", None);
    browser.login("jane@example.com").await;
    assert_eq!(
        browser.get("/user/profile").await.status,
        Some(StatusCode::OK)
    );

    let mut inactive = jane;
    inactive.toggle_activation();
    browser.users.save(&inactive).unwrap();
    browser.get("/user/profile").await.assert_redirect("/auth/login");
}
