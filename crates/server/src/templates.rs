//! HTML templates, embedded at compile time and rendered with minijinja.

use std::sync::LazyLock;

use minijinja::{Environment, context};
use salvo::http::StatusCode;
use serde::Serialize;
use userdesk_data::User;

const SOURCES: &[(&str, &str)] = &[
    ("layout.html", include_str!("../templates/layout.html")),
    ("index.html", include_str!("../templates/index.html")),
    ("login.html", include_str!("../templates/login.html")),
    ("register.html", include_str!("../templates/register.html")),
    ("profile.html", include_str!("../templates/profile.html")),
    ("edit-profile.html", include_str!("../templates/edit-profile.html")),
    ("manage-users.html", include_str!("../templates/manage-users.html")),
    ("add-user.html", include_str!("../templates/add-user.html")),
    ("edit-user.html", include_str!("../templates/edit-user.html")),
    ("error.html", include_str!("../templates/error.html")),
];

static ENV: LazyLock<Environment<'static>> = LazyLock::new(|| {
    let mut env = Environment::new();
    env.set_loader(|name| {
        Ok(SOURCES
            .iter()
            .find(|(source_name, _)| *source_name == name)
            .map(|(_, source)| (*source).to_owned()))
    });
    env
});

pub fn render<S: Serialize>(name: &str, ctx: S) -> Result<String, minijinja::Error> {
    ENV.get_template(name)?.render(ctx)
}

/// Error page. `current_user` keeps the navigation bar in step with the
/// visitor's sign-in state.
pub fn render_error(
    status: StatusCode,
    message: &str,
    current_user: Option<&User>,
) -> Result<String, minijinja::Error> {
    render(
        "error.html",
        context! {
            current_user => current_user,
            status => status.as_u16(),
            reason => status.canonical_reason().unwrap_or("Error"),
            message => message,
        },
    )
}
