mod admin;
mod auth;
mod home;
mod user;

use minijinja::{Value, context};
use salvo::http::StatusCode;
use salvo::http::header::REFERER;
use salvo::http::uri::Uri;
use salvo::logging::Logger;
use salvo::prelude::*;

use crate::exts::DepotExt;
use crate::{AppResult, AppState, hoops, templates};

pub mod prelude {
    pub use minijinja::context;
    pub use salvo::prelude::*;
    pub use userdesk_data::{DataError, Role, UserId};

    pub use super::{back_location, render_page};
    pub use crate::exts::DepotExt;
    pub use crate::hoops::{flash, flash_all, flash_redirect};
    pub use crate::session::FlashLevel;
    pub use crate::{AppError, AppResult};
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .hoop(Logger::new())
        .hoop(state)
        .hoop(hoops::load_session)
        .get(home::index)
        .push(auth::router())
        .push(user::router())
        .push(admin::router())
}

/// Renders `name` inside the layout.
///
/// The signed-in user and any pending flash messages are added to `ctx`;
/// rendering consumes the flash messages.
pub async fn render_page(
    depot: &mut Depot,
    res: &mut Response,
    name: &str,
    ctx: Value,
) -> AppResult<()> {
    let sessions = depot.app_state()?.sessions.clone();
    let messages = match depot.session_token() {
        Some(token) => sessions.take_flashes(token).await,
        None => Vec::new(),
    };
    let html = templates::render(
        name,
        context! {
            current_user => depot.current_user(),
            messages => messages,
            ..ctx
        },
    )?;
    res.render(Text::Html(html));
    Ok(())
}

/// Same-site path to send the visitor back to, taken from `Referer`.
pub fn back_location(req: &Request) -> String {
    req.headers()
        .get(REFERER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse::<Uri>().ok())
        .and_then(|uri| uri.path_and_query().map(|pq| pq.as_str().to_owned()))
        .filter(|path| path.starts_with('/') && !path.starts_with("//"))
        .unwrap_or_else(|| "/".to_owned())
}

/// Catcher hook that renders error statuses nobody else rendered.
#[handler]
pub async fn catch_status(depot: &mut Depot, res: &mut Response, ctrl: &mut FlowCtrl) {
    if !res.body.is_none() {
        return;
    }
    let status = res.status_code.unwrap_or(StatusCode::NOT_FOUND);
    let message = if status == StatusCode::NOT_FOUND {
        "The page you are looking for does not exist."
    } else {
        "The request could not be completed."
    };
    match templates::render_error(status, message, depot.current_user()) {
        Ok(html) => {
            res.render(Text::Html(html));
            ctrl.skip_rest();
        }
        Err(e) => tracing::error!(error = %e, "failed to render error page"),
    }
}
