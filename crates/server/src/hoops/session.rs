use salvo::prelude::*;
use userdesk_data::User;

use crate::exts::DepotExt;
use crate::session::{Flash, FlashLevel};
use crate::AppResult;

/// Resolves the session cookie and the signed-in user for this request.
///
/// Stale cookies are ignored. A session whose user was deleted or
/// deactivated is signed out.
#[handler]
pub async fn load_session(req: &mut Request, depot: &mut Depot) -> AppResult<()> {
    let state = depot.app_state()?.clone();
    let Some(token) = req
        .cookie(state.sessions.cookie_name())
        .map(|cookie| cookie.value().to_owned())
    else {
        return Ok(());
    };

    let user_id = match state.sessions.validate_session(&token).await {
        Ok(user_id) => user_id,
        Err(e) => {
            tracing::debug!(error = %e, "ignoring session cookie");
            return Ok(());
        }
    };
    depot.set_session_token(token.clone());

    if let Some(user_id) = user_id {
        match state.users.find_by_id(&user_id)? {
            Some(user) if user.is_active => {
                depot.inject(user);
            }
            _ => {
                tracing::info!(%user_id, "signing out session of missing or inactive user");
                state.sessions.logout(&token).await;
            }
        }
    }
    Ok(())
}

/// Returns the visitor's session token, starting a session if needed.
pub async fn ensure_session(depot: &mut Depot, res: &mut Response) -> AppResult<String> {
    if let Some(token) = depot.session_token() {
        return Ok(token.to_owned());
    }
    let sessions = depot.app_state()?.sessions.clone();
    let token = sessions.create_session().await;
    res.add_cookie(sessions.cookie(&token));
    depot.set_session_token(token.token.clone());
    Ok(token.token)
}

pub async fn flash(
    depot: &mut Depot,
    res: &mut Response,
    level: FlashLevel,
    message: impl Into<String>,
) -> AppResult<()> {
    flash_all(depot, res, level, [message.into()]).await
}

pub async fn flash_all(
    depot: &mut Depot,
    res: &mut Response,
    level: FlashLevel,
    messages: impl IntoIterator<Item = String>,
) -> AppResult<()> {
    let token = ensure_session(depot, res).await?;
    let sessions = depot.app_state()?.sessions.clone();
    for message in messages {
        sessions.push_flash(&token, Flash::new(level, message)).await?;
    }
    Ok(())
}

/// Queues a flash message and redirects to `location`.
pub async fn flash_redirect(
    depot: &mut Depot,
    res: &mut Response,
    level: FlashLevel,
    message: impl Into<String>,
    location: &str,
) -> AppResult<()> {
    flash(depot, res, level, message).await?;
    res.render(Redirect::found(location.to_owned()));
    Ok(())
}

/// Remembers the current path so login can send the visitor back to it.
pub(crate) async fn remember_return_to(
    req: &Request,
    depot: &mut Depot,
    res: &mut Response,
) -> AppResult<()> {
    let path = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_owned())
        .unwrap_or_else(|| "/".to_owned());
    let token = ensure_session(depot, res).await?;
    let sessions = depot.app_state()?.sessions.clone();
    sessions.set_return_to(&token, path).await?;
    Ok(())
}

/// Signs `user` in under a fresh session token and returns the path the
/// visitor was headed to before login, if one was recorded.
pub async fn sign_in(
    depot: &mut Depot,
    res: &mut Response,
    user: &User,
) -> AppResult<Option<String>> {
    let sessions = depot.app_state()?.sessions.clone();
    let previous = depot.session_token().map(str::to_owned);
    let (token, return_to) = sessions.login(previous.as_deref(), user.id).await;
    res.add_cookie(sessions.cookie(&token));
    depot.set_session_token(token.token);
    depot.inject(user.clone());
    Ok(return_to)
}

pub async fn sign_out(depot: &mut Depot) -> AppResult<()> {
    let sessions = depot.app_state()?.sessions.clone();
    if let Some(token) = depot.session_token() {
        sessions.logout(token).await;
    }
    Ok(())
}
