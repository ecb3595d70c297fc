use salvo::async_trait;
use salvo::http::Method;
use salvo::prelude::*;

use super::session::{flash_redirect, remember_return_to};
use crate::AppResult;
use crate::exts::DepotExt;
use crate::session::FlashLevel;

/// Lets signed-in visitors through and redirects everyone else.
///
/// For `GET` requests the requested path is stored so a later login can
/// return to it, unless the guard was built with [`Self::without_return_to`].
#[derive(Debug, Clone, Copy)]
pub struct RequireLogin {
    redirect_to: &'static str,
    remember_path: bool,
}

impl RequireLogin {
    pub fn redirect_to(redirect_to: &'static str) -> Self {
        Self {
            redirect_to,
            remember_path: true,
        }
    }

    /// For routes a visitor should never be sent back to after login.
    pub fn without_return_to(mut self) -> Self {
        self.remember_path = false;
        self
    }
}

#[async_trait]
impl Handler for RequireLogin {
    async fn handle(
        &self,
        req: &mut Request,
        depot: &mut Depot,
        res: &mut Response,
        ctrl: &mut FlowCtrl,
    ) {
        if depot.current_user().is_some() {
            return;
        }
        if self.remember_path && req.method() == Method::GET {
            if let Err(e) = remember_return_to(req, depot, res).await {
                e.write(req, depot, res).await;
                ctrl.skip_rest();
                return;
            }
        }
        res.render(Redirect::found(self.redirect_to));
        ctrl.skip_rest();
    }
}

/// Redirects signed-in visitors away from login and registration pages.
#[derive(Debug, Clone, Copy)]
pub struct RequireLoggedOut {
    redirect_to: &'static str,
}

impl RequireLoggedOut {
    pub fn redirect_to(redirect_to: &'static str) -> Self {
        Self { redirect_to }
    }
}

#[async_trait]
impl Handler for RequireLoggedOut {
    async fn handle(
        &self,
        _req: &mut Request,
        depot: &mut Depot,
        res: &mut Response,
        ctrl: &mut FlowCtrl,
    ) {
        if depot.current_user().is_some() {
            res.render(Redirect::found(self.redirect_to));
            ctrl.skip_rest();
        }
    }
}

/// Admin-only gate. Anonymous visitors and non-admins alike are sent home
/// with a warning.
#[handler]
pub async fn require_admin(
    depot: &mut Depot,
    res: &mut Response,
    ctrl: &mut FlowCtrl,
) -> AppResult<()> {
    if depot.current_user().is_some_and(|user| user.is_admin()) {
        return Ok(());
    }
    match depot.current_user() {
        Some(user) => tracing::warn!(user_id = %user.id, "non-admin tried to reach admin route"),
        None => tracing::debug!("anonymous visitor tried to reach admin route"),
    }
    ctrl.skip_rest();
    flash_redirect(
        depot,
        res,
        FlashLevel::Warning,
        "You are not authorized to see this route",
        "/",
    )
    .await
}
