use userdesk_data::{NewUser, UserChanges};

use super::prelude::*;
use crate::forms::{LoginForm, ProfileForm, RegisterForm};
use crate::hoops::{RequireLoggedOut, RequireLogin, sign_in, sign_out};

pub fn router() -> Router {
    Router::with_path("auth")
        .push(
            Router::with_path("login")
                .hoop(RequireLoggedOut::redirect_to("/"))
                .get(login_page)
                .post(login),
        )
        .push(
            Router::with_path("register")
                .hoop(RequireLoggedOut::redirect_to("/"))
                .get(register_page)
                .post(register),
        )
        .push(
            Router::with_path("logout")
                .hoop(RequireLogin::redirect_to("/").without_return_to())
                .get(logout),
        )
        .push(
            Router::with_path("edit-profile")
                .hoop(RequireLogin::redirect_to("/"))
                .get(edit_profile_page)
                .post(edit_profile),
        )
}

#[handler]
async fn login_page(depot: &mut Depot, res: &mut Response) -> AppResult<()> {
    render_page(depot, res, "login.html", context! {}).await
}

#[handler]
async fn login(req: &mut Request, depot: &mut Depot, res: &mut Response) -> AppResult<()> {
    let form: LoginForm = req.parse_form().await?;
    let users = depot.app_state()?.users.clone();

    let Some(user) = users.find_by_email(&form.email)? else {
        tracing::warn!(email = %form.email, "login attempt for unknown email");
        return flash_redirect(
            depot,
            res,
            FlashLevel::Error,
            "Username/email not registered",
            "/auth/login",
        )
        .await;
    };
    if !user.is_active {
        tracing::warn!(user_id = %user.id, "login attempt for deactivated account");
        return flash_redirect(
            depot,
            res,
            FlashLevel::Error,
            "Your account has been deactivated",
            "/auth/login",
        )
        .await;
    }
    if !user.verify_password(&form.password)? {
        tracing::warn!(user_id = %user.id, "login attempt with wrong password");
        return flash_redirect(
            depot,
            res,
            FlashLevel::Error,
            "Incorrect password",
            "/auth/login",
        )
        .await;
    }

    let return_to = sign_in(depot, res, &user).await?;
    tracing::info!(user_id = %user.id, "user logged in");
    res.render(Redirect::found(return_to.unwrap_or_else(|| "/".to_owned())));
    Ok(())
}

#[handler]
async fn register_page(depot: &mut Depot, res: &mut Response) -> AppResult<()> {
    render_page(depot, res, "register.html", context! {}).await
}

#[handler]
async fn register(req: &mut Request, depot: &mut Depot, res: &mut Response) -> AppResult<()> {
    let form = req.parse_form::<RegisterForm>().await?.trimmed();

    let errors = form.errors();
    if !errors.is_empty() {
        flash_all(depot, res, FlashLevel::Error, errors).await?;
        return render_page(
            depot,
            res,
            "register.html",
            context! { email => form.email, name => form.name },
        )
        .await;
    }

    let users = depot.app_state()?.users.clone();
    let email = form.normalized_email();
    if users.find_by_email(&email)?.is_some() {
        return flash_redirect(
            depot,
            res,
            FlashLevel::Warning,
            "Username/email already exists",
            "/auth/register",
        )
        .await;
    }

    let user = match users.insert(NewUser {
        email,
        password: form.password,
        name: form.name,
        ..Default::default()
    }) {
        Ok(user) => user,
        Err(DataError::EmailTaken) => {
            return flash_redirect(
                depot,
                res,
                FlashLevel::Warning,
                "Username/email already exists",
                "/auth/register",
            )
            .await;
        }
        Err(e) => return Err(e.into()),
    };

    tracing::info!(user_id = %user.id, role = %user.role, "user registered");
    flash_redirect(
        depot,
        res,
        FlashLevel::Success,
        format!("{} registered successfully, you can now login", user.email),
        "/auth/login",
    )
    .await
}

#[handler]
async fn logout(depot: &mut Depot, res: &mut Response) -> AppResult<()> {
    if let Some(user) = depot.current_user() {
        tracing::info!(user_id = %user.id, "user logged out");
    }
    sign_out(depot).await?;
    res.render(Redirect::found("/"));
    Ok(())
}

#[handler]
async fn edit_profile_page(depot: &mut Depot, res: &mut Response) -> AppResult<()> {
    let user = depot.current_user().cloned();
    render_page(depot, res, "edit-profile.html", context! { user => user }).await
}

#[handler]
async fn edit_profile(req: &mut Request, depot: &mut Depot, res: &mut Response) -> AppResult<()> {
    let form = req.parse_form::<ProfileForm>().await?.trimmed();
    let Some(user) = depot.current_user().cloned() else {
        res.render(Redirect::found("/"));
        return Ok(());
    };

    let errors = form.errors();
    if !errors.is_empty() {
        flash_all(depot, res, FlashLevel::Error, errors).await?;
        return render_page(depot, res, "edit-profile.html", context! { user => user }).await;
    }

    let users = depot.app_state()?.users.clone();
    let email = userdesk_data::user::normalize_email(&form.email);
    if email != user.email && users.find_by_email(&email)?.is_some() {
        return flash_redirect(
            depot,
            res,
            FlashLevel::Error,
            "Email is already in use",
            "/auth/edit-profile",
        )
        .await;
    }

    let changes = UserChanges {
        name: Some(form.name),
        email: Some(email),
        role: None,
    };
    match users.update(&user.id, changes) {
        Ok(Some(updated)) => {
            tracing::info!(user_id = %updated.id, "profile updated");
            flash_redirect(
                depot,
                res,
                FlashLevel::Success,
                "Profile updated successfully",
                "/",
            )
            .await
        }
        Ok(None) => {
            sign_out(depot).await?;
            flash_redirect(depot, res, FlashLevel::Error, "User not found", "/").await
        }
        Err(DataError::EmailTaken) => {
            flash_redirect(
                depot,
                res,
                FlashLevel::Error,
                "Email is already in use",
                "/auth/edit-profile",
            )
            .await
        }
        Err(e) => Err(e.into()),
    }
}
