use userdesk_data::{NewUser, User, UserChanges};

use super::prelude::*;
use crate::forms::{AddUserForm, IdForm, UpdateUserForm};
use crate::hoops::require_admin;

const USERS_PATH: &str = "/admin/users";

pub fn router() -> Router {
    Router::with_path("admin")
        .hoop(require_admin)
        .push(Router::with_path("users").get(list_users))
        .push(Router::with_path("user/{id}").get(show_user))
        .push(
            Router::with_path("add-user")
                .get(add_user_page)
                .post(add_user),
        )
        .push(Router::with_path("delete-user").post(delete_user))
        .push(Router::with_path("toggle-activation").post(toggle_activation))
        .push(Router::with_path("edit-user/{id}").get(edit_user_page))
        .push(Router::with_path("update-user").post(update_user))
}

/// Outcome of resolving an id from a path or form field.
enum Lookup {
    Found(User),
    InvalidId,
    Missing,
}

fn lookup(depot: &Depot, raw: &str) -> AppResult<Lookup> {
    let Ok(id) = UserId::parse(raw) else {
        return Ok(Lookup::InvalidId);
    };
    Ok(match depot.app_state()?.users.find_by_id(&id)? {
        Some(user) => Lookup::Found(user),
        None => Lookup::Missing,
    })
}

/// Resolves `raw` or flashes the matching error and redirects to `fallback`.
async fn lookup_or_redirect(
    depot: &mut Depot,
    res: &mut Response,
    raw: &str,
    fallback: &str,
) -> AppResult<Option<User>> {
    match lookup(depot, raw)? {
        Lookup::Found(user) => Ok(Some(user)),
        Lookup::InvalidId => {
            flash_redirect(depot, res, FlashLevel::Error, "Invalid ID", fallback).await?;
            Ok(None)
        }
        Lookup::Missing => {
            flash_redirect(depot, res, FlashLevel::Error, "User not found", fallback).await?;
            Ok(None)
        }
    }
}

fn current_user_id(depot: &Depot) -> Option<UserId> {
    depot.current_user().map(|user| user.id)
}

#[handler]
async fn list_users(depot: &mut Depot, res: &mut Response) -> AppResult<()> {
    let users = depot.app_state()?.users.list()?;
    render_page(depot, res, "manage-users.html", context! { users => users }).await
}

#[handler]
async fn show_user(req: &mut Request, depot: &mut Depot, res: &mut Response) -> AppResult<()> {
    let raw = req.param::<String>("id").unwrap_or_default();
    let Some(person) = lookup_or_redirect(depot, res, &raw, USERS_PATH).await? else {
        return Ok(());
    };
    render_page(depot, res, "profile.html", context! { person => person }).await
}

#[handler]
async fn add_user_page(depot: &mut Depot, res: &mut Response) -> AppResult<()> {
    render_page(
        depot,
        res,
        "add-user.html",
        context! { roles => Role::all() },
    )
    .await
}

#[handler]
async fn add_user(req: &mut Request, depot: &mut Depot, res: &mut Response) -> AppResult<()> {
    let form: AddUserForm = req.parse_form().await?;
    let form_path = "/admin/add-user";

    if !form.is_complete() {
        return flash_redirect(
            depot,
            res,
            FlashLevel::Error,
            "All fields are required",
            form_path,
        )
        .await;
    }
    let Ok(role) = Role::parse(form.role.trim()) else {
        return flash_redirect(
            depot,
            res,
            FlashLevel::Error,
            "Invalid role selected",
            form_path,
        )
        .await;
    };

    let users = depot.app_state()?.users.clone();
    let taken = match users.find_by_email(&form.email) {
        Ok(found) => found.is_some(),
        Err(e) => {
            tracing::error!(error = %e, "failed to check email before adding user");
            return flash_redirect(
                depot,
                res,
                FlashLevel::Error,
                "An error occurred while adding the user",
                form_path,
            )
            .await;
        }
    };
    if taken {
        return flash_redirect(
            depot,
            res,
            FlashLevel::Error,
            "A user with this email already exists",
            form_path,
        )
        .await;
    }

    let new = NewUser {
        email: form.email,
        password: form.password,
        name: form.username,
        role: Some(role),
        is_active: Some(true),
    };
    match users.insert(new) {
        Ok(user) => {
            tracing::info!(
                admin_id = ?current_user_id(depot),
                user_id = %user.id,
                role = %user.role,
                "admin added user"
            );
            flash_redirect(
                depot,
                res,
                FlashLevel::Success,
                format!("User {} ({}) added successfully", user.name, user.email),
                USERS_PATH,
            )
            .await
        }
        Err(DataError::EmailTaken) => {
            flash_redirect(
                depot,
                res,
                FlashLevel::Error,
                "A user with this email already exists",
                form_path,
            )
            .await
        }
        Err(e) => {
            tracing::error!(error = %e, "failed to add user");
            flash_redirect(
                depot,
                res,
                FlashLevel::Error,
                "An error occurred while adding the user",
                form_path,
            )
            .await
        }
    }
}

#[handler]
async fn delete_user(req: &mut Request, depot: &mut Depot, res: &mut Response) -> AppResult<()> {
    let form: IdForm = req.parse_form().await?;
    let Ok(id) = UserId::parse(&form.id) else {
        return flash_redirect(depot, res, FlashLevel::Error, "Invalid ID", USERS_PATH).await;
    };
    if current_user_id(depot) == Some(id) {
        let back = back_location(req);
        return flash_redirect(
            depot,
            res,
            FlashLevel::Error,
            "Admins cannot delete themselves",
            &back,
        )
        .await;
    }

    let users = depot.app_state()?.users.clone();
    match users.delete(&id)? {
        Some(user) => {
            tracing::info!(
                admin_id = ?current_user_id(depot),
                user_id = %user.id,
                "admin deleted user"
            );
            flash_redirect(
                depot,
                res,
                FlashLevel::Success,
                format!("User {} deleted successfully", user.email),
                USERS_PATH,
            )
            .await
        }
        None => flash_redirect(depot, res, FlashLevel::Error, "User not found", USERS_PATH).await,
    }
}

#[handler]
async fn toggle_activation(
    req: &mut Request,
    depot: &mut Depot,
    res: &mut Response,
) -> AppResult<()> {
    let form: IdForm = req.parse_form().await?;
    let back = back_location(req);
    let Some(mut user) = lookup_or_redirect(depot, res, &form.id, &back).await? else {
        return Ok(());
    };
    if current_user_id(depot) == Some(user.id) {
        return flash_redirect(
            depot,
            res,
            FlashLevel::Error,
            "Admins cannot deactivate themselves",
            &back,
        )
        .await;
    }

    user.toggle_activation();
    let user = depot.app_state()?.users.save(&user)?;
    let state = if user.is_active { "activated" } else { "deactivated" };
    tracing::info!(
        admin_id = ?current_user_id(depot),
        user_id = %user.id,
        is_active = user.is_active,
        "admin toggled user activation"
    );
    flash_redirect(
        depot,
        res,
        FlashLevel::Success,
        format!("User {} {state} successfully", user.email),
        &back,
    )
    .await
}

#[handler]
async fn edit_user_page(req: &mut Request, depot: &mut Depot, res: &mut Response) -> AppResult<()> {
    let raw = req.param::<String>("id").unwrap_or_default();
    let Some(user) = lookup_or_redirect(depot, res, &raw, USERS_PATH).await? else {
        return Ok(());
    };
    render_page(
        depot,
        res,
        "edit-user.html",
        context! { user => user, roles => Role::all() },
    )
    .await
}

#[handler]
async fn update_user(req: &mut Request, depot: &mut Depot, res: &mut Response) -> AppResult<()> {
    let form: UpdateUserForm = req.parse_form().await?;
    let Ok(id) = UserId::parse(&form.id) else {
        return flash_redirect(depot, res, FlashLevel::Error, "Invalid ID", USERS_PATH).await;
    };
    let edit_path = format!("/admin/edit-user/{id}");

    let name = form.name.trim();
    let email = userdesk_data::user::normalize_email(&form.email);
    if name.is_empty() || email.is_empty() {
        return flash_redirect(
            depot,
            res,
            FlashLevel::Error,
            "All fields are required",
            &edit_path,
        )
        .await;
    }

    let users = depot.app_state()?.users.clone();
    if users
        .find_by_email(&email)?
        .is_some_and(|owner| owner.id != id)
    {
        return flash_redirect(
            depot,
            res,
            FlashLevel::Error,
            "Email is already in use by another user",
            &edit_path,
        )
        .await;
    }
    let Ok(role) = Role::parse(form.role.trim()) else {
        return flash_redirect(
            depot,
            res,
            FlashLevel::Error,
            "Invalid role selected",
            &edit_path,
        )
        .await;
    };

    let changes = UserChanges {
        name: Some(name.to_owned()),
        email: Some(email),
        role: Some(role),
    };
    match users.update(&id, changes) {
        Ok(Some(user)) => {
            tracing::info!(
                admin_id = ?current_user_id(depot),
                user_id = %user.id,
                role = %user.role,
                "admin updated user"
            );
            flash_redirect(
                depot,
                res,
                FlashLevel::Success,
                format!("User {} updated successfully", user.email),
                USERS_PATH,
            )
            .await
        }
        Ok(None) => {
            flash_redirect(depot, res, FlashLevel::Error, "User not found", USERS_PATH).await
        }
        Err(DataError::EmailTaken) => {
            flash_redirect(
                depot,
                res,
                FlashLevel::Error,
                "Email is already in use by another user",
                &edit_path,
            )
            .await
        }
        Err(e) => Err(e.into()),
    }
}
