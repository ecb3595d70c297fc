mod auth;
mod session;

pub use auth::{RequireLoggedOut, RequireLogin, require_admin};
pub use session::{
    ensure_session, flash, flash_all, flash_redirect, load_session, sign_in, sign_out,
};
