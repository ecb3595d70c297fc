use super::prelude::*;
use crate::hoops::RequireLogin;

pub fn router() -> Router {
    Router::with_path("user")
        .hoop(RequireLogin::redirect_to("/auth/login"))
        .push(Router::with_path("profile").get(profile))
}

#[handler]
async fn profile(depot: &mut Depot, res: &mut Response) -> AppResult<()> {
    let person = depot.current_user().cloned();
    render_page(depot, res, "profile.html", context! { person => person }).await
}
