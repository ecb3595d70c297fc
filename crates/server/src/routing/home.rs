use super::prelude::*;

#[handler]
pub async fn index(depot: &mut Depot, res: &mut Response) -> AppResult<()> {
    render_page(depot, res, "index.html", context! {}).await
}
