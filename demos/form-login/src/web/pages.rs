use axum::{response::Html, routing::get, Router};
use axum_auth_flow::{
    CurrentIdentity, Error, Segment, SessionSegment, FORM_MESSAGE, PASSWORD_HELP, USERNAME_HELP,
};

pub fn router() -> Router {
    Router::new().route("/", get(self::get::index))
}

mod get {
    use super::*;

    pub async fn index(
        CurrentIdentity(user): CurrentIdentity,
        segment: Segment,
    ) -> Result<Html<String>, Error> {
        if let Some(user_id) = user.id() {
            return Ok(Html(format!(
                r#"<p>Logged in as user {user_id}.</p>
<form method="post" action="/logout"><button>Log out</button></form>"#
            )));
        }

        let mut messages = String::new();
        for key in [USERNAME_HELP, PASSWORD_HELP, FORM_MESSAGE] {
            if let Some(message) = segment.take_flash(key).await? {
                messages.push_str(&format!("<p>{message}</p>\n"));
            }
        }

        Ok(Html(format!(
            r#"{messages}<form method="post" action="/login">
  <input name="username" placeholder="ferris">
  <input name="password" type="password" placeholder="hunter42">
  <label><input name="remember" type="checkbox"> Remember me</label>
  <button>Log in</button>
</form>"#
        )))
    }
}
