//! View rendering
//!
//! Templates are compiled into the binary and rendered with minijinja.
//! HTML auto-escaping is on for every template.

pub mod helpers;

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{Html, IntoResponse, Response},
};
use minijinja::{Environment, context};
use serde::Serialize;

use crate::AppState;
use crate::auth::SessionIdentity;
use crate::error::{AppError, ErrorPage};

const TEMPLATES: &[(&str, &str)] = &[
    ("layouts/main.html", include_str!("../../templates/layouts/main.html")),
    ("layouts/login.html", include_str!("../../templates/layouts/login.html")),
    ("partials/header.html", include_str!("../../templates/partials/header.html")),
    ("login.html", include_str!("../../templates/login.html")),
    ("dashboard.html", include_str!("../../templates/dashboard.html")),
    ("stories/index.html", include_str!("../../templates/stories/index.html")),
    ("stories/add.html", include_str!("../../templates/stories/add.html")),
    ("stories/edit.html", include_str!("../../templates/stories/edit.html")),
    ("stories/show.html", include_str!("../../templates/stories/show.html")),
    ("error/404.html", include_str!("../../templates/error/404.html")),
    ("error/500.html", include_str!("../../templates/error/500.html")),
];

/// Template renderer shared by all handlers.
pub struct Views {
    env: Environment<'static>,
}

impl Views {
    /// Build the environment with all templates and helpers registered
    ///
    /// # Errors
    /// Returns error if a template fails to parse
    pub fn new() -> Result<Self, AppError> {
        let mut env = Environment::new();

        for &(name, source) in TEMPLATES {
            env.add_template(name, source)?;
        }

        env.add_filter("format_date", helpers::format_date);
        env.add_filter("truncate", helpers::truncate);
        env.add_filter("strip_tags", helpers::strip_tags);
        env.add_filter("sanitize", helpers::sanitize);
        env.add_filter("select", helpers::select);
        env.add_function("edit_icon", helpers::edit_icon);

        Ok(Self { env })
    }

    /// Render a named view (`"dashboard"`, `"error/500"`, ...) into HTML.
    pub fn render<S: Serialize>(&self, name: &str, ctx: S) -> Result<String, AppError> {
        let template = self.env.get_template(&format!("{name}.html"))?;
        Ok(template.render(ctx)?)
    }

    /// Render a named view as a 200 HTML response.
    pub fn page<S: Serialize>(&self, name: &str, ctx: S) -> Result<Html<String>, AppError> {
        self.render(name, ctx).map(Html)
    }
}

/// Replace error responses tagged with [`ErrorPage`] by the matching
/// `error/404` or `error/500` view, keeping the status code. Other
/// client errors keep their plain body.
///
/// Runs outside `load_session`, so the signed-in user is read from the
/// response extensions.
pub async fn render_error_pages(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let response = next.run(request).await;
    let Some(ErrorPage(status)) = response.extensions().get::<ErrorPage>().copied() else {
        return response;
    };

    let view = if status.is_server_error() {
        "error/500"
    } else if status == StatusCode::NOT_FOUND {
        "error/404"
    } else {
        return response;
    };

    let user = response
        .extensions()
        .get::<SessionIdentity>()
        .and_then(|session| session.0.clone());

    match state.views.render(view, context! { user => user }) {
        Ok(body) => (status, Html(body)).into_response(),
        Err(error) => {
            tracing::error!(%error, view, "Failed to render error page");
            response
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_templates_parse() {
        assert!(Views::new().is_ok());
    }

    #[test]
    fn dashboard_lists_titles_and_escapes_them() {
        let views = Views::new().unwrap();
        let html = views
            .render(
                "dashboard",
                context! {
                    name => "Ana",
                    stories => vec![context! {
                        id => "s1",
                        title => "<b>Trip</b>",
                        status => "public",
                        user_id => "u1",
                        created_at => "2024-03-05T10:20:30Z",
                    }],
                },
            )
            .unwrap();

        assert!(html.contains("Ana"));
        assert!(html.contains("&lt;b&gt;Trip"));
        assert!(!html.contains("<b>Trip"));
        assert!(html.contains("/stories/edit/s1"));
        assert!(html.contains("March 5, 2024"));
    }

    #[test]
    fn empty_dashboard_renders_placeholder() {
        let views = Views::new().unwrap();
        let html = views
            .render("dashboard", context! { name => "Ana", stories => Vec::<()>::new() })
            .unwrap();
        assert!(html.contains("You have not created any stories"));
    }

    #[test]
    fn error_pages_render_without_context() {
        let views = Views::new().unwrap();
        assert!(views.render("error/500", context! {}).is_ok());
        assert!(views.render("error/404", context! {}).is_ok());
    }

    #[test]
    fn error_page_shows_navigation_for_signed_in_user() {
        let views = Views::new().unwrap();
        let user = crate::data::Identity {
            id: "u1".to_string(),
            display_name: "Ana Tester".to_string(),
            first_name: "Ana".to_string(),
            image: None,
        };

        let signed_in = views.render("error/404", context! { user => Some(user) }).unwrap();
        assert!(signed_in.contains("/auth/logout"));
        assert!(signed_in.contains("Ana Tester"));

        let guest = views
            .render("error/404", context! { user => None::<crate::data::Identity> })
            .unwrap();
        assert!(!guest.contains("/auth/logout"));
    }

    #[test]
    fn unknown_view_is_an_error() {
        let views = Views::new().unwrap();
        assert!(matches!(
            views.render("missing", context! {}),
            Err(AppError::Render(_))
        ));
    }
}
